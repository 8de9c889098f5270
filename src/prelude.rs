//! Glob-import surface: `use rivulet::prelude::*;`.

pub use crate::{
  disposable::{
    ActionDisposable, BoxDisposable, CompositeDisposable, Disposable, DisposableExt, DisposeGuard,
    NopDisposable,
  },
  driver::{Driver, Settable, DRIVE_CONTEXT_ERROR},
  event::{Event, Terminal},
  leak::{clear_tracked, ignore_ident_prefix, live_subscriptions, print_live_subscriptions},
  observable::{
    create, empty, from_iter, of, throw, ArcObservable, BoxObservable, DynObservable, Observable,
    ObservableExt,
  },
  observer::{observer_from_parts, BoxObserver, Fanout, FnObserver, Observer},
  ops::{
    debug::{DebugConfig, DebugOp, SourceLocation},
    observe_on::ObserveOnOp,
    share_latest::{ShareLatest, ShareSubscription},
  },
  scheduler::{ConfinedScheduler, ExecutionContext, ImmediateScheduler, Scheduler},
  sink::{Sink, Subscriber},
  subject::Subject,
};
