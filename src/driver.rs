//! Driver: a context-confined, shared, replay-latest, never-erroring stream.
//!
//! A `Driver<Item>` packages the strategy UI-facing state streams want:
//!
//! * delivery happens on one designated execution context;
//! * all consumers share a single upstream subscription;
//! * a consumer attaching late immediately receives the latest value;
//! * the error channel is [`Infallible`], so "never errors" is checked by
//!   the type system instead of promised in a comment.
//!
//! Attaching from the wrong context is a programming error and panics at the
//! attachment point, before any subscription side effect runs.

use std::convert::Infallible;

use crate::{
  disposable::CompositeDisposable,
  event::Event,
  observable::{Observable, ObservableExt},
  observer::{FnObserver, Observer},
  ops::share_latest::{ShareLatest, ShareSubscription},
  scheduler::{ConfinedScheduler, ExecutionContext, Scheduler},
  sink::Sink,
};

/// Panic message raised when [`Driver::drive`] is called off-context.
pub const DRIVE_CONTEXT_ERROR: &str =
  "drivers must be attached from their designated execution context";

pub struct Driver<Item> {
  shared: ShareLatest<Item, Infallible>,
  context: ExecutionContext,
}

impl<Item> Clone for Driver<Item> {
  fn clone(&self) -> Self {
    Self { shared: self.shared.clone(), context: self.context.clone() }
  }
}

impl<Item> Driver<Item>
where
  Item: Clone + Send + 'static,
{
  /// Confine `source` to `scheduler`'s thread and share it.
  pub fn new<S>(source: S, scheduler: &ConfinedScheduler) -> Self
  where
    S: Observable<Item, Infallible> + Send + Sync + 'static,
  {
    Self::with_context(source, scheduler.clone(), scheduler.context())
  }

  /// Like [`new`](Driver::new) with an explicit scheduler/context pair, for
  /// contexts not backed by a [`ConfinedScheduler`].
  pub fn with_context<S, SD>(source: S, scheduler: SD, context: ExecutionContext) -> Self
  where
    S: Observable<Item, Infallible> + Send + Sync + 'static,
    SD: Scheduler + Clone + Send + Sync + 'static,
  {
    Self {
      shared: source.observe_on(scheduler).share_latest(),
      context,
    }
  }

  pub fn context(&self) -> &ExecutionContext { &self.context }

  /// Attach an observer. Must be called on the driver's execution context.
  #[track_caller]
  pub fn drive<O>(&self, observer: O) -> ShareSubscription<Item, Infallible>
  where
    O: Observer<Item, Infallible> + Send + 'static,
  {
    self.context.ensure_running_on(DRIVE_CONTEXT_ERROR);
    self.shared.actual_subscribe(observer)
  }

  /// Attach a value-only closure.
  #[track_caller]
  pub fn drive_next<N>(&self, mut next: N) -> ShareSubscription<Item, Infallible>
  where
    N: FnMut(Item) + Send + 'static,
  {
    self.drive(FnObserver::new(move |event| {
      if let Event::Next(v) = event {
        next(v);
      }
    }))
  }

  /// Attach value and completion closures, plus a hook that runs exactly
  /// once when the subscription ends for any reason.
  #[track_caller]
  pub fn drive_with<N, C, D>(
    &self,
    mut next: N,
    mut complete: C,
    on_disposed: D,
  ) -> CompositeDisposable
  where
    N: FnMut(Item) + Send + 'static,
    C: FnMut() + Send + 'static,
    D: FnOnce() + Send + 'static,
  {
    let sink = Sink::with_teardown(
      FnObserver::new(move |event: Event<Item, Infallible>| match event {
        Event::Next(v) => next(v),
        Event::Completed => complete(),
        Event::Error(never) => match never {},
      }),
      on_disposed,
    );
    let unsub = CompositeDisposable::new();
    unsub.add(sink.clone());
    unsub.add(self.drive(sink));
    unsub
  }

  /// Bind the driver's values to a settable target.
  #[track_caller]
  pub fn drive_setter<T>(&self, mut target: T) -> ShareSubscription<Item, Infallible>
  where
    T: Settable<Item> + Send + 'static,
  {
    self.drive_next(move |value| target.set_value(value))
  }
}

/// A write-only binding target for [`Driver::drive_setter`].
pub trait Settable<Value> {
  fn set_value(&mut self, value: Value);
}

impl<Value, F: FnMut(Value)> Settable<Value> for F {
  #[inline]
  fn set_value(&mut self, value: Value) { self(value) }
}

impl<Item> Observable<Item, Infallible> for Driver<Item>
where
  Item: Clone + Send + 'static,
{
  type Unsub = ShareSubscription<Item, Infallible>;

  #[track_caller]
  fn actual_subscribe<O>(&self, observer: O) -> Self::Unsub
  where
    O: Observer<Item, Infallible> + Send + 'static,
  {
    self.drive(observer)
  }
}
