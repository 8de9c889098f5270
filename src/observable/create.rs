//! Observable backed by a producer closure.

use std::marker::PhantomData;

use crate::{
  disposable::{BoxDisposable, CompositeDisposable},
  observable::Observable,
  observer::Observer,
  sink::{Sink, Subscriber},
};

/// Observable created from a function, see [`create`].
#[derive(Clone)]
pub struct Create<F, Item, Err> {
  f: F,
  _marker: PhantomData<fn(Item, Err)>,
}

/// Build an observable from a producer closure.
///
/// On every subscribe the closure receives a fresh [`Subscriber`] handle to
/// push events through, and returns the teardown disposable for whatever
/// resources it acquired ([`NopDisposable`] when the production is not
/// cancelable). The subscriber enforces terminal-once and drops events once
/// the subscription is disposed, so the closure may keep emitting from
/// another thread without further coordination.
///
/// [`NopDisposable`]: crate::disposable::NopDisposable
pub fn create<F, Item, Err>(f: F) -> Create<F, Item, Err>
where
  F: Fn(Subscriber<Item, Err>) -> BoxDisposable,
{
  Create { f, _marker: PhantomData }
}

impl<F, Item, Err> Observable<Item, Err> for Create<F, Item, Err>
where
  F: Fn(Subscriber<Item, Err>) -> BoxDisposable,
  Item: 'static,
  Err: 'static,
{
  type Unsub = CompositeDisposable;

  fn actual_subscribe<O>(&self, observer: O) -> Self::Unsub
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    let sink: Subscriber<Item, Err> = Sink::new(Box::new(observer));
    let unsub = CompositeDisposable::new();
    unsub.add(sink.clone());
    let teardown = (self.f)(sink);
    unsub.add(teardown);
    unsub
  }
}
