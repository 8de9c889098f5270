//! Observable trait, object-safe mirror and subscribe ergonomics.

use std::sync::Arc;

use crate::{
  disposable::{BoxDisposable, CompositeDisposable, Disposable},
  event::Event,
  observer::{BoxObserver, FnObserver, Observer},
  sink::Sink,
};

mod create;
mod from_iter;
mod of;
pub use create::{create, Create};
pub use from_iter::{from_iter, FromIter};
pub use of::{empty, of, throw, Empty, Of, Throw};

/// Producer of an observable sequence.
///
/// `actual_subscribe` is the single entry point: it wires an observer up and
/// returns the disposable governing that subscription's resources. The
/// receiver is `&self`, so each call starts an independent, freshly scoped
/// production; sharing across subscriptions only happens when a sharing
/// strategy such as [`ShareLatest`] is layered on explicitly.
///
/// Contract for implementors:
/// * events delivered to one observer from one subscribe call are strictly
///   ordered, with no overlapping delivery;
/// * after `Completed` or `Error` nothing further is delivered and every
///   resource held for the subscription is eventually released;
/// * cancellation is cooperative: once the returned disposable's flag is
///   observed set, no new downstream delivery may start.
///
/// [`ShareLatest`]: crate::ops::share_latest::ShareLatest
pub trait Observable<Item, Err> {
  type Unsub: Disposable + Send + 'static;

  fn actual_subscribe<O>(&self, observer: O) -> Self::Unsub
  where
    O: Observer<Item, Err> + Send + 'static;
}

/// Object-safe mirror of [`Observable`], for boxed/shared storage.
///
/// The generic `actual_subscribe` keeps concrete observer types out of
/// operator signatures but is not vtable-compatible; this trait adapts it
/// the same way the boxed-observer plumbing does for observers.
pub trait DynObservable<Item, Err> {
  fn dyn_subscribe(&self, observer: BoxObserver<Item, Err>) -> BoxDisposable;
}

impl<Item, Err, T> DynObservable<Item, Err> for T
where
  T: Observable<Item, Err>,
  Item: 'static,
  Err: 'static,
{
  fn dyn_subscribe(&self, observer: BoxObserver<Item, Err>) -> BoxDisposable {
    Box::new(self.actual_subscribe(observer))
  }
}

/// Boxed observable.
pub type BoxObservable<Item, Err> = Box<dyn DynObservable<Item, Err> + Send + Sync>;
/// Shared observable handle.
pub type ArcObservable<Item, Err> = Arc<dyn DynObservable<Item, Err> + Send + Sync>;

impl<Item: 'static, Err: 'static> Observable<Item, Err> for BoxObservable<Item, Err> {
  type Unsub = BoxDisposable;

  fn actual_subscribe<O>(&self, observer: O) -> Self::Unsub
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    (**self).dyn_subscribe(Box::new(observer))
  }
}

impl<Item: 'static, Err: 'static> Observable<Item, Err> for ArcObservable<Item, Err> {
  type Unsub = BoxDisposable;

  fn actual_subscribe<O>(&self, observer: O) -> Self::Unsub
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    (**self).dyn_subscribe(Box::new(observer))
  }
}

/// Subscribe helpers and operator entry points.
pub trait ObservableExt<Item, Err>: Observable<Item, Err> + Sized {
  /// Attach a full observer, wrapped in a terminal [`Sink`].
  ///
  /// The returned composite owns both the sink and the upstream
  /// subscription; disposing it stops delivery and releases the chain.
  fn subscribe_observer<O>(&self, observer: O) -> CompositeDisposable
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    let sink = Sink::new(observer);
    let unsub = CompositeDisposable::new();
    unsub.add(sink.clone());
    unsub.add(self.actual_subscribe(sink));
    unsub
  }

  /// Attach a next-only closure; terminals are ignored.
  fn subscribe<N>(&self, mut next: N) -> CompositeDisposable
  where
    N: FnMut(Item) + Send + 'static,
    Item: 'static,
    Err: 'static,
  {
    self.subscribe_observer(FnObserver::new(move |event| {
      if let Event::Next(v) = event {
        next(v);
      }
    }))
  }

  /// Attach a next/error/complete closure triple.
  fn subscribe_all<N, E, C>(&self, next: N, error: E, complete: C) -> CompositeDisposable
  where
    N: FnMut(Item) + Send + 'static,
    E: FnMut(Err) + Send + 'static,
    C: FnMut() + Send + 'static,
    Item: 'static,
    Err: 'static,
  {
    self.subscribe_observer(crate::observer::observer_from_parts(next, error, complete))
  }

  /// Redirect event delivery onto `scheduler`.
  ///
  /// Per-observer ordering is preserved only on serial schedulers such as
  /// [`ConfinedScheduler`].
  ///
  /// [`ConfinedScheduler`]: crate::scheduler::ConfinedScheduler
  fn observe_on<SD>(self, scheduler: SD) -> crate::ops::observe_on::ObserveOnOp<Self, SD> {
    crate::ops::observe_on::ObserveOnOp { source: self, scheduler }
  }

  /// Multicast this observable behind one reference-counted upstream
  /// subscription, replaying the most recent value to late subscribers.
  fn share_latest(self) -> crate::ops::share_latest::ShareLatest<Item, Err>
  where
    Self: Send + Sync + 'static,
    Item: Clone + Send + 'static,
    Err: Clone + Send + 'static,
  {
    crate::ops::share_latest::ShareLatest::new(Arc::new(self))
  }

  /// Log the subscription lifecycle and every event under `ident`, and track
  /// the live sink for leak reporting. Pure side channel: the event sequence
  /// is untouched.
  fn debug(self, ident: &str) -> crate::ops::debug::DebugOp<Self> {
    self.debug_with(crate::ops::debug::DebugConfig {
      ident: Some(ident.to_owned()),
      ..Default::default()
    })
  }

  /// [`debug`](ObservableExt::debug) with full control over the identifier,
  /// source location and output truncation.
  fn debug_with(self, config: crate::ops::debug::DebugConfig) -> crate::ops::debug::DebugOp<Self> {
    crate::ops::debug::DebugOp::new(self, config)
  }

  fn box_it(self) -> BoxObservable<Item, Err>
  where
    Self: Send + Sync + 'static,
    Item: 'static,
    Err: 'static,
  {
    Box::new(self)
  }
}

impl<Item, Err, T: Observable<Item, Err>> ObservableExt<Item, Err> for T {}

#[cfg(test)]
mod test {
  use std::sync::{Arc, Mutex};

  use super::*;
  use crate::disposable::NopDisposable;

  #[test]
  fn ordered_next_then_complete_then_silence() {
    let seen = Arc::new(Mutex::new(vec![]));
    let seen_c = seen.clone();
    let source = create(|mut subscriber| {
      for i in 0..5 {
        subscriber.next(i);
      }
      subscriber.complete();
      subscriber.next(99);
      Box::new(NopDisposable) as BoxDisposable
    });
    let mut sub = source.subscribe_all(
      move |v| seen_c.lock().unwrap().push(Event::<i32, ()>::Next(v)),
      |_: ()| {},
      {
        let seen = seen.clone();
        move || seen.lock().unwrap().push(Event::Completed)
      },
    );
    sub.dispose();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 6);
    assert_eq!(
      *seen,
      vec![
        Event::Next(0),
        Event::Next(1),
        Event::Next(2),
        Event::Next(3),
        Event::Next(4),
        Event::Completed
      ]
    );
  }

  #[test]
  fn each_subscribe_is_a_fresh_production() {
    let productions = Arc::new(Mutex::new(0));
    let p = productions.clone();
    let source = create(move |mut subscriber: crate::sink::Subscriber<i32, ()>| {
      *p.lock().unwrap() += 1;
      subscriber.next(1);
      subscriber.complete();
      Box::new(NopDisposable) as BoxDisposable
    });
    source.subscribe(|_| {});
    source.subscribe(|_| {});
    assert_eq!(*productions.lock().unwrap(), 2);
  }

  #[test]
  fn boxed_observable_round_trip() {
    let total = Arc::new(Mutex::new(0));
    let t = total.clone();
    let boxed = from_iter::<_, ()>(1..=4).box_it();
    boxed.subscribe(move |v| *t.lock().unwrap() += v);
    assert_eq!(*total.lock().unwrap(), 10);
  }
}
