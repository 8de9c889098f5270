//! Observer trait and adapters.
//!
//! An `Observer` is the consumer half of the push protocol: it exposes a
//! single operation, [`Observer::on`], receiving the [`Event`] union. The
//! `next`/`error`/`complete` conveniences all funnel into `on`.

use std::marker::PhantomData;

use crate::event::Event;

/// Consumer of an observable sequence.
///
/// The trait is stateless as a contract: it holds no reference to its
/// upstream and makes no promise beyond accepting events. Delivery ordering
/// and terminal-once are the producer's (and [`Sink`]'s) responsibility.
///
/// [`Sink`]: crate::sink::Sink
pub trait Observer<Item, Err> {
  /// Receive one event.
  fn on(&mut self, event: Event<Item, Err>);

  /// Receive the next value.
  #[inline]
  fn next(&mut self, value: Item) { self.on(Event::Next(value)); }

  /// Receive the error terminal.
  #[inline]
  fn error(&mut self, err: Err) { self.on(Event::Error(err)); }

  /// Receive the completion terminal.
  #[inline]
  fn complete(&mut self) { self.on(Event::Completed); }

  /// `true` once this observer will accept no further events.
  ///
  /// Synchronous sources use this to stop emitting early when the
  /// subscription downstream of them has been disposed.
  #[inline]
  fn is_closed(&self) -> bool { false }
}

/// Boxed observer usable across threads.
pub type BoxObserver<Item, Err> = Box<dyn Observer<Item, Err> + Send>;

impl<Item, Err, T: Observer<Item, Err> + ?Sized> Observer<Item, Err> for Box<T> {
  #[inline]
  fn on(&mut self, event: Event<Item, Err>) { (**self).on(event) }

  #[inline]
  fn is_closed(&self) -> bool { (**self).is_closed() }
}

/// Closure adapter: any `FnMut(Event)` is an observer.
///
/// This is what `subscribe(|v| ...)` style attachment builds on.
pub struct FnObserver<F, Item, Err> {
  f: F,
  _marker: PhantomData<fn(Item, Err)>,
}

impl<F, Item, Err> FnObserver<F, Item, Err>
where
  F: FnMut(Event<Item, Err>),
{
  pub fn new(f: F) -> Self { Self { f, _marker: PhantomData } }
}

impl<F, Item, Err> Observer<Item, Err> for FnObserver<F, Item, Err>
where
  F: FnMut(Event<Item, Err>),
{
  #[inline]
  fn on(&mut self, event: Event<Item, Err>) { (self.f)(event) }
}

/// Observer from split next/error/complete closures.
pub fn observer_from_parts<Item, Err, N, E, C>(
  mut next: N,
  mut error: E,
  mut complete: C,
) -> FnObserver<impl FnMut(Event<Item, Err>), Item, Err>
where
  N: FnMut(Item),
  E: FnMut(Err),
  C: FnMut(),
{
  FnObserver::new(move |event| match event {
    Event::Next(v) => next(v),
    Event::Error(e) => error(e),
    Event::Completed => complete(),
  })
}

/// An ordered sequence of destinations.
///
/// Every event is delivered to each destination in sequence order before the
/// next event is accepted, so all destinations observe the same sequence.
pub struct Fanout<O>(pub Vec<O>);

impl<O, Item, Err> Observer<Item, Err> for Fanout<O>
where
  O: Observer<Item, Err>,
  Item: Clone,
  Err: Clone,
{
  fn on(&mut self, event: Event<Item, Err>) {
    for observer in &mut self.0 {
      observer.on(event.clone());
    }
  }

  fn is_closed(&self) -> bool { self.0.iter().all(Observer::is_closed) }
}
