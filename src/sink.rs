//! Sink: the base consumer every operator and terminal subscriber builds on.
//!
//! A sink owns its downstream observer behind a shared slot and a one-way
//! `stopped` flag. It mechanically enforces the two invariants the event
//! channel contract leaves to consumers:
//!
//! * terminal-once — after a `Completed`/`Error` has been forwarded, or
//!   after external disposal, no event reaches the downstream observer;
//! * idempotent disposal — the disposed transition happens once, from any
//!   thread, and runs the sink-specific teardown exactly once.
//!
//! Delivery takes the observer out of its slot before invoking it, so a
//! downstream callback that re-enters `dispose` never deadlocks against the
//! slot lock.

use std::sync::{
  atomic::{AtomicBool, Ordering},
  Arc, Mutex,
};

use crate::{
  disposable::Disposable,
  event::Event,
  observer::{BoxObserver, Observer},
};

type Teardown = Box<dyn FnOnce() + Send>;

/// Clone-shared consumer core wrapping a downstream observer.
pub struct Sink<O> {
  observer: Arc<Mutex<Option<O>>>,
  stopped: Arc<AtomicBool>,
  teardown: Arc<Mutex<Option<Teardown>>>,
}

impl<O> Clone for Sink<O> {
  fn clone(&self) -> Self {
    Self {
      observer: self.observer.clone(),
      stopped: self.stopped.clone(),
      teardown: self.teardown.clone(),
    }
  }
}

impl<O> Sink<O> {
  pub fn new(observer: O) -> Self {
    Self {
      observer: Arc::new(Mutex::new(Some(observer))),
      stopped: Arc::new(AtomicBool::new(false)),
      teardown: Arc::new(Mutex::new(None)),
    }
  }

  /// A sink whose teardown runs exactly once when it is disposed, whether by
  /// a terminal event or by external cancellation.
  pub fn with_teardown(observer: O, teardown: impl FnOnce() + Send + 'static) -> Self {
    let sink = Self::new(observer);
    *sink.teardown.lock().unwrap() = Some(Box::new(teardown));
    sink
  }

  /// `true` once the sink has been stopped by a terminal event or disposal.
  #[inline]
  pub fn is_stopped(&self) -> bool { self.stopped.load(Ordering::Acquire) }
}

impl<Item, Err, O> Observer<Item, Err> for Sink<O>
where
  O: Observer<Item, Err>,
{
  fn on(&mut self, event: Event<Item, Err>) {
    if self.is_stopped() {
      return;
    }
    let taken = self.observer.lock().unwrap().take();
    let Some(mut observer) = taken else {
      // Another delivery is in flight or disposal won the race.
      return;
    };
    let terminal = event.is_terminal();
    observer.on(event);
    if terminal {
      self.dispose();
    } else if !self.is_stopped() {
      *self.observer.lock().unwrap() = Some(observer);
    }
    // If disposal raced the delivery the observer is simply dropped here;
    // dispose() already ran the teardown.
  }

  fn is_closed(&self) -> bool {
    self.is_stopped()
      || self
        .observer
        .lock()
        .unwrap()
        .as_ref()
        .map_or(true, |o| o.is_closed())
  }
}

impl<O> Disposable for Sink<O> {
  fn dispose(&mut self) {
    if self.stopped.swap(true, Ordering::AcqRel) {
      return;
    }
    let observer = self.observer.lock().unwrap().take();
    drop(observer);
    let teardown = self.teardown.lock().unwrap().take();
    if let Some(teardown) = teardown {
      teardown();
    }
  }

  #[inline]
  fn is_disposed(&self) -> bool { self.is_stopped() }
}

/// The emitter handle a `create` producer drives.
pub type Subscriber<Item, Err> = Sink<BoxObserver<Item, Err>>;

#[cfg(test)]
mod test {
  use std::sync::atomic::AtomicUsize;

  use super::*;

  fn collecting_sink(seen: Arc<Mutex<Vec<Event<i32, &'static str>>>>) -> Subscriber<i32, &'static str> {
    Sink::new(Box::new(crate::observer::FnObserver::new(move |e| {
      seen.lock().unwrap().push(e)
    })))
  }

  #[test]
  fn drops_events_after_terminal() {
    let seen = Arc::new(Mutex::new(vec![]));
    let mut sink = collecting_sink(seen.clone());
    sink.next(1);
    sink.complete();
    sink.next(2);
    sink.error("late");
    assert_eq!(*seen.lock().unwrap(), vec![Event::Next(1), Event::Completed]);
  }

  #[test]
  fn drops_events_after_dispose() {
    let seen = Arc::new(Mutex::new(vec![]));
    let mut sink = collecting_sink(seen.clone());
    sink.next(1);
    sink.dispose();
    sink.next(2);
    sink.complete();
    assert_eq!(*seen.lock().unwrap(), vec![Event::Next(1)]);
  }

  #[test]
  fn teardown_runs_once_for_terminal_then_dispose() {
    let count = Arc::new(AtomicUsize::new(0));
    let c = count.clone();
    let mut sink: Subscriber<i32, ()> = Sink::with_teardown(
      Box::new(crate::observer::FnObserver::new(|_| {})),
      move || {
        c.fetch_add(1, Ordering::SeqCst);
      },
    );
    sink.complete();
    sink.dispose();
    assert_eq!(count.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn reentrant_dispose_from_callback() {
    let slot: Arc<Mutex<Option<Subscriber<i32, ()>>>> = Arc::new(Mutex::new(None));
    let slot_c = slot.clone();
    let sink: Subscriber<i32, ()> =
      Sink::new(Box::new(crate::observer::FnObserver::new(move |_| {
        if let Some(mut inner) = slot_c.lock().unwrap().take() {
          inner.dispose();
        }
      })));
    *slot.lock().unwrap() = Some(sink.clone());
    let mut sink = sink;
    sink.next(1);
    assert!(sink.is_disposed());
  }
}
