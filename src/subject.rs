//! Thread-safe multicast subject.
//!
//! A `Subject` is both observer and observable: events pushed into it are
//! broadcast to every current subscriber. The observer list is snapshotted
//! under the lock and delivery happens outside it, so a subscriber that
//! disposes (even its own subscription) from inside a callback cannot
//! deadlock the hub.

use std::sync::{Arc, Mutex};

use crate::{
  disposable::Disposable,
  event::{Event, Terminal},
  observable::Observable,
  observer::Observer,
  sink::{Sink, Subscriber},
};

pub struct Subject<Item, Err> {
  inner: Arc<Mutex<Inner<Item, Err>>>,
}

struct Inner<Item, Err> {
  observers: Vec<(u64, Subscriber<Item, Err>)>,
  next_key: u64,
  done: Option<Terminal<Err>>,
}

impl<Item, Err> Clone for Subject<Item, Err> {
  fn clone(&self) -> Self { Self { inner: self.inner.clone() } }
}

impl<Item, Err> Default for Subject<Item, Err> {
  fn default() -> Self { Self::new() }
}

impl<Item, Err> Subject<Item, Err> {
  pub fn new() -> Self {
    Self {
      inner: Arc::new(Mutex::new(Inner {
        observers: Vec::new(),
        next_key: 0,
        done: None,
      })),
    }
  }

  /// Number of currently attached subscribers.
  pub fn observer_count(&self) -> usize { self.inner.lock().unwrap().observers.len() }

  /// `true` once a terminal event has been pushed.
  pub fn is_done(&self) -> bool { self.inner.lock().unwrap().done.is_some() }
}

impl<Item, Err> Observer<Item, Err> for Subject<Item, Err>
where
  Item: Clone,
  Err: Clone,
{
  fn on(&mut self, event: Event<Item, Err>) {
    match event {
      Event::Next(value) => {
        let sinks: Vec<_> = {
          let mut inner = self.inner.lock().unwrap();
          if inner.done.is_some() {
            return;
          }
          inner.observers.retain(|(_, s)| !s.is_stopped());
          inner.observers.iter().map(|(_, s)| s.clone()).collect()
        };
        for mut sink in sinks {
          sink.next(value.clone());
        }
      }
      terminal => {
        let terminal = match terminal {
          Event::Error(e) => Terminal::Error(e),
          _ => Terminal::Completed,
        };
        let drained = {
          let mut inner = self.inner.lock().unwrap();
          if inner.done.is_some() {
            return;
          }
          inner.done = Some(terminal.clone());
          std::mem::take(&mut inner.observers)
        };
        for (_, mut sink) in drained {
          sink.on(terminal.clone().into_event());
        }
      }
    }
  }

  fn is_closed(&self) -> bool { self.inner.lock().unwrap().done.is_some() }
}

impl<Item, Err> Observable<Item, Err> for Subject<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  type Unsub = SubjectSubscription<Item, Err>;

  fn actual_subscribe<O>(&self, observer: O) -> Self::Unsub
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    let mut sink: Subscriber<Item, Err> = Sink::new(Box::new(observer));
    let registered = {
      let mut inner = self.inner.lock().unwrap();
      match &inner.done {
        Some(terminal) => Err(terminal.clone()),
        None => {
          let key = inner.next_key;
          inner.next_key += 1;
          inner.observers.push((key, sink.clone()));
          Ok(key)
        }
      }
    };
    match registered {
      Ok(key) => SubjectSubscription { key: Some(key), inner: self.inner.clone(), sink },
      Err(terminal) => {
        // The sequence already finished: late subscribers receive the stored
        // terminal immediately.
        sink.on(terminal.into_event());
        SubjectSubscription { key: None, inner: self.inner.clone(), sink }
      }
    }
  }
}

pub struct SubjectSubscription<Item, Err> {
  key: Option<u64>,
  inner: Arc<Mutex<Inner<Item, Err>>>,
  sink: Subscriber<Item, Err>,
}

impl<Item, Err> Disposable for SubjectSubscription<Item, Err> {
  fn dispose(&mut self) {
    self.sink.dispose();
    if let Some(key) = self.key.take() {
      self.inner.lock().unwrap().observers.retain(|(k, _)| *k != key);
    }
  }

  fn is_disposed(&self) -> bool { self.sink.is_disposed() }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::observable::ObservableExt;

  #[test]
  fn broadcasts_to_all_subscribers() {
    let mut subject = Subject::<i32, ()>::new();
    let a = Arc::new(Mutex::new(vec![]));
    let b = Arc::new(Mutex::new(vec![]));
    let a_c = a.clone();
    let b_c = b.clone();
    subject.subscribe(move |v| a_c.lock().unwrap().push(v));
    subject.subscribe(move |v| b_c.lock().unwrap().push(v));

    subject.next(1);
    subject.next(2);
    assert_eq!(*a.lock().unwrap(), vec![1, 2]);
    assert_eq!(*b.lock().unwrap(), vec![1, 2]);
  }

  #[test]
  fn disposed_subscription_receives_nothing_more() {
    let mut subject = Subject::<i32, ()>::new();
    let seen = Arc::new(Mutex::new(vec![]));
    let s = seen.clone();
    let mut sub = subject.subscribe(move |v| s.lock().unwrap().push(v));
    subject.next(1);
    sub.dispose();
    subject.next(2);
    assert_eq!(*seen.lock().unwrap(), vec![1]);
  }

  #[test]
  fn terminal_drains_and_is_replayed_to_late_subscribers() {
    let mut subject = Subject::<i32, &'static str>::new();
    subject.error("boom");
    assert_eq!(subject.observer_count(), 0);

    let late = Arc::new(Mutex::new(None));
    let l = late.clone();
    subject.subscribe_all(|_| {}, move |e| *l.lock().unwrap() = Some(e), || {});
    assert_eq!(*late.lock().unwrap(), Some("boom"));
    // Nothing further after the terminal.
    subject.next(3);
    assert_eq!(subject.observer_count(), 0);
  }

  #[test]
  fn subscriber_disposing_itself_inside_callback() {
    let mut subject = Subject::<i32, ()>::new();
    let slot: Arc<Mutex<Option<SubjectSubscription<i32, ()>>>> = Arc::new(Mutex::new(None));
    let slot_c = slot.clone();
    let seen = Arc::new(Mutex::new(vec![]));
    let s = seen.clone();
    let sub = subject.actual_subscribe(crate::observer::FnObserver::new(move |e| {
      if let Event::Next(v) = e {
        s.lock().unwrap().push(v);
        if let Some(mut d) = slot_c.lock().unwrap().take() {
          d.dispose();
        }
      }
    }));
    *slot.lock().unwrap() = Some(sub);
    subject.next(1);
    subject.next(2);
    assert_eq!(*seen.lock().unwrap(), vec![1]);
  }
}
