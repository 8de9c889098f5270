//! Reference-counted multicast with replay of the most recent value.
//!
//! One upstream subscription is shared by every attached observer. The first
//! observer connects upstream, later ones piggyback and immediately receive
//! the latest value seen so far, and the last one to detach disconnects and
//! clears the cached value. A terminal event is latched: observers attaching
//! afterwards receive exactly that terminal and nothing else.
//!
//! An attaching observer is registered, under the state lock, before its
//! replay is delivered; events broadcast while the replay is still in flight
//! are buffered for that observer and flushed in order afterwards, so a new
//! observer never misses an emission that raced its attachment.

use std::sync::{Arc, Mutex};

use crate::{
  disposable::{BoxDisposable, Disposable},
  event::{Event, Terminal},
  observable::{ArcObservable, Observable},
  observer::Observer,
  sink::{Sink, Subscriber},
};

/// See [`ObservableExt::share_latest`](crate::observable::ObservableExt::share_latest).
pub struct ShareLatest<Item, Err> {
  source: ArcObservable<Item, Err>,
  state: Arc<Mutex<ShareState<Item, Err>>>,
}

impl<Item, Err> Clone for ShareLatest<Item, Err> {
  fn clone(&self) -> Self {
    Self { source: self.source.clone(), state: self.state.clone() }
  }
}

struct ShareState<Item, Err> {
  observers: Vec<ObserverEntry<Item, Err>>,
  next_key: u64,
  latest: Option<Item>,
  connection: Option<BoxDisposable>,
  stage: Stage<Err>,
  // Bumped every time the share falls back to `Idle`, so a forwarder
  // belonging to a torn-down connection can never poison a later one.
  generation: u64,
}

struct ObserverEntry<Item, Err> {
  key: u64,
  sink: Subscriber<Item, Err>,
  // `Some` while the owner's replay is still in flight; broadcasts land
  // here instead of the sink until the attach path flushes the buffer.
  pending: Option<Vec<Event<Item, Err>>>,
}

#[derive(Clone)]
enum Stage<Err> {
  Idle,
  Active,
  Done(Terminal<Err>),
}

impl<Item, Err> ShareLatest<Item, Err> {
  pub fn new(source: ArcObservable<Item, Err>) -> Self {
    Self {
      source,
      state: Arc::new(Mutex::new(ShareState {
        observers: Vec::new(),
        next_key: 0,
        latest: None,
        connection: None,
        stage: Stage::Idle,
        generation: 0,
      })),
    }
  }

  /// Number of currently attached observers.
  pub fn observer_count(&self) -> usize { self.state.lock().unwrap().observers.len() }

  /// `true` while an upstream subscription is held.
  pub fn is_connected(&self) -> bool { self.state.lock().unwrap().connection.is_some() }
}

impl<Item, Err> Observable<Item, Err> for ShareLatest<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  type Unsub = ShareSubscription<Item, Err>;

  fn actual_subscribe<O>(&self, observer: O) -> Self::Unsub
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    let mut sink: Subscriber<Item, Err> = Sink::new(Box::new(observer));

    // Registration and the latest-value snapshot happen under one lock
    // acquisition, so no broadcast can slip between them.
    let registered = {
      let mut state = self.state.lock().unwrap();
      if let Stage::Done(terminal) = &state.stage {
        // Latched terminal: deliver it and attach nothing.
        Err(terminal.clone())
      } else {
        let connect = matches!(state.stage, Stage::Idle);
        if connect {
          state.stage = Stage::Active;
        }
        let key = state.next_key;
        state.next_key += 1;
        state.observers.push(ObserverEntry {
          key,
          sink: sink.clone(),
          pending: Some(Vec::new()),
        });
        Ok((key, connect, state.generation, state.latest.clone()))
      }
    };
    let (key, connect, generation, latest) = match registered {
      Err(terminal) => {
        sink.on(terminal.into_event());
        return ShareSubscription { key: None, state: self.state.clone(), sink };
      }
      Ok(r) => r,
    };

    // Replay outside the lock; concurrent broadcasts pile up in the pending
    // buffer and are flushed, in order, right after.
    if let Some(value) = latest {
      sink.next(value);
    }
    self.flush_pending(key, &mut sink);

    if connect {
      let forward = ShareForward { state: self.state.clone(), generation };
      let connection = self.source.dyn_subscribe(Box::new(forward));
      // The upstream may have finished, or every observer may have detached,
      // during the synchronous part of the subscription.
      let stale = {
        let mut state = self.state.lock().unwrap();
        if matches!(state.stage, Stage::Done(_)) {
          Some(connection)
        } else if state.observers.is_empty() {
          state.stage = Stage::Idle;
          state.latest = None;
          state.generation += 1;
          Some(connection)
        } else {
          state.connection = Some(connection);
          None
        }
      };
      if let Some(mut stale) = stale {
        stale.dispose();
      }
    }

    ShareSubscription { key: Some(key), state: self.state.clone(), sink }
  }
}

impl<Item, Err> ShareLatest<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  /// Drain the entry's pending buffer, delivering outside the lock, until it
  /// is observed empty; only then does the entry switch to direct delivery.
  fn flush_pending(&self, key: u64, sink: &mut Subscriber<Item, Err>) {
    loop {
      let batch = {
        let mut state = self.state.lock().unwrap();
        let Some(pos) = state.observers.iter().position(|e| e.key == key) else {
          break;
        };
        let entry = &mut state.observers[pos];
        match entry.pending.as_mut() {
          None => break,
          Some(buffer) if buffer.is_empty() => {
            entry.pending = None;
            if matches!(state.stage, Stage::Done(_)) {
              // The buffered terminal has been delivered; drop the entry.
              state.observers.remove(pos);
            }
            break;
          }
          Some(buffer) => std::mem::take(buffer),
        }
      };
      for event in batch {
        sink.on(event);
      }
    }
  }
}

/// Forwards one upstream connection into the shared state.
struct ShareForward<Item, Err> {
  state: Arc<Mutex<ShareState<Item, Err>>>,
  generation: u64,
}

impl<Item, Err> Observer<Item, Err> for ShareForward<Item, Err>
where
  Item: Clone,
  Err: Clone,
{
  fn on(&mut self, event: Event<Item, Err>) {
    match event {
      Event::Next(value) => {
        let sinks: Vec<_> = {
          let mut state = self.state.lock().unwrap();
          if state.generation != self.generation || !matches!(state.stage, Stage::Active) {
            return;
          }
          state.latest = Some(value.clone());
          state.observers.retain(|e| !e.sink.is_stopped());
          state
            .observers
            .iter_mut()
            .filter_map(|e| match e.pending.as_mut() {
              Some(buffer) => {
                buffer.push(Event::Next(value.clone()));
                None
              }
              None => Some(e.sink.clone()),
            })
            .collect()
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
        let (direct, connection) = {
          let mut state = self.state.lock().unwrap();
          if state.generation != self.generation || !matches!(state.stage, Stage::Active) {
            return;
          }
          state.stage = Stage::Done(terminal.clone());
          state.latest = None;
          // Replaying entries get the terminal appended to their buffer and
          // stay registered until their own flush delivers it.
          let mut direct = Vec::new();
          state.observers.retain_mut(|e| match e.pending.as_mut() {
            Some(buffer) => {
              buffer.push(terminal.clone().into_event());
              true
            }
            None => {
              direct.push(e.sink.clone());
              false
            }
          });
          (direct, state.connection.take())
        };
        for mut sink in direct {
          sink.on(terminal.clone().into_event());
        }
        if let Some(mut connection) = connection {
          connection.dispose();
        }
      }
    }
  }

  fn is_closed(&self) -> bool {
    let state = self.state.lock().unwrap();
    state.generation != self.generation || !matches!(state.stage, Stage::Active)
  }
}

pub struct ShareSubscription<Item, Err> {
  key: Option<u64>,
  state: Arc<Mutex<ShareState<Item, Err>>>,
  sink: Subscriber<Item, Err>,
}

impl<Item, Err> Disposable for ShareSubscription<Item, Err> {
  fn dispose(&mut self) {
    self.sink.dispose();
    let Some(key) = self.key.take() else { return };
    let connection = {
      let mut state = self.state.lock().unwrap();
      state.observers.retain(|e| e.key != key);
      if state.observers.is_empty() && matches!(state.stage, Stage::Active) {
        // Last observer gone: disconnect and drop the cached value so a
        // later connection starts from a clean slate.
        state.stage = Stage::Idle;
        state.latest = None;
        state.generation += 1;
        state.connection.take()
      } else {
        None
      }
    };
    if let Some(mut connection) = connection {
      connection.dispose();
    }
  }

  fn is_disposed(&self) -> bool { self.sink.is_disposed() }
}
