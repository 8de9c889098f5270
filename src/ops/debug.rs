//! Debug instrumentation: lifecycle + event logging and leak tracking.
//!
//! The operator is a pure side channel. It logs `subscribed`, every event and
//! `disposed` under an identifier, and keeps a token in the leak registry for
//! exactly as long as the subscription lives, while forwarding the event
//! sequence completely unchanged.

use std::{
  fmt::{self, Debug},
  panic::{catch_unwind, AssertUnwindSafe},
  sync::Arc,
};

use crate::{
  disposable::CompositeDisposable,
  event::Event,
  leak::{self, TrackToken},
  observable::Observable,
  observer::Observer,
  sink::{Sink, Subscriber},
};

const TRIM_THRESHOLD: usize = 64;

/// Where in the code a `debug` operator was applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceLocation {
  pub file: &'static str,
  pub line: u32,
}

impl Default for SourceLocation {
  fn default() -> Self { Self { file: "<unknown>", line: 0 } }
}

impl fmt::Display for SourceLocation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.file, self.line)
  }
}

/// Configuration for [`debug_with`](crate::observable::ObservableExt::debug_with).
#[derive(Clone, Debug, Default)]
pub struct DebugConfig {
  /// Identifier for log lines and the leak registry. Falls back to the
  /// source location when absent.
  pub ident: Option<String>,
  pub location: SourceLocation,
  /// Shorten long rendered values around a midpoint ellipsis.
  pub trim_output: bool,
}

/// See [`ObservableExt::debug`](crate::observable::ObservableExt::debug).
#[derive(Clone)]
pub struct DebugOp<S> {
  source: S,
  ident: Arc<str>,
  trim: bool,
}

impl<S> DebugOp<S> {
  pub fn new(source: S, config: DebugConfig) -> Self {
    let ident: Arc<str> = match config.ident {
      Some(ident) => Arc::from(ident.as_str()),
      None => Arc::from(config.location.to_string().as_str()),
    };
    Self { source, ident, trim: config.trim_output }
  }
}

impl<Item, Err, S> Observable<Item, Err> for DebugOp<S>
where
  S: Observable<Item, Err>,
  Item: Debug + 'static,
  Err: Debug + 'static,
{
  type Unsub = CompositeDisposable;

  fn actual_subscribe<O>(&self, observer: O) -> Self::Unsub
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    let ident = self.ident.clone();
    tracing::debug!(target: "rivulet::debug", ident = %ident, "subscribed");

    let token = Arc::new(TrackToken { ident: ident.clone() });
    leak::register(&token);
    let teardown_ident = ident.clone();
    let sink: Subscriber<Item, Err> = Sink::with_teardown(Box::new(observer), move || {
      leak::unregister(&token);
      tracing::debug!(target: "rivulet::debug", ident = %teardown_ident, "disposed");
    });

    let unsub = CompositeDisposable::new();
    unsub.add(sink.clone());
    unsub.add(self.source.actual_subscribe(DebugObserver {
      sink,
      ident,
      trim: self.trim,
    }));
    unsub
  }
}

struct DebugObserver<Item, Err> {
  sink: Subscriber<Item, Err>,
  ident: Arc<str>,
  trim: bool,
}

impl<Item, Err> Observer<Item, Err> for DebugObserver<Item, Err>
where
  Item: Debug,
  Err: Debug,
{
  fn on(&mut self, event: Event<Item, Err>) {
    if self.sink.is_stopped() {
      return;
    }
    // Rendering happens behind catch_unwind so a panicking Debug impl can
    // degrade the log line without disturbing delivery.
    let rendered = catch_unwind(AssertUnwindSafe(|| match &event {
      Event::Next(v) => format!("next({v:?})"),
      Event::Completed => "completed".to_owned(),
      Event::Error(e) => format!("error({e:?})"),
    }))
    .unwrap_or_else(|_| "<unprintable event>".to_owned());
    let rendered = if self.trim {
      truncate_middle(&rendered, TRIM_THRESHOLD)
    } else {
      rendered
    };
    tracing::debug!(target: "rivulet::debug", ident = %self.ident, event = %rendered);
    self.sink.on(event);
  }

  fn is_closed(&self) -> bool { self.sink.is_stopped() }
}

/// Shorten `s` to at most `max` characters around a midpoint ellipsis,
/// respecting char boundaries.
fn truncate_middle(s: &str, max: usize) -> String {
  let len = s.chars().count();
  if len <= max {
    return s.to_owned();
  }
  let keep = max.saturating_sub(3);
  let head = keep / 2 + keep % 2;
  let tail = keep / 2;
  let mut out = String::with_capacity(max);
  out.extend(s.chars().take(head));
  out.push_str("...");
  out.extend(s.chars().skip(len - tail));
  out
}

#[cfg(test)]
mod test {
  use std::sync::{Arc, Mutex};

  use super::*;
  use crate::observable::{empty, from_iter, throw, ObservableExt};

  #[test]
  fn forwards_the_sequence_unchanged() {
    let seen = Arc::new(Mutex::new(vec![]));
    let s = seen.clone();
    from_iter::<_, ()>(0..3).debug("fwd-values").subscribe_observer(
      crate::observer::FnObserver::new(move |e| s.lock().unwrap().push(e)),
    );
    assert_eq!(
      *seen.lock().unwrap(),
      vec![
        Event::Next(0),
        Event::Next(1),
        Event::Next(2),
        Event::Completed
      ]
    );
  }

  #[test]
  fn forwards_empty_and_error_sequences() {
    let completed = Arc::new(Mutex::new(false));
    let c = completed.clone();
    empty::<i32, ()>()
      .debug("fwd-empty")
      .subscribe_all(|_| {}, |_| {}, move || *c.lock().unwrap() = true);
    assert!(*completed.lock().unwrap());

    let errored = Arc::new(Mutex::new(None));
    let e = errored.clone();
    throw::<i32, _>("boom")
      .debug("fwd-error")
      .subscribe_all(|_| {}, move |err| *e.lock().unwrap() = Some(err), || {});
    assert_eq!(*errored.lock().unwrap(), Some("boom"));
  }

  #[test]
  fn transparent_for_disposed_infinite_sequences() {
    use std::thread;

    use crate::disposable::{ActionDisposable, BoxDisposable, Disposable};

    let live_count = || {
      crate::leak::live_subscriptions()
        .into_iter()
        .find(|(i, _)| i == "fwd-infinite")
        .map(|(_, c)| c)
        .unwrap_or(0)
    };

    let source = crate::observable::create(|s: Subscriber<u64, ()>| {
      let mut s = s;
      let handle = thread::spawn(move || {
        let mut i = 0u64;
        while !s.is_stopped() {
          s.next(i);
          i += 1;
        }
      });
      let join = Arc::new(Mutex::new(Some(handle)));
      Box::new(ActionDisposable::new(move || {
        if let Some(h) = join.lock().unwrap().take() {
          let _ = h.join();
        }
      })) as BoxDisposable
    });

    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_c = seen.clone();
    let mut sub = source
      .debug("fwd-infinite")
      .subscribe(move |v| seen_c.lock().unwrap().push(v));
    while seen.lock().unwrap().is_empty() {
      thread::yield_now();
    }
    assert_eq!(live_count(), 1);

    // Dispose joins the producer, so delivery has fully stopped once it
    // returns; the instrumentation must have let everything through and
    // released its tracking entry.
    sub.dispose();
    let seen = seen.lock().unwrap();
    assert!(!seen.is_empty());
    assert!(seen.iter().copied().eq(0..seen.len() as u64));
    assert_eq!(live_count(), 0);
  }

  #[test]
  fn truncation_is_char_boundary_safe() {
    assert_eq!(truncate_middle("short", 64), "short");
    let long: String = "a".repeat(100);
    let trimmed = truncate_middle(&long, 64);
    assert_eq!(trimmed.chars().count(), 64);
    assert!(trimmed.contains("..."));
    // Multi-byte chars must not be split.
    let wide: String = "é".repeat(100);
    let trimmed = truncate_middle(&wide, 10);
    assert_eq!(trimmed.chars().count(), 10);
  }
}
