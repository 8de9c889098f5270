//! The event union pushed from producers to observers.

/// A single notification pushed through an observable sequence.
///
/// A well-formed sequence delivers zero or more `Next` events followed by at
/// most one terminal event (`Completed` or `Error`). Once an observer
/// instance has seen a terminal event it sees nothing further; `Sink`
/// enforces this mechanically for every consumer built on it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event<Item, Err> {
  /// The next element of the sequence.
  Next(Item),
  /// Successful termination. No events follow.
  Completed,
  /// Failed termination. No events follow.
  Error(Err),
}

impl<Item, Err> Event<Item, Err> {
  /// `true` for `Completed` and `Error`.
  #[inline]
  pub fn is_terminal(&self) -> bool { !matches!(self, Event::Next(_)) }

  /// Returns the contained `Next` value, if any.
  #[inline]
  pub fn into_next(self) -> Option<Item> {
    match self {
      Event::Next(v) => Some(v),
      _ => None,
    }
  }
}

/// The stored outcome of a finished sequence.
///
/// Subjects and the shared-replay layer keep the terminal they saw so a late
/// subscriber receives it immediately instead of silence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Terminal<Err> {
  Completed,
  Error(Err),
}

impl<Err> Terminal<Err> {
  #[inline]
  pub fn into_event<Item>(self) -> Event<Item, Err> {
    match self {
      Terminal::Completed => Event::Completed,
      Terminal::Error(e) => Event::Error(e),
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn terminal_classification() {
    assert!(!Event::<i32, ()>::Next(1).is_terminal());
    assert!(Event::<i32, ()>::Completed.is_terminal());
    assert!(Event::<i32, &str>::Error("boom").is_terminal());
  }

  #[test]
  fn terminal_into_event() {
    assert_eq!(
      Terminal::<&str>::Completed.into_event::<i32>(),
      Event::Completed
    );
    assert_eq!(Terminal::Error("e").into_event::<i32>(), Event::Error("e"));
  }
}
