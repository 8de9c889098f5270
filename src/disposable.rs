//! Cancellation handles.
//!
//! A [`Disposable`] owns zero or more release-on-demand resources. Disposal
//! is idempotent from any thread: however many callers race `dispose`, the
//! underlying release runs exactly once. Release actions always run outside
//! the internal lock so a release that re-enters disposal cannot deadlock.

use std::{
  mem,
  sync::{Arc, Mutex},
};

use smallvec::SmallVec;

/// Handle for an in-flight resource or subscription.
pub trait Disposable {
  /// Release the owned resources. Idempotent and safe from any thread.
  fn dispose(&mut self);

  /// `true` once `dispose` has taken effect.
  fn is_disposed(&self) -> bool;
}

/// Boxed disposable usable across threads.
pub type BoxDisposable = Box<dyn Disposable + Send>;

impl<T: Disposable + ?Sized> Disposable for Box<T> {
  #[inline]
  fn dispose(&mut self) { (**self).dispose() }
  #[inline]
  fn is_disposed(&self) -> bool { (**self).is_disposed() }
}

/// Disposable for resources that need no release.
#[derive(Clone, Copy, Default, Debug)]
pub struct NopDisposable;

impl Disposable for NopDisposable {
  #[inline]
  fn dispose(&mut self) {}
  #[inline]
  fn is_disposed(&self) -> bool { true }
}

type ReleaseAction = Box<dyn FnOnce() + Send>;

/// Disposable created from a release action.
///
/// The action is stored in a lock-guarded slot; the first disposer takes it
/// out and runs it after the lock is released. Concurrent disposers observe
/// an empty slot and return.
#[derive(Clone)]
pub struct ActionDisposable(Arc<Mutex<Option<ReleaseAction>>>);

impl ActionDisposable {
  pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
    Self(Arc::new(Mutex::new(Some(Box::new(release)))))
  }
}

impl Disposable for ActionDisposable {
  fn dispose(&mut self) {
    let action = self.0.lock().unwrap().take();
    if let Some(action) = action {
      action();
    }
  }

  fn is_disposed(&self) -> bool { self.0.lock().unwrap().is_none() }
}

/// A dynamic group of child disposables released together.
///
/// Disposing the composite disposes every current child exactly once; a
/// child added afterwards is disposed synchronously before `add` returns, so
/// there is no window in which a resource can leak past its group.
#[derive(Clone, Default)]
pub struct CompositeDisposable(Arc<Mutex<Inner>>);

#[derive(Default)]
struct Inner {
  disposed: bool,
  children: SmallVec<[BoxDisposable; 1]>,
}

impl CompositeDisposable {
  pub fn new() -> Self { Self::default() }

  /// Register a child. If the composite is already disposed the child is
  /// disposed immediately instead of being stored.
  pub fn add(&self, child: impl Disposable + Send + 'static) {
    let child: BoxDisposable = Box::new(child);
    let rejected = {
      let mut inner = self.0.lock().unwrap();
      if inner.disposed {
        Some(child)
      } else {
        inner.children.retain(|c| !c.is_disposed());
        inner.children.push(child);
        None
      }
    };
    if let Some(mut child) = rejected {
      // Slot was already torn down; release outside the lock.
      child.dispose();
    }
  }

  /// Number of live children currently held.
  pub fn len(&self) -> usize { self.0.lock().unwrap().children.len() }

  pub fn is_empty(&self) -> bool { self.len() == 0 }
}

impl Disposable for CompositeDisposable {
  fn dispose(&mut self) {
    let children = {
      let mut inner = self.0.lock().unwrap();
      if inner.disposed {
        return;
      }
      inner.disposed = true;
      mem::take(&mut inner.children)
    };
    for mut child in children {
      child.dispose();
    }
  }

  fn is_disposed(&self) -> bool { self.0.lock().unwrap().disposed }
}

/// An RAII wrapper disposing the inner handle when dropped.
///
/// If you do not assign the guard to a variable it is dropped, and the
/// subscription disposed, immediately.
#[must_use]
pub struct DisposeGuard<T: Disposable>(pub(crate) T);

impl<T: Disposable> DisposeGuard<T> {
  pub fn new(disposable: T) -> Self { Self(disposable) }
}

impl<T: Disposable> Drop for DisposeGuard<T> {
  #[inline]
  fn drop(&mut self) { self.0.dispose() }
}

/// Convenience adapters available on every disposable.
pub trait DisposableExt: Disposable + Sized {
  /// Activates RAII behavior: `dispose` is called when the returned guard
  /// goes out of scope.
  fn dispose_when_dropped(self) -> DisposeGuard<Self> { DisposeGuard(self) }

  fn boxed(self) -> BoxDisposable
  where
    Self: Send + 'static,
  {
    Box::new(self)
  }
}

impl<T: Disposable + Sized> DisposableExt for T {}

#[cfg(test)]
mod test {
  use std::{
    sync::atomic::{AtomicUsize, Ordering},
    thread,
  };

  use super::*;

  #[test]
  fn action_runs_once() {
    let count = Arc::new(AtomicUsize::new(0));
    let c = count.clone();
    let mut d = ActionDisposable::new(move || {
      c.fetch_add(1, Ordering::SeqCst);
    });
    assert!(!d.is_disposed());
    d.dispose();
    d.dispose();
    assert!(d.is_disposed());
    assert_eq!(count.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn concurrent_dispose_runs_once() {
    for _ in 0..100 {
      let count = Arc::new(AtomicUsize::new(0));
      let c = count.clone();
      let d = ActionDisposable::new(move || {
        c.fetch_add(1, Ordering::SeqCst);
      });
      let mut d1 = d.clone();
      let mut d2 = d;
      let t1 = thread::spawn(move || d1.dispose());
      let t2 = thread::spawn(move || d2.dispose());
      t1.join().unwrap();
      t2.join().unwrap();
      assert_eq!(count.load(Ordering::SeqCst), 1);
    }
  }

  #[test]
  fn composite_disposes_each_child_once() {
    let count = Arc::new(AtomicUsize::new(0));
    let mut composite = CompositeDisposable::new();
    for _ in 0..3 {
      let c = count.clone();
      composite.add(ActionDisposable::new(move || {
        c.fetch_add(1, Ordering::SeqCst);
      }));
    }
    assert_eq!(composite.len(), 3);
    composite.dispose();
    composite.dispose();
    assert_eq!(count.load(Ordering::SeqCst), 3);
  }

  #[test]
  fn add_after_dispose_is_synchronous() {
    let mut composite = CompositeDisposable::new();
    composite.dispose();
    let count = Arc::new(AtomicUsize::new(0));
    let c = count.clone();
    composite.add(ActionDisposable::new(move || {
      c.fetch_add(1, Ordering::SeqCst);
    }));
    // The child must already be released when add returns.
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(composite.len(), 0);
  }

  #[test]
  fn reentrant_dispose_does_not_deadlock() {
    let composite = CompositeDisposable::new();
    let mut reenter = composite.clone();
    composite.add(ActionDisposable::new(move || reenter.dispose()));
    let mut composite = composite;
    composite.dispose();
    assert!(composite.is_disposed());
  }

  #[test]
  fn live_add_prunes_disposed_children() {
    let composite = CompositeDisposable::new();
    let mut early = ActionDisposable::new(|| {});
    composite.add(early.clone());
    early.dispose();
    composite.add(ActionDisposable::new(|| {}));
    assert_eq!(composite.len(), 1);
  }

  #[test]
  fn guard_disposes_on_drop() {
    let count = Arc::new(AtomicUsize::new(0));
    let c = count.clone();
    {
      let _guard = ActionDisposable::new(move || {
        c.fetch_add(1, Ordering::SeqCst);
      })
      .dispose_when_dropped();
    }
    assert_eq!(count.load(Ordering::SeqCst), 1);
  }
}
