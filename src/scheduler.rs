//! Scheduling and execution-context confinement.
//!
//! A [`Scheduler`] answers "run this task on my execution context"; it never
//! blocks the caller. An [`ExecutionContext`] is the validating half: a named
//! predicate answering "is the current thread that context?", used as an
//! attach-time precondition by consumers that promise confined delivery.

use std::{
  sync::{mpsc, Arc, Mutex},
  thread,
  thread::ThreadId,
};

type Task = Box<dyn FnOnce() + Send>;

/// Runs tasks on some execution context.
///
/// Ordering: only *serial* schedulers (one task at a time, submission order)
/// preserve per-observer event ordering when used with `observe_on`.
/// [`ConfinedScheduler`] and [`ImmediateScheduler`] are serial; a thread pool
/// is not.
pub trait Scheduler {
  fn schedule(&self, task: Task);
}

impl<S: Scheduler + ?Sized> Scheduler for Arc<S> {
  #[inline]
  fn schedule(&self, task: Task) { (**self).schedule(task) }
}

/// Runs tasks inline on the calling thread.
#[derive(Clone, Copy, Default)]
pub struct ImmediateScheduler;

impl Scheduler for ImmediateScheduler {
  #[inline]
  fn schedule(&self, task: Task) { task() }
}

/// A scheduler confined to one dedicated, named worker thread.
///
/// Tasks run on that thread in submission order. Dropping the last handle
/// closes the queue and lets the worker exit; tasks scheduled after that are
/// dropped.
#[derive(Clone)]
pub struct ConfinedScheduler {
  core: Arc<Core>,
}

struct Core {
  label: Arc<str>,
  sender: Mutex<mpsc::Sender<Task>>,
  thread_id: ThreadId,
}

impl ConfinedScheduler {
  pub fn new(label: &str) -> Self {
    let (sender, receiver) = mpsc::channel::<Task>();
    let handle = thread::Builder::new()
      .name(label.to_owned())
      .spawn(move || {
        while let Ok(task) = receiver.recv() {
          task();
        }
      })
      .expect("failed to spawn confined scheduler thread");
    let thread_id = handle.thread().id();
    Self {
      core: Arc::new(Core {
        label: Arc::from(label),
        sender: Mutex::new(sender),
        thread_id,
      }),
    }
  }

  pub fn label(&self) -> &str { &self.core.label }

  /// The execution context this scheduler's tasks run on.
  pub fn context(&self) -> ExecutionContext {
    ExecutionContext::thread(self.core.label.clone(), self.core.thread_id)
  }
}

impl Scheduler for ConfinedScheduler {
  fn schedule(&self, task: Task) {
    // A closed queue means the scheduler is shutting down; the task is
    // dropped, consistent with cooperative cancellation.
    let _ = self.core.sender.lock().unwrap().send(task);
  }
}

#[cfg(feature = "futures-scheduler")]
impl Scheduler for futures::executor::ThreadPool {
  fn schedule(&self, task: Task) { self.spawn_ok(async move { task() }) }
}

/// A named execution context with a pluggable membership predicate.
///
/// The predicate makes confinement checkable rather than merely documented:
/// consumers that declare "touch me only from context X" call
/// [`ensure_running_on`](ExecutionContext::ensure_running_on) at their
/// attachment point. This is a precondition check, not a hop; it never moves
/// execution anywhere.
#[derive(Clone)]
pub struct ExecutionContext {
  label: Arc<str>,
  matches: Arc<dyn Fn() -> bool + Send + Sync>,
}

impl ExecutionContext {
  pub fn new(label: impl Into<Arc<str>>, matches: impl Fn() -> bool + Send + Sync + 'static) -> Self {
    Self { label: label.into(), matches: Arc::new(matches) }
  }

  /// Context identified by thread identity.
  pub fn thread(label: impl Into<Arc<str>>, id: ThreadId) -> Self {
    Self::new(label, move || thread::current().id() == id)
  }

  /// Context of the calling thread.
  pub fn current_thread(label: impl Into<Arc<str>>) -> Self {
    Self::thread(label, thread::current().id())
  }

  pub fn label(&self) -> &str { &self.label }

  /// `true` when the caller is already on this context.
  pub fn currently_on(&self) -> bool { (self.matches)() }

  /// Assert the caller is on this context.
  ///
  /// Violations are programming mistakes, not runtime conditions, so this
  /// panics with `message` plus the required and actual contexts.
  #[track_caller]
  pub fn ensure_running_on(&self, message: &str) {
    if !self.currently_on() {
      let current = thread::current();
      panic!(
        "{message} (required execution context: `{}`, current thread: `{}`)",
        self.label,
        current.name().unwrap_or("<unnamed>"),
      );
    }
  }
}
