//! Rivulet is a push-based event-stream runtime: observables push
//! [`Event`](event::Event)s into observers, subscriptions are explicit
//! [`Disposable`](disposable::Disposable) resources, and delivery can be
//! confined to a named execution context.
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use rivulet::prelude::*;
//!
//! let total = Arc::new(Mutex::new(0));
//! let t = total.clone();
//! from_iter::<_, ()>(1..=3).subscribe(move |v| *t.lock().unwrap() += v);
//! assert_eq!(*total.lock().unwrap(), 6);
//! ```
//!
//! Higher layers build on the same core: [`Subject`](subject::Subject) for
//! manual multicast, [`ShareLatest`](ops::share_latest::ShareLatest) for
//! reference-counted sharing with replay, and [`Driver`](driver::Driver) for
//! context-confined, never-erroring UI state streams.

pub mod disposable;
pub mod driver;
pub mod event;
pub mod leak;
pub mod observable;
pub mod observer;
pub mod ops;
pub mod prelude;
pub mod scheduler;
pub mod sink;
pub mod subject;

pub use prelude::*;
