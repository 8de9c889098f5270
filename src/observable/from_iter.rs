//! Observable over a cloneable iterator.

use std::marker::PhantomData;

use crate::{
  observable::Observable,
  observer::Observer,
  sink::{Sink, Subscriber},
};

/// Emits every item of the iterator, then completes, see [`from_iter`].
#[derive(Clone)]
pub struct FromIter<Iter, Err> {
  iter: Iter,
  _marker: PhantomData<fn(Err)>,
}

/// Build an observable from anything iterable.
///
/// The iterable is cloned for each subscription, keeping productions
/// independent. Emission stops early once the subscription is disposed.
pub fn from_iter<Iter, Err>(iter: Iter) -> FromIter<Iter, Err>
where
  Iter: IntoIterator + Clone,
{
  FromIter { iter, _marker: PhantomData }
}

impl<Iter, Err> Observable<Iter::Item, Err> for FromIter<Iter, Err>
where
  Iter: IntoIterator + Clone,
  Iter::Item: 'static,
  Err: 'static,
{
  type Unsub = Subscriber<Iter::Item, Err>;

  fn actual_subscribe<O>(&self, observer: O) -> Self::Unsub
  where
    O: Observer<Iter::Item, Err> + Send + 'static,
  {
    let mut sink: Subscriber<Iter::Item, Err> = Sink::new(Box::new(observer));
    for value in self.iter.clone() {
      if sink.is_closed() {
        break;
      }
      sink.next(value);
    }
    sink.complete();
    sink
  }
}

#[cfg(test)]
mod test {
  use std::sync::{Arc, Mutex};

  use super::*;
  use crate::observable::ObservableExt;

  #[test]
  fn emits_all_in_order_then_completes() {
    let seen = Arc::new(Mutex::new(vec![]));
    let s = seen.clone();
    let completed = Arc::new(Mutex::new(false));
    let c = completed.clone();
    from_iter::<_, ()>(0..5).subscribe_all(
      move |v| s.lock().unwrap().push(v),
      |_| {},
      move || *c.lock().unwrap() = true,
    );
    assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    assert!(*completed.lock().unwrap());
  }

  #[test]
  fn stops_emitting_once_disposed() {
    use crate::{disposable::Disposable, event::Event, observer::FnObserver};

    let seen = Arc::new(Mutex::new(vec![]));
    let s = seen.clone();
    // Dispose from inside the third delivery; the iterator must stop.
    let slot: Arc<Mutex<Option<Subscriber<i32, ()>>>> = Arc::new(Mutex::new(None));
    let slot_c = slot.clone();
    let sink: Subscriber<i32, ()> = Sink::new(Box::new(FnObserver::new(move |e| {
      if let Event::Next(v) = e {
        s.lock().unwrap().push(v);
        if v == 2 {
          if let Some(mut d) = slot_c.lock().unwrap().take() {
            d.dispose();
          }
        }
      }
    })));
    *slot.lock().unwrap() = Some(sink.clone());
    from_iter::<_, ()>(0..100).actual_subscribe(sink);
    assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
  }
}
