//! Trivial single-event sources: `of`, `empty`, `throw`.

use std::marker::PhantomData;

use crate::{
  observable::Observable,
  observer::Observer,
  sink::{Sink, Subscriber},
};

/// Emits one value, then completes.
#[derive(Clone)]
pub struct Of<Item, Err> {
  value: Item,
  _marker: PhantomData<fn(Err)>,
}

pub fn of<Item: Clone, Err>(value: Item) -> Of<Item, Err> {
  Of { value, _marker: PhantomData }
}

impl<Item, Err> Observable<Item, Err> for Of<Item, Err>
where
  Item: Clone + 'static,
  Err: 'static,
{
  type Unsub = Subscriber<Item, Err>;

  fn actual_subscribe<O>(&self, observer: O) -> Self::Unsub
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    let mut sink: Subscriber<Item, Err> = Sink::new(Box::new(observer));
    sink.next(self.value.clone());
    sink.complete();
    sink
  }
}

/// Completes immediately without emitting.
#[derive(Clone, Copy)]
pub struct Empty<Item, Err>(PhantomData<fn(Item, Err)>);

pub fn empty<Item, Err>() -> Empty<Item, Err> { Empty(PhantomData) }

impl<Item: 'static, Err: 'static> Observable<Item, Err> for Empty<Item, Err> {
  type Unsub = Subscriber<Item, Err>;

  fn actual_subscribe<O>(&self, observer: O) -> Self::Unsub
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    let mut sink: Subscriber<Item, Err> = Sink::new(Box::new(observer));
    sink.complete();
    sink
  }
}

/// Errors immediately without emitting.
#[derive(Clone)]
pub struct Throw<Item, Err> {
  err: Err,
  _marker: PhantomData<fn(Item)>,
}

pub fn throw<Item, Err: Clone>(err: Err) -> Throw<Item, Err> {
  Throw { err, _marker: PhantomData }
}

impl<Item, Err> Observable<Item, Err> for Throw<Item, Err>
where
  Item: 'static,
  Err: Clone + 'static,
{
  type Unsub = Subscriber<Item, Err>;

  fn actual_subscribe<O>(&self, observer: O) -> Self::Unsub
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    let mut sink: Subscriber<Item, Err> = Sink::new(Box::new(observer));
    sink.error(self.err.clone());
    sink
  }
}
