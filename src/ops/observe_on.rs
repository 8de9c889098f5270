//! Re-dispatch event delivery onto a scheduler.

use crate::{
  disposable::CompositeDisposable,
  event::Event,
  observable::Observable,
  observer::Observer,
  scheduler::Scheduler,
  sink::{Sink, Subscriber},
};

/// See [`ObservableExt::observe_on`](crate::observable::ObservableExt::observe_on).
#[derive(Clone)]
pub struct ObserveOnOp<S, SD> {
  pub(crate) source: S,
  pub(crate) scheduler: SD,
}

impl<Item, Err, S, SD> Observable<Item, Err> for ObserveOnOp<S, SD>
where
  S: Observable<Item, Err>,
  SD: Scheduler + Clone + Send + Sync + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
{
  type Unsub = CompositeDisposable;

  fn actual_subscribe<O>(&self, observer: O) -> Self::Unsub
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    let sink: Subscriber<Item, Err> = Sink::new(Box::new(observer));
    let unsub = CompositeDisposable::new();
    unsub.add(sink.clone());
    unsub.add(self.source.actual_subscribe(ObserveOnObserver {
      sink,
      scheduler: self.scheduler.clone(),
    }));
    unsub
  }
}

struct ObserveOnObserver<Item, Err, SD> {
  sink: Subscriber<Item, Err>,
  scheduler: SD,
}

impl<Item, Err, SD> Observer<Item, Err> for ObserveOnObserver<Item, Err, SD>
where
  SD: Scheduler,
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn on(&mut self, event: Event<Item, Err>) {
    if self.sink.is_stopped() {
      return;
    }
    // The sink re-checks its flag at execution time, so events already queued
    // when the subscription is disposed are dropped, not delivered.
    let mut sink = self.sink.clone();
    self.scheduler.schedule(Box::new(move || sink.on(event)));
  }

  fn is_closed(&self) -> bool { self.sink.is_stopped() }
}
