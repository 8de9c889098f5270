//! Live-subscription tracking for the debug layer.
//!
//! Every `debug`-instrumented subscription registers a token here on attach
//! and unregisters it on disposal. Whatever is still registered is, by
//! definition, a subscription that was never released; dumping the registry
//! at a known-quiescent point is the leak check.

use std::{
  collections::BTreeMap,
  sync::{Arc, Mutex, Weak},
};

use once_cell::sync::Lazy;

/// Token owned by one instrumented subscription for its whole lifetime.
pub(crate) struct TrackToken {
  pub(crate) ident: Arc<str>,
}

struct Entry {
  ident: Arc<str>,
  token: Weak<TrackToken>,
}

static REGISTRY: Lazy<Mutex<Vec<Entry>>> = Lazy::new(|| Mutex::new(Vec::new()));
static IGNORED: Lazy<Mutex<Vec<String>>> = Lazy::new(|| Mutex::new(Vec::new()));

pub(crate) fn register(token: &Arc<TrackToken>) {
  REGISTRY.lock().unwrap().push(Entry {
    ident: token.ident.clone(),
    token: Arc::downgrade(token),
  });
}

pub(crate) fn unregister(token: &Arc<TrackToken>) {
  let target = Arc::downgrade(token);
  REGISTRY
    .lock()
    .unwrap()
    .retain(|entry| !entry.token.ptr_eq(&target));
}

/// Exclude identifiers starting with `prefix` from leak reports.
///
/// Intentionally permanent subscriptions (app-lifetime state feeds) register
/// their prefix once at startup so they stop drowning out real leaks.
pub fn ignore_ident_prefix(prefix: impl Into<String>) {
  IGNORED.lock().unwrap().push(prefix.into());
}

/// Snapshot of live instrumented subscriptions: `(ident, count)`, sorted by
/// identifier. Tokens whose subscription was dropped without a dispose are
/// pruned; ignored prefixes are filtered out.
pub fn live_subscriptions() -> Vec<(String, usize)> {
  let ignored = IGNORED.lock().unwrap().clone();
  let mut counts: BTreeMap<String, usize> = BTreeMap::new();
  {
    let mut registry = REGISTRY.lock().unwrap();
    registry.retain(|entry| entry.token.strong_count() > 0);
    for entry in registry.iter() {
      if ignored.iter().any(|p| entry.ident.starts_with(p.as_str())) {
        continue;
      }
      *counts.entry(entry.ident.to_string()).or_insert(0) += 1;
    }
  }
  counts.into_iter().collect()
}

/// Log every live instrumented subscription, one line per identifier.
pub fn print_live_subscriptions() {
  let live = live_subscriptions();
  if live.is_empty() {
    tracing::info!(target: "rivulet::leak", "no live tracked subscriptions");
    return;
  }
  for (ident, count) in live {
    tracing::info!(target: "rivulet::leak", %ident, count, "live subscription");
  }
}

/// Forget everything tracked so far, including ignore prefixes.
pub fn clear_tracked() {
  REGISTRY.lock().unwrap().clear();
  IGNORED.lock().unwrap().clear();
}
