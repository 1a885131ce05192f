//! Per-key single flight.
//!
//! Concurrent callers asking for the same key share one execution of the work
//! and each receive a clone of its result, success or failure alike. The key
//! is forgotten as soon as the work completes, so later callers start a fresh
//! flight.

use std::{
    collections::HashMap,
    future::Future,
    hash::Hash,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use tokio::sync::OnceCell;

type Flights<K, V> = HashMap<K, Arc<OnceCell<V>>>;

pub struct InFlightRegistry<K, V> {
    flights: Mutex<Flights<K, V>>,
}

impl<K, V> InFlightRegistry<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            flights: Mutex::new(HashMap::new()),
        }
    }

    /// Run `work` for `key` unless a flight for it is already running, in
    /// which case wait for that flight and return its result.
    ///
    /// If the caller driving the work is cancelled, one of the waiters takes
    /// over with its own `work`. A flight abandoned by every caller is
    /// forgotten.
    pub async fn run<F, Fut>(&self, key: K, work: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        let ticket = self.join(key);
        match ticket.cell.as_deref() {
            Some(cell) => cell.get_or_init(work).await.clone(),
            None => work().await,
        }
    }

    /// Number of keys with a flight in progress.
    pub fn in_flight(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, Flights<K, V>> {
        self.flights.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn join(&self, key: K) -> FlightTicket<'_, K, V> {
        let cell = self
            .lock()
            .entry(key.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();
        FlightTicket {
            registry: self,
            key,
            cell: Some(cell),
        }
    }
}

impl<K, V> Default for InFlightRegistry<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

/// One caller's membership in a flight. Dropping it, on completion or on
/// cancellation, removes the flight once it has a result or once nobody else
/// is waiting on it.
struct FlightTicket<'a, K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    registry: &'a InFlightRegistry<K, V>,
    key: K,
    cell: Option<Arc<OnceCell<V>>>,
}

impl<K, V> Drop for FlightTicket<'_, K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn drop(&mut self) {
        let Some(cell) = self.cell.take() else {
            return;
        };

        // Clones are only made and dropped under this lock, so the count is exact.
        let mut flights = self.registry.lock();
        let Some(current) = flights.get(&self.key) else {
            return;
        };
        if !Arc::ptr_eq(current, &cell) {
            return;
        }

        let finished = cell.initialized();
        drop(cell);
        let abandoned = flights
            .get(&self.key)
            .is_some_and(|current| Arc::strong_count(current) == 1);
        if finished || abandoned {
            flights.remove(&self.key);
        }
    }
}
