mod search;
mod snapshot;

use std::sync::Arc;

use tokio::sync::watch;

use crate::error::Result;

pub use snapshot::Snapshot;

#[cfg(test)]
pub(crate) use snapshot::fixtures;

/// Demo dataset compiled into the binary, used to seed an empty database.
const SEED_DATASET: &str = include_str!("../../data/seed.json");

pub fn seed_snapshot() -> Result<Snapshot> {
    Snapshot::from_json(SEED_DATASET)
}

/// Holder of the current [`Snapshot`].
///
/// Readers get an `Arc` to a complete snapshot; writers publish a new one in
/// a single replace, so a partially applied update is never observable.
pub struct Store {
    tx: watch::Sender<Arc<Snapshot>>,
}

impl Store {
    pub fn new(snapshot: Snapshot) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(snapshot));
        Self { tx }
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&*self.tx.borrow())
    }

    pub fn replace(&self, snapshot: Snapshot) {
        self.tx.send_replace(Arc::new(snapshot));
    }

    /// Builds the next snapshot from the current one and publishes it.
    /// Nothing is published when `f` fails.
    pub fn update<F>(&self, f: F) -> Result<Arc<Snapshot>>
    where
        F: FnOnce(&Snapshot) -> Result<Snapshot>,
    {
        let next = Arc::new(f(&self.snapshot())?);
        self.tx.send_replace(Arc::clone(&next));
        Ok(next)
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.tx.subscribe()
    }
}
