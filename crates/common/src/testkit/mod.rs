//! Test helpers
//!
//! [`FaultyNetwork`] wraps any [`Network`] and fails lookups of chosen
//! locations with a transport error, so tests can knock out individual
//! records of a sharing log.
//!
//! ```rust,ignore
//! let network = FaultyNetwork::new(vault.clone());
//! network.fail(cap.location());
//! let store = SharingStore::new(network.clone(), SharingConfig::default());
//! ```

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::capability::{EntryPoint, Location};
use crate::vault::{FileWrapper, Network, NetworkError};

#[derive(Debug, Clone)]
pub struct FaultyNetwork<N> {
    inner: N,
    failing: Arc<RwLock<HashSet<Location>>>,
    lookups: Arc<AtomicUsize>,
}

impl<N: Network> FaultyNetwork<N> {
    pub fn new(inner: N) -> Self {
        Self {
            inner,
            failing: Arc::new(RwLock::new(HashSet::new())),
            lookups: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Fail every lookup of `location` from now on
    pub fn fail(&self, location: Location) {
        self.failing.write().insert(location);
    }

    pub fn heal(&self, location: &Location) {
        self.failing.write().remove(location);
    }

    /// Lookups attempted so far, failed ones included
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &N {
        &self.inner
    }
}

#[async_trait]
impl<N: Network> Network for FaultyNetwork<N> {
    async fn retrieve_entry_point(
        &self,
        entry: &EntryPoint,
    ) -> Result<Option<FileWrapper>, NetworkError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let location = entry.pointer.location();
        if self.failing.read().contains(&location) {
            return Err(NetworkError::Transport(format!(
                "injected failure for {}",
                location
            )));
        }
        self.inner.retrieve_entry_point(entry).await
    }
}
