//! In-process WindowStore implementation.

use async_trait::async_trait;
use relay_core::error::Result;
use relay_core::window::{WindowStore, WindowTracker};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Window tracker store backed by an in-process concurrent map.
///
/// Trackers are kept for the process lifetime; idle trackers are harmless and
/// are not garbage-collected.
#[derive(Default)]
pub struct InMemoryWindowStore {
    trackers: Arc<RwLock<HashMap<String, WindowTracker>>>,
}

impl InMemoryWindowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of trackers currently held.
    pub async fn len(&self) -> usize {
        self.trackers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.trackers.read().await.is_empty()
    }
}

#[async_trait]
impl WindowStore for InMemoryWindowStore {
    async fn get(&self, phone: &str) -> Result<Option<WindowTracker>> {
        Ok(self.trackers.read().await.get(phone).cloned())
    }

    async fn put(&self, tracker: WindowTracker) -> Result<()> {
        let mut trackers = self.trackers.write().await;
        trackers.insert(tracker.phone.clone(), tracker);
        Ok(())
    }
}
