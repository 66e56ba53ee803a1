//! Window tracker store trait.

use super::model::WindowTracker;
use crate::error::Result;
use async_trait::async_trait;

/// An abstract store for per-sender window trackers.
///
/// Trackers are long-lived; implementations keep them for the process (or
/// store) lifetime rather than expiring them.
#[async_trait]
pub trait WindowStore: Send + Sync {
    /// Returns the tracker for the phone number.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(tracker))`: Tracker exists
    /// - `Ok(None)`: First contact, no tracker yet
    async fn get(&self, phone: &str) -> Result<Option<WindowTracker>>;

    /// Inserts or replaces the tracker for its phone number.
    async fn put(&self, tracker: WindowTracker) -> Result<()>;
}
