//! Incident repository trait.
//!
//! Defines the interface this subsystem needs from the external record store.

use super::model::{Incident, IncidentUpdate};
use crate::error::Result;
use async_trait::async_trait;

/// A typed ID-matching strategy.
///
/// Reference codes are truncated record IDs, so resolution walks these
/// strategies from most to least precise. Representing the strategy as data
/// keeps the precedence decision in the codec and out of the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdQuery {
    /// The full record ID
    Exact(String),
    /// The record ID starts with the fragment
    Prefix(String),
    /// The record ID ends with the fragment
    Suffix(String),
    /// The record ID contains the fragment anywhere
    Contains(String),
}

impl IdQuery {
    /// The fragment being matched, regardless of strategy.
    pub fn fragment(&self) -> &str {
        match self {
            Self::Exact(f) | Self::Prefix(f) | Self::Suffix(f) | Self::Contains(f) => f,
        }
    }

    /// Whether `id` satisfies this query. Matching is case-insensitive since
    /// codes are typed in uppercase while store IDs are typically lowercase.
    pub fn matches(&self, id: &str) -> bool {
        let id = id.to_lowercase();
        let fragment = self.fragment().to_lowercase();
        match self {
            Self::Exact(_) => id == fragment,
            Self::Prefix(_) => id.starts_with(&fragment),
            Self::Suffix(_) => id.ends_with(&fragment),
            Self::Contains(_) => id.contains(&fragment),
        }
    }
}

/// An abstract repository for incident records.
///
/// This trait defines the contract for reading and mutating incident records,
/// decoupling the conversational engine from the specific storage mechanism.
#[async_trait]
pub trait IncidentRepository: Send + Sync {
    /// Finds an incident by its full ID.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Incident))`: Incident found
    /// - `Ok(None)`: Incident not found
    /// - `Err(_)`: Error occurred during retrieval
    async fn find_by_id(&self, id: &str) -> Result<Option<Incident>>;

    /// Finds all incidents whose ID satisfies the query.
    ///
    /// Result order for loose strategies is store-defined; callers accept the
    /// first match as best effort.
    async fn find_matching(&self, query: &IdQuery) -> Result<Vec<Incident>>;

    /// Lists open and in-progress incidents assigned to the given phone
    /// number, most recently reported first, capped at `limit`.
    async fn find_open_for(&self, phone: &str, limit: usize) -> Result<Vec<Incident>>;

    /// Lists incidents reported by the given phone number, most recent first,
    /// capped at `limit`.
    async fn find_reported_by(&self, phone: &str, limit: usize) -> Result<Vec<Incident>>;

    /// Creates a new incident record.
    async fn create(&self, incident: Incident) -> Result<Incident>;

    /// Applies a status transition and note append as one atomic operation.
    ///
    /// # Returns
    ///
    /// - `Ok(Incident)`: The updated record
    /// - `Err(RelayError::NotFound)`: No record with that ID
    async fn apply_update(&self, id: &str, update: IncidentUpdate) -> Result<Incident>;
}
