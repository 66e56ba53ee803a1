//! In-memory IncidentRepository implementation.
//!
//! Backs tests and local runs; production deployments point the engine at the
//! real record store instead.

use async_trait::async_trait;
use relay_core::error::{RelayError, Result};
use relay_core::incident::{IdQuery, Incident, IncidentRepository, IncidentUpdate};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Incident repository backed by an in-process map.
#[derive(Default)]
pub struct InMemoryIncidentRepository {
    records: Arc<RwLock<HashMap<String, Incident>>>,
}

impl InMemoryIncidentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the repository with existing records (test convenience).
    pub async fn seed(&self, incidents: Vec<Incident>) {
        let mut records = self.records.write().await;
        for incident in incidents {
            records.insert(incident.id.clone(), incident);
        }
    }
}

#[async_trait]
impl IncidentRepository for InMemoryIncidentRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Incident>> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn find_matching(&self, query: &IdQuery) -> Result<Vec<Incident>> {
        let records = self.records.read().await;
        let mut matches: Vec<Incident> = records
            .values()
            .filter(|r| query.matches(&r.id))
            .cloned()
            .collect();
        // Stable order for loose strategies so resolution is deterministic.
        matches.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(matches)
    }

    async fn find_open_for(&self, phone: &str, limit: usize) -> Result<Vec<Incident>> {
        let records = self.records.read().await;
        let mut open: Vec<Incident> = records
            .values()
            .filter(|r| r.status.is_open() && r.assigned_to.as_deref() == Some(phone))
            .cloned()
            .collect();
        open.sort_by(|a, b| b.reported_at.cmp(&a.reported_at));
        open.truncate(limit);
        Ok(open)
    }

    async fn find_reported_by(&self, phone: &str, limit: usize) -> Result<Vec<Incident>> {
        let records = self.records.read().await;
        let mut reported: Vec<Incident> = records
            .values()
            .filter(|r| r.reporter == phone)
            .cloned()
            .collect();
        reported.sort_by(|a, b| b.reported_at.cmp(&a.reported_at));
        reported.truncate(limit);
        Ok(reported)
    }

    async fn create(&self, incident: Incident) -> Result<Incident> {
        let mut records = self.records.write().await;
        records.insert(incident.id.clone(), incident.clone());
        Ok(incident)
    }

    async fn apply_update(&self, id: &str, update: IncidentUpdate) -> Result<Incident> {
        // Status transition and note append land together under one write
        // lock; a reader can never observe one without the other.
        let mut records = self.records.write().await;
        let record = records
            .get_mut(id)
            .ok_or_else(|| RelayError::not_found("incident", id))?;
        if let Some(status) = update.status {
            record.status = status;
        }
        record.notes.push(update.note);
        Ok(record.clone())
    }
}
