//! Incident domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of an incident record.
///
/// `Open` is the initial tier assigned at intake; the first progress update
/// advances a record to `InProgress`; completion marks it `Resolved`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    Open,
    InProgress,
    Resolved,
}

impl IncidentStatus {
    /// Whether this status still counts as actionable work.
    pub fn is_open(self) -> bool {
        matches!(self, Self::Open | Self::InProgress)
    }

    /// Human-readable label used in chat replies.
    pub fn label(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in progress",
            Self::Resolved => "resolved",
        }
    }
}

/// Incident category (e.g. "Maintenance", "Electrical").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A progress note appended to an incident.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentNote {
    /// Phone number of the author
    pub author: String,
    /// Note text
    pub body: String,
    /// Timestamp when the note was recorded
    pub created_at: DateTime<Utc>,
}

impl IncidentNote {
    pub fn new(author: impl Into<String>, body: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            author: author.into(),
            body: body.into(),
            created_at: at,
        }
    }
}

/// An incident record as consumed by the conversational engine.
///
/// The authoritative store lives outside this subsystem; the fields here are
/// the ones commands read and write. Senders are identified by phone number in
/// `reporter` and `assigned_to`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    /// Opaque record identifier (store-assigned)
    pub id: String,
    /// Free-text description captured at intake
    pub description: String,
    /// Current lifecycle status
    pub status: IncidentStatus,
    /// Incident category
    pub category: Category,
    /// Optional finer-grained classification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    /// Where the incident was reported (room, building, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Phone number of the reporter
    pub reporter: String,
    /// Phone number of the assignee, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    /// Timestamp when the incident was reported
    pub reported_at: DateTime<Utc>,
    /// Progress notes, oldest first
    #[serde(default)]
    pub notes: Vec<IncidentNote>,
}

impl Incident {
    /// Whether the given phone number may act on this record.
    ///
    /// Authorization is deliberately narrow: only the reporter or the current
    /// assignee has a claim. Callers must treat an unauthorized record as not
    /// found (no information leak about record existence).
    pub fn is_visible_to(&self, phone: &str) -> bool {
        self.reporter == phone || self.assigned_to.as_deref() == Some(phone)
    }
}

/// The atomic write unit for a record mutation.
///
/// A status transition and its accompanying note must land together; a partial
/// write (status changed but note missing, or vice versa) is a user-visible
/// inconsistency. Repositories apply the whole struct as one operation.
#[derive(Debug, Clone, PartialEq)]
pub struct IncidentUpdate {
    /// New status, if the update transitions the record
    pub status: Option<IncidentStatus>,
    /// Note to append
    pub note: IncidentNote,
}

impl IncidentUpdate {
    /// A progress note with no status change.
    pub fn note_only(note: IncidentNote) -> Self {
        Self { status: None, note }
    }

    /// A note combined with a status transition.
    pub fn with_status(status: IncidentStatus, note: IncidentNote) -> Self {
        Self {
            status: Some(status),
            note,
        }
    }
}
