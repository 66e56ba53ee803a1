//! Incident domain module.
//!
//! Incident records live in an external store; this module types the slice of
//! that store the conversational engine depends on.
//!
//! - `model`: incident record, status tiers, notes, and the atomic update unit
//! - `repository`: repository trait plus the typed ID query used by
//!   reference-code resolution

mod model;
mod repository;

pub use model::{Category, Incident, IncidentNote, IncidentStatus, IncidentUpdate};
pub use repository::{IdQuery, IncidentRepository};
