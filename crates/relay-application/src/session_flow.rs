//! Multi-step session flow.
//!
//! Drives the `select_task -> provide_update -> confirm_completion` state
//! machine for a sender with an active session. Terminal transitions apply
//! exactly one atomic record update; a missing or expired session always
//! yields a "start over" reply, never an error.

use crate::dispatcher::DispatchOutcome;
use crate::replies;
use chrono::Utc;
use relay_core::error::Result;
use relay_core::incident::{IncidentNote, IncidentRepository, IncidentStatus, IncidentUpdate};
use relay_core::session::{
    ConversationSession, SessionPatch, SessionPayload, SessionStep, SessionStore,
};
use std::sync::Arc;

/// Default note recorded when a completion arrives without any text.
const DEFAULT_COMPLETION_NOTE: &str = "Marked complete via WhatsApp";

pub struct SessionFlow {
    sessions: Arc<dyn SessionStore>,
    incidents: Arc<dyn IncidentRepository>,
}

impl SessionFlow {
    pub fn new(sessions: Arc<dyn SessionStore>, incidents: Arc<dyn IncidentRepository>) -> Self {
        Self { sessions, incidents }
    }

    /// Handles a follow-up reply from a sender believed to hold a session.
    pub async fn handle_reply(&self, phone: &str, text: &str) -> Result<DispatchOutcome> {
        let Some(session) = self.sessions.get(phone).await? else {
            // Expired or never existed; clear defensively in case a stale
            // entry is still sitting in the store.
            self.sessions.clear(phone).await?;
            return Ok(DispatchOutcome::reply(replies::start_over()));
        };

        let input = text.trim();
        if input.eq_ignore_ascii_case("cancel") {
            self.sessions.clear(phone).await?;
            return Ok(DispatchOutcome::reply(replies::cancel_ack()));
        }

        match session.step {
            SessionStep::SelectTask => self.handle_select(phone, session, input).await,
            SessionStep::ProvideUpdate => self.handle_update(phone, session, input).await,
            SessionStep::ConfirmCompletion => self.handle_confirm(phone, session, input).await,
        }
    }

    async fn handle_select(
        &self,
        phone: &str,
        session: ConversationSession,
        input: &str,
    ) -> Result<DispatchOutcome> {
        let count = session.payload.candidates.len();
        let Some(position) = parse_selection(input, count) else {
            // Out-of-range or non-numeric: re-prompt without changing state.
            return Ok(DispatchOutcome::followup(replies::select_reprompt(count)));
        };

        let selected = session.payload.candidates[position - 1].clone();
        let payload = SessionPayload {
            candidates: session.payload.candidates,
            selected: Some(selected.clone()),
        };
        let patched = self
            .sessions
            .update(
                phone,
                SessionPatch::step_with_payload(SessionStep::ProvideUpdate, payload),
            )
            .await?;
        if patched.is_none() {
            return Ok(DispatchOutcome::reply(replies::start_over()));
        }
        Ok(DispatchOutcome::followup(replies::provide_update_prompt(
            &selected,
        )))
    }

    async fn handle_update(
        &self,
        phone: &str,
        session: ConversationSession,
        input: &str,
    ) -> Result<DispatchOutcome> {
        let Some(selected) = session.payload.selected.clone() else {
            self.sessions.clear(phone).await?;
            return Ok(DispatchOutcome::reply(replies::start_over()));
        };

        if input.eq_ignore_ascii_case("complete") {
            let patched = self
                .sessions
                .update(phone, SessionPatch::step(SessionStep::ConfirmCompletion))
                .await?;
            if patched.is_none() {
                return Ok(DispatchOutcome::reply(replies::start_over()));
            }
            return Ok(DispatchOutcome::followup(replies::confirm_prompt(&selected)));
        }

        if input.is_empty() {
            return Ok(DispatchOutcome::followup(replies::provide_update_prompt(
                &selected,
            )));
        }

        // Terminal transition: record the note, then drop the session so the
        // write can never be applied twice.
        let outcome = self.apply_progress_update(phone, &selected.id, input).await?;
        self.sessions.clear(phone).await?;
        Ok(outcome)
    }

    async fn handle_confirm(
        &self,
        phone: &str,
        session: ConversationSession,
        input: &str,
    ) -> Result<DispatchOutcome> {
        let Some(selected) = session.payload.selected.clone() else {
            self.sessions.clear(phone).await?;
            return Ok(DispatchOutcome::reply(replies::start_over()));
        };

        if input.eq_ignore_ascii_case("yes") {
            let outcome = self.apply_completion(phone, &selected.id, None).await?;
            self.sessions.clear(phone).await?;
            return Ok(outcome);
        }

        if input.eq_ignore_ascii_case("no") {
            let patched = self
                .sessions
                .update(phone, SessionPatch::step(SessionStep::ProvideUpdate))
                .await?;
            if patched.is_none() {
                return Ok(DispatchOutcome::reply(replies::start_over()));
            }
            return Ok(DispatchOutcome::followup(replies::resume_update(&selected)));
        }

        Ok(DispatchOutcome::followup(replies::confirm_reprompt()))
    }

    /// Records a progress note, advancing an `Open` record to `InProgress`.
    ///
    /// Shared by the session path and the direct parameterized command path
    /// so both apply identical semantics.
    pub async fn apply_progress_update(
        &self,
        phone: &str,
        record_id: &str,
        note_text: &str,
    ) -> Result<DispatchOutcome> {
        let Some(record) = self.incidents.find_by_id(record_id).await? else {
            return Ok(DispatchOutcome::reply(replies::unknown_reference(
                &relay_core::reference::encode(record_id),
            )));
        };

        let advance = (record.status == IncidentStatus::Open).then_some(IncidentStatus::InProgress);
        let note = IncidentNote::new(phone, note_text, Utc::now());
        let update = IncidentUpdate {
            status: advance,
            note,
        };
        self.incidents.apply_update(record_id, update).await?;
        Ok(DispatchOutcome::reply(replies::update_recorded(
            record_id,
            advance.is_some(),
        )))
    }

    /// Marks a record resolved with the supplied note or a default one.
    pub async fn apply_completion(
        &self,
        phone: &str,
        record_id: &str,
        note_text: Option<&str>,
    ) -> Result<DispatchOutcome> {
        if self.incidents.find_by_id(record_id).await?.is_none() {
            return Ok(DispatchOutcome::reply(replies::unknown_reference(
                &relay_core::reference::encode(record_id),
            )));
        }

        let body = note_text
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_COMPLETION_NOTE);
        let note = IncidentNote::new(phone, body, Utc::now());
        self.incidents
            .apply_update(record_id, IncidentUpdate::with_status(IncidentStatus::Resolved, note))
            .await?;
        Ok(DispatchOutcome::reply(replies::completion_recorded(record_id)))
    }
}

/// Parses a 1-based list selection, tolerating a trailing period ("2.").
fn parse_selection(input: &str, count: usize) -> Option<usize> {
    let cleaned = input.trim().trim_end_matches('.');
    let position: usize = cleaned.parse().ok()?;
    (1..=count).contains(&position).then_some(position)
}
