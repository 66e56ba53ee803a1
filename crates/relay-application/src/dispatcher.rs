//! Inbound message dispatcher.
//!
//! Single entry point for every delivered message. Classification runs in a
//! fixed order: active session replies first, then parameterized commands,
//! then bare commands, then reference-code lookups, and finally free-text
//! intake. The first matching stage consumes the message.

use crate::commands::find_builtin_command;
use crate::replies;
use crate::session_flow::SessionFlow;
use chrono::Utc;
use relay_core::agent::GenerationOptions;
use relay_core::error::Result;
use relay_core::incident::{Category, Incident, IncidentNote, IncidentRepository, IncidentStatus};
use relay_core::message::InboundMessage;
use relay_core::reference;
use relay_core::session::{
    ConversationSession, SessionPayload, SessionStep, SessionStore, TaskRef,
};
use relay_core::transport::MessageTransport;
use relay_core::window::{self, Direction, WindowStore};
use relay_interaction::ProviderSelector;
use std::sync::Arc;

/// Cap on tasks shown in numbered lists and `/assigned` output.
const TASK_LIST_LIMIT: usize = 10;

/// Cap on reported records counted for `/status`.
const STATUS_REPORTED_LIMIT: usize = 50;

/// Author recorded on AI-generated triage notes.
const ASSISTANT_AUTHOR: &str = "assistant";

/// Result of handling one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Whether the message was handled without a user-visible failure
    pub success: bool,
    /// Reply text sent back to the sender
    pub message: String,
    /// Whether the engine now waits on a follow-up reply (active session)
    pub requires_followup: bool,
}

impl DispatchOutcome {
    /// A handled message with no session left open.
    pub fn reply(message: String) -> Self {
        Self {
            success: true,
            message,
            requires_followup: false,
        }
    }

    /// A handled message that leaves a session waiting on the sender.
    pub fn followup(message: String) -> Self {
        Self {
            success: true,
            message,
            requires_followup: true,
        }
    }
}

/// How a task identifier argument resolved.
enum TargetResolution {
    Record(Incident),
    Reply(DispatchOutcome),
}

/// Orchestrates classification and execution of inbound messages.
///
/// Each store operation is atomic, but the pipeline does not serialize
/// messages per sender; two concurrent messages from one phone number may
/// interleave between operations.
pub struct CommandDispatcher {
    sessions: Arc<dyn SessionStore>,
    incidents: Arc<dyn IncidentRepository>,
    windows: Arc<dyn WindowStore>,
    transport: Arc<dyn MessageTransport>,
    selector: Arc<ProviderSelector>,
    flow: SessionFlow,
}

impl CommandDispatcher {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        incidents: Arc<dyn IncidentRepository>,
        windows: Arc<dyn WindowStore>,
        transport: Arc<dyn MessageTransport>,
        selector: Arc<ProviderSelector>,
    ) -> Self {
        let flow = SessionFlow::new(Arc::clone(&sessions), Arc::clone(&incidents));
        Self {
            sessions,
            incidents,
            windows,
            transport,
            selector,
            flow,
        }
    }

    /// Handles one delivered message end to end.
    ///
    /// Records the inbound against the sender's messaging window (every
    /// inbound restarts the free window), classifies and executes it, then
    /// sends the reply through the transport. A transport failure propagates;
    /// the outbound is only counted against the window once the transport
    /// accepts it.
    pub async fn dispatch(
        &self,
        phone: &str,
        display_name: &str,
        message: InboundMessage,
    ) -> Result<DispatchOutcome> {
        let now = Utc::now();
        let tracker = self.windows.get(phone).await?;
        self.windows
            .put(window::apply(tracker, phone, true, Direction::Inbound, now))
            .await?;

        let outcome = match message {
            InboundMessage::Text { body } => self.dispatch_text(phone, display_name, &body).await?,
            InboundMessage::Image {
                caption: Some(caption),
                ..
            } => self.dispatch_text(phone, display_name, &caption).await?,
            InboundMessage::Image { caption: None, .. } => {
                DispatchOutcome::reply(replies::caption_needed())
            }
            InboundMessage::Location { .. } => DispatchOutcome::reply(replies::location_hint()),
            InboundMessage::Audio { .. } | InboundMessage::Unsupported { .. } => {
                DispatchOutcome::reply(replies::unsupported_hint())
            }
        };

        self.transport.send(phone, &outcome.message).await?;
        let now = Utc::now();
        let tracker = self.windows.get(phone).await?;
        self.windows
            .put(window::apply(tracker, phone, false, Direction::Outbound, now))
            .await?;

        Ok(outcome)
    }

    async fn dispatch_text(
        &self,
        phone: &str,
        display_name: &str,
        text: &str,
    ) -> Result<DispatchOutcome> {
        let trimmed = text.trim();

        // 1. Active session: the text is a step reply, even if it looks like
        //    a command. `cancel` is handled inside the flow.
        if self.sessions.has_active(phone).await? {
            return self.flow.handle_reply(phone, trimmed).await;
        }

        // 2. Parameterized commands: "/update <task> <note...>".
        let tokens: Vec<&str> = trimmed.split_whitespace().collect();
        if tokens.len() >= 3 {
            match tokens[0] {
                "/update" => {
                    return self
                        .direct_update(phone, tokens[1], &tokens[2..].join(" "), false)
                        .await;
                }
                "/complete" => {
                    return self
                        .direct_update(phone, tokens[1], &tokens[2..].join(" "), true)
                        .await;
                }
                _ => {}
            }
        }

        // 3. Bare commands (exact match on the whole message).
        if find_builtin_command(trimmed).is_some() {
            return self.run_bare_command(phone, trimmed).await;
        }

        // 4. Reference codes.
        if reference::looks_like_reference(trimmed) {
            return self.show_detail(phone, trimmed).await;
        }

        // 5. Everything else is a new report.
        self.intake_report(phone, display_name, trimmed).await
    }

    async fn direct_update(
        &self,
        phone: &str,
        identifier: &str,
        note: &str,
        complete: bool,
    ) -> Result<DispatchOutcome> {
        let record = match self.resolve_target(phone, identifier).await? {
            TargetResolution::Record(record) => record,
            TargetResolution::Reply(outcome) => return Ok(outcome),
        };

        if complete {
            self.flow.apply_completion(phone, &record.id, Some(note)).await
        } else {
            self.flow.apply_progress_update(phone, &record.id, note).await
        }
    }

    /// Resolves a task argument: a 1-based position into the sender's open
    /// task list, or a reference code. Records the sender cannot see resolve
    /// the same as missing ones.
    async fn resolve_target(&self, phone: &str, identifier: &str) -> Result<TargetResolution> {
        let cleaned = identifier.trim_end_matches('.');

        if let Ok(position) = cleaned.parse::<usize>() {
            let open = self.incidents.find_open_for(phone, TASK_LIST_LIMIT).await?;
            if position >= 1 && position <= open.len() {
                return Ok(TargetResolution::Record(open[position - 1].clone()));
            }
            return Ok(TargetResolution::Reply(DispatchOutcome::reply(
                replies::invalid_position(open.len()),
            )));
        }

        if reference::looks_like_reference(cleaned) {
            return match reference::resolve(cleaned, self.incidents.as_ref()).await? {
                Some(record) if record.is_visible_to(phone) => {
                    Ok(TargetResolution::Record(record))
                }
                _ => Ok(TargetResolution::Reply(DispatchOutcome::reply(
                    replies::unknown_reference(cleaned),
                ))),
            };
        }

        Ok(TargetResolution::Reply(DispatchOutcome::reply(
            replies::invalid_identifier(),
        )))
    }

    async fn run_bare_command(&self, phone: &str, name: &str) -> Result<DispatchOutcome> {
        match name {
            "/help" => Ok(DispatchOutcome::reply(replies::help_text())),
            "/assigned" => {
                let open = self.incidents.find_open_for(phone, TASK_LIST_LIMIT).await?;
                if open.is_empty() {
                    Ok(DispatchOutcome::reply(replies::no_open_tasks()))
                } else {
                    Ok(DispatchOutcome::reply(replies::assigned_list(&open)))
                }
            }
            "/update" | "/complete" => self.open_select_session(phone).await,
            "/status" => {
                let assigned = self.incidents.find_open_for(phone, TASK_LIST_LIMIT).await?;
                let open = assigned
                    .iter()
                    .filter(|i| i.status == IncidentStatus::Open)
                    .count();
                let in_progress = assigned.len() - open;
                let reported = self
                    .incidents
                    .find_reported_by(phone, STATUS_REPORTED_LIMIT)
                    .await?
                    .len();
                Ok(DispatchOutcome::reply(replies::status_summary(
                    open,
                    in_progress,
                    reported,
                )))
            }
            // Unreachable while the builtin table and this match agree.
            _ => Ok(DispatchOutcome::reply(replies::help_text())),
        }
    }

    /// Opens a `select_task` session over the sender's open tasks.
    ///
    /// Creating the session replaces any stale one for the sender.
    async fn open_select_session(&self, phone: &str) -> Result<DispatchOutcome> {
        let open = self.incidents.find_open_for(phone, TASK_LIST_LIMIT).await?;
        if open.is_empty() {
            return Ok(DispatchOutcome::reply(replies::no_open_tasks()));
        }

        let candidates: Vec<TaskRef> = open.iter().map(TaskRef::from_incident).collect();
        let session = ConversationSession::new(
            phone,
            SessionStep::SelectTask,
            SessionPayload::with_candidates(candidates.clone()),
        );
        self.sessions.create(session).await?;
        Ok(DispatchOutcome::followup(replies::task_list(&candidates)))
    }

    async fn show_detail(&self, phone: &str, code: &str) -> Result<DispatchOutcome> {
        match reference::resolve(code, self.incidents.as_ref()).await? {
            Some(record) if record.is_visible_to(phone) => {
                Ok(DispatchOutcome::reply(replies::detail_view(&record)))
            }
            _ => Ok(DispatchOutcome::reply(replies::unknown_reference(code))),
        }
    }

    /// Free-text intake: logs a new incident and asks the generative backend
    /// for a one-line triage summary.
    ///
    /// The record is created even when the AI call fails; the raw text is
    /// always the description of record, and the summary is only an
    /// assistant note.
    async fn intake_report(
        &self,
        phone: &str,
        display_name: &str,
        text: &str,
    ) -> Result<DispatchOutcome> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let now = Utc::now();
        let mut notes = Vec::new();

        if let Some(summary) = self.triage_summary(display_name, text).await {
            notes.push(IncidentNote::new(ASSISTANT_AUTHOR, summary, now));
        }

        let incident = Incident {
            id: id.clone(),
            description: text.to_string(),
            status: IncidentStatus::Open,
            category: Category::new("General"),
            subcategory: None,
            location: None,
            reporter: phone.to_string(),
            assigned_to: None,
            reported_at: now,
            notes,
        };
        self.incidents.create(incident).await?;

        Ok(DispatchOutcome::reply(replies::report_ack(&id)))
    }

    /// One generation attempt plus at most one fallback retry.
    async fn triage_summary(&self, display_name: &str, text: &str) -> Option<String> {
        let prompt = replies::parse_prompt(display_name, text);
        let options = GenerationOptions::default();

        let agent = self.selector.get_working_provider().await;
        let error = match agent.generate_content(&prompt, &options).await {
            Ok(generation) => return Some(generation.text),
            Err(error) => error,
        };

        if !error.is_fallback_eligible() {
            tracing::warn!("Triage generation failed without fallback: {error}");
            return None;
        }

        let fallback = self.selector.get_fallback_for(agent.provider(), &error).await;
        match fallback.generate_content(&prompt, &options).await {
            Ok(generation) => Some(generation.text),
            Err(error) => {
                tracing::warn!("Triage generation failed after fallback: {error}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use relay_core::provider::{ProviderConfig, ProviderConfigRepository};
    use relay_core::transport::SendReceipt;
    use relay_core::RelayError;
    use relay_infrastructure::{
        InMemoryIncidentRepository, InMemorySessionStore, InMemoryWindowStore, SecretServiceImpl,
    };
    use tokio::sync::Mutex;

    struct NoConfigs;

    #[async_trait]
    impl ProviderConfigRepository for NoConfigs {
        async fn list_active(&self) -> Result<Vec<ProviderConfig>> {
            Ok(Vec::new())
        }
    }

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl MessageTransport for RecordingTransport {
        async fn send(&self, phone: &str, text: &str) -> Result<SendReceipt> {
            self.sent
                .lock()
                .await
                .push((phone.to_string(), text.to_string()));
            Ok(SendReceipt {
                message_id: format!("wamid.{}", self.sent.lock().await.len()),
            })
        }
    }

    struct FailingTransport;

    #[async_trait]
    impl MessageTransport for FailingTransport {
        async fn send(&self, _phone: &str, _text: &str) -> Result<SendReceipt> {
            Err(RelayError::transport("connection refused"))
        }
    }

    struct Harness {
        incidents: Arc<InMemoryIncidentRepository>,
        sessions: Arc<InMemorySessionStore>,
        windows: Arc<InMemoryWindowStore>,
        transport: Arc<RecordingTransport>,
        dispatcher: CommandDispatcher,
    }

    fn harness_with_transport(transport: Arc<dyn MessageTransport>) -> CommandDispatcher {
        let incidents = Arc::new(InMemoryIncidentRepository::new());
        let sessions = Arc::new(InMemorySessionStore::new());
        let windows = Arc::new(InMemoryWindowStore::new());
        let selector = Arc::new(ProviderSelector::new(
            Arc::new(NoConfigs),
            Arc::new(SecretServiceImpl::new()),
        ));
        CommandDispatcher::new(sessions, incidents, windows, transport, selector)
    }

    fn harness() -> Harness {
        let incidents = Arc::new(InMemoryIncidentRepository::new());
        let sessions = Arc::new(InMemorySessionStore::new());
        let windows = Arc::new(InMemoryWindowStore::new());
        let transport = Arc::new(RecordingTransport::default());
        let selector = Arc::new(ProviderSelector::new(
            Arc::new(NoConfigs),
            Arc::new(SecretServiceImpl::new()),
        ));
        let dispatcher = CommandDispatcher::new(
            Arc::clone(&sessions) as Arc<dyn SessionStore>,
            Arc::clone(&incidents) as Arc<dyn IncidentRepository>,
            Arc::clone(&windows) as Arc<dyn WindowStore>,
            Arc::clone(&transport) as Arc<dyn MessageTransport>,
            selector,
        );
        Harness {
            incidents,
            sessions,
            windows,
            transport,
            dispatcher,
        }
    }

    fn incident(id: &str, description: &str, assigned: &str) -> Incident {
        Incident {
            id: id.to_string(),
            description: description.to_string(),
            status: IncidentStatus::Open,
            category: Category::new("Maintenance"),
            subcategory: None,
            location: Some("Building A".to_string()),
            reporter: "+15550099".to_string(),
            assigned_to: Some(assigned.to_string()),
            reported_at: Utc::now(),
            notes: Vec::new(),
        }
    }

    const PHONE: &str = "+15550001";

    #[tokio::test]
    async fn test_help_command_lists_commands() {
        let h = harness();
        let outcome = h
            .dispatcher
            .dispatch(PHONE, "Dana", InboundMessage::text("/help"))
            .await
            .unwrap();
        assert!(outcome.success);
        assert!(!outcome.requires_followup);
        assert!(outcome.message.contains("/assigned"));
        assert_eq!(h.transport.sent.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_guided_update_flow_end_to_end() {
        let h = harness();
        h.incidents
            .seed(vec![incident("rec-leak-0001", "Leaking sink", PHONE)])
            .await;

        let listed = h
            .dispatcher
            .dispatch(PHONE, "Dana", InboundMessage::text("/update"))
            .await
            .unwrap();
        assert!(listed.requires_followup);
        assert!(listed.message.contains("1. Leaking sink"));
        assert!(h.sessions.has_active(PHONE).await.unwrap());

        let picked = h
            .dispatcher
            .dispatch(PHONE, "Dana", InboundMessage::text("1"))
            .await
            .unwrap();
        assert!(picked.requires_followup);
        assert!(picked.message.contains("Leaking sink"));

        let noted = h
            .dispatcher
            .dispatch(PHONE, "Dana", InboundMessage::text("Ordered a new valve"))
            .await
            .unwrap();
        assert!(noted.success);
        assert!(!noted.requires_followup);

        let record = h
            .incidents
            .find_by_id("rec-leak-0001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.status, IncidentStatus::InProgress);
        assert_eq!(record.notes.last().unwrap().body, "Ordered a new valve");
        assert_eq!(record.notes.last().unwrap().author, PHONE);
        assert!(!h.sessions.has_active(PHONE).await.unwrap());
    }

    #[tokio::test]
    async fn test_cancel_clears_session_without_changes() {
        let h = harness();
        h.incidents
            .seed(vec![incident("rec-leak-0001", "Leaking sink", PHONE)])
            .await;

        h.dispatcher
            .dispatch(PHONE, "Dana", InboundMessage::text("/complete"))
            .await
            .unwrap();
        let cancelled = h
            .dispatcher
            .dispatch(PHONE, "Dana", InboundMessage::text("Cancel"))
            .await
            .unwrap();
        assert!(cancelled.message.contains("Cancelled"));
        assert!(!h.sessions.has_active(PHONE).await.unwrap());

        let record = h
            .incidents
            .find_by_id("rec-leak-0001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.status, IncidentStatus::Open);
        assert!(record.notes.is_empty());
    }

    #[tokio::test]
    async fn test_confirm_completion_resolves_record() {
        let h = harness();
        h.incidents
            .seed(vec![incident("rec-leak-0001", "Leaking sink", PHONE)])
            .await;

        h.dispatcher
            .dispatch(PHONE, "Dana", InboundMessage::text("/update"))
            .await
            .unwrap();
        h.dispatcher
            .dispatch(PHONE, "Dana", InboundMessage::text("1"))
            .await
            .unwrap();
        let confirm = h
            .dispatcher
            .dispatch(PHONE, "Dana", InboundMessage::text("complete"))
            .await
            .unwrap();
        assert!(confirm.requires_followup);
        assert!(confirm.message.contains("yes"));

        h.dispatcher
            .dispatch(PHONE, "Dana", InboundMessage::text("yes"))
            .await
            .unwrap();
        let record = h
            .incidents
            .find_by_id("rec-leak-0001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.status, IncidentStatus::Resolved);
        assert!(!h.sessions.has_active(PHONE).await.unwrap());
    }

    #[tokio::test]
    async fn test_parameterized_update_by_position() {
        let h = harness();
        h.incidents
            .seed(vec![incident("rec-leak-0001", "Leaking sink", PHONE)])
            .await;

        let outcome = h
            .dispatcher
            .dispatch(
                PHONE,
                "Dana",
                InboundMessage::text("/update 1 Parts are on order"),
            )
            .await
            .unwrap();
        assert!(outcome.success);

        let record = h
            .incidents
            .find_by_id("rec-leak-0001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.status, IncidentStatus::InProgress);
        assert_eq!(record.notes.last().unwrap().body, "Parts are on order");
        assert!(!h.sessions.has_active(PHONE).await.unwrap());
    }

    #[tokio::test]
    async fn test_parameterized_complete_by_reference() {
        let h = harness();
        h.incidents
            .seed(vec![incident(
                "cmez3mn6h0002l50405subng0",
                "Projector dead",
                PHONE,
            )])
            .await;

        let outcome = h
            .dispatcher
            .dispatch(
                PHONE,
                "Dana",
                InboundMessage::text("/complete #SUBNG0 Replaced the bulb"),
            )
            .await
            .unwrap();
        assert!(outcome.message.contains("#SUBNG0"));

        let record = h
            .incidents
            .find_by_id("cmez3mn6h0002l50405subng0")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.status, IncidentStatus::Resolved);
        assert_eq!(record.notes.last().unwrap().body, "Replaced the bulb");
    }

    #[tokio::test]
    async fn test_out_of_range_position_rejected() {
        let h = harness();
        h.incidents
            .seed(vec![incident("rec-leak-0001", "Leaking sink", PHONE)])
            .await;

        let outcome = h
            .dispatcher
            .dispatch(PHONE, "Dana", InboundMessage::text("/update 4 Some note"))
            .await
            .unwrap();
        assert!(outcome.message.contains("doesn't match"));

        let record = h
            .incidents
            .find_by_id("rec-leak-0001")
            .await
            .unwrap()
            .unwrap();
        assert!(record.notes.is_empty());
    }

    #[tokio::test]
    async fn test_reference_lookup_shows_detail_to_assignee_only() {
        let h = harness();
        h.incidents
            .seed(vec![incident(
                "cmez3mn6h0002l50405subng0",
                "Projector dead",
                PHONE,
            )])
            .await;

        let visible = h
            .dispatcher
            .dispatch(PHONE, "Dana", InboundMessage::text("#SUBNG0"))
            .await
            .unwrap();
        assert!(visible.message.contains("Projector dead"));

        let hidden = h
            .dispatcher
            .dispatch("+15559999", "Sam", InboundMessage::text("#SUBNG0"))
            .await
            .unwrap();
        assert!(hidden.message.contains("Couldn't find"));
    }

    #[tokio::test]
    async fn test_free_text_creates_incident_with_offline_triage() {
        let h = harness();
        let outcome = h
            .dispatcher
            .dispatch(
                PHONE,
                "Dana",
                InboundMessage::text("The gym door lock is broken"),
            )
            .await
            .unwrap();
        assert!(outcome.message.contains('#'));

        let reported = h.incidents.find_reported_by(PHONE, 10).await.unwrap();
        assert_eq!(reported.len(), 1);
        let record = &reported[0];
        assert_eq!(record.description, "The gym door lock is broken");
        assert_eq!(record.status, IncidentStatus::Open);
        assert_eq!(record.reporter, PHONE);
        // Offline stand-in always answers, so a triage note is present.
        assert_eq!(record.notes.len(), 1);
        assert_eq!(record.notes[0].author, ASSISTANT_AUTHOR);
    }

    #[tokio::test]
    async fn test_image_without_caption_asks_for_one() {
        let h = harness();
        let outcome = h
            .dispatcher
            .dispatch(
                PHONE,
                "Dana",
                InboundMessage::Image {
                    media_id: "media-1".to_string(),
                    caption: None,
                },
            )
            .await
            .unwrap();
        assert!(outcome.message.contains("caption"));
        assert!(h.incidents.find_reported_by(PHONE, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_image_caption_is_dispatched_as_text() {
        let h = harness();
        let outcome = h
            .dispatcher
            .dispatch(
                PHONE,
                "Dana",
                InboundMessage::Image {
                    media_id: "media-1".to_string(),
                    caption: Some("Broken light in room 12".to_string()),
                },
            )
            .await
            .unwrap();
        assert!(outcome.message.contains('#'));
        assert_eq!(h.incidents.find_reported_by(PHONE, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_inbound_message_restarts_window() {
        let h = harness();
        h.dispatcher
            .dispatch(PHONE, "Dana", InboundMessage::text("/help"))
            .await
            .unwrap();

        let tracker = h.windows.get(PHONE).await.unwrap().unwrap();
        assert!(tracker.is_window_active);
        // One outbound reply counted inside the fresh window.
        assert_eq!(tracker.message_count, 1);
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let dispatcher = harness_with_transport(Arc::new(FailingTransport));
        let result = dispatcher
            .dispatch(PHONE, "Dana", InboundMessage::text("/help"))
            .await;
        assert!(matches!(result, Err(RelayError::Transport(_))));
    }

    #[tokio::test]
    async fn test_plain_text_without_session_is_a_report() {
        let h = harness();
        let outcome = h
            .dispatcher
            .dispatch(PHONE, "Dana", InboundMessage::text("hello there"))
            .await
            .unwrap();
        assert!(!outcome.requires_followup);
        assert!(outcome.message.contains('#'));
    }
}
