//! Proactive (engine-initiated) notifications.
//!
//! Unlike replies, proactive sends are not covered by an inbound message, so
//! each one is classified against the recipient's messaging window first.
//! Free-classified sends go out immediately; paid-classified ones are deferred
//! to the next likely business-hours slot instead of incurring a charge.

use chrono::{DateTime, Utc};
use relay_core::error::Result;
use relay_core::transport::{MessageTransport, SendReceipt};
use relay_core::window::{self, Direction, WindowStore};
use std::sync::Arc;

/// What happened to one proactive notification.
#[derive(Debug, Clone, PartialEq)]
pub enum NotifyOutcome {
    /// Sent immediately inside a free window
    Sent(SendReceipt),
    /// Held back; suggested retry slot and the per-message cost avoided
    Deferred {
        scheduled_at: DateTime<Utc>,
        estimated_cost_usd: f64,
    },
}

impl NotifyOutcome {
    pub fn was_sent(&self) -> bool {
        matches!(self, Self::Sent(_))
    }
}

pub struct ProactiveNotifier {
    windows: Arc<dyn WindowStore>,
    transport: Arc<dyn MessageTransport>,
}

impl ProactiveNotifier {
    pub fn new(windows: Arc<dyn WindowStore>, transport: Arc<dyn MessageTransport>) -> Self {
        Self { windows, transport }
    }

    /// Sends one notification if the recipient's window makes it free,
    /// otherwise defers it to the next business slot.
    ///
    /// The outbound is recorded against the window only after the transport
    /// accepts it.
    pub async fn notify(&self, phone: &str, text: &str, is_media: bool) -> Result<NotifyOutcome> {
        let now = Utc::now();
        let tracker = self.windows.get(phone).await?;
        let decision = window::analyze(tracker.as_ref(), false, is_media, now);

        if !decision.send_now {
            let scheduled_at = window::next_business_slot(now);
            tracing::debug!(
                "Deferring notification to {phone} until {scheduled_at} \
                 (estimated cost {:?})",
                decision.estimated_cost_usd
            );
            return Ok(NotifyOutcome::Deferred {
                scheduled_at,
                estimated_cost_usd: decision
                    .estimated_cost_usd
                    .unwrap_or(window::TEXT_MESSAGE_COST_USD),
            });
        }

        let receipt = self.transport.send(phone, text).await?;
        self.windows
            .put(window::apply(tracker, phone, false, Direction::Outbound, now))
            .await?;
        Ok(NotifyOutcome::Sent(receipt))
    }

    /// Sends the same notification to many recipients, partitioning them by
    /// window classification. A transport failure for one recipient aborts
    /// the batch.
    pub async fn notify_bulk(
        &self,
        phones: &[String],
        text: &str,
        is_media: bool,
    ) -> Result<Vec<(String, NotifyOutcome)>> {
        let mut outcomes = Vec::with_capacity(phones.len());
        for phone in phones {
            let outcome = self.notify(phone, text, is_media).await?;
            outcomes.push((phone.clone(), outcome));
        }
        Ok(outcomes)
    }
}
