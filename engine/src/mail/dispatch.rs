//! One complete delivery pass over a recipient set.

use tracing::Instrument;
use uuid::Uuid;

use super::{Mailer, Message};

/// Per-recipient delivery result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Failed(String),
}

/// Aggregate counts for one run. Produced fresh per run, reported, and
/// discarded; never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub delivered: usize,
    pub failed: usize,
}

impl RunSummary {
    /// Number of recipients accounted for. Always equals the size of the
    /// recipient set after a completed run.
    pub fn total(&self) -> usize {
        self.delivered + self.failed
    }

    fn record(&mut self, outcome: &DeliveryOutcome) {
        match outcome {
            DeliveryOutcome::Delivered => self.delivered += 1,
            DeliveryOutcome::Failed(_) => self.failed += 1,
        }
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "delivered: {}, failed: {}", self.delivered, self.failed)
    }
}

/// Delivers one built [`Message`] to every recipient of a set, sequentially,
/// in source-list order.
///
/// Recipients are taken as given: no deduplication and no address validation
/// beyond what the transport rejects. A failure for one recipient never
/// aborts the pass; the failure is tallied and the next recipient is
/// attempted. One `DispatchRun` can execute repeatedly over the same message
/// (one pass per scheduled firing).
pub struct DispatchRun<'a, M: Mailer> {
    mailer: &'a M,
    message: &'a Message,
}

impl<'a, M: Mailer> DispatchRun<'a, M> {
    pub fn new(mailer: &'a M, message: &'a Message) -> Self {
        Self { mailer, message }
    }

    /// Attempt delivery to each recipient in order and tally the outcomes.
    ///
    /// An empty set returns `{0, 0}` without touching the transport.
    pub async fn execute(&self, recipients: &[String]) -> RunSummary {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("dispatch_run", %run_id, recipients = recipients.len());

        async {
            let mut summary = RunSummary::default();

            for recipient in recipients {
                tracing::info!(%recipient, "delivering");
                let outcome = match self.mailer.deliver(self.message, recipient).await {
                    Ok(()) => {
                        tracing::info!(%recipient, "delivered");
                        DeliveryOutcome::Delivered
                    }
                    Err(e) => {
                        tracing::error!(%recipient, error = %e, "delivery failed");
                        DeliveryOutcome::Failed(e.to_string())
                    }
                };
                summary.record(&outcome);
            }

            tracing::info!(
                delivered = summary.delivered,
                failed = summary.failed,
                "run complete"
            );
            summary
        }
        .instrument(span)
        .await
    }
}
