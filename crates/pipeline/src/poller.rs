//! Polling state machine for batch settlement.
//!
//! After a successful batch submission the poller queries
//! `GET /jobs/{batchId}` on a fixed cadence and publishes each
//! aggregate snapshot. It runs until one of three things happens:
//!
//! - **Settled**: `completed + failed == total` for a non-empty
//!   snapshot. A settlement event fires so the surrounding system can
//!   refresh credit counters, and no further queries are issued.
//! - **Degraded**: a single status query fails. Polling halts without
//!   retry; the phase makes the halt explicit instead of leaving a
//!   silently stale snapshot.
//! - **Stopped**: the owning caller tears the poller down via
//!   [`PollerHandle::stop`].
//!
//! Settlement, degradation, and external teardown all run through the
//! same [`CancellationToken`], so there is exactly one shutdown path.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use bulkgen_client::wire::BatchStatus;
use bulkgen_client::GatewayApi;

use crate::events::BatchEvent;

/// Cadence of batch status queries.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Lifecycle phase of a batch poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollPhase {
    /// Status queries are being issued on the fixed cadence.
    Polling,
    /// Every job reached a terminal status; polling has stopped.
    Settled,
    /// A status query failed; polling halted without retry.
    Degraded,
}

/// Snapshot published after every poll tick.
#[derive(Debug, Clone, Serialize)]
pub struct PollSnapshot {
    pub phase: PollPhase,
    /// Last successfully observed aggregate, if any.
    pub progress: Option<BatchStatus>,
    /// Error text of the query that degraded the poller.
    pub error: Option<String>,
    /// When the last status query resolved. `None` until the first
    /// query returns.
    pub observed_at: Option<DateTime<Utc>>,
}

/// Handle to a running poller task.
///
/// Dropping the handle does not stop the task; call
/// [`stop`](Self::stop) (or wait for settlement) to end it.
#[derive(Debug)]
pub struct PollerHandle {
    batch_id: String,
    cancel: CancellationToken,
    snapshot_rx: watch::Receiver<PollSnapshot>,
    task: tokio::task::JoinHandle<()>,
}

impl PollerHandle {
    /// Batch this poller is tracking.
    pub fn batch_id(&self) -> &str {
        &self.batch_id
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> PollSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Watch receiver for snapshot changes.
    pub fn subscribe(&self) -> watch::Receiver<PollSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Tear the poller down. Idempotent; shares the cancellation path
    /// with settlement and degradation.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Wait for the poller task to end and return the final snapshot.
    pub async fn wait(self) -> PollSnapshot {
        let _ = self.task.await;
        self.snapshot_rx.borrow().clone()
    }
}

/// Spawn a poller for a freshly submitted batch.
pub fn spawn_poller(
    api: Arc<GatewayApi>,
    batch_id: String,
    interval: Duration,
    event_tx: broadcast::Sender<BatchEvent>,
) -> PollerHandle {
    let cancel = CancellationToken::new();
    let (snapshot_tx, snapshot_rx) = watch::channel(PollSnapshot {
        phase: PollPhase::Polling,
        progress: None,
        error: None,
        observed_at: None,
    });

    let task = tokio::spawn(poll_loop(
        api,
        batch_id.clone(),
        interval,
        cancel.clone(),
        snapshot_tx,
        event_tx,
    ));

    PollerHandle {
        batch_id,
        cancel,
        snapshot_rx,
        task,
    }
}

async fn poll_loop(
    api: Arc<GatewayApi>,
    batch_id: String,
    interval: Duration,
    cancel: CancellationToken,
    snapshot_tx: watch::Sender<PollSnapshot>,
    event_tx: broadcast::Sender<BatchEvent>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!(batch_id = %batch_id, "Poller stopped");
                return;
            }
            _ = ticker.tick() => {}
        }

        match api.batch_status(&batch_id).await {
            Ok(status) => {
                let settled = status.is_settled();
                snapshot_tx.send_replace(PollSnapshot {
                    phase: if settled {
                        PollPhase::Settled
                    } else {
                        PollPhase::Polling
                    },
                    progress: Some(status.clone()),
                    error: None,
                    observed_at: Some(Utc::now()),
                });

                if settled {
                    tracing::info!(
                        batch_id = %batch_id,
                        completed = status.completed,
                        failed = status.failed,
                        total = status.total,
                        "Batch settled",
                    );
                    let _ = event_tx.send(BatchEvent::Settled {
                        batch_id: batch_id.clone(),
                        snapshot: status,
                    });
                    cancel.cancel();
                    return;
                }

                tracing::debug!(
                    batch_id = %batch_id,
                    completed = status.completed,
                    failed = status.failed,
                    processing = status.processing,
                    total = status.total,
                    "Batch progress",
                );
                let _ = event_tx.send(BatchEvent::Progress {
                    batch_id: batch_id.clone(),
                    snapshot: status,
                });
            }
            Err(e) => {
                tracing::error!(
                    batch_id = %batch_id,
                    error = %e,
                    "Status query failed, poller degraded",
                );
                let last_snapshot = snapshot_tx.borrow().progress.clone();
                snapshot_tx.send_replace(PollSnapshot {
                    phase: PollPhase::Degraded,
                    progress: last_snapshot.clone(),
                    error: Some(e.to_string()),
                    observed_at: Some(Utc::now()),
                });
                let _ = event_tx.send(BatchEvent::Degraded {
                    batch_id: batch_id.clone(),
                    error: e.to_string(),
                    last_snapshot,
                });
                cancel.cancel();
                return;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
