//! Batch-level events emitted by the orchestration pipeline.
//!
//! These are the high-level state changes the surrounding system cares
//! about. The settlement event is what callers hook to refresh
//! credit/usage counters once a batch finishes.

use serde::Serialize;

use bulkgen_client::wire::BatchStatus;

/// A batch-level event, broadcast to all subscribers.
#[derive(Debug, Clone, Serialize)]
pub enum BatchEvent {
    /// A status query succeeded and the batch is not yet settled.
    Progress {
        batch_id: String,
        snapshot: BatchStatus,
    },

    /// Every job reached a terminal status; polling has stopped.
    Settled {
        batch_id: String,
        snapshot: BatchStatus,
    },

    /// A status query failed and polling halted. The last observed
    /// snapshot (if any) may misrepresent true completion.
    Degraded {
        batch_id: String,
        error: String,
        last_snapshot: Option<BatchStatus>,
    },
}
