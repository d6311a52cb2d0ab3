//! Asynchronous batch orchestration.
//!
//! Ties the pure logic in `bulkgen-core` to the gateway client in
//! `bulkgen-client`: sequential reference uploads with scoped cleanup,
//! the single batch-creation call guarded against re-entrant
//! submission, and the polling state machine that tracks a batch to
//! settlement. Progress is published through a [`tokio::sync::watch`]
//! snapshot and a [`tokio::sync::broadcast`] event channel.

pub mod error;
pub mod events;
pub mod poller;
pub mod submission;
pub mod upload;

pub use error::PipelineError;
pub use events::BatchEvent;
pub use poller::{PollerHandle, PollPhase, PollSnapshot, DEFAULT_POLL_INTERVAL};
pub use submission::{BatchOrchestrator, SubmittedBatch};
