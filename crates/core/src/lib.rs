//! Pure batch-orchestration logic for the bulk generation engine.
//!
//! Everything in this crate is synchronous and side-effect free: the
//! bulk prompt-line grammar, CSV prompt extraction, model capability
//! detection, the reference-image fan-out algorithm, and submission
//! validation. Network I/O lives in `bulkgen-client`; async
//! coordination lives in `bulkgen-pipeline`.

pub mod csv_import;
pub mod error;
pub mod fanout;
pub mod model;
pub mod prompt;
pub mod submission;
