use bulkgen_client::ApiError;
use bulkgen_core::error::CoreError;

/// Errors from the batch orchestration pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The submission request failed pre-network validation.
    #[error(transparent)]
    Invalid(#[from] CoreError),

    /// A reference image could not be read from disk.
    #[error("Failed to read reference image '{path}': {source}")]
    ReadImage {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A reference upload failed. Previously uploaded images for this
    /// attempt have already been released best-effort.
    #[error("Reference upload failed for '{file}': {source}")]
    Upload {
        file: String,
        #[source]
        source: ApiError,
    },

    /// The batch-creation call failed; no polling was started.
    #[error("Batch submission failed: {0}")]
    Submit(#[source] ApiError),

    /// Another submission is already in flight on this orchestrator.
    #[error("A batch submission is already in flight")]
    SubmissionInFlight,
}
