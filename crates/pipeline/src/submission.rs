//! Batch submission orchestration.
//!
//! One [`BatchOrchestrator::submit`] call runs the full preparation
//! flow for a [`SubmissionRequest`]: validate, read and upload the
//! reference images sequentially, expand lines and ids into items,
//! create the batch with a single gateway call, and spawn a poller for
//! the returned batch id. An in-flight flag rejects a second `submit`
//! while one is still preparing, so at most one attempt mutates the
//! upload/submit sequence at a time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use bulkgen_client::wire::WireItem;
use bulkgen_client::GatewayApi;
use bulkgen_core::fanout::expand;
use bulkgen_core::submission::SubmissionRequest;

use crate::error::PipelineError;
use crate::events::BatchEvent;
use crate::poller::{spawn_poller, PollerHandle, DEFAULT_POLL_INTERVAL};
use crate::upload::{upload_references, ReferenceFile};

/// Broadcast channel capacity for batch events.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Runs submission attempts against one gateway endpoint.
pub struct BatchOrchestrator {
    api: Arc<GatewayApi>,
    event_tx: broadcast::Sender<BatchEvent>,
    /// Submission-in-progress flag; a second submit while set is rejected.
    in_flight: AtomicBool,
    poll_interval: Duration,
}

/// A successfully created batch, with its poller already running.
#[derive(Debug)]
pub struct SubmittedBatch {
    pub batch_id: String,
    /// Gateway-assigned job ids, one per submitted item.
    pub job_ids: Vec<String>,
    pub item_count: usize,
    pub poller: PollerHandle,
}

impl BatchOrchestrator {
    /// Create an orchestrator with the default 2 s poll cadence.
    pub fn new(api: Arc<GatewayApi>) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            api,
            event_tx,
            in_flight: AtomicBool::new(false),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Override the poll cadence (tests, slow gateways).
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Subscribe to batch events (progress, settlement, degradation).
    pub fn subscribe(&self) -> broadcast::Receiver<BatchEvent> {
        self.event_tx.subscribe()
    }

    /// Run one submission attempt end to end.
    ///
    /// Input errors are rejected before any network call. An upload
    /// failure aborts the attempt with already-acquired ids released.
    /// A failed batch-create call reports the error and starts no
    /// polling. On success, the returned [`SubmittedBatch`] carries a
    /// running [`PollerHandle`].
    pub async fn submit(
        &self,
        request: &SubmissionRequest,
    ) -> Result<SubmittedBatch, PipelineError> {
        let _guard = InFlightGuard::acquire(&self.in_flight)?;

        request.validate()?;
        let lines = request.parsed_lines();

        let attempt_id = uuid::Uuid::new_v4();
        tracing::info!(
            %attempt_id,
            lines = lines.len(),
            images = request.reference_images.len(),
            mode = %request.fan_out_mode,
            model_id = %request.settings.model_id,
            expected_items = request.expected_item_count(),
            "Starting batch submission",
        );

        let mut files = Vec::with_capacity(request.reference_images.len());
        for path in &request.reference_images {
            let bytes = tokio::fs::read(path).await.map_err(|e| {
                PipelineError::ReadImage {
                    path: path.display().to_string(),
                    source: e,
                }
            })?;
            let file_name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "image.png".to_string());
            files.push(ReferenceFile { file_name, bytes });
        }

        let image_ids = upload_references(&self.api, files).await?;

        let items = expand(
            &lines,
            &image_ids,
            request.fan_out_mode,
            &request.settings,
        );
        let wire_items: Vec<WireItem> = items.iter().map(WireItem::from).collect();

        let response = self
            .api
            .submit_batch(&wire_items)
            .await
            .map_err(PipelineError::Submit)?;

        tracing::info!(
            %attempt_id,
            batch_id = %response.batch_id,
            items = wire_items.len(),
            "Batch accepted, polling started",
        );

        let poller = spawn_poller(
            Arc::clone(&self.api),
            response.batch_id.clone(),
            self.poll_interval,
            self.event_tx.clone(),
        );

        Ok(SubmittedBatch {
            batch_id: response.batch_id,
            job_ids: response.job_ids,
            item_count: wire_items.len(),
            poller,
        })
    }
}

/// RAII guard for the submission-in-progress flag. Released on drop,
/// including every early-return error path.
#[derive(Debug)]
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, PipelineError> {
        if flag.swap(true, Ordering::SeqCst) {
            return Err(PipelineError::SubmissionInFlight);
        }
        Ok(Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
