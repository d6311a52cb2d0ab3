//! Wire-format DTOs for the generation gateway.
//!
//! Field names follow the gateway's JSON schema exactly (a mix of
//! camelCase and snake_case, preserved via `rename` attributes).
//! [`WireItem`] is the serialized form of a
//! [`bulkgen_core::fanout::GenerationItem`]; the mutually exclusive
//! `init_image_id` / `init_image_ids` fields are derived from the
//! typed [`ReferenceBinding`] so an item can never carry both.

use serde::{Deserialize, Serialize};

use bulkgen_core::fanout::{ElementRef, GenerationItem, ReferenceBinding, ReferenceMode};

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

/// One generation item as the gateway expects it.
#[derive(Debug, Clone, Serialize)]
pub struct WireItem {
    pub prompt: String,
    #[serde(rename = "modelId")]
    pub model_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    pub width: u32,
    pub height: u32,
    pub num_images: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduler: Option<String>,
    #[serde(rename = "presetStyle", skip_serializing_if = "Option::is_none")]
    pub preset_style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub init_image_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub init_image_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strength: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_mode: Option<ReferenceMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loras: Option<Vec<ElementRef>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guidance_scale: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_inference_steps: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alchemy: Option<bool>,
    #[serde(rename = "enhancePrompt", skip_serializing_if = "Option::is_none")]
    pub enhance_prompt: Option<bool>,
}

impl From<&GenerationItem> for WireItem {
    fn from(item: &GenerationItem) -> Self {
        let (init_image_id, init_image_ids) = match &item.reference {
            ReferenceBinding::None => (None, None),
            ReferenceBinding::Single(id) => (Some(id.clone()), None),
            ReferenceBinding::Combined(ids) => (None, Some(ids.clone())),
        };

        Self {
            prompt: item.prompt.clone(),
            model_id: item.model_id.clone(),
            prompt_number: item.prompt_number,
            negative_prompt: item.negative_prompt.clone(),
            width: item.width,
            height: item.height,
            num_images: item.num_images,
            seed: item.seed,
            scheduler: item.scheduler.clone(),
            preset_style: item.preset_style.clone(),
            init_image_id,
            init_image_ids,
            strength: item.strength,
            reference_mode: item.reference_mode,
            loras: item.element.clone().map(|element| vec![element]),
            guidance_scale: item.guidance_scale,
            num_inference_steps: item.num_inference_steps,
            alchemy: item.alchemy,
            enhance_prompt: item.enhance_prompt,
        }
    }
}

/// `POST /generate/batch` request body.
#[derive(Debug, Serialize)]
pub struct BatchSubmitRequest<'a> {
    pub items: &'a [WireItem],
    #[serde(rename = "apiKey")]
    pub api_key: &'a str,
}

/// `POST /generate/batch` response.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchSubmitResponse {
    #[serde(rename = "batchId")]
    pub batch_id: String,
    #[serde(rename = "jobIds", default)]
    pub job_ids: Vec<String>,
}

/// `POST /upload/init-image` response.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    #[serde(rename = "imageId")]
    pub image_id: String,
}

// ---------------------------------------------------------------------------
// Status polling
// ---------------------------------------------------------------------------

/// Server-side job lifecycle. Transitions are monotonic; `Completed`
/// and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// Whether the job can no longer change state.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// One job inside a batch-status snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: String,
    pub status: JobStatus,
    /// Provider payload with output image URL(s), once completed.
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
    pub prompt: String,
    #[serde(default)]
    pub prompt_number: Option<u32>,
}

/// `GET /jobs/{batchId}` response: the aggregate snapshot the poller
/// reads. The client never writes job state, it only observes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchStatus {
    #[serde(rename = "batchId")]
    pub batch_id: String,
    pub total: u32,
    pub completed: u32,
    pub failed: u32,
    pub processing: u32,
    #[serde(default)]
    pub queued: u32,
    #[serde(default)]
    pub jobs: Vec<JobRecord>,
}

impl BatchStatus {
    /// Settlement: every job has reached a terminal status. An empty
    /// snapshot (`total == 0`) never settles — it means the server has
    /// not registered the jobs yet.
    pub fn is_settled(&self) -> bool {
        self.total > 0 && self.completed + self.failed == self.total
    }
}

// ---------------------------------------------------------------------------
// Account and model catalog
// ---------------------------------------------------------------------------

/// `GET /me` response: account identity and credit counters.
#[derive(Debug, Clone, Deserialize)]
pub struct UserInfo {
    pub id: String,
    pub username: String,
    #[serde(rename = "subscriptionTokens", default)]
    pub subscription_tokens: i64,
    #[serde(rename = "subscriptionGptTokens", default)]
    pub subscription_gpt_tokens: i64,
    #[serde(rename = "subscriptionModelTokens", default)]
    pub subscription_model_tokens: i64,
}

/// One entry from the `GET /models` catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub generated_image: Option<String>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
