//! REST client for the generation gateway.
//!
//! Wraps the gateway HTTP API (reference-image upload, batch creation,
//! batch/job status, account and model queries) using [`reqwest`].

use crate::wire::{
    BatchStatus, BatchSubmitRequest, BatchSubmitResponse, ModelInfo, UploadResponse, UserInfo,
    WireItem,
};

/// HTTP client for one gateway endpoint / credential pair.
pub struct GatewayApi {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

/// Errors from the gateway REST layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The gateway returned a non-2xx status code.
    #[error("Gateway error ({status}): {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

impl GatewayApi {
    /// Create a new API client.
    ///
    /// * `base_url` - gateway base URL, e.g. `http://localhost:8000/api`.
    /// * `api_key`  - provider credential forwarded with each call.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, api_key)
    }

    /// Create an API client reusing an existing [`reqwest::Client`]
    /// (useful for connection pooling).
    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            api_key: api_key.into(),
        }
    }

    /// Gateway base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Upload one reference image.
    ///
    /// Sends a `POST /upload/init-image` multipart request carrying the
    /// credential and the file. Returns the provider-assigned image id.
    pub async fn upload_init_image(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<String, ApiError> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new()
            .text("apiKey", self.api_key.clone())
            .part("file", part);

        let response = self
            .client
            .post(format!("{}/upload/init-image", self.base_url))
            .multipart(form)
            .send()
            .await?;

        let parsed: UploadResponse = Self::parse_response(response).await?;
        Ok(parsed.image_id)
    }

    /// Release an uploaded reference image.
    ///
    /// Sends a `DELETE /init-image/{id}` request. Used for best-effort
    /// cleanup when a submission attempt aborts mid-upload.
    pub async fn delete_init_image(&self, image_id: &str) -> Result<(), ApiError> {
        let response = self
            .client
            .delete(format!("{}/init-image/{}", self.base_url, image_id))
            .query(&[("apiKey", self.api_key.as_str())])
            .send()
            .await?;

        Self::check_status(response).await
    }

    /// Create a batch from the full item list.
    ///
    /// This is the single network transaction that enqueues all items:
    /// either the whole list is accepted and a batch id comes back, or
    /// the call fails and no job tracking begins.
    pub async fn submit_batch(&self, items: &[WireItem]) -> Result<BatchSubmitResponse, ApiError> {
        let body = BatchSubmitRequest {
            items,
            api_key: &self.api_key,
        };

        let response = self
            .client
            .post(format!("{}/generate/batch", self.base_url))
            .json(&body)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Fetch the aggregate status snapshot for a batch.
    ///
    /// Sends a `GET /jobs/{batchId}` request. Polled by the job poller
    /// on a fixed cadence.
    pub async fn batch_status(&self, batch_id: &str) -> Result<BatchStatus, ApiError> {
        let response = self
            .client
            .get(format!("{}/jobs/{}", self.base_url, batch_id))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Fetch account identity and credit counters.
    pub async fn user_info(&self) -> Result<UserInfo, ApiError> {
        let response = self
            .client
            .get(format!("{}/me", self.base_url))
            .query(&[("apiKey", self.api_key.as_str())])
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// List the provider model catalog.
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>, ApiError> {
        let response = self
            .client
            .get(format!("{}/models", self.base_url))
            .query(&[("apiKey", self.api_key.as_str())])
            .send()
            .await?;

        Self::parse_response(response).await
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or an [`ApiError::Status`]
    /// containing the status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    /// Assert the response has a success status code, discarding the body.
    async fn check_status(response: reqwest::Response) -> Result<(), ApiError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}
