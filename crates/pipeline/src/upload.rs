//! Sequential reference-image upload with scoped cleanup.
//!
//! Images are uploaded one at a time, never concurrently: this bounds
//! in-flight requests and keeps id ordering deterministic, which the
//! cycle fan-out mode depends on. The first failure aborts the whole
//! attempt; ids already acquired are released best-effort before the
//! error propagates, so an aborted attempt leaves nothing behind on
//! the provider side.

use bulkgen_client::GatewayApi;

use crate::error::PipelineError;

/// One local reference image, read into memory and ready to upload.
#[derive(Debug, Clone)]
pub struct ReferenceFile {
    /// File name sent in the multipart payload.
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Upload reference images sequentially, preserving order.
///
/// Returns the provider-assigned image ids in upload order. On any
/// failure, already-uploaded ids are released (deletion failures are
/// logged and swallowed) and the upload error is returned.
pub async fn upload_references(
    api: &GatewayApi,
    files: Vec<ReferenceFile>,
) -> Result<Vec<String>, PipelineError> {
    let mut uploaded: Vec<String> = Vec::with_capacity(files.len());

    for file in files {
        match api.upload_init_image(&file.file_name, file.bytes).await {
            Ok(image_id) => {
                tracing::info!(
                    file = %file.file_name,
                    image_id = %image_id,
                    "Uploaded reference image",
                );
                uploaded.push(image_id);
            }
            Err(e) => {
                tracing::error!(
                    file = %file.file_name,
                    error = %e,
                    acquired = uploaded.len(),
                    "Reference upload failed, aborting batch preparation",
                );
                release_uploaded(api, &uploaded).await;
                return Err(PipelineError::Upload {
                    file: file.file_name,
                    source: e,
                });
            }
        }
    }

    Ok(uploaded)
}

/// Best-effort release of ids acquired by an aborted attempt.
async fn release_uploaded(api: &GatewayApi, image_ids: &[String]) {
    for image_id in image_ids {
        if let Err(e) = api.delete_init_image(image_id).await {
            tracing::warn!(
                image_id = %image_id,
                error = %e,
                "Failed to release uploaded reference image",
            );
        } else {
            tracing::info!(image_id = %image_id, "Released uploaded reference image");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
