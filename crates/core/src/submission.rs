//! Immutable submission request and pre-network validation.
//!
//! One [`SubmissionRequest`] describes one user-initiated "start
//! batch" action. The pipeline consumes it as a value — nothing here
//! mutates shared state, and all input errors are caught before any
//! network call is made.

use std::path::PathBuf;

use crate::error::CoreError;
use crate::fanout::{FanOutMode, GenerationSettings};
use crate::prompt::{parse_bulk, ParsedPrompt, PromptContext};

/// Everything needed to build and submit one batch.
#[derive(Debug, Clone)]
pub struct SubmissionRequest {
    /// Raw bulk-textbox content, one prompt per line.
    pub bulk_text: String,
    /// Session-level parsing context (global negative, trigger word,
    /// important variant).
    pub context: PromptContext,
    /// Shared generation settings for every item.
    pub settings: GenerationSettings,
    /// Local reference images, uploaded in this order.
    pub reference_images: Vec<PathBuf>,
    /// Policy for combining lines with uploaded images.
    pub fan_out_mode: FanOutMode,
}

impl SubmissionRequest {
    /// Parse the bulk text against the session context, discarding
    /// empty lines.
    pub fn parsed_lines(&self) -> Vec<ParsedPrompt> {
        parse_bulk(&self.bulk_text, &self.context)
    }

    /// Reject invalid requests before any network activity: a model
    /// must be selected and at least one non-empty prompt line must
    /// remain after parsing.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.settings.model_id.trim().is_empty() {
            return Err(CoreError::Validation("No model selected".to_string()));
        }
        if self.parsed_lines().is_empty() {
            return Err(CoreError::Validation(
                "No prompt lines to submit".to_string(),
            ));
        }
        Ok(())
    }

    /// Number of items the batch will contain once expanded.
    pub fn expected_item_count(&self) -> usize {
        let lines = self.parsed_lines().len();
        match (self.fan_out_mode, self.reference_images.len()) {
            (_, 0) => lines,
            (FanOutMode::All, images) => lines * images,
            _ => lines,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn request(text: &str, model_id: &str) -> SubmissionRequest {
        SubmissionRequest {
            bulk_text: text.to_string(),
            context: PromptContext::default(),
            settings: GenerationSettings {
                model_id: model_id.to_string(),
                ..Default::default()
            },
            reference_images: Vec::new(),
            fan_out_mode: FanOutMode::Combined,
        }
    }

    #[test]
    fn valid_request_passes() {
        assert!(request("a red fox", "model-1").validate().is_ok());
    }

    #[test]
    fn missing_model_rejected() {
        let err = request("a red fox", "  ").validate().unwrap_err();
        assert_matches!(err, CoreError::Validation(msg) if msg.contains("model"));
    }

    #[test]
    fn blank_bulk_text_rejected() {
        let err = request("\n  \n", "model-1").validate().unwrap_err();
        assert_matches!(err, CoreError::Validation(msg) if msg.contains("prompt lines"));
    }

    #[test]
    fn expected_item_count_matches_fan_out() {
        let mut req = request("a\nb\nc", "model-1");
        assert_eq!(req.expected_item_count(), 3);

        req.reference_images = vec![PathBuf::from("x.png"), PathBuf::from("y.png")];
        assert_eq!(req.expected_item_count(), 3);

        req.fan_out_mode = FanOutMode::All;
        assert_eq!(req.expected_item_count(), 6);
    }
}
