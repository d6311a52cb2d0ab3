//! Provider model capability tiers.
//!
//! Certain provider models expose a reduced parameter surface. The
//! Flux Kontext model drops the reference-mode/strength controls and
//! the scheduler/alchemy toggles; Flux Dev/Schnell additionally drop
//! guidance, step count, and style presets. Capability only changes
//! the *shape* of generation items, never how many are produced.

/// Flux Kontext model id (reduced reference controls).
pub const FLUX_KONTEXT_MODEL_ID: &str = "28aeddf8-bd19-4803-80fc-79602d1a9989";

/// Flux Dev model id (basic parameter surface only).
pub const FLUX_DEV_MODEL_ID: &str = "b2614463-296c-462a-9586-aafdb8f00e36";

/// Flux Schnell model id (basic parameter surface only).
pub const FLUX_SCHNELL_MODEL_ID: &str = "1dd50843-d653-4516-a8e3-f0238ee453ff";

/// Parameter surface supported by a generation model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelCapability {
    /// Full parameter surface.
    Full,
    /// Flux Kontext: no reference-mode/strength controls, no scheduler
    /// or alchemy; guidance, steps, and style presets still apply.
    Kontext,
    /// Flux Dev/Schnell: basic surface only — advanced generation
    /// parameters and reference controls are all dropped.
    FluxBasic,
}

impl ModelCapability {
    /// Whether reference-mode and strength controls apply.
    pub fn supports_reference_controls(self) -> bool {
        matches!(self, Self::Full)
    }

    /// Whether a plain image-to-image strength may be sent alongside a
    /// single reference id. Basic Flux keeps this even though the full
    /// reference controls are gone; Kontext handles the reference
    /// natively and takes no strength at all.
    pub fn supports_init_strength(self) -> bool {
        matches!(self, Self::Full | Self::FluxBasic)
    }

    /// Whether guidance scale and inference step count apply.
    pub fn supports_guidance(self) -> bool {
        matches!(self, Self::Full | Self::Kontext)
    }

    /// Whether a scheduler id may be sent.
    pub fn supports_scheduler(self) -> bool {
        matches!(self, Self::Full)
    }

    /// Whether the alchemy toggle may be sent.
    pub fn supports_alchemy(self) -> bool {
        matches!(self, Self::Full)
    }

    /// Whether a style preset may be sent.
    pub fn supports_preset_style(self) -> bool {
        matches!(self, Self::Full | Self::Kontext)
    }
}

/// Classify a model id into its capability tier.
///
/// Matching is case-insensitive: the literal Kontext id or any id
/// containing `kontext` flags the Kontext tier; the Dev/Schnell ids or
/// any other id containing `flux` flag the basic tier.
pub fn detect_capability(model_id: &str) -> ModelCapability {
    let lower = model_id.to_ascii_lowercase();
    if lower == FLUX_KONTEXT_MODEL_ID || lower.contains("kontext") {
        ModelCapability::Kontext
    } else if lower == FLUX_DEV_MODEL_ID || lower == FLUX_SCHNELL_MODEL_ID || lower.contains("flux")
    {
        ModelCapability::FluxBasic
    } else {
        ModelCapability::Full
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kontext_literal_id_detected() {
        assert_eq!(
            detect_capability(FLUX_KONTEXT_MODEL_ID),
            ModelCapability::Kontext,
        );
    }

    #[test]
    fn kontext_substring_detected_case_insensitively() {
        assert_eq!(
            detect_capability("flux-KONTEXT-pro"),
            ModelCapability::Kontext,
        );
    }

    #[test]
    fn dev_and_schnell_are_basic() {
        assert_eq!(detect_capability(FLUX_DEV_MODEL_ID), ModelCapability::FluxBasic);
        assert_eq!(
            detect_capability(FLUX_SCHNELL_MODEL_ID),
            ModelCapability::FluxBasic,
        );
    }

    #[test]
    fn other_flux_ids_are_basic() {
        assert_eq!(detect_capability("my-Flux-model"), ModelCapability::FluxBasic);
    }

    #[test]
    fn uppercase_literal_id_detected() {
        assert_eq!(
            detect_capability(&FLUX_KONTEXT_MODEL_ID.to_ascii_uppercase()),
            ModelCapability::Kontext,
        );
    }

    #[test]
    fn strength_allowed_on_basic_flux_but_not_kontext() {
        assert!(ModelCapability::Full.supports_init_strength());
        assert!(ModelCapability::FluxBasic.supports_init_strength());
        assert!(!ModelCapability::Kontext.supports_init_strength());
    }

    #[test]
    fn unrelated_id_is_full() {
        assert_eq!(
            detect_capability("e71a1c2f-4f80-4800-934f-2c68979d8cc8"),
            ModelCapability::Full,
        );
    }
}
