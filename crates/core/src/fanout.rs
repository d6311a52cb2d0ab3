//! Reference-image fan-out: combining parsed prompt lines with
//! uploaded reference-image ids into concrete generation items.
//!
//! Cardinality per mode, with `L` prompt lines and `M` images:
//!
//! | Mode       | Items   | Reference shape per item            |
//! |------------|---------|-------------------------------------|
//! | (no images)| `L`     | none                                |
//! | combined   | `L`     | all `M` ids as an array             |
//! | cycle      | `L`     | `images[i mod M]`, one id           |
//! | all        | `L * M` | every (line, image) pair, one id    |
//!
//! Every item derives from exactly one prompt line. The transmitted
//! reference strength is `1 - init_strength`: the provider reads
//! higher strength as closer to the reference, while the user-facing
//! slider is framed as creative freedom.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::model::{detect_capability, ModelCapability};
use crate::prompt::ParsedPrompt;

// ---------------------------------------------------------------------------
// Fan-out mode
// ---------------------------------------------------------------------------

/// Policy for combining prompt lines with uploaded reference images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FanOutMode {
    /// Every item carries all uploaded image ids (multi-reference guidance).
    Combined,
    /// Item `i` carries `images[i mod M]`.
    Cycle,
    /// Every (line, image) pair becomes a distinct item.
    All,
}

impl FromStr for FanOutMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "combined" => Ok(Self::Combined),
            "cycle" => Ok(Self::Cycle),
            "all" => Ok(Self::All),
            other => Err(CoreError::Validation(format!(
                "Unknown fan-out mode: '{other}'. Valid modes: combined, cycle, all"
            ))),
        }
    }
}

impl fmt::Display for FanOutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Combined => "combined",
            Self::Cycle => "cycle",
            Self::All => "all",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Shared settings
// ---------------------------------------------------------------------------

/// How an uploaded image guides generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceMode {
    Character,
    Style,
    Content,
    Basic,
}

/// Element (LoRA-style) weighted modifier shared by every item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementRef {
    /// Provider-side element id.
    pub id: String,
    /// Modifier weight.
    pub weight: f64,
}

/// Session generation settings shared by every item in a batch.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub model_id: String,
    pub width: u32,
    pub height: u32,
    pub num_images: u32,
    /// User-facing "more creative / less like reference" slider in
    /// `[0, 1]`. Transmitted inverted; see [`transmitted_strength`].
    pub init_strength: f64,
    pub reference_mode: ReferenceMode,
    pub element: Option<ElementRef>,
    pub guidance_scale: Option<u32>,
    pub num_inference_steps: Option<u32>,
    pub scheduler: Option<String>,
    pub alchemy: Option<bool>,
    pub enhance_prompt: Option<bool>,
    pub preset_style: Option<String>,
    pub seed: Option<u64>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model_id: String::new(),
            width: 1024,
            height: 1024,
            num_images: 1,
            init_strength: 0.5,
            reference_mode: ReferenceMode::Character,
            element: None,
            guidance_scale: None,
            num_inference_steps: None,
            scheduler: None,
            alchemy: None,
            enhance_prompt: None,
            preset_style: None,
            seed: None,
        }
    }
}

/// Invert the user-facing slider into the provider's strength scale.
///
/// The result is clamped to `[0, 1]`.
pub fn transmitted_strength(init_strength: f64) -> f64 {
    (1.0 - init_strength).clamp(0.0, 1.0)
}

// ---------------------------------------------------------------------------
// Generation items
// ---------------------------------------------------------------------------

/// Mutually exclusive reference shapes. An item can never mix the
/// combined array with a single id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceBinding {
    /// No reference guidance.
    None,
    /// Combined mode: every uploaded image guides the item.
    Combined(Vec<String>),
    /// Cycle/all modes: exactly one image guides the item.
    Single(String),
}

/// The unit of work sent to the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationItem {
    pub prompt: String,
    pub negative_prompt: Option<String>,
    pub prompt_number: Option<u32>,
    pub model_id: String,
    pub width: u32,
    pub height: u32,
    pub num_images: u32,
    pub reference: ReferenceBinding,
    /// Transmitted strength, already inverted. Absent without
    /// references, on Kontext, and for combined references outside the
    /// full parameter surface.
    pub strength: Option<f64>,
    pub reference_mode: Option<ReferenceMode>,
    pub element: Option<ElementRef>,
    pub guidance_scale: Option<u32>,
    pub num_inference_steps: Option<u32>,
    pub scheduler: Option<String>,
    pub alchemy: Option<bool>,
    pub enhance_prompt: Option<bool>,
    pub preset_style: Option<String>,
    pub seed: Option<u64>,
}

// ---------------------------------------------------------------------------
// Expansion
// ---------------------------------------------------------------------------

/// Expand prompt lines and uploaded image ids into generation items.
///
/// Precondition: `lines` is non-empty — the caller rejects empty
/// submissions before any network activity (see
/// [`crate::submission::SubmissionRequest::validate`]). With no
/// images, every mode degenerates to `L` reference-less items.
pub fn expand(
    lines: &[ParsedPrompt],
    images: &[String],
    mode: FanOutMode,
    settings: &GenerationSettings,
) -> Vec<GenerationItem> {
    let capability = detect_capability(&settings.model_id);

    if images.is_empty() {
        return lines
            .iter()
            .map(|line| build_item(line, ReferenceBinding::None, settings, capability))
            .collect();
    }

    match mode {
        FanOutMode::Combined => lines
            .iter()
            .map(|line| {
                build_item(
                    line,
                    ReferenceBinding::Combined(images.to_vec()),
                    settings,
                    capability,
                )
            })
            .collect(),
        FanOutMode::Cycle => lines
            .iter()
            .enumerate()
            .map(|(i, line)| {
                build_item(
                    line,
                    ReferenceBinding::Single(images[i % images.len()].clone()),
                    settings,
                    capability,
                )
            })
            .collect(),
        FanOutMode::All => lines
            .iter()
            .flat_map(|line| {
                images.iter().map(move |image| {
                    build_item(
                        line,
                        ReferenceBinding::Single(image.clone()),
                        settings,
                        capability,
                    )
                })
            })
            .collect(),
    }
}

/// Assemble one item from one prompt line, filtering the shared
/// settings down to what the model's capability tier accepts.
fn build_item(
    line: &ParsedPrompt,
    reference: ReferenceBinding,
    settings: &GenerationSettings,
    capability: ModelCapability,
) -> GenerationItem {
    let has_reference = !matches!(reference, ReferenceBinding::None);
    let send_strength = match &reference {
        ReferenceBinding::None => false,
        // Combined guidance is part of the full reference controls.
        ReferenceBinding::Combined(_) => capability.supports_reference_controls(),
        // Single-id image-to-image also works on basic Flux.
        ReferenceBinding::Single(_) => capability.supports_init_strength(),
    };
    let strength = send_strength.then(|| transmitted_strength(settings.init_strength));
    let reference_mode = (has_reference && capability.supports_reference_controls())
        .then_some(settings.reference_mode);

    GenerationItem {
        prompt: line.prompt.clone(),
        negative_prompt: line.negative_prompt.clone(),
        prompt_number: line.prompt_number,
        model_id: settings.model_id.clone(),
        width: settings.width,
        height: settings.height,
        num_images: settings.num_images,
        reference,
        strength,
        reference_mode,
        element: settings.element.clone(),
        guidance_scale: settings.guidance_scale.filter(|_| capability.supports_guidance()),
        num_inference_steps: settings
            .num_inference_steps
            .filter(|_| capability.supports_guidance()),
        scheduler: settings
            .scheduler
            .clone()
            .filter(|_| capability.supports_scheduler()),
        alchemy: settings.alchemy.filter(|_| capability.supports_alchemy()),
        enhance_prompt: settings.enhance_prompt,
        preset_style: settings
            .preset_style
            .clone()
            .filter(|_| capability.supports_preset_style()),
        seed: settings.seed,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::{parse_bulk, PromptContext};

    fn lines(n: usize) -> Vec<ParsedPrompt> {
        (0..n)
            .map(|i| ParsedPrompt {
                prompt_number: Some(i as u32 + 1),
                prompt: format!("prompt {i}"),
                negative_prompt: None,
            })
            .collect()
    }

    fn images(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("img-{i}")).collect()
    }

    fn settings() -> GenerationSettings {
        GenerationSettings {
            model_id: "e71a1c2f-4f80-4800-934f-2c68979d8cc8".into(),
            init_strength: 0.3,
            ..Default::default()
        }
    }

    // -- cardinality ----------------------------------------------------------

    #[test]
    fn no_images_yields_one_referenceless_item_per_line() {
        let items = expand(&lines(3), &[], FanOutMode::All, &settings());
        assert_eq!(items.len(), 3);
        assert!(items.iter().all(|i| i.reference == ReferenceBinding::None));
        assert!(items.iter().all(|i| i.strength.is_none()));
    }

    #[test]
    fn combined_yields_one_item_per_line_with_all_ids() {
        let items = expand(&lines(2), &images(3), FanOutMode::Combined, &settings());
        assert_eq!(items.len(), 2);
        for item in &items {
            assert_eq!(
                item.reference,
                ReferenceBinding::Combined(vec!["img-0".into(), "img-1".into(), "img-2".into()]),
            );
        }
    }

    #[test]
    fn cycle_yields_one_item_per_line() {
        let items = expand(&lines(5), &images(2), FanOutMode::Cycle, &settings());
        assert_eq!(items.len(), 5);
    }

    #[test]
    fn cycle_assigns_images_modulo() {
        let items = expand(&lines(5), &images(2), FanOutMode::Cycle, &settings());
        let expected = ["img-0", "img-1", "img-0", "img-1", "img-0"];
        for (item, expected_id) in items.iter().zip(expected) {
            assert_eq!(item.reference, ReferenceBinding::Single(expected_id.into()));
        }
    }

    #[test]
    fn all_yields_full_cross_product_exactly_once() {
        let items = expand(&lines(2), &images(3), FanOutMode::All, &settings());
        assert_eq!(items.len(), 6);

        let mut pairs: Vec<(Option<u32>, String)> = items
            .iter()
            .map(|item| match &item.reference {
                ReferenceBinding::Single(id) => (item.prompt_number, id.clone()),
                other => panic!("expected single reference, got {other:?}"),
            })
            .collect();
        pairs.sort();
        pairs.dedup();
        assert_eq!(pairs.len(), 6);
    }

    #[test]
    fn single_image_cycle_and_all_both_yield_one_item_per_line() {
        let cycle = expand(&lines(4), &images(1), FanOutMode::Cycle, &settings());
        let all = expand(&lines(4), &images(1), FanOutMode::All, &settings());
        assert_eq!(cycle.len(), 4);
        assert_eq!(all.len(), 4);
        assert!(cycle
            .iter()
            .all(|i| i.reference == ReferenceBinding::Single("img-0".into())));
    }

    // -- strength and reference controls --------------------------------------

    #[test]
    fn strength_is_inverted_slider() {
        let mut s = settings();
        s.init_strength = 0.3;
        let items = expand(&lines(1), &images(1), FanOutMode::Combined, &s);
        let strength = items[0].strength.unwrap();
        assert!((strength - 0.7).abs() < 1e-9);
        assert_eq!(items[0].reference_mode, Some(ReferenceMode::Character));
    }

    #[test]
    fn strength_inversion_covers_slider_range() {
        for s in [0.0, 0.25, 0.5, 0.75, 1.0] {
            assert!((transmitted_strength(s) - (1.0 - s)).abs() < 1e-9);
        }
    }

    #[test]
    fn kontext_model_drops_reference_controls_but_keeps_ids() {
        let mut s = settings();
        s.model_id = crate::model::FLUX_KONTEXT_MODEL_ID.into();
        let items = expand(&lines(2), &images(2), FanOutMode::Cycle, &s);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].reference, ReferenceBinding::Single("img-0".into()));
        assert!(items[0].strength.is_none());
        assert!(items[0].reference_mode.is_none());
    }

    #[test]
    fn basic_flux_single_reference_keeps_strength_without_mode() {
        let mut s = settings();
        s.model_id = crate::model::FLUX_DEV_MODEL_ID.into();
        s.init_strength = 0.3;
        let items = expand(&lines(1), &images(1), FanOutMode::Cycle, &s);
        let strength = items[0].strength.unwrap();
        assert!((strength - 0.7).abs() < 1e-9);
        assert!(items[0].reference_mode.is_none());
    }

    #[test]
    fn basic_flux_combined_reference_drops_strength() {
        let mut s = settings();
        s.model_id = crate::model::FLUX_SCHNELL_MODEL_ID.into();
        let items = expand(&lines(1), &images(2), FanOutMode::Combined, &s);
        assert_eq!(
            items[0].reference,
            ReferenceBinding::Combined(vec!["img-0".into(), "img-1".into()]),
        );
        assert!(items[0].strength.is_none());
        assert!(items[0].reference_mode.is_none());
    }

    #[test]
    fn capability_never_changes_cardinality() {
        let mut s = settings();
        s.model_id = crate::model::FLUX_KONTEXT_MODEL_ID.into();
        assert_eq!(expand(&lines(2), &images(3), FanOutMode::All, &s).len(), 6);
    }

    #[test]
    fn basic_flux_drops_advanced_parameters() {
        let mut s = settings();
        s.model_id = crate::model::FLUX_DEV_MODEL_ID.into();
        s.guidance_scale = Some(7);
        s.num_inference_steps = Some(30);
        s.scheduler = Some("EULER".into());
        s.alchemy = Some(true);
        s.preset_style = Some("CINEMATIC".into());
        let items = expand(&lines(1), &[], FanOutMode::Combined, &s);
        let item = &items[0];
        assert!(item.guidance_scale.is_none());
        assert!(item.num_inference_steps.is_none());
        assert!(item.scheduler.is_none());
        assert!(item.alchemy.is_none());
        assert!(item.preset_style.is_none());
    }

    #[test]
    fn kontext_keeps_guidance_and_preset_but_not_scheduler() {
        let mut s = settings();
        s.model_id = crate::model::FLUX_KONTEXT_MODEL_ID.into();
        s.guidance_scale = Some(7);
        s.scheduler = Some("EULER".into());
        s.preset_style = Some("CINEMATIC".into());
        let items = expand(&lines(1), &[], FanOutMode::Combined, &s);
        assert_eq!(items[0].guidance_scale, Some(7));
        assert_eq!(items[0].preset_style.as_deref(), Some("CINEMATIC"));
        assert!(items[0].scheduler.is_none());
    }

    // -- shared settings ------------------------------------------------------

    #[test]
    fn element_attached_to_every_item() {
        let mut s = settings();
        s.element = Some(ElementRef {
            id: "12345".into(),
            weight: 0.8,
        });
        let items = expand(&lines(2), &images(2), FanOutMode::All, &s);
        assert_eq!(items.len(), 4);
        assert!(items.iter().all(|i| i.element == s.element));
    }

    #[test]
    fn advanced_parameters_carried_on_full_models() {
        let mut s = settings();
        s.guidance_scale = Some(7);
        s.num_inference_steps = Some(30);
        s.scheduler = Some("DDIM".into());
        s.alchemy = Some(true);
        s.enhance_prompt = Some(false);
        s.preset_style = Some("DYNAMIC".into());
        s.seed = Some(42);
        let items = expand(&lines(1), &[], FanOutMode::Combined, &s);
        let item = &items[0];
        assert_eq!(item.guidance_scale, Some(7));
        assert_eq!(item.num_inference_steps, Some(30));
        assert_eq!(item.scheduler.as_deref(), Some("DDIM"));
        assert_eq!(item.alchemy, Some(true));
        assert_eq!(item.enhance_prompt, Some(false));
        assert_eq!(item.preset_style.as_deref(), Some("DYNAMIC"));
        assert_eq!(item.seed, Some(42));
    }

    // -- end to end with the parser -------------------------------------------

    #[test]
    fn parsed_lines_flow_through_expansion() {
        let ctx = PromptContext {
            global_negative: "low quality".into(),
            ..Default::default()
        };
        let parsed = parse_bulk("[1] a red fox --neg blurry\na blue owl", &ctx);
        let items = expand(&parsed, &[], FanOutMode::Combined, &settings());

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].prompt, "a red fox");
        assert_eq!(items[0].prompt_number, Some(1));
        assert_eq!(items[0].negative_prompt.as_deref(), Some("blurry"));
        assert_eq!(items[1].prompt, "a blue owl");
        assert_eq!(items[1].prompt_number, None);
        assert_eq!(items[1].negative_prompt.as_deref(), Some("low quality"));
    }

    // -- FanOutMode parsing ---------------------------------------------------

    #[test]
    fn fan_out_mode_round_trips_through_str() {
        for mode in [FanOutMode::Combined, FanOutMode::Cycle, FanOutMode::All] {
            assert_eq!(mode.to_string().parse::<FanOutMode>().unwrap(), mode);
        }
    }

    #[test]
    fn unknown_fan_out_mode_rejected() {
        assert!("zigzag".parse::<FanOutMode>().is_err());
    }
}
