//! Bulk prompt-line grammar: `[<digits>]? <prompt text> (--neg <negative>)?`.
//!
//! Each line of the bulk textbox is parsed independently into a
//! [`ParsedPrompt`]. The parser is total over any string input:
//! malformed bracket tags or `--neg` clauses degrade to "no tag" /
//! "no override" rather than erroring. Session-level context (global
//! negative prompt, trigger word, important variant) is injected here
//! so downstream fan-out only deals with finished prompt text.

use std::sync::LazyLock;

use regex::Regex;

/// Leading bracketed integer tag, e.g. `[1]` or `[001]`, plus any
/// whitespace that follows it. Compiled once, reused forever.
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\[(\d+)\]\s*").expect("valid regex"));

/// Case-insensitive `--neg` separator between prompt and negative text.
static NEG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)--neg").expect("valid regex"));

/// Descriptor appended to the prompt when an "important variant" is
/// selected. The appended text both nudges generation content and tags
/// the output so it can be retrieved later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantTag {
    /// Human-readable label inserted into the prompt text.
    pub label: String,
    /// Machine slug recorded after the `imp=` marker.
    pub slug: String,
}

/// Session-level context applied to every parsed line.
#[derive(Debug, Clone, Default)]
pub struct PromptContext {
    /// Negative prompt used when a line carries no `--neg` override.
    pub global_negative: String,
    /// Trigger word prepended when an Element reference is configured.
    pub trigger_word: String,
    /// Whether an Element (LoRA) reference is configured for this session.
    pub element_configured: bool,
    /// Selected important-variant descriptor, if any.
    pub important_variant: Option<VariantTag>,
}

/// One parsed bulk-textbox line, ready for fan-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPrompt {
    /// Number extracted from a leading `[N]` tag, if present.
    pub prompt_number: Option<u32>,
    /// Prompt text after tag/negative extraction and context injection.
    pub prompt: String,
    /// Per-line `--neg` override, else the global default. `None` only
    /// when both are empty.
    pub negative_prompt: Option<String>,
}

/// Parse a single raw line against the session context.
///
/// Steps, in strict order:
/// 1. extract a leading `[digits]` tag into `prompt_number`;
/// 2. split the remainder on the first case-insensitive `--neg`;
/// 3. prepend the trigger word when an Element reference is configured;
/// 4. append the important-variant descriptor.
///
/// A tag whose digits do not fit in `u32` is left in the prompt text
/// verbatim, as if no tag were present.
pub fn parse_line(line: &str, ctx: &PromptContext) -> ParsedPrompt {
    let mut rest = line.trim();

    let mut prompt_number = None;
    if let Some(caps) = TAG_RE.captures(rest) {
        if let Ok(n) = caps[1].parse::<u32>() {
            prompt_number = Some(n);
            rest = &rest[caps[0].len()..];
        }
    }

    let (base, override_neg) = match NEG_RE.find(rest) {
        Some(m) => {
            let base = rest[..m.start()].trim().to_string();
            let neg = rest[m.end()..].trim();
            let neg = (!neg.is_empty()).then(|| neg.to_string());
            (base, neg)
        }
        None => (rest.trim().to_string(), None),
    };

    let negative_prompt = override_neg.or_else(|| {
        let global = ctx.global_negative.trim();
        (!global.is_empty()).then(|| global.to_string())
    });

    let mut prompt = base;
    let trigger = ctx.trigger_word.trim();
    if !trigger.is_empty() && ctx.element_configured {
        prompt = format!("{trigger}, {prompt}");
    }
    if let Some(variant) = &ctx.important_variant {
        prompt = format!("{prompt}, {} imp={}", variant.label, variant.slug);
    }

    ParsedPrompt {
        prompt_number,
        prompt,
        negative_prompt,
    }
}

/// Parse the whole bulk textbox, one prompt per line.
///
/// Lines that are empty after trimming are discarded before parsing.
pub fn parse_bulk(text: &str, ctx: &PromptContext) -> Vec<ParsedPrompt> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| parse_line(line, ctx))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> PromptContext {
        PromptContext::default()
    }

    // -- bracket tag ----------------------------------------------------------

    #[test]
    fn leading_tag_extracted_and_stripped() {
        let parsed = parse_line("[1] a red fox", &ctx());
        assert_eq!(parsed.prompt_number, Some(1));
        assert_eq!(parsed.prompt, "a red fox");
    }

    #[test]
    fn padded_tag_digits_parse() {
        let parsed = parse_line("[001] castle on a hill", &ctx());
        assert_eq!(parsed.prompt_number, Some(1));
        assert_eq!(parsed.prompt, "castle on a hill");
    }

    #[test]
    fn no_tag_means_no_prompt_number() {
        let parsed = parse_line("a blue owl", &ctx());
        assert_eq!(parsed.prompt_number, None);
        assert_eq!(parsed.prompt, "a blue owl");
    }

    #[test]
    fn tag_not_at_line_start_is_plain_text() {
        let parsed = parse_line("fox [2] in snow", &ctx());
        assert_eq!(parsed.prompt_number, None);
        assert_eq!(parsed.prompt, "fox [2] in snow");
    }

    #[test]
    fn oversized_tag_degrades_to_no_tag() {
        let parsed = parse_line("[99999999999999] fox", &ctx());
        assert_eq!(parsed.prompt_number, None);
        assert_eq!(parsed.prompt, "[99999999999999] fox");
    }

    #[test]
    fn malformed_bracket_degrades_to_no_tag() {
        let parsed = parse_line("[1a] fox", &ctx());
        assert_eq!(parsed.prompt_number, None);
        assert_eq!(parsed.prompt, "[1a] fox");
    }

    // -- negative override ----------------------------------------------------

    #[test]
    fn neg_override_splits_line() {
        let parsed = parse_line("a red fox --neg blurry", &ctx());
        assert_eq!(parsed.prompt, "a red fox");
        assert_eq!(parsed.negative_prompt.as_deref(), Some("blurry"));
    }

    #[test]
    fn neg_separator_is_case_insensitive() {
        let parsed = parse_line("a red fox --NEG blurry, low res", &ctx());
        assert_eq!(parsed.prompt, "a red fox");
        assert_eq!(parsed.negative_prompt.as_deref(), Some("blurry, low res"));
    }

    #[test]
    fn override_beats_global_default() {
        let context = PromptContext {
            global_negative: "low quality".into(),
            ..ctx()
        };
        let parsed = parse_line("fox --neg blurry", &context);
        assert_eq!(parsed.negative_prompt.as_deref(), Some("blurry"));
    }

    #[test]
    fn global_default_used_without_override() {
        let context = PromptContext {
            global_negative: "low quality".into(),
            ..ctx()
        };
        let parsed = parse_line("fox", &context);
        assert_eq!(parsed.negative_prompt.as_deref(), Some("low quality"));
    }

    #[test]
    fn empty_override_falls_back_to_global() {
        let context = PromptContext {
            global_negative: "low quality".into(),
            ..ctx()
        };
        let parsed = parse_line("fox --neg   ", &context);
        assert_eq!(parsed.prompt, "fox");
        assert_eq!(parsed.negative_prompt.as_deref(), Some("low quality"));
    }

    #[test]
    fn negative_absent_when_both_empty() {
        let parsed = parse_line("fox", &ctx());
        assert_eq!(parsed.negative_prompt, None);
    }

    // -- context injection ----------------------------------------------------

    #[test]
    fn trigger_word_prepended_when_element_configured() {
        let context = PromptContext {
            trigger_word: "myToken".into(),
            element_configured: true,
            ..ctx()
        };
        let parsed = parse_line("a red fox", &context);
        assert_eq!(parsed.prompt, "myToken, a red fox");
    }

    #[test]
    fn trigger_word_ignored_without_element() {
        let context = PromptContext {
            trigger_word: "myToken".into(),
            element_configured: false,
            ..ctx()
        };
        let parsed = parse_line("a red fox", &context);
        assert_eq!(parsed.prompt, "a red fox");
    }

    #[test]
    fn variant_descriptor_appended() {
        let context = PromptContext {
            important_variant: Some(VariantTag {
                label: "winter coat".into(),
                slug: "winter_coat".into(),
            }),
            ..ctx()
        };
        let parsed = parse_line("a red fox", &context);
        assert_eq!(parsed.prompt, "a red fox, winter coat imp=winter_coat");
    }

    #[test]
    fn tag_neg_trigger_and_variant_compose() {
        let context = PromptContext {
            global_negative: "low quality".into(),
            trigger_word: "tok".into(),
            element_configured: true,
            important_variant: Some(VariantTag {
                label: "night".into(),
                slug: "night".into(),
            }),
        };
        let parsed = parse_line("[42] a red fox --neg blurry", &context);
        assert_eq!(parsed.prompt_number, Some(42));
        assert_eq!(parsed.prompt, "tok, a red fox, night imp=night");
        assert_eq!(parsed.negative_prompt.as_deref(), Some("blurry"));
    }

    // -- parse_bulk -----------------------------------------------------------

    #[test]
    fn empty_lines_discarded() {
        let parsed = parse_bulk("fox\n\n   \nowl\n", &ctx());
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].prompt, "fox");
        assert_eq!(parsed[1].prompt, "owl");
    }

    #[test]
    fn mixed_tagged_and_untagged_lines() {
        let context = PromptContext {
            global_negative: "low quality".into(),
            ..ctx()
        };
        let parsed = parse_bulk("[1] a red fox --neg blurry\na blue owl", &context);
        assert_eq!(parsed.len(), 2);
        assert_eq!(
            parsed[0],
            ParsedPrompt {
                prompt_number: Some(1),
                prompt: "a red fox".into(),
                negative_prompt: Some("blurry".into()),
            }
        );
        assert_eq!(
            parsed[1],
            ParsedPrompt {
                prompt_number: None,
                prompt: "a blue owl".into(),
                negative_prompt: Some("low quality".into()),
            }
        );
    }
}
