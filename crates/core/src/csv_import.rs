//! Prompt extraction from pasted CSV content.
//!
//! The bulk textbox accepts raw CSV: the first record is treated as a
//! header, a column literally named `prompt` (case-insensitive) wins,
//! otherwise the first column is used. If no prompt values come out of
//! the column scan, every non-empty raw line of the input is used
//! verbatim instead.

/// Extract prompt lines from CSV text.
///
/// Returned values are trimmed and non-empty. Ragged rows are
/// tolerated; rows missing the prompt column are skipped.
pub fn extract_prompts(input: &str) -> Vec<String> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(input.as_bytes());

    let column = reader
        .headers()
        .ok()
        .and_then(|headers| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case("prompt"))
        })
        .unwrap_or(0);

    let mut prompts: Vec<String> = Vec::new();
    for record in reader.records().flatten() {
        if let Some(value) = record.get(column) {
            let value = value.trim();
            if !value.is_empty() {
                prompts.push(value.to_string());
            }
        }
    }

    if prompts.is_empty() {
        // Fallback: treat every non-empty raw line as a prompt.
        input
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect()
    } else {
        prompts
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
