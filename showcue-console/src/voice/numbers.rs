//! Transcript → lineup position extraction
//!
//! Deterministic resolution of a spoken-number transcript into a 1-based
//! position. Tries, in order: direct integer parse of the normalized
//! transcript, first digit run in the raw transcript, and word-to-number
//! conversion. Range validation against the lineup happens in the
//! pipeline, not here.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// No positive integer could be resolved from the transcript
    #[error("No number detected in transcript")]
    NoNumberDetected,
}

/// Leading directive phrases stripped before parsing ("go to five",
/// "number twelve", "product three")
const DIRECTIVES: &[&str] = &["go to", "jump to", "number", "item", "product", "show"];

/// Extract a positive lineup position from a transcript
pub fn extract_position(transcript: &str) -> Result<u32, ExtractError> {
    let normalized = normalize(transcript);

    // 1. Direct integer parse of the normalized string
    if let Ok(n) = normalized.parse::<u32>() {
        if n > 0 {
            return Ok(n);
        }
    }

    // 2. First digit run anywhere in the raw transcript
    if let Some(n) = first_digit_run(transcript) {
        if n > 0 {
            return Ok(n);
        }
    }

    // 3. Word-to-number conversion
    let n = words_to_number(&normalized);
    if n > 0 {
        return Ok(n);
    }

    Err(ExtractError::NoNumberDetected)
}

/// Lowercase, strip surrounding punctuation/markers, collapse whitespace,
/// and strip leading directive phrases
fn normalize(transcript: &str) -> String {
    let lower = transcript.to_lowercase();
    let stripped = lower
        .trim_start_matches(|c: char| !c.is_alphanumeric())
        .trim_end_matches(|c: char| !c.is_alphanumeric());

    let mut collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");

    // Strip stacked directives ("go to number five" → "five")
    loop {
        let mut changed = false;
        for directive in DIRECTIVES {
            if let Some(rest) = collapsed.strip_prefix(directive) {
                if rest.is_empty() || rest.starts_with(' ') {
                    collapsed = rest.trim_start().to_string();
                    changed = true;
                }
            }
        }
        if !changed || collapsed.is_empty() {
            break;
        }
    }

    collapsed
}

/// First consecutive run of ASCII digits, parsed as an integer
fn first_digit_run(raw: &str) -> Option<u32> {
    let mut run = String::new();
    for c in raw.chars() {
        if c.is_ascii_digit() {
            run.push(c);
        } else if !run.is_empty() {
            break;
        }
    }
    if run.is_empty() {
        None
    } else {
        run.parse().ok()
    }
}

/// Value of one number word, if it is one
fn word_value(token: &str) -> Option<u32> {
    let value = match token {
        "zero" => 0,
        "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        "eleven" => 11,
        "twelve" => 12,
        "thirteen" => 13,
        "fourteen" => 14,
        "fifteen" => 15,
        "sixteen" => 16,
        "seventeen" => 17,
        "eighteen" => 18,
        "nineteen" => 19,
        "twenty" => 20,
        "thirty" => 30,
        "forty" => 40,
        "fifty" => 50,
        "sixty" => 60,
        "seventy" => 70,
        "eighty" => 80,
        "ninety" => 90,
        _ => return None,
    };
    Some(value)
}

/// Sum number words into an integer
///
/// Unit and tens words add to a running total; "hundred" multiplies a
/// nonzero running subtotal by 100. Unknown tokens are skipped so filler
/// words ("uh", "please") do not reset progress.
fn words_to_number(normalized: &str) -> u32 {
    let mut total: u32 = 0;
    for token in normalized.split_whitespace() {
        let token = token.trim_matches(|c: char| !c.is_alphanumeric());
        if token == "hundred" {
            if total > 0 {
                total = total.saturating_mul(100);
            }
        } else if let Some(value) = word_value(token) {
            total = total.saturating_add(value);
        }
    }
    total
}
