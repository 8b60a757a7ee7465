//! Heuristic token estimation.
//!
//! This is not a tokenizer. It weights characters by script so that prompt
//! sizes can be reasoned about without a provider round-trip.

/// Weight added per whitespace-separated word.
const WORD_WEIGHT: f64 = 0.1;

fn char_weight(c: char) -> f64 {
    match c {
        c if c.is_whitespace() => 0.25,
        '\u{0400}'..='\u{04FF}' => 0.5,
        '\u{4E00}'..='\u{9FFF}' => 1.0,
        '\u{3040}'..='\u{30FF}' => 0.75,
        c if c.is_alphanumeric() => 0.25,
        _ => 0.5,
    }
}

/// Estimates the token count of `text`.
///
/// Blank text is zero tokens; anything else is at least one.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub fn estimate_tokens(text: &str) -> usize {
    if text.trim().is_empty() {
        return 0;
    }
    let chars: f64 = text.chars().map(char_weight).sum();
    let words = text.split_whitespace().count() as f64;
    let total = (chars + words * WORD_WEIGHT).floor() as usize;
    total.max(1)
}

/// Sums the estimate over several texts.
pub fn estimate_tokens_for<'a>(texts: impl IntoIterator<Item = &'a str>) -> usize {
    texts.into_iter().map(estimate_tokens).sum()
}
