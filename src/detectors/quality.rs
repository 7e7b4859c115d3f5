//! Text-quality scoring for backends that report no recognition confidence
//!
//! Garbled recognition output has tell-tale shapes: symbols where letters
//! should be, runs of one-character fragments, and long repeated runs. The
//! score folds those signals into a value in [0, 1].

/// Score one recognized line
pub fn line_confidence(text: &str) -> f32 {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return 0.0;
    }

    // A line full of stray symbols is unusable however well it is spaced
    let shape = 0.6 * fragment_score(trimmed) + 0.4 * run_score(trimmed);
    let score = symbol_score(trimmed) * shape;

    // Very short lines carry little evidence either way
    let chars = trimmed.chars().count();
    let score = if chars < 3 { score.min(0.6) } else { score };

    score.clamp(0.0, 1.0)
}

/// Share of characters that plausibly appear on an invoice
fn symbol_score(text: &str) -> f32 {
    let total = text.chars().filter(|c| !c.is_whitespace()).count();
    if total == 0 {
        return 0.0;
    }
    let expected = text
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_ascii_punctuation())
        .count();
    let ratio = expected as f32 / total as f32;
    // Every stray symbol costs more than its share
    (1.0 - (1.0 - ratio) * 4.0).max(0.0)
}

/// Penalize lines made of mostly one-character pieces
fn fragment_score(text: &str) -> f32 {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= 1 {
        return 1.0;
    }
    let single = words.iter().filter(|w| w.chars().count() == 1).count();
    let ratio = single as f32 / words.len() as f32;
    1.0 - (ratio * 1.5).min(0.8)
}

/// Penalize long runs of the same non-space character ("aaaaa", "#####")
fn run_score(text: &str) -> f32 {
    let mut longest = 1;
    let mut current = 1;
    let mut prev: Option<char> = None;

    for c in text.chars() {
        if Some(c) == prev && !c.is_whitespace() {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 1;
        }
        prev = Some(c);
    }

    match longest {
        1..=3 => 1.0,
        4..=5 => 0.7,
        6..=9 => 0.4,
        _ => 0.1,
    }
}
