//! Control-flow density scoring
//!
//! This is the only complexity scorer in the crate; every caller maps
//! scores to tiers through [`level_for`].

use crate::core::chunk::{Complexity, ComplexityLevel};

/// Branching, looping, error-handling and pattern-matching keywords.
/// Matched on word boundaries.
const WORD_TOKENS: &[&str] = &[
    "if", "elif", "for", "foreach", "while", "loop", "case", "catch", "except", "match",
    "unsafe",
];

/// Short-circuit, ternary/try and escape-hatch operators. Matched literally.
const SYMBOL_TOKENS: &[&str] = &["&&", "||", "?", ".unwrap()", ".expect("];

const MEDIUM_THRESHOLD: u32 = 5;
const HIGH_THRESHOLD: u32 = 15;

/// Maximal runs of word characters, i.e. the text between word boundaries
fn word_runs(code: &str) -> impl Iterator<Item = &str> {
    code.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
}

/// Score `code`: 1 plus one per control-flow token occurrence
pub fn score(code: &str) -> Complexity {
    let words = word_runs(code).filter(|w| WORD_TOKENS.contains(w)).count() as u32;
    let symbols: u32 = SYMBOL_TOKENS
        .iter()
        .map(|token| code.matches(token).count() as u32)
        .sum();

    let score = 1 + words + symbols;
    Complexity {
        score,
        level: level_for(score),
    }
}

pub fn level_for(score: u32) -> ComplexityLevel {
    if score < MEDIUM_THRESHOLD {
        ComplexityLevel::Low
    } else if score < HIGH_THRESHOLD {
        ComplexityLevel::Medium
    } else {
        ComplexityLevel::High
    }
}
