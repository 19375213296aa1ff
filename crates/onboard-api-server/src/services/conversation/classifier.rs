//! Persona classifier: ordered keyword heuristics over the user's text.
//!
//! Rules are evaluated in declaration order and the first match wins, so an
//! input touching several buckets classifies into the earliest one. No match
//! leaves the user unclassified and is not an error.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::types::Persona;

static RULES: Lazy<Vec<(Persona, Regex)>> = Lazy::new(|| {
    vec![
        (
            Persona::Newcomer,
            Regex::new(r"\bnew\b|no idea|help me|what is crypto|explain").unwrap(),
        ),
        (
            Persona::Enthusiast,
            Regex::new(r"degen|\bser\b|moon|pump|ngmi|wagmi").unwrap(),
        ),
        (
            Persona::Builder,
            Regex::new(r"build|developer|partnership|team|launch").unwrap(),
        ),
        (
            Persona::Creative,
            Regex::new(r"artist|\bart\b|music|musician|nft|mint|song|creative").unwrap(),
        ),
        (
            Persona::Trader,
            Regex::new(r"trader|trade|charts|analysis|calls|\bta\b").unwrap(),
        ),
    ]
});

/// Classify free text into a persona bucket. Input is lower-cased before
/// matching; returns `None` when no rule fires.
pub fn classify(input: &str) -> Option<Persona> {
    let text = input.to_lowercase();
    for (persona, pattern) in RULES.iter() {
        if pattern.is_match(&text) {
            debug!("Classified input as {}: matched {}", persona.as_str(), pattern);
            return Some(*persona);
        }
    }
    None
}
