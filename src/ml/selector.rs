// ============================================================
// Layer 5 - Passage Selector
// ============================================================
// Re-ranks the candidate passages of one query using the span
// model's per-passage start/end probability distributions and the
// TF-IDF relevance weights:
//
//   begin = argmax(start)      end = argmax(end)
//   score = weight[p] * max(start) * max(end)
//
// The passage with the strictly greatest score above 0.0 wins.
// When nothing beats 0.0 the answer defaults to passage 0, span (0, 0).
// Ties keep the earlier passage.
//
// The model itself lives outside this crate; its outputs arrive as
// JSON lines of ModelOutput.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Start and end distributions the model produced for one passage.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PassageScores {
    pub start: Vec<f32>,
    pub end:   Vec<f32>,
}

impl PassageScores {
    /// Build from raw logits by applying softmax to each side.
    pub fn from_logits(start: &[f32], end: &[f32]) -> Self {
        Self { start: softmax(start), end: softmax(end) }
    }
}

/// Model output for one query, one entry per passage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelOutput {
    pub query_id: Value,
    pub passages: Vec<PassageScores>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection {
    pub passage: usize,
    pub begin:   usize,
    pub end:     usize,
    pub score:   f32,
}

impl Default for Selection {
    fn default() -> Self {
        Self { passage: 0, begin: 0, end: 0, score: 0.0 }
    }
}

/// Pick the best passage and span. Missing weights count as 0.0.
pub fn select_passage(weights: &[f32], passages: &[PassageScores]) -> Selection {
    // Starts at passage 0, span (0, 0), score 0.0
    let mut best = Selection::default();

    for (p, scores) in passages.iter().enumerate() {
        // Most likely start and end, each with its probability
        let (begin, begin_prob) = argmax(&scores.start);
        let (end, end_prob)     = argmax(&scores.end);

        // Confidence of the span scaled by how relevant the passage is
        let weight = weights.get(p).copied().unwrap_or(0.0);
        let score  = weight * begin_prob * end_prob;

        // Strictly greater: an equal score never displaces an earlier passage
        if score > best.score {
            best = Selection { passage: p, begin, end, score };
        }
    }
    best
}

/// Index and value of the first maximum; (0, 0.0) for an empty slice.
pub fn argmax(xs: &[f32]) -> (usize, f32) {
    xs.iter()
        .copied()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, x)| match best {
            Some((_, b)) if b >= x => best,
            _                      => Some((i, x)),
        })
        .unwrap_or((0, 0.0))
}

/// Numerically stable softmax.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    // Subtracting the max keeps exp() from overflowing on large logits
    let max  = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// The tokens of an inclusive span, clamped to the passage.
///
/// The end argmax runs over the padded context, so it can land past
/// the last real token; the span then stops at the passage end.
/// Inverted spans and spans starting past the end are empty.
pub fn span_tokens(tokens: &[String], begin: usize, end: usize) -> &[String] {
    if begin > end || begin >= tokens.len() {
        return &[];
    }
    &tokens[begin..(end + 1).min(tokens.len())]
}

/// The tokens of a span joined by spaces.
pub fn answer_text(tokens: &[String], begin: usize, end: usize) -> String {
    span_tokens(tokens, begin, end).join(" ")
}
