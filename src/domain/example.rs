// ============================================================
// Layer 3 - Tokenized Examples
// ============================================================
// Extractive reading comprehension: the answer is a SPAN of
// the passage, given as an inclusive [begin, end] pair of
// token indices into the passage.
//
// Example:
//   question: ["where", "is", "the", "eiffel", "tower"]
//   context:  ["the", "tower", "stands", "in", "paris", "."]
//   answer:   "paris" → begin = 4, end = 4

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A training / validation example built from one selected passage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpanExample {
    pub context:      Vec<String>,
    pub question:     Vec<String>,
    pub query_id:     Value,
    /// Index of the FIRST answer token in `context`
    pub answer_begin: usize,
    /// Index of the LAST answer token in `context` (inclusive)
    pub answer_end:   usize,
    /// The untokenized answer string that matched
    pub answer_text:  String,
}

/// Every passage of one query, used when evaluating over the
/// full candidate set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MultiPassageExample {
    pub passages: Vec<Vec<String>>,
    pub question: Vec<String>,
    pub query_id: Value,
    pub urls:     Vec<String>,
}

impl MultiPassageExample {
    /// Unpadded token count of each passage
    pub fn passage_lengths(&self) -> Vec<usize> {
        self.passages.iter().map(Vec::len).collect()
    }
}

/// All passages of a query joined into one long context with
/// the answer located somewhere in the concatenation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConcatenatedExample {
    pub context:         Vec<String>,
    pub passage_lengths: Vec<usize>,
    pub question:        Vec<String>,
    pub query_id:        Value,
    pub answer_begin:    usize,
    pub answer_end:      usize,
    pub answer_text:     String,
}

impl ConcatenatedExample {
    /// Split the concatenated context back into its passages.
    pub fn passages(&self) -> Vec<&[String]> {
        let mut out   = Vec::with_capacity(self.passage_lengths.len());
        let mut start = 0usize;
        for &len in &self.passage_lengths {
            let end = (start + len).min(self.context.len());
            out.push(&self.context[start..end]);
            start = end;
        }
        out
    }
}
