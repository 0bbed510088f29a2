// ============================================================
// Layer 4 - Vectorized Samples and Dataset
// ============================================================
// The padded index form of the examples, ready to be stacked
// into tensors. SpanDataset implements burn's Dataset trait so it
// can feed a DataLoader or be indexed by the BatchSampler.

use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One padded training / validation example.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpanSample {
    pub context_ids:  Vec<u32>,
    /// Unpadded context length
    pub context_len:  usize,
    pub question_ids: Vec<u32>,
    /// Unpadded question length
    pub question_len: usize,
    pub answer_begin: usize,
    pub answer_end:   usize,
}

/// One padded evaluation query with every candidate passage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MultiSample {
    pub query_id:     Value,
    /// Tokens of each passage, kept for answer extraction
    pub passages:     Vec<Vec<String>>,
    pub urls:         Vec<String>,
    pub passage_ids:  Vec<Vec<u32>>,
    pub passage_lens: Vec<usize>,
    pub question_ids: Vec<u32>,
    pub question_len: usize,
    /// Normalised TF-IDF relevance of each passage
    pub relevance:    Vec<f32>,
}

/// One padded query with all passages concatenated into a single
/// context and a per-token relevance weight.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConcatSample {
    pub query_id:       Value,
    /// Concatenated context tokens, kept for answer extraction
    pub context:        Vec<String>,
    pub span:           SpanSample,
    pub passage_lens:   Vec<usize>,
    /// Passage relevance spread over the context tokens, 0.0 on padding
    pub token_weights:  Vec<f32>,
}

pub struct SpanDataset {
    samples: Vec<SpanSample>,
}

impl SpanDataset {
    pub fn new(samples: Vec<SpanSample>) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &[SpanSample] {
        &self.samples
    }

    /// Clone out the samples at `indices`, skipping any out of range.
    pub fn select(&self, indices: &[usize]) -> Vec<SpanSample> {
        indices.iter().filter_map(|&i| self.samples.get(i).cloned()).collect()
    }
}

impl Dataset<SpanSample> for SpanDataset {
    fn get(&self, index: usize) -> Option<SpanSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(begin: usize, end: usize) -> SpanSample {
        SpanSample {
            context_ids:  vec![1, 2, 3, 9],
            context_len:  3,
            question_ids: vec![4, 9],
            question_len: 1,
            answer_begin: begin,
            answer_end:   end,
        }
    }

    #[test]
    fn test_dataset_indexing() {
        let ds = SpanDataset::new(vec![sample(0, 1), sample(2, 2)]);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.get(1).map(|s| s.answer_begin), Some(2));
        assert!(ds.get(2).is_none());
        assert_eq!(ds.select(&[1, 1, 5]).len(), 2);
    }
}
