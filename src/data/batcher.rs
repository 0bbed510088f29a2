// ============================================================
// Layer 4 - Span Batcher and Batch Sampler
// ============================================================
// SpanBatcher implements burn's Batcher trait and stacks padded
// SpanSamples into Int tensors:
//
//   context_ids   [N, max_context]
//   question_ids  [N, max_question]
//   lengths, begins, ends  [N]
//
// BatchSampler decides WHICH samples go into a batch:
//
//   random_batch     batch_size indices drawn uniformly WITH
//                    replacement (training / validation loss)
//   next_sequential  [cursor*bs, min(len, (cursor+1)*bs)), then the
//                    cursor advances and wraps to 0 after the last
//                    batch (evaluation passes)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::data::dataset::SpanSample;

#[derive(Debug, Clone)]
pub struct SpanBatch<B: Backend> {
    pub context_ids:     Tensor<B, 2, Int>,
    pub context_lens:    Tensor<B, 1, Int>,
    pub question_ids:    Tensor<B, 2, Int>,
    pub question_lens:   Tensor<B, 1, Int>,
    pub answer_begins:   Tensor<B, 1, Int>,
    pub answer_ends:     Tensor<B, 1, Int>,
}

#[derive(Clone, Debug)]
pub struct SpanBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> SpanBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    fn ints_2d(&self, rows: Vec<&[u32]>) -> Tensor<B, 2, Int> {
        let n     = rows.len();
        let width = rows.first().map_or(0, |r| r.len());
        let flat: Vec<i32> = rows.iter().flat_map(|r| r.iter().map(|&x| x as i32)).collect();
        Tensor::<B, 1, Int>::from_ints(flat.as_slice(), &self.device).reshape([n, width])
    }

    fn ints_1d(&self, values: impl Iterator<Item = usize>) -> Tensor<B, 1, Int> {
        let v: Vec<i32> = values.map(|x| x as i32).collect();
        Tensor::<B, 1, Int>::from_ints(v.as_slice(), &self.device)
    }
}

impl<B: Backend> Batcher<SpanSample, SpanBatch<B>> for SpanBatcher<B> {
    /// Samples must already share one padded context length and one
    /// padded question length.
    fn batch(&self, items: Vec<SpanSample>) -> SpanBatch<B> {
        SpanBatch {
            context_ids:   self.ints_2d(items.iter().map(|s| s.context_ids.as_slice()).collect()),
            context_lens:  self.ints_1d(items.iter().map(|s| s.context_len)),
            question_ids:  self.ints_2d(items.iter().map(|s| s.question_ids.as_slice()).collect()),
            question_lens: self.ints_1d(items.iter().map(|s| s.question_len)),
            answer_begins: self.ints_1d(items.iter().map(|s| s.answer_begin)),
            answer_ends:   self.ints_1d(items.iter().map(|s| s.answer_end)),
        }
    }
}

/// Index sampler over a dataset of `len` items.
pub struct BatchSampler {
    len:        usize,
    batch_size: usize,
    cursor:     usize,
    rng:        StdRng,
}

impl BatchSampler {
    pub fn new(len: usize, batch_size: usize) -> Self {
        Self::with_rng(len, batch_size, StdRng::from_entropy())
    }

    pub fn with_seed(len: usize, batch_size: usize, seed: u64) -> Self {
        Self::with_rng(len, batch_size, StdRng::seed_from_u64(seed))
    }

    fn with_rng(len: usize, batch_size: usize, rng: StdRng) -> Self {
        Self { len, batch_size: batch_size.max(1), cursor: 0, rng }
    }

    pub fn num_batches(&self) -> usize {
        self.len.div_ceil(self.batch_size)
    }

    /// `batch_size` indices drawn uniformly with replacement.
    pub fn random_batch(&mut self) -> Vec<usize> {
        if self.len == 0 {
            return Vec::new();
        }
        (0..self.batch_size).map(|_| self.rng.gen_range(0..self.len)).collect()
    }

    /// The next contiguous batch; wraps to the first batch after the last.
    pub fn next_sequential(&mut self) -> Vec<usize> {
        if self.len == 0 {
            return Vec::new();
        }
        let start = self.cursor * self.batch_size;
        let end   = self.len.min((self.cursor + 1) * self.batch_size);

        self.cursor += 1;
        if self.cursor >= self.num_batches() {
            self.cursor = 0;
        }
        (start..end).collect()
    }
}
