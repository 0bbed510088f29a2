// ============================================================
// Layer 4 - Vectorizer
// ============================================================
// Maps tokens to indices in the shared index space and pads every
// sequence to a fixed length:
//
//   known word      → its row in the embedding matrix   (0 .. V)
//   unknown token   → V + class                          (V .. V+C)
//   padding         → V + C
//
// Sequences longer than the target length are left as they are;
// the target lengths are the corpus maxima, so this only happens
// when a caller passes a smaller limit on purpose.
//
// Unknown counts are tallied over context tokens per class and
// logged together with the overall unknown fraction.

use serde::{Deserialize, Serialize};

use crate::data::{
    dataset::{ConcatSample, MultiSample, SpanSample},
    relevance::passage_weights,
    vocab::{IndexLayout, UnknownClasses, Vocabulary},
};
use crate::domain::example::{ConcatenatedExample, MultiPassageExample, SpanExample};

/// Unknown-token counts over context tokens.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnknownStats {
    pub per_class:    Vec<usize>,
    pub total_tokens: usize,
}

impl UnknownStats {
    fn new(classes: usize) -> Self {
        Self { per_class: vec![0; classes], total_tokens: 0 }
    }

    pub fn unknown_total(&self) -> usize {
        self.per_class.iter().sum()
    }

    /// Unknown fraction of context tokens; 0.0 for an empty corpus.
    pub fn unknown_fraction(&self) -> f64 {
        if self.total_tokens == 0 {
            0.0
        } else {
            self.unknown_total() as f64 / self.total_tokens as f64
        }
    }
}

pub struct Vectorizer {
    vocab:   Vocabulary,
    classes: UnknownClasses,
    layout:  IndexLayout,
}

impl Vectorizer {
    pub fn new(vocab: Vocabulary, classes: UnknownClasses) -> Self {
        let layout = IndexLayout::new(vocab.len(), classes.len());
        Self { vocab, classes, layout }
    }

    pub fn layout(&self) -> IndexLayout {
        self.layout
    }

    /// Index of a token, with the unknown class when it is not a known word.
    pub fn lookup(&self, token: &str) -> (u32, Option<usize>) {
        match self.vocab.get(token) {
            Some(i) => (i as u32, None),
            None    => {
                let class = self.classes.classify(token);
                (self.layout.unknown_id(class) as u32, Some(class))
            }
        }
    }

    fn encode(&self, tokens: &[String], stats: Option<&mut UnknownStats>) -> Vec<u32> {
        match stats {
            // Context tokens are counted per unknown class
            Some(stats) => {
                stats.total_tokens += tokens.len();
                tokens
                    .iter()
                    .map(|t| {
                        let (id, class) = self.lookup(t);
                        if let Some(c) = class {
                            stats.per_class[c] += 1;
                        }
                        id
                    })
                    .collect()
            }
            // Question tokens are looked up the same way but not counted
            None => tokens.iter().map(|t| self.lookup(t).0).collect(),
        }
    }

    /// Encode and pad span examples.
    pub fn vectorize_spans(
        &self,
        examples:     &[SpanExample],
        max_context:  usize,
        max_question: usize,
    ) -> (Vec<SpanSample>, UnknownStats) {
        let pad       = self.layout.pad_id() as u32;
        let mut stats = UnknownStats::new(self.classes.len());

        let samples = examples
            .iter()
            .map(|ex| SpanSample {
                context_ids:  pad_sequence(self.encode(&ex.context, Some(&mut stats)), max_context, pad),
                context_len:  ex.context.len(),
                question_ids: pad_sequence(self.encode(&ex.question, None), max_question, pad),
                question_len: ex.question.len(),
                answer_begin: ex.answer_begin,
                answer_end:   ex.answer_end,
            })
            .collect();

        self.report(&stats);
        (samples, stats)
    }

    /// Encode and pad multi-passage examples. `relevance` holds one
    /// weight vector per example; missing entries become empty.
    pub fn vectorize_multi(
        &self,
        examples:     &[MultiPassageExample],
        relevance:    &[Vec<f32>],
        max_context:  usize,
        max_question: usize,
    ) -> (Vec<MultiSample>, UnknownStats) {
        let pad       = self.layout.pad_id() as u32;
        let mut stats = UnknownStats::new(self.classes.len());

        let samples = examples
            .iter()
            .enumerate()
            .map(|(i, ex)| MultiSample {
                query_id:     ex.query_id.clone(),
                passages:     ex.passages.clone(),
                urls:         ex.urls.clone(),
                passage_ids:  ex
                    .passages
                    .iter()
                    .map(|p| pad_sequence(self.encode(p, Some(&mut stats)), max_context, pad))
                    .collect(),
                passage_lens: ex.passage_lengths(),
                question_ids: pad_sequence(self.encode(&ex.question, None), max_question, pad),
                question_len: ex.question.len(),
                relevance:    relevance.get(i).cloned().unwrap_or_default(),
            })
            .collect();

        self.report(&stats);
        (samples, stats)
    }

    /// Encode and pad concatenated examples, spreading each passage's
    /// relevance over its tokens.
    pub fn vectorize_concatenated(
        &self,
        examples:     &[ConcatenatedExample],
        relevance:    &[Vec<f32>],
        max_context:  usize,
        max_question: usize,
    ) -> (Vec<ConcatSample>, UnknownStats) {
        let pad       = self.layout.pad_id() as u32;
        let mut stats = UnknownStats::new(self.classes.len());

        let samples = examples
            .iter()
            .enumerate()
            .map(|(i, ex)| {
                let rel = relevance.get(i).map(Vec::as_slice).unwrap_or(&[]);
                ConcatSample {
                    query_id: ex.query_id.clone(),
                    context:  ex.context.clone(),
                    span: SpanSample {
                        context_ids:  pad_sequence(self.encode(&ex.context, Some(&mut stats)), max_context, pad),
                        context_len:  ex.context.len(),
                        question_ids: pad_sequence(self.encode(&ex.question, None), max_question, pad),
                        question_len: ex.question.len(),
                        answer_begin: ex.answer_begin,
                        answer_end:   ex.answer_end,
                    },
                    passage_lens:  ex.passage_lengths.clone(),
                    token_weights: passage_weights(rel, &ex.passage_lengths, max_context),
                }
            })
            .collect();

        self.report(&stats);
        (samples, stats)
    }

    fn report(&self, stats: &UnknownStats) {
        let counts: Vec<String> = self
            .classes
            .names()
            .iter()
            .zip(&stats.per_class)
            .map(|(name, n)| format!("{name}={n}"))
            .collect();
        tracing::info!("Smart unknown counts: {}", counts.join(", "));
        tracing::info!("Percentage unknown: {:.4}", stats.unknown_fraction());
    }
}

/// Right-pad `seq` with `pad` up to `len`.
pub fn pad_sequence(mut seq: Vec<u32>, len: usize, pad: u32) -> Vec<u32> {
    if seq.len() < len {
        seq.resize(len, pad);
    }
    seq
}
