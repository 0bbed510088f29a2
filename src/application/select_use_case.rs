// ============================================================
// Layer 2 - SelectUseCase
// ============================================================
// Turns span-model outputs into evaluation answers:
//
//   Step 1: Open the prepared artifacts        (Layer 6 - infra)
//   Step 2: Load model outputs by query id     (Layer 4 - data)
//   Step 3: Walk the prepared queries in
//           sequential batches and re-rank     (Layer 5 - ml)
//   Step 4: Write reference / candidate files  (Layer 6 - infra)
//   Step 5: Optionally write demo answers      (Layer 6 - infra)
//
// Queries without a model output still get a line in the eval
// files (empty candidate), so the files stay aligned with the
// reference set.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, path::{Path, PathBuf}};

use crate::data::{
    batcher::BatchSampler,
    dataset::{ConcatSample, MultiSample},
    loader::{load_first_answers, read_json_lines},
    tokenizer::join_punctuation,
};
use crate::domain::record::query_id_key;
use crate::infra::{
    artifact_store::{self as files, ArtifactStore},
    eval_writer::{write_demo_answers, DemoQuery, EvalFiles, EvalWriter, Prediction},
};
use crate::ml::selector::{select_passage, span_tokens, ModelOutput, PassageScores};

/// Which prepared set the model outputs belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvalSplit {
    /// dev_multi.jsonl, references from the dev file
    Dev,
    /// test_multi.jsonl, references from the test file
    Test,
    /// dev_concat.jsonl, references from the gold spans
    Concat,
}

impl std::str::FromStr for EvalSplit {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "dev"    => Ok(Self::Dev),
            "test"   => Ok(Self::Test),
            "concat" => Ok(Self::Concat),
            other    => bail!("Unknown split '{other}' (expected dev, test or concat)"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectConfig {
    pub artifacts_dir: String,
    /// JSON lines of ModelOutput
    pub model_outputs: String,
    pub split:         EvalSplit,
    pub eval_dir:      String,
    pub model_name:    String,
    pub demo_dir:      Option<String>,
    pub batch_size:    usize,
    /// Model outputs hold raw logits rather than probabilities
    pub logits:        bool,
}

impl Default for SelectConfig {
    fn default() -> Self {
        Self {
            artifacts_dir: "prepared".to_string(),
            model_outputs: "model_outputs.jsonl".to_string(),
            split:         EvalSplit::Dev,
            eval_dir:      "eval".to_string(),
            model_name:    "baseline".to_string(),
            demo_dir:      None,
            batch_size:    64,
            logits:        false,
        }
    }
}

impl SelectConfig {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            bail!("Batch size must be at least 1");
        }
        if self.model_name.is_empty() {
            bail!("Model name must not be empty");
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SelectReport {
    pub queries:         usize,
    pub missing_outputs: usize,
    pub files:           EvalFiles,
    pub demo_files:      usize,
}

pub struct SelectUseCase {
    config: SelectConfig,
}

impl SelectUseCase {
    pub fn new(config: SelectConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<SelectReport> {
        let cfg = &self.config;
        cfg.validate()?;

        // ── Step 1: Prepared artifacts ───────────────────────────────────────
        let store = ArtifactStore::open(&cfg.artifacts_dir);
        let prep  = store.load_config()?;

        // ── Step 2: Model outputs ────────────────────────────────────────────
        let outputs: Vec<ModelOutput> = read_json_lines(Path::new(&cfg.model_outputs))?;
        // Raw logits are turned into distributions here so the
        // selection score stays a product of probabilities.
        let outputs: HashMap<String, Vec<PassageScores>> = outputs
            .into_iter()
            .map(|o| {
                let passages = if cfg.logits {
                    o.passages.iter().map(|p| PassageScores::from_logits(&p.start, &p.end)).collect()
                } else {
                    o.passages
                };
                (query_id_key(&o.query_id), passages)
            })
            .collect();
        tracing::info!("Loaded model outputs for {} queries", outputs.len());

        let writer = EvalWriter::new(&cfg.eval_dir);

        match cfg.split {
            EvalSplit::Dev | EvalSplit::Test => {
                let (name, source) = if cfg.split == EvalSplit::Dev {
                    (files::DEV_MULTI, prep.dev_path())
                } else {
                    (files::TEST_MULTI, prep.test_path())
                };
                let samples: Vec<MultiSample> = store.read_json_lines(name)?;

                // ── Step 3: Re-rank ──────────────────────────────────────────
                let (predictions, demos, missing) = self.rerank(&samples, &outputs);

                // ── Step 4: Eval files ───────────────────────────────────────
                let answers = load_first_answers(&source)?;
                let files   = writer.write_reference_candidates(
                    &prep.question_type, &cfg.model_name, &predictions, &answers,
                )?;

                // ── Step 5: Demo answers ─────────────────────────────────────
                let demo_files = match &cfg.demo_dir {
                    Some(dir) => write_demo_answers(&PathBuf::from(dir).join(&cfg.model_name), &demos)?,
                    None      => 0,
                };

                Ok(SelectReport { queries: predictions.len(), missing_outputs: missing, files, demo_files })
            }
            EvalSplit::Concat => {
                let samples: Vec<ConcatSample> = store.read_json_lines(files::DEV_CONCAT)?;
                let mut missing = 0usize;
                let mut gold    = Vec::with_capacity(samples.len());

                let predictions: Vec<Prediction> = samples
                    .iter()
                    .map(|s| {
                        let scores = outputs.get(&query_id_key(&s.query_id));
                        if scores.is_none() {
                            missing += 1;
                        }
                        // one distribution over the whole concatenated context
                        let sel = select_passage(&[1.0], scores.map(|p| &p[..p.len().min(1)]).unwrap_or(&[]));
                        gold.push((s.span.answer_begin, s.span.answer_end));
                        Prediction { query_id: s.query_id.clone(), tokens: s.context.clone(), begin: sel.begin, end: sel.end }
                    })
                    .collect();

                if missing > 0 {
                    tracing::warn!("{} queries had no model output", missing);
                }
                let files = writer.write_gold_candidates(&prep.question_type, &cfg.model_name, &predictions, &gold)?;
                Ok(SelectReport { queries: predictions.len(), missing_outputs: missing, files, demo_files: 0 })
            }
        }
    }

    /// Pick a passage and span for every query, batch by batch.
    fn rerank(
        &self,
        samples: &[MultiSample],
        outputs: &HashMap<String, Vec<PassageScores>>,
    ) -> (Vec<Prediction>, Vec<DemoQuery>, usize) {
        let mut sampler     = BatchSampler::new(samples.len(), self.config.batch_size);
        let mut predictions = Vec::with_capacity(samples.len());
        let mut demos       = Vec::new();
        let mut missing     = 0usize;

        // Walk the split in order, one sequential batch at a time
        for _ in 0..sampler.num_batches() {
            for i in sampler.next_sequential() {
                let s      = &samples[i];

                // A query the model never saw scores nothing and falls
                // back to the default selection
                let scores = match outputs.get(&query_id_key(&s.query_id)) {
                    Some(scores) => scores.clone(),
                    None         => {
                        missing += 1;
                        Vec::new()
                    }
                };
                let sel    = select_passage(&s.relevance, &scores);
                let tokens = s.passages.get(sel.passage).cloned().unwrap_or_default();

                // Show the first few answers so a run can be eyeballed
                if predictions.len() < 3 {
                    tracing::debug!(
                        "Query {}: passage {} → '{}'",
                        query_id_key(&s.query_id),
                        sel.passage,
                        join_punctuation(span_tokens(&tokens, sel.begin, sel.end))
                    );
                }

                predictions.push(Prediction {
                    query_id: s.query_id.clone(),
                    tokens,
                    begin:    sel.begin,
                    end:      sel.end,
                });
                // Demo files need every passage, not only the winner
                if self.config.demo_dir.is_some() {
                    demos.push(DemoQuery {
                        query_id:  s.query_id.clone(),
                        passages:  s.passages.clone(),
                        urls:      s.urls.clone(),
                        relevance: s.relevance.clone(),
                        scores,
                        selection: sel,
                    });
                }
            }
        }

        if missing > 0 {
            tracing::warn!("{} queries had no model output", missing);
        }
        (predictions, demos, missing)
    }
}
