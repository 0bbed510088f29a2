// ============================================================
// Layer 2 - RelevanceUseCase
// ============================================================
// Scores passage relevance for one corpus file on its own:
//
//   Step 1: Load records                 (Layer 4 - data)
//   Step 2: Tokenize every passage        (Layer 4 - data)
//   Step 3: TF-IDF relevance per query    (Layer 4 - data)
//   Step 4: Write one JSON line per query (Layer 6 - infra)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use crate::data::{
    loader::JsonLinesLoader,
    relevance::{RelevanceMode, TfidfScorer},
    splitter::Splitter,
};
use crate::domain::traits::RecordSource;
use crate::infra::artifact_store::write_json_lines;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelevanceConfig {
    pub input:  String,
    pub output: String,
    pub mode:   RelevanceMode,
}

impl Default for RelevanceConfig {
    fn default() -> Self {
        Self {
            input:  "datasets/msmarco/dev/description.json".to_string(),
            output: "relevance.jsonl".to_string(),
            mode:   RelevanceMode::Binary,
        }
    }
}

/// One output line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelevanceLine {
    pub query_id:  Value,
    pub relevance: Vec<f32>,
}

pub struct RelevanceUseCase {
    config: RelevanceConfig,
}

impl RelevanceUseCase {
    pub fn new(config: RelevanceConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<usize> {
        let cfg     = &self.config;
        let records = JsonLinesLoader::new(&cfg.input).load_all()?;
        let split   = Splitter::new().split_multi(&records);

        let scorer    = TfidfScorer::new(cfg.mode);
        let questions: Vec<Vec<String>>      = split.examples.iter().map(|e| e.question.clone()).collect();
        let passages:  Vec<Vec<Vec<String>>> = split.examples.iter().map(|e| e.passages.clone()).collect();
        let scores    = scorer.score_all(&questions, &passages);

        let lines: Vec<RelevanceLine> = split
            .examples
            .iter()
            .zip(scores)
            .map(|(e, relevance)| RelevanceLine { query_id: e.query_id.clone(), relevance })
            .collect();

        write_json_lines(Path::new(&cfg.output), &lines)?;
        tracing::info!("Wrote {:?} relevance for {} queries to '{}'", cfg.mode, lines.len(), cfg.output);
        Ok(lines.len())
    }
}
