// ============================================================
// Layer 6 - Artifact Store
// ============================================================
// Everything `prepare` produces lives in one output directory:
//
//   out/
//     prepare_config.json   ← the PrepareConfig used for the run
//     prepare_summary.json  ← lengths, index layout, unknown stats
//     tokenizer.json        ← vocabulary (see TokenizerStore)
//     embeddings.json       ← restricted GloVe matrix [V, dim]
//     embedding_table.json  ← full table [V + C + 1, dim]
//     train.jsonl           ← SpanSample per line
//     dev.jsonl             ← SpanSample per line
//     dev_multi.jsonl       ← MultiSample per line
//     test_multi.jsonl      ← MultiSample per line
//     train_concat.jsonl    ← ConcatSample per line (optional)
//     dev_concat.jsonl      ← ConcatSample per line (optional)
//
// The config is saved first so a later `select` run can find the
// question type and data directory the artifacts came from.

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::application::prepare_use_case::PrepareConfig;
use crate::data::{embedding::EmbeddingMatrix, loader::read_json_lines, vocab::IndexLayout, vectorizer::UnknownStats};
use crate::domain::traits::Persistable;

pub const CONFIG_FILE:   &str = "prepare_config.json";
pub const SUMMARY_FILE:  &str = "prepare_summary.json";
pub const EMBEDDINGS:    &str = "embeddings.json";
pub const TABLE:         &str = "embedding_table.json";
pub const TRAIN:         &str = "train.jsonl";
pub const DEV:           &str = "dev.jsonl";
pub const DEV_MULTI:     &str = "dev_multi.jsonl";
pub const TEST_MULTI:    &str = "test_multi.jsonl";
pub const TRAIN_CONCAT:  &str = "train_concat.jsonl";
pub const DEV_CONCAT:    &str = "dev_concat.jsonl";

/// Statistics of a prepare run, persisted next to the datasets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrepareSummary {
    pub max_context_len:  usize,
    pub max_question_len: usize,
    pub layout:           IndexLayout,
    pub embedding_dim:    usize,
    pub train_examples:   usize,
    pub dev_examples:     usize,
    pub dev_queries:      usize,
    pub test_queries:     usize,
    pub train_batches:    usize,
    pub unknowns:         UnknownStats,
}

pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Creates the directory if it doesn't exist yet.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create artifact directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    /// Opens an existing directory without creating it.
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    pub fn save_config(&self, cfg: &PrepareConfig) -> Result<()> {
        self.write_json(CONFIG_FILE, cfg)
    }

    pub fn load_config(&self) -> Result<PrepareConfig> {
        self.read_json(CONFIG_FILE).with_context(|| {
            format!("No prepare config in '{}'. Have you run 'prepare' first?", self.dir.display())
        })
    }

    pub fn save_summary(&self, summary: &PrepareSummary) -> Result<()> {
        self.write_json(SUMMARY_FILE, summary)
    }

    pub fn save_matrix(&self, name: &str, matrix: &EmbeddingMatrix) -> Result<()> {
        matrix.save(&self.path(name))
    }

    /// One `serde_json::to_string` per line.
    pub fn write_json_lines<T: Serialize>(&self, name: &str, items: &[T]) -> Result<PathBuf> {
        let path = self.path(name);
        write_json_lines(&path, items)?;
        tracing::debug!("Wrote {} lines to '{}'", items.len(), path.display());
        Ok(path)
    }

    pub fn read_json_lines<T: DeserializeOwned>(&self, name: &str) -> Result<Vec<T>> {
        read_json_lines(&self.path(name))
    }

    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.path(name);
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json).with_context(|| format!("Cannot write '{}'", path.display()))
    }

    fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let path = self.path(name);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("Malformed JSON in '{}'", path.display()))
    }
}

/// Write `items` to `path` as JSON lines.
pub fn write_json_lines<T: Serialize>(path: &Path, items: &[T]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Cannot create '{}'", path.display()))?;
    let mut w = BufWriter::new(file);
    for item in items {
        writeln!(w, "{}", serde_json::to_string(item)?)?;
    }
    w.flush().with_context(|| format!("Cannot write '{}'", path.display()))
}
