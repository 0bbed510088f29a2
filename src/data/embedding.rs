// ============================================================
// Layer 4 - Word Embeddings
// ============================================================
// Loads pre-trained GloVe vectors and restricts the vocabulary to
// the words GloVe covers.
//
// GloVe text format, one word per line:
//
//   the 0.418 0.24968 -0.41242 ...
//
// Restriction walks the sorted vocabulary in order and keeps only
// covered words, so the embedding row of a word is its position
// among the kept words. Everything else becomes an unknown token.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs::{self, File},
    io::{BufRead, BufReader},
    path::Path,
};

use crate::data::vocab::Vocabulary;
use crate::domain::traits::Persistable;

/// Word → vector lookup loaded from a GloVe file.
#[derive(Debug, Clone, Default)]
pub struct GloveIndex {
    dim:     usize,
    vectors: HashMap<String, Vec<f32>>,
}

impl GloveIndex {
    pub fn from_file(path: &Path) -> Result<Self> {
        tracing::info!("Loading GloVe vectors from '{}'", path.display());
        let file = File::open(path)
            .with_context(|| format!("Cannot open GloVe file '{}'", path.display()))?;
        let index = Self::from_reader(BufReader::new(file))
            .with_context(|| format!("Cannot parse GloVe file '{}'", path.display()))?;
        tracing::info!("Found {} word vectors (dim {})", index.len(), index.dim);
        Ok(index)
    }

    /// Parse GloVe lines. The dimension is fixed by the first
    /// non-blank line; any line disagreeing with it is an error.
    pub fn from_reader(reader: impl BufRead) -> Result<Self> {
        let mut dim     = 0usize;
        let mut vectors = HashMap::new();

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            let mut parts = line.split_whitespace();
            let Some(word) = parts.next() else { continue };

            let coefs = parts
                .map(str::parse::<f32>)
                .collect::<Result<Vec<f32>, _>>()
                .with_context(|| format!("Bad number on line {}", line_no + 1))?;

            if dim == 0 {
                dim = coefs.len();
            }
            if coefs.is_empty() || coefs.len() != dim {
                bail!(
                    "Line {} has {} values, expected {}",
                    line_no + 1, coefs.len(), dim
                );
            }
            vectors.insert(word.to_string(), coefs);
        }

        if vectors.is_empty() {
            bail!("No word vectors found");
        }
        Ok(Self { dim, vectors })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn get(&self, word: &str) -> Option<&[f32]> {
        self.vectors.get(word).map(Vec::as_slice)
    }
}

/// Row-major `[rows, dim]` matrix of word vectors, one row per word
/// of the restricted vocabulary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingMatrix {
    pub dim:  usize,
    pub data: Vec<f32>,
}

impl EmbeddingMatrix {
    /// Keep the vocabulary words GloVe covers, in vocabulary order.
    /// Returns the matrix and the restricted vocabulary.
    pub fn restrict(glove: &GloveIndex, vocab: &Vocabulary) -> (Self, Vocabulary) {
        let kept = vocab.retain(|w| glove.get(w).is_some());

        let mut data = Vec::with_capacity(kept.len() * glove.dim());
        for word in kept.words() {
            if let Some(v) = glove.get(word) {
                data.extend_from_slice(v);
            }
        }

        tracing::info!(
            "Number of unknown words: {} (kept {} of {})",
            vocab.len() - kept.len(),
            kept.len(),
            vocab.len()
        );
        (Self { dim: glove.dim(), data }, kept)
    }

    pub fn rows(&self) -> usize {
        if self.dim == 0 { 0 } else { self.data.len() / self.dim }
    }

    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.dim..(i + 1) * self.dim]
    }
}

impl Persistable for EmbeddingMatrix {
    fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string(self)?;
        fs::write(path, json)
            .with_context(|| format!("Cannot write embeddings to '{}'", path.display()))
    }

    fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read embeddings from '{}'", path.display()))?;
        Ok(serde_json::from_str(&json)?)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    const GLOVE: &str = "a 0.1 0.2\nparis 1.0 2.0\n\ntower -1 0.5\n";

    #[test]
    fn test_parses_glove_lines() {
        let glove = GloveIndex::from_reader(GLOVE.as_bytes()).unwrap();
        assert_eq!(glove.dim(), 2);
        assert_eq!(glove.len(), 3);
        assert_eq!(glove.get("tower"), Some(&[-1.0, 0.5][..]));
    }

    #[test]
    fn test_rejects_ragged_and_empty_files() {
        assert!(GloveIndex::from_reader("a 1 2\nb 1\n".as_bytes()).is_err());
        assert!(GloveIndex::from_reader("a 1 x\n".as_bytes()).is_err());
        assert!(GloveIndex::from_reader("".as_bytes()).is_err());
    }

    #[test]
    fn test_restrict_keeps_covered_words_in_order() {
        let glove = GloveIndex::from_reader(GLOVE.as_bytes()).unwrap();
        let vocab = Vocabulary::from_sorted(
            ["a", "eiffel", "paris", "tower"].iter().map(|s| s.to_string()).collect(),
        );
        let (matrix, kept) = EmbeddingMatrix::restrict(&glove, &vocab);

        assert_eq!(kept.words(), &["a", "paris", "tower"]);
        assert_eq!(matrix.rows(), 3);
        assert_eq!(matrix.row(1), &[1.0, 2.0]);
        assert_eq!(kept.get("tower"), Some(2));
    }

    #[test]
    fn test_persists_round_trip() {
        let dir    = tempfile::tempdir().unwrap();
        let path   = dir.path().join("emb.json");
        let matrix = EmbeddingMatrix { dim: 2, data: vec![1.0, 2.0, 3.0, 4.0] };
        matrix.save(&path).unwrap();
        assert_eq!(EmbeddingMatrix::load(&path).unwrap(), matrix);
    }
}
