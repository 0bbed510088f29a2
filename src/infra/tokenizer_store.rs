// ============================================================
// Layer 6 - Tokenizer Store
// ============================================================
// Persists the restricted vocabulary as a HuggingFace word-level
// tokenizer JSON, so the exact index layout can be reloaded by
// this crate or by any tool that speaks the tokenizers format.
//
// Ids in the written file follow the pipeline's index layout:
//
//   0 .. V      vocabulary words
//   V .. V+C    [UNK:<class>] tokens, one per unknown class
//   V+C         [PAD]
//
// The catch-all class token doubles as the model's unk_token.
// Text is expected to be pre-tokenized, so the pre-tokenizer only
// splits on whitespace.

use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;
use tokenizers::Tokenizer;

use crate::data::vocab::{IndexLayout, UnknownClasses, Vocabulary};

pub const TOKENIZER_FILE: &str = "tokenizer.json";
pub const PAD_TOKEN: &str = "[PAD]";

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(TOKENIZER_FILE)
    }

    /// Write the vocabulary and unknown classes as tokenizer JSON.
    pub fn save(&self, vocab: &Vocabulary, classes: &UnknownClasses) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;

        let layout = IndexLayout::new(vocab.len(), classes.len());

        let mut model_vocab = serde_json::Map::new();
        for (i, word) in vocab.words().iter().enumerate() {
            model_vocab.insert(word.clone(), serde_json::json!(i));
        }

        let mut added_tokens = Vec::with_capacity(classes.len() + 1);
        for (c, name) in classes.names().iter().enumerate() {
            let token = unknown_token(name);
            let id    = layout.unknown_id(c);
            model_vocab.insert(token.clone(), serde_json::json!(id));
            added_tokens.push(special_token(id, &token));
        }
        model_vocab.insert(PAD_TOKEN.to_string(), serde_json::json!(layout.pad_id()));
        added_tokens.push(special_token(layout.pad_id(), PAD_TOKEN));

        let catch_all = classes
            .names()
            .last()
            .map(|n| unknown_token(n))
            .ok_or_else(|| anyhow!("At least one unknown class is required"))?;

        let tokenizer_json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": added_tokens,
            "normalizer": null,
            "pre_tokenizer": { "type": "WhitespaceSplit" },
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": model_vocab,
                "unk_token": catch_all
            }
        });

        let path = self.path();
        std::fs::write(&path, serde_json::to_string_pretty(&tokenizer_json)?)
            .with_context(|| format!("Cannot write tokenizer JSON to '{}'", path.display()))?;

        tracing::info!(
            "Vocabulary of {} words (+{} unknown classes, padding) saved to '{}'",
            vocab.len(),
            classes.len(),
            path.display()
        );
        Ok(path)
    }

    pub fn load_tokenizer(&self) -> Result<Tokenizer> {
        let path = self.path();
        Tokenizer::from_file(&path)
            .map_err(|e| anyhow!("Cannot load tokenizer from '{}': {}", path.display(), e))
    }

    /// Reload the vocabulary words, dropping the special tokens.
    pub fn load_vocabulary(&self) -> Result<Vocabulary> {
        let tokenizer = self.load_tokenizer()?;
        let mut entries: Vec<(String, u32)> = tokenizer
            .get_vocab(true)
            .into_iter()
            .filter(|(token, _)| !is_special(token))
            .collect();
        entries.sort_by_key(|(_, id)| *id);

        Ok(Vocabulary::from_sorted(entries.into_iter().map(|(w, _)| w).collect()))
    }
}

fn unknown_token(class: &str) -> String {
    format!("[UNK:{class}]")
}

fn is_special(token: &str) -> bool {
    token == PAD_TOKEN || (token.starts_with("[UNK:") && token.ends_with(']'))
}

fn special_token(id: usize, content: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "content": content,
        "single_word": false,
        "lstrip": false,
        "rstrip": false,
        "normalized": false,
        "special": true
    })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn vocab() -> Vocabulary {
        Vocabulary::from_sorted(["in", "paris", "the", "tower"].iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_vocabulary_survives_save_and_load() {
        let dir   = tempfile::tempdir().unwrap();
        let store = TokenizerStore::new(dir.path());
        assert!(!store.path().exists());

        store.save(&vocab(), &UnknownClasses::smart()).unwrap();
        assert!(store.path().exists());
        assert_eq!(store.load_vocabulary().unwrap(), vocab());
    }

    #[test]
    fn test_tokenizer_ids_follow_index_layout() {
        let dir   = tempfile::tempdir().unwrap();
        let store = TokenizerStore::new(dir.path());
        store.save(&vocab(), &UnknownClasses::smart()).unwrap();

        let tok = store.load_tokenizer().unwrap();
        assert_eq!(tok.token_to_id("tower"), Some(3));
        assert_eq!(tok.token_to_id("[UNK:number]"), Some(4));
        assert_eq!(tok.token_to_id("[PAD]"), Some(8));

        let enc = tok.encode("the eiffel tower", false).unwrap();
        assert_eq!(enc.get_ids(), &[2, 7, 3]);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(TokenizerStore::new(dir.path()).load_vocabulary().is_err());
    }
}
