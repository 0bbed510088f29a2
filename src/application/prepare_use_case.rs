// ============================================================
// Layer 2 - PrepareUseCase
// ============================================================
// Orchestrates the full data preparation pipeline in order:
//
//   Step 1: Load train / dev / test records      (Layer 4 - data)
//   Step 2: Split into tokenized examples        (Layer 4 - data)
//   Step 3: Build the vocabulary                 (Layer 4 - data)
//   Step 4: Restrict it to GloVe words           (Layer 4 - data)
//   Step 5: Score passage relevance              (Layer 4 - data)
//   Step 6: Vectorize and pad                    (Layer 4 - data)
//   Step 7: Assemble the embedding table         (Layer 5 - ml)
//   Step 8: Check one training batch             (Layer 4 - data)
//   Step 9: Save every artifact                  (Layer 6 - infra)

use anyhow::{bail, Result};
use burn::{data::dataloader::batcher::Batcher, prelude::Backend};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::data::{
    batcher::{BatchSampler, SpanBatcher},
    dataset::SpanDataset,
    embedding::{EmbeddingMatrix, GloveIndex},
    loader::JsonLinesLoader,
    relevance::{RelevanceMode, TfidfScorer},
    splitter::Splitter,
    vectorizer::Vectorizer,
    vocab::{UnknownClasses, Vocabulary},
};
use crate::domain::traits::RecordSource;
use crate::infra::{
    artifact_store::{self as files, ArtifactStore, PrepareSummary},
    tokenizer_store::TokenizerStore,
};
use crate::ml::embedding_table::{check_layout, embedding_table, to_matrix};

type PrepBackend = burn::backend::NdArray;

pub const QUESTION_TYPES: [&str; 5] = ["description", "entity", "location", "numeric", "person"];

// ─── Prepare Configuration ───────────────────────────────────────────────────
// Saved next to the artifacts so `select` can find the dev file
// and question type later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepareConfig {
    /// Holds train/, dev/ and test/ sub-directories
    pub data_dir:      String,
    pub glove_dir:     String,
    pub question_type: String,
    pub emb_size:      usize,
    pub out_dir:       String,
    pub smart_unk:     bool,
    pub batch_size:    usize,
    /// Also write the concatenated-passage training variant
    pub concatenated:  bool,
    /// Keep only dev queries with a verbatim answer in a selected passage
    #[serde(default)]
    pub answerable_only: bool,
    pub seed:          u64,
}

impl Default for PrepareConfig {
    fn default() -> Self {
        Self {
            data_dir:      "datasets/msmarco".to_string(),
            glove_dir:     "datasets/glove".to_string(),
            question_type: "description".to_string(),
            emb_size:      100,
            out_dir:       "prepared".to_string(),
            smart_unk:     true,
            batch_size:    64,
            concatenated:  false,
            answerable_only: false,
            seed:          42,
        }
    }
}

impl PrepareConfig {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            bail!("Batch size must be at least 1");
        }
        if !QUESTION_TYPES.contains(&self.question_type.as_str()) {
            bail!(
                "Unknown question type '{}' (expected one of {})",
                self.question_type,
                QUESTION_TYPES.join(", ")
            );
        }
        Ok(())
    }

    fn split_path(&self, split: &str) -> PathBuf {
        PathBuf::from(&self.data_dir).join(split).join(format!("{}.json", self.question_type))
    }

    pub fn train_path(&self) -> PathBuf {
        self.split_path("train")
    }

    pub fn dev_path(&self) -> PathBuf {
        self.split_path("dev")
    }

    pub fn test_path(&self) -> PathBuf {
        self.split_path("test")
    }

    pub fn glove_path(&self) -> PathBuf {
        PathBuf::from(&self.glove_dir).join(format!("glove.6B.{}d.txt", self.emb_size))
    }
}

// ─── PrepareUseCase ──────────────────────────────────────────────────────────
pub struct PrepareUseCase {
    config: PrepareConfig,
}

impl PrepareUseCase {
    pub fn new(config: PrepareConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<PrepareSummary> {
        let cfg = &self.config;
        cfg.validate()?;

        // ── Step 1: Load records ─────────────────────────────────────────────
        tracing::info!("Loading '{}' question data from '{}'", cfg.question_type, cfg.data_dir);
        let train = JsonLinesLoader::new(cfg.train_path()).load_all()?;
        let dev   = JsonLinesLoader::new(cfg.dev_path()).load_all()?;
        let test  = JsonLinesLoader::new(cfg.test_path()).load_all()?;

        // ── Step 2: Split into examples ──────────────────────────────────────
        // Selected splits feed training; multi splits keep every passage
        // for re-ranking. Dev evaluation can be narrowed to queries the
        // selected passages can actually answer.
        let splitter   = Splitter::new();
        let train_sel  = splitter.split_selected(&train);
        let dev_sel    = splitter.split_selected(&dev);
        let dev_multi  = if cfg.answerable_only {
            splitter.split_multi_answerable(&dev)
        } else {
            splitter.split_multi(&dev)
        };
        let test_multi = splitter.split_multi(&test);
        let concat     = cfg.concatenated.then(|| {
            (splitter.split_concatenated(&train), splitter.split_concatenated(&dev))
        });
        tracing::info!(
            "Examples: {} train, {} dev, {} dev queries, {} test queries",
            train_sel.len(), dev_sel.len(), dev_multi.len(), test_multi.len()
        );

        // ── Step 3: Vocabulary ───────────────────────────────────────────────
        // Train contexts and questions, every dev and test passage, the
        // dev questions of the selected split and the test questions.
        // Dev multi questions are left out; their words reach the index
        // through the selected dev questions.
        tracing::info!("Building vocabulary...");
        let mut sentences: Vec<&Vec<String>> = Vec::new();
        sentences.extend(train_sel.examples.iter().flat_map(|e| [&e.context, &e.question]));
        sentences.extend(dev_sel.examples.iter().map(|e| &e.question));
        for multi in [&dev_multi, &test_multi] {
            sentences.extend(multi.examples.iter().flat_map(|e| e.passages.iter()));
        }
        sentences.extend(test_multi.examples.iter().map(|e| &e.question));
        if let Some((ct, cd)) = &concat {
            for split in [ct, cd] {
                sentences.extend(split.examples.iter().flat_map(|e| [&e.context, &e.question]));
            }
        }
        let vocab = Vocabulary::build(sentences);

        // Padded widths cover every split that is vectorized below.
        let mut max_context  = [train_sel.max_context_len, dev_sel.max_context_len,
                                dev_multi.max_context_len, test_multi.max_context_len]
            .into_iter().max().unwrap_or(0);
        let mut max_question = [train_sel.max_question_len, dev_sel.max_question_len,
                                dev_multi.max_question_len, test_multi.max_question_len]
            .into_iter().max().unwrap_or(0);
        if let Some((ct, cd)) = &concat {
            max_context  = max_context.max(ct.max_context_len).max(cd.max_context_len);
            max_question = max_question.max(ct.max_question_len).max(cd.max_question_len);
        }
        tracing::info!(
            "Vocabulary: {} words; max context {}, max question {}",
            vocab.len(), max_context, max_question
        );

        // ── Step 4: Restrict to GloVe ────────────────────────────────────────
        // Words without a vector drop out of the index and later map to
        // an unknown class.
        let glove         = GloveIndex::from_file(&cfg.glove_path())?;
        let (matrix, kept) = EmbeddingMatrix::restrict(&glove, &vocab);
        let classes       = UnknownClasses::new(cfg.smart_unk);

        // ── Step 5: Passage relevance ────────────────────────────────────────
        // Binary term frequencies, weights normalised to sum to 1 per query.
        tracing::info!("Calculating passage relevance weights...");
        let binary    = TfidfScorer::new(RelevanceMode::Binary);
        let dev_rel   = score(&binary, &dev_multi.examples);
        let test_rel  = score(&binary, &test_multi.examples);

        // ── Step 6: Vectorize ────────────────────────────────────────────────
        tracing::info!("Vectorizing train data...");
        let vectorizer = Vectorizer::new(kept.clone(), classes.clone());
        let (train_samples, unknowns) =
            vectorizer.vectorize_spans(&train_sel.examples, max_context, max_question);
        tracing::info!("Vectorizing validation data...");
        let (dev_samples, _) = vectorizer.vectorize_spans(&dev_sel.examples, max_context, max_question);
        let (dev_multi_samples, _) =
            vectorizer.vectorize_multi(&dev_multi.examples, &dev_rel, max_context, max_question);
        tracing::info!("Vectorizing test data...");
        let (test_multi_samples, _) =
            vectorizer.vectorize_multi(&test_multi.examples, &test_rel, max_context, max_question);

        let layout = vectorizer.layout();

        // ── Step 7: Embedding table ──────────────────────────────────────────
        // Seeded so the random unknown-class rows repeat across runs.
        let device = Default::default();
        PrepBackend::seed(cfg.seed);
        let table = to_matrix(embedding_table::<PrepBackend>(&matrix, classes.len(), cfg.smart_unk, &device))?;
        check_layout(&table, &layout)?;

        // ── Step 8: Sanity-check one random training batch ───────────────────
        let dataset = SpanDataset::new(train_samples);
        let mut sampler = BatchSampler::with_seed(dataset.samples().len(), cfg.batch_size, cfg.seed);
        let indices = sampler.random_batch();
        if !indices.is_empty() {
            let batch = SpanBatcher::<PrepBackend>::new(device).batch(dataset.select(&indices));
            // Shapes only; values are checked by the batcher tests.
            tracing::debug!(
                "Sample batch: context {:?} (lens {:?}), question {:?} (lens {:?}), spans {:?}..{:?}",
                batch.context_ids.dims(),
                batch.context_lens.dims(),
                batch.question_ids.dims(),
                batch.question_lens.dims(),
                batch.answer_begins.dims(),
                batch.answer_ends.dims()
            );
        }

        // ── Step 9: Save ─────────────────────────────────────────────────────
        let store = ArtifactStore::create(&cfg.out_dir)?;
        store.save_config(cfg)?;
        // The tokenizer file is reloaded once so a broken write fails
        // here rather than in a downstream trainer.
        let tokenizer_store = TokenizerStore::new(store.dir());
        tokenizer_store.save(&kept, &classes)?;
        let reloaded = tokenizer_store.load_vocabulary()?;
        if reloaded != kept {
            bail!(
                "Tokenizer at '{}' reloads {} words, expected {}",
                tokenizer_store.path().display(),
                reloaded.len(),
                kept.len()
            );
        }
        store.save_matrix(files::EMBEDDINGS, &matrix)?;
        store.save_matrix(files::TABLE, &table)?;
        store.write_json_lines(files::TRAIN, dataset.samples())?;
        store.write_json_lines(files::DEV, &dev_samples)?;
        store.write_json_lines(files::DEV_MULTI, &dev_multi_samples)?;
        store.write_json_lines(files::TEST_MULTI, &test_multi_samples)?;

        if let Some((ct, cd)) = &concat {
            tracing::info!("Vectorizing concatenated passages...");
            let softmax = TfidfScorer::new(RelevanceMode::Softmax);
            for (split, name) in [(ct, files::TRAIN_CONCAT), (cd, files::DEV_CONCAT)] {
                let rel = softmax.score_all(
                    &split.examples.iter().map(|e| e.question.clone()).collect::<Vec<_>>(),
                    &split.examples.iter()
                        .map(|e| e.passages().into_iter().map(<[String]>::to_vec).collect())
                        .collect::<Vec<_>>(),
                );
                let (samples, _) =
                    vectorizer.vectorize_concatenated(&split.examples, &rel, max_context, max_question);
                store.write_json_lines(name, &samples)?;
            }
        }

        let summary = PrepareSummary {
            max_context_len:  max_context,
            max_question_len: max_question,
            layout,
            embedding_dim:    matrix.dim,
            train_examples:   dataset.samples().len(),
            dev_examples:     dev_samples.len(),
            dev_queries:      dev_multi_samples.len(),
            test_queries:     test_multi_samples.len(),
            train_batches:    sampler.num_batches(),
            unknowns,
        };
        store.save_summary(&summary)?;

        tracing::info!(
            "Prepared {} train batches of {}; artifacts in '{}'",
            summary.train_batches,
            cfg.batch_size,
            store.dir().display()
        );
        Ok(summary)
    }
}

fn score(scorer: &TfidfScorer, examples: &[crate::domain::example::MultiPassageExample]) -> Vec<Vec<f32>> {
    let questions: Vec<Vec<String>> = examples.iter().map(|e| e.question.clone()).collect();
    let passages: Vec<Vec<Vec<String>>> = examples.iter().map(|e| e.passages.clone()).collect();
    scorer.score_all(&questions, &passages)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::{ConcatSample, MultiSample, SpanSample};
    use crate::domain::traits::Persistable;
    use crate::ml::embedding_table::BACKEND_RNG;
    use std::fs;

    const RECORD_1: &str = r#"{"query":"Where is the Eiffel Tower?","query_id":1,"passages":[{"passage_text":"Bananas grow on trees.","is_selected":0,"url":"http://a"},{"passage_text":"The Eiffel Tower is in Paris.","is_selected":1,"url":"http://b"}],"answers":["Paris"]}"#;
    const RECORD_2: &str = r#"{"query":"What colour is the sky?","query_id":2,"passages":[{"passage_text":"The sky is blue in 2020.","is_selected":1,"url":"http://c"}],"answers":["blue"]}"#;
    const GLOVE: &str = "the 0.1 0.2\nis 0.3 0.4\nin 0.5 0.6\nparis 0.7 0.8\ntower 0.9 1.0\nsky 1.1 1.2\nwrote 1.3 1.4\nauthor 1.5 1.6\n";

    fn fixture(dir: &std::path::Path) -> PrepareConfig {
        for split in ["train", "dev", "test"] {
            fs::create_dir_all(dir.join("data").join(split)).unwrap();
            fs::write(
                dir.join("data").join(split).join("location.json"),
                format!("{RECORD_1}\n{RECORD_2}\n"),
            ).unwrap();
        }
        fs::create_dir_all(dir.join("glove")).unwrap();
        fs::write(dir.join("glove").join("glove.6B.2d.txt"), GLOVE).unwrap();

        PrepareConfig {
            data_dir:      dir.join("data").display().to_string(),
            glove_dir:     dir.join("glove").display().to_string(),
            question_type: "location".into(),
            emb_size:      2,
            out_dir:       dir.join("out").display().to_string(),
            batch_size:    1,
            concatenated:  true,
            ..PrepareConfig::default()
        }
    }

    #[test]
    fn test_rejects_bad_config() {
        let zero = PrepareConfig { batch_size: 0, ..PrepareConfig::default() };
        assert!(zero.validate().is_err());
        let kind = PrepareConfig { question_type: "weather".into(), ..PrepareConfig::default() };
        assert!(kind.validate().is_err());
        assert!(PrepareConfig::default().validate().is_ok());
    }

    #[test]
    fn test_derives_dataset_paths() {
        let cfg = PrepareConfig { data_dir: "d".into(), glove_dir: "g".into(), emb_size: 50,
                                  question_type: "numeric".into(), ..PrepareConfig::default() };
        assert_eq!(cfg.dev_path(), PathBuf::from("d/dev/numeric.json"));
        assert_eq!(cfg.glove_path(), PathBuf::from("g/glove.6B.50d.txt"));
    }

    #[test]
    fn test_prepare_writes_consistent_artifacts() {
        let _rng = BACKEND_RNG.lock().unwrap_or_else(|e| e.into_inner());
        let dir = tempfile::tempdir().unwrap();
        let cfg = fixture(dir.path());
        let summary = PrepareUseCase::new(cfg.clone()).execute().unwrap();

        assert_eq!(summary.train_examples, 2);
        assert_eq!(summary.test_queries, 2);
        assert_eq!(summary.train_batches, 2);
        assert_eq!(summary.layout.num_classes, 4);
        assert_eq!(summary.layout.vocab_size, 6);

        let store = ArtifactStore::open(&cfg.out_dir);
        let train: Vec<SpanSample> = store.read_json_lines(files::TRAIN).unwrap();
        assert!(train.iter().all(|s| s.context_ids.len() == summary.max_context_len));

        let multi: Vec<MultiSample> = store.read_json_lines(files::DEV_MULTI).unwrap();
        assert_eq!(multi[0].relevance.len(), 2);
        assert!(multi[0].relevance[1] > multi[0].relevance[0]);

        let concat: Vec<ConcatSample> = store.read_json_lines(files::TRAIN_CONCAT).unwrap();
        assert_eq!(concat.len(), 2);

        let table = EmbeddingMatrix::load(&store.path(files::TABLE)).unwrap();
        assert_eq!(table.rows(), summary.layout.table_rows());

        let vocab = TokenizerStore::new(store.dir()).load_vocabulary().unwrap();
        assert_eq!(vocab.len(), 6);
        assert_eq!(store.load_config().unwrap().question_type, "location");
    }

    #[test]
    fn test_answerable_only_drops_unanswerable_dev_queries() {
        let _rng = BACKEND_RNG.lock().unwrap_or_else(|e| e.into_inner());
        let dir = tempfile::tempdir().unwrap();
        let cfg = fixture(dir.path());
        // "Who wrote it?" has no verbatim answer in its selected passage.
        let extra = r#"{"query":"Who wrote it?","query_id":3,"passages":[{"passage_text":"Nobody knows the author of this long and winding tale.","is_selected":1,"url":"http://d"}],"answers":["Shakespeare"]}"#;
        let dev = PathBuf::from(&cfg.data_dir).join("dev").join("location.json");
        fs::write(&dev, format!("{RECORD_1}\n{RECORD_2}\n{extra}\n")).unwrap();

        let full = PrepareUseCase::new(cfg.clone()).execute().unwrap();
        assert_eq!(full.dev_queries, 3);

        let narrowed = PrepareConfig { answerable_only: true, ..cfg };
        let summary = PrepareUseCase::new(narrowed.clone()).execute().unwrap();
        assert_eq!(summary.dev_queries, 2);
        // The dropped query still sets the padded context width.
        assert_eq!(summary.max_context_len, full.max_context_len);

        let store = ArtifactStore::open(&narrowed.out_dir);
        let multi: Vec<MultiSample> = store.read_json_lines(files::DEV_MULTI).unwrap();
        assert!(multi.iter().all(|m| m.passage_ids[0].len() == summary.max_context_len));
    }

    #[test]
    fn test_vocabulary_skips_dev_multi_questions() {
        let _rng = BACKEND_RNG.lock().unwrap_or_else(|e| e.into_inner());
        let dir = tempfile::tempdir().unwrap();
        let cfg = fixture(dir.path());
        // Unanswerable, so its question only reaches the dev multi split.
        let extra = r#"{"query":"Who wrote it?","query_id":3,"passages":[{"passage_text":"Nobody knows the author.","is_selected":1,"url":"http://d"}],"answers":["Shakespeare"]}"#;
        let dev = PathBuf::from(&cfg.data_dir).join("dev").join("location.json");
        fs::write(&dev, format!("{RECORD_1}\n{RECORD_2}\n{extra}\n")).unwrap();

        let summary = PrepareUseCase::new(cfg.clone()).execute().unwrap();
        let vocab = TokenizerStore::new(&cfg.out_dir).load_vocabulary().unwrap();

        // Dev passages count, dev multi questions do not.
        assert!(vocab.get("author").is_some());
        assert_eq!(vocab.get("wrote"), None);
        assert_eq!(summary.layout.vocab_size, 7);
    }

    #[test]
    fn test_missing_glove_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = PrepareConfig { emb_size: 300, ..fixture(dir.path()) };
        assert!(PrepareUseCase::new(cfg).execute().is_err());
    }
}
