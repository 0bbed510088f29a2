// ============================================================
// Layer 4 - Data Pipeline
// ============================================================
// Everything from raw MS-MARCO JSON lines to padded index
// sequences and tensor batches.
//
// The pipeline flows in this order:
//
//   JSON-lines files
//       │
//       ▼
//   JsonLinesLoader   → QaRecords
//       │
//       ▼
//   Preprocessor      → lower-cased, quote-normalised text
//       │
//       ▼
//   WordTokenizer     → Treebank-style tokens
//       │
//       ▼
//   Splitter          → span / multi-passage / concatenated examples
//       │               (answers aligned by find_answer)
//       ▼
//   Vocabulary        → sorted word list, smart unknown classes
//       │
//       ▼
//   GloveIndex        → embedding matrix, vocabulary restricted to GloVe
//       │
//       ▼
//   TfidfScorer       → passage relevance per query
//       │
//       ▼
//   Vectorizer        → padded index sequences
//       │
//       ▼
//   SpanDataset / SpanBatcher / BatchSampler → batches
//
// Each module is responsible for exactly one step.

/// Reads JSON-lines corpus files
pub mod loader;

/// Cleans and normalises raw text
pub mod preprocessor;

/// Treebank-style word tokenizer
pub mod tokenizer;

/// Exact token-sequence answer alignment
pub mod aligner;

/// Records → tokenized examples
pub mod splitter;

/// Vocabulary, unknown classes and index layout
pub mod vocab;

/// GloVe loading and embedding restriction
pub mod embedding;

/// TF-IDF passage relevance
pub mod relevance;

/// Tokens → padded index sequences
pub mod vectorizer;

/// Padded samples and Burn's Dataset trait
pub mod dataset;

/// Burn's Batcher trait and batch index sampling
pub mod batcher;
