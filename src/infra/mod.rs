// ============================================================
// Layer 6 - Infrastructure Layer
// ============================================================
// File-facing concerns shared by the use cases:
//
//   artifact_store.rs  — the prepare output directory: config,
//                        summary, embedding matrices and the
//                        JSON-lines datasets
//
//   tokenizer_store.rs — vocabulary persistence as a HuggingFace
//                        word-level tokenizer JSON whose ids match
//                        the pipeline's index layout
//
//   eval_writer.rs     — MS-MARCO reference/candidate files and
//                        per-query demo answer files
//
// Keeping file formats here keeps the data and ml layers pure.

/// Prepare output directory
pub mod artifact_store;

/// Vocabulary saving and loading
pub mod tokenizer_store;

/// Evaluation and demo output
pub mod eval_writer;
