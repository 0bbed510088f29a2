// ============================================================
// Layer 5 - Model-Facing Layer (Burn)
// ============================================================
// The span models that consume this pipeline's output are trained
// elsewhere. This layer holds the two places where the pipeline
// meets them:
//
//   embedding_table.rs — builds the [words; unknowns; padding]
//                        lookup table tensor the models embed with
//
//   selector.rs        — turns per-passage start/end distributions
//                        plus relevance weights into one answer span

/// Embedding lookup table assembly
pub mod embedding_table;

/// Relevance-weighted passage and span selection
pub mod selector;
