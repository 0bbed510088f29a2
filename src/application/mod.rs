// ============================================================
// Layer 2 - Application / Use Cases
// ============================================================
// Orchestrates the other layers to accomplish one goal each.
//
// Rules for this layer:
//   - No tokenizing, scoring or tensor code here
//   - No printing (that's Layer 1)
//   - No file formats (that's Layer 4 and 6)
//   - Only workflow coordination

/// Corpus → vocabulary, embeddings, padded datasets
pub mod prepare_use_case;

/// Stand-alone TF-IDF relevance scoring of one corpus file
pub mod relevance_use_case;

/// Model outputs → re-ranked answers and eval files
pub mod select_use_case;
