// ============================================================
// Layer 3 - Domain Layer
// ============================================================
// Plain Rust structs and traits describing the MS-MARCO corpus
// and the examples the pipeline derives from it.
//
// Rules for this layer:
//   - NO burn types
//   - NO file I/O
//   - Only data shapes and the traits other layers implement
//
// The flow of types through the pipeline:
//
//   QaRecord            one JSON line of the corpus
//       │
//       ├──► SpanExample          (selected passage + aligned answer)
//       ├──► MultiPassageExample  (every passage of one query)
//       └──► ConcatenatedExample  (all passages glued together)

/// Raw corpus records as they appear on disk
pub mod record;

/// Tokenized examples derived from records
pub mod example;

/// Core abstractions (traits) that other layers implement
pub mod traits;
