// ============================================================
// Layer 3 - Core Traits
// ============================================================
// The application layer talks to record sources and stored
// artifacts only through these traits, so a file-backed source
// can be swapped for an in-memory one in tests.

use anyhow::Result;
use std::path::Path;

use crate::domain::record::QaRecord;

// ─── RecordSource ─────────────────────────────────────────────────────────────
/// Anything that can produce corpus records.
///
/// Implementations:
///   - JsonLinesLoader → one record per line of a file
///   - Vec<QaRecord>   → records already in memory
pub trait RecordSource {
    fn load_all(&self) -> Result<Vec<QaRecord>>;
}

impl RecordSource for Vec<QaRecord> {
    fn load_all(&self) -> Result<Vec<QaRecord>> {
        Ok(self.clone())
    }
}

// ─── Persistable ──────────────────────────────────────────────────────────────
/// Any artifact whose state can be saved to and restored from disk.
///
/// Implementations:
///   - EmbeddingMatrix → JSON rows
///
/// The vocabulary is persisted through TokenizerStore instead,
/// since its file format is owned by the tokenizers crate.
pub trait Persistable: Sized {
    fn save(&self, path: &Path) -> Result<()>;

    fn load(path: &Path) -> Result<Self>;
}
