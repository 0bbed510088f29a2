// ============================================================
// Layer 4 - Corpus Loader
// ============================================================
// Reads MS-MARCO JSON-lines files: one QaRecord per line.
//
// Blank lines are skipped. A line that fails to parse aborts the
// load with the file name and line number in the error, since a
// silently truncated split would skew every statistic after it.
//
// Also provides the answer lookup used when writing eval
// reference files: query id → first answer, lower-cased.

use anyhow::{Context, Result};
use std::{
    collections::HashMap,
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use crate::domain::record::QaRecord;
use crate::domain::traits::RecordSource;

/// Loads records from a JSON-lines file.
pub struct JsonLinesLoader {
    path: PathBuf,
}

impl JsonLinesLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RecordSource for JsonLinesLoader {
    fn load_all(&self) -> Result<Vec<QaRecord>> {
        let records: Vec<QaRecord> = read_json_lines(&self.path)?;
        tracing::info!(
            "Loaded {} records from '{}'",
            records.len(),
            self.path.display()
        );
        Ok(records)
    }
}

/// Parse every non-blank line of `path` as a `T`.
pub fn read_json_lines<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path)
        .with_context(|| format!("Cannot open '{}'", path.display()))?;

    let mut items = Vec::new();
    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line
            .with_context(|| format!("Cannot read '{}' line {}", path.display(), line_no + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        let item = serde_json::from_str(&line)
            .with_context(|| format!("Malformed JSON in '{}' line {}", path.display(), line_no + 1))?;
        items.push(item);
    }
    Ok(items)
}

/// Map each query id in a corpus file to its first answer, lower-cased.
/// Queries without answers map to the empty string.
pub fn load_first_answers(path: &Path) -> Result<HashMap<String, String>> {
    let records = JsonLinesLoader::new(path).load_all()?;
    Ok(records
        .iter()
        .map(|r| {
            let answer = r.answers.first().map(|a| a.to_lowercase()).unwrap_or_default();
            (r.id_key(), answer)
        })
        .collect())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn test_loads_records_and_skips_blank_lines() {
        let f = write_file(concat!(
            r#"{"query":"a","query_id":1,"passages":[{"passage_text":"x","is_selected":1,"url":"u"}],"answers":["x"]}"#,
            "\n\n",
            r#"{"query":"b","query_id":2,"passages":[],"answers":[]}"#,
            "\n",
        ));
        let records = JsonLinesLoader::new(f.path()).load_all().unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].passages[0].selected());
    }

    #[test]
    fn test_malformed_line_reports_line_number() {
        let f   = write_file("{\"query\":\"a\",\"query_id\":1}\nnot json\n");
        let err = JsonLinesLoader::new(f.path()).load_all().unwrap_err();
        assert!(format!("{err:#}").contains("line 2"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(JsonLinesLoader::new("/definitely/not/here.json").load_all().is_err());
    }

    #[test]
    fn test_first_answers_are_lowercased() {
        let f = write_file(concat!(
            r#"{"query":"a","query_id":1,"answers":["Paris","London"]}"#, "\n",
            r#"{"query":"b","query_id":"2","answers":[]}"#, "\n",
        ));
        let answers = load_first_answers(f.path()).unwrap();
        assert_eq!(answers["1"], "paris");
        assert_eq!(answers["2"], "");
    }
}
