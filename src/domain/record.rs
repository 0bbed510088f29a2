// ============================================================
// Layer 3 - Corpus Records
// ============================================================
// One MS-MARCO line looks like:
//
//   {"query": "where is the eiffel tower",
//    "query_id": 1102432,
//    "query_type": "location",
//    "passages": [{"passage_text": "...", "is_selected": 1, "url": "..."}],
//    "answers": ["Paris, France"]}
//
// `query_id` is a number in the public releases but some
// derived files store it as a string, so it is kept as a raw
// JSON value and rendered back verbatim in the eval output.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single passage attached to a query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Passage {
    pub passage_text: String,

    /// 1 when an annotator used this passage to write the answer
    #[serde(default)]
    pub is_selected: i64,

    #[serde(default)]
    pub url: String,
}

impl Passage {
    pub fn selected(&self) -> bool {
        self.is_selected != 0
    }
}

/// One query with its candidate passages and reference answers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QaRecord {
    pub query:    String,
    pub query_id: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_type: Option<String>,

    #[serde(default)]
    pub passages: Vec<Passage>,

    #[serde(default)]
    pub answers: Vec<String>,
}

impl QaRecord {
    /// The query id as the map key used when joining dev answers
    /// against predictions. Strings are used unquoted.
    pub fn id_key(&self) -> String {
        query_id_key(&self.query_id)
    }
}

/// Render a raw query id as a lookup key.
pub fn query_id_key(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other            => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_numeric_and_string_ids() {
        let a: QaRecord = serde_json::from_str(
            r#"{"query":"q","query_id":17,"passages":[],"answers":[]}"#,
        ).unwrap();
        let b: QaRecord = serde_json::from_str(
            r#"{"query":"q","query_id":"17","passages":[],"answers":[]}"#,
        ).unwrap();
        assert_eq!(a.id_key(), "17");
        assert_eq!(b.id_key(), "17");
    }

    #[test]
    fn test_passage_defaults_when_fields_missing() {
        let p: Passage = serde_json::from_str(r#"{"passage_text":"hello"}"#).unwrap();
        assert!(!p.selected());
        assert_eq!(p.url, "");
    }
}
