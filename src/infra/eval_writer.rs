// ============================================================
// Layer 6 - Eval Output Writer
// ============================================================
// Writes predictions in the layout the MS-MARCO evaluation script
// reads: two JSON-lines files with matching line order.
//
//   <dir>/references/<question_type>.json
//   <dir>/candidates/<question_type>_<model_name>.json
//
// Each line is {"query_id": ..., "answers": ["..."]}.
//
// Demo output writes one file per query with every passage, its
// relevance, the model's start/end distributions and URL, sorted
// by relevance (highest first). The selected passage is flagged.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::{
    collections::HashMap,
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::domain::record::query_id_key;
use crate::ml::selector::{answer_text, PassageScores, Selection};

/// One query's predicted answer span inside its chosen passage.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub query_id: Value,
    pub tokens:   Vec<String>,
    pub begin:    usize,
    pub end:      usize,
}

impl Prediction {
    pub fn answer(&self) -> String {
        answer_text(&self.tokens, self.begin, self.end)
    }
}

#[derive(Debug, Serialize)]
struct EvalLine<'a> {
    query_id: &'a Value,
    answers:  Vec<String>,
}

/// Paths of a written reference/candidate pair.
#[derive(Debug, Clone)]
pub struct EvalFiles {
    pub references: PathBuf,
    pub candidates: PathBuf,
}

pub struct EvalWriter {
    dir: PathBuf,
}

impl EvalWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn files(&self, question_type: &str, model_name: &str) -> Result<EvalFiles> {
        let ref_dir = self.dir.join("references");
        let can_dir = self.dir.join("candidates");
        for d in [&ref_dir, &can_dir] {
            fs::create_dir_all(d).with_context(|| format!("Cannot create '{}'", d.display()))?;
        }
        Ok(EvalFiles {
            references: ref_dir.join(format!("{question_type}.json")),
            candidates: can_dir.join(format!("{question_type}_{model_name}.json")),
        })
    }

    /// References come from `dev_answers` (query id → first answer,
    /// lower-cased); queries missing from it get an empty reference.
    pub fn write_reference_candidates(
        &self,
        question_type: &str,
        model_name:    &str,
        predictions:   &[Prediction],
        dev_answers:   &HashMap<String, String>,
    ) -> Result<EvalFiles> {
        let references = predictions.iter().map(|p| {
            dev_answers.get(&query_id_key(&p.query_id)).cloned().unwrap_or_default()
        });
        self.write_pairs(question_type, model_name, predictions, references)
    }

    /// References are the gold spans, given per prediction as
    /// inclusive `(begin, end)` into the same tokens.
    pub fn write_gold_candidates(
        &self,
        question_type: &str,
        model_name:    &str,
        predictions:   &[Prediction],
        gold_spans:    &[(usize, usize)],
    ) -> Result<EvalFiles> {
        anyhow::ensure!(
            predictions.len() == gold_spans.len(),
            "{} predictions but {} gold spans",
            predictions.len(),
            gold_spans.len()
        );
        let references = predictions
            .iter()
            .zip(gold_spans)
            .map(|(p, &(b, e))| answer_text(&p.tokens, b, e));
        self.write_pairs(question_type, model_name, predictions, references)
    }

    fn write_pairs(
        &self,
        question_type: &str,
        model_name:    &str,
        predictions:   &[Prediction],
        references:    impl Iterator<Item = String>,
    ) -> Result<EvalFiles> {
        let files  = self.files(question_type, model_name)?;
        let mut rf = create(&files.references)?;
        let mut cf = create(&files.candidates)?;

        for (p, reference) in predictions.iter().zip(references) {
            write_line(&mut rf, &EvalLine { query_id: &p.query_id, answers: vec![reference] })?;
            write_line(&mut cf, &EvalLine { query_id: &p.query_id, answers: vec![p.answer()] })?;
        }
        rf.flush()?;
        cf.flush()?;

        tracing::info!(
            "Wrote {} eval pairs to '{}' and '{}'",
            predictions.len(),
            files.references.display(),
            files.candidates.display()
        );
        Ok(files)
    }
}

// ─── Demo answers ─────────────────────────────────────────────────────────────

/// Everything the demo page shows for one query.
#[derive(Debug, Clone)]
pub struct DemoQuery {
    pub query_id:  Value,
    pub passages:  Vec<Vec<String>>,
    pub urls:      Vec<String>,
    pub relevance: Vec<f32>,
    pub scores:    Vec<PassageScores>,
    pub selection: Selection,
}

#[derive(Debug, Serialize)]
struct DemoPassage<'a> {
    tokens:       &'a [String],
    relevance:    f32,
    logits_start: &'a [f32],
    logits_end:   &'a [f32],
    url:          &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    selected:     Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_index:  Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end_index:    Option<usize>,
}

#[derive(Debug, Serialize)]
struct DemoFile<'a> {
    query_id: &'a Value,
    passages: Vec<DemoPassage<'a>>,
}

/// Write `<dir>/<query_id>.json` for every query.
pub fn write_demo_answers(dir: &Path, queries: &[DemoQuery]) -> Result<usize> {
    fs::create_dir_all(dir).with_context(|| format!("Cannot create '{}'", dir.display()))?;

    for q in queries {
        let mut passages: Vec<DemoPassage> = q
            .passages
            .iter()
            .enumerate()
            .map(|(i, tokens)| {
                let selected = i == q.selection.passage;
                let scores   = q.scores.get(i);
                DemoPassage {
                    tokens,
                    relevance:    q.relevance.get(i).copied().unwrap_or(0.0),
                    logits_start: scores.map(|s| s.start.as_slice()).unwrap_or(&[]),
                    logits_end:   scores.map(|s| s.end.as_slice()).unwrap_or(&[]),
                    url:          q.urls.get(i).map(String::as_str).unwrap_or(""),
                    selected:     selected.then_some(true),
                    start_index:  selected.then_some(q.selection.begin),
                    end_index:    selected.then_some(q.selection.end),
                }
            })
            .collect();

        // stable: equal relevance keeps passage order
        passages.sort_by(|a, b| b.relevance.total_cmp(&a.relevance));

        let path = dir.join(format!("{}.json", query_id_key(&q.query_id)));
        let file = DemoFile { query_id: &q.query_id, passages };
        fs::write(&path, serde_json::to_string(&file)?)
            .with_context(|| format!("Cannot write demo answer '{}'", path.display()))?;
    }

    tracing::info!("Wrote {} demo answer files to '{}'", queries.len(), dir.display());
    Ok(queries.len())
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    let f = File::create(path).with_context(|| format!("Cannot create '{}'", path.display()))?;
    Ok(BufWriter::new(f))
}

fn write_line<T: Serialize>(w: &mut impl Write, item: &T) -> Result<()> {
    writeln!(w, "{}", serde_json::to_string(item)?)?;
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn toks(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    fn prediction(id: i64, text: &str, begin: usize, end: usize) -> Prediction {
        Prediction { query_id: Value::from(id), tokens: toks(text), begin, end }
    }

    #[test]
    fn test_writes_reference_and_candidate_lines() {
        let dir    = tempfile::tempdir().unwrap();
        let writer = EvalWriter::new(dir.path());
        let preds  = vec![prediction(1, "it is in paris", 3, 3), prediction(2, "no idea", 1, 0)];
        let answers: HashMap<String, String> = [("1".to_string(), "paris, france".to_string())].into();

        let files = writer.write_reference_candidates("location", "baseline", &preds, &answers).unwrap();
        assert!(files.candidates.ends_with("candidates/location_baseline.json"));

        let refs = fs::read_to_string(&files.references).unwrap();
        let cans = fs::read_to_string(&files.candidates).unwrap();
        assert_eq!(
            refs.lines().collect::<Vec<_>>(),
            vec![r#"{"query_id":1,"answers":["paris, france"]}"#, r#"{"query_id":2,"answers":[""]}"#]
        );
        assert_eq!(
            cans.lines().collect::<Vec<_>>(),
            vec![r#"{"query_id":1,"answers":["paris"]}"#, r#"{"query_id":2,"answers":[""]}"#]
        );
    }

    #[test]
    fn test_gold_references_come_from_spans() {
        let dir    = tempfile::tempdir().unwrap();
        let writer = EvalWriter::new(dir.path());
        let preds  = vec![prediction(5, "a b c d", 0, 1)];

        let files = writer.write_gold_candidates("numeric", "m", &preds, &[(2, 3)]).unwrap();
        let refs  = fs::read_to_string(&files.references).unwrap();
        assert_eq!(refs.trim(), r#"{"query_id":5,"answers":["c d"]}"#);

        assert!(writer.write_gold_candidates("numeric", "m", &preds, &[]).is_err());
    }

    #[test]
    fn test_demo_files_sort_by_relevance_and_flag_selection() {
        let dir = tempfile::tempdir().unwrap();
        let q   = DemoQuery {
            query_id:  Value::from("q7"),
            passages:  vec![toks("low one"), toks("high one")],
            urls:      vec!["http://low".into(), "http://high".into()],
            relevance: vec![0.2, 0.8],
            scores:    vec![
                PassageScores { start: vec![0.5, 0.5], end: vec![0.5, 0.5] },
                PassageScores { start: vec![0.9, 0.1], end: vec![0.1, 0.9] },
            ],
            selection: Selection { passage: 1, begin: 0, end: 1, score: 0.6 },
        };
        assert_eq!(write_demo_answers(dir.path(), &[q]).unwrap(), 1);

        let json: Value = serde_json::from_str(
            &fs::read_to_string(dir.path().join("q7.json")).unwrap(),
        ).unwrap();
        let passages = json["passages"].as_array().unwrap();
        assert_eq!(passages[0]["url"], "http://high");
        assert_eq!(passages[0]["selected"], true);
        assert_eq!(passages[0]["end_index"], 1);
        assert!(passages[1].get("selected").is_none());
    }
}
