// ============================================================
// Layer 4 - Corpus Splitter
// ============================================================
// Turns raw QaRecords into tokenized examples. Four views of the
// same corpus are needed:
//
//   split_selected          → one SpanExample per query, taken from
//                             the first selected passage that contains
//                             an answer verbatim (training / validation)
//   split_multi             → every passage of every query
//                             (evaluation over the full candidate set)
//   split_multi_answerable  → like split_multi, restricted to queries
//                             with a verbatim answer in a selected passage
//                             (dev evaluation with --answerable-only)
//   split_concatenated      → all passages of a query glued together
//                             with the answer located in the whole
//
// Every split also reports the longest context and question seen,
// which later fixes the padded sequence lengths.

use crate::data::{
    aligner::find_answer,
    preprocessor::Preprocessor,
    tokenizer::WordTokenizer,
};
use crate::domain::{
    example::{ConcatenatedExample, MultiPassageExample, SpanExample},
    record::QaRecord,
};

/// Examples from one split plus the maximum unpadded lengths.
#[derive(Debug, Clone)]
pub struct SplitOutput<T> {
    pub examples:         Vec<T>,
    pub max_context_len:  usize,
    pub max_question_len: usize,
}

impl<T> SplitOutput<T> {
    fn new() -> Self {
        Self { examples: Vec::new(), max_context_len: 0, max_question_len: 0 }
    }

    fn observe_context(&mut self, len: usize) {
        self.max_context_len = self.max_context_len.max(len);
    }

    fn observe_question(&mut self, len: usize) {
        self.max_question_len = self.max_question_len.max(len);
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }
}

pub struct Splitter {
    tokenizer:    WordTokenizer,
    /// Used for the selected-passage split, which rewrites TeX quotes
    quoted:       Preprocessor,
    plain:        Preprocessor,
}

impl Splitter {
    pub fn new() -> Self {
        Self {
            tokenizer: WordTokenizer::new(),
            quoted:    Preprocessor::with_quote_normalization(),
            plain:     Preprocessor::new(),
        }
    }

    fn tokens(&self, prep: &Preprocessor, text: &str) -> Vec<String> {
        self.tokenizer.tokenize(&prep.clean(text))
    }

    /// First answer of `record` that aligns inside `context`.
    fn align(&self, record: &QaRecord, context: &[String]) -> Option<(usize, usize, String)> {
        record.answers.iter().find_map(|answer| {
            let answer_tokens = self.tokens(&self.plain, answer);
            find_answer(context, &answer_tokens).map(|(b, e)| (b, e, answer.clone()))
        })
    }

    /// One example per query from its selected passages.
    ///
    /// Unselected passages are skipped. Length maxima grow for every
    /// selected passage visited, even when no answer is found in it.
    pub fn split_selected(&self, records: &[QaRecord]) -> SplitOutput<SpanExample> {
        let mut out = SplitOutput::new();

        for record in records {
            let question = self.tokens(&self.quoted, &record.query);

            for passage in record.passages.iter().filter(|p| p.selected()) {
                let context = self.tokens(&self.quoted, &passage.passage_text);
                out.observe_context(context.len());
                out.observe_question(question.len());

                if let Some((answer_begin, answer_end, answer_text)) = self.align(record, &context) {
                    out.examples.push(SpanExample {
                        context,
                        question: question.clone(),
                        query_id: record.query_id.clone(),
                        answer_begin,
                        answer_end,
                        answer_text,
                    });
                    break;
                }
            }
        }

        tracing::debug!(
            "Selected split: {} examples from {} records (max context {}, max question {})",
            out.len(), records.len(), out.max_context_len, out.max_question_len
        );
        out
    }

    /// Every passage of every query.
    pub fn split_multi(&self, records: &[QaRecord]) -> SplitOutput<MultiPassageExample> {
        let mut out = SplitOutput::new();
        for record in records {
            let example = self.multi_example(record);
            for p in &example.passages {
                out.observe_context(p.len());
            }
            out.observe_question(example.question.len());
            out.examples.push(example);
        }
        out
    }

    /// Every passage of queries whose selected passages contain an
    /// answer verbatim; other queries are dropped.
    ///
    /// Length maxima still cover the dropped queries, so the padded
    /// width matches the full multi-passage split.
    pub fn split_multi_answerable(&self, records: &[QaRecord]) -> SplitOutput<MultiPassageExample> {
        let mut out = SplitOutput::new();
        for record in records {
            let example = self.multi_example(record);
            for p in &example.passages {
                out.observe_context(p.len());
            }
            out.observe_question(example.question.len());

            // One verbatim hit in any selected passage is enough.
            let answerable = record
                .passages
                .iter()
                .zip(&example.passages)
                .filter(|(p, _)| p.selected())
                .any(|(_, tokens)| self.align(record, tokens).is_some());
            if answerable {
                out.examples.push(example);
            }
        }

        tracing::debug!(
            "Answerable split: kept {} of {} queries",
            out.len(), records.len()
        );
        out
    }

    fn multi_example(&self, record: &QaRecord) -> MultiPassageExample {
        MultiPassageExample {
            passages: record
                .passages
                .iter()
                .map(|p| self.tokens(&self.plain, &p.passage_text))
                .collect(),
            question: self.tokens(&self.plain, &record.query),
            query_id: record.query_id.clone(),
            urls:     record.passages.iter().map(|p| p.url.clone()).collect(),
        }
    }

    /// All passages of a query concatenated into one context, keeping
    /// queries whose answer occurs somewhere in the concatenation.
    pub fn split_concatenated(&self, records: &[QaRecord]) -> SplitOutput<ConcatenatedExample> {
        let mut out = SplitOutput::new();

        for record in records {
            let mut context         = Vec::new();
            let mut passage_lengths = Vec::with_capacity(record.passages.len());
            for passage in &record.passages {
                let tokens = self.tokens(&self.plain, &passage.passage_text);
                passage_lengths.push(tokens.len());
                context.extend(tokens);
            }
            out.observe_context(context.len());

            let question = self.tokens(&self.plain, &record.query);
            out.observe_question(question.len());

            if let Some((answer_begin, answer_end, answer_text)) = self.align(record, &context) {
                out.examples.push(ConcatenatedExample {
                    context,
                    passage_lengths,
                    question,
                    query_id: record.query_id.clone(),
                    answer_begin,
                    answer_end,
                    answer_text,
                });
            }
        }
        out
    }
}

impl Default for Splitter {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::Passage;
    use serde_json::Value;

    fn passage(text: &str, selected: bool, url: &str) -> Passage {
        Passage { passage_text: text.into(), is_selected: i64::from(selected), url: url.into() }
    }

    fn record(id: i64, query: &str, passages: Vec<Passage>, answers: &[&str]) -> QaRecord {
        QaRecord {
            query:      query.into(),
            query_id:   Value::from(id),
            query_type: None,
            passages,
            answers:    answers.iter().map(|a| a.to_string()).collect(),
        }
    }

    fn corpus() -> Vec<QaRecord> {
        vec![
            record(
                1,
                "Where is the Eiffel Tower?",
                vec![
                    passage("The tower is tall.", false, "http://a"),
                    passage("The Eiffel Tower is in Paris.", true, "http://b"),
                ],
                &["", "Paris"],
            ),
            record(
                2,
                "Who wrote it?",
                vec![passage("Nobody knows the author.", true, "http://c")],
                &["Shakespeare"],
            ),
            record(
                3,
                "What colour is the sky?",
                vec![passage("The sky is blue.", false, "http://d")],
                &["blue"],
            ),
        ]
    }

    #[test]
    fn test_selected_split_aligns_answers_and_skips_empty_ones() {
        let out = Splitter::new().split_selected(&corpus());
        assert_eq!(out.len(), 1);

        let ex = &out.examples[0];
        assert_eq!(ex.query_id, Value::from(1));
        assert_eq!(ex.answer_text, "Paris");
        assert_eq!(ex.context[ex.answer_begin], "paris");
        assert_eq!(ex.answer_begin, ex.answer_end);
        assert_eq!(ex.question.last().map(String::as_str), Some("?"));
    }

    #[test]
    fn test_selected_split_tracks_lengths_of_unanswered_selected_passages() {
        let out = Splitter::new().split_selected(&corpus());
        // "nobody knows the author ." has 5 tokens; record 3 has no
        // selected passage so its question never counts.
        assert!(out.max_context_len >= 7);
        assert_eq!(out.max_question_len, 6);
    }

    #[test]
    fn test_multi_split_keeps_every_passage_and_url() {
        let out = Splitter::new().split_multi(&corpus());
        assert_eq!(out.len(), 3);
        assert_eq!(out.examples[0].passages.len(), 2);
        assert_eq!(out.examples[0].urls, vec!["http://a", "http://b"]);
        assert_eq!(out.max_question_len, 6);
    }

    #[test]
    fn test_answerable_split_requires_selected_passage_hit() {
        let out = Splitter::new().split_multi_answerable(&corpus());
        let ids: Vec<_> = out.examples.iter().map(|e| e.query_id.clone()).collect();
        assert_eq!(ids, vec![Value::from(1)]);
    }

    #[test]
    fn test_answerable_split_lengths_cover_dropped_queries() {
        let mut records = corpus();
        // A long unanswerable query whose passage is longer than any kept one.
        records.push(record(
            4,
            "Why do the long winding rivers of the north run so very cold?",
            vec![passage("Rivers in the far north are fed by melting snow and ice all year.", true, "http://e")],
            &["glaciers"],
        ));

        let splitter = Splitter::new();
        let answerable = splitter.split_multi_answerable(&records);
        let full       = splitter.split_multi(&records);

        assert_eq!(answerable.len(), 1);
        assert_eq!(answerable.max_context_len, full.max_context_len);
        assert_eq!(answerable.max_question_len, full.max_question_len);
        assert!(answerable.max_question_len > 6);
    }

    #[test]
    fn test_selected_split_takes_first_of_two_answering_passages() {
        let records = vec![record(
            5,
            "Where is the Eiffel Tower?",
            vec![
                passage("It stands in Paris.", true, "http://f"),
                passage("Paris is home to the Eiffel Tower.", true, "http://g"),
            ],
            &["Paris"],
        )];

        let out = Splitter::new().split_selected(&records);
        // One example per query, never one per answering passage.
        assert_eq!(out.len(), 1);

        let ex = &out.examples[0];
        assert_eq!(ex.context[0], "it");
        assert_eq!((ex.answer_begin, ex.answer_end), (3, 3));
        assert_eq!(ex.context[ex.answer_begin], "paris");
    }

    #[test]
    fn test_concatenated_split_finds_answer_across_passages() {
        let out = Splitter::new().split_concatenated(&corpus());
        let ids: Vec<_> = out.examples.iter().map(|e| e.query_id.clone()).collect();
        assert_eq!(ids, vec![Value::from(1), Value::from(3)]);

        let ex = &out.examples[0];
        assert_eq!(ex.passage_lengths, vec![5, 7]);
        assert_eq!(ex.context.len(), 12);
        assert_eq!(ex.context[ex.answer_begin], "paris");
        assert_eq!(ex.answer_begin, 10);
    }
}
