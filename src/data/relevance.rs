// ============================================================
// Layer 4 - Passage Relevance (TF-IDF)
// ============================================================
// Scores how relevant each candidate passage is to its question.
//
// For every query a fresh TF-IDF model is fitted over the
// documents [question, passage_1, ..., passage_n]:
//
//   idf(t)   = ln((1 + n_docs) / (1 + df(t))) + 1
//   tfidf    = tf(t, d) * idf(t), then L2-normalised per document
//   cosine   = question_vector · passage_vector
//
// Two flavours are used across the pipeline:
//
//   Binary   stop words removed, tf is 0/1, scores normalised by
//            their sum (uniform when the sum is 0)
//   Softmax  raw counts, no stop words, softmax over the scores
//
// Terms are runs of two or more word characters in lower case.

use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RelevanceMode {
    /// Binary tf, English stop words, sum-normalised
    #[default]
    Binary,
    /// Raw counts, softmax over similarities
    Softmax,
}

impl std::str::FromStr for RelevanceMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "binary"  => Ok(Self::Binary),
            "softmax" => Ok(Self::Softmax),
            other     => anyhow::bail!("Unknown relevance mode '{other}' (expected binary or softmax)"),
        }
    }
}

pub struct TfidfScorer {
    mode:       RelevanceMode,
    term:       Regex,
    stop_words: HashSet<&'static str>,
}

impl TfidfScorer {
    pub fn new(mode: RelevanceMode) -> Self {
        let stop_words = match mode {
            RelevanceMode::Binary  => ENGLISH_STOP_WORDS.iter().copied().collect(),
            RelevanceMode::Softmax => HashSet::new(),
        };
        Self {
            mode,
            term: Regex::new(r"\b\w\w+\b").unwrap_or_else(|e| panic!("bad term pattern: {e}")),
            stop_words,
        }
    }

    fn terms(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        self.term
            .find_iter(&lowered)
            .map(|m| m.as_str())
            .filter(|t| !self.stop_words.contains(*t))
            .map(str::to_string)
            .collect()
    }

    /// Cosine similarity of `question` against each passage.
    pub fn similarities(&self, question: &str, passages: &[String]) -> Vec<f64> {
        let docs: Vec<Vec<String>> = std::iter::once(question)
            .chain(passages.iter().map(String::as_str))
            .map(|d| self.terms(d))
            .collect();

        // term → column, sorted for a stable layout
        let mut df: BTreeMap<&str, usize> = BTreeMap::new();
        for doc in &docs {
            let unique: HashSet<&str> = doc.iter().map(String::as_str).collect();
            for t in unique {
                *df.entry(t).or_insert(0) += 1;
            }
        }

        // Smooth idf: a term in every document still weighs 1.0
        let n_docs = docs.len() as f64;
        let idf: BTreeMap<&str, f64> = df
            .iter()
            .map(|(&t, &d)| (t, ((1.0 + n_docs) / (1.0 + d as f64)).ln() + 1.0))
            .collect();

        let vectors: Vec<BTreeMap<&str, f64>> = docs
            .iter()
            .map(|doc| self.weigh(doc, &idf))
            .collect();

        // Vectors are unit length, so the dot product is the cosine
        let (query, rest) = vectors.split_first().map_or((None, &[][..]), |(q, r)| (Some(q), r));
        rest.iter()
            .map(|p| query.map_or(0.0, |q| dot(q, p)))
            .collect()
    }

    fn weigh<'a>(&self, doc: &[String], idf: &BTreeMap<&'a str, f64>) -> BTreeMap<&'a str, f64> {
        let mut tf: BTreeMap<&'a str, f64> = BTreeMap::new();
        for t in doc {
            if let Some((&key, _)) = idf.get_key_value(t.as_str()) {
                let e = tf.entry(key).or_insert(0.0);
                *e = match self.mode {
                    RelevanceMode::Binary  => 1.0,
                    RelevanceMode::Softmax => *e + 1.0,
                };
            }
        }
        for (t, w) in tf.iter_mut() {
            *w *= idf[t];
        }
        // L2-normalise the tf-idf vector
        let norm = tf.values().map(|w| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for w in tf.values_mut() {
                *w /= norm;
            }
        }
        tf
    }

    /// Normalised relevance weights for one query's passages.
    pub fn relevance(&self, question: &[String], passages: &[Vec<String>]) -> Vec<f32> {
        if passages.is_empty() {
            return Vec::new();
        }
        let joined: Vec<String> = passages.iter().map(|p| p.join(" ")).collect();
        let sims = self.similarities(&question.join(" "), &joined);

        let weights = match self.mode {
            RelevanceMode::Binary => {
                // Proportional share; no overlap at all gives a uniform split
                let sum: f64 = sims.iter().sum();
                if sum > 0.0 {
                    sims.iter().map(|s| s / sum).collect()
                } else {
                    vec![1.0 / sims.len() as f64; sims.len()]
                }
            }
            RelevanceMode::Softmax => softmax(&sims),
        };
        weights.into_iter().map(|w| w as f32).collect()
    }

    /// Relevance for every query, with a progress bar.
    pub fn score_all(&self, questions: &[Vec<String>], passages: &[Vec<Vec<String>>]) -> Vec<Vec<f32>> {
        let pb = ProgressBar::new(questions.len() as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb.set_message("Passage relevance");

        let scores = questions
            .iter()
            .zip(passages)
            .map(|(q, ps)| {
                pb.inc(1);
                self.relevance(q, ps)
            })
            .collect();

        pb.finish_and_clear();
        scores
    }
}

fn dot(a: &BTreeMap<&str, f64>, b: &BTreeMap<&str, f64>) -> f64 {
    a.iter().filter_map(|(t, w)| b.get(t).map(|v| w * v)).sum()
}

fn softmax(xs: &[f64]) -> Vec<f64> {
    let max = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = xs.iter().map(|x| (x - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Spread each passage's relevance over its tokens and right-pad
/// with 0.0 up to `max_len`, matching a concatenated context.
pub fn passage_weights(relevance: &[f32], lengths: &[usize], max_len: usize) -> Vec<f32> {
    let mut weights: Vec<f32> = relevance
        .iter()
        .zip(lengths)
        .flat_map(|(&r, &len)| std::iter::repeat(r).take(len))
        .collect();
    if weights.len() < max_len {
        weights.resize(max_len, 0.0);
    }
    weights
}

const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "about", "above", "across", "after", "afterwards", "again", "against", "all",
    "almost", "alone", "along", "already", "also", "although", "always", "am", "among",
    "amongst", "amoungst", "amount", "an", "and", "another", "any", "anyhow", "anyone",
    "anything", "anyway", "anywhere", "are", "around", "as", "at", "back", "be", "became",
    "because", "become", "becomes", "becoming", "been", "before", "beforehand", "behind",
    "being", "below", "beside", "besides", "between", "beyond", "bill", "both", "bottom",
    "but", "by", "call", "can", "cannot", "cant", "co", "con", "could", "couldnt", "cry",
    "de", "describe", "detail", "do", "done", "down", "due", "during", "each", "eg", "eight",
    "either", "eleven", "else", "elsewhere", "empty", "enough", "etc", "even", "ever",
    "every", "everyone", "everything", "everywhere", "except", "few", "fifteen", "fifty",
    "fify", "fill", "find", "fire", "first", "five", "for", "former", "formerly", "forty",
    "found", "four", "from", "front", "full", "further", "get", "give", "go", "had", "has",
    "hasnt", "have", "he", "hence", "her", "here", "hereafter", "hereby", "herein",
    "hereupon", "hers", "herself", "him", "himself", "his", "how", "however", "hundred",
    "i", "ie", "if", "in", "inc", "indeed", "interest", "into", "is", "it", "its", "itself",
    "keep", "last", "latter", "latterly", "least", "less", "ltd", "made", "many", "may",
    "me", "meanwhile", "might", "mill", "mine", "more", "moreover", "most", "mostly",
    "move", "much", "must", "my", "myself", "name", "namely", "neither", "never",
    "nevertheless", "next", "nine", "no", "nobody", "none", "noone", "nor", "not",
    "nothing", "now", "nowhere", "of", "off", "often", "on", "once", "one", "only", "onto",
    "or", "other", "others", "otherwise", "our", "ours", "ourselves", "out", "over", "own",
    "part", "per", "perhaps", "please", "put", "rather", "re", "same", "see", "seem",
    "seemed", "seeming", "seems", "serious", "several", "she", "should", "show", "side",
    "since", "sincere", "six", "sixty", "so", "some", "somehow", "someone", "something",
    "sometime", "sometimes", "somewhere", "still", "such", "system", "take", "ten", "than",
    "that", "the", "their", "them", "themselves", "then", "thence", "there", "thereafter",
    "thereby", "therefore", "therein", "thereupon", "these", "they", "thick", "thin",
    "third", "this", "those", "though", "three", "through", "throughout", "thru", "thus",
    "to", "together", "too", "top", "toward", "towards", "twelve", "twenty", "two", "un",
    "under", "until", "up", "upon", "us", "very", "via", "was", "we", "well", "were", "what",
    "whatever", "when", "whence", "whenever", "where", "whereafter", "whereas", "whereby",
    "wherein", "whereupon", "wherever", "whether", "which", "while", "whither", "who",
    "whoever", "whole", "whom", "whose", "why", "will", "with", "within", "without",
    "would", "yet", "you", "your", "yours", "yourself", "yourselves",
];

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn toks(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn test_relevant_passage_scores_highest_and_weights_sum_to_one() {
        let scorer = TfidfScorer::new(RelevanceMode::Binary);
        let w = scorer.relevance(
            &toks("where is the eiffel tower"),
            &[toks("bananas grow on trees"), toks("the eiffel tower is in paris")],
        );
        assert_eq!(w.len(), 2);
        assert!(w[1] > w[0]);
        assert!((w.iter().sum::<f32>() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_no_overlap_gives_uniform_weights() {
        let scorer = TfidfScorer::new(RelevanceMode::Binary);
        let w = scorer.relevance(&toks("the of"), &[toks("apples"), toks("pears"), toks("")]);
        for x in &w {
            assert!((x - 1.0 / 3.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_no_passages_gives_empty_weights() {
        let scorer = TfidfScorer::new(RelevanceMode::Binary);
        assert!(scorer.relevance(&toks("anything"), &[]).is_empty());
    }

    #[test]
    fn test_identical_document_has_cosine_one() {
        let scorer = TfidfScorer::new(RelevanceMode::Softmax);
        let sims = scorer.similarities("red apple pie", &["red apple pie".into(), "blue".into()]);
        assert!((sims[0] - 1.0).abs() < 1e-9);
        assert_eq!(sims[1], 0.0);
    }

    #[test]
    fn test_single_character_terms_are_ignored() {
        let scorer = TfidfScorer::new(RelevanceMode::Softmax);
        let sims = scorer.similarities("a b c", &["a b c".into()]);
        assert_eq!(sims, vec![0.0]);
    }

    #[test]
    fn test_softmax_mode_keeps_every_passage_positive() {
        let scorer = TfidfScorer::new(RelevanceMode::Softmax);
        let w = scorer.relevance(&toks("red apple"), &[toks("red apple"), toks("green pear")]);
        assert!(w[0] > w[1]);
        assert!(w[1] > 0.0);
        assert!((w.iter().sum::<f32>() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_score_all_returns_one_vector_per_query() {
        let scorer = TfidfScorer::new(RelevanceMode::Binary);
        let out = scorer.score_all(
            &[toks("red apple"), toks("tower")],
            &[vec![toks("red apple")], vec![toks("a"), toks("tower")]],
        );
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].len(), 2);
    }

    #[test]
    fn test_passage_weights_expand_and_pad() {
        assert_eq!(
            passage_weights(&[0.25, 0.75], &[2, 1], 5),
            vec![0.25, 0.25, 0.75, 0.0, 0.0]
        );
        assert_eq!(passage_weights(&[1.0], &[3], 2), vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_parses_modes() {
        assert_eq!("Binary".parse::<RelevanceMode>().unwrap(), RelevanceMode::Binary);
        assert_eq!("softmax".parse::<RelevanceMode>().unwrap(), RelevanceMode::Softmax);
        assert!("idf".parse::<RelevanceMode>().is_err());
    }
}
