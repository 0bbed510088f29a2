// ============================================================
// Layer 4 - Vocabulary and Smart Unknown Classes
// ============================================================
// The vocabulary is the sorted set of every token seen in the
// training contexts and questions plus the evaluation passages
// and questions. Sorting makes indices reproducible run to run.
//
// Tokens missing from the (embedding-restricted) vocabulary are
// not collapsed into one <unk>. With smart unknowns enabled they
// fall into the first matching class:
//
//   0  number       token starts with a digit    "1867", "3rd"
//   1  punctuation  only punctuation/whitespace  "--", "..."
//   2  misspelling  only lower-case letters      "teh"
//   3  catch-all    anything else                "naïve", "x-ray"
//
// Index layout used by the vectorizer and the embedding table:
//
//   0 .. V        known words
//   V .. V+C      unknown classes
//   V+C           padding

use regex::Regex;
use std::collections::{BTreeSet, HashMap};

/// Sorted word list with a word → index map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vocabulary {
    words: Vec<String>,
    index: HashMap<String, usize>,
}

impl Vocabulary {
    /// Build from tokenized sentences: de-duplicated and sorted.
    pub fn build<'a, I, S>(sentences: I) -> Self
    where
        I: IntoIterator<Item = &'a S>,
        S: AsRef<[String]> + 'a + ?Sized,
    {
        let set: BTreeSet<&str> = sentences
            .into_iter()
            .flat_map(|s| s.as_ref().iter().map(String::as_str))
            .collect();
        Self::from_sorted(set.into_iter().map(str::to_string).collect())
    }

    /// Wrap an already sorted, de-duplicated word list.
    pub fn from_sorted(words: Vec<String>) -> Self {
        let index = words
            .iter()
            .enumerate()
            .map(|(i, w)| (w.clone(), i))
            .collect();
        Self { words, index }
    }

    pub fn get(&self, word: &str) -> Option<usize> {
        self.index.get(word).copied()
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Keep only words accepted by `keep`, re-indexing densely in the
    /// original order.
    pub fn retain(&self, mut keep: impl FnMut(&str) -> bool) -> Self {
        Self::from_sorted(self.words.iter().filter(|w| keep(w)).cloned().collect())
    }
}

/// Buckets for out-of-vocabulary tokens.
#[derive(Debug, Clone)]
pub struct UnknownClasses {
    names:    Vec<&'static str>,
    patterns: Vec<Regex>,
}

const PUNCTUATION: &str = "!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";

impl UnknownClasses {
    /// Four classes: number, punctuation, misspelling, catch-all.
    pub fn smart() -> Self {
        let punctuation = format!(r"^[\s{}]+$", regex::escape(PUNCTUATION));
        Self::from_patterns(&[
            ("number",      r"^\d+"),
            ("punctuation", &punctuation),
            ("misspelling", r"^[a-z]+$"),
            ("other",       r"^.*"),
        ])
    }

    /// A single catch-all class.
    pub fn plain() -> Self {
        Self::from_patterns(&[("other", r"^.*")])
    }

    pub fn new(smart: bool) -> Self {
        if smart { Self::smart() } else { Self::plain() }
    }

    fn from_patterns(specs: &[(&'static str, &str)]) -> Self {
        let (names, patterns) = specs
            .iter()
            .map(|(name, pattern)| {
                let re = Regex::new(pattern)
                    .unwrap_or_else(|e| panic!("bad unknown-class pattern {pattern}: {e}"));
                (*name, re)
            })
            .unzip();
        Self { names, patterns }
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn names(&self) -> &[&'static str] {
        &self.names
    }

    /// Index of the first class matching `token`. The last class is
    /// a catch-all, so every token has a class.
    pub fn classify(&self, token: &str) -> usize {
        self.patterns
            .iter()
            .position(|re| re.is_match(token))
            .unwrap_or(self.patterns.len() - 1)
    }
}

/// Where known words, unknown classes and padding live in the
/// shared index space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct IndexLayout {
    pub vocab_size:  usize,
    pub num_classes: usize,
}

impl IndexLayout {
    pub fn new(vocab_size: usize, num_classes: usize) -> Self {
        Self { vocab_size, num_classes }
    }

    pub fn unknown_id(&self, class: usize) -> usize {
        self.vocab_size + class
    }

    pub fn pad_id(&self) -> usize {
        self.vocab_size + self.num_classes
    }

    /// Rows in the full embedding table (words + classes + padding).
    pub fn table_rows(&self) -> usize {
        self.pad_id() + 1
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn toks(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn test_build_sorts_and_dedups() {
        let sentences = vec![toks("b a c"), toks("a d")];
        let vocab     = Vocabulary::build(&sentences);
        assert_eq!(vocab.words(), &["a", "b", "c", "d"]);
        assert_eq!(vocab.get("c"), Some(2));
        assert_eq!(vocab.get("z"), None);
    }

    #[test]
    fn test_retain_reindexes() {
        let vocab = Vocabulary::from_sorted(toks("a b c d"));
        let kept  = vocab.retain(|w| w != "b");
        assert_eq!(kept.get("c"), Some(1));
        assert_eq!(kept.get("b"), None);
        assert_eq!(kept.len(), 3);
    }

    #[test]
    fn test_smart_classes_pick_first_match() {
        let classes = UnknownClasses::smart();
        assert_eq!(classes.len(), 4);
        assert_eq!(classes.classify("1867"), 0);
        assert_eq!(classes.classify("3rd"), 0);
        assert_eq!(classes.classify("--"), 1);
        assert_eq!(classes.classify("...!?"), 1);
        assert_eq!(classes.classify("teh"), 2);
        assert_eq!(classes.classify("x-ray"), 3);
        assert_eq!(classes.classify("a1"), 3);
        assert_eq!(classes.classify(""), 3);
    }

    #[test]
    fn test_plain_classes_have_one_bucket() {
        let classes = UnknownClasses::new(false);
        assert_eq!(classes.len(), 1);
        assert_eq!(classes.classify("1867"), 0);
    }

    #[test]
    fn test_layout_ids() {
        let layout = IndexLayout::new(10, 4);
        assert_eq!(layout.unknown_id(0), 10);
        assert_eq!(layout.unknown_id(3), 13);
        assert_eq!(layout.pad_id(), 14);
        assert_eq!(layout.table_rows(), 15);
    }
}
