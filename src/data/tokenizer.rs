// ============================================================
// Layer 4 - Word Tokenizer
// ============================================================
// Penn-Treebank style word tokenizer.
//
// The text is first cut into sentences, then each sentence is
// rewritten by an ordered list of regex substitutions that pad
// punctuation, quotes, brackets and contractions with spaces.
// Splitting on whitespace afterwards yields the tokens.
//
//   "he didn't say \"hi\"."  →  he | did | n't | say | " | hi | " | .
//
// Quote tokens are normalised at the end so that ``, '' and the
// curly quote characters all become plain ASCII quotes.

use regex::Regex;

/// One substitution step: every match of `pattern` is replaced
/// by `replacement` (which may reference capture groups).
struct Rule {
    pattern:     Regex,
    replacement: &'static str,
}

impl Rule {
    fn new(pattern: &str, replacement: &'static str) -> Self {
        Self {
            // Patterns are compile-time constants covered by the tests below.
            pattern: Regex::new(pattern).unwrap_or_else(|e| panic!("bad tokenizer rule {pattern}: {e}")),
            replacement,
        }
    }

    fn apply(&self, text: &str) -> String {
        self.pattern.replace_all(text, self.replacement).into_owned()
    }
}

pub struct WordTokenizer {
    starting_quotes: Vec<Rule>,
    punctuation:     Vec<Rule>,
    brackets:        Vec<Rule>,
    ending_quotes:   Vec<Rule>,
    contractions:    Vec<Rule>,
}

impl WordTokenizer {
    pub fn new() -> Self {
        let starting_quotes = vec![
            Rule::new(r#"^""#, "``"),
            Rule::new(r"(``)", " $1 "),
            Rule::new("[\u{201C}\u{201E}\u{AB}]", " $0 "),
            Rule::new(r#"([ (\[{<])("|'{2})"#, "$1 `` "),
        ];

        let punctuation = vec![
            Rule::new(r#"([^.])(\.)([\]\)}>"']*)\s*$"#, "$1 $2$3 "),
            Rule::new(r"([:,])([^\d])", " $1 $2"),
            Rule::new(r"([:,])$", " $1 "),
            Rule::new(r"\.{2,}", " $0 "),
            Rule::new(r"[;@#$%&*]", " $0 "),
            Rule::new(r"[?!]", " $0 "),
            Rule::new(r"([^'])' ", "$1 ' "),
        ];

        let brackets = vec![
            Rule::new(r"[\]\[(){}<>]", " $0 "),
            Rule::new(r"--", " -- "),
        ];

        let ending_quotes = vec![
            Rule::new("[\u{201D}\u{BB}]", " $0 "),
            Rule::new(r"''", " '' "),
            Rule::new(r#"""#, " '' "),
            Rule::new(r"(\S)('')", "$1 $2 "),
            Rule::new(r"([^' ])('[sS]|'[mM]|'[dD]|') ", "$1 $2 "),
            Rule::new(r"([^' ])('ll|'LL|'re|'RE|'ve|'VE|n't|N'T) ", "$1 $2 "),
        ];

        let contractions = vec![
            Rule::new(r"(?i)\b(can)(not)\b", " $1 $2 "),
            Rule::new(r"(?i)\b(d)('ye)\b", " $1 $2 "),
            Rule::new(r"(?i)\b(gim)(me)\b", " $1 $2 "),
            Rule::new(r"(?i)\b(gon)(na)\b", " $1 $2 "),
            Rule::new(r"(?i)\b(got)(ta)\b", " $1 $2 "),
            Rule::new(r"(?i)\b(lem)(me)\b", " $1 $2 "),
            Rule::new(r"(?i)\b(more)('n)\b", " $1 $2 "),
            Rule::new(r"(?i)\b(wan)(na)\s", " $1 $2 "),
            Rule::new(r"(?i) ('t)(is)\b", " $1 $2 "),
            Rule::new(r"(?i) ('t)(was)\b", " $1 $2 "),
        ];

        Self { starting_quotes, punctuation, brackets, ending_quotes, contractions }
    }

    /// Tokenize `text` into words and punctuation marks.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        split_sentences(text)
            .into_iter()
            .flat_map(|sentence| self.tokenize_sentence(sentence))
            .map(|token| normalize_token_quotes(&token))
            .collect()
    }

    fn tokenize_sentence(&self, sentence: &str) -> Vec<String> {
        let mut text = sentence.to_string();

        for rule in self.starting_quotes.iter().chain(&self.punctuation).chain(&self.brackets) {
            text = rule.apply(&text);
        }

        text = format!(" {text} ");

        for rule in self.ending_quotes.iter().chain(&self.contractions) {
            text = rule.apply(&text);
        }

        text.split_whitespace().map(str::to_string).collect()
    }
}

impl Default for WordTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Map quote variants produced by the rules (and typographic quotes
/// from the corpus) onto plain ASCII quotes.
fn normalize_token_quotes(token: &str) -> String {
    token
        .replace("``", "\"")
        .replace("''", "\"")
        .replace('\u{2019}', "'")
        .replace('\u{2018}', "'")
        .replace('\u{201D}', "\"")
        .replace('\u{201C}', "\"")
}

/// Common English abbreviations whose period never ends a sentence.
const ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "st", "jr", "sr", "vs", "etc", "inc", "ltd",
    "corp", "mt", "ft", "approx", "dept",
    "jan", "feb", "apr", "jun", "jul", "aug", "sep", "sept", "oct", "nov", "dec",
];

/// Cut text into sentences at `.`, `!` or `?` followed by whitespace.
///
/// A period does not end a sentence when the word it closes looks
/// like an abbreviation: a single letter ("j."), a word with an
/// internal period ("u.s.", "e.g.") or a known title or short form
/// ("mr.", "dr.", "vs.").
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start     = 0usize;
    let chars: Vec<(usize, char)> = text.char_indices().collect();

    for (i, &(pos, c)) in chars.iter().enumerate() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let next_is_space = chars.get(i + 1).map_or(false, |&(_, n)| n.is_whitespace());
        if !next_is_space {
            continue;
        }

        let end  = pos + c.len_utf8();
        let word = text[start..pos]
            .rsplit(char::is_whitespace)
            .next()
            .unwrap_or("");
        if c == '.' && is_abbreviation(word) {
            continue;
        }

        let sentence = text[start..end].trim();
        if !sentence.is_empty() {
            sentences.push(sentence);
        }
        start = end;
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

fn is_abbreviation(word: &str) -> bool {
    let letters = word.chars().filter(|c| c.is_alphabetic()).count();
    (letters == 1 && word.chars().count() == 1)
        || word.contains('.')
        || ABBREVIATIONS.iter().any(|a| a.eq_ignore_ascii_case(word))
}

/// Re-join tokens into text, attaching `. , ; ? !` to the token
/// before them.
pub fn join_punctuation(tokens: &[String]) -> String {
    let mut out: Vec<String> = Vec::with_capacity(tokens.len());

    for token in tokens {
        let attach = matches!(token.as_str(), "." | "," | ";" | "?" | "!");
        match out.last_mut() {
            Some(last) if attach => last.push_str(token),
            _                    => out.push(token.clone()),
        }
    }

    out.join(" ")
}
