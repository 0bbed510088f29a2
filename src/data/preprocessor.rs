// ============================================================
// Layer 4 - Text Preprocessor
// ============================================================
// Cleans passage, question and answer text before tokenisation.
//
// MS-MARCO passages are scraped web text and contain:
//   - Non-breaking spaces (U+00A0) and zero-width spaces (U+200B)
//   - Byte order marks left over from page encodings
//   - Tabs, carriage returns and other control characters
//   - TeX-style quotes written as `` and ''
//
// Cleaning steps (applied in order):
//   1. Map whitespace variants and control characters to a space
//   2. Lower-case the text
//   3. Optionally rewrite `` and '' as a double quote plus space
//
// Step 3 only runs for the selected-passage splits, which is where
// the tokenizer would otherwise glue TeX quotes onto words.

pub struct Preprocessor {
    /// Rewrite `` and '' before tokenizing
    normalize_tex_quotes: bool,
}

impl Preprocessor {
    pub fn new() -> Self {
        Self { normalize_tex_quotes: false }
    }

    /// A preprocessor that also rewrites TeX-style quotes.
    pub fn with_quote_normalization() -> Self {
        Self { normalize_tex_quotes: true }
    }

    /// Clean a raw string for downstream tokenisation.
    pub fn clean(&self, text: &str) -> String {
        let mapped: String = text
            .chars()
            .map(|c| match c {
                '\t' | '\r' | '\n'                 => ' ',
                '\u{00A0}' | '\u{200B}' | '\u{FEFF}' => ' ',
                c if c.is_control()                => ' ',
                c                                  => c,
            })
            .collect();

        let lowered = mapped.to_lowercase();

        if self.normalize_tex_quotes {
            normalize_quotes(&lowered)
        } else {
            lowered
        }
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Replace `''` and ``` `` ``` with `" `.
pub fn normalize_quotes(text: &str) -> String {
    text.replace("''", "\" ").replace("``", "\" ")
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercases_and_maps_control_chars() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("Hello\tWorld\u{00A0}!"), "hello world !");
        assert_eq!(p.clean("a\x01b"), "a b");
    }

    #[test]
    fn test_quotes_untouched_by_default() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("``hi''"), "``hi''");
    }

    #[test]
    fn test_quote_normalization_rewrites_tex_quotes() {
        let p = Preprocessor::with_quote_normalization();
        assert_eq!(p.clean("``Hi''"), "\" hi\" ");
    }

    #[test]
    fn test_empty_string() {
        assert_eq!(Preprocessor::new().clean(""), "");
    }
}
