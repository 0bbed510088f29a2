// ============================================================
// Layer 4 - Answer Span Alignment
// ============================================================
// Locates a tokenized answer inside a tokenized passage by exact
// token-sequence match and returns the inclusive span of the
// first occurrence.
//
//   context: [the, tower, stands, in, paris, .]
//   answer:  [in, paris]
//   → Some((3, 4))

/// Inclusive `(begin, end)` of the first occurrence of `answer` in
/// `context`, or `None` when the answer is empty or absent.
pub fn find_answer<S: AsRef<str>>(context: &[S], answer: &[S]) -> Option<(usize, usize)> {
    if answer.is_empty() || answer.len() > context.len() {
        return None;
    }

    context
        .windows(answer.len())
        .position(|window| {
            window
                .iter()
                .zip(answer)
                .all(|(c, a)| c.as_ref() == a.as_ref())
        })
        .map(|begin| (begin, begin + answer.len() - 1))
}
