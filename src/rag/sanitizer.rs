//! Removal of reasoning traces from generated text.
//!
//! Reasoning models wrap their internal deliberation in a marker pair
//! (deepseek-r1 uses `<think>`/`</think>`) that must never reach the user.
//! The marker pair is configuration because the convention changes with
//! the model.

pub struct AnswerSanitizer {
    open: String,
    close: String,
}

impl AnswerSanitizer {
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
        }
    }

    /// Remove every matched marker pair (markers included) plus the
    /// whitespace directly after the closing marker, then trim.
    ///
    /// Idempotent: sanitize(sanitize(x)) == sanitize(x). Unmatched markers
    /// pass through untouched.
    pub fn sanitize(&self, text: &str) -> String {
        let mut current = self.strip_pairs(text);
        // Removal can occasionally splice surrounding text into a new
        // matched pair; iterate to a fixpoint so a second application is
        // always a no-op.
        loop {
            let next = self.strip_pairs(&current);
            if next == current {
                return current;
            }
            current = next;
        }
    }

    fn strip_pairs(&self, text: &str) -> String {
        let mut output = String::with_capacity(text.len());
        let mut rest = text;

        loop {
            let Some(open_at) = rest.find(&self.open) else {
                output.push_str(rest);
                break;
            };
            let after_open = open_at + self.open.len();
            let Some(close_rel) = rest[after_open..].find(&self.close) else {
                // Unmatched opening marker: leave the remainder as-is.
                output.push_str(rest);
                break;
            };

            output.push_str(&rest[..open_at]);
            rest = rest[after_open + close_rel + self.close.len()..].trim_start();
        }

        output.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sanitizer() -> AnswerSanitizer {
        AnswerSanitizer::new("<think>", "</think>")
    }

    #[test]
    fn text_without_markers_passes_through() {
        let s = sanitizer();
        assert_eq!(s.sanitize("Dogs are loyal companions."), "Dogs are loyal companions.");
    }

    #[test]
    fn removes_marked_segment_and_markers() {
        let s = sanitizer();
        let raw = "<think>The user asks about dogs. The context says loyal.</think>\nDogs are loyal companions.";
        assert_eq!(s.sanitize(raw), "Dogs are loyal companions.");
    }

    #[test]
    fn removes_multiple_segments() {
        let s = sanitizer();
        let raw = "<think>first</think>Answer part one. <think>second</think>Answer part two.";
        assert_eq!(s.sanitize(raw), "Answer part one. Answer part two.");
    }

    #[test]
    fn unmatched_markers_are_preserved() {
        let s = sanitizer();
        assert_eq!(s.sanitize("<think>never closed"), "<think>never closed");
        assert_eq!(s.sanitize("never opened</think>"), "never opened</think>");
    }

    #[test]
    fn sanitize_is_idempotent() {
        let s = sanitizer();
        let cases = [
            "plain answer",
            "<think>gone</think>kept",
            "<think>unclosed",
            // Removal splices the surrounding text into a new marker pair.
            "<th<think>x</think>ink>spliced</think>",
            "  spaced out  ",
        ];
        for case in cases {
            let once = s.sanitize(case);
            assert_eq!(s.sanitize(&once), once, "not idempotent for {case:?}");
        }
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let s = sanitizer();
        assert_eq!(s.sanitize("  <think>x</think>   answer  "), "answer");
    }
}
