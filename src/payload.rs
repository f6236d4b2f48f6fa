//! Oracle payload assembly: kept pages in order, page-break markers between
//! them, truncated to a word budget.

use crate::core::model::RelevancePage;

pub const PAGE_BREAK: &str = "<<<PAGE_BREAK>>>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub text: String,
    pub words: usize,
    pub truncated: bool,
}

impl Payload {
    pub fn is_empty(&self) -> bool {
        self.words == 0
    }
}

/// Joins the kept pages in ascending page order. Pages with no text are
/// skipped so they do not produce back-to-back markers.
pub fn join_pages<'a>(pages: impl IntoIterator<Item = &'a RelevancePage>) -> String {
    let mut kept: Vec<&RelevancePage> = pages
        .into_iter()
        .filter(|p| p.kept && !p.page.text.trim().is_empty())
        .collect();
    kept.sort_by_key(|p| p.page.index);

    let separator = format!("\n\n{PAGE_BREAK}\n\n");
    kept.iter()
        .map(|p| p.page.text.trim())
        .collect::<Vec<_>>()
        .join(&separator)
}

/// Cuts `text` right after its `budget`-th whitespace-delimited word, so the
/// result is always a literal prefix of the input.
pub fn truncate_words(text: &str, budget: usize) -> (&str, usize, bool) {
    let mut words = 0;
    let mut in_word = false;
    for (pos, ch) in text.char_indices() {
        if ch.is_whitespace() {
            if in_word {
                in_word = false;
                if words == budget {
                    return (&text[..pos], words, true);
                }
            }
        } else if !in_word {
            if words == budget {
                return (text[..pos].trim_end(), words, true);
            }
            in_word = true;
            words += 1;
        }
    }
    (text, words, false)
}

pub fn assemble<'a>(pages: impl IntoIterator<Item = &'a RelevancePage>, word_budget: usize) -> Payload {
    let joined = join_pages(pages);
    let (text, words, truncated) = truncate_words(&joined, word_budget);
    Payload {
        text: text.to_string(),
        words,
        truncated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{KeepReason, Provenance, ResolvedPage};
    use pretty_assertions::assert_eq;

    fn page(index: usize, text: &str, kept: bool) -> RelevancePage {
        RelevancePage {
            page: ResolvedPage {
                index,
                text: text.to_string(),
                provenance: Provenance::Native,
            },
            kept,
            reason: if kept {
                KeepReason::Substantive
            } else {
                KeepReason::Boilerplate
            },
        }
    }

    #[test]
    fn joins_kept_pages_in_page_order() {
        let pages = vec![page(2, "third", true), page(0, "first", true), page(1, "dropped", false)];
        let payload = assemble(&pages, 100);
        assert_eq!(payload.text, format!("first\n\n{PAGE_BREAK}\n\nthird"));
        assert_eq!(payload.words, 3);
        assert!(!payload.truncated);
    }

    #[test]
    fn truncation_keeps_exact_word_prefix() {
        let body: Vec<String> = (0..4500).map(|i| format!("w{i}")).collect();
        let first = body.join(" ");
        let second = body.join("\n");
        let pages = vec![page(0, &first, true), page(1, &second, true)];

        let full = join_pages(&pages);
        let full_words: Vec<&str> = full.split_whitespace().collect();
        assert_eq!(full_words.len(), 9001);

        let payload = assemble(&pages, 8000);
        let words: Vec<&str> = payload.text.split_whitespace().collect();
        assert_eq!(words.len(), 8000);
        assert_eq!(words, full_words[..8000].to_vec());
        assert!(full.starts_with(&payload.text));
        assert!(payload.truncated);
    }

    #[test]
    fn truncation_is_idempotent() {
        let text = "a b  c\td\ne f";
        let (once, _, _) = truncate_words(text, 4);
        let (twice, words, truncated) = truncate_words(once, 4);
        assert_eq!(once, "a b  c\td");
        assert_eq!(twice, once);
        assert_eq!(words, 4);
        assert!(!truncated);
    }

    #[test]
    fn zero_budget_is_empty() {
        let (text, words, truncated) = truncate_words("  hello world", 0);
        assert_eq!(text, "");
        assert_eq!(words, 0);
        assert!(truncated);
    }

    #[test]
    fn blank_pages_produce_empty_payload() {
        let pages = vec![page(0, "   ", true), page(1, "", true)];
        assert!(assemble(&pages, 10).is_empty());
    }
}
