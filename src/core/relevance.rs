use std::sync::LazyLock;

use regex::RegexSet;

use crate::core::model::{KeepReason, RelevancePage, ResolvedPage};

const MARKER_PATTERNS: [&str; 5] = [
    r"(?i)terms\s*(?:and|&)\s*conditions",
    r"(?i)general\s+exclusions?",
    r"(?i)policy\s+wordings?",
    r"(?i)grievance\s+redress(?:al)?",
    r"(?i)customer\s+information\s+sheet",
];

const EVIDENCE_PATTERNS: [&str; 3] = [
    // policy / account numbers
    r"\d{10,}",
    r"(?is)(?:premium|amount).{0,40}?\d{3,}",
    r"(?i:name|holder|insured)\s*[:\-]?\s*[A-Z][A-Za-z]+",
];

// Literal tables; `patterns_compile` below keeps these expects unreachable.
static BOILERPLATE_MARKERS: LazyLock<RegexSet> =
    LazyLock::new(|| RegexSet::new(MARKER_PATTERNS).expect("static marker patterns"));

static POSITIVE_EVIDENCE: LazyLock<RegexSet> =
    LazyLock::new(|| RegexSet::new(EVIDENCE_PATTERNS).expect("static evidence patterns"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelevanceRules {
    pub min_markers: usize,
    pub always_keep_leading: usize,
    pub floor: usize,
}

impl Default for RelevanceRules {
    fn default() -> Self {
        Self {
            min_markers: 2,
            always_keep_leading: 3,
            floor: 3,
        }
    }
}

/// Running tally threaded through [`RelevanceFilter::step`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterState {
    pub kept: usize,
    pub excluded: usize,
}

pub fn marker_count(text: &str) -> usize {
    BOILERPLATE_MARKERS.matches(text).iter().count()
}

pub fn has_positive_evidence(text: &str) -> bool {
    POSITIVE_EVIDENCE.is_match(text)
}

#[derive(Debug, Clone, Default)]
pub struct RelevanceFilter {
    rules: RelevanceRules,
}

impl RelevanceFilter {
    pub fn new(rules: RelevanceRules) -> Self {
        Self { rules }
    }

    /// Boilerplate needs enough distinct markers and no positive evidence.
    pub fn is_boilerplate(&self, text: &str) -> bool {
        marker_count(text) >= self.rules.min_markers && !has_positive_evidence(text)
    }

    pub fn step(
        &self,
        state: FilterState,
        position: usize,
        window_len: usize,
        page: ResolvedPage,
    ) -> (FilterState, RelevancePage) {
        let reason = if position < self.rules.always_keep_leading {
            KeepReason::LeadingPage
        } else if !self.is_boilerplate(&page.text) {
            if has_positive_evidence(&page.text) {
                KeepReason::PositiveEvidence
            } else {
                KeepReason::Substantive
            }
        } else if window_len.saturating_sub(state.excluded + 1) >= self.rules.floor {
            KeepReason::Boilerplate
        } else {
            KeepReason::FloorReached
        };

        let kept = reason != KeepReason::Boilerplate;
        let next = if kept {
            FilterState {
                kept: state.kept + 1,
                ..state
            }
        } else {
            FilterState {
                excluded: state.excluded + 1,
                ..state
            }
        };
        (next, RelevancePage { page, kept, reason })
    }

    pub fn filter(&self, pages: Vec<ResolvedPage>) -> Vec<RelevancePage> {
        let window_len = pages.len();
        let mut state = FilterState::default();
        let mut out = Vec::with_capacity(window_len);
        for (position, page) in pages.into_iter().enumerate() {
            let (next, decided) = self.step(state, position, window_len, page);
            state = next;
            out.push(decided);
        }
        out
    }
}
