use crate::core::model::{Document, Page, ScanVerdict};

#[derive(Debug, Clone, Copy)]
pub struct ScanSignals {
    pub sampled_pages: usize,
    pub native_chars: usize,
}

impl ScanSignals {
    pub fn from_pages(pages: &[Page], sample: usize) -> Self {
        let sampled = &pages[..pages.len().min(sample)];
        Self {
            sampled_pages: sampled.len(),
            native_chars: sampled.iter().map(Page::native_len).sum(),
        }
    }
}

pub fn classify_signals(signals: ScanSignals, threshold: usize) -> ScanVerdict {
    // Nothing to sample: an empty window degenerates to an empty payload anyway.
    if signals.sampled_pages == 0 {
        return ScanVerdict::Digital;
    }
    if signals.native_chars < threshold {
        ScanVerdict::Scanned
    } else {
        ScanVerdict::Digital
    }
}

/// Computes the one verdict used for every page of `document`.
pub fn classify(document: &Document, sample: usize, threshold: usize) -> ScanVerdict {
    classify_signals(ScanSignals::from_pages(document.pages(), sample), threshold)
}
