//! Removal of repeated long blocks.
//!
//! Classifiers sometimes emit the same paragraph twice. A block is dropped
//! when its normalized text is longer than the threshold and an earlier block
//! already had the same normalized text. Short blocks such as `Plaintiff,` or
//! `-against-` repeat legitimately and are never dropped.

use std::collections::HashSet;

use unicode_normalization::UnicodeNormalization;

use crate::model::FilledBlock;

/// Default minimum normalized length (in characters) for a block to be
/// considered for removal. Only blocks strictly longer are deduplicated.
pub const DEFAULT_MIN_LEN: usize = 16;

/// Single-pass, order-preserving duplicate filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeduplicationFilter {
    min_len: usize,
}

impl DeduplicationFilter {
    /// Create a filter with the default threshold.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the length threshold.
    pub fn with_threshold(mut self, min_len: usize) -> Self {
        self.min_len = min_len;
        self
    }

    /// The length threshold in characters.
    pub fn threshold(&self) -> usize {
        self.min_len
    }

    /// Drop later repetitions of long blocks, keeping order.
    ///
    /// A page break on a dropped block moves to the next kept block.
    pub fn filter(&self, blocks: Vec<FilledBlock>) -> Vec<FilledBlock> {
        let before = blocks.len();
        let mut seen: HashSet<String> = HashSet::new();
        let mut kept: Vec<FilledBlock> = Vec::with_capacity(before);
        let mut page_break = false;

        for mut block in blocks {
            let key = normalize(&block.text);
            if key.chars().count() > self.min_len && !seen.insert(key) {
                page_break |= block.page_break_before;
                continue;
            }
            block.page_break_before |= std::mem::take(&mut page_break);
            kept.push(block);
        }

        if kept.len() < before {
            log::debug!("Dropped {} duplicate blocks", before - kept.len());
        }
        kept
    }
}

impl Default for DeduplicationFilter {
    fn default() -> Self {
        Self {
            min_len: DEFAULT_MIN_LEN,
        }
    }
}

/// Comparison key: NFKC, whitespace runs collapsed, trimmed, lower-cased.
pub fn normalize(text: &str) -> String {
    let composed: String = text.nfkc().collect();
    composed
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BlockKind;

    fn para(text: &str) -> FilledBlock {
        FilledBlock::new(BlockKind::Paragraph, text)
    }

    fn texts(blocks: &[FilledBlock]) -> Vec<&str> {
        blocks.iter().map(|b| b.text.as_str()).collect()
    }

    #[test]
    fn test_long_repeats_keep_first() {
        let long = "That on the first day of the month the defendant";
        let blocks = vec![para(long), para("Plaintiff,"), para(long), para(long)];
        let out = DeduplicationFilter::new().filter(blocks);
        assert_eq!(texts(&out), vec![long, "Plaintiff,"]);
    }

    #[test]
    fn test_short_blocks_never_dropped() {
        let blocks = vec![para("-against-"), para("-against-"), para("-against-")];
        assert_eq!(DeduplicationFilter::new().filter(blocks).len(), 3);
    }

    #[test]
    fn test_threshold_is_strict() {
        // 16 characters: at the threshold, kept
        let at = "abcdefghijklmnop";
        assert_eq!(DeduplicationFilter::new().filter(vec![para(at), para(at)]).len(), 2);
        // 17 characters: over the threshold, deduplicated
        let over = "First allegation.";
        assert_eq!(DeduplicationFilter::new().filter(vec![para(over), para(over)]).len(), 1);
    }

    #[test]
    fn test_normalization_equates_variants() {
        let a = "The  Defendant\tWAS negligent";
        let b = "  the defendant was\u{00A0}negligent ";
        let out = DeduplicationFilter::new().filter(vec![para(a), para(b)]);
        assert_eq!(texts(&out), vec![a]);
    }

    #[test]
    fn test_page_break_moves_to_next_kept_block() {
        let long = "That on the first day of the month the defendant";
        let blocks = vec![
            para(long),
            para(long).with_page_break(),
            para("Dated: May 1"),
        ];
        let out = DeduplicationFilter::new().filter(blocks);
        assert_eq!(texts(&out), vec![long, "Dated: May 1"]);
        assert!(!out[0].page_break_before);
        assert!(out[1].page_break_before);
    }

    #[test]
    fn test_custom_threshold() {
        let filter = DeduplicationFilter::new().with_threshold(3);
        let out = filter.filter(vec![para("abcd"), para("abcd"), para("abc"), para("abc")]);
        assert_eq!(texts(&out), vec!["abcd", "abc", "abc"]);
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  A\u{FB01}ne \n Day "), "afine day");
    }
}
