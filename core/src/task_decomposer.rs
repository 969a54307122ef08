//! Splits a free-form task description into an ordered list of subtasks,
//! using numbered-list structure when present and falling back to
//! sequential connective words otherwise.

use regex_lite::Regex;
use std::sync::LazyLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecomposeResult {
    pub decomposed: bool,
    pub subtasks: Vec<String>,
}

static NUMBERED_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*\d+[.)]\s+").unwrap());

static SEQUENTIAL_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[.;,]\s+(?:then|and then|after that|next,?|finally)\b").unwrap()
});

fn split_numbered(text: &str) -> Vec<String> {
    let mut starts: Vec<usize> = NUMBERED_ITEM
        .find_iter(text)
        .map(|m| m.start())
        .collect();
    starts.push(text.len());

    let mut parts = Vec::new();
    for window in starts.windows(2) {
        let (start, end) = (window[0], window[1]);
        let chunk = &text[start..end];
        let stripped = NUMBERED_ITEM.replace(chunk, "");
        let cleaned = stripped.trim();
        if !cleaned.is_empty() {
            parts.push(cleaned.to_string());
        }
    }
    parts
}

fn split_sequential(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut last = 0;
    for m in SEQUENTIAL_MARKER.find_iter(text) {
        let before = text[last..m.start()].trim();
        if !before.is_empty() {
            parts.push(before.to_string());
        }
        last = m.end();
    }
    let tail = text[last..].trim();
    if !tail.is_empty() {
        parts.push(tail.to_string());
    }
    parts
}

/// Numbered-list split when the text contains at least 2 numbered items;
/// otherwise a sequential-connective split when it yields at least 2 parts;
/// otherwise not decomposed.
pub fn decompose_task(text: &str) -> DecomposeResult {
    if NUMBERED_ITEM.find_iter(text).count() >= 2 {
        let subtasks = split_numbered(text);
        if subtasks.len() >= 2 {
            return DecomposeResult {
                decomposed: true,
                subtasks,
            };
        }
    }

    let sequential = split_sequential(text);
    if sequential.len() >= 2 {
        return DecomposeResult {
            decomposed: true,
            subtasks: sequential,
        };
    }

    DecomposeResult {
        decomposed: false,
        subtasks: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbered_list_splits_on_two_or_more_items() {
        let result = decompose_task("1. clone the repo\n2. run the tests\n3) ship it");
        assert!(result.decomposed);
        assert_eq!(
            result.subtasks,
            vec!["clone the repo", "run the tests", "ship it"]
        );
    }

    #[test]
    fn single_numbered_item_is_not_decomposed_by_list_rule() {
        let result = decompose_task("1. just one step, then clean up");
        assert!(result.decomposed);
        assert_eq!(result.subtasks, vec!["1. just one step", "clean up"]);
    }

    #[test]
    fn sequential_markers_split_case_insensitively() {
        let result =
            decompose_task("Open the file, then edit the header, and then save it");
        assert!(result.decomposed);
        assert_eq!(
            result.subtasks,
            vec!["Open the file", "edit the header", "save it"]
        );
    }

    #[test]
    fn finally_is_recognized_as_a_marker() {
        let result = decompose_task("Build it, test it, finally deploy it");
        assert!(result.decomposed);
        assert_eq!(result.subtasks, vec!["Build it, test it", "deploy it"]);
    }

    #[test]
    fn marker_without_preceding_punctuation_is_not_split() {
        let result = decompose_task("Open the file then edit it");
        assert!(!result.decomposed);
    }

    #[test]
    fn plain_sentence_is_not_decomposed() {
        let result = decompose_task("Summarize this document for me");
        assert!(!result.decomposed);
        assert!(result.subtasks.is_empty());
    }

    #[test]
    fn marker_substring_inside_a_word_is_not_matched() {
        // "then" inside "earthenware" must not be treated as a connective.
        let result = decompose_task("Catalogue the earthenware collection");
        assert!(!result.decomposed);
    }
}
