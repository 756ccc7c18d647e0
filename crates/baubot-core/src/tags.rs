//! Domain tag extraction for tasks.
//!
//! Scans free text against the configured keyword table and returns the
//! matching tag names. Matching is case-insensitive substring search
//! over all triggers at once via an Aho-Corasick automaton built at
//! startup.

use std::collections::BTreeMap;

use aho_corasick::AhoCorasick;

use crate::error::{CoreError, CoreResult};

/// Compiled tag matcher.
pub struct TagMatcher {
    automaton: AhoCorasick,
    /// Pattern index -> tag name.
    pattern_tags: Vec<String>,
}

impl TagMatcher {
    /// Build a matcher from the tag-keyword table.
    pub fn new(tag_keywords: &BTreeMap<String, Vec<String>>) -> CoreResult<Self> {
        let mut patterns = Vec::new();
        let mut pattern_tags = Vec::new();
        for (tag, triggers) in tag_keywords {
            for trigger in triggers {
                patterns.push(trigger.to_lowercase());
                pattern_tags.push(tag.clone());
            }
        }

        let automaton = AhoCorasick::new(&patterns)
            .map_err(|e| CoreError::Config(format!("invalid tag keyword table: {e}")))?;

        Ok(Self {
            automaton,
            pattern_tags,
        })
    }

    /// Return the tags triggered by `text`, each at most once, sorted
    /// for stable output.
    pub fn extract(&self, text: &str) -> Vec<String> {
        let haystack = text.to_lowercase();
        let mut tags: Vec<String> = Vec::new();
        for found in self.automaton.find_overlapping_iter(&haystack) {
            let tag = &self.pattern_tags[found.pattern().as_usize()];
            if !tags.contains(tag) {
                tags.push(tag.clone());
            }
        }
        tags.sort();
        tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AssistantConfig;

    fn matcher() -> TagMatcher {
        TagMatcher::new(&AssistantConfig::default().tag_keywords).unwrap()
    }

    #[test]
    fn single_keyword_hits() {
        assert_eq!(matcher().extract("Schneelast für das Dach prüfen"), vec!["Schneelast"]);
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(matcher().extract("TIEFGARAGE planen"), vec!["Stellplatz"]);
    }

    #[test]
    fn multiple_tags_are_deduplicated() {
        let tags = matcher().extract("Widmung mit der Gemeinde klären, Bauland-Umwidmung");
        assert_eq!(tags, vec!["Behörde", "Widmung"]);
    }

    #[test]
    fn unrelated_text_yields_no_tags() {
        assert!(matcher().extract("Mittagessen bestellen").is_empty());
    }
}
