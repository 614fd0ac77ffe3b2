use crate::model::Entry;
use nucleo_matcher::pattern::{CaseMatching, Normalization, Pattern};
use nucleo_matcher::{Matcher, Utf32Str};
use std::cmp::Reverse;

pub struct FuzzyMatcher {
    matcher: Matcher,
}

impl Default for FuzzyMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl FuzzyMatcher {
    pub fn new() -> Self {
        Self {
            matcher: Matcher::new(nucleo_matcher::Config::DEFAULT),
        }
    }

    /// Best score of `query` against the entry's name, generic name and
    /// keywords.
    pub fn score(&mut self, pattern: &Pattern, entry: &Entry) -> Option<u32> {
        let mut buf = Vec::new();
        std::iter::once(&entry.name)
            .chain(std::iter::once(&entry.generic_name))
            .chain(entry.keywords.iter())
            .filter(|field| !field.is_empty())
            .filter_map(|field| pattern.score(Utf32Str::new(field, &mut buf), &mut self.matcher))
            .max()
    }

    /// Orders `entries` best match first. Entries the pattern does not match
    /// at all (found through their comment, say) keep a score of zero and
    /// sort by name after the scored ones.
    pub fn rank<'a>(&mut self, query: &str, mut entries: Vec<&'a Entry>) -> Vec<&'a Entry> {
        if query.trim().is_empty() {
            entries.sort_by(|a, b| a.name.cmp(&b.name));
            return entries;
        }

        let pattern = Pattern::parse(query, CaseMatching::Smart, Normalization::Smart);
        let mut scored: Vec<(u32, &Entry)> = entries
            .into_iter()
            .map(|entry| (self.score(&pattern, entry).unwrap_or(0), entry))
            .collect();
        scored.sort_by_key(|(score, entry)| (Reverse(*score), entry.name.clone()));
        scored.into_iter().map(|(_, entry)| entry).collect()
    }
}
