use std::collections::HashSet;

use crate::models::SourceItem;

use super::Snapshot;

// Words shorter than this carry little topical signal.
const MIN_TERM_LEN: usize = 4;

fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= MIN_TERM_LEN)
        .map(|w| w.to_lowercase())
        .collect()
}

impl Snapshot {
    /// Items sharing terms with `subject`, best match first.
    ///
    /// Used to gather candidate articles for counter analysis. Items matching
    /// no term are left out; ties keep store order.
    pub fn related_items(&self, subject: &str, exclude: i64, limit: usize) -> Vec<&SourceItem> {
        let wanted = terms(subject);
        if wanted.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(usize, &SourceItem)> = self
            .source_items()
            .iter()
            .filter(|item| item.uuid != exclude)
            .filter_map(|item| {
                let found = terms(&format!("{} {}", item.title, item.content));
                let score = wanted.intersection(&found).count();
                (score > 0).then_some((score, item))
            })
            .collect();

        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.into_iter().take(limit).map(|(_, item)| item).collect()
    }
}
