use std::cmp::Reverse;
use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{ArticleAnalysis, Source, SourceItem};

/// Read-only view of the three related collections.
///
/// Every constructor validates key uniqueness, so lookups by uuid are
/// unambiguous. Updates build a new snapshot instead of mutating this one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    sources: Vec<Source>,
    source_items: Vec<SourceItem>,
    #[serde(default)]
    source_item_analyses: Vec<ArticleAnalysis>,
}

impl Snapshot {
    pub fn new(
        sources: Vec<Source>,
        source_items: Vec<SourceItem>,
        analyses: Vec<ArticleAnalysis>,
    ) -> Result<Self> {
        let snapshot = Self {
            sources,
            source_items,
            source_item_analyses: analyses,
        };
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Snapshot = serde_json::from_str(json)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    fn validate(&self) -> Result<()> {
        ensure_unique("source", self.sources.iter().map(|s| s.uuid))?;
        ensure_unique("source item", self.source_items.iter().map(|i| i.uuid))?;
        ensure_unique(
            "analysis",
            self.source_item_analyses.iter().map(|a| a.source_item_uuid),
        )?;

        for item in &self.source_items {
            if self.source_for(item).is_none() {
                tracing::warn!(
                    "Item {} references unknown source {}",
                    item.uuid,
                    item.source_uuid
                );
            }
        }
        Ok(())
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn source_items(&self) -> &[SourceItem] {
        &self.source_items
    }

    pub fn analyses(&self) -> &[ArticleAnalysis] {
        &self.source_item_analyses
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty() && self.source_items.is_empty()
    }

    pub fn source(&self, uuid: i64) -> Option<&Source> {
        self.sources.iter().find(|s| s.uuid == uuid)
    }

    pub fn item(&self, uuid: i64) -> Option<&SourceItem> {
        self.source_items.iter().find(|i| i.uuid == uuid)
    }

    /// The source owning `item`, matched on `source.uuid == item.source_uuid`.
    pub fn source_for(&self, item: &SourceItem) -> Option<&Source> {
        self.source(item.source_uuid)
    }

    /// The analysis record whose `source_item_uuid` equals `item_uuid`.
    pub fn analysis_for(&self, item_uuid: i64) -> Option<&ArticleAnalysis> {
        self.source_item_analyses
            .iter()
            .find(|a| a.source_item_uuid == item_uuid)
    }

    pub fn items_for_source(&self, source_uuid: i64) -> impl Iterator<Item = &SourceItem> {
        self.source_items
            .iter()
            .filter(move |i| i.source_uuid == source_uuid)
    }

    pub fn with_source(&self, source: Source) -> Result<Self> {
        let mut sources = self.sources.clone();
        sources.push(source);
        Self::new(
            sources,
            self.source_items.clone(),
            self.source_item_analyses.clone(),
        )
    }

    /// Adds `items` where a fresh load would place them: newest first, ties
    /// broken by uuid.
    pub fn with_items(&self, items: Vec<SourceItem>) -> Result<Self> {
        let mut source_items = self.source_items.clone();
        for item in items {
            let key = load_order(&item);
            let at = source_items.partition_point(|existing| load_order(existing) <= key);
            source_items.insert(at, item);
        }
        Self::new(
            self.sources.clone(),
            source_items,
            self.source_item_analyses.clone(),
        )
    }

    /// Inserts or replaces the analysis record for `record.source_item_uuid`.
    pub fn with_analysis(&self, record: ArticleAnalysis) -> Self {
        let mut analyses = self.source_item_analyses.clone();
        match analyses
            .iter_mut()
            .find(|a| a.source_item_uuid == record.source_item_uuid)
        {
            Some(existing) => *existing = record,
            None => analyses.push(record),
        }
        Self {
            sources: self.sources.clone(),
            source_items: self.source_items.clone(),
            source_item_analyses: analyses,
        }
    }
}

fn load_order(item: &SourceItem) -> (Reverse<DateTime<Utc>>, i64) {
    (Reverse(item.posted), item.uuid)
}

fn ensure_unique(kind: &'static str, uuids: impl Iterator<Item = i64>) -> Result<()> {
    let mut seen = HashSet::new();
    for uuid in uuids {
        if !seen.insert(uuid) {
            return Err(AppError::DuplicateUuid { kind, uuid });
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{TimeZone, Utc};

    use crate::models::{Analysis, AnalysisReport, ArticleAnalysis, Source, SourceItem};

    pub fn source(uuid: i64, title: &str) -> Source {
        Source {
            uuid,
            title: title.to_string(),
            url: format!("https://example.com/{uuid}/rss.xml"),
            image_url: None,
            last_build: Utc.timestamp_millis_opt(1_681_776_000_000).unwrap(),
            pub_date: Utc.timestamp_millis_opt(1_681_776_000_000).unwrap(),
        }
    }

    pub fn item(uuid: i64, source_uuid: i64, title: &str) -> SourceItem {
        SourceItem {
            uuid,
            title: title.to_string(),
            content: format!("Body of {title}"),
            url: format!("https://example.com/articles/{uuid}"),
            posted: Utc.timestamp_millis_opt(1_681_776_000_000).unwrap(),
            updated: Utc.timestamp_millis_opt(1_681_779_600_000).unwrap(),
            authors: vec!["Staff".to_string()],
            source_uuid,
        }
    }

    pub fn analyzed(item_uuid: i64, subject: &str) -> ArticleAnalysis {
        ArticleAnalysis::new(
            item_uuid,
            AnalysisReport::Analyzed {
                analysis: Some(Analysis {
                    subject: subject.to_string(),
                    view_points: vec![],
                }),
                counters: None,
            },
        )
    }
}
