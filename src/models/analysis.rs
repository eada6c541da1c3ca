use serde::{Deserialize, Serialize};

/// A stance taken by an article, with its supporting arguments in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewpoint {
    pub point: String,
    #[serde(default)]
    pub arguments: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    pub subject: String,
    #[serde(default)]
    pub view_points: Vec<Viewpoint>,
}

/// A rebuttal taken from another article. `counter_source_item_uuid` is a
/// lookup-only reference; the referenced item may be missing from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counter {
    pub counter_source_item_uuid: i64,
    pub original_view_point: String,
    pub counter_view_point: String,
    #[serde(default)]
    pub arguments: Vec<String>,
}

/// Outcome of analysing one item.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AnalysisReport {
    #[default]
    Empty,
    Analyzed {
        analysis: Option<Analysis>,
        counters: Option<Vec<Counter>>,
    },
    Failed {
        error: String,
    },
}

impl AnalysisReport {
    pub fn analysis(&self) -> Option<&Analysis> {
        match self {
            AnalysisReport::Analyzed { analysis, .. } => analysis.as_ref(),
            _ => None,
        }
    }

    /// Counters, only when there is at least one.
    pub fn counters(&self) -> Option<&[Counter]> {
        match self {
            AnalysisReport::Analyzed {
                counters: Some(counters),
                ..
            } if !counters.is_empty() => Some(counters.as_slice()),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            AnalysisReport::Failed { error } => Some(error),
            _ => None,
        }
    }

    pub fn has_content(&self) -> bool {
        matches!(
            self,
            AnalysisReport::Analyzed { analysis, counters } if analysis.is_some() || counters.is_some()
        )
    }

    /// Replaces the base analysis, keeping any counters already present.
    pub fn with_analysis(self, analysis: Analysis) -> Self {
        let counters = match self {
            AnalysisReport::Analyzed { counters, .. } => counters,
            _ => None,
        };
        AnalysisReport::Analyzed {
            analysis: Some(analysis),
            counters,
        }
    }

    /// Replaces the counters, keeping any base analysis already present.
    pub fn with_counters(self, counters: Vec<Counter>) -> Self {
        let analysis = match self {
            AnalysisReport::Analyzed { analysis, .. } => analysis,
            _ => None,
        };
        AnalysisReport::Analyzed {
            analysis,
            counters: Some(counters),
        }
    }
}

/// Analysis record for one source item, keyed by `source_item_uuid`.
///
/// Serialized in the flat shape `{source_item_uuid, error?, analysis?, counters?}`
/// used by datasets and the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "FlatArticleAnalysis", into = "FlatArticleAnalysis")]
pub struct ArticleAnalysis {
    pub source_item_uuid: i64,
    pub report: AnalysisReport,
}

impl ArticleAnalysis {
    pub fn new(source_item_uuid: i64, report: AnalysisReport) -> Self {
        Self {
            source_item_uuid,
            report,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct FlatArticleAnalysis {
    source_item_uuid: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    analysis: Option<Analysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    counters: Option<Vec<Counter>>,
}

impl From<FlatArticleAnalysis> for ArticleAnalysis {
    fn from(flat: FlatArticleAnalysis) -> Self {
        let source_item_uuid = flat.source_item_uuid;
        let report = match flat {
            FlatArticleAnalysis {
                error: Some(error), ..
            } => AnalysisReport::Failed { error },
            FlatArticleAnalysis {
                analysis: None,
                counters: None,
                ..
            } => AnalysisReport::Empty,
            FlatArticleAnalysis {
                analysis, counters, ..
            } => AnalysisReport::Analyzed { analysis, counters },
        };
        ArticleAnalysis::new(source_item_uuid, report)
    }
}

impl From<ArticleAnalysis> for FlatArticleAnalysis {
    fn from(record: ArticleAnalysis) -> Self {
        let mut flat = FlatArticleAnalysis {
            source_item_uuid: record.source_item_uuid,
            error: None,
            analysis: None,
            counters: None,
        };
        match record.report {
            AnalysisReport::Empty => {}
            AnalysisReport::Analyzed { analysis, counters } => {
                flat.analysis = analysis;
                flat.counters = counters;
            }
            AnalysisReport::Failed { error } => flat.error = Some(error),
        }
        flat
    }
}
