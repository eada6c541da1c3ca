mod analysis;
mod source;

pub use analysis::{Analysis, AnalysisReport, ArticleAnalysis, Counter, Viewpoint};
pub use source::{NewSource, NewSourceItem, Source, SourceItem};
