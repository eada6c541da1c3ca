//! Collaborators the dashboard calls out to.
//!
//! The traits return boxed futures so `App` can hold them as trait objects and
//! tests can swap in recording doubles.

use futures::future::BoxFuture;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Analysis, Counter, NewSource, NewSourceItem, Source, SourceItem};

/// Feed discovery and retrieval.
pub trait SourceIngest: Send + Sync {
    /// Resolves `url` to a feed and returns its metadata.
    fn add_source(&self, url: Url) -> BoxFuture<'_, Result<NewSource>>;

    /// Fetches the current entries of `source`, at most `limit` of them.
    fn pull(&self, source: Source, limit: Option<usize>) -> BoxFuture<'_, Result<Vec<NewSourceItem>>>;
}

/// Subject/viewpoint extraction and rebuttal matching.
pub trait AnalysisService: Send + Sync {
    fn analyze(&self, item: SourceItem) -> BoxFuture<'_, Result<Analysis>>;

    /// Finds, among `related`, articles countering the viewpoints of `analysis`.
    fn counter(
        &self,
        analysis: Analysis,
        related: Vec<SourceItem>,
    ) -> BoxFuture<'_, Result<Vec<Counter>>>;
}

/// Stand-in for a collaborator that is not configured.
#[derive(Debug, Clone, Copy)]
pub struct Unavailable(pub &'static str);

impl SourceIngest for Unavailable {
    fn add_source(&self, _url: Url) -> BoxFuture<'_, Result<NewSource>> {
        let what = self.0;
        Box::pin(async move { Err(AppError::Unavailable(what)) })
    }

    fn pull(&self, _source: Source, _limit: Option<usize>) -> BoxFuture<'_, Result<Vec<NewSourceItem>>> {
        let what = self.0;
        Box::pin(async move { Err(AppError::Unavailable(what)) })
    }
}

impl AnalysisService for Unavailable {
    fn analyze(&self, _item: SourceItem) -> BoxFuture<'_, Result<Analysis>> {
        let what = self.0;
        Box::pin(async move { Err(AppError::Unavailable(what)) })
    }

    fn counter(
        &self,
        _analysis: Analysis,
        _related: Vec<SourceItem>,
    ) -> BoxFuture<'_, Result<Vec<Counter>>> {
        let what = self.0;
        Box::pin(async move { Err(AppError::Unavailable(what)) })
    }
}
