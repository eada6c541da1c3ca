use std::path::Path;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::task::AbortHandle;
use url::Url;

use crate::ai::Interpreter;
use crate::config::Config;
use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::feed::FeedFetcher;
use crate::models::{Analysis, AnalysisReport, ArticleAnalysis, Counter, NewSource, NewSourceItem, Source};
use crate::services::{AnalysisService, SourceIngest, Unavailable};
use crate::state::{
    generate_intent, validate_source_url, DetailState, DrawerState, GenerateIntent, ListState,
    Section, SelectionState,
};
use crate::store::{seed_snapshot, Snapshot, Store};
use crate::tui::AppAction;

// Candidate articles handed to counter generation.
const RELATED_LIMIT: usize = 5;
// Concurrent feed requests during a bulk pull.
const PULL_CONCURRENCY: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Help,
    AddSource,
    Detail,
    Drawer,
    List,
}

enum Generated {
    Analysis(Analysis),
    // The analysis is kept even when the counters fail
    Counters {
        analysis: Analysis,
        counters: Result<Vec<Counter>>,
    },
}

// Message for a finished generation task
struct GenerationResult {
    id: u64,
    intent: GenerateIntent,
    result: Result<Generated>,
}

struct PendingGeneration {
    id: u64,
    intent: GenerateIntent,
    handle: AbortHandle,
}

struct IngestResult {
    url: Url,
    result: Result<NewSource>,
}

struct PullResult {
    source_uuid: i64,
    result: Result<Vec<NewSourceItem>>,
}

pub struct App {
    // Data
    pub store: Store,
    snapshot_rx: watch::Receiver<Arc<Snapshot>>,

    // UI State
    pub list: ListState,
    pub selection: SelectionState,
    pub detail: DetailState,
    pub drawer: DrawerState,
    pub show_help: bool,
    pub status: Option<String>,
    pub drawer_width: u16,
    pull_limit: usize,

    // Async state
    pending_generation: Option<PendingGeneration>,
    generation_seq: u64,
    pending_add: Option<AbortHandle>,
    pulls_in_flight: usize,
    generation_tx: mpsc::Sender<GenerationResult>,
    generation_rx: mpsc::Receiver<GenerationResult>,
    ingest_tx: mpsc::Sender<IngestResult>,
    ingest_rx: mpsc::Receiver<IngestResult>,
    pull_tx: mpsc::Sender<PullResult>,
    pull_rx: mpsc::Receiver<PullResult>,

    // Services
    pub repository: Repository,
    ingest: Arc<dyn SourceIngest>,
    analysis: Arc<dyn AnalysisService>,
}

impl App {
    pub async fn new(config: &Config) -> Result<Self> {
        let repository = Repository::new(&config.db_path).await?;
        let ingest: Arc<dyn SourceIngest> = Arc::new(FeedFetcher::new()?);

        let analysis: Arc<dyn AnalysisService> = match config.api_key() {
            Some(key) => Arc::new(Interpreter::new(key.to_string(), config.model.clone())?),
            None => {
                tracing::info!("No API key configured, analysis generation disabled");
                Arc::new(Unavailable("Analysis generation"))
            }
        };

        Self::with_services(config, repository, ingest, analysis).await
    }

    /// Builds the app around already constructed collaborators. The snapshot
    /// is loaded before this returns, so the first render sees the data.
    pub async fn with_services(
        config: &Config,
        repository: Repository,
        ingest: Arc<dyn SourceIngest>,
        analysis: Arc<dyn AnalysisService>,
    ) -> Result<Self> {
        if config.seed_demo_data && repository.is_empty().await? {
            tracing::info!("Seeding empty database with the demo dataset");
            repository.import_snapshot(&seed_snapshot()?).await?;
        }

        let snapshot = repository.load_snapshot().await?;
        if snapshot.is_empty() {
            tracing::info!("Starting with an empty dataset");
        }
        let selection = SelectionState::initial(&snapshot);
        let store = Store::new(snapshot);
        let snapshot_rx = store.subscribe();

        let (generation_tx, generation_rx) = mpsc::channel(4);
        let (ingest_tx, ingest_rx) = mpsc::channel(4);
        let (pull_tx, pull_rx) = mpsc::channel(32);

        Ok(Self {
            store,
            snapshot_rx,
            list: ListState::default(),
            selection,
            detail: DetailState::default(),
            drawer: DrawerState::default(),
            show_help: false,
            status: None,
            drawer_width: config.drawer_width,
            pull_limit: config.pull_limit,
            pending_generation: None,
            generation_seq: 0,
            pending_add: None,
            pulls_in_flight: 0,
            generation_tx,
            generation_rx,
            ingest_tx,
            ingest_rx,
            pull_tx,
            pull_rx,
            repository,
            ingest,
            analysis,
        })
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&*self.snapshot_rx.borrow())
    }

    pub fn input_mode(&self) -> InputMode {
        if self.show_help {
            InputMode::Help
        } else if self.drawer.is_open() && self.drawer.is_adding() {
            InputMode::AddSource
        } else if self.drawer.is_open() {
            InputMode::Drawer
        } else if self.selection.is_open() {
            InputMode::Detail
        } else {
            InputMode::List
        }
    }

    pub fn is_adding_source(&self) -> bool {
        self.pending_add.is_some()
    }

    pub fn is_pulling(&self) -> bool {
        self.pulls_in_flight > 0
    }

    pub async fn handle_action(&mut self, action: AppAction) -> Result<bool> {
        match action {
            AppAction::Quit => return Ok(true),

            AppAction::MoveUp => {
                if self.list.move_up() {
                    self.follow_cursor();
                }
            }

            AppAction::MoveDown => {
                let len = self.snapshot().source_items().len();
                if self.list.move_down(len) {
                    self.follow_cursor();
                }
            }

            AppAction::MoveToTop => {
                self.list.move_to_top();
                self.follow_cursor();
            }

            AppAction::MoveToBottom => {
                let len = self.snapshot().source_items().len();
                self.list.move_to_bottom(len);
                self.follow_cursor();
            }

            AppAction::OpenDetail => self.open_detail(),

            AppAction::CloseDetail => {
                self.selection.close();
                self.cancel_generation();
            }

            AppAction::ReopenDetail => {
                self.selection.reopen();
            }

            AppAction::ToggleSection(section) => self.detail.toggle(section),

            AppAction::Generate(section) => self.generate(section),

            AppAction::OpenInBrowser => {
                if let Some(current) = self.selection.current() {
                    if let Err(e) = open::that(&current.article.url) {
                        tracing::warn!("Failed to open {}: {}", current.article.url, e);
                    }
                }
            }

            AppAction::RefreshAll => {
                let sources = self.snapshot().sources().to_vec();
                for source in sources {
                    self.spawn_pull(source);
                }
            }

            AppAction::ToggleDrawer => {
                if self.drawer.is_open() {
                    self.abort_add_source();
                    self.drawer.cancel();
                }
                self.drawer.toggle();
            }

            AppAction::CloseDrawer => {
                self.abort_add_source();
                self.drawer.cancel();
                self.drawer.close();
            }

            AppAction::DrawerUp => self.drawer.move_up(),

            AppAction::DrawerDown => {
                let len = self.snapshot().sources().len();
                self.drawer.move_down(len);
            }

            AppAction::PullSource => {
                let source = self.snapshot().sources().get(self.drawer.cursor).cloned();
                if let Some(source) = source {
                    self.spawn_pull(source);
                }
            }

            AppAction::AddSourceStart => {
                self.drawer.open();
                self.drawer.add();
            }

            AppAction::AddSourceChar(c) => self.drawer.input(c),

            AppAction::AddSourceBackspace => self.drawer.backspace(),

            AppAction::AddSourceConfirm => {
                if let Ok(url) = self.drawer.confirm() {
                    self.spawn_add_source(url);
                }
            }

            AppAction::AddSourceCancel => self.drawer.cancel(),

            AppAction::ShowHelp => {
                self.show_help = true;
            }

            AppAction::HideHelp => {
                self.show_help = false;
            }
        }

        Ok(false)
    }

    /// Moving the cursor while the detail view is open keeps it in sync.
    fn follow_cursor(&mut self) {
        if self.selection.is_open() {
            self.open_detail();
        }
    }

    fn open_detail(&mut self) {
        let snapshot = self.snapshot();
        let Some(item) = self.list.selected_item(&snapshot) else {
            return;
        };
        if self.selection.select(item, &snapshot) {
            self.cancel_generation();
            self.detail.reset();
        }
    }

    fn abort_add_source(&mut self) {
        if let Some(handle) = self.pending_add.take() {
            tracing::debug!("Aborting pending add-source");
            handle.abort();
        }
    }

    // Generation

    fn generate(&mut self, section: Section) {
        let Some(intent) = self
            .selection
            .current()
            .and_then(|current| generate_intent(current, section))
        else {
            return;
        };
        self.start_generation(intent);
    }

    fn start_generation(&mut self, intent: GenerateIntent) {
        let snapshot = self.snapshot();
        let Some(item) = snapshot.item(intent.item_uuid).cloned() else {
            return;
        };
        let existing = snapshot
            .analysis_for(intent.item_uuid)
            .and_then(|record| record.report.analysis())
            .cloned();

        self.cancel_generation();
        self.detail.expand(intent.section);
        self.detail.set_generating(Some(intent.section));
        self.status = None;

        self.generation_seq += 1;
        let id = self.generation_seq;
        let service = Arc::clone(&self.analysis);
        let tx = self.generation_tx.clone();

        let task = tokio::spawn(async move {
            let result = match intent.section {
                Section::Counters => {
                    generate_counters(service.as_ref(), &snapshot, item, existing).await
                }
                _ => service.analyze(item).await.map(Generated::Analysis),
            };
            let _ = tx.send(GenerationResult { id, intent, result }).await;
        });

        self.pending_generation = Some(PendingGeneration {
            id,
            intent,
            handle: task.abort_handle(),
        });
    }

    fn cancel_generation(&mut self) {
        if let Some(pending) = self.pending_generation.take() {
            tracing::debug!("Aborting generation for item {}", pending.intent.item_uuid);
            pending.handle.abort();
        }
        self.detail.set_generating(None);
    }

    /// Poll for a finished generation (non-blocking)
    pub async fn poll_generation_result(&mut self) -> Result<()> {
        let Ok(GenerationResult { id, intent, result }) = self.generation_rx.try_recv() else {
            return Ok(());
        };

        // Only process the generation we're waiting for
        if self.pending_generation.as_ref().map(|p| p.id) != Some(id) {
            tracing::debug!("Dropping stale generation result for item {}", intent.item_uuid);
            return Ok(());
        }
        self.pending_generation = None;
        self.detail.set_generating(None);

        let report = self
            .snapshot()
            .analysis_for(intent.item_uuid)
            .map(|record| record.report.clone())
            .unwrap_or_default();

        let report = match result {
            Ok(Generated::Analysis(analysis)) => report.with_analysis(analysis),
            Ok(Generated::Counters { analysis, counters }) => {
                let report = report.with_analysis(analysis);
                match counters {
                    Ok(counters) => {
                        if counters.is_empty() {
                            self.status = Some("No countering articles found".to_string());
                        }
                        report.with_counters(counters)
                    }
                    Err(e) => {
                        tracing::error!("Failed to generate counters for item {}: {}", intent.item_uuid, e);
                        self.status = Some(format!("Counter generation failed: {e}"));
                        report
                    }
                }
            }
            Err(AppError::Unavailable(what)) => {
                self.status = Some(format!("{what} is not available"));
                return Ok(());
            }
            Err(e) => {
                tracing::error!("Failed to generate {:?} for item {}: {}", intent.section, intent.item_uuid, e);
                if report.has_content() {
                    self.status = Some(format!("Generation failed: {e}"));
                    return Ok(());
                }
                AnalysisReport::Failed {
                    error: e.to_string(),
                }
            }
        };

        self.save_report(ArticleAnalysis::new(intent.item_uuid, report)).await
    }

    async fn save_report(&mut self, record: ArticleAnalysis) -> Result<()> {
        self.repository.save_analysis(&record).await?;
        let snapshot = self.store.update(|s| Ok(s.with_analysis(record)))?;
        self.selection.refresh(&snapshot);
        Ok(())
    }

    // Add source

    fn spawn_add_source(&mut self, url: Url) {
        self.abort_add_source();
        tracing::info!("Adding source {}", url);

        let ingest = Arc::clone(&self.ingest);
        let tx = self.ingest_tx.clone();
        let task = tokio::spawn(async move {
            let result = ingest.add_source(url.clone()).await;
            let _ = tx.send(IngestResult { url, result }).await;
        });
        self.pending_add = Some(task.abort_handle());
    }

    /// Poll for a finished add-source (non-blocking)
    pub async fn poll_ingest_result(&mut self) -> Result<()> {
        let Ok(IngestResult { url, result }) = self.ingest_rx.try_recv() else {
            return Ok(());
        };
        // Cancelled after the task had already finished
        if self.pending_add.take().is_none() {
            tracing::debug!("Dropping add-source result for {}", url);
            return Ok(());
        }

        match result {
            Ok(new_source) => match self.store_source(new_source).await {
                Ok(source) => {
                    self.status = Some(format!("Added {}", source.title));
                    self.spawn_pull(source);
                }
                Err(e) => {
                    tracing::warn!("Failed to store source {}: {}", url, e);
                    self.drawer.set_feedback(e.to_string());
                }
            },
            Err(e) => {
                tracing::warn!("Failed to add source {}: {}", url, e);
                self.drawer.set_feedback(e.to_string());
            }
        }
        Ok(())
    }

    async fn store_source(&mut self, new_source: NewSource) -> Result<Source> {
        let source = self.repository.insert_source(new_source).await?;
        let stored = source.clone();
        self.store.update(|s| s.with_source(stored))?;
        Ok(source)
    }

    // Pull

    fn spawn_pull(&mut self, source: Source) {
        let ingest = Arc::clone(&self.ingest);
        let tx = self.pull_tx.clone();
        let limit = Some(self.pull_limit);
        self.pulls_in_flight += 1;

        tokio::spawn(async move {
            let source_uuid = source.uuid;
            let result = ingest.pull(source, limit).await;
            let _ = tx.send(PullResult { source_uuid, result }).await;
        });
    }

    /// Poll for finished pulls (non-blocking)
    pub async fn poll_pull_result(&mut self) -> Result<()> {
        while let Ok(PullResult { source_uuid, result }) = self.pull_rx.try_recv() {
            self.pulls_in_flight = self.pulls_in_flight.saturating_sub(1);
            match result {
                Ok(items) => match self.store_items(source_uuid, items).await {
                    Ok(added) => self.status = Some(format!("{added} new items")),
                    Err(e) => {
                        tracing::warn!("Failed to store items for source {}: {}", source_uuid, e);
                        self.status = Some(format!("Pull failed: {e}"));
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to pull source {}: {}", source_uuid, e);
                    self.status = Some(format!("Pull failed: {e}"));
                }
            }
        }
        Ok(())
    }

    async fn store_items(&mut self, source_uuid: i64, items: Vec<NewSourceItem>) -> Result<usize> {
        if self.snapshot().source(source_uuid).is_none() {
            return Err(AppError::NotFound {
                kind: "source",
                uuid: source_uuid,
            });
        }
        let stored = self.repository.insert_items(source_uuid, items).await?;
        let added = stored.len();
        if added > 0 {
            let cursor = self.list.selected_item(&self.snapshot()).map(|i| i.uuid);
            let snapshot = self.store.update(|s| s.with_items(stored))?;
            self.list.reselect(&snapshot, cursor);
            self.selection.refresh(&snapshot);
        }
        Ok(added)
    }

    // Headless operations

    pub async fn add_source_blocking(&mut self, url: &str) -> Result<Source> {
        let url = validate_source_url(url)?;
        let new_source = self.ingest.add_source(url).await?;
        let source = self.store_source(new_source).await?;
        let items = self.ingest.pull(source.clone(), Some(self.pull_limit)).await?;
        self.store_items(source.uuid, items).await?;
        Ok(source)
    }

    /// Pulls every source concurrently. Sources that fail are logged and
    /// skipped; returns the number of new items.
    pub async fn pull_all_blocking(&mut self) -> Result<usize> {
        let sources = self.snapshot().sources().to_vec();
        let limit = Some(self.pull_limit);
        let ingest = Arc::clone(&self.ingest);

        let results: Vec<(i64, Vec<NewSourceItem>)> = stream::iter(sources)
            .map(|source| {
                let ingest = Arc::clone(&ingest);
                async move {
                    let (uuid, title) = (source.uuid, source.title.clone());
                    match ingest.pull(source, limit).await {
                        Ok(items) => {
                            tracing::debug!("Fetched {} items from {}", items.len(), title);
                            Some((uuid, items))
                        }
                        Err(e) => {
                            tracing::warn!("Failed to pull {}: {}", title, e);
                            None
                        }
                    }
                }
            })
            .buffer_unordered(PULL_CONCURRENCY)
            .filter_map(|r| async { r })
            .collect()
            .await;

        let mut added = 0;
        for (source_uuid, items) in results {
            added += self.store_items(source_uuid, items).await?;
        }
        Ok(added)
    }

    pub async fn import_dataset(&mut self, path: &Path) -> Result<()> {
        let json = std::fs::read_to_string(path)?;
        let dataset = Snapshot::from_json(&json)?;
        self.repository.import_snapshot(&dataset).await?;

        let snapshot = self.repository.load_snapshot().await?;
        self.list.clamp(snapshot.source_items().len());
        self.store.replace(snapshot);
        self.selection.refresh(&self.snapshot());
        Ok(())
    }
}

async fn generate_counters(
    service: &dyn AnalysisService,
    snapshot: &Snapshot,
    item: crate::models::SourceItem,
    existing: Option<Analysis>,
) -> Result<Generated> {
    let item_uuid = item.uuid;
    let analysis = match existing {
        Some(analysis) => analysis,
        None => service.analyze(item).await?,
    };
    let related = snapshot
        .related_items(&analysis.subject, item_uuid, RELATED_LIMIT)
        .into_iter()
        .cloned()
        .collect();
    let counters = service.counter(analysis.clone(), related).await;
    Ok(Generated::Counters { analysis, counters })
}
