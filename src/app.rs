//! Application facade.
//!
//! Wires config, the snapshot files, the area index, the routing
//! dispatcher and the search engine together, and exposes the operations
//! the CLI and the web daemon call. Snapshots are re-read lazily when
//! their file modtime moves.

use std::sync::{Arc, RwLock};
use std::time::{Duration, SystemTime};

use crate::area::{Area, AreaIndex};
use crate::config::Config;
use crate::geo::GeometryError;
use crate::notify::{NoopNotifier, Notifier, WebhookNotifier};
use crate::report::Report;
use crate::routing::{RoutingDecision, RoutingDispatcher};
use crate::semantic::{
    EmbeddingCache, EmbeddingError, EmbeddingProvider, HttpEmbeddingProvider, SearchEngine,
    SearchOutcome,
};
use crate::storage::{BackendLocal, StorageManager, AREAS_SNAPSHOT, REPORTS_SNAPSHOT};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("not found")]
    NotFound,

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error("io error: {0}")]
    IO(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Default)]
struct Snapshots {
    areas: AreaIndex,
    reports: Vec<Report>,
    areas_modified: Option<SystemTime>,
    reports_modified: Option<SystemTime>,
}

pub struct App {
    storage: BackendLocal,
    dispatcher: RoutingDispatcher,
    engine: SearchEngine,
    cache: Arc<EmbeddingCache>,
    snapshots: RwLock<Snapshots>,
}

impl App {
    pub fn new(config: &Config, storage: BackendLocal) -> Self {
        let notifier: Arc<dyn Notifier> = if config.notify.webhook.is_empty() {
            Arc::new(NoopNotifier)
        } else {
            Arc::new(WebhookNotifier::new(
                config.notify.webhook.clone(),
                Duration::from_secs(config.notify.timeout_secs),
            ))
        };

        let provider = Arc::new(HttpEmbeddingProvider::new(
            config.embedding.endpoint.clone(),
            Duration::from_secs(config.embedding.timeout_secs),
            (config.embedding.dimensions > 0).then_some(config.embedding.dimensions),
        ));

        Self::with_collaborators(config, storage, provider, notifier)
    }

    /// Constructor with injected collaborators; what tests use.
    pub fn with_collaborators(
        config: &Config,
        storage: BackendLocal,
        provider: Arc<dyn EmbeddingProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let cache = Arc::new(EmbeddingCache::new(config.search.cache_capacity));
        let engine = SearchEngine::new(provider, cache.clone(), config.search.threshold);

        Self {
            storage,
            dispatcher: RoutingDispatcher::new(notifier),
            engine,
            cache,
            snapshots: RwLock::new(Snapshots::default()),
        }
    }

    /// Route a freshly created report against the current area snapshot.
    ///
    /// Returns the report with its `RoutingInfo` stamped, plus the full
    /// decision (all matched areas) for the caller to act on.
    pub fn route_report(
        &self,
        mut report: Report,
    ) -> Result<(Report, RoutingDecision), AppError> {
        self.refresh_snapshots()?;

        let snapshots = self.snapshots.read().unwrap();
        let decision = self
            .dispatcher
            .dispatch(&mut report, snapshots.areas.all())?;

        log::info!(
            "routed report '{}': {} match(es), primary {:?}",
            report.id,
            decision.matched_area_ids.len(),
            decision.primary_area_id
        );
        Ok((report, decision))
    }

    /// Rank the current report snapshot against a free-text query.
    pub fn search(&self, query: &str) -> Result<SearchOutcome, AppError> {
        self.refresh_snapshots()?;

        let snapshots = self.snapshots.read().unwrap();
        Ok(self.engine.search(query, &snapshots.reports)?)
    }

    /// Current area snapshot, optionally restricted to active areas.
    pub fn areas(&self, active_only: bool) -> Result<Vec<Area>, AppError> {
        self.refresh_snapshots()?;

        let snapshots = self.snapshots.read().unwrap();
        let areas = if active_only {
            snapshots.areas.list_active().into_iter().cloned().collect()
        } else {
            snapshots.areas.all().to_vec()
        };
        Ok(areas)
    }

    /// Number of reports with a cached embedding.
    pub fn index_size(&self) -> usize {
        self.cache.len()
    }

    pub fn total_reports(&self) -> usize {
        self.snapshots.read().unwrap().reports.len()
    }

    /// Re-read any snapshot file whose modtime moved since the last load.
    /// Missing files mean an empty snapshot, not an error.
    fn refresh_snapshots(&self) -> Result<(), AppError> {
        let areas_modified = self.storage.modified(AREAS_SNAPSHOT).ok();
        let reports_modified = self.storage.modified(REPORTS_SNAPSHOT).ok();

        {
            let snapshots = self.snapshots.read().unwrap();
            if snapshots.areas_modified == areas_modified
                && snapshots.reports_modified == reports_modified
            {
                return Ok(());
            }
        }

        let mut snapshots = self.snapshots.write().unwrap();

        if snapshots.areas_modified != areas_modified {
            snapshots.areas = self.load_areas()?;
            snapshots.areas_modified = areas_modified;
        }

        if snapshots.reports_modified != reports_modified {
            snapshots.reports = self.load_reports()?;
            snapshots.reports_modified = reports_modified;
        }

        Ok(())
    }

    fn load_areas(&self) -> Result<AreaIndex, AppError> {
        let mut index = AreaIndex::new();
        if !self.storage.exists(AREAS_SNAPSHOT) {
            log::info!("no {AREAS_SNAPSHOT} snapshot, starting with no areas");
            return Ok(index);
        }

        let raw = self.storage.read(AREAS_SNAPSHOT)?;
        let areas: Vec<Area> =
            serde_json::from_slice(&raw).map_err(|err| anyhow::anyhow!("{AREAS_SNAPSHOT}: {err}"))?;

        let total = areas.len();
        for area in areas {
            let id = area.id.clone();
            if let Err(err) = index.insert(area) {
                log::warn!("skipping area '{id}' with malformed polygon: {err}");
            }
        }
        log::info!("loaded {}/{} areas from {AREAS_SNAPSHOT}", index.len(), total);
        Ok(index)
    }

    fn load_reports(&self) -> Result<Vec<Report>, AppError> {
        if !self.storage.exists(REPORTS_SNAPSHOT) {
            log::info!("no {REPORTS_SNAPSHOT} snapshot, starting with no reports");
            return Ok(Vec::new());
        }

        let raw = self.storage.read(REPORTS_SNAPSHOT)?;
        let reports: Vec<Report> = serde_json::from_slice(&raw)
            .map_err(|err| anyhow::anyhow!("{REPORTS_SNAPSHOT}: {err}"))?;

        log::info!("loaded {} reports from {REPORTS_SNAPSHOT}", reports.len());
        Ok(reports)
    }
}
