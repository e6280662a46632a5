use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tokio::task;
use tracing::{info, warn};

use crate::backend::{BackendError, SearchBackend};
use crate::catalog::{CatalogClient, CatalogError};
use crate::movies::{IndexMoviesResult, MovieQuery, MovieSearchResult};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("search backend unreachable: {0}")]
    BackendUnreachable(String),
    #[error("index {0} has not been built yet")]
    IndexNotReady(String),
    #[error("an index rebuild is already running")]
    RebuildInProgress,
    #[error("fetching the movie catalog failed: {0}")]
    UpstreamFetch(#[from] CatalogError),
    #[error("search backend call timed out after {0:?}")]
    BackendTimeout(Duration),
    #[error(transparent)]
    Backend(BackendError),
    #[error("joining blocking task: {0}")]
    Join(#[from] task::JoinError),
}

impl From<BackendError> for ServiceError {
    fn from(value: BackendError) -> Self {
        match value {
            BackendError::Unreachable(reason) => ServiceError::BackendUnreachable(reason),
            BackendError::IndexNotFound(index) => ServiceError::IndexNotReady(index),
            other => ServiceError::Backend(other),
        }
    }
}

/// Rebuilds and queries the movie index.
///
/// At most one rebuild runs at a time. The delete and bulk-write phase of a
/// rebuild excludes queries, so a query sees either the previous index, no
/// index, or the finished new one. Guards are owned by the blocking task doing
/// the backend work, so they outlive a caller that stops waiting.
pub struct MovieService {
    backend: Arc<dyn SearchBackend>,
    catalog: CatalogClient,
    index_name: String,
    backend_timeout: Duration,
    rebuild_flight: Arc<Mutex<()>>,
    index_gate: Arc<RwLock<()>>,
}

impl MovieService {
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        catalog: CatalogClient,
        index_name: impl Into<String>,
        backend_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            catalog,
            index_name: index_name.into(),
            backend_timeout,
            rebuild_flight: Arc::new(Mutex::new(())),
            index_gate: Arc::new(RwLock::new(())),
        }
    }

    /// Replaces the index with a fresh copy of the whole remote catalog.
    pub async fn rebuild_index(&self) -> Result<IndexMoviesResult, ServiceError> {
        let flight = Arc::clone(&self.rebuild_flight)
            .try_lock_owned()
            .map_err(|_| ServiceError::RebuildInProgress)?;

        self.check_backend().await?;

        let started = Instant::now();
        let fetched = self.catalog.fetch_all_pages().await?;
        info!(
            pages = fetched.pages,
            movies = fetched.movies.len(),
            rejected = fetched.rejected,
            "fetched movie catalog"
        );

        let gate = Arc::clone(&self.index_gate).write_owned().await;
        let backend = Arc::clone(&self.backend);
        let index_name = self.index_name.clone();
        let movies = fetched.movies;
        let summary = task::spawn_blocking(move || {
            let _flight = flight;
            let _gate = gate;
            if backend.index_exists(&index_name)? {
                info!(index = %index_name, "index already exists, deleting it");
                backend.delete_index(&index_name)?;
            }
            backend.bulk_insert(&index_name, &movies)
        })
        .await??;

        if summary.failed > 0 {
            warn!(failed = summary.failed, "backend rejected some movies");
        }
        info!(
            indexed = summary.written,
            elapsed = ?started.elapsed(),
            "indexed movies"
        );

        Ok(IndexMoviesResult {
            indexed_movies_count: summary.written,
            failed_movies_count: summary.failed + fetched.rejected,
        })
    }

    /// Runs a filtered, paginated search against the current index.
    pub async fn search(&self, query: MovieQuery) -> Result<MovieSearchResult, ServiceError> {
        self.check_backend().await?;

        let gate = Arc::clone(&self.index_gate).read_owned().await;
        let backend = Arc::clone(&self.backend);
        let index_name = self.index_name.clone();
        self.run_bounded(move || {
            let _gate = gate;
            if !backend.index_exists(&index_name)? {
                return Err(BackendError::IndexNotFound(index_name));
            }
            backend.search(&index_name, &query)
        })
        .await
    }

    async fn check_backend(&self) -> Result<(), ServiceError> {
        let backend = Arc::clone(&self.backend);
        match self.run_bounded(move || backend.ping()).await {
            Err(ServiceError::BackendTimeout(after)) => Err(ServiceError::BackendUnreachable(
                format!("no answer within {after:?}"),
            )),
            other => other,
        }
    }

    async fn run_bounded<T, F>(&self, call: F) -> Result<T, ServiceError>
    where
        F: FnOnce() -> Result<T, BackendError> + Send + 'static,
        T: Send + 'static,
    {
        let joined = tokio::time::timeout(self.backend_timeout, task::spawn_blocking(call))
            .await
            .map_err(|_| ServiceError::BackendTimeout(self.backend_timeout))?;
        Ok(joined??)
    }
}
