use thiserror::Error;

use crate::movies::{MovieQuery, MovieRecord, MovieSearchResult};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("search backend unreachable: {0}")]
    Unreachable(String),
    #[error("index {0} does not exist")]
    IndexNotFound(String),
    #[error("invalid index name {0:?}")]
    InvalidIndexName(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("tantivy error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),
    #[error("missing field in schema: {0}")]
    MissingField(&'static str),
    #[error("missing stored value: {0}")]
    MissingValue(&'static str),
}

/// Documents written and rejected by one bulk insert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkWriteSummary {
    pub written: usize,
    pub failed: usize,
}

/// The primitives the service needs from a search engine.
///
/// Calls are blocking; async callers run them on the blocking pool.
pub trait SearchBackend: Send + Sync {
    /// Cheap connectivity check.
    fn ping(&self) -> Result<(), BackendError>;

    fn index_exists(&self, index: &str) -> Result<bool, BackendError>;

    /// Removes the index. Removing an index that is already gone succeeds.
    fn delete_index(&self, index: &str) -> Result<(), BackendError>;

    /// Adds every movie to the index, creating it if needed. Documents get no
    /// caller-chosen id, so inserting the same movie twice stores it twice.
    fn bulk_insert(
        &self,
        index: &str,
        movies: &[MovieRecord],
    ) -> Result<BulkWriteSummary, BackendError>;

    /// Runs the query. Fails with [`BackendError::IndexNotFound`] when the index is absent.
    fn search(&self, index: &str, query: &MovieQuery) -> Result<MovieSearchResult, BackendError>;
}
