use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tantivy::schema::{Field, NumericOptions, STORED, STRING, Schema, TEXT, TantivyDocument};
use tantivy::{Index, IndexReader, ReloadPolicy};
use tracing::{debug, info, warn};

use crate::backend::{BackendError, BulkWriteSummary, SearchBackend};
use crate::movies::{MovieQuery, MovieRecord, MovieSearchResult};
use crate::query;

const WRITER_MEMORY_BUDGET: usize = 50_000_000;

#[derive(Debug, Clone)]
pub struct MovieFields {
    pub imdb_id: Field,
    pub title: Field,
    pub year: Field,
}

impl MovieFields {
    pub fn new(schema: &Schema) -> Result<Self, BackendError> {
        Ok(Self {
            imdb_id: schema
                .get_field("imdb_id")
                .map_err(|_| BackendError::MissingField("imdb_id"))?,
            title: schema
                .get_field("title")
                .map_err(|_| BackendError::MissingField("title"))?,
            year: schema
                .get_field("year")
                .map_err(|_| BackendError::MissingField("year"))?,
        })
    }
}

pub fn build_movie_schema() -> Schema {
    let mut schema_builder = Schema::builder();

    schema_builder.add_text_field("imdb_id", STRING | STORED);
    schema_builder.add_text_field("title", TEXT | STORED);

    let numeric_options = NumericOptions::default()
        .set_indexed()
        .set_stored()
        .set_fast();
    schema_builder.add_i64_field("year", numeric_options);

    schema_builder.build()
}

/// An opened movie index with its field handles and a reader.
#[derive(Clone)]
pub struct MovieIndex {
    pub index: Index,
    pub fields: MovieFields,
    pub reader: IndexReader,
}

impl MovieIndex {
    pub fn open(index_dir: &Path) -> Result<Self, BackendError> {
        Self::from_index(Index::open_in_dir(index_dir)?)
    }

    pub fn from_index(index: Index) -> Result<Self, BackendError> {
        let fields = MovieFields::new(&index.schema())?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        Ok(Self {
            index,
            fields,
            reader,
        })
    }
}

/// Embedded search backend keeping each named index in a subdirectory of `root`.
///
/// A fresh index is built in a hidden staging directory and renamed into place
/// once committed, so readers only ever find no index or a complete one.
pub struct TantivyBackend {
    root: PathBuf,
    open: Mutex<HashMap<String, Arc<MovieIndex>>>,
}

impl TantivyBackend {
    pub fn open(root: impl AsRef<Path>) -> Result<Self, BackendError> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            open: Mutex::new(HashMap::new()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn index_dir(&self, name: &str) -> Result<PathBuf, BackendError> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(BackendError::InvalidIndexName(name.to_string()));
        }
        Ok(self.root.join(name))
    }

    fn staging_dir(&self, name: &str) -> PathBuf {
        self.root.join(format!(".{name}.staging"))
    }

    fn handle(&self, name: &str, index_dir: &Path) -> Result<Arc<MovieIndex>, BackendError> {
        let mut open = self.open.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = open.get(name) {
            return Ok(Arc::clone(handle));
        }
        let handle = Arc::new(MovieIndex::open(index_dir)?);
        open.insert(name.to_string(), Arc::clone(&handle));
        Ok(handle)
    }

    fn forget(&self, name: &str) {
        self.open
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
    }
}

impl SearchBackend for TantivyBackend {
    fn ping(&self) -> Result<(), BackendError> {
        let metadata = std::fs::metadata(&self.root).map_err(|err| {
            BackendError::Unreachable(format!("{}: {}", self.root.display(), err))
        })?;
        if !metadata.is_dir() {
            return Err(BackendError::Unreachable(format!(
                "{} is not a directory",
                self.root.display()
            )));
        }
        Ok(())
    }

    fn index_exists(&self, index: &str) -> Result<bool, BackendError> {
        Ok(index_exists(&self.index_dir(index)?))
    }

    fn delete_index(&self, index: &str) -> Result<(), BackendError> {
        let index_dir = self.index_dir(index)?;
        self.forget(index);
        match std::fs::remove_dir_all(&index_dir) {
            Ok(()) => {
                info!(index, "deleted index");
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(index, "index already absent");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    fn bulk_insert(
        &self,
        index: &str,
        movies: &[MovieRecord],
    ) -> Result<BulkWriteSummary, BackendError> {
        let index_dir = self.index_dir(index)?;

        if index_exists(&index_dir) {
            let handle = self.handle(index, &index_dir)?;
            let summary = write_movies(&handle.index, &handle.fields, movies)?;
            handle.reader.reload()?;
            info!(index, written = summary.written, "appended to existing index");
            return Ok(summary);
        }

        let staging_dir = self.staging_dir(index);
        if staging_dir.exists() {
            std::fs::remove_dir_all(&staging_dir)?;
        }
        std::fs::create_dir_all(&staging_dir)?;

        let staged = Index::create_in_dir(&staging_dir, build_movie_schema())?;
        let fields = MovieFields::new(&staged.schema())?;
        let summary = write_movies(&staged, &fields, movies)?;
        drop(staged);

        // A directory without meta.json is debris from an interrupted write.
        if index_dir.exists() {
            std::fs::remove_dir_all(&index_dir)?;
        }
        std::fs::rename(&staging_dir, &index_dir)?;
        self.forget(index);

        info!(
            index,
            written = summary.written,
            failed = summary.failed,
            "published fresh index"
        );
        Ok(summary)
    }

    fn search(&self, index: &str, query: &MovieQuery) -> Result<MovieSearchResult, BackendError> {
        let index_dir = self.index_dir(index)?;
        if !index_exists(&index_dir) {
            self.forget(index);
            return Err(BackendError::IndexNotFound(index.to_string()));
        }
        let handle = self.handle(index, &index_dir)?;
        query::execute(&handle, query)
    }
}

fn index_exists(index_dir: &Path) -> bool {
    index_dir.join("meta.json").exists()
}

fn write_movies(
    index: &Index,
    fields: &MovieFields,
    movies: &[MovieRecord],
) -> Result<BulkWriteSummary, BackendError> {
    let mut writer = index.writer::<TantivyDocument>(WRITER_MEMORY_BUDGET)?;
    let mut summary = BulkWriteSummary::default();

    for movie in movies {
        match writer.add_document(movie_to_document(fields, movie)) {
            Ok(_) => summary.written += 1,
            Err(err) => {
                summary.failed += 1;
                warn!(imdb_id = %movie.imdb_id, error = %err, "index rejected movie");
            }
        }
    }

    writer.commit()?;
    writer.wait_merging_threads()?;
    Ok(summary)
}

pub fn movie_to_document(fields: &MovieFields, movie: &MovieRecord) -> TantivyDocument {
    let mut doc = TantivyDocument::default();
    doc.add_text(fields.imdb_id, &movie.imdb_id);
    doc.add_text(fields.title, &movie.title);
    doc.add_i64(fields.year, movie.year);
    doc
}
