use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const MAX_PAGE_SIZE: usize = 100;

/// A movie as stored in, and returned from, the search index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieRecord {
    pub imdb_id: String,
    pub title: String,
    pub year: i64,
}

/// Filters and pagination for a movie search.
///
/// `title` is matched as a phrase, `year` exactly. Absent filters match
/// everything. Pagination defaults to the first [`DEFAULT_PAGE_SIZE`] hits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovieQuery {
    pub title: Option<String>,
    pub year: Option<i64>,
    pub from_item: usize,
    pub size: usize,
}

impl Default for MovieQuery {
    fn default() -> Self {
        Self {
            title: None,
            year: None,
            from_item: 0,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl MovieQuery {
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_year(mut self, year: i64) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_page(mut self, from_item: usize, size: usize) -> Self {
        self.from_item = from_item;
        self.size = size.min(MAX_PAGE_SIZE);
        self
    }

    /// Title filter with surrounding whitespace removed; blank titles count as absent.
    pub fn title_filter(&self) -> Option<&str> {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|title| !title.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieSearchResult {
    pub movies: Vec<MovieRecord>,
    pub total: usize,
}

/// Outcome of a full index rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMoviesResult {
    pub indexed_movies_count: usize,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub failed_movies_count: usize,
}

fn is_zero(value: &usize) -> bool {
    *value == 0
}
