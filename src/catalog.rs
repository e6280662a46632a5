use std::time::Duration;

use futures_util::{StreamExt, TryStreamExt, stream};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::movies::MovieRecord;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("building catalog http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("requesting {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("decoding catalog response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("movie {imdb_id} has a non-numeric year {year}")]
    InvalidYear { imdb_id: String, year: String },
    #[error("malformed catalog record: {0}")]
    Malformed(String),
}

/// A movie exactly as the catalog serves it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawMovie {
    #[serde(rename = "imdbID", alias = "ImdbID")]
    pub imdb_id: String,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Year")]
    pub year: RawYear,
}

/// The catalog has served years both as numbers and as strings; anything
/// else is kept so the record can be rejected on its own.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawYear {
    Number(i64),
    Text(String),
    Other(serde_json::Value),
}

impl RawYear {
    fn as_year(&self) -> Option<i64> {
        match self {
            RawYear::Number(year) => Some(*year),
            RawYear::Text(text) => text.trim().parse().ok(),
            RawYear::Other(serde_json::Value::Number(number)) => number
                .as_f64()
                .filter(|year| year.fract() == 0.0 && year.abs() < i64::MAX as f64)
                .map(|year| year as i64),
            RawYear::Other(_) => None,
        }
    }
}

impl RawMovie {
    /// Decodes one element of a page's `data` array.
    pub fn from_value(value: serde_json::Value) -> Result<Self, RecordError> {
        serde_json::from_value(value).map_err(|err| RecordError::Malformed(err.to_string()))
    }

    pub fn normalize(self) -> Result<MovieRecord, RecordError> {
        let Some(year) = self.year.as_year() else {
            let year = match self.year {
                RawYear::Text(text) => text,
                RawYear::Other(value) => value.to_string(),
                RawYear::Number(year) => year.to_string(),
            };
            return Err(RecordError::InvalidYear {
                imdb_id: self.imdb_id,
                year,
            });
        };
        Ok(MovieRecord {
            imdb_id: self.imdb_id,
            title: self.title,
            year,
        })
    }
}

#[derive(Debug, Deserialize)]
struct CatalogSummary {
    #[serde(default)]
    total_pages: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct CatalogPage {
    #[serde(default)]
    data: Option<Vec<serde_json::Value>>,
}

/// Every normalized movie from one full pass over the catalog.
#[derive(Debug, Default)]
pub struct FetchedCatalog {
    pub movies: Vec<MovieRecord>,
    pub pages: u32,
    pub rejected: usize,
}

/// HTTP client for the paginated remote movie catalog.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: String,
    concurrency: usize,
}

impl CatalogClient {
    pub fn new(
        base_url: impl Into<String>,
        concurrency: usize,
        timeout: Duration,
    ) -> Result<Self, CatalogError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(CatalogError::Client)?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            concurrency: concurrency.max(1),
        })
    }

    /// Reads `total_pages` from the catalog root. A missing count means no pages.
    pub async fn fetch_total_pages(&self) -> Result<u32, CatalogError> {
        let summary: CatalogSummary = self.get_json(None).await?;
        Ok(summary.total_pages.unwrap_or(0))
    }

    /// Fetches one 1-based page and returns its `data` array untouched, or
    /// nothing if absent. Records are decoded one by one by the caller.
    pub async fn fetch_page(&self, page: u32) -> Result<Vec<serde_json::Value>, CatalogError> {
        let page: CatalogPage = self.get_json(Some(page)).await?;
        Ok(page.data.unwrap_or_default())
    }

    /// Fetches every page with bounded concurrency and normalizes the records.
    ///
    /// The first failing page aborts the whole pass; dropping the stream cancels
    /// whatever requests are still in flight. Record order follows page
    /// completion order and is not stable between runs.
    pub async fn fetch_all_pages(&self) -> Result<FetchedCatalog, CatalogError> {
        let total_pages = self.fetch_total_pages().await?;
        info!(
            total_pages,
            concurrency = self.concurrency,
            url = %self.base_url,
            "fetching movie catalog"
        );

        let mut fetched = FetchedCatalog::default();
        let mut pages = stream::iter(1..=total_pages)
            .map(|page| async move { self.fetch_page(page).await.map(|movies| (page, movies)) })
            .buffer_unordered(self.concurrency);

        while let Some((page, raw_movies)) = pages.try_next().await? {
            fetched.pages += 1;
            if raw_movies.is_empty() {
                debug!(page, "catalog page is empty");
                continue;
            }
            for raw in raw_movies {
                match RawMovie::from_value(raw).and_then(RawMovie::normalize) {
                    Ok(movie) => fetched.movies.push(movie),
                    Err(err) => {
                        fetched.rejected += 1;
                        warn!(page, error = %err, "skipping catalog record");
                    }
                }
            }
        }

        Ok(fetched)
    }

    async fn get_json<T>(&self, page: Option<u32>) -> Result<T, CatalogError>
    where
        T: serde::de::DeserializeOwned,
    {
        let url = match page {
            Some(page) => format!("{}?page={}", self.base_url, page),
            None => self.base_url.clone(),
        };

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|source| CatalogError::Request {
                url: url.clone(),
                source,
            })?;

        response
            .json()
            .await
            .map_err(|source| CatalogError::Decode { url, source })
    }
}
