use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};

/// Name of the index holding the movie catalog.
pub const MOVIES_INDEX_NAME: &str = "movies";

/// Remote catalog serving `{total_pages}` and `?page=N` pages of movies.
pub const DEFAULT_CATALOG_URL: &str = "https://jsonmock.hackerrank.com/api/moviesdata/search/";

pub const DEFAULT_FETCH_CONCURRENCY: usize = 10;

/// Application configuration driven by environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub index_dir: PathBuf,
    pub bind_addr: SocketAddr,
    pub catalog_url: String,
    pub index_name: String,
    pub fetch_concurrency: usize,
    pub fetch_timeout: Duration,
    pub backend_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let index_dir = env::var("CINEMA_INDEX_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data/index"));

        let bind_addr: SocketAddr = env::var("CINEMA_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse()
            .context("parsing CINEMA_BIND_ADDR")?;

        let catalog_url =
            env::var("CINEMA_CATALOG_URL").unwrap_or_else(|_| DEFAULT_CATALOG_URL.to_string());

        let fetch_concurrency = parse_env("CINEMA_FETCH_CONCURRENCY", DEFAULT_FETCH_CONCURRENCY)?;
        if fetch_concurrency == 0 {
            bail!("CINEMA_FETCH_CONCURRENCY must be at least 1");
        }

        let fetch_timeout = Duration::from_secs(parse_env("CINEMA_FETCH_TIMEOUT_SECS", 10)?);
        let backend_timeout = Duration::from_secs(parse_env("CINEMA_BACKEND_TIMEOUT_SECS", 5)?);

        Ok(Self {
            index_dir,
            bind_addr,
            catalog_url,
            index_name: MOVIES_INDEX_NAME.to_string(),
            fetch_concurrency,
            fetch_timeout,
            backend_timeout,
        })
    }
}

fn parse_env<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("parsing {key}={raw}")),
        Err(_) => Ok(default),
    }
}
