use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};

use crate::service::MovieService;

use super::handlers::{health, index_movies, search_movies};

#[derive(Clone)]
pub struct AppState {
    pub(crate) service: Arc<MovieService>,
}

impl AppState {
    pub fn new(service: MovieService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/index_movies", post(index_movies))
        .route("/api/movies", get(search_movies))
        .with_state(state)
}
