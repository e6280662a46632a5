use axum::Json;
use axum::extract::{Query as AxumQuery, State};
use tracing::{debug, instrument};

use crate::movies::{IndexMoviesResult, MovieQuery};

use super::state::AppState;
use super::types::{ApiError, HealthResponse, MovieSearchParams, MoviesResponse};

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".to_string(),
    })
}

#[instrument(skip_all)]
pub async fn index_movies(
    State(state): State<AppState>,
) -> Result<Json<IndexMoviesResult>, ApiError> {
    let result = state.service.rebuild_index().await?;
    Ok(Json(result))
}

#[instrument(skip_all)]
pub async fn search_movies(
    State(state): State<AppState>,
    AxumQuery(params): AxumQuery<MovieSearchParams>,
) -> Result<Json<MoviesResponse>, ApiError> {
    let query = MovieQuery::from(params);
    debug!(
        title = ?query.title_filter(),
        year = ?query.year,
        from_item = query.from_item,
        size = query.size,
        "searching movies"
    );

    let result = state.service.search(query).await?;
    Ok(Json(MoviesResponse {
        movies: result.movies,
        total: result.total,
    }))
}
