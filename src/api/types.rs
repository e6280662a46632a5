use axum::{Json, http::StatusCode};
use serde::{Deserialize, Serialize};

use crate::movies::{DEFAULT_PAGE_SIZE, MovieQuery, MovieRecord};
use crate::service::ServiceError;

use super::utils::deserialize_blank_as_none;

#[derive(Debug, Deserialize)]
pub struct MovieSearchParams {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "deserialize_blank_as_none")]
    pub year: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_blank_as_none")]
    pub from_item: Option<usize>,
    #[serde(default, deserialize_with = "deserialize_blank_as_none")]
    pub size: Option<usize>,
}

impl From<MovieSearchParams> for MovieQuery {
    fn from(params: MovieSearchParams) -> Self {
        MovieQuery {
            title: params.title,
            year: params.year,
            ..MovieQuery::default()
        }
        .with_page(
            params.from_item.unwrap_or(0),
            params.size.unwrap_or(DEFAULT_PAGE_SIZE),
        )
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MoviesResponse {
    pub movies: Vec<MovieRecord>,
    pub total: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub detail: Option<anyhow::Error>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            detail: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
            detail: None,
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: message.into(),
            detail: None,
        }
    }

    pub fn bad_gateway(err: anyhow::Error) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: "failed to fetch the movie catalog".to_string(),
            detail: Some(err),
        }
    }

    pub fn internal(err: anyhow::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "internal server error".to_string(),
            detail: Some(err),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        if let Some(detail) = &self.detail {
            tracing::error!(status = %self.status, error = %detail);
        }
        let body = Json(ErrorBody {
            message: self.message,
        });
        (self.status, body).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(value: ServiceError) -> Self {
        match value {
            ServiceError::BackendUnreachable(reason) => {
                tracing::warn!(%reason, "search backend connectivity check failed");
                ApiError::bad_request("failed to connect to the search backend")
            }
            ServiceError::IndexNotReady(_) => ApiError::not_found("the movies weren't loaded yet"),
            ServiceError::RebuildInProgress => {
                ApiError::conflict("movies are already being indexed")
            }
            err @ ServiceError::UpstreamFetch(_) => ApiError::bad_gateway(err.into()),
            err => ApiError::internal(err.into()),
        }
    }
}
