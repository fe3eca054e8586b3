use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Serialize;
use serde_json::json;

use crate::search::ApiStatus;

/// Characters that encodeURIComponent does NOT encode.
/// RFC 3986 unreserved: A-Z a-z 0-9 - _ . ! ~ * ' ( )
const ENCODE_URI_COMPONENT_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Recovery link returned with every not-found response: a Google Jobs
/// deep link (`ibp=htl;jobs`) built from whatever the caller was searching
/// for, so an empty result set is never a dead end.
#[derive(Debug, Clone, Serialize)]
pub struct GoogleFallback {
    pub message: String,
    pub url: String,
}

impl GoogleFallback {
    fn jobs_url(q: &str) -> String {
        format!(
            "https://www.google.com/search?q={}&ibp=htl;jobs",
            utf8_percent_encode(q, ENCODE_URI_COMPONENT_SET)
        )
    }

    /// Fallback for a search that matched nothing anywhere.
    pub fn for_search(query: &str, location: &str) -> Self {
        Self {
            message: "No jobs found in our database. Search on Google instead?".to_string(),
            url: Self::jobs_url(&format!("{query} jobs {location}")),
        }
    }

    /// Fallback for a job id that no store or provider recognizes.
    pub fn for_job(job_id: &str) -> Self {
        Self {
            message: "Job details not available. Search for similar jobs on Google?".to_string(),
            url: Self::jobs_url(&format!("job {job_id}")),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("{message}")]
    NoResults {
        message: String,
        fallback: GoogleFallback,
    },

    #[error("Search failed: {message}")]
    SearchFailed {
        message: String,
        api_status: Vec<ApiStatus>,
    },

    #[error("Internal error: {0}")]
    #[allow(dead_code)]
    Internal(String),
}

impl AppError {
    pub fn no_results(message: impl Into<String>, fallback: GoogleFallback) -> Self {
        AppError::NoResults {
            message: message.into(),
            fallback,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    axum::Json(json!({
                        "success": false,
                        "error": "Internal server error",
                        "debug": {
                            "troubleshooting": "Check database connectivity and server logs",
                        },
                    })),
                )
                    .into_response()
            }
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                axum::Json(json!({ "success": false, "error": msg })),
            )
                .into_response(),
            AppError::NoResults { message, fallback } => (
                StatusCode::NOT_FOUND,
                axum::Json(json!({
                    "success": false,
                    "error": message,
                    "googleFallback": fallback,
                })),
            )
                .into_response(),
            AppError::SearchFailed {
                message,
                api_status,
            } => {
                tracing::error!("Search failed: {message}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    axum::Json(json!({
                        "success": false,
                        "error": "Failed to fetch jobs",
                        "debug": {
                            "troubleshooting": "Check provider credentials and network connectivity",
                            "apiStatus": api_status,
                        },
                    })),
                )
                    .into_response()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    axum::Json(json!({
                        "success": false,
                        "error": "Internal server error",
                        "debug": {
                            "troubleshooting": "Check server logs for details",
                        },
                    })),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_url_uses_encode_uri_component_rules() {
        let fb = GoogleFallback::for_search("rust developer", "New Delhi");
        assert_eq!(
            fb.url,
            "https://www.google.com/search?q=rust%20developer%20jobs%20New%20Delhi&ibp=htl;jobs"
        );
    }

    #[test]
    fn fallback_url_keeps_unreserved_characters() {
        let fb = GoogleFallback::for_search("c++ (senior)", "UK");
        assert!(fb.url.contains("c%2B%2B%20(senior)%20jobs%20UK"));
    }

    #[test]
    fn job_fallback_embeds_the_id() {
        let fb = GoogleFallback::for_job("ext-jsearch-abc123");
        assert!(fb.url.contains("job%20ext-jsearch-abc123"));
        assert_eq!(
            fb.message,
            "Job details not available. Search for similar jobs on Google?"
        );
    }
}
