/// Analyze endpoint
///
/// Accepts a base64 data URL of a grayscale frame, dispatches the
/// analysis through the worker pool, and memoizes results in the cache
/// keyed by a fingerprint of the frame bytes, so identical uploads skip
/// recomputation for the configured TTL.
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::post;
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;

use crate::analyzer::{AnalysisResult, FaceRegion};
use crate::core::constants::DATA_URL_PREFIXES;
use crate::logger::{self, LogTag};
use crate::webserver::state::AppState;
use crate::webserver::utils::{core_error_response, error_response, success_response};
use crate::worker::Task;

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub image: String,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub emotion: &'static str,
    pub confidence: f64,
    pub faces: Vec<FaceRegion>,
}

impl From<AnalysisResult> for AnalyzeResponse {
    fn from(result: AnalysisResult) -> Self {
        Self {
            emotion: result.primary_emotion.as_str(),
            confidence: result.confidence,
            faces: result.faces,
        }
    }
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/analyze", post(analyze))
}

/// POST /api/analyze
async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnalyzeRequest>,
) -> Response {
    let encoded = match strip_data_url(&request.image) {
        Some(encoded) => encoded,
        None => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "INVALID_IMAGE",
                "invalid image data format",
                Some("expected a base64 data URL of a binary PGM frame"),
            )
        }
    };

    let bytes = match BASE64.decode(encoded) {
        Ok(bytes) => bytes,
        Err(_) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "INVALID_IMAGE",
                "invalid image data",
                None,
            )
        }
    };

    if bytes.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "INVALID_IMAGE",
            "empty image data",
            None,
        );
    }
    if bytes.len() as u64 > state.config.image.max_size {
        return error_response(
            StatusCode::BAD_REQUEST,
            "REQUEST_TOO_LARGE",
            "image size exceeds limit",
            None,
        );
    }

    let key = fingerprint(&bytes);
    let ttl = state.config.cache.result_ttl();

    let pool = Arc::clone(&state.pool);
    let analyzer = Arc::clone(&state.analyzer);
    let result = state
        .cache
        .get_or_compute(
            &key,
            move || async move {
                let ctx = CancellationToken::new();
                pool.submit(
                    &ctx,
                    Task::new(move |_signal| async move { analyzer.analyze(&bytes) }),
                )
                .await
            },
            ttl,
        )
        .await;

    match result {
        Ok(analysis) => {
            logger::debug(
                LogTag::Analyzer,
                &format!(
                    "Analysis complete: {} ({} faces, confidence {:.2})",
                    analysis.primary_emotion.as_str(),
                    analysis.faces.len(),
                    analysis.confidence
                ),
            );
            success_response(AnalyzeResponse::from(analysis))
        }
        Err(err) => {
            logger::warning(LogTag::Analyzer, &format!("Analysis failed: {}", err));
            core_error_response(&err)
        }
    }
}

fn strip_data_url(image: &str) -> Option<&str> {
    DATA_URL_PREFIXES
        .iter()
        .find_map(|prefix| image.strip_prefix(prefix))
}

/// Cache key derived from the frame bytes
fn fingerprint(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    format!("analyze:{}", URL_SAFE_NO_PAD.encode(digest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_url_prefix_is_required() {
        assert!(strip_data_url("data:image/x-portable-graymap;base64,UDU=").is_some());
        assert!(strip_data_url("data:application/octet-stream;base64,UDU=").is_some());
        assert!(strip_data_url("UDU=").is_none());
        assert!(strip_data_url("data:image/png;base64,UDU=").is_none());
    }

    #[test]
    fn fingerprint_is_stable_and_distinct() {
        assert_eq!(fingerprint(b"frame"), fingerprint(b"frame"));
        assert_ne!(fingerprint(b"frame"), fingerprint(b"other"));
    }
}
