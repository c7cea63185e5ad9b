/// Webserver middleware
///
/// Security gate applied to every request: rate limiting, CSRF token
/// validation for mutating methods, and response security headers with
/// a per-request CSP nonce. CORS is handled by the `CorsLayer` the
/// server installs from configuration.
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use parking_lot::Mutex;
use rand::RngCore;
use subtle::ConstantTimeEq;

use crate::core::constants::{CSP_NONCE_LENGTH, CSRF_TOKEN_LENGTH};
use crate::logger::{self, LogTag};
use crate::webserver::state::AppState;
use crate::webserver::utils::error_response;

/// Request header carrying the client's CSRF token
pub const CSRF_TOKEN_HEADER: &str = "x-csrf-token";

/// Header carrying the token the client was handed
pub const EXPECTED_CSRF_TOKEN_HEADER: &str = "x-expected-csrf-token";

/// Per-request CSP nonce, stored in request extensions for handlers
/// that render inline scripts.
#[derive(Debug, Clone)]
pub struct CspNonce(pub String);

/// Token-bucket rate limiter
///
/// Refills continuously at the configured per-minute rate up to the
/// burst capacity.
pub struct RateLimiter {
    bucket: Mutex<Bucket>,
    rate_per_sec: f64,
    burst: f64,
}

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl RateLimiter {
    pub fn new(requests_per_minute: u32, burst: u32) -> Self {
        let burst = burst.max(1) as f64;
        Self {
            bucket: Mutex::new(Bucket {
                tokens: burst,
                last_refill: Instant::now(),
            }),
            rate_per_sec: requests_per_minute as f64 / 60.0,
            burst,
        }
    }

    /// Take one token if available
    pub fn allow(&self) -> bool {
        let mut bucket = self.bucket.lock();

        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.rate_per_sec).min(self.burst);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Generate a random base64 token of `length` raw bytes
pub fn generate_token(length: usize) -> String {
    let mut bytes = vec![0u8; length];
    rand::thread_rng().fill_bytes(&mut bytes);
    BASE64.encode(bytes)
}

/// Security gate applied to every request
pub async fn security_gate(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    // Rate limit before any work happens
    if !state.rate_limiter.allow() {
        logger::warning(
            LogTag::Security,
            &format!("Rate limit exceeded for {}", request.uri().path()),
        );
        return error_response(
            StatusCode::TOO_MANY_REQUESTS,
            "RATE_LIMIT_EXCEEDED",
            "Too many requests",
            None,
        );
    }

    // CSRF token pair validation for mutating methods
    if let Err(message) = validate_csrf(&request) {
        logger::warning(
            LogTag::Security,
            &format!("CSRF validation failed for {}: {}", request.uri().path(), message),
        );
        return error_response(StatusCode::FORBIDDEN, "CSRF_ERROR", message, None);
    }

    let nonce = generate_token(CSP_NONCE_LENGTH);
    request.extensions_mut().insert(CspNonce(nonce.clone()));

    logger::debug(
        LogTag::Webserver,
        &format!("{} {}", request.method(), request.uri().path()),
    );

    let mut response = next.run(request).await;
    apply_security_headers(&mut response, &nonce);
    response
}

fn validate_csrf(request: &Request<Body>) -> Result<(), &'static str> {
    // Safe methods skip validation
    if matches!(
        *request.method(),
        Method::GET | Method::HEAD | Method::OPTIONS
    ) {
        return Ok(());
    }

    let token = request
        .headers()
        .get(CSRF_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok());
    let expected = request
        .headers()
        .get(EXPECTED_CSRF_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok());

    match (token, expected) {
        (Some(token), Some(expected)) if !token.is_empty() && !expected.is_empty() => {
            if token.as_bytes().ct_eq(expected.as_bytes()).into() {
                Ok(())
            } else {
                Err("CSRF token mismatch")
            }
        }
        _ => Err("missing CSRF token"),
    }
}

fn apply_security_headers(response: &mut Response, nonce: &str) {
    let headers = response.headers_mut();

    headers.insert("X-Content-Type-Options", HeaderValue::from_static("nosniff"));
    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));
    headers.insert(
        "Referrer-Policy",
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        "Strict-Transport-Security",
        HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );

    let csp = format!(
        "default-src 'self'; script-src 'self' 'nonce-{nonce}'; \
         style-src 'self' 'nonce-{nonce}'; img-src 'self' data: blob:; \
         connect-src 'self'; frame-ancestors 'none'; form-action 'self'; \
         base-uri 'self'; object-src 'none'"
    );
    if let Ok(value) = HeaderValue::from_str(&csp) {
        headers.insert("Content-Security-Policy", value);
    }

    // A fresh token per response, echoed back by the demo client
    if let Ok(value) = HeaderValue::from_str(&generate_token(CSRF_TOKEN_LENGTH)) {
        headers.insert("X-Expected-CSRF-Token", value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_is_honored_then_exhausted() {
        let limiter = RateLimiter::new(60, 3);

        assert!(limiter.allow());
        assert!(limiter.allow());
        assert!(limiter.allow());
        assert!(!limiter.allow());
    }

    #[test]
    fn tokens_refill_over_time() {
        // 6000 per minute = 100 per second
        let limiter = RateLimiter::new(6000, 1);

        assert!(limiter.allow());
        assert!(!limiter.allow());

        std::thread::sleep(std::time::Duration::from_millis(50));
        assert!(limiter.allow());
    }

    #[test]
    fn generated_tokens_differ() {
        assert_ne!(generate_token(32), generate_token(32));
    }
}
