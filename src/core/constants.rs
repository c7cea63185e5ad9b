/// Shared constants used across the application

/// Default configuration file path (created with defaults when missing)
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Maximum accepted request body for the analyze endpoint (5MB)
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Accepted data URL prefixes for uploaded frames
pub const DATA_URL_PREFIXES: &[&str] = &[
    "data:image/x-portable-graymap;base64,",
    "data:application/octet-stream;base64,",
];

/// Length in bytes of generated CSRF tokens
pub const CSRF_TOKEN_LENGTH: usize = 32;

/// Length in bytes of generated CSP nonces
pub const CSP_NONCE_LENGTH: usize = 32;
