pub mod health;
pub mod tasks;
pub mod users;

use axum::http::{header, HeaderMap};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::errors::ApiError;

/// Extracts the caller's last-observed version token from `If-Match`.
///
/// The header is required on every write; a missing or undecodable value is
/// a validation failure, a stale value surfaces later as a conflict.
pub(crate) fn expected_version(headers: &HeaderMap) -> Result<Vec<u8>, ApiError> {
    let raw = headers
        .get(header::IF_MATCH)
        .ok_or_else(|| ApiError::validation("missing If-Match header"))?
        .to_str()
        .map_err(|_| ApiError::validation("malformed If-Match header"))?;

    let token = raw.trim().trim_matches('"');
    if token.is_empty() {
        return Err(ApiError::validation("malformed If-Match header"));
    }
    BASE64
        .decode(token)
        .map_err(|_| ApiError::validation("If-Match header is not base64"))
}
