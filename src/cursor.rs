//! Opaque page cursors.
//!
//! A cursor is the store's continuation query serialized as JSON and then
//! base64url-encoded (no padding). The core never looks inside it beyond
//! "decode, validate, re-encode": whatever the store handed back is what the
//! next request resumes with.
//!
//! Decoding never panics. Anything that is not base64url of a JSON
//! [`ListQuery`] is a [`CursorError`].

use crate::store::ListQuery;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CursorError {
    #[error("cursor is not base64url: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("cursor is not a continuation query: {0}")]
    Json(#[from] serde_json::Error),
}

/// Encode a continuation query as a cursor token.
pub fn encode(query: &ListQuery) -> String {
    // Serializing a struct of strings and integers cannot fail.
    let json = serde_json::to_vec(query).unwrap_or_default();
    URL_SAFE_NO_PAD.encode(json)
}

/// Decode a cursor token back into the continuation query it was made from.
pub fn decode(token: &str) -> Result<ListQuery, CursorError> {
    let bytes = URL_SAFE_NO_PAD.decode(token.trim_end_matches('='))?;
    Ok(serde_json::from_slice(&bytes)?)
}
