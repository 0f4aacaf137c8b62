//! # Cursor Utilities
//!
//! Opaque pagination cursors for entity listings. A cursor is the base64 of a
//! small JSON object holding the sort key `(name, id)` of the last row served.

use axum::http::StatusCode;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::error::ApiError;

const MAX_CURSOR_LEN: usize = 1000;
const MAX_DECODED_LEN: usize = 700;

/// Position after which the next page starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorData {
    pub name: String,
    pub id: Uuid,
}

fn invalid(message: &str) -> ApiError {
    ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", message)
}

/// Encode cursor data as an opaque base64 string
pub fn encode_cursor(name: &str, id: &Uuid) -> String {
    let json = json!({ "name": name, "id": id }).to_string();
    base64::engine::general_purpose::STANDARD.encode(json.as_bytes())
}

/// Decode cursor data from an opaque base64 string with validation
pub fn decode_cursor(cursor: &str) -> Result<CursorData, ApiError> {
    if cursor.is_empty() {
        return Err(invalid("cursor cannot be empty"));
    }

    if cursor.len() > MAX_CURSOR_LEN {
        return Err(invalid("cursor is too long"));
    }

    if !cursor
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '=')
    {
        return Err(invalid("cursor contains invalid characters"));
    }

    let decoded = base64::engine::general_purpose::STANDARD
        .decode(cursor)
        .map_err(|_| invalid("cursor is not valid base64"))?;

    if decoded.is_empty() || decoded.len() > MAX_DECODED_LEN {
        return Err(invalid("cursor has an invalid size"));
    }

    let cursor_data: CursorData = serde_json::from_slice(&decoded)
        .map_err(|_| invalid("cursor contains invalid JSON structure"))?;

    if cursor_data.id.is_nil() {
        return Err(invalid("cursor contains invalid ID"));
    }

    Ok(cursor_data)
}
