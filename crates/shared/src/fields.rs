//! Normalization for store-shaped record fields.
//!
//! The backing store is inconsistent about scalars: the same field may arrive
//! as `"L123"` on one record and `["L123"]` on the next, and values sometimes
//! carry padding whitespace. Every read of a platform-id-shaped field goes
//! through [`normalize_key`] so the quirk lives in exactly one place.

use serde_json::Value;

/// Normalize a raw field value to a comparable key.
///
/// Arrays take their first element (recursively, so `[["x"]]` still resolves)
/// and strings are trimmed. Anything else, including blank strings, numbers,
/// and null, normalizes to `None`.
pub fn normalize_key(raw: &Value) -> Option<String> {
    match raw {
        Value::Array(items) => items.first().and_then(normalize_key),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        _ => None,
    }
}

// =============================================================================
// Tests
// =============================================================================
