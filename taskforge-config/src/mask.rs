//! Secret masking for persisted and displayed configuration.
//!
//! Sensitive fields (as declared by the schema) are replaced with a fixed
//! placeholder on every copy that leaves the process: files written to
//! disk and the masked accessor used by display commands. Masking always
//! operates on a clone; the live in-memory layers keep their real values.

use serde_json::Value;

use crate::schema::Schema;

/// The string written in place of a secret on disk and in masked output.
pub const PLACEHOLDER: &str = "********";

/// Returns a copy of `data` with every sensitive leaf replaced by
/// [`PLACEHOLDER`].
///
/// Only leaves that are actually present are touched; masking never
/// creates paths. Calling this twice yields identical output.
///
/// # Examples
///
/// ```
/// use taskforge_config::{mask::mask_sensitive, Schema, PLACEHOLDER};
/// use serde_json::json;
///
/// let schema = Schema::builtin();
/// let data = json!({"ai": {"apiKey": "sk-XYZ", "model": "m"}});
/// let masked = mask_sensitive(&data, &schema);
/// assert_eq!(masked["ai"]["apiKey"], PLACEHOLDER);
/// assert_eq!(masked["ai"]["model"], "m");
/// // The input is untouched
/// assert_eq!(data["ai"]["apiKey"], "sk-XYZ");
/// ```
#[must_use]
pub fn mask_sensitive(data: &Value, schema: &Schema) -> Value {
    let mut masked = data.clone();
    for path in schema.sensitive_paths() {
        if let Some(slot) = path.resolve_mut(&mut masked) {
            if !slot.is_null() {
                *slot = Value::String(PLACEHOLDER.to_string());
            }
        }
    }
    masked
}

/// Whether `data` holds at least one real (non-placeholder) secret.
///
/// Drives the permission warning: a world-readable file only matters when
/// it actually exposes something.
#[must_use]
pub fn has_real_secret(data: &Value, schema: &Schema) -> bool {
    schema.sensitive_paths().iter().any(|path| {
        path.resolve(data).is_some_and(|value| match value {
            Value::String(s) => !s.is_empty() && s != PLACEHOLDER,
            Value::Null => false,
            _ => true,
        })
    })
}
