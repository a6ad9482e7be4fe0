//! Environment variable overlay for configuration overrides.
//!
//! Variables named `TASKFORGE_<SECTION>_<PROPERTY>` form the
//! highest-precedence configuration layer. The section token is
//! lower-cased; the remaining tokens are joined into one camelCase
//! property name. Values are JSON-decoded when possible, otherwise kept
//! as raw strings, so `TASKFORGE_OUTPUT_COLOR=false` yields a boolean
//! while `TASKFORGE_AI_MODEL=claude-sonnet-4-5` yields a string.
//!
//! The name transform is knowingly lossy: a multi-word section name or an
//! acronym inside a camelCase property cannot be distinguished from a
//! word boundary. This is part of the wire contract of existing variable
//! names and is preserved as-is.

use std::env;

use serde_json::{Map, Value};

use crate::path::ConfigPath;

/// Prefix carried by every configuration environment variable.
pub const ENV_PREFIX: &str = "TASKFORGE_";

/// Variables that carry the prefix but are not configuration fields.
///
/// `TASKFORGE_CONFIG_DIR` steers path resolution and `TASKFORGE_LOG`
/// steers logging; folding either into the overlay would manufacture an
/// unknown section and fail every load.
const RESERVED: [&str; 2] = ["CONFIG_DIR", "LOG"];

/// Builds the ENV layer from process environment variables.
pub struct EnvOverlay;

impl EnvOverlay {
    /// Scans the process environment and builds a fresh overlay object.
    ///
    /// Recomputed on every load; never persisted.
    #[must_use]
    pub fn load() -> Value {
        Self::from_vars(env::vars())
    }

    /// Builds an overlay from an explicit variable iterator.
    pub(crate) fn from_vars(vars: impl Iterator<Item = (String, String)>) -> Value {
        let mut root = Value::Object(Map::new());
        for (key, raw) in vars {
            let Some(rest) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            if RESERVED.contains(&rest) {
                continue;
            }
            let Some(path) = parse_name(rest) else {
                continue;
            };
            path.set_in(&mut root, decode_value(&raw));
        }
        root
    }

    /// The exported environment variable name for a configuration path.
    ///
    /// Each path segment gets an underscore inserted at every
    /// lower-to-upper letter transition and is upper-cased; segments are
    /// joined with underscores behind the prefix.
    ///
    /// Not a true inverse of the overlay parser for multi-word section
    /// names; see the module docs.
    ///
    /// # Examples
    ///
    /// ```
    /// use taskforge_config::{ConfigPath, EnvOverlay};
    ///
    /// let path = ConfigPath::parse("general.defaultPriority");
    /// assert_eq!(
    ///     EnvOverlay::env_name(&path),
    ///     "TASKFORGE_GENERAL_DEFAULT_PRIORITY"
    /// );
    /// ```
    #[must_use]
    pub fn env_name(path: &ConfigPath) -> String {
        let mut name = String::from(ENV_PREFIX);
        for (i, segment) in path.segments().iter().enumerate() {
            if i > 0 {
                name.push('_');
            }
            let mut prev_lower = false;
            for ch in segment.chars() {
                if prev_lower && ch.is_uppercase() {
                    name.push('_');
                }
                prev_lower = ch.is_lowercase();
                name.extend(ch.to_uppercase());
            }
        }
        name
    }
}

/// Parses `SECTION_WORD_WORD` into a `section.wordWord` path.
///
/// Names with fewer than two tokens address nothing and are skipped.
fn parse_name(rest: &str) -> Option<ConfigPath> {
    let mut tokens = rest.split('_').filter(|t| !t.is_empty());
    let section = tokens.next()?.to_lowercase();
    let property_tokens: Vec<&str> = tokens.collect();
    if property_tokens.is_empty() {
        return None;
    }
    let mut property = String::new();
    for (i, token) in property_tokens.iter().enumerate() {
        let lowered = token.to_lowercase();
        if i == 0 {
            property.push_str(&lowered);
        } else {
            let mut chars = lowered.chars();
            if let Some(first) = chars.next() {
                property.extend(first.to_uppercase());
                property.push_str(chars.as_str());
            }
        }
    }
    Some(ConfigPath::root().join(&section).join(&property))
}

/// JSON-decodes a variable value, falling back to the raw string.
fn decode_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
