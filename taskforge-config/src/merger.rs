//! Layer merging, precedence handling, and source attribution.
//!
//! This module builds the single effective configuration by deep-merging
//! the four layers in precedence order, and records which layer supplied
//! each effective leaf. Recursion is decided by the schema's section/leaf
//! tagging rather than by sniffing value shapes, so an array- or
//! object-valued leaf is always replaced as one unit.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::path::ConfigPath;
use crate::schema::{NodeKind, Schema};

/// One configuration source, ordered by precedence.
///
/// # Examples
///
/// ```
/// use taskforge_config::Layer;
///
/// assert!(Layer::Env.priority() > Layer::Local.priority());
/// assert_eq!(Layer::Global.to_string(), "GLOBAL");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Layer {
    /// Compiled-in defaults, generated from the schema. Never persisted.
    Default,
    /// The per-user file.
    Global,
    /// The per-project file.
    Local,
    /// The environment overlay. Recomputed every load, never persisted.
    Env,
}

impl Layer {
    /// Numeric precedence; higher values override lower ones.
    #[must_use]
    pub const fn priority(self) -> u8 {
        match self {
            Self::Default => 0,
            Self::Global => 1,
            Self::Local => 2,
            Self::Env => 3,
        }
    }

    /// Canonical layer name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Default => "DEFAULT",
            Self::Global => "GLOBAL",
            Self::Local => "LOCAL",
            Self::Env => "ENV",
        }
    }
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-path attribution of effective values to their originating layer.
///
/// Rebuilt from scratch on every load cycle. Attribution is monotonic: a
/// lower-precedence layer never overwrites a path already claimed by a
/// higher-precedence one.
pub type SourceMap = BTreeMap<ConfigPath, Layer>;

/// Deep-merges `overlay` onto `base`, returning a fresh value.
///
/// Where both sides hold a mapping at a position the schema does not tag
/// as a leaf, keys merge recursively; everywhere else the overlay value
/// replaces the base value outright (arrays are never merged
/// element-wise). Neither input is mutated.
///
/// # Examples
///
/// ```
/// use taskforge_config::{merger::deep_merge, Schema};
/// use serde_json::json;
///
/// let schema = Schema::builtin();
/// let base = json!({"general": {"defaultPriority": "low", "autoArchiveDays": 7}});
/// let overlay = json!({"general": {"autoArchiveDays": 14}});
/// let merged = deep_merge(&schema, &base, &overlay);
/// assert_eq!(
///     merged,
///     json!({"general": {"defaultPriority": "low", "autoArchiveDays": 14}})
/// );
/// ```
#[must_use]
pub fn deep_merge(schema: &Schema, base: &Value, overlay: &Value) -> Value {
    merge_at(schema, &ConfigPath::root(), base, overlay)
}

fn merge_at(schema: &Schema, path: &ConfigPath, base: &Value, overlay: &Value) -> Value {
    match (base.as_object(), overlay.as_object()) {
        (Some(base_map), Some(overlay_map))
            if schema.node_kind(path) != NodeKind::Leaf =>
        {
            let mut merged = base_map.clone();
            for (key, overlay_value) in overlay_map {
                let child = path.join(key);
                let value = match base_map.get(key) {
                    Some(base_value) => merge_at(schema, &child, base_value, overlay_value),
                    None => overlay_value.clone(),
                };
                merged.insert(key.clone(), value);
            }
            Value::Object(merged)
        }
        _ => overlay.clone(),
    }
}

/// Merges the loaded layers, lowest precedence first, and rebuilds the
/// source map in one pass.
///
/// Layers must be supplied in ascending precedence order; each layer's
/// leaf paths then claim attribution over anything recorded before them.
#[must_use]
pub fn merge_layers(schema: &Schema, layers: &[(Layer, &Value)]) -> (Value, SourceMap) {
    let mut merged = Value::Object(Map::new());
    let mut sources = SourceMap::new();
    for (layer, data) in layers {
        merged = deep_merge(schema, &merged, data);
        track_sources(schema, &mut sources, data, *layer);
    }
    (merged, sources)
}

/// Records `layer` as the source of every leaf path in `data`.
///
/// A path already claimed by a strictly higher-precedence layer is left
/// alone, keeping attribution monotonic however callers order their
/// updates.
pub fn track_sources(schema: &Schema, sources: &mut SourceMap, data: &Value, layer: Layer) {
    track_at(schema, sources, &ConfigPath::root(), data, layer);
}

fn track_at(
    schema: &Schema,
    sources: &mut SourceMap,
    path: &ConfigPath,
    value: &Value,
    layer: Layer,
) {
    match value.as_object() {
        Some(map) if schema.node_kind(path) != NodeKind::Leaf => {
            for (key, child_value) in map {
                let child = path.join(key);
                track_at(schema, sources, &child, child_value, layer);
            }
        }
        _ => {
            let claimed = sources
                .get(path)
                .is_some_and(|existing| existing.priority() > layer.priority());
            if !claimed {
                sources.insert(path.clone(), layer);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_disjoint_sections() {
        let schema = Schema::builtin();
        let base = json!({"general": {"defaultPriority": "low"}});
        let overlay = json!({"output": {"color": false}});
        let merged = deep_merge(&schema, &base, &overlay);
        assert_eq!(merged["general"]["defaultPriority"], "low");
        assert_eq!(merged["output"]["color"], false);
    }

    #[test]
    fn test_merge_overlapping_objects_keeps_siblings() {
        let schema = Schema::builtin();
        let base = json!({"x": {"p": 1, "q": 2}});
        let overlay = json!({"x": {"q": 3}});
        let merged = deep_merge(&schema, &base, &overlay);
        assert_eq!(merged, json!({"x": {"p": 1, "q": 3}}));
    }

    #[test]
    fn test_merge_never_mutates_inputs() {
        let schema = Schema::builtin();
        let base = json!({"x": {"p": 1, "q": 2}});
        let overlay = json!({"x": {"q": 3}});
        let base_before = base.clone();
        let overlay_before = overlay.clone();

        let _ = deep_merge(&schema, &base, &overlay);

        assert_eq!(base, base_before);
        assert_eq!(overlay, overlay_before);
    }

    #[test]
    fn test_merge_arrays_replaced_wholesale() {
        let schema = Schema::builtin();
        let base = json!({"general": {"defaultTags": ["a", "b", "c"]}});
        let overlay = json!({"general": {"defaultTags": ["d"]}});
        let merged = deep_merge(&schema, &base, &overlay);
        assert_eq!(merged["general"]["defaultTags"], json!(["d"]));
    }

    #[test]
    fn test_merge_missing_key_never_deletes() {
        let schema = Schema::builtin();
        let base = json!({"ai": {"model": "m", "temperature": 0.7}});
        let overlay = json!({"ai": {}});
        let merged = deep_merge(&schema, &base, &overlay);
        assert_eq!(merged["ai"]["model"], "m");
        assert_eq!(merged["ai"]["temperature"], 0.7);
    }

    #[test]
    fn test_merge_scalar_replaces_object_and_back() {
        let schema = Schema::builtin();
        // Unknown keys fall back to structural rules: non-object overlay
        // replaces whatever the base held.
        let merged = deep_merge(
            &schema,
            &json!({"extra": {"nested": true}}),
            &json!({"extra": 42}),
        );
        assert_eq!(merged["extra"], 42);

        let merged = deep_merge(
            &schema,
            &json!({"extra": 42}),
            &json!({"extra": {"nested": true}}),
        );
        assert_eq!(merged["extra"], json!({"nested": true}));
    }

    #[test]
    fn test_merge_layers_precedence_order() {
        let schema = Schema::builtin();
        let defaults = json!({"general": {"defaultPriority": "medium"}});
        let global = json!({"general": {"defaultPriority": "high"}});
        let local = json!({});
        let env = json!({});

        let (merged, sources) = merge_layers(
            &schema,
            &[
                (Layer::Default, &defaults),
                (Layer::Global, &global),
                (Layer::Local, &local),
                (Layer::Env, &env),
            ],
        );

        assert_eq!(merged["general"]["defaultPriority"], "high");
        assert_eq!(
            sources.get(&ConfigPath::parse("general.defaultPriority")),
            Some(&Layer::Global)
        );
    }

    #[test]
    fn test_track_sources_highest_layer_wins() {
        let schema = Schema::builtin();
        let mut sources = SourceMap::new();
        let path = ConfigPath::parse("output.color");

        track_sources(&schema, &mut sources, &json!({"output": {"color": true}}), Layer::Default);
        track_sources(&schema, &mut sources, &json!({"output": {"color": false}}), Layer::Env);
        assert_eq!(sources.get(&path), Some(&Layer::Env));

        // A later lower-precedence claim must not demote the attribution
        track_sources(&schema, &mut sources, &json!({"output": {"color": true}}), Layer::Global);
        assert_eq!(sources.get(&path), Some(&Layer::Env));
    }

    #[test]
    fn test_track_sources_array_leaf_is_one_claim() {
        let schema = Schema::builtin();
        let mut sources = SourceMap::new();
        track_sources(
            &schema,
            &mut sources,
            &json!({"general": {"defaultTags": ["a", "b"]}}),
            Layer::Local,
        );
        assert_eq!(
            sources.get(&ConfigPath::parse("general.defaultTags")),
            Some(&Layer::Local)
        );
        assert_eq!(sources.len(), 1);
    }

    #[test]
    fn test_track_sources_empty_object_claims_nothing() {
        let schema = Schema::builtin();
        let mut sources = SourceMap::new();
        track_sources(&schema, &mut sources, &json!({"aliases": {}}), Layer::Global);
        assert!(sources.is_empty());
    }
}
