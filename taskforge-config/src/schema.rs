//! Configuration schema definitions.
//!
//! This module declares every configuration field taskforge understands:
//! its type, default, allowed values, pattern, numeric range, and whether
//! it holds a secret. The same declaration drives default generation,
//! merge recursion, validation, and masking — there is no second source
//! of truth anywhere in the crate.

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};

use crate::path::ConfigPath;

/// The primitive type a schema field accepts.
///
/// `Integer` is distinct from `Number`: it only accepts whole-number
/// values, while `Number` accepts any finite number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// A UTF-8 string.
    String,
    /// Any number, integral or fractional.
    Number,
    /// A whole number.
    Integer,
    /// A boolean.
    Boolean,
    /// A nested mapping treated as one opaque value.
    Object,
    /// An array treated as one opaque value.
    Array,
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Number => write!(f, "number"),
            Self::Integer => write!(f, "integer"),
            Self::Boolean => write!(f, "boolean"),
            Self::Object => write!(f, "object"),
            Self::Array => write!(f, "array"),
        }
    }
}

/// Declaration of a single configuration field.
///
/// # Examples
///
/// ```
/// use taskforge_config::{FieldSpec, FieldType};
///
/// let spec = FieldSpec::new(FieldType::Integer)
///     .with_default(serde_json::json!(30))
///     .with_range(1.0, 365.0);
/// assert_eq!(spec.kind, FieldType::Integer);
/// assert!(!spec.sensitive);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    /// Accepted value type.
    pub kind: FieldType,
    /// Compiled-in default, if the field has one.
    pub default: Option<Value>,
    /// Closed set of accepted values, if the field is an enum.
    pub allowed: Option<Vec<Value>>,
    /// Regular expression the (string) value must match.
    pub pattern: Option<&'static str>,
    /// Inclusive lower bound for numeric values.
    pub minimum: Option<f64>,
    /// Inclusive upper bound for numeric values.
    pub maximum: Option<f64>,
    /// Whether the value is a secret that must be masked on disk.
    pub sensitive: bool,
}

impl FieldSpec {
    /// A field of the given type with no default and no constraints.
    #[must_use]
    pub fn new(kind: FieldType) -> Self {
        Self {
            kind,
            default: None,
            allowed: None,
            pattern: None,
            minimum: None,
            maximum: None,
            sensitive: false,
        }
    }

    /// Sets the compiled-in default.
    #[must_use]
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Restricts the field to a closed set of string values.
    #[must_use]
    pub fn one_of(mut self, values: &[&str]) -> Self {
        self.allowed = Some(values.iter().map(|v| json!(v)).collect());
        self
    }

    /// Requires string values to match `pattern`.
    #[must_use]
    pub fn with_pattern(mut self, pattern: &'static str) -> Self {
        self.pattern = Some(pattern);
        self
    }

    /// Bounds numeric values to `minimum..=maximum`.
    #[must_use]
    pub fn with_range(mut self, minimum: f64, maximum: f64) -> Self {
        self.minimum = Some(minimum);
        self.maximum = Some(maximum);
        self
    }

    /// Marks the field as a secret.
    #[must_use]
    pub fn secret(mut self) -> Self {
        self.sensitive = true;
        self
    }
}

/// Declaration of one named configuration section.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionSpec {
    fields: BTreeMap<&'static str, FieldSpec>,
    additional: bool,
    required: &'static [&'static str],
}

impl SectionSpec {
    fn new() -> Self {
        Self {
            fields: BTreeMap::new(),
            additional: false,
            required: &[],
        }
    }

    fn field(mut self, name: &'static str, spec: FieldSpec) -> Self {
        self.fields.insert(name, spec);
        self
    }

    fn allow_additional(mut self) -> Self {
        self.additional = true;
        self
    }

    /// Declared fields of the section, in name order.
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &FieldSpec)> {
        self.fields.iter().map(|(name, spec)| (*name, spec))
    }

    /// Looks up a declared field by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.get(name)
    }

    /// Whether keys outside the declared fields are permitted.
    #[must_use]
    pub fn allows_additional(&self) -> bool {
        self.additional
    }

    /// Field names that must be present for the section to validate.
    #[must_use]
    pub fn required(&self) -> &[&'static str] {
        self.required
    }
}

/// How the schema classifies one path in the configuration tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A named section (or the root): merges recurse into it key-wise.
    Section,
    /// A declared field: merged and attributed as one unit, even when the
    /// value is an array or object.
    Leaf,
    /// Not declared by the schema.
    Unknown,
}

/// The complete static registry of configuration fields.
///
/// All accessors are pure functions of the declaration built by
/// [`Schema::builtin`]; nothing here touches the file system or the
/// process environment.
///
/// # Examples
///
/// ```
/// use taskforge_config::{ConfigPath, Schema};
///
/// let schema = Schema::builtin();
/// let defaults = schema.defaults();
/// let priority = ConfigPath::parse("general.defaultPriority")
///     .resolve(&defaults)
///     .unwrap();
/// assert_eq!(priority, "medium");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    sections: BTreeMap<&'static str, SectionSpec>,
}

impl Schema {
    /// The compiled-in taskforge schema.
    #[must_use]
    pub fn builtin() -> Self {
        let mut sections = BTreeMap::new();

        sections.insert(
            "general",
            SectionSpec::new()
                .field(
                    "defaultPriority",
                    FieldSpec::new(FieldType::String)
                        .one_of(&["low", "medium", "high", "critical"])
                        .with_default(json!("medium")),
                )
                .field(
                    "defaultTags",
                    FieldSpec::new(FieldType::Array).with_default(json!([])),
                )
                .field(
                    "autoArchiveDays",
                    FieldSpec::new(FieldType::Integer)
                        .with_range(1.0, 365.0)
                        .with_default(json!(30)),
                )
                .field(
                    "confirmDestructive",
                    FieldSpec::new(FieldType::Boolean).with_default(json!(true)),
                ),
        );

        sections.insert(
            "ai",
            SectionSpec::new()
                .field(
                    "provider",
                    FieldSpec::new(FieldType::String)
                        .one_of(&["anthropic", "openai", "ollama"])
                        .with_default(json!("anthropic")),
                )
                .field("apiKey", FieldSpec::new(FieldType::String).secret())
                .field(
                    "model",
                    FieldSpec::new(FieldType::String).with_default(json!("claude-sonnet-4-5")),
                )
                .field(
                    "temperature",
                    FieldSpec::new(FieldType::Number)
                        .with_range(0.0, 2.0)
                        .with_default(json!(0.7)),
                )
                .field(
                    "maxTokens",
                    FieldSpec::new(FieldType::Integer)
                        .with_range(1.0, 200_000.0)
                        .with_default(json!(4096)),
                )
                .field(
                    "baseUrl",
                    FieldSpec::new(FieldType::String).with_pattern("^https?://"),
                ),
        );

        sections.insert(
            "sync",
            SectionSpec::new()
                .field(
                    "enabled",
                    FieldSpec::new(FieldType::Boolean).with_default(json!(false)),
                )
                .field(
                    "endpoint",
                    FieldSpec::new(FieldType::String).with_pattern("^https://"),
                )
                .field("token", FieldSpec::new(FieldType::String).secret())
                .field(
                    "intervalMinutes",
                    FieldSpec::new(FieldType::Integer)
                        .with_range(1.0, 1440.0)
                        .with_default(json!(15)),
                ),
        );

        sections.insert(
            "output",
            SectionSpec::new()
                .field(
                    "color",
                    FieldSpec::new(FieldType::Boolean).with_default(json!(true)),
                )
                .field(
                    "format",
                    FieldSpec::new(FieldType::String)
                        .one_of(&["table", "json", "plain"])
                        .with_default(json!("table")),
                )
                .field(
                    "dateFormat",
                    FieldSpec::new(FieldType::String).with_default(json!("%Y-%m-%d")),
                ),
        );

        // Free-form command shortcuts; any key is accepted.
        sections.insert("aliases", SectionSpec::new().allow_additional());

        Self { sections }
    }

    /// Declared sections, in name order.
    pub fn sections(&self) -> impl Iterator<Item = (&'static str, &SectionSpec)> {
        self.sections.iter().map(|(name, spec)| (*name, spec))
    }

    /// Looks up a section by name.
    #[must_use]
    pub fn section(&self, name: &str) -> Option<&SectionSpec> {
        self.sections.get(name)
    }

    /// Looks up the field declaration addressed by a two-segment path.
    #[must_use]
    pub fn field(&self, path: &ConfigPath) -> Option<&FieldSpec> {
        match path.segments() {
            [section, field] => self.sections.get(section.as_str())?.get(field),
            _ => None,
        }
    }

    /// Classifies a path as section, leaf, or unknown.
    ///
    /// The root and every declared section are [`NodeKind::Section`];
    /// every declared field is [`NodeKind::Leaf`] regardless of its value
    /// shape. Anything else is [`NodeKind::Unknown`].
    #[must_use]
    pub fn node_kind(&self, path: &ConfigPath) -> NodeKind {
        match path.segments() {
            [] => NodeKind::Section,
            [section] if self.sections.contains_key(section.as_str()) => NodeKind::Section,
            _ if self.field(path).is_some() => NodeKind::Leaf,
            _ => NodeKind::Unknown,
        }
    }

    /// Builds the full default object from the declaration.
    ///
    /// Every section appears; within it, only fields that declare a
    /// default appear — a field without a default is absent, never null.
    #[must_use]
    pub fn defaults(&self) -> Value {
        let mut root = Map::new();
        for (name, section) in &self.sections {
            let mut values = Map::new();
            for (field, spec) in section.fields() {
                if let Some(default) = &spec.default {
                    values.insert(field.to_string(), default.clone());
                }
            }
            root.insert((*name).to_string(), Value::Object(values));
        }
        Value::Object(root)
    }

    /// Dotted paths of every field flagged sensitive.
    #[must_use]
    pub fn sensitive_paths(&self) -> Vec<ConfigPath> {
        let mut paths = Vec::new();
        for (name, section) in &self.sections {
            for (field, spec) in section.fields() {
                if spec.sensitive {
                    paths.push(ConfigPath::root().join(name).join(field));
                }
            }
        }
        paths
    }
}
