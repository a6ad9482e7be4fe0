//! Schema-driven configuration validation.
//!
//! The validator walks an object against the schema registry and collects
//! every violation it finds — unknown keys, wrong types, enum misses,
//! pattern mismatches, and out-of-range numbers. All violations surface
//! in one aggregated error rather than failing at the first.

use regex_lite::Regex;
use serde_json::Value;

use crate::error::{Error, Result, ValidationReport, Violation};
use crate::path::ConfigPath;
use crate::schema::{FieldSpec, FieldType, Schema, SectionSpec};

/// Validates configuration objects against the schema registry.
///
/// # Examples
///
/// ```
/// use taskforge_config::{Schema, Validator};
/// use serde_json::json;
///
/// let schema = Schema::builtin();
/// let config = json!({"general": {"defaultPriority": "high"}});
/// assert!(Validator::validate(&schema, &config).is_ok());
///
/// let bad = json!({"general": {"defaultPriority": "urgent"}});
/// assert!(Validator::validate(&schema, &bad).is_err());
/// ```
pub struct Validator;

impl Validator {
    /// Checks `config` against `schema`, aggregating all violations.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] carrying the complete list of
    /// violations when any rule fails.
    pub fn validate(schema: &Schema, config: &Value) -> Result<()> {
        let mut violations = Vec::new();

        if let Some(root) = config.as_object() {
            for (name, value) in root {
                let path = ConfigPath::root().join(name);
                match schema.section(name) {
                    Some(section) => Self::check_section(&path, section, value, &mut violations),
                    None => violations.push(Violation {
                        path: path.to_string(),
                        expected: "a known configuration section".to_string(),
                        actual: describe(value),
                    }),
                }
            }
        } else {
            violations.push(Violation {
                path: String::new(),
                expected: "a mapping at the top level".to_string(),
                actual: describe(config),
            });
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(ValidationReport { violations }))
        }
    }

    fn check_section(
        path: &ConfigPath,
        section: &SectionSpec,
        value: &Value,
        violations: &mut Vec<Violation>,
    ) {
        let Some(map) = value.as_object() else {
            violations.push(Violation {
                path: path.to_string(),
                expected: "a mapping of section fields".to_string(),
                actual: describe(value),
            });
            return;
        };

        for required in section.required() {
            if !map.contains_key(*required) {
                violations.push(Violation {
                    path: path.join(required).to_string(),
                    expected: "a value for this required field".to_string(),
                    actual: "nothing".to_string(),
                });
            }
        }

        for (key, field_value) in map {
            let field_path = path.join(key);
            match section.get(key) {
                Some(spec) => Self::check_field(&field_path, spec, field_value, violations),
                None if section.allows_additional() => {}
                None => violations.push(Violation {
                    path: field_path.to_string(),
                    expected: "a field declared by this section".to_string(),
                    actual: describe(field_value),
                }),
            }
        }
    }

    fn check_field(
        path: &ConfigPath,
        spec: &FieldSpec,
        value: &Value,
        violations: &mut Vec<Violation>,
    ) {
        if !type_matches(spec.kind, value) {
            violations.push(Violation {
                path: path.to_string(),
                expected: format!("a value of type {}", spec.kind),
                actual: describe(value),
            });
            return;
        }

        if let Some(allowed) = &spec.allowed {
            if !allowed.contains(value) {
                let options: Vec<String> = allowed.iter().map(ToString::to_string).collect();
                violations.push(Violation {
                    path: path.to_string(),
                    expected: format!("one of {}", options.join(", ")),
                    actual: describe(value),
                });
            }
        }

        if let (Some(pattern), Some(s)) = (spec.pattern, value.as_str()) {
            // Builtin patterns are known-good; a failed compile only skips
            // the check.
            if let Ok(regex) = Regex::new(pattern) {
                if !regex.is_match(s) {
                    violations.push(Violation {
                        path: path.to_string(),
                        expected: format!("a string matching {pattern}"),
                        actual: describe(value),
                    });
                }
            }
        }

        if let Some(number) = value.as_f64() {
            if let Some(minimum) = spec.minimum {
                if number < minimum {
                    violations.push(Violation {
                        path: path.to_string(),
                        expected: format!("a number >= {minimum}"),
                        actual: describe(value),
                    });
                }
            }
            if let Some(maximum) = spec.maximum {
                if number > maximum {
                    violations.push(Violation {
                        path: path.to_string(),
                        expected: format!("a number <= {maximum}"),
                        actual: describe(value),
                    });
                }
            }
        }
    }
}

/// Whether `value` satisfies the declared field type.
///
/// `Integer` accepts any whole-number value, including a float with a
/// zero fraction, matching how both serializations surface `30` vs
/// `30.0`. `Number` accepts both.
fn type_matches(kind: FieldType, value: &Value) -> bool {
    match kind {
        FieldType::String => value.is_string(),
        FieldType::Boolean => value.is_boolean(),
        FieldType::Object => value.is_object(),
        FieldType::Array => value.is_array(),
        FieldType::Number => value.is_number(),
        FieldType::Integer => {
            value.is_i64()
                || value.is_u64()
                || value.as_f64().is_some_and(|n| n.fract() == 0.0)
        }
    }
}

/// Short human description of a value for violation records.
fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Object(_) => "a mapping".to_string(),
        Value::Array(_) => "an array".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn validate(config: Value) -> Result<()> {
        Validator::validate(&Schema::builtin(), &config)
    }

    fn report(config: Value) -> ValidationReport {
        match validate(config) {
            Err(Error::Validation(report)) => report,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_config_is_valid() {
        assert!(validate(json!({})).is_ok());
    }

    #[test]
    fn test_defaults_are_valid() {
        let schema = Schema::builtin();
        assert!(Validator::validate(&schema, &schema.defaults()).is_ok());
    }

    #[test]
    fn test_unknown_section_flagged() {
        let report = report(json!({"nonsense": {"x": 1}}));
        assert_eq!(report.len(), 1);
        assert_eq!(report.violations[0].path, "nonsense");
    }

    #[test]
    fn test_unknown_field_flagged() {
        let report = report(json!({"general": {"defaultPriorty": "high"}}));
        assert_eq!(report.len(), 1);
        assert_eq!(report.violations[0].path, "general.defaultPriorty");
    }

    #[test]
    fn test_additional_fields_allowed_in_aliases() {
        assert!(validate(json!({"aliases": {"ls": "list --all"}})).is_ok());
    }

    #[test]
    fn test_section_must_be_mapping() {
        let report = report(json!({"general": "high"}));
        assert_eq!(report.violations[0].path, "general");
        assert!(report.violations[0].expected.contains("mapping"));
    }

    #[test]
    fn test_enum_membership() {
        let report = report(json!({"general": {"defaultPriority": "urgent"}}));
        assert_eq!(report.len(), 1);
        let violation = &report.violations[0];
        assert_eq!(violation.path, "general.defaultPriority");
        assert!(violation.expected.contains("one of"));
        assert!(violation.actual.contains("urgent"));
    }

    #[test]
    fn test_type_check_string() {
        let report = report(json!({"ai": {"model": 5}}));
        assert!(report.violations[0].expected.contains("string"));
    }

    #[test]
    fn test_integer_rejects_fractional() {
        let report = report(json!({"ai": {"maxTokens": 10.5}}));
        assert_eq!(report.violations[0].path, "ai.maxTokens");
        assert!(report.violations[0].expected.contains("integer"));
    }

    #[test]
    fn test_integer_accepts_whole_float() {
        assert!(validate(json!({"ai": {"maxTokens": 4096.0}})).is_ok());
    }

    #[test]
    fn test_number_accepts_fractional() {
        assert!(validate(json!({"ai": {"temperature": 0.25}})).is_ok());
    }

    #[test]
    fn test_numeric_range() {
        let report_hi = report(json!({"ai": {"temperature": 9.5}}));
        assert!(report_hi.violations[0].expected.contains("<= 2"));

        let report_lo = report(json!({"general": {"autoArchiveDays": 0}}));
        assert!(report_lo.violations[0].expected.contains(">= 1"));
    }

    #[test]
    fn test_pattern_on_strings_only() {
        let report = report(json!({"ai": {"baseUrl": "localhost:8080"}}));
        assert_eq!(report.violations[0].path, "ai.baseUrl");
        assert!(report.violations[0].expected.contains("matching"));

        assert!(validate(json!({"ai": {"baseUrl": "https://api.example.com"}})).is_ok());
    }

    #[test]
    fn test_array_type() {
        assert!(validate(json!({"general": {"defaultTags": ["work"]}})).is_ok());
        let report = report(json!({"general": {"defaultTags": "work"}}));
        assert!(report.violations[0].expected.contains("array"));
    }

    #[test]
    fn test_all_violations_aggregated() {
        let report = report(json!({
            "general": {"defaultPriority": "urgent"},
            "ai": {"temperature": 9.5},
            "bogus": {}
        }));
        assert_eq!(report.len(), 3);
        let paths: Vec<&str> = report.violations.iter().map(|v| v.path.as_str()).collect();
        assert!(paths.contains(&"general.defaultPriority"));
        assert!(paths.contains(&"ai.temperature"));
        assert!(paths.contains(&"bogus"));
    }

    #[test]
    fn test_top_level_must_be_mapping() {
        let report = report(json!([1, 2, 3]));
        assert!(report.violations[0].expected.contains("top level"));
    }
}
