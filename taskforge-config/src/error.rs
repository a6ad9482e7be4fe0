//! Error types for the taskforge configuration library.
//!
//! This module provides the error hierarchy for all configuration
//! operations, using `thiserror` for ergonomic error handling.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Result type alias for operations that may fail with a configuration error.
///
/// # Examples
///
/// ```
/// use taskforge_config::{Error, Result};
///
/// fn example_operation() -> Result<bool> {
///     Ok(true)
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the configuration library.
#[derive(Debug, Error)]
pub enum Error {
    /// A layer file exists but neither supported serialization parses it.
    #[error("cannot parse configuration file {}: {message}", path.display())]
    Parse {
        /// Path to the unparseable file.
        path: PathBuf,
        /// Why parsing failed.
        message: String,
    },

    /// The merged configuration violates the schema.
    ///
    /// Carries the complete list of violations, not just the first.
    #[error("invalid configuration: {0}")]
    Validation(ValidationReport),

    /// Directory creation, read, or write failure against a layer file.
    #[error("persistence failure at {}: {message}", path.display())]
    Persistence {
        /// The file or directory the operation targeted.
        path: PathBuf,
        /// Why the operation failed.
        message: String,
    },

    /// Neither a home directory nor a user config directory could be found.
    #[error("cannot determine the user configuration directory")]
    Home,
}

/// A single schema violation found during validation.
///
/// # Examples
///
/// ```
/// use taskforge_config::Violation;
///
/// let violation = Violation {
///     path: "general.defaultPriority".to_string(),
///     expected: "one of low, medium, high, critical".to_string(),
///     actual: "\"urgent\"".to_string(),
/// };
/// assert!(violation.to_string().contains("defaultPriority"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Dotted path of the offending value.
    pub path: String,
    /// What the schema requires at that path.
    pub expected: String,
    /// What was actually found.
    pub actual: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: expected {}, got {}",
            self.path, self.expected, self.actual
        )
    }
}

/// The aggregated outcome of a validation pass.
///
/// Validation never stops at the first problem; every violation in the
/// checked object is collected here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// All violations found, in schema walk order.
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    /// Number of violations in the report.
    #[must_use]
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// Whether the report contains no violations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} violation(s)", self.violations.len())?;
        for violation in &self.violations {
            write!(f, "; {violation}")?;
        }
        Ok(())
    }
}
