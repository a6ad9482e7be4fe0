#![deny(missing_docs, unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! # taskforge-config
//!
//! The layered configuration core for the taskforge task manager.
//!
//! This library resolves a single effective configuration from four ordered
//! sources, validates it against a declarative schema, and persists edits
//! back to the correct source while masking secrets on disk.
//!
//! # Configuration Precedence
//!
//! Layers are merged from lowest to highest precedence:
//!
//! 1. Built-in defaults (derived from the schema)
//! 2. Global file (`$TASKFORGE_CONFIG_DIR/config.yaml`, the per-user
//!    config directory, or the legacy `~/.taskforgerc`)
//! 3. Local file (`.taskforge/config.yaml` in the project directory)
//! 4. Environment variables (`TASKFORGE_*`)
//!
//! A missing key in a higher layer never deletes a lower layer's value;
//! objects merge key-wise, arrays and scalars are replaced wholesale.
//!
//! # Examples
//!
//! ```no_run
//! use taskforge_config::{ConfigManager, ConfigPath, Target};
//! use serde_json::json;
//!
//! let mut manager = ConfigManager::new().unwrap();
//! manager.load().unwrap();
//!
//! let priority = manager
//!     .get(&ConfigPath::parse("general.defaultPriority"))
//!     .unwrap();
//! println!("priority: {priority:?}");
//!
//! manager
//!     .set(&ConfigPath::parse("output.color"), json!(false), Target::Local)
//!     .unwrap();
//! manager.save(Target::Local).unwrap();
//! ```

pub mod environment;
pub mod error;
pub mod loader;
pub mod manager;
pub mod mask;
pub mod merger;
pub mod path;
pub mod schema;
pub mod validator;

// Re-export key types at crate root for convenience
pub use environment::EnvOverlay;
pub use error::{Error, Result, ValidationReport, Violation};
pub use loader::FileFormat;
pub use manager::{ConfigManager, Target};
pub use mask::PLACEHOLDER;
pub use merger::{Layer, SourceMap};
pub use path::ConfigPath;
pub use schema::{FieldSpec, FieldType, NodeKind, Schema, SectionSpec};
pub use validator::Validator;
