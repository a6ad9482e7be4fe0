//! Layer file discovery, parsing, and persistence.
//!
//! This module locates the two on-disk layers (global and local), parses
//! them into dynamic value trees, and writes them back with secrets
//! masked. Files may be YAML or JSON, selected by extension; files with
//! no recognized extension (the legacy `~/.taskforgerc`) are auto-detected.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::mask;
use crate::schema::Schema;

/// Environment variable overriding the global configuration directory.
pub const CONFIG_DIR_ENV: &str = "TASKFORGE_CONFIG_DIR";

/// Directory name used under the per-user config dir and the project root.
const APP_DIR: &str = "taskforge";

/// Project-local dotdirectory holding the local layer.
const LOCAL_DIR: &str = ".taskforge";

/// Legacy per-user dotfile, honored only when it already exists.
const LEGACY_RC: &str = ".taskforgerc";

/// File names probed, in order, when locating an existing layer file.
const FILE_CANDIDATES: [&str; 3] = ["config.yaml", "config.yml", "config.json"];

/// One of the two supported on-disk serializations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// YAML, the default for newly created files.
    Yaml,
    /// JSON.
    Json,
}

impl FileFormat {
    /// Derives the format from a path's extension.
    ///
    /// Returns `None` for unrecognized or missing extensions, in which
    /// case loading falls back to auto-detection.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::path::Path;
    /// use taskforge_config::FileFormat;
    ///
    /// assert_eq!(FileFormat::from_path(Path::new("config.yaml")), Some(FileFormat::Yaml));
    /// assert_eq!(FileFormat::from_path(Path::new("config.json")), Some(FileFormat::Json));
    /// assert_eq!(FileFormat::from_path(Path::new(".taskforgerc")), None);
    /// ```
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => Some(Self::Yaml),
            Some("json") => Some(Self::Json),
            _ => None,
        }
    }
}

/// Picks the existing layer file in `dir`, or the default name for creation.
fn pick_candidate(dir: &Path) -> PathBuf {
    for name in FILE_CANDIDATES {
        let candidate = dir.join(name);
        if candidate.exists() {
            return candidate;
        }
    }
    dir.join(FILE_CANDIDATES[0])
}

/// Resolves the path of the global (per-user) layer file.
///
/// Resolution order:
///
/// 1. `$TASKFORGE_CONFIG_DIR/config.yaml` when the override is set
/// 2. `<user config dir>/taskforge/config.yaml`
/// 3. The legacy `~/.taskforgerc`, only if it already exists and no
///    conventional file does
///
/// At each directory an existing `config.yml` or `config.json` wins over
/// creating a new `config.yaml`.
///
/// # Errors
///
/// Returns [`Error::Home`] when no override is set and the user config
/// directory cannot be determined.
pub fn resolve_global_path() -> Result<PathBuf> {
    if let Ok(dir) = env::var(CONFIG_DIR_ENV) {
        return Ok(pick_candidate(Path::new(&dir)));
    }

    let conventional = dirs::config_dir()
        .ok_or(Error::Home)?
        .join(APP_DIR);
    let candidate = pick_candidate(&conventional);
    if candidate.exists() {
        return Ok(candidate);
    }

    if let Some(home) = home::home_dir() {
        let legacy = home.join(LEGACY_RC);
        if legacy.exists() {
            return Ok(legacy);
        }
    }

    Ok(candidate)
}

/// Resolves the path of the local (per-project) layer file.
///
/// Always `.taskforge/config.yaml` under `project_root`, preferring an
/// existing `.yml`/`.json` sibling.
#[must_use]
pub fn resolve_local_path(project_root: &Path) -> PathBuf {
    pick_candidate(&project_root.join(LOCAL_DIR))
}

/// Loads one layer file into a value tree.
///
/// An absent file is an empty layer, not an error. A present file must
/// parse as a mapping in one of the two supported formats.
///
/// # Errors
///
/// Returns [`Error::Parse`] when the file exists but does not parse (or
/// parses to something other than a mapping), and [`Error::Persistence`]
/// when it exists but cannot be read.
pub fn load_layer(path: &Path) -> Result<Value> {
    if !path.exists() {
        return Ok(Value::Object(Map::new()));
    }

    let contents = fs::read_to_string(path).map_err(|e| Error::Persistence {
        path: path.to_path_buf(),
        message: format!("failed to read layer file: {e}"),
    })?;

    let parsed = match FileFormat::from_path(path) {
        Some(FileFormat::Json) => {
            serde_json::from_str(&contents).map_err(|e| Error::Parse {
                path: path.to_path_buf(),
                message: format!("invalid JSON: {e}"),
            })?
        }
        Some(FileFormat::Yaml) => {
            serde_yaml::from_str(&contents).map_err(|e| Error::Parse {
                path: path.to_path_buf(),
                message: format!("invalid YAML: {e}"),
            })?
        }
        None => detect_and_parse(path, &contents)?,
    };

    log::debug!("loaded configuration layer from {}", path.display());

    match parsed {
        Value::Object(_) => Ok(parsed),
        // An empty file parses to null; treat it as an empty layer.
        Value::Null => Ok(Value::Object(Map::new())),
        other => Err(Error::Parse {
            path: path.to_path_buf(),
            message: format!("top level must be a mapping, found {}", type_label(&other)),
        }),
    }
}

/// Tries JSON first, then YAML, for files with no recognized extension.
///
/// JSON is a syntactic subset of YAML, so the JSON attempt must come
/// first; otherwise YAML would claim JSON files and misreport errors.
fn detect_and_parse(path: &Path, contents: &str) -> Result<Value> {
    if let Ok(value) = serde_json::from_str(contents) {
        return Ok(value);
    }
    serde_yaml::from_str(contents).map_err(|e| Error::Parse {
        path: path.to_path_buf(),
        message: format!("not valid JSON or YAML: {e}"),
    })
}

fn type_label(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "a mapping",
    }
}

/// Persists one layer to disk, masking secrets first.
///
/// The parent directory is created if needed. Serialization happens
/// entirely in memory before a single write, so a failing write never
/// leaves a half-written file. When `secure` is set (the global layer),
/// owner-only permission bits are applied best-effort afterwards.
///
/// # Errors
///
/// Returns [`Error::Persistence`] on directory-creation, serialization,
/// or write failure. Permission tightening failures are logged, never
/// returned.
pub fn save_layer(path: &Path, data: &Value, schema: &Schema, secure: bool) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::Persistence {
            path: path.to_path_buf(),
            message: format!("failed to create {}: {e}", parent.display()),
        })?;
    }

    let masked = mask::mask_sensitive(data, schema);
    let serialized = match FileFormat::from_path(path).unwrap_or(FileFormat::Yaml) {
        FileFormat::Yaml => serde_yaml::to_string(&masked).map_err(|e| Error::Persistence {
            path: path.to_path_buf(),
            message: format!("failed to serialize YAML: {e}"),
        })?,
        FileFormat::Json => {
            let mut out = serde_json::to_string_pretty(&masked).map_err(|e| Error::Persistence {
                path: path.to_path_buf(),
                message: format!("failed to serialize JSON: {e}"),
            })?;
            out.push('\n');
            out
        }
    };

    fs::write(path, serialized).map_err(|e| Error::Persistence {
        path: path.to_path_buf(),
        message: format!("failed to write layer file: {e}"),
    })?;

    if secure {
        apply_owner_only(path);
    }

    Ok(())
}

/// Best-effort `chmod 600` on the global layer file.
#[cfg(unix)]
fn apply_owner_only(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    let result = fs::metadata(path).and_then(|meta| {
        let mut perms = meta.permissions();
        perms.set_mode(0o600);
        fs::set_permissions(path, perms)
    });
    if let Err(e) = result {
        log::warn!(
            "could not restrict permissions on {}: {e}",
            path.display()
        );
    }
}

#[cfg(not(unix))]
fn apply_owner_only(_path: &Path) {}

/// Warns when a layer file is readable by other users and holds a secret.
///
/// Non-blocking: the finding is logged with a remediation command, never
/// raised. Files that only contain placeholders do not warrant a warning.
#[cfg(unix)]
pub fn check_permissions(path: &Path, data: &Value, schema: &Schema) {
    use std::os::unix::fs::PermissionsExt;

    let Ok(meta) = fs::metadata(path) else {
        return;
    };
    let mode = meta.permissions().mode();
    // 0o044 covers the group-read and world-read bits
    if mode & 0o044 != 0 && mask::has_real_secret(data, schema) {
        log::warn!(
            "{} is readable by other users and contains credentials; run `chmod 600 {}` to restrict it",
            path.display(),
            path.display()
        );
    }
}

/// Permission checking is a no-op on non-Unix platforms.
#[cfg(not(unix))]
pub fn check_permissions(_path: &Path, _data: &Value, _schema: &Schema) {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_load_absent_file_is_empty_layer() {
        let temp = TempDir::new().unwrap();
        let layer = load_layer(&temp.path().join("missing.yaml")).unwrap();
        assert_eq!(layer, json!({}));
    }

    #[test]
    fn test_load_empty_file_is_empty_layer() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        fs::write(&path, "").unwrap();
        assert_eq!(load_layer(&path).unwrap(), json!({}));
    }

    #[test]
    fn test_load_valid_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        fs::write(&path, "general:\n  defaultPriority: high\n").unwrap();
        let layer = load_layer(&path).unwrap();
        assert_eq!(layer["general"]["defaultPriority"], "high");
    }

    #[test]
    fn test_load_valid_json() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        fs::write(&path, r#"{"output": {"color": false}}"#).unwrap();
        let layer = load_layer(&path).unwrap();
        assert_eq!(layer["output"]["color"], false);
    }

    #[test]
    fn test_load_invalid_file_names_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        fs::write(&path, "general: [unclosed\n  bad: {").unwrap();
        let err = load_layer(&path).unwrap_err();
        match err {
            Error::Parse { path: p, .. } => assert_eq!(p, path),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_load_scalar_top_level_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        fs::write(&path, "just a string\n").unwrap();
        let err = load_layer(&path).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn test_autodetect_json_without_extension() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".taskforgerc");
        fs::write(&path, r#"{"general": {"defaultPriority": "low"}}"#).unwrap();
        let layer = load_layer(&path).unwrap();
        assert_eq!(layer["general"]["defaultPriority"], "low");
    }

    #[test]
    fn test_autodetect_yaml_without_extension() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".taskforgerc");
        fs::write(&path, "general:\n  defaultPriority: low\n").unwrap();
        let layer = load_layer(&path).unwrap();
        assert_eq!(layer["general"]["defaultPriority"], "low");
    }

    #[test]
    fn test_save_creates_parent_and_round_trips() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.yaml");
        let schema = Schema::builtin();
        let data = json!({"output": {"format": "json"}});

        save_layer(&path, &data, &schema, false).unwrap();
        assert_eq!(load_layer(&path).unwrap(), data);
    }

    #[test]
    fn test_save_masks_secrets_on_disk_only() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        let schema = Schema::builtin();
        let data = json!({"ai": {"apiKey": "sk-XYZ", "model": "m"}});

        save_layer(&path, &data, &schema, false).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert!(!written.contains("sk-XYZ"));
        assert!(written.contains(crate::mask::PLACEHOLDER));
        // The live object keeps the real value
        assert_eq!(data["ai"]["apiKey"], "sk-XYZ");
    }

    #[test]
    fn test_save_keeps_json_format() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        let schema = Schema::builtin();
        save_layer(&path, &json!({"output": {"color": true}}), &schema, false).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert!(serde_json::from_str::<Value>(&written).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_save_secure_applies_owner_only_mode() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        let schema = Schema::builtin();
        save_layer(&path, &json!({"sync": {"enabled": true}}), &schema, true).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn test_check_permissions_does_not_panic() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        fs::write(&path, "ai:\n  apiKey: sk-real\n").unwrap();
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o644);
        fs::set_permissions(&path, perms).unwrap();

        let schema = Schema::builtin();
        let data = load_layer(&path).unwrap();
        // Emits a warning through the log facade; must not fail.
        check_permissions(&path, &data, &schema);
    }

    #[test]
    fn test_resolve_local_path_prefers_existing_variant() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(LOCAL_DIR);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("config.json"), "{}").unwrap();

        let resolved = resolve_local_path(temp.path());
        assert_eq!(resolved, dir.join("config.json"));
    }

    #[test]
    fn test_resolve_local_path_defaults_to_yaml() {
        let temp = TempDir::new().unwrap();
        let resolved = resolve_local_path(temp.path());
        assert_eq!(resolved, temp.path().join(LOCAL_DIR).join("config.yaml"));
    }
}
