//! The configuration manager: the public accessor surface of the crate.
//!
//! A [`ConfigManager`] owns the four layers, the merged effective view,
//! and the source attribution map. It is an explicit object constructed
//! once at process entry and passed by reference to consumers — there is
//! no process-wide singleton; tests simply build fresh instances against
//! temporary paths.

use std::path::PathBuf;

use serde_json::{json, Map, Value};

use crate::environment::EnvOverlay;
use crate::error::{Error, Result};
use crate::loader;
use crate::mask;
use crate::merger::{self, Layer, SourceMap};
use crate::path::ConfigPath;
use crate::schema::{NodeKind, Schema};
use crate::validator::Validator;

/// Which writable layer an edit targets.
///
/// Only the two persisted layers accept edits; defaults are generated and
/// the environment overlay belongs to the process environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// The per-user file.
    Global,
    /// The per-project file. The default target for edits.
    Local,
}

impl Target {
    /// The layer written to by this target.
    #[must_use]
    pub const fn layer(self) -> Layer {
        match self {
            Self::Global => Layer::Global,
            Self::Local => Layer::Local,
        }
    }
}

/// Resolves, validates, and edits the layered configuration.
///
/// # Examples
///
/// ```no_run
/// use taskforge_config::{ConfigManager, ConfigPath, Target};
/// use serde_json::json;
///
/// let mut manager = ConfigManager::new().unwrap();
/// let path = ConfigPath::parse("general.defaultPriority");
///
/// let effective = manager.get(&path).unwrap();
/// manager.set(&path, json!("high"), Target::Local).unwrap();
/// manager.save(Target::Local).unwrap();
/// # let _ = effective;
/// ```
#[derive(Debug)]
pub struct ConfigManager {
    schema: Schema,
    global_path: PathBuf,
    local_path: PathBuf,
    defaults: Value,
    global: Value,
    local: Value,
    env: Value,
    merged: Value,
    sources: SourceMap,
    loaded: bool,
}

impl ConfigManager {
    /// Builds a manager against the conventional file locations.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Home`] when the user config directory cannot be
    /// determined and [`Error::Persistence`] when the working directory
    /// is unavailable.
    pub fn new() -> Result<Self> {
        let global_path = loader::resolve_global_path()?;
        let cwd = std::env::current_dir().map_err(|e| Error::Persistence {
            path: PathBuf::from("."),
            message: format!("cannot determine working directory: {e}"),
        })?;
        Ok(Self::with_paths(global_path, loader::resolve_local_path(&cwd)))
    }

    /// Builds a manager against explicit layer files.
    ///
    /// This is the constructor test harnesses use for isolation.
    #[must_use]
    pub fn with_paths(global_path: PathBuf, local_path: PathBuf) -> Self {
        let empty = || Value::Object(Map::new());
        Self {
            schema: Schema::builtin(),
            global_path,
            local_path,
            defaults: empty(),
            global: empty(),
            local: empty(),
            env: empty(),
            merged: empty(),
            sources: SourceMap::new(),
            loaded: false,
        }
    }

    /// The schema registry backing this manager.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Whether `load` has completed since construction.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Loads all four layers, merges them, and validates the result.
    ///
    /// The environment overlay is recomputed from scratch; the source map
    /// is fully rebuilt. A non-fatal warning is emitted when the global
    /// file is readable by other users while holding a real secret.
    ///
    /// # Errors
    ///
    /// Propagates [`Error::Parse`] from unreadable layer files and
    /// [`Error::Validation`] when the merged result violates the schema.
    pub fn load(&mut self) -> Result<()> {
        self.defaults = self.schema.defaults();
        self.global = loader::load_layer(&self.global_path)?;
        self.local = loader::load_layer(&self.local_path)?;
        self.env = EnvOverlay::load();

        loader::check_permissions(&self.global_path, &self.global, &self.schema);

        self.remerge();
        Validator::validate(&self.schema, &self.merged)?;
        self.loaded = true;
        Ok(())
    }

    fn ensure_loaded(&mut self) -> Result<()> {
        if self.loaded {
            Ok(())
        } else {
            self.load()
        }
    }

    fn remerge(&mut self) {
        let (merged, sources) = merger::merge_layers(
            &self.schema,
            &[
                (Layer::Default, &self.defaults),
                (Layer::Global, &self.global),
                (Layer::Local, &self.local),
                (Layer::Env, &self.env),
            ],
        );
        self.merged = merged;
        self.sources = sources;
    }

    /// Looks up an effective value, auto-loading on first use.
    ///
    /// A missing path is `Ok(None)`, never an error.
    ///
    /// # Errors
    ///
    /// Only the implicit first [`ConfigManager::load`] can fail.
    pub fn get(&mut self, path: &ConfigPath) -> Result<Option<Value>> {
        self.ensure_loaded()?;
        Ok(path.resolve(&self.merged).cloned())
    }

    /// Looks up an effective value, falling back to `default`.
    ///
    /// # Errors
    ///
    /// Only the implicit first [`ConfigManager::load`] can fail.
    pub fn get_or(&mut self, path: &ConfigPath, default: Value) -> Result<Value> {
        Ok(self.get(path)?.unwrap_or(default))
    }

    /// Writes a value into the chosen layer, re-merges, and re-validates.
    ///
    /// The proposed merge is validated *before* anything is committed: a
    /// failing `set` leaves the layer, the merged view, and the source
    /// map exactly as they were.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when the edit would produce an
    /// invalid effective configuration.
    pub fn set(&mut self, path: &ConfigPath, value: Value, target: Target) -> Result<()> {
        self.ensure_loaded()?;

        let mut proposed = match target {
            Target::Global => self.global.clone(),
            Target::Local => self.local.clone(),
        };
        path.set_in(&mut proposed, value);

        let (merged, sources) = {
            let global = if target == Target::Global {
                &proposed
            } else {
                &self.global
            };
            let local = if target == Target::Local {
                &proposed
            } else {
                &self.local
            };
            merger::merge_layers(
                &self.schema,
                &[
                    (Layer::Default, &self.defaults),
                    (Layer::Global, global),
                    (Layer::Local, local),
                    (Layer::Env, &self.env),
                ],
            )
        };
        Validator::validate(&self.schema, &merged)?;

        match target {
            Target::Global => self.global = proposed,
            Target::Local => self.local = proposed,
        }
        self.merged = merged;
        self.sources = sources;
        Ok(())
    }

    /// Removes a leaf from the chosen layer and re-merges.
    ///
    /// Returns whether the leaf existed in that layer. Removal only ever
    /// re-exposes a lower layer's already-validated value, so no
    /// re-validation runs.
    ///
    /// # Errors
    ///
    /// Only the implicit first [`ConfigManager::load`] can fail.
    pub fn delete(&mut self, path: &ConfigPath, target: Target) -> Result<bool> {
        self.ensure_loaded()?;
        let layer = match target {
            Target::Global => &mut self.global,
            Target::Local => &mut self.local,
        };
        let existed = path.remove_from(layer);
        if existed {
            self.remerge();
        }
        Ok(existed)
    }

    /// Persists the chosen layer to its file, masking secrets first.
    ///
    /// The live in-memory layer keeps its real values; only the written
    /// copy is redacted. The global file additionally gets owner-only
    /// permission bits, best-effort.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persistence`] on directory-creation or write
    /// failure.
    pub fn save(&self, target: Target) -> Result<()> {
        match target {
            Target::Global => {
                loader::save_layer(&self.global_path, &self.global, &self.schema, true)
            }
            Target::Local => {
                loader::save_layer(&self.local_path, &self.local, &self.schema, false)
            }
        }
    }

    /// The layer that supplied the effective value at `path`.
    ///
    /// Unattributed paths report [`Layer::Default`].
    #[must_use]
    pub fn source(&self, path: &ConfigPath) -> Layer {
        self.sources.get(path).copied().unwrap_or(Layer::Default)
    }

    /// Borrow of the merged effective configuration.
    #[must_use]
    pub fn effective(&self) -> &Value {
        &self.merged
    }

    /// The effective configuration with sensitive leaves replaced by the
    /// masking placeholder. Safe to print.
    #[must_use]
    pub fn masked(&self) -> Value {
        mask::mask_sensitive(&self.merged, &self.schema)
    }

    /// The effective configuration mirrored with `{value, source}` leaves.
    #[must_use]
    pub fn with_sources(&self) -> Value {
        self.annotate(&ConfigPath::root(), &self.merged)
    }

    fn annotate(&self, path: &ConfigPath, value: &Value) -> Value {
        match value.as_object() {
            Some(map) if self.schema.node_kind(path) != NodeKind::Leaf => {
                let mut out = Map::new();
                for (key, child) in map {
                    out.insert(key.clone(), self.annotate(&path.join(key), child));
                }
                Value::Object(out)
            }
            _ => json!({
                "value": value.clone(),
                "source": self.source(path).as_str(),
            }),
        }
    }

    /// Merges the local layer into the global one and persists both.
    ///
    /// # Errors
    ///
    /// Propagates load, validation, and persistence errors.
    pub fn migrate_to_global(&mut self) -> Result<()> {
        self.ensure_loaded()?;
        self.global = merger::deep_merge(&self.schema, &self.global, &self.local);
        self.save(Target::Global)?;
        self.save(Target::Local)?;
        self.remerge();
        Ok(())
    }

    /// Merges the global layer into the local one and persists both.
    ///
    /// # Errors
    ///
    /// Propagates load, validation, and persistence errors.
    pub fn copy_from_global(&mut self) -> Result<()> {
        self.ensure_loaded()?;
        self.local = merger::deep_merge(&self.schema, &self.local, &self.global);
        self.save(Target::Global)?;
        self.save(Target::Local)?;
        self.remerge();
        Ok(())
    }

    /// Empties the chosen layer, persists the empty layer, and reloads.
    ///
    /// # Errors
    ///
    /// Propagates persistence and reload errors.
    pub fn clear(&mut self, target: Target) -> Result<()> {
        self.ensure_loaded()?;
        match target {
            Target::Global => self.global = Value::Object(Map::new()),
            Target::Local => self.local = Value::Object(Map::new()),
        }
        self.save(target)?;
        self.load()
    }
}
