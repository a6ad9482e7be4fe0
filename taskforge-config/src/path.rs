//! Typed dotted paths into a configuration tree.
//!
//! Accessors address values by paths like `general.defaultPriority`. A
//! [`ConfigPath`] is the parsed form of such a path: an ordered list of
//! segments walked against the value tree, rather than a raw string split
//! at every call site.

use std::fmt;

use serde_json::{Map, Value};

/// An ordered list of key segments addressing one node in a config tree.
///
/// # Examples
///
/// ```
/// use taskforge_config::ConfigPath;
///
/// let path = ConfigPath::parse("ai.apiKey");
/// assert_eq!(path.segments(), ["ai", "apiKey"]);
/// assert_eq!(path.to_string(), "ai.apiKey");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ConfigPath {
    segments: Vec<String>,
}

impl ConfigPath {
    /// The empty path, addressing the root of the tree.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Parses a dotted path string into segments.
    ///
    /// Empty segments (leading, trailing, or doubled dots) are dropped.
    #[must_use]
    pub fn parse(dotted: &str) -> Self {
        Self {
            segments: dotted
                .split('.')
                .filter(|s| !s.is_empty())
                .map(ToString::to_string)
                .collect(),
        }
    }

    /// The path's segments in order.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Whether this is the root path.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// The first segment, which names the configuration section.
    #[must_use]
    pub fn section(&self) -> Option<&str> {
        self.segments.first().map(String::as_str)
    }

    /// Returns a new path with `segment` appended.
    #[must_use]
    pub fn join(&self, segment: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Self { segments }
    }

    /// Looks the path up in a value tree.
    ///
    /// Returns `None` if any segment is missing or crosses a non-object,
    /// which callers treat as "unset", never as an error.
    ///
    /// # Examples
    ///
    /// ```
    /// use taskforge_config::ConfigPath;
    /// use serde_json::json;
    ///
    /// let tree = json!({"output": {"color": true}});
    /// let path = ConfigPath::parse("output.color");
    /// assert_eq!(path.resolve(&tree), Some(&json!(true)));
    /// assert_eq!(ConfigPath::parse("output.missing").resolve(&tree), None);
    /// ```
    #[must_use]
    pub fn resolve<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        let mut current = root;
        for segment in &self.segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Mutable lookup; same semantics as [`ConfigPath::resolve`].
    pub(crate) fn resolve_mut<'a>(&self, root: &'a mut Value) -> Option<&'a mut Value> {
        let mut current = root;
        for segment in &self.segments {
            current = current.as_object_mut()?.get_mut(segment)?;
        }
        Some(current)
    }

    /// Writes `value` at this path, creating intermediate objects.
    ///
    /// A non-object intermediate (scalar or array in the way) is replaced
    /// by a fresh object, matching overwrite-on-descent semantics.
    pub(crate) fn set_in(&self, root: &mut Value, value: Value) {
        let Some((last, parents)) = self.segments.split_last() else {
            return;
        };
        let mut current = root;
        for segment in parents {
            if !current.is_object() {
                *current = Value::Object(Map::new());
            }
            // Safe: the node was just made an object above
            current = current
                .as_object_mut()
                .expect("node is an object")
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(Map::new()));
        }
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        if let Some(map) = current.as_object_mut() {
            map.insert(last.clone(), value);
        }
    }

    /// Removes the leaf at this path, reporting whether it existed.
    ///
    /// Intermediate objects are left in place even when emptied.
    pub(crate) fn remove_from(&self, root: &mut Value) -> bool {
        let Some(last) = self.segments.last() else {
            return false;
        };
        let parent = Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        };
        match parent.resolve_mut(root).and_then(Value::as_object_mut) {
            Some(map) => map.remove(last).is_some(),
            None => false,
        }
    }
}

impl fmt::Display for ConfigPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

impl From<&str> for ConfigPath {
    fn from(dotted: &str) -> Self {
        Self::parse(dotted)
    }
}
