//! The metadata stack: scoped configuration fragments keyed by normalized
//! path, resolved into a single merged context per page.
//!
//! Fragments attach to a path via [`Stack::add`] and [`Stack::get`] folds
//! every fragment on the path's lineage (the global fragment first, then
//! each successive prefix down to the path itself) so that deeper fragments
//! override shallower ones on key collision. Resolution is total: any path,
//! however malformed, resolves to at least the (possibly empty) global
//! context.
//!
//! Metadata values are [`serde_yaml::Value`]s, so user-authored YAML or JSON
//! of any shape round-trips without loss, and the accessors on [`Context`]
//! coerce defensively instead of panicking on mismatched types.

use std::collections::BTreeMap;
use std::path::Path;

use serde_yaml::Value;

use crate::path;

/// The count [`Context::get_count`] returns for a boolean `true`: "give me
/// everything".
pub const UNBOUNDED: usize = usize::MAX;

/// One metadata mapping: a config fragment before it is added to the stack,
/// and the resolved union of fragments afterwards.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Context {
    entries: BTreeMap<String, Value>,
}

impl Context {
    pub fn new() -> Context {
        Context::default()
    }

    /// Parses a metadata block as YAML (or JSON, which YAML subsumes) into a
    /// context. The block must be a mapping; a blank block is an empty
    /// context.
    pub fn from_yaml(text: &str) -> Result<Context, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Context::new());
        }
        Ok(Context {
            entries: serde_yaml::from_str(text)?,
        })
    }

    pub fn insert<K: Into<String>>(&mut self, key: K, value: Value) {
        self.entries.insert(key.into(), value);
    }

    /// Inserts `value` only when `key` is not already present, so derived
    /// metadata never clobbers what an author wrote.
    pub fn insert_absent<K: Into<String>>(&mut self, key: K, value: Value) {
        self.entries.entry(key.into()).or_insert(value);
    }

    /// Shallow merge: every top-level key in `other` overwrites the same key
    /// here, nested mappings included: a colliding mapping is replaced
    /// wholesale, never recursively merged. Keys absent from `other` are
    /// preserved.
    pub fn merge(&mut self, other: &Context) {
        for (key, value) in &other.entries {
            self.entries.insert(key.clone(), value.clone());
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    /// Looks up `key` as a string. Missing keys and non-string values yield
    /// `""`.
    pub fn get_string(&self, key: &str) -> String {
        match self.get(key) {
            Some(Value::String(s)) => s.clone(),
            _ => String::new(),
        }
    }

    /// Looks up `key` as a boolean. Missing keys and non-boolean values
    /// yield `false`.
    pub fn get_bool(&self, key: &str) -> bool {
        matches!(self.get(key), Some(Value::Bool(true)))
    }

    /// Looks up `key` as a count. `true` means [`UNBOUNDED`], `false` means
    /// zero, a non-negative integer means itself; anything else fails to
    /// coerce and yields `None`.
    pub fn get_count(&self, key: &str) -> Option<usize> {
        match self.get(key)? {
            Value::Bool(true) => Some(UNBOUNDED),
            Value::Bool(false) => Some(0),
            Value::Number(n) => n.as_u64().map(|n| n as usize),
            _ => None,
        }
    }
}

/// Scoped metadata fragments keyed by normalized path. Populated during the
/// gather phases and read-only afterwards; [`Stack::get`] takes `&self`, so
/// resolving contexts during the render phase needs no locking.
#[derive(Debug, Default)]
pub struct Stack {
    fragments: BTreeMap<String, Context>,
}

impl Stack {
    pub fn new() -> Stack {
        Stack::default()
    }

    /// Attaches `fragment` to `path`. The path normalizes to a `/`-joined
    /// segment key; the empty path is the global key, visible from
    /// everywhere. Adding to a path that already holds a fragment merges
    /// shallowly, with the new fragment's keys winning. Never fails.
    pub fn add<P: AsRef<Path>>(&mut self, path: P, fragment: Context) {
        let key = path::tokenize(path).join("/");
        self.fragments.entry(key).or_default().merge(&fragment);
    }

    /// Resolves the context visible at `path`: the global fragment, then the
    /// fragment at each successive prefix of `path` in root-to-leaf order,
    /// shallow-merged so deeper fragments win. Always succeeds; a path with
    /// no matching fragments resolves to an empty context.
    pub fn get<P: AsRef<Path>>(&self, path: P) -> Context {
        let mut resolved = Context::new();
        let tokens = path::tokenize(path);
        if let Some(global) = self.fragments.get("") {
            resolved.merge(global);
        }
        for depth in 1..=tokens.len() {
            let key = tokens[..depth].join("/");
            if let Some(fragment) = self.fragments.get(&key) {
                resolved.merge(fragment);
            }
        }
        resolved
    }
}
