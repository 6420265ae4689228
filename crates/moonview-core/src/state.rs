//! Shared printer state store
//!
//! A single hierarchical document mirroring the printer controller's
//! reported status. Nodes are addressed with slash-delimited paths
//! (`printer_state/extruder/temperature`); numeric segments index into
//! arrays. The store is mutated exclusively by merging notification
//! deltas into it; keys are never removed because the controller only
//! grows or updates its reported status.
//!
//! Exactly one store instance exists per process. It is constructed by
//! the process root and shared behind the render lock; it performs no
//! locking of its own.

use serde_json::{Map, Value};

/// The null sentinel returned for any absent path.
static NULL: Value = Value::Null;

/// Fixed namespace the printer's reported status lives under.
pub const STATUS_NAMESPACE: &str = "printer_state";

/// Resolve a slash-delimited path inside a JSON value.
///
/// Returns [`Value::Null`] when any segment is missing, indexes out of
/// range, or an intermediate node is a scalar. Never fails. Empty
/// segments (leading/doubled slashes) are skipped, so `/a//b` and `a/b`
/// address the same node.
pub fn value_at<'a>(root: &'a Value, path: &str) -> &'a Value {
    let mut node = root;
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        node = match node {
            Value::Object(map) => match map.get(segment) {
                Some(child) => child,
                None => return &NULL,
            },
            Value::Array(items) => match segment.parse::<usize>().ok().and_then(|i| items.get(i)) {
                Some(child) => child,
                None => return &NULL,
            },
            _ => return &NULL,
        };
    }
    node
}

/// Recursively merge `src` into `dst`.
///
/// Objects merge key by key so unrelated sibling keys survive; every
/// other value kind (scalars, arrays) replaces the destination wholesale.
fn merge(dst: &mut Value, src: &Value) {
    match (dst, src) {
        (Value::Object(dst_map), Value::Object(src_map)) => {
            for (key, src_val) in src_map {
                match dst_map.get_mut(key) {
                    Some(dst_val) if dst_val.is_object() && src_val.is_object() => {
                        merge(dst_val, src_val);
                    }
                    _ => {
                        dst_map.insert(key.clone(), src_val.clone());
                    }
                }
            }
        }
        (dst, src) => *dst = src.clone(),
    }
}

/// Process-wide tree of printer status data.
///
/// Readers take value copies while holding the render lock; no reference
/// into the tree may outlive a lock release.
#[derive(Debug, Clone)]
pub struct StateStore {
    root: Value,
}

impl StateStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            root: Value::Object(Map::new()),
        }
    }

    /// Borrow the value at `path`, or the null sentinel if absent.
    ///
    /// A missing path is not an error; callers null-check before
    /// converting. The borrow must not be held across a lock release —
    /// use [`StateStore::get_owned`] or the typed accessors for that.
    pub fn get(&self, path: &str) -> &Value {
        value_at(&self.root, path)
    }

    /// Copy out the value at `path` (null if absent)
    pub fn get_owned(&self, path: &str) -> Value {
        self.get(path).clone()
    }

    /// Read a numeric value at `path`
    pub fn get_f64(&self, path: &str) -> Option<f64> {
        self.get(path).as_f64()
    }

    /// Read a string value at `path`, copied out
    pub fn get_string(&self, path: &str) -> Option<String> {
        self.get(path).as_str().map(str::to_owned)
    }

    /// Read a boolean value at `path`
    pub fn get_bool(&self, path: &str) -> Option<bool> {
        self.get(path).as_bool()
    }

    /// Merge a notification delta into the tree.
    ///
    /// For each leaf present in `delta` the corresponding node is
    /// overwritten or inserted; containers merge key by key so sibling
    /// keys are preserved. Applying the same delta twice yields the same
    /// tree as applying it once. There is no removal: the controller
    /// never retracts keys.
    ///
    /// A non-object delta is a protocol fault; it is logged and dropped.
    pub fn apply_delta(&mut self, delta: &Value) {
        if !delta.is_object() {
            tracing::warn!("Ignoring non-object state delta: {}", delta);
            return;
        }
        merge(&mut self.root, delta);
    }

    /// Merge a status-update delta under the [`STATUS_NAMESPACE`] subtree.
    ///
    /// Status deltas are keyed relative to the printer-state namespace:
    /// a delta `{"extruder": {"temperature": 205.4}}` lands at
    /// `printer_state/extruder/temperature`.
    pub fn apply_status(&mut self, delta: &Value) {
        if !delta.is_object() {
            tracing::warn!("Ignoring non-object status delta: {}", delta);
            return;
        }
        let root = match self.root.as_object_mut() {
            Some(map) => map,
            None => return,
        };
        let subtree = root
            .entry(STATUS_NAMESPACE)
            .or_insert_with(|| Value::Object(Map::new()));
        merge(subtree, delta);
    }

    /// Borrow the whole tree (tests and diagnostics)
    pub fn root(&self) -> &Value {
        &self.root
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}
