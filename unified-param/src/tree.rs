//! Hierarchical parameter storage.
//!
//! `ParameterTree` owns every node in an arena and resolves `/`-separated
//! paths through per-node child maps. Only leaf nodes carry a value.
//!
//! Locking is fine grained: each node guards its children, each leaf guards
//! its value, and the tree guards its callback lists and batch window. User
//! callbacks are always invoked after every lock has been released.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::GlobalCounter;
use crate::error::{Error, Result, UpdateOutcome};
use crate::value::{ParameterChange, ParameterType, ParameterValue};

static CALLBACK_IDS: GlobalCounter = GlobalCounter::new();

/// Called with `(path, value)` after a leaf changes.
pub type ChangedCallback = Arc<dyn Fn(&str, &ParameterValue) + Send + Sync>;
/// Called once per batch flush with every changed path.
pub type BatchCallback = Arc<dyn Fn(&[ParameterChange]) + Send + Sync>;
/// Returns `false` to reject a candidate value.
pub type Validator = Arc<dyn Fn(&ParameterValue) -> bool + Send + Sync>;

/// Handle returned when registering a callback, used to remove it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(usize);

impl CallbackId {
    pub(crate) fn next() -> Self {
        Self(CALLBACK_IDS.increment())
    }
}

/// Index of a node in the tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ParameterNodeType {
    Root,
    Category,
    Group,
    Parameter,
}

struct LeafState {
    value: ParameterValue,
    default: ParameterValue,
    validator: Option<Validator>,
    // Set while one writer is delivering callbacks for this leaf.
    notifying: bool,
    // A store landed that the notifying writer has not delivered yet.
    dirty: bool,
}

/// Leaf payload: current value, default, validator and change callbacks.
pub struct Parameter {
    state: Mutex<LeafState>,
    callbacks: Mutex<Vec<(CallbackId, ChangedCallback)>>,
}

impl Parameter {
    fn new(default: ParameterValue, validator: Option<Validator>) -> Self {
        Self {
            state: Mutex::new(LeafState {
                value: default.clone(),
                default,
                validator,
                notifying: false,
                dirty: false,
            }),
            callbacks: Mutex::new(Vec::new()),
        }
    }

    pub fn value(&self) -> ParameterValue {
        self.state.lock().value.clone()
    }

    pub fn default_value(&self) -> ParameterValue {
        self.state.lock().default.clone()
    }

    pub fn parameter_type(&self) -> ParameterType {
        self.state.lock().value.parameter_type()
    }

    pub fn has_validator(&self) -> bool {
        self.state.lock().validator.is_some()
    }

    /// Run the validator without storing anything.
    pub fn validate(&self, value: &ParameterValue) -> bool {
        let validator = self.state.lock().validator.clone();
        validator.is_none_or(|v| v(value))
    }

    /// Store `value` if the validator accepts it.
    fn store(&self, value: ParameterValue, validate: bool) -> bool {
        let mut state = self.state.lock();
        if validate
            && let Some(validator) = &state.validator
            && !validator(&value)
        {
            return false;
        }
        state.value = value;
        true
    }

    /// Mark the stored value as undelivered. Returns `true` when the caller
    /// must run the notification loop, `false` when another writer is
    /// already in it and will pick the new value up.
    fn claim_notification(&self) -> bool {
        let mut state = self.state.lock();
        state.dirty = true;
        if state.notifying {
            return false;
        }
        state.notifying = true;
        true
    }

    /// Next value to deliver, or `None` once everything stored has been
    /// delivered, which also releases the claim.
    fn next_notification(&self) -> Option<ParameterValue> {
        let mut state = self.state.lock();
        if state.dirty {
            state.dirty = false;
            Some(state.value.clone())
        } else {
            state.notifying = false;
            None
        }
    }

    pub fn add_changed_callback(&self, callback: ChangedCallback) -> CallbackId {
        let id = CallbackId::next();
        self.callbacks.lock().push((id, callback));
        id
    }

    pub fn remove_changed_callback(&self, id: CallbackId) -> bool {
        let mut callbacks = self.callbacks.lock();
        let before = callbacks.len();
        callbacks.retain(|(cid, _)| *cid != id);
        callbacks.len() != before
    }

    fn snapshot_callbacks(&self) -> Vec<ChangedCallback> {
        self.callbacks.lock().iter().map(|(_, cb)| cb.clone()).collect()
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Parameter")
            .field("value", &state.value)
            .field("default", &state.default)
            .field("has_validator", &state.validator.is_some())
            .finish_non_exhaustive()
    }
}

/// A node of the parameter tree.
#[derive(Debug)]
pub struct ParameterNode {
    id: NodeId,
    name: String,
    kind: ParameterNodeType,
    parent: Option<NodeId>,
    path: String,
    children: Mutex<HashMap<String, NodeId>>,
    leaf: Option<Parameter>,
    detached: AtomicBool,
}

impl ParameterNode {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn node_type(&self) -> ParameterNodeType {
        self.kind
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Full `/`-separated path from the root. Empty for the root itself.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_parameter(&self) -> bool {
        self.leaf.is_some()
    }

    pub fn parameter(&self) -> Option<&Parameter> {
        self.leaf.as_ref()
    }

    /// `false` once the node has been removed from the tree.
    pub fn is_attached(&self) -> bool {
        !self.detached.load(Ordering::Acquire)
    }

    /// Child names, sorted.
    pub fn child_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.children.lock().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn child_count(&self) -> usize {
        self.children.lock().len()
    }

    fn child_id(&self, name: &str) -> Option<NodeId> {
        self.children.lock().get(name).copied()
    }
}

/// Counts returned by [`ParameterTree::deserialize_from_json`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub applied: usize,
    pub rejected: usize,
    pub unknown: usize,
}

#[derive(Default)]
struct TreeState {
    global_callbacks: Vec<(CallbackId, ChangedCallback)>,
    batch_callbacks: Vec<(CallbackId, BatchCallback)>,
    in_batch: bool,
    batch_changes: Vec<ParameterChange>,
    batch_index: HashMap<String, usize>,
}

/// Path-addressed store of typed parameter values.
pub struct ParameterTree {
    nodes: RwLock<Vec<Arc<ParameterNode>>>,
    state: Mutex<TreeState>,
}

impl Default for ParameterTree {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ParameterTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterTree")
            .field("nodes", &self.nodes.read().len())
            .field("in_batch", &self.is_in_batch())
            .finish_non_exhaustive()
    }
}

/// Split a path into its segments, ignoring leading and trailing slashes.
pub fn split_path(path: &str) -> Result<Vec<&str>> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Err(Error::InvalidPath(path.to_string()));
    }
    let segments: Vec<&str> = trimmed.split('/').collect();
    if segments.iter().any(|s| s.trim().is_empty()) {
        return Err(Error::InvalidPath(path.to_string()));
    }
    Ok(segments)
}

impl ParameterTree {
    pub fn new() -> Self {
        let root = Arc::new(ParameterNode {
            id: NodeId::ROOT,
            name: String::new(),
            kind: ParameterNodeType::Root,
            parent: None,
            path: String::new(),
            children: Mutex::new(HashMap::new()),
            leaf: None,
            detached: AtomicBool::new(false),
        });
        Self {
            nodes: RwLock::new(vec![root]),
            state: Mutex::new(TreeState::default()),
        }
    }

    pub fn root(&self) -> Arc<ParameterNode> {
        self.nodes.read()[NodeId::ROOT.0].clone()
    }

    pub fn node(&self, id: NodeId) -> Option<Arc<ParameterNode>> {
        self.nodes.read().get(id.0).cloned()
    }

    /// Number of nodes ever allocated, root and detached nodes included.
    pub fn node_count(&self) -> usize {
        self.nodes.read().len()
    }

    fn alloc(
        &self,
        parent: &ParameterNode,
        name: &str,
        kind: ParameterNodeType,
        leaf: Option<Parameter>,
    ) -> Arc<ParameterNode> {
        let path = if parent.path.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", parent.path, name)
        };
        let mut nodes = self.nodes.write();
        let node = Arc::new(ParameterNode {
            id: NodeId(nodes.len()),
            name: name.to_string(),
            kind,
            parent: Some(parent.id),
            path,
            children: Mutex::new(HashMap::new()),
            leaf,
            detached: AtomicBool::new(false),
        });
        nodes.push(node.clone());
        node
    }

    pub fn register_parameter(
        &self,
        path: &str,
        default: ParameterValue,
    ) -> Result<Arc<ParameterNode>> {
        self.register(path, default, None)
    }

    pub fn register_parameter_with_validator(
        &self,
        path: &str,
        default: ParameterValue,
        validator: Validator,
    ) -> Result<Arc<ParameterNode>> {
        self.register(path, default, Some(validator))
    }

    /// Create missing categories along `path`, then the leaf.
    ///
    /// Registering an existing leaf returns it unchanged; the first default
    /// and validator win.
    fn register(
        &self,
        path: &str,
        default: ParameterValue,
        validator: Option<Validator>,
    ) -> Result<Arc<ParameterNode>> {
        let segments = split_path(path)?;
        let (leaf_name, categories) = segments
            .split_last()
            .ok_or_else(|| Error::InvalidPath(path.to_string()))?;

        let mut current = self.root();
        for segment in categories {
            let next = {
                let mut children = current.children.lock();
                match children.get(*segment).and_then(|id| self.node(*id)) {
                    Some(existing) if existing.is_parameter() => {
                        return Err(Error::PathConflict(existing.path.clone()));
                    }
                    Some(existing) => existing,
                    None => {
                        let node =
                            self.alloc(&current, segment, ParameterNodeType::Category, None);
                        children.insert(segment.to_string(), node.id);
                        node
                    }
                }
            };
            current = next;
        }

        let mut children = current.children.lock();
        if let Some(existing) = children.get(*leaf_name).and_then(|id| self.node(*id)) {
            if existing.is_parameter() {
                trace!("[TREE] {} already registered", existing.path);
                return Ok(existing);
            }
            return Err(Error::PathConflict(existing.path.clone()));
        }
        let node = self.alloc(
            &current,
            leaf_name,
            ParameterNodeType::Parameter,
            Some(Parameter::new(default, validator)),
        );
        children.insert(leaf_name.to_string(), node.id);
        debug!("[TREE] Registered {} as {}", node.path, node.id);
        Ok(node)
    }

    /// Resolve a path to its node. An empty path resolves to the root.
    pub fn find_node(&self, path: &str) -> Option<Arc<ParameterNode>> {
        let mut current = self.root();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            let id = current.child_id(segment)?;
            current = self.node(id)?;
        }
        Some(current)
    }

    /// Resolve a path to a leaf node.
    pub fn find_parameter(&self, path: &str) -> Option<Arc<ParameterNode>> {
        self.find_node(path).filter(|node| node.is_parameter())
    }

    pub fn has_parameter(&self, path: &str) -> bool {
        self.find_parameter(path).is_some()
    }

    /// Current value at `path`, or [`ParameterValue::NotSet`] if unregistered.
    pub fn get_parameter_value(&self, path: &str) -> ParameterValue {
        self.find_parameter(path)
            .and_then(|node| node.parameter().map(Parameter::value))
            .unwrap_or_default()
    }

    pub fn set_parameter_value(&self, path: &str, value: ParameterValue) -> UpdateOutcome {
        self.write_leaf(path, value, true)
    }

    /// Restore the registered default, bypassing the validator.
    pub fn reset_to_default(&self, path: &str) -> UpdateOutcome {
        let Some(default) = self
            .find_parameter(path)
            .and_then(|node| node.parameter().map(Parameter::default_value))
        else {
            return UpdateOutcome::NotFound;
        };
        self.write_leaf(path, default, false)
    }

    fn write_leaf(&self, path: &str, value: ParameterValue, validate: bool) -> UpdateOutcome {
        let Some(node) = self.find_parameter(path) else {
            trace!("[TREE] set on unregistered {}", path);
            return UpdateOutcome::NotFound;
        };
        let Some(leaf) = node.parameter() else {
            return UpdateOutcome::NotFound;
        };
        if !leaf.store(value.clone(), validate) {
            debug!("[TREE] Validator rejected {} = {}", node.path, value);
            return UpdateOutcome::ValidationRejected;
        }
        trace!("[TREE] {} = {}", node.path, value);

        {
            let mut state = self.state.lock();
            if state.in_batch {
                Self::record_batch_change(&mut state, &node.path, value);
                return UpdateOutcome::Applied;
            }
        }

        // Concurrent writers to one leaf hand off to whoever is already
        // notifying, which delivers the newest stored value last.
        if !leaf.claim_notification() {
            trace!("[TREE] {} queued behind running notification", node.path);
            return UpdateOutcome::Applied;
        }
        while let Some(current) = leaf.next_notification() {
            let global = self
                .state
                .lock()
                .global_callbacks
                .iter()
                .map(|(_, cb)| cb.clone())
                .collect::<Vec<_>>();
            for callback in leaf.snapshot_callbacks() {
                callback(&node.path, &current);
            }
            for callback in global {
                callback(&node.path, &current);
            }
        }
        UpdateOutcome::Applied
    }

    fn record_batch_change(state: &mut TreeState, path: &str, value: ParameterValue) {
        match state.batch_index.get(path) {
            Some(&i) => state.batch_changes[i].value = value,
            None => {
                state
                    .batch_index
                    .insert(path.to_string(), state.batch_changes.len());
                state.batch_changes.push(ParameterChange::new(path, value));
            }
        }
    }

    /// Open the batch window. Returns `false` if it was already open.
    pub fn begin_batch_update(&self) -> bool {
        let mut state = self.state.lock();
        if state.in_batch {
            return false;
        }
        state.in_batch = true;
        trace!("[TREE] Batch opened");
        true
    }

    /// Close the batch window and flush accumulated changes.
    ///
    /// Leaf callbacks fire once per changed path, then every batch callback
    /// fires once with the full list. Nothing fires if no path changed.
    pub fn end_batch_update(&self) {
        let (changes, batch_callbacks) = {
            let mut state = self.state.lock();
            if !state.in_batch {
                return;
            }
            state.in_batch = false;
            state.batch_index.clear();
            let changes = std::mem::take(&mut state.batch_changes);
            let callbacks: Vec<BatchCallback> = state
                .batch_callbacks
                .iter()
                .map(|(_, cb)| cb.clone())
                .collect();
            (changes, callbacks)
        };
        debug!("[TREE] Batch closed with {} change(s)", changes.len());
        if changes.is_empty() {
            return;
        }

        for change in &changes {
            if let Some(node) = self.find_parameter(&change.path)
                && let Some(leaf) = node.parameter()
            {
                for callback in leaf.snapshot_callbacks() {
                    callback(&change.path, &change.value);
                }
            }
        }
        for callback in batch_callbacks {
            callback(&changes);
        }
    }

    pub fn is_in_batch(&self) -> bool {
        self.state.lock().in_batch
    }

    /// Paths changed so far in the open batch window.
    pub fn pending_batch_paths(&self) -> Vec<String> {
        self.state
            .lock()
            .batch_changes
            .iter()
            .map(|c| c.path.clone())
            .collect()
    }

    pub fn add_global_changed_callback(&self, callback: ChangedCallback) -> CallbackId {
        let id = CallbackId::next();
        self.state.lock().global_callbacks.push((id, callback));
        id
    }

    pub fn remove_global_changed_callback(&self, id: CallbackId) -> bool {
        let mut state = self.state.lock();
        let before = state.global_callbacks.len();
        state.global_callbacks.retain(|(cid, _)| *cid != id);
        state.global_callbacks.len() != before
    }

    pub fn add_batch_update_callback(&self, callback: BatchCallback) -> CallbackId {
        let id = CallbackId::next();
        self.state.lock().batch_callbacks.push((id, callback));
        id
    }

    pub fn remove_batch_update_callback(&self, id: CallbackId) -> bool {
        let mut state = self.state.lock();
        let before = state.batch_callbacks.len();
        state.batch_callbacks.retain(|(cid, _)| *cid != id);
        state.batch_callbacks.len() != before
    }

    /// Attach a callback to a single leaf. Returns `None` if `path` is not a
    /// registered parameter.
    pub fn add_changed_callback(&self, path: &str, callback: ChangedCallback) -> Option<CallbackId> {
        let node = self.find_parameter(path)?;
        node.parameter().map(|leaf| leaf.add_changed_callback(callback))
    }

    pub fn remove_changed_callback(&self, path: &str, id: CallbackId) -> bool {
        self.find_parameter(path)
            .and_then(|node| node.parameter().map(|leaf| leaf.remove_changed_callback(id)))
            .unwrap_or(false)
    }

    /// Detach the subtree at `path`. Detached nodes keep their arena slot but
    /// are no longer reachable by path.
    pub fn remove_node(&self, path: &str) -> Result<()> {
        split_path(path)?;
        let node = self
            .find_node(path)
            .ok_or_else(|| Error::NotFound(path.to_string()))?;
        let parent = node
            .parent
            .and_then(|id| self.node(id))
            .ok_or_else(|| Error::InvalidPath(path.to_string()))?;
        parent.children.lock().remove(&node.name);

        let mut stack = vec![node];
        while let Some(n) = stack.pop() {
            n.detached.store(true, Ordering::Release);
            let ids: Vec<NodeId> = n.children.lock().values().copied().collect();
            stack.extend(ids.into_iter().filter_map(|id| self.node(id)));
        }
        debug!("[TREE] Removed {}", path);
        Ok(())
    }

    fn collect_leaves(&self, start: Arc<ParameterNode>) -> Vec<String> {
        let mut paths = Vec::new();
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            if node.is_parameter() {
                paths.push(node.path.clone());
            }
            let ids: Vec<NodeId> = node.children.lock().values().copied().collect();
            stack.extend(ids.into_iter().filter_map(|id| self.node(id)));
        }
        paths.sort();
        paths
    }

    /// Every registered leaf path, sorted.
    pub fn all_parameter_paths(&self) -> Vec<String> {
        self.collect_leaves(self.root())
    }

    /// Leaf paths under `category`, sorted. Empty if the category is unknown.
    pub fn parameter_paths_in_category(&self, category: &str) -> Vec<String> {
        match self.find_node(category) {
            Some(node) => self.collect_leaves(node),
            None => Vec::new(),
        }
    }

    fn node_to_json(&self, node: &ParameterNode) -> Result<serde_json::Value> {
        if let Some(leaf) = node.parameter() {
            return Ok(serde_json::to_value(leaf.value())?);
        }
        let mut map = serde_json::Map::new();
        let children: Vec<(String, NodeId)> = node
            .children
            .lock()
            .iter()
            .map(|(name, id)| (name.clone(), *id))
            .collect();
        for (name, id) in children {
            if let Some(child) = self.node(id) {
                map.insert(name, self.node_to_json(&child)?);
            }
        }
        Ok(serde_json::Value::Object(map))
    }

    /// The whole tree as nested JSON. Leaves are `{"type", "value"}` objects.
    pub fn to_json_value(&self) -> Result<serde_json::Value> {
        self.node_to_json(&self.root())
    }

    pub fn serialize_to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_json_value()?)?)
    }

    /// Apply a JSON document produced by [`serialize_to_json`](Self::serialize_to_json).
    ///
    /// Every registered path is set through the validated path inside one
    /// batch window. Unregistered paths are counted, never created.
    pub fn deserialize_from_json(&self, json: &str) -> Result<LoadReport> {
        let doc: serde_json::Value = serde_json::from_str(json)?;
        let serde_json::Value::Object(map) = &doc else {
            return Err(Error::Custom("parameter document must be a JSON object".into()));
        };

        let opened = self.begin_batch_update();
        let mut report = LoadReport::default();
        self.load_object("", map, &mut report);
        if opened {
            self.end_batch_update();
        }
        info!(
            "[TREE] Loaded parameters: applied={}, rejected={}, unknown={}",
            report.applied, report.rejected, report.unknown
        );
        Ok(report)
    }

    fn load_object(
        &self,
        prefix: &str,
        map: &serde_json::Map<String, serde_json::Value>,
        report: &mut LoadReport,
    ) {
        for (key, value) in map {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{}/{}", prefix, key)
            };

            if let Some(node) = self.find_parameter(&path) {
                let current = node
                    .parameter()
                    .map(Parameter::value)
                    .unwrap_or_default();
                let parsed = serde_json::from_value::<ParameterValue>(value.clone())
                    .ok()
                    .and_then(|v| v.coerce_to(&current));
                match parsed {
                    Some(v) => {
                        if self.set_parameter_value(&path, v).is_applied() {
                            report.applied += 1;
                        } else {
                            report.rejected += 1;
                        }
                    }
                    None => {
                        warn!("[TREE] Cannot load {} from {}", path, value);
                        report.rejected += 1;
                    }
                }
                continue;
            }

            match value {
                serde_json::Value::Object(inner)
                    if !is_leaf_document(inner) || self.find_node(&path).is_some() =>
                {
                    self.load_object(&path, inner, report)
                }
                _ => {
                    debug!("[TREE] Skipping unknown parameter {}", path);
                    report.unknown += 1;
                }
            }
        }
    }
}

fn is_leaf_document(map: &serde_json::Map<String, serde_json::Value>) -> bool {
    map.get("type").is_some_and(serde_json::Value::is_string) && map.len() <= 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Color, DisplayMode};

    #[test]
    fn test_split_path() {
        assert_eq!(split_path("/a/b/").unwrap(), vec!["a", "b"]);
        assert!(split_path("").is_err());
        assert!(split_path("a//b").is_err());
    }

    #[test]
    fn test_register_creates_categories() {
        let tree = ParameterTree::new();
        let leaf = tree
            .register_parameter("geometry/transform/position/x", 0.0.into())
            .unwrap();
        assert_eq!(leaf.path(), "geometry/transform/position/x");
        assert_eq!(leaf.node_type(), ParameterNodeType::Parameter);

        let category = tree.find_node("geometry/transform").unwrap();
        assert_eq!(category.node_type(), ParameterNodeType::Category);
        assert_eq!(category.child_names(), vec!["position".to_string()]);
        assert_eq!(leaf.parent().and_then(|id| tree.node(id)).unwrap().name(), "position");
    }

    #[test]
    fn test_path_conflicts() {
        let tree = ParameterTree::new();
        tree.register_parameter("a/b", 1.into()).unwrap();
        assert!(matches!(
            tree.register_parameter("a/b/c", 1.into()),
            Err(Error::PathConflict(_))
        ));
        assert!(matches!(
            tree.register_parameter("a", 1.into()),
            Err(Error::PathConflict(_))
        ));
    }

    #[test]
    fn test_leaf_callback_and_removal() {
        let tree = ParameterTree::new();
        tree.register_parameter("display/mode", DisplayMode::Solid.into())
            .unwrap();
        let hits = Arc::new(Mutex::new(Vec::new()));
        let sink = hits.clone();
        let id = tree
            .add_changed_callback(
                "display/mode",
                Arc::new(move |_, v| sink.lock().push(v.clone())),
            )
            .unwrap();

        tree.set_parameter_value("display/mode", DisplayMode::Wireframe.into());
        assert!(tree.remove_changed_callback("display/mode", id));
        tree.set_parameter_value("display/mode", DisplayMode::Points.into());

        assert_eq!(
            *hits.lock(),
            vec![ParameterValue::DisplayMode(DisplayMode::Wireframe)]
        );
    }

    #[test]
    fn test_batch_deduplicates_and_keeps_last() {
        let tree = ParameterTree::new();
        tree.register_parameter("a/x", 0.into()).unwrap();
        tree.register_parameter("a/y", 0.into()).unwrap();
        let flushed = Arc::new(Mutex::new(Vec::new()));
        let sink = flushed.clone();
        tree.add_batch_update_callback(Arc::new(move |changes| {
            sink.lock().push(changes.to_vec())
        }));

        assert!(tree.begin_batch_update());
        assert!(!tree.begin_batch_update());
        tree.set_parameter_value("a/x", 1.into());
        tree.set_parameter_value("a/y", 2.into());
        tree.set_parameter_value("a/x", 3.into());
        assert_eq!(tree.pending_batch_paths(), vec!["a/x", "a/y"]);
        tree.end_batch_update();

        let flushed = flushed.lock();
        assert_eq!(flushed.len(), 1);
        assert_eq!(
            flushed[0],
            vec![
                ParameterChange::new("a/x", 3.into()),
                ParameterChange::new("a/y", 2.into()),
            ]
        );
    }

    #[test]
    fn test_reset_to_default_bypasses_validator() {
        let tree = ParameterTree::new();
        tree.register_parameter_with_validator(
            "quality/level",
            5.into(),
            Arc::new(|v| v.as_i64().is_some_and(|i| i > 10)),
        )
        .unwrap();
        assert_eq!(
            tree.set_parameter_value("quality/level", 3.into()),
            UpdateOutcome::ValidationRejected
        );
        assert_eq!(tree.set_parameter_value("quality/level", 11.into()), UpdateOutcome::Applied);
        assert_eq!(tree.reset_to_default("quality/level"), UpdateOutcome::Applied);
        assert_eq!(tree.get_parameter_value("quality/level"), ParameterValue::Integer(5));
        assert_eq!(tree.reset_to_default("quality/nope"), UpdateOutcome::NotFound);
    }

    #[test]
    fn test_remove_node_detaches_subtree() {
        let tree = ParameterTree::new();
        let x = tree.register_parameter("shadow/softness/x", 1.0.into()).unwrap();
        tree.register_parameter("shadow/mode", 1.into()).unwrap();

        tree.remove_node("shadow/softness").unwrap();
        assert!(!x.is_attached());
        assert!(!tree.has_parameter("shadow/softness/x"));
        assert_eq!(tree.all_parameter_paths(), vec!["shadow/mode"]);
        assert!(tree.node(x.id()).is_some());
        assert!(matches!(tree.remove_node("shadow/softness"), Err(Error::NotFound(_))));
        assert!(tree.remove_node("").is_err());
    }

    #[test]
    fn test_json_shape_and_load_report() {
        let tree = ParameterTree::new();
        tree.register_parameter("material/color/diffuse", Color::rgb(0.5, 0.5, 0.5).into())
            .unwrap();
        tree.register_parameter("material/shininess", 30.0.into())
            .unwrap();

        let json = tree.to_json_value().unwrap();
        assert_eq!(
            json["material"]["shininess"],
            serde_json::json!({"type": "double", "value": 30.0})
        );

        let doc = serde_json::json!({
            "material": {
                "shininess": {"type": "integer", "value": 64},
                "color": {"diffuse": {"type": "string", "value": "oops"}},
                "roughness": {"type": "double", "value": 0.2}
            },
            "unknown_category": {"leaf": {"type": "bool", "value": true}}
        });
        let report = tree.deserialize_from_json(&doc.to_string()).unwrap();
        assert_eq!(
            report,
            LoadReport {
                applied: 1,
                rejected: 1,
                unknown: 2
            }
        );
        assert_eq!(
            tree.get_parameter_value("material/shininess"),
            ParameterValue::Double(64.0)
        );
        assert!(!tree.has_parameter("material/roughness"));
        assert!(!tree.is_in_batch());

        assert!(tree.deserialize_from_json("[1, 2]").is_err());
        assert!(matches!(tree.deserialize_from_json("{"), Err(Error::Json(_))));
    }

    #[test]
    fn test_load_counts_validator_rejections() {
        let tree = ParameterTree::new();
        tree.register_parameter_with_validator(
            "lighting/ambient/intensity",
            0.2.into(),
            Arc::new(|v| v.as_f64().is_some_and(|x| (0.0..=1.0).contains(&x))),
        )
        .unwrap();
        tree.register_parameter("lighting/ambient/enabled", true.into())
            .unwrap();

        let doc = serde_json::json!({
            "lighting": {"ambient": {
                "intensity": {"type": "double", "value": 4.0},
                "enabled": {"type": "bool", "value": false}
            }}
        });
        let report = tree.deserialize_from_json(&doc.to_string()).unwrap();
        assert_eq!(report.applied, 1);
        assert_eq!(report.rejected, 1);
        assert_eq!(
            tree.get_parameter_value("lighting/ambient/intensity"),
            ParameterValue::Double(0.2)
        );
        assert_eq!(
            tree.get_parameter_value("lighting/ambient/enabled"),
            ParameterValue::Bool(false)
        );
    }
}
