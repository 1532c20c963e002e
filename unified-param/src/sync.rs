//! Two-way synchronization between the tree and live objects.
//!
//! Tree changes are pushed into every object bound to the changed path.
//! Objects report their own property changes through a
//! [`PropertyChangeNotifier`]; those reports are queued on a channel and
//! written back into the tree by [`ParameterSynchronizer::process_system_changes`]
//! where the path's direction allows it.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::binding::{ConfigBinding, GeometryBinding, PropertyBinding};
use crate::object::{GeometryObject, ObjectId, RenderingConfigObject};
use crate::tree::{CallbackId, ParameterTree};
use crate::value::{ParameterChange, ParameterValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncDirection {
    pub tree_to_system: bool,
    pub system_to_tree: bool,
}

impl SyncDirection {
    pub const TREE_TO_SYSTEM: SyncDirection = SyncDirection {
        tree_to_system: true,
        system_to_tree: false,
    };
    pub const SYSTEM_TO_TREE: SyncDirection = SyncDirection {
        tree_to_system: false,
        system_to_tree: true,
    };
    pub const BIDIRECTIONAL: SyncDirection = SyncDirection {
        tree_to_system: true,
        system_to_tree: true,
    };
    pub const NONE: SyncDirection = SyncDirection {
        tree_to_system: false,
        system_to_tree: false,
    };
}

impl Default for SyncDirection {
    fn default() -> Self {
        Self::TREE_TO_SYSTEM
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ObjectKind {
    Geometry,
    RenderingConfig,
}

struct SyncEntry {
    kind: ObjectKind,
    binding: Arc<dyn PropertyBinding>,
}

#[derive(Default)]
struct SyncState {
    entries: HashMap<ObjectId, SyncEntry>,
    by_path: HashMap<String, Vec<ObjectId>>,
}

#[derive(Debug)]
struct Notification {
    object: ObjectId,
    path: String,
}

/// Handed to a live object so it can report property changes it made
/// itself.
#[derive(Debug, Clone)]
pub struct PropertyChangeNotifier {
    object: ObjectId,
    sender: flume::Sender<Notification>,
}

impl PropertyChangeNotifier {
    pub fn object_id(&self) -> ObjectId {
        self.object
    }

    /// Queue a change report. Returns `false` once the synchronizer is gone.
    pub fn notify(&self, path: &str) -> bool {
        self.sender
            .send(Notification {
                object: self.object,
                path: path.to_string(),
            })
            .is_ok()
    }
}

pub struct ParameterSynchronizer {
    tree: Arc<ParameterTree>,
    state: RwLock<SyncState>,
    directions: RwLock<HashMap<String, SyncDirection>>,
    default_direction: RwLock<SyncDirection>,
    enabled: AtomicBool,
    in_batch: AtomicBool,
    deferred: Mutex<Vec<ParameterChange>>,
    sender: flume::Sender<Notification>,
    receiver: flume::Receiver<Notification>,
    tree_callbacks: (CallbackId, CallbackId),
}

impl fmt::Debug for ParameterSynchronizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterSynchronizer")
            .field("geometries", &self.synchronized_geometry_count())
            .field("configs", &self.synchronized_config_count())
            .field("enabled", &self.is_synchronization_enabled())
            .field("in_batch", &self.is_in_batch())
            .finish_non_exhaustive()
    }
}

impl ParameterSynchronizer {
    /// Create a synchronizer subscribed to `tree`'s change and batch
    /// callbacks. The subscriptions are removed when it is dropped.
    pub fn new(tree: Arc<ParameterTree>) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<Self>| {
            let w = weak.clone();
            let global = tree.add_global_changed_callback(Arc::new(move |path, value| {
                if let Some(sync) = w.upgrade() {
                    sync.on_tree_changed(path, value);
                }
            }));
            let w = weak.clone();
            let batch = tree.add_batch_update_callback(Arc::new(move |changes| {
                if let Some(sync) = w.upgrade() {
                    for change in changes {
                        sync.on_tree_changed(&change.path, &change.value);
                    }
                }
            }));
            let (sender, receiver) = flume::unbounded();
            Self {
                tree,
                state: RwLock::new(SyncState::default()),
                directions: RwLock::new(HashMap::new()),
                default_direction: RwLock::new(SyncDirection::default()),
                enabled: AtomicBool::new(true),
                in_batch: AtomicBool::new(false),
                deferred: Mutex::new(Vec::new()),
                sender,
                receiver,
                tree_callbacks: (global, batch),
            }
        })
    }

    pub fn tree(&self) -> &Arc<ParameterTree> {
        &self.tree
    }

    /// Start tracking a geometry. Returns `false` if it was already tracked.
    pub fn synchronize_geometry(&self, geometry: Arc<dyn GeometryObject>) -> bool {
        let id = ObjectId::of(&geometry);
        let name = geometry.name();
        let added = self.track(id, ObjectKind::Geometry, Arc::new(GeometryBinding::new(geometry)));
        if added {
            info!("[SYNC] Synchronizing geometry '{}' ({})", name, id);
        }
        added
    }

    pub fn unsynchronize_geometry<G: GeometryObject + ?Sized>(&self, geometry: &Arc<G>) -> bool {
        self.untrack(ObjectId::of(geometry), ObjectKind::Geometry)
    }

    /// Start tracking a rendering config. Returns `false` if it was already
    /// tracked.
    pub fn synchronize_rendering_config(&self, config: Arc<dyn RenderingConfigObject>) -> bool {
        let id = ObjectId::of(&config);
        let added = self.track(
            id,
            ObjectKind::RenderingConfig,
            Arc::new(ConfigBinding::new(config)),
        );
        if added {
            info!("[SYNC] Synchronizing rendering config ({})", id);
        }
        added
    }

    pub fn unsynchronize_rendering_config<C: RenderingConfigObject + ?Sized>(
        &self,
        config: &Arc<C>,
    ) -> bool {
        self.untrack(ObjectId::of(config), ObjectKind::RenderingConfig)
    }

    fn track(&self, id: ObjectId, kind: ObjectKind, binding: Arc<dyn PropertyBinding>) -> bool {
        let mut state = self.state.write();
        if state.entries.contains_key(&id) {
            return false;
        }
        for path in binding.paths() {
            state.by_path.entry(path.to_string()).or_default().push(id);
        }
        state.entries.insert(id, SyncEntry { kind, binding });
        true
    }

    fn untrack(&self, id: ObjectId, kind: ObjectKind) -> bool {
        let mut state = self.state.write();
        if !state.entries.get(&id).is_some_and(|e| e.kind == kind) {
            return false;
        }
        state.entries.remove(&id);
        state.by_path.retain(|_, ids| {
            ids.retain(|i| *i != id);
            !ids.is_empty()
        });
        debug!("[SYNC] Stopped synchronizing {} {}", kind, id);
        true
    }

    pub fn is_synchronized<T: ?Sized>(&self, object: &Arc<T>) -> bool {
        self.state.read().entries.contains_key(&ObjectId::of(object))
    }

    fn count_kind(&self, kind: ObjectKind) -> usize {
        self.state
            .read()
            .entries
            .values()
            .filter(|e| e.kind == kind)
            .count()
    }

    pub fn synchronized_geometry_count(&self) -> usize {
        self.count_kind(ObjectKind::Geometry)
    }

    pub fn synchronized_config_count(&self) -> usize {
        self.count_kind(ObjectKind::RenderingConfig)
    }

    /// `true` if at least one tracked object binds `path`.
    pub fn is_parameter_synchronized(&self, path: &str) -> bool {
        self.state.read().by_path.contains_key(path)
    }

    /// Paths bound by at least one tracked object, sorted.
    pub fn synchronized_parameters(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.state.read().by_path.keys().cloned().collect();
        paths.sort();
        paths
    }

    pub fn enable_synchronization(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    pub fn is_synchronization_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Override the direction for one path.
    pub fn set_sync_direction(&self, path: &str, direction: SyncDirection) {
        self.directions.write().insert(path.to_string(), direction);
    }

    pub fn clear_sync_direction(&self, path: &str) {
        self.directions.write().remove(path);
    }

    pub fn set_default_sync_direction(&self, direction: SyncDirection) {
        *self.default_direction.write() = direction;
    }

    pub fn default_sync_direction(&self) -> SyncDirection {
        *self.default_direction.read()
    }

    /// Effective direction for `path`: its override, else the default.
    pub fn sync_direction(&self, path: &str) -> SyncDirection {
        self.directions
            .read()
            .get(path)
            .copied()
            .unwrap_or_else(|| self.default_sync_direction())
    }

    fn bindings_for(&self, path: &str) -> Vec<Arc<dyn PropertyBinding>> {
        let state = self.state.read();
        state
            .by_path
            .get(path)
            .into_iter()
            .flatten()
            .filter_map(|id| state.entries.get(id).map(|e| e.binding.clone()))
            .collect()
    }

    fn binding_of(&self, id: ObjectId) -> Option<Arc<dyn PropertyBinding>> {
        self.state.read().entries.get(&id).map(|e| e.binding.clone())
    }

    fn on_tree_changed(&self, path: &str, value: &ParameterValue) {
        if !self.is_synchronization_enabled() || !self.sync_direction(path).tree_to_system {
            return;
        }
        for binding in self.bindings_for(path) {
            push_to_object(binding.as_ref(), path, value);
        }
    }

    /// Write to the tree unless it already holds `value`. Deferred while a
    /// batch sync is open.
    fn write_to_tree(&self, path: &str, value: ParameterValue) -> bool {
        if self.tree.get_parameter_value(path) == value {
            return false;
        }
        if self.is_in_batch() {
            let mut deferred = self.deferred.lock();
            match deferred.iter_mut().find(|c| c.path == path) {
                Some(change) => change.value = value,
                None => deferred.push(ParameterChange::new(path, value)),
            }
            trace!("[SYNC] Deferred {}", path);
            return true;
        }
        self.tree.set_parameter_value(path, value).is_applied()
    }

    /// A notifier that reports property changes of `object`.
    pub fn notifier_for<T: ?Sized>(&self, object: &Arc<T>) -> PropertyChangeNotifier {
        PropertyChangeNotifier {
            object: ObjectId::of(object),
            sender: self.sender.clone(),
        }
    }

    /// Drain queued object reports and write them to the tree where the
    /// path's system-to-tree direction is on. Returns the number written or
    /// deferred.
    pub fn process_system_changes(&self) -> usize {
        let pending: Vec<Notification> = self.receiver.try_iter().collect();
        pending
            .into_iter()
            .filter(|n| self.apply_system_change(n.object, &n.path))
            .count()
    }

    fn apply_system_change(&self, object: ObjectId, path: &str) -> bool {
        if !self.is_synchronization_enabled() || !self.sync_direction(path).system_to_tree {
            trace!("[SYNC] Ignoring system change {} on {}", path, object);
            return false;
        }
        let Some(binding) = self.binding_of(object).filter(|b| b.binds(path)) else {
            return false;
        };
        match binding.get(path) {
            Ok(value) => self.write_to_tree(path, value),
            Err(e) => {
                warn!("[SYNC] Cannot read {} from {}: {}", path, object, e);
                false
            }
        }
    }

    /// Push every bound path's tree value into `object`, ignoring direction.
    pub fn sync_from_tree<T: ?Sized>(&self, object: &Arc<T>) -> usize {
        let Some(binding) = self.binding_of(ObjectId::of(object)) else {
            return 0;
        };
        binding
            .paths()
            .iter()
            .filter(|path| self.tree.has_parameter(path))
            .filter(|path| {
                push_to_object(binding.as_ref(), path, &self.tree.get_parameter_value(path))
            })
            .count()
    }

    /// Pull every bound getter value of `object` into the tree, ignoring
    /// direction.
    pub fn sync_to_tree<T: ?Sized>(&self, object: &Arc<T>) -> usize {
        let Some(binding) = self.binding_of(ObjectId::of(object)) else {
            return 0;
        };
        let mut written = 0;
        for path in binding.paths() {
            if !self.tree.has_parameter(path) {
                continue;
            }
            match binding.get(path) {
                Ok(value) => {
                    if self.write_to_tree(path, value) {
                        written += 1;
                    }
                }
                Err(e) => warn!("[SYNC] Cannot read {}: {}", path, e),
            }
        }
        written
    }

    pub fn begin_batch_sync(&self) {
        self.in_batch.store(true, Ordering::Release);
    }

    /// Collect outstanding reports into the deferred set, then write it out.
    pub fn end_batch_sync(&self) {
        if !self.is_in_batch() {
            return;
        }
        self.process_system_changes();
        self.in_batch.store(false, Ordering::Release);
        let deferred = std::mem::take(&mut *self.deferred.lock());
        if !deferred.is_empty() {
            debug!("[SYNC] Flushing {} deferred change(s)", deferred.len());
        }
        for change in deferred {
            self.tree.set_parameter_value(&change.path, change.value);
        }
    }

    pub fn is_in_batch(&self) -> bool {
        self.in_batch.load(Ordering::Acquire)
    }

    pub fn pending_sync_paths(&self) -> Vec<String> {
        self.deferred.lock().iter().map(|c| c.path.clone()).collect()
    }
}

impl Drop for ParameterSynchronizer {
    fn drop(&mut self) {
        self.tree.remove_global_changed_callback(self.tree_callbacks.0);
        self.tree.remove_batch_update_callback(self.tree_callbacks.1);
    }
}

/// Set `value` on the object unless its getter already reports it.
fn push_to_object(binding: &dyn PropertyBinding, path: &str, value: &ParameterValue) -> bool {
    if binding.get(path).is_ok_and(|current| current == *value) {
        trace!("[SYNC] {} already current on {}", path, binding.object_id());
        return false;
    }
    match binding.set(path, value) {
        Ok(()) => {
            trace!("[SYNC] {} -> {}", path, binding.object_id());
            true
        }
        Err(e) => {
            warn!("[SYNC] Cannot apply {} to {}: {}", path, binding.object_id(), e);
            false
        }
    }
}
