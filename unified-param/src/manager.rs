//! The facade that wires tree, update manager and synchronizer together.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::ManagerConfig;
use crate::error::{Error, Result, UpdateOutcome};
use crate::mapping::ParameterUpdateMapping;
use crate::object::{
    GeometryObject, GeometryUpdateInterface, ObjectId, RenderingConfigObject,
    RenderingConfigUpdateInterface,
};
use crate::sync::ParameterSynchronizer;
use crate::tree::{CallbackId, LoadReport, ParameterTree};
use crate::update::{ParameterUpdateManager, UpdateInterface};
use crate::value::{FromParameterValue, ParameterValue};
use crate::yaml;

#[derive(Default)]
struct BatchState {
    depth: usize,
    changed: Vec<String>,
}

/// One entry point for parameters, live objects and batch edits.
///
/// Build it with [`UnifiedParameterManagerBuilder`](crate::UnifiedParameterManagerBuilder).
pub struct UnifiedParameterManager {
    tree: Arc<ParameterTree>,
    updates: Arc<ParameterUpdateManager>,
    sync: Arc<ParameterSynchronizer>,
    batch: Mutex<BatchState>,
    interfaces: Mutex<HashMap<ObjectId, Arc<dyn UpdateInterface>>>,
    tree_callbacks: (CallbackId, CallbackId),
}

impl fmt::Debug for UnifiedParameterManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnifiedParameterManager")
            .field("tree", &self.tree)
            .field("updates", &self.updates)
            .field("sync", &self.sync)
            .field("batch_depth", &self.batch_depth())
            .finish()
    }
}

impl UnifiedParameterManager {
    pub(crate) fn with_parts(
        tree: Arc<ParameterTree>,
        mapping: ParameterUpdateMapping,
        config: &ManagerConfig,
    ) -> Self {
        // The synchronizer subscribes first so objects hold their new values
        // before any refresh hook runs.
        let sync = ParameterSynchronizer::new(tree.clone());
        sync.set_default_sync_direction(config.default_sync_direction);

        let updates = Arc::new(ParameterUpdateManager::with_mapping(mapping));
        updates.enable_update_optimization(config.optimization_enabled);
        updates.set_update_frequency_limit(config.max_updates_per_second);
        updates.enable_debug_mode(config.debug_mode);

        let weak: Weak<ParameterUpdateManager> = Arc::downgrade(&updates);
        let global = tree.add_global_changed_callback(Arc::new(move |path, value| {
            if let Some(updates) = weak.upgrade() {
                updates.on_parameter_changed(path, value);
            }
        }));
        let weak = Arc::downgrade(&updates);
        let batch = tree.add_batch_update_callback(Arc::new(move |changes| {
            if let Some(updates) = weak.upgrade() {
                updates.on_batch_update(changes);
            }
        }));

        info!(
            "[PARAMS] Manager ready: {} parameters, optimization={}, max_ups={}",
            tree.all_parameter_paths().len(),
            config.optimization_enabled,
            config.max_updates_per_second
        );

        Self {
            tree,
            updates,
            sync,
            batch: Mutex::new(BatchState::default()),
            interfaces: Mutex::new(HashMap::new()),
            tree_callbacks: (global, batch),
        }
    }

    pub fn tree(&self) -> &Arc<ParameterTree> {
        &self.tree
    }

    pub fn update_manager(&self) -> &Arc<ParameterUpdateManager> {
        &self.updates
    }

    pub fn synchronizer(&self) -> &Arc<ParameterSynchronizer> {
        &self.sync
    }

    pub fn set_parameter(&self, path: &str, value: ParameterValue) -> UpdateOutcome {
        let outcome = self.tree.set_parameter_value(path, value);
        if outcome.is_applied() {
            let mut batch = self.batch.lock();
            if batch.depth > 0 && !batch.changed.iter().any(|p| p == path) {
                batch.changed.push(path.to_string());
            }
        }
        outcome
    }

    pub fn get_parameter(&self, path: &str) -> ParameterValue {
        self.tree.get_parameter_value(path)
    }

    /// Typed read. Fails with `NotFound` or `TypeMismatch`.
    pub fn get<T: FromParameterValue>(&self, path: &str) -> Result<T> {
        if !self.tree.has_parameter(path) {
            return Err(Error::NotFound(path.to_string()));
        }
        self.tree.get_parameter_value(path).get()
    }

    pub fn has_parameter(&self, path: &str) -> bool {
        self.tree.has_parameter(path)
    }

    pub fn all_parameter_paths(&self) -> Vec<String> {
        self.tree.all_parameter_paths()
    }

    /// Open the tree, update and sync batch windows. Calls nest; only the
    /// outermost pair opens and closes them.
    pub fn begin_batch_operation(&self) {
        let mut batch = self.batch.lock();
        batch.depth += 1;
        if batch.depth > 1 {
            return;
        }
        batch.changed.clear();
        self.tree.begin_batch_update();
        self.updates.begin_batch_update();
        self.sync.begin_batch_sync();
        debug!("[PARAMS] Batch operation opened");
    }

    /// Close the windows in reverse order: sync, updates, tree. Deferred
    /// sync writes therefore land inside the tree's window and are flushed
    /// with it.
    pub fn end_batch_operation(&self) {
        {
            let mut batch = self.batch.lock();
            if batch.depth == 0 {
                warn!("[PARAMS] end_batch_operation without a matching begin");
                return;
            }
            batch.depth -= 1;
            if batch.depth > 0 {
                return;
            }
        }
        self.sync.end_batch_sync();
        self.updates.end_batch_update();
        self.tree.end_batch_update();
        debug!("[PARAMS] Batch operation closed");
    }

    /// Open a batch that closes when the guard is dropped.
    pub fn batch(&self) -> BatchOperation<'_> {
        self.begin_batch_operation();
        BatchOperation { manager: self }
    }

    pub fn is_in_batch_operation(&self) -> bool {
        self.batch_depth() > 0
    }

    pub fn batch_depth(&self) -> usize {
        self.batch.lock().depth
    }

    /// Paths set through [`set_parameter`](Self::set_parameter) during the
    /// current or most recent batch operation.
    pub fn changed_parameters(&self) -> Vec<String> {
        self.batch.lock().changed.clone()
    }

    /// Bind a geometry to the tree and register it for refreshes. Returns
    /// `false` if it was already registered.
    pub fn register_geometry(&self, geometry: Arc<dyn GeometryObject>) -> bool {
        let id = ObjectId::of(&geometry);
        if !self.sync.synchronize_geometry(geometry.clone()) {
            return false;
        }
        let interface: Arc<dyn UpdateInterface> = Arc::new(GeometryUpdateInterface::new(geometry));
        self.updates.register_update_interface(interface.clone());
        self.interfaces.lock().insert(id, interface);
        true
    }

    pub fn unregister_geometry<G: GeometryObject + ?Sized>(&self, geometry: &Arc<G>) -> bool {
        if !self.sync.unsynchronize_geometry(geometry) {
            return false;
        }
        self.drop_interface(ObjectId::of(geometry));
        true
    }

    pub fn register_rendering_config(&self, config: Arc<dyn RenderingConfigObject>) -> bool {
        let id = ObjectId::of(&config);
        if !self.sync.synchronize_rendering_config(config.clone()) {
            return false;
        }
        let interface: Arc<dyn UpdateInterface> =
            Arc::new(RenderingConfigUpdateInterface::new(config));
        self.updates.register_update_interface(interface.clone());
        self.interfaces.lock().insert(id, interface);
        true
    }

    pub fn unregister_rendering_config<C: RenderingConfigObject + ?Sized>(
        &self,
        config: &Arc<C>,
    ) -> bool {
        if !self.sync.unsynchronize_rendering_config(config) {
            return false;
        }
        self.drop_interface(ObjectId::of(config));
        true
    }

    fn drop_interface(&self, id: ObjectId) {
        if let Some(interface) = self.interfaces.lock().remove(&id) {
            self.updates.unregister_update_interface(&interface);
        }
    }

    pub fn registered_geometry_count(&self) -> usize {
        self.sync.synchronized_geometry_count()
    }

    pub fn registered_config_count(&self) -> usize {
        self.sync.synchronized_config_count()
    }

    pub fn enable_optimization(&self, enabled: bool) {
        self.updates.enable_update_optimization(enabled);
    }

    pub fn set_update_frequency_limit(&self, max_updates_per_second: u32) {
        self.updates.set_update_frequency_limit(max_updates_per_second);
    }

    pub fn enable_debug_mode(&self, enabled: bool) {
        self.updates.enable_debug_mode(enabled);
    }

    pub fn save_to_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path.as_ref(), self.tree.serialize_to_json()?)?;
        info!("[PARAMS] Saved parameters to {:?}", path.as_ref());
        Ok(())
    }

    /// Load a document written by [`save_to_json`](Self::save_to_json)
    /// inside one batch operation.
    pub fn load_from_json<P: AsRef<Path>>(&self, path: P) -> Result<LoadReport> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let _batch = self.batch();
        self.tree.deserialize_from_json(&content)
    }

    /// Apply a YAML override file inside one batch operation.
    pub fn apply_overrides_file<P: AsRef<Path>>(&self, path: P) -> Result<LoadReport> {
        let overrides = yaml::load_override_file(path.as_ref())?;
        let _batch = self.batch();
        let report = yaml::apply_overrides(&self.tree, &overrides);
        info!(
            "[PARAMS] Applied overrides from {:?}: applied={}, rejected={}, unknown={}",
            path.as_ref(),
            report.applied,
            report.rejected,
            report.unknown
        );
        Ok(report)
    }
}

impl Drop for UnifiedParameterManager {
    fn drop(&mut self) {
        self.tree.remove_global_changed_callback(self.tree_callbacks.0);
        self.tree.remove_batch_update_callback(self.tree_callbacks.1);
    }
}

/// RAII batch operation returned by [`UnifiedParameterManager::batch`].
#[must_use = "the batch closes as soon as the guard is dropped"]
pub struct BatchOperation<'a> {
    manager: &'a UnifiedParameterManager,
}

impl BatchOperation<'_> {
    pub fn set(&self, path: &str, value: impl Into<ParameterValue>) -> UpdateOutcome {
        self.manager.set_parameter(path, value.into())
    }
}

impl Drop for BatchOperation<'_> {
    fn drop(&mut self) {
        self.manager.end_batch_operation();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Builder, UnifiedParameterManagerBuilder};

    fn manager() -> UnifiedParameterManager {
        UnifiedParameterManagerBuilder::default().build().unwrap()
    }

    #[test]
    fn test_nested_batches() {
        let m = manager();
        m.begin_batch_operation();
        m.begin_batch_operation();
        assert_eq!(m.batch_depth(), 2);
        m.set_parameter("geometry/transform/scale", 2.0.into());
        m.end_batch_operation();
        assert!(m.tree().is_in_batch());
        m.end_batch_operation();
        assert!(!m.tree().is_in_batch());
        assert!(!m.update_manager().is_in_batch());
        assert!(!m.synchronizer().is_in_batch());

        // Unbalanced end is ignored.
        m.end_batch_operation();
        assert_eq!(m.batch_depth(), 0);
    }

    #[test]
    fn test_changed_parameters_recorded_in_batch() {
        let m = manager();
        m.set_parameter("geometry/transform/scale", 3.0.into());
        assert!(m.changed_parameters().is_empty());
        {
            let batch = m.batch();
            batch.set("material/properties/shininess", 50.0);
            batch.set("material/properties/shininess", 60.0);
            batch.set("does/not/exist", 1.0);
        }
        assert_eq!(m.changed_parameters(), vec!["material/properties/shininess"]);
        assert_eq!(m.get::<f64>("material/properties/shininess").unwrap(), 60.0);
    }

    #[test]
    fn test_typed_get_errors() {
        let m = manager();
        assert!(matches!(m.get::<f64>("nope"), Err(Error::NotFound(_))));
        assert!(matches!(
            m.get::<bool>("geometry/transform/scale"),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_drop_unsubscribes() {
        let tree = Arc::new(ParameterTree::new());
        let m = UnifiedParameterManagerBuilder::default()
            .with_tree(tree.clone())
            .build()
            .unwrap();
        let (global, batch) = m.tree_callbacks;
        drop(m);
        assert!(!tree.remove_global_changed_callback(global));
        assert!(!tree.remove_batch_update_callback(batch));
        assert!(tree.has_parameter("geometry/transform/scale"));
    }
}
