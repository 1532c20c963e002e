//! Prioritized, merged and throttled refresh dispatch.
//!
//! Parameter changes become [`UpdateTask`]s. Processing a queue sorts it by
//! priority, merges tasks of the same [`UpdateType`] and then runs each type
//! once across every registered [`UpdateInterface`].

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, trace};

use crate::error::UpdateOutcome;
use crate::mapping::ParameterUpdateMapping;
use crate::value::{ParameterChange, ParameterValue};

pub const DEFAULT_MAX_UPDATES_PER_SECOND: u32 = 60;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, strum::Display, strum::EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum UpdateType {
    Geometry,
    Rendering,
    Display,
    Lighting,
    Material,
    Texture,
    Shadow,
    Quality,
    Transform,
    Color,
    FullRefresh,
}

/// Ordered `Low < Normal < High < Critical`.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    strum::Display,
    strum::EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum UpdatePriority {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

pub type UpdateAction = Arc<dyn Fn() + Send + Sync>;

#[derive(Clone)]
pub struct UpdateTask {
    pub update_type: UpdateType,
    pub priority: UpdatePriority,
    pub path: String,
    pub value: ParameterValue,
    pub timestamp: Instant,
    pub action: Option<UpdateAction>,
}

impl UpdateTask {
    pub fn new(
        update_type: UpdateType,
        priority: UpdatePriority,
        path: impl Into<String>,
        value: ParameterValue,
    ) -> Self {
        Self {
            update_type,
            priority,
            path: path.into(),
            value,
            timestamp: Instant::now(),
            action: None,
        }
    }

    /// Attach a closure that runs when this task survives merging.
    pub fn with_action(mut self, action: impl Fn() + Send + Sync + 'static) -> Self {
        self.action = Some(Arc::new(action));
        self
    }
}

impl fmt::Debug for UpdateTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateTask")
            .field("update_type", &self.update_type)
            .field("priority", &self.priority)
            .field("path", &self.path)
            .field("value", &self.value)
            .field("has_action", &self.action.is_some())
            .finish()
    }
}

/// A live object that wants refresh notifications.
///
/// Every hook defaults to a no-op so implementors only override what they
/// react to.
pub trait UpdateInterface: Send + Sync {
    fn update_geometry(&self) {}
    fn update_rendering(&self) {}
    fn update_display(&self) {}
    fn update_lighting(&self) {}
    fn update_material(&self) {}
    fn update_texture(&self) {}
    fn update_shadow(&self) {}
    fn update_quality(&self) {}
    fn update_transform(&self) {}
    fn update_color(&self) {}
    fn full_refresh(&self) {}

    fn dispatch(&self, update_type: UpdateType) {
        match update_type {
            UpdateType::Geometry => self.update_geometry(),
            UpdateType::Rendering => self.update_rendering(),
            UpdateType::Display => self.update_display(),
            UpdateType::Lighting => self.update_lighting(),
            UpdateType::Material => self.update_material(),
            UpdateType::Texture => self.update_texture(),
            UpdateType::Shadow => self.update_shadow(),
            UpdateType::Quality => self.update_quality(),
            UpdateType::Transform => self.update_transform(),
            UpdateType::Color => self.update_color(),
            UpdateType::FullRefresh => self.full_refresh(),
        }
    }
}

fn same_interface(a: &Arc<dyn UpdateInterface>, b: &Arc<dyn UpdateInterface>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Snapshot of the manager's counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UpdateStats {
    pub scheduled: usize,
    pub throttled: usize,
    pub executed: usize,
    pub passes: usize,
}

#[derive(Debug, Default)]
struct StatCounters {
    scheduled: AtomicUsize,
    throttled: AtomicUsize,
    executed: AtomicUsize,
    passes: AtomicUsize,
}

pub struct ParameterUpdateManager {
    tasks: Mutex<Vec<UpdateTask>>,
    interfaces: Mutex<Vec<Arc<dyn UpdateInterface>>>,
    strategies: Mutex<HashMap<UpdateType, UpdateAction>>,
    mapping: RwLock<ParameterUpdateMapping>,
    // `Some` while a batch is open.
    batch: Mutex<Option<Vec<ParameterChange>>>,
    optimization: AtomicBool,
    max_updates_per_second: AtomicU32,
    last_update: Mutex<Option<Instant>>,
    debug_mode: AtomicBool,
    stats: StatCounters,
}

impl Default for ParameterUpdateManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ParameterUpdateManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterUpdateManager")
            .field("pending", &self.pending_task_count())
            .field("interfaces", &self.interface_count())
            .field("in_batch", &self.is_in_batch())
            .field("optimization", &self.is_optimization_enabled())
            .finish_non_exhaustive()
    }
}

impl ParameterUpdateManager {
    pub fn new() -> Self {
        Self::with_mapping(ParameterUpdateMapping::default())
    }

    pub fn with_mapping(mapping: ParameterUpdateMapping) -> Self {
        Self {
            tasks: Mutex::new(Vec::new()),
            interfaces: Mutex::new(Vec::new()),
            strategies: Mutex::new(HashMap::new()),
            mapping: RwLock::new(mapping),
            batch: Mutex::new(None),
            optimization: AtomicBool::new(true),
            max_updates_per_second: AtomicU32::new(DEFAULT_MAX_UPDATES_PER_SECOND),
            last_update: Mutex::new(None),
            debug_mode: AtomicBool::new(false),
            stats: StatCounters::default(),
        }
    }

    pub fn register_update_interface(&self, interface: Arc<dyn UpdateInterface>) {
        let mut interfaces = self.interfaces.lock();
        if !interfaces.iter().any(|i| same_interface(i, &interface)) {
            interfaces.push(interface);
        }
    }

    /// Remove by `Arc` identity. Returns `false` if it was not registered.
    pub fn unregister_update_interface(&self, interface: &Arc<dyn UpdateInterface>) -> bool {
        let mut interfaces = self.interfaces.lock();
        let before = interfaces.len();
        interfaces.retain(|i| !same_interface(i, interface));
        interfaces.len() != before
    }

    pub fn interface_count(&self) -> usize {
        self.interfaces.lock().len()
    }

    fn log_change(&self, path: &str, value: &ParameterValue) {
        if self.debug_mode.load(Ordering::Relaxed) {
            debug!("[UPDATE] Parameter changed: {} = {}", path, value);
        } else {
            trace!("[UPDATE] Parameter changed: {} = {}", path, value);
        }
    }

    /// Tree change hook. Records the change while batching, schedules it
    /// otherwise.
    pub fn on_parameter_changed(&self, path: &str, value: &ParameterValue) -> UpdateOutcome {
        self.log_change(path, value);
        if let Some(changes) = self.batch.lock().as_mut() {
            changes.push(ParameterChange::new(path, value.clone()));
            return UpdateOutcome::Applied;
        }
        self.schedule_update(path, value.clone())
    }

    /// Enqueue one task per change, bypassing the throttle, then process.
    #[tracing::instrument(name = "batch_update", level = "debug", skip_all, fields(changes = changes.len()))]
    pub fn on_batch_update(&self, changes: &[ParameterChange]) {
        debug!("[UPDATE] Batch update with {} parameter(s)", changes.len());
        {
            let mapping = self.mapping.read();
            let mut tasks = self.tasks.lock();
            for change in changes {
                let (update_type, priority) = mapping.lookup(&change.path);
                let task = UpdateTask::new(update_type, priority, &change.path, change.value.clone());
                match tasks
                    .iter_mut()
                    .find(|t| t.path == task.path && t.update_type == task.update_type)
                {
                    Some(existing) => *existing = task,
                    None => tasks.push(task),
                }
            }
        }
        self.stats
            .scheduled
            .fetch_add(changes.len(), Ordering::Relaxed);
        self.process_update_tasks();
    }

    /// Map `path` to a task and enqueue it unless throttled. High and
    /// Critical tasks are processed immediately.
    #[tracing::instrument(name = "schedule_update", level = "debug", skip(self, value))]
    pub fn schedule_update(&self, path: &str, value: ParameterValue) -> UpdateOutcome {
        if self.should_skip_update() {
            self.stats.throttled.fetch_add(1, Ordering::Relaxed);
            trace!("[UPDATE] Throttled {}", path);
            return UpdateOutcome::Throttled;
        }

        let (update_type, priority) = self.mapping.read().lookup(path);
        self.add_update_task(UpdateTask::new(update_type, priority, path, value));
        self.stats.scheduled.fetch_add(1, Ordering::Relaxed);

        if priority >= UpdatePriority::High {
            self.process_update_tasks();
        }
        UpdateOutcome::Applied
    }

    /// Global rate limiter shared by every path. Stamps the window when the
    /// update is let through.
    fn should_skip_update(&self) -> bool {
        let now = Instant::now();
        let mut last = self.last_update.lock();
        if self.optimization.load(Ordering::Acquire)
            && let Some(previous) = *last
            && now.duration_since(previous) < self.min_update_interval()
        {
            return true;
        }
        *last = Some(now);
        false
    }

    fn min_update_interval(&self) -> Duration {
        match self.max_updates_per_second.load(Ordering::Relaxed) {
            0 => Duration::ZERO,
            max => Duration::from_millis(1000 / max as u64),
        }
    }

    pub fn add_update_task(&self, task: UpdateTask) {
        self.tasks.lock().push(task);
    }

    pub fn clear_update_tasks(&self) {
        self.tasks.lock().clear();
    }

    pub fn pending_task_count(&self) -> usize {
        self.tasks.lock().len()
    }

    pub fn pending_parameter_paths(&self) -> Vec<String> {
        self.tasks.lock().iter().map(|t| t.path.clone()).collect()
    }

    /// Drain the queue and run it. Returns the number of distinct update
    /// types executed.
    pub fn process_update_tasks(&self) -> usize {
        let mut tasks = std::mem::take(&mut *self.tasks.lock());
        if tasks.is_empty() {
            return 0;
        }

        tasks.sort_by(|a, b| b.priority.cmp(&a.priority));
        if self.optimization.load(Ordering::Acquire) {
            tasks = merge_update_tasks(tasks);
        }

        let interfaces: Vec<Arc<dyn UpdateInterface>> = self.interfaces.lock().clone();
        let strategies = self.strategies.lock().clone();

        let mut executed = HashSet::new();
        for task in &tasks {
            if executed.insert(task.update_type) {
                debug!(
                    "[UPDATE] Executing {} ({}) on {} interface(s)",
                    task.update_type,
                    task.priority,
                    interfaces.len()
                );
                for interface in &interfaces {
                    interface.dispatch(task.update_type);
                }
                if let Some(strategy) = strategies.get(&task.update_type) {
                    strategy();
                }
            }
            if let Some(action) = &task.action {
                action();
            }
        }

        self.stats
            .executed
            .fetch_add(executed.len(), Ordering::Relaxed);
        self.stats.passes.fetch_add(1, Ordering::Relaxed);
        executed.len()
    }

    pub fn begin_batch_update(&self) {
        *self.batch.lock() = Some(Vec::new());
    }

    /// Leave batching and dispatch whatever was recorded meanwhile.
    pub fn end_batch_update(&self) {
        let changes = self.batch.lock().take().unwrap_or_default();
        if !changes.is_empty() {
            self.on_batch_update(&changes);
        }
    }

    pub fn is_in_batch(&self) -> bool {
        self.batch.lock().is_some()
    }

    /// Run `strategy` once whenever `update_type` executes.
    pub fn set_update_strategy(
        &self,
        update_type: UpdateType,
        strategy: impl Fn() + Send + Sync + 'static,
    ) {
        self.strategies.lock().insert(update_type, Arc::new(strategy));
    }

    pub fn clear_update_strategy(&self, update_type: UpdateType) {
        self.strategies.lock().remove(&update_type);
    }

    pub fn enable_update_optimization(&self, enabled: bool) {
        self.optimization.store(enabled, Ordering::Release);
    }

    pub fn is_optimization_enabled(&self) -> bool {
        self.optimization.load(Ordering::Acquire)
    }

    /// `0` disables the rate limit.
    pub fn set_update_frequency_limit(&self, max_updates_per_second: u32) {
        self.max_updates_per_second
            .store(max_updates_per_second, Ordering::Relaxed);
    }

    pub fn update_frequency_limit(&self) -> u32 {
        self.max_updates_per_second.load(Ordering::Relaxed)
    }

    pub fn enable_debug_mode(&self, enabled: bool) {
        self.debug_mode.store(enabled, Ordering::Relaxed);
    }

    pub fn is_debug_mode(&self) -> bool {
        self.debug_mode.load(Ordering::Relaxed)
    }

    /// Add or replace a path mapping at runtime.
    pub fn map_parameter(&self, path: &str, update_type: UpdateType, priority: UpdatePriority) {
        self.mapping.write().insert(path, update_type, priority);
    }

    pub fn lookup(&self, path: &str) -> (UpdateType, UpdatePriority) {
        self.mapping.read().lookup(path)
    }

    pub fn affected_update_types(&self, path: &str) -> Vec<UpdateType> {
        self.mapping.read().affected_update_types(path)
    }

    pub fn stats(&self) -> UpdateStats {
        UpdateStats {
            scheduled: self.stats.scheduled.load(Ordering::Relaxed),
            throttled: self.stats.throttled.load(Ordering::Relaxed),
            executed: self.stats.executed.load(Ordering::Relaxed),
            passes: self.stats.passes.load(Ordering::Relaxed),
        }
    }
}

/// Keep one task per update type, at the position of its first occurrence,
/// carrying the newest payload.
fn merge_update_tasks(tasks: Vec<UpdateTask>) -> Vec<UpdateTask> {
    let mut index: HashMap<UpdateType, usize> = HashMap::new();
    let mut merged: Vec<UpdateTask> = Vec::with_capacity(tasks.len());
    for task in tasks {
        match index.get(&task.update_type) {
            Some(&i) => {
                if task.timestamp >= merged[i].timestamp {
                    merged[i] = task;
                }
            }
            None => {
                index.insert(task.update_type, merged.len());
                merged.push(task);
            }
        }
    }
    merged
}
