//! Unified parameter management.
//!
//! A path-addressed tree of typed values (`geometry/transform/position/x`)
//! whose changes are fanned out to live geometry and rendering-config
//! objects. Three subsystems share one [`ParameterTree`]:
//!
//! - [`ParameterUpdateManager`] turns changes into prioritized, merged and
//!   throttled refresh calls on registered [`UpdateInterface`]s.
//! - [`ParameterSynchronizer`] binds tree paths to object properties in both
//!   directions.
//! - [`UnifiedParameterManager`] wires the two together and owns the batch
//!   lifecycle.
//!
//! ```no_run
//! use unified_param::prelude::*;
//!
//! let manager = UnifiedParameterManagerBuilder::default().build()?;
//! {
//!     let _batch = manager.batch();
//!     manager.set_parameter("geometry/transform/position/x", 5.0.into());
//!     manager.set_parameter("material/color/diffuse", Color::rgb(0.8, 0.2, 0.2).into());
//! }
//! # Ok::<(), unified_param::Error>(())
//! ```

use std::sync::atomic::AtomicUsize;

pub mod binding;
pub mod catalog;
pub mod config;
pub mod error;
pub mod manager;
pub mod mapping;
pub mod object;
pub mod prelude;
pub mod sync;
pub mod tree;
pub mod update;
pub mod value;
pub mod yaml;

pub use config::{ManagerConfig, UnifiedParameterManagerBuilder};
pub use error::{Error, Result, UpdateOutcome};
pub use manager::{BatchOperation, UnifiedParameterManager};
pub use sync::ParameterSynchronizer;
pub use tree::ParameterTree;
pub use update::{ParameterUpdateManager, UpdateInterface};
pub use value::{ParameterChange, ParameterValue};

pub trait Builder {
    type Output;
    fn build(self) -> Result<Self::Output>;
}

#[derive(Debug, Default)]
pub struct GlobalCounter(AtomicUsize);

impl GlobalCounter {
    pub const fn new() -> Self {
        Self(AtomicUsize::new(0))
    }

    pub fn increment(&self) -> usize {
        self.0.fetch_add(1, std::sync::atomic::Ordering::AcqRel)
    }
}
