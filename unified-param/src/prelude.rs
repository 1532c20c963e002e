//! Convenience re-exports for common types.
//!
//! `use unified_param::prelude::*;` brings in the manager, its builder, the
//! value types and the traits live objects implement.
//!
//! # Example
//!
//! ```no_run
//! use unified_param::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let manager = UnifiedParameterManagerBuilder::default().build()?;
//!     manager.set_parameter("geometry/transform/scale", 2.0.into());
//!     Ok(())
//! }
//! ```

/// Required to call `.build()` on the manager builder.
pub use crate::Builder;

/// Entry point and its configuration.
pub use crate::config::{ManagerConfig, UnifiedParameterManagerBuilder};
pub use crate::manager::{BatchOperation, UnifiedParameterManager};

pub use crate::error::{Error, Result, UpdateOutcome};

/// The three subsystems, for direct use.
pub use crate::sync::{ParameterSynchronizer, SyncDirection};
pub use crate::tree::{LoadReport, ParameterTree};
pub use crate::update::{
    ParameterUpdateManager, UpdateInterface, UpdatePriority, UpdateTask, UpdateType,
};

/// Traits implemented by live objects.
pub use crate::object::{GeometryObject, ObjectId, RenderingConfigObject};

/// Parameter values and the rendering-mode enums they carry.
pub use crate::value::{
    BlendMode, Color, DisplayMode, LightingModel, ParameterChange, ParameterType, ParameterValue,
    RenderingQuality, ShadingMode, ShadowMode, TextureMode,
};
