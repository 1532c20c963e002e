//! Live objects driven by the parameter system.
//!
//! The viewer's geometry and rendering configuration are external: they
//! implement these traits and receive property writes and refresh calls.
//! Implementations use interior mutability, since one object is shared by
//! the synchronizer and the update manager.

use std::fmt;
use std::sync::Arc;

use crate::update::UpdateInterface;
use crate::value::{Color, DisplayMode, RenderingQuality, ShadingMode, ShadowMode};

/// Identity of a live object, taken from its `Arc` allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(usize);

impl ObjectId {
    pub fn of<T: ?Sized>(object: &Arc<T>) -> Self {
        Self(Arc::as_ptr(object) as *const () as usize)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

pub trait GeometryObject: Send + Sync {
    fn name(&self) -> String {
        String::from("geometry")
    }

    fn position(&self) -> [f64; 3];
    fn set_position(&self, position: [f64; 3]);
    /// Rotation as `(axis, angle)`.
    fn rotation(&self) -> ([f64; 3], f64);
    fn set_rotation(&self, axis: [f64; 3], angle: f64);
    fn scale(&self) -> f64;
    fn set_scale(&self, scale: f64);

    fn is_visible(&self) -> bool;
    fn set_visible(&self, visible: bool);
    fn is_selected(&self) -> bool;
    fn set_selected(&self, selected: bool);

    fn color(&self) -> Color;
    fn set_color(&self, color: Color);
    fn transparency(&self) -> f64;
    fn set_transparency(&self, transparency: f64);

    fn material_ambient_color(&self) -> Color;
    fn set_material_ambient_color(&self, color: Color);
    fn material_diffuse_color(&self) -> Color;
    fn set_material_diffuse_color(&self, color: Color);
    fn material_specular_color(&self) -> Color;
    fn set_material_specular_color(&self, color: Color);
    fn material_shininess(&self) -> f64;
    fn set_material_shininess(&self, shininess: f64);

    fn set_mesh_regeneration_needed(&self, needed: bool);
    fn update_from_rendering_config(&self);
    fn build_representation(&self);
    fn update_material_for_lighting(&self);
    fn force_texture_update(&self);
}

pub trait RenderingConfigObject: Send + Sync {
    fn display_mode(&self) -> DisplayMode;
    fn set_display_mode(&self, mode: DisplayMode);
    fn shading_mode(&self) -> ShadingMode;
    fn set_shading_mode(&self, mode: ShadingMode);
    fn rendering_quality(&self) -> RenderingQuality;
    fn set_rendering_quality(&self, quality: RenderingQuality);

    fn ambient_color(&self) -> Color;
    fn set_ambient_color(&self, color: Color);
    fn ambient_intensity(&self) -> f64;
    fn set_ambient_intensity(&self, intensity: f64);
    fn diffuse_color(&self) -> Color;
    fn set_diffuse_color(&self, color: Color);
    fn diffuse_intensity(&self) -> f64;
    fn set_diffuse_intensity(&self, intensity: f64);

    fn shadow_mode(&self) -> ShadowMode;
    fn set_shadow_mode(&self, mode: ShadowMode);
    fn shadow_intensity(&self) -> f64;
    fn set_shadow_intensity(&self, intensity: f64);

    fn tessellation_level(&self) -> i64;
    fn set_tessellation_level(&self, level: i64);

    fn notify_settings_changed(&self);
}

/// Routes refresh hooks to a single geometry.
pub struct GeometryUpdateInterface {
    geometry: Arc<dyn GeometryObject>,
}

impl GeometryUpdateInterface {
    pub fn new(geometry: Arc<dyn GeometryObject>) -> Self {
        Self { geometry }
    }

    pub fn geometry(&self) -> &Arc<dyn GeometryObject> {
        &self.geometry
    }
}

impl UpdateInterface for GeometryUpdateInterface {
    fn update_geometry(&self) {
        self.geometry.set_mesh_regeneration_needed(true);
    }

    fn update_rendering(&self) {
        self.geometry.update_from_rendering_config();
    }

    fn update_display(&self) {
        self.geometry.build_representation();
    }

    fn update_lighting(&self) {
        self.geometry.update_material_for_lighting();
    }

    fn update_material(&self) {
        self.geometry.update_material_for_lighting();
    }

    fn update_texture(&self) {
        self.geometry.force_texture_update();
    }

    fn update_shadow(&self) {
        self.geometry.update_from_rendering_config();
    }

    fn update_quality(&self) {
        self.geometry.set_mesh_regeneration_needed(true);
    }

    fn update_transform(&self) {
        self.geometry.build_representation();
    }

    fn update_color(&self) {
        self.geometry.update_from_rendering_config();
    }

    fn full_refresh(&self) {
        self.geometry.set_mesh_regeneration_needed(true);
        self.geometry.build_representation();
    }
}

/// Every hook on a rendering config collapses into one change notification.
pub struct RenderingConfigUpdateInterface {
    config: Arc<dyn RenderingConfigObject>,
}

impl RenderingConfigUpdateInterface {
    pub fn new(config: Arc<dyn RenderingConfigObject>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Arc<dyn RenderingConfigObject> {
        &self.config
    }
}

impl UpdateInterface for RenderingConfigUpdateInterface {
    fn update_geometry(&self) {
        self.config.notify_settings_changed();
    }

    fn update_rendering(&self) {
        self.config.notify_settings_changed();
    }

    fn update_display(&self) {
        self.config.notify_settings_changed();
    }

    fn update_lighting(&self) {
        self.config.notify_settings_changed();
    }

    fn update_material(&self) {
        self.config.notify_settings_changed();
    }

    fn update_texture(&self) {
        self.config.notify_settings_changed();
    }

    fn update_shadow(&self) {
        self.config.notify_settings_changed();
    }

    fn update_quality(&self) {
        self.config.notify_settings_changed();
    }

    fn update_transform(&self) {
        self.config.notify_settings_changed();
    }

    fn update_color(&self) {
        self.config.notify_settings_changed();
    }

    fn full_refresh(&self) {
        self.config.notify_settings_changed();
    }
}
