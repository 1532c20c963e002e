//! Typed bindings between tree paths and live-object properties.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::object::{GeometryObject, ObjectId, RenderingConfigObject};
use crate::value::{Color, ParameterValue};

/// A fixed catalog of paths that map onto one object's getters and setters.
pub trait PropertyBinding: Send + Sync {
    fn object_id(&self) -> ObjectId;
    fn paths(&self) -> &'static [&'static str];
    fn get(&self, path: &str) -> Result<ParameterValue>;
    fn set(&self, path: &str, value: &ParameterValue) -> Result<()>;

    fn binds(&self, path: &str) -> bool {
        self.paths().iter().any(|p| *p == path)
    }
}

/// Integers are accepted where doubles are bound.
fn double(value: &ParameterValue) -> Result<f64> {
    match value {
        ParameterValue::Integer(i) => Ok(*i as f64),
        other => other.get(),
    }
}

fn integer(value: &ParameterValue) -> Result<i64> {
    match value {
        ParameterValue::Double(d) if d.fract() == 0.0 => Ok(*d as i64),
        other => other.get(),
    }
}

pub const GEOMETRY_PATHS: &[&str] = &[
    "geometry/transform/position/x",
    "geometry/transform/position/y",
    "geometry/transform/position/z",
    "geometry/transform/rotation/axis/x",
    "geometry/transform/rotation/axis/y",
    "geometry/transform/rotation/axis/z",
    "geometry/transform/rotation/angle",
    "geometry/transform/scale",
    "geometry/display/visible",
    "geometry/display/selected",
    "geometry/color/main",
    "geometry/transparency",
    "material/color/ambient",
    "material/color/diffuse",
    "material/color/specular",
    "material/properties/shininess",
    "material/properties/transparency",
];

pub struct GeometryBinding {
    object: Arc<dyn GeometryObject>,
}

impl GeometryBinding {
    pub fn new(object: Arc<dyn GeometryObject>) -> Self {
        Self { object }
    }

    fn set_position_axis(&self, axis: usize, value: f64) {
        let mut position = self.object.position();
        position[axis] = value;
        self.object.set_position(position);
    }

    fn set_rotation_axis(&self, axis: usize, value: f64) {
        let (mut rotation_axis, angle) = self.object.rotation();
        rotation_axis[axis] = value;
        self.object.set_rotation(rotation_axis, angle);
    }
}

impl PropertyBinding for GeometryBinding {
    fn object_id(&self) -> ObjectId {
        ObjectId::of(&self.object)
    }

    fn paths(&self) -> &'static [&'static str] {
        GEOMETRY_PATHS
    }

    fn get(&self, path: &str) -> Result<ParameterValue> {
        let o = &self.object;
        let value: ParameterValue = match path {
            "geometry/transform/position/x" => o.position()[0].into(),
            "geometry/transform/position/y" => o.position()[1].into(),
            "geometry/transform/position/z" => o.position()[2].into(),
            "geometry/transform/rotation/axis/x" => o.rotation().0[0].into(),
            "geometry/transform/rotation/axis/y" => o.rotation().0[1].into(),
            "geometry/transform/rotation/axis/z" => o.rotation().0[2].into(),
            "geometry/transform/rotation/angle" => o.rotation().1.into(),
            "geometry/transform/scale" => o.scale().into(),
            "geometry/display/visible" => o.is_visible().into(),
            "geometry/display/selected" => o.is_selected().into(),
            "geometry/color/main" => o.color().into(),
            "geometry/transparency" | "material/properties/transparency" => {
                o.transparency().into()
            }
            "material/color/ambient" => o.material_ambient_color().into(),
            "material/color/diffuse" => o.material_diffuse_color().into(),
            "material/color/specular" => o.material_specular_color().into(),
            "material/properties/shininess" => o.material_shininess().into(),
            _ => return Err(Error::UnknownProperty(path.to_string())),
        };
        Ok(value)
    }

    fn set(&self, path: &str, value: &ParameterValue) -> Result<()> {
        let o = &self.object;
        match path {
            "geometry/transform/position/x" => self.set_position_axis(0, double(value)?),
            "geometry/transform/position/y" => self.set_position_axis(1, double(value)?),
            "geometry/transform/position/z" => self.set_position_axis(2, double(value)?),
            "geometry/transform/rotation/axis/x" => self.set_rotation_axis(0, double(value)?),
            "geometry/transform/rotation/axis/y" => self.set_rotation_axis(1, double(value)?),
            "geometry/transform/rotation/axis/z" => self.set_rotation_axis(2, double(value)?),
            "geometry/transform/rotation/angle" => {
                let (axis, _) = o.rotation();
                o.set_rotation(axis, double(value)?);
            }
            "geometry/transform/scale" => o.set_scale(double(value)?),
            "geometry/display/visible" => o.set_visible(value.get()?),
            "geometry/display/selected" => o.set_selected(value.get()?),
            "geometry/color/main" => o.set_color(value.get::<Color>()?),
            "geometry/transparency" | "material/properties/transparency" => {
                o.set_transparency(double(value)?)
            }
            "material/color/ambient" => o.set_material_ambient_color(value.get()?),
            "material/color/diffuse" => o.set_material_diffuse_color(value.get()?),
            "material/color/specular" => o.set_material_specular_color(value.get()?),
            "material/properties/shininess" => o.set_material_shininess(double(value)?),
            _ => return Err(Error::UnknownProperty(path.to_string())),
        }
        Ok(())
    }
}

pub const CONFIG_PATHS: &[&str] = &[
    "rendering/mode/display_mode",
    "rendering/mode/shading_mode",
    "rendering/mode/rendering_quality",
    "lighting/ambient/color",
    "lighting/ambient/intensity",
    "lighting/diffuse/color",
    "lighting/diffuse/intensity",
    "shadow/mode/shadow_mode",
    "shadow/intensity/shadow_intensity",
    "quality/level/rendering_quality",
    "quality/level/tessellation_level",
];

pub struct ConfigBinding {
    object: Arc<dyn RenderingConfigObject>,
}

impl ConfigBinding {
    pub fn new(object: Arc<dyn RenderingConfigObject>) -> Self {
        Self { object }
    }
}

impl PropertyBinding for ConfigBinding {
    fn object_id(&self) -> ObjectId {
        ObjectId::of(&self.object)
    }

    fn paths(&self) -> &'static [&'static str] {
        CONFIG_PATHS
    }

    fn get(&self, path: &str) -> Result<ParameterValue> {
        let o = &self.object;
        let value: ParameterValue = match path {
            "rendering/mode/display_mode" => o.display_mode().into(),
            "rendering/mode/shading_mode" => o.shading_mode().into(),
            "rendering/mode/rendering_quality" | "quality/level/rendering_quality" => {
                o.rendering_quality().into()
            }
            "lighting/ambient/color" => o.ambient_color().into(),
            "lighting/ambient/intensity" => o.ambient_intensity().into(),
            "lighting/diffuse/color" => o.diffuse_color().into(),
            "lighting/diffuse/intensity" => o.diffuse_intensity().into(),
            "shadow/mode/shadow_mode" => o.shadow_mode().into(),
            "shadow/intensity/shadow_intensity" => o.shadow_intensity().into(),
            "quality/level/tessellation_level" => o.tessellation_level().into(),
            _ => return Err(Error::UnknownProperty(path.to_string())),
        };
        Ok(value)
    }

    fn set(&self, path: &str, value: &ParameterValue) -> Result<()> {
        let o = &self.object;
        match path {
            "rendering/mode/display_mode" => o.set_display_mode(value.get()?),
            "rendering/mode/shading_mode" => o.set_shading_mode(value.get()?),
            "rendering/mode/rendering_quality" | "quality/level/rendering_quality" => {
                o.set_rendering_quality(value.get()?)
            }
            "lighting/ambient/color" => o.set_ambient_color(value.get()?),
            "lighting/ambient/intensity" => o.set_ambient_intensity(double(value)?),
            "lighting/diffuse/color" => o.set_diffuse_color(value.get()?),
            "lighting/diffuse/intensity" => o.set_diffuse_intensity(double(value)?),
            "shadow/mode/shadow_mode" => o.set_shadow_mode(value.get()?),
            "shadow/intensity/shadow_intensity" => o.set_shadow_intensity(double(value)?),
            "quality/level/tessellation_level" => o.set_tessellation_level(integer(value)?),
            _ => return Err(Error::UnknownProperty(path.to_string())),
        }
        Ok(())
    }
}
