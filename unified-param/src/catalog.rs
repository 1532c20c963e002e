//! The default parameter set of the viewer.
//!
//! Each `build_*` function registers one top-level category with its default
//! values. Registration is idempotent, so calling these on a tree that
//! already holds some of the paths keeps the existing leaves.

use tracing::debug;

use crate::error::Result;
use crate::tree::ParameterTree;
use crate::value::{
    Color, DisplayMode, LightingModel, ParameterValue, RenderingQuality, ShadingMode, ShadowMode,
    TextureMode,
};

/// Top-level categories registered by [`register_defaults`].
pub const CATEGORIES: [&str; 8] = [
    "geometry",
    "rendering",
    "display",
    "quality",
    "lighting",
    "material",
    "texture",
    "shadow",
];

fn register_all<const N: usize>(
    tree: &ParameterTree,
    entries: [(&str, ParameterValue); N],
) -> Result<()> {
    for (path, default) in entries {
        tree.register_parameter(path, default)?;
    }
    Ok(())
}

pub fn build_geometry(tree: &ParameterTree) -> Result<()> {
    register_all(
        tree,
        [
            ("geometry/transform/position/x", 0.0.into()),
            ("geometry/transform/position/y", 0.0.into()),
            ("geometry/transform/position/z", 0.0.into()),
            ("geometry/transform/rotation/axis/x", 0.0.into()),
            ("geometry/transform/rotation/axis/y", 0.0.into()),
            ("geometry/transform/rotation/axis/z", 1.0.into()),
            ("geometry/transform/rotation/angle", 0.0.into()),
            ("geometry/transform/scale", 1.0.into()),
            ("geometry/display/visible", true.into()),
            ("geometry/display/selected", false.into()),
            ("geometry/display/wireframe_mode", false.into()),
            ("geometry/display/show_wireframe", false.into()),
            ("geometry/display/faces_visible", true.into()),
            ("geometry/display/wireframe_overlay", false.into()),
            ("geometry/color/main", Color::rgb(0.8, 0.8, 0.8).into()),
            ("geometry/color/edge", Color::BLACK.into()),
            ("geometry/color/vertex", Color::rgb(1.0, 0.0, 0.0).into()),
            ("geometry/transparency", 0.0.into()),
            ("geometry/size/edge_width", 1.0.into()),
            ("geometry/size/vertex_size", 2.0.into()),
            ("geometry/size/point_size", 2.0.into()),
            ("geometry/size/wireframe_width", 1.0.into()),
            ("geometry/quality/tessellation_level", ParameterValue::Integer(2)),
            ("geometry/quality/deflection", 0.5.into()),
            ("geometry/quality/angular_deflection", 1.0.into()),
            ("geometry/quality/relative", false.into()),
            ("geometry/quality/in_parallel", true.into()),
        ],
    )
}

pub fn build_rendering(tree: &ParameterTree) -> Result<()> {
    register_all(
        tree,
        [
            ("rendering/mode/display_mode", DisplayMode::Solid.into()),
            ("rendering/mode/shading_mode", ShadingMode::Smooth.into()),
            ("rendering/mode/rendering_quality", RenderingQuality::Normal.into()),
            ("rendering/features/show_edges", false.into()),
            ("rendering/features/show_vertices", false.into()),
            ("rendering/features/smooth_normals", true.into()),
            ("rendering/features/enable_lod", true.into()),
            ("rendering/features/lod_distance", 100.0.into()),
            ("rendering/performance/anti_aliasing_samples", ParameterValue::Integer(4)),
            ("rendering/performance/enable_culling", true.into()),
            ("rendering/performance/enable_depth_test", true.into()),
            ("rendering/performance/enable_depth_write", true.into()),
        ],
    )
}

pub fn build_display(tree: &ParameterTree) -> Result<()> {
    register_all(
        tree,
        [
            ("display/mode/display_mode", DisplayMode::Solid.into()),
            ("display/mode/wireframe_mode", false.into()),
            ("display/mode/transparent_mode", false.into()),
            ("display/elements/show_edges", false.into()),
            ("display/elements/show_vertices", false.into()),
            ("display/elements/show_faces", true.into()),
            ("display/elements/show_normals", false.into()),
            ("display/style/edge_width", 1.0.into()),
            ("display/style/vertex_size", 2.0.into()),
            ("display/style/point_size", 2.0.into()),
            ("display/style/wireframe_width", 1.0.into()),
        ],
    )
}

pub fn build_quality(tree: &ParameterTree) -> Result<()> {
    register_all(
        tree,
        [
            ("quality/level/rendering_quality", RenderingQuality::Normal.into()),
            ("quality/level/tessellation_level", ParameterValue::Integer(2)),
            ("quality/antialiasing/samples", ParameterValue::Integer(4)),
            ("quality/antialiasing/enabled", true.into()),
            ("quality/lod/enabled", true.into()),
            ("quality/lod/distance", 100.0.into()),
            ("quality/lod/levels", ParameterValue::Integer(3)),
            ("quality/subdivision/enabled", false.into()),
            ("quality/subdivision/levels", ParameterValue::Integer(2)),
        ],
    )
}

pub fn build_lighting(tree: &ParameterTree) -> Result<()> {
    register_all(
        tree,
        [
            ("lighting/model/lighting_model", LightingModel::BlinnPhong.into()),
            ("lighting/model/roughness", 0.5.into()),
            ("lighting/model/metallic", 0.0.into()),
            ("lighting/model/fresnel", 0.04.into()),
            ("lighting/model/subsurface_scattering", 0.0.into()),
            ("lighting/ambient/color", Color::rgb(0.7, 0.7, 0.7).into()),
            ("lighting/ambient/intensity", 0.8.into()),
            ("lighting/diffuse/color", Color::WHITE.into()),
            ("lighting/diffuse/intensity", 1.0.into()),
            ("lighting/specular/color", Color::WHITE.into()),
            ("lighting/specular/intensity", 1.0.into()),
        ],
    )
}

pub fn build_material(tree: &ParameterTree) -> Result<()> {
    register_all(
        tree,
        [
            ("material/color/ambient", Color::rgb(0.6, 0.6, 0.6).into()),
            ("material/color/diffuse", Color::rgb(0.8, 0.8, 0.8).into()),
            ("material/color/specular", Color::WHITE.into()),
            ("material/color/emissive", Color::BLACK.into()),
            ("material/properties/shininess", 30.0.into()),
            ("material/properties/transparency", 0.0.into()),
            ("material/properties/metallic", 0.0.into()),
            ("material/properties/roughness", 0.5.into()),
            // Preset names are open ended, so they stay strings.
            ("material/preset/current", "custom".into()),
        ],
    )
}

pub fn build_texture(tree: &ParameterTree) -> Result<()> {
    register_all(
        tree,
        [
            ("texture/enabled", false.into()),
            ("texture/image_path", "".into()),
            ("texture/color/main", Color::WHITE.into()),
            ("texture/intensity", 0.5.into()),
            ("texture/mode/texture_mode", TextureMode::Modulate.into()),
            ("texture/coordinates/repeat_u", 1.0.into()),
            ("texture/coordinates/repeat_v", 1.0.into()),
            ("texture/coordinates/offset_u", 0.0.into()),
            ("texture/coordinates/offset_v", 0.0.into()),
        ],
    )
}

pub fn build_shadow(tree: &ParameterTree) -> Result<()> {
    register_all(
        tree,
        [
            ("shadow/mode/shadow_mode", ShadowMode::Soft.into()),
            ("shadow/mode/enabled", true.into()),
            ("shadow/intensity/shadow_intensity", 0.7.into()),
            ("shadow/intensity/shadow_softness", 0.5.into()),
            ("shadow/quality/shadow_map_size", ParameterValue::Integer(1024)),
            ("shadow/quality/shadow_bias", 0.001.into()),
            ("shadow/distance/near_plane", 0.1.into()),
            ("shadow/distance/far_plane", 1000.0.into()),
        ],
    )
}

/// Register every default category.
pub fn register_defaults(tree: &ParameterTree) -> Result<()> {
    build_geometry(tree)?;
    build_rendering(tree)?;
    build_display(tree)?;
    build_quality(tree)?;
    build_lighting(tree)?;
    build_material(tree)?;
    build_texture(tree)?;
    build_shadow(tree)?;
    debug!(
        "[TREE] Default catalog registered: {} parameters",
        tree.all_parameter_paths().len()
    );
    Ok(())
}
