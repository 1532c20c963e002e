//! Path to (update type, priority) table.

use std::collections::HashMap;

use crate::update::{UpdatePriority, UpdateType};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingEntry {
    pub update_type: UpdateType,
    pub priority: UpdatePriority,
    pub affected: Vec<UpdateType>,
}

/// Decides which refresh a changed path triggers and how urgently.
///
/// Unknown paths fall back to `(FullRefresh, Normal)` so that every change
/// refreshes something.
#[derive(Debug, Clone)]
pub struct ParameterUpdateMapping {
    entries: HashMap<String, MappingEntry>,
}

impl Default for ParameterUpdateMapping {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// First match wins: transform, then color/material, then quality/shadow.
pub fn priority_for_path(path: &str) -> UpdatePriority {
    if path.contains("transform") {
        UpdatePriority::High
    } else if path.contains("color") || path.contains("material") {
        UpdatePriority::Normal
    } else if path.contains("quality") || path.contains("shadow") {
        UpdatePriority::Low
    } else {
        UpdatePriority::Normal
    }
}

fn affected_for_path(path: &str, update_type: UpdateType) -> Vec<UpdateType> {
    let mut affected = vec![update_type];
    for key in ["material", "lighting", "quality"] {
        if path.contains(key) && !affected.contains(&UpdateType::Rendering) {
            affected.push(UpdateType::Rendering);
        }
    }
    affected
}

const DEFAULT_TABLE: &[(&str, UpdateType)] = &[
    ("geometry/transform/position/x", UpdateType::Transform),
    ("geometry/transform/position/y", UpdateType::Transform),
    ("geometry/transform/position/z", UpdateType::Transform),
    ("geometry/transform/rotation/axis/x", UpdateType::Transform),
    ("geometry/transform/rotation/axis/y", UpdateType::Transform),
    ("geometry/transform/rotation/axis/z", UpdateType::Transform),
    ("geometry/transform/rotation/angle", UpdateType::Transform),
    ("geometry/transform/scale", UpdateType::Transform),
    ("geometry/display/visible", UpdateType::Display),
    ("geometry/display/selected", UpdateType::Display),
    ("geometry/display/wireframe_mode", UpdateType::Display),
    ("geometry/display/show_wireframe", UpdateType::Display),
    ("geometry/display/faces_visible", UpdateType::Display),
    ("geometry/display/wireframe_overlay", UpdateType::Display),
    ("geometry/color/main", UpdateType::Color),
    ("geometry/color/edge", UpdateType::Color),
    ("geometry/color/vertex", UpdateType::Color),
    ("geometry/transparency", UpdateType::Material),
    ("material/color/ambient", UpdateType::Material),
    ("material/color/diffuse", UpdateType::Material),
    ("material/color/specular", UpdateType::Material),
    ("material/color/emissive", UpdateType::Material),
    ("material/properties/shininess", UpdateType::Material),
    ("material/properties/transparency", UpdateType::Material),
    ("material/properties/metallic", UpdateType::Material),
    ("material/properties/roughness", UpdateType::Material),
    ("texture/enabled", UpdateType::Texture),
    ("texture/image_path", UpdateType::Texture),
    ("texture/color/main", UpdateType::Texture),
    ("texture/intensity", UpdateType::Texture),
    ("texture/mode/texture_mode", UpdateType::Texture),
    ("lighting/model/lighting_model", UpdateType::Lighting),
    ("lighting/model/roughness", UpdateType::Lighting),
    ("lighting/model/metallic", UpdateType::Lighting),
    ("lighting/model/fresnel", UpdateType::Lighting),
    ("lighting/ambient/color", UpdateType::Lighting),
    ("lighting/ambient/intensity", UpdateType::Lighting),
    ("lighting/diffuse/color", UpdateType::Lighting),
    ("lighting/diffuse/intensity", UpdateType::Lighting),
    ("lighting/specular/color", UpdateType::Lighting),
    ("lighting/specular/intensity", UpdateType::Lighting),
    ("shadow/mode/shadow_mode", UpdateType::Shadow),
    ("shadow/mode/enabled", UpdateType::Shadow),
    ("shadow/intensity/shadow_intensity", UpdateType::Shadow),
    ("shadow/intensity/shadow_softness", UpdateType::Shadow),
    ("shadow/quality/shadow_map_size", UpdateType::Shadow),
    ("shadow/quality/shadow_bias", UpdateType::Shadow),
    ("quality/level/rendering_quality", UpdateType::Quality),
    ("quality/level/tessellation_level", UpdateType::Quality),
    ("quality/antialiasing/samples", UpdateType::Quality),
    ("quality/antialiasing/enabled", UpdateType::Quality),
    ("quality/lod/enabled", UpdateType::Quality),
    ("quality/lod/distance", UpdateType::Quality),
    ("rendering/mode/display_mode", UpdateType::Rendering),
    ("rendering/mode/shading_mode", UpdateType::Rendering),
    ("rendering/mode/rendering_quality", UpdateType::Rendering),
    ("rendering/features/show_edges", UpdateType::Rendering),
    ("rendering/features/show_vertices", UpdateType::Rendering),
    ("rendering/features/smooth_normals", UpdateType::Rendering),
];

impl ParameterUpdateMapping {
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// The built-in table for the default parameter catalog.
    pub fn with_defaults() -> Self {
        let mut mapping = Self::empty();
        for (path, update_type) in DEFAULT_TABLE {
            mapping.map(path, *update_type);
        }
        mapping
    }

    /// Map `path` to `update_type`, deriving the priority from the path.
    pub fn map(&mut self, path: &str, update_type: UpdateType) {
        self.insert(path, update_type, priority_for_path(path));
    }

    /// Add or replace an entry with an explicit priority.
    pub fn insert(&mut self, path: &str, update_type: UpdateType, priority: UpdatePriority) {
        self.entries.insert(
            path.to_string(),
            MappingEntry {
                update_type,
                priority,
                affected: affected_for_path(path, update_type),
            },
        );
    }

    pub fn remove(&mut self, path: &str) -> Option<MappingEntry> {
        self.entries.remove(path)
    }

    pub fn get(&self, path: &str) -> Option<&MappingEntry> {
        self.entries.get(path)
    }

    pub fn update_type(&self, path: &str) -> UpdateType {
        self.entries
            .get(path)
            .map_or(UpdateType::FullRefresh, |e| e.update_type)
    }

    pub fn priority(&self, path: &str) -> UpdatePriority {
        self.entries
            .get(path)
            .map_or(UpdatePriority::Normal, |e| e.priority)
    }

    pub fn lookup(&self, path: &str) -> (UpdateType, UpdatePriority) {
        (self.update_type(path), self.priority(path))
    }

    /// Every update type a change to `path` touches, primary type first.
    pub fn affected_update_types(&self, path: &str) -> Vec<UpdateType> {
        self.entries
            .get(path)
            .map_or_else(|| vec![UpdateType::FullRefresh], |e| e.affected.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Mapped paths, sorted.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.entries.keys().cloned().collect();
        paths.sort();
        paths
    }
}
