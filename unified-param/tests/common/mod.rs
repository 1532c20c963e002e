use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use unified_param::object::{GeometryObject, RenderingConfigObject};
use unified_param::update::{UpdateInterface, UpdateType};
use unified_param::value::{Color, DisplayMode, RenderingQuality, ShadingMode, ShadowMode};

#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct GeometryState {
    pub position: [f64; 3],
    pub axis: [f64; 3],
    pub angle: f64,
    pub scale: f64,
    pub visible: bool,
    pub selected: bool,
    pub color: Color,
    pub transparency: f64,
    pub ambient: Color,
    pub diffuse: Color,
    pub specular: Color,
    pub shininess: f64,
}

impl Default for GeometryState {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            axis: [0.0, 0.0, 1.0],
            angle: 0.0,
            scale: 1.0,
            visible: true,
            selected: false,
            color: Color::rgb(0.8, 0.8, 0.8),
            transparency: 0.0,
            ambient: Color::rgb(0.2, 0.2, 0.2),
            diffuse: Color::rgb(0.8, 0.8, 0.8),
            specular: Color::rgb(1.0, 1.0, 1.0),
            shininess: 32.0,
        }
    }
}

/// In-memory geometry that counts its refresh hooks.
#[derive(Default)]
#[allow(dead_code)]
pub struct MockGeometry {
    pub state: Mutex<GeometryState>,
    pub builds: AtomicUsize,
    pub mesh_regenerations: AtomicUsize,
    pub config_refreshes: AtomicUsize,
    pub lighting_refreshes: AtomicUsize,
    pub texture_refreshes: AtomicUsize,
}

#[allow(dead_code)]
impl MockGeometry {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    pub fn mesh_regenerations(&self) -> usize {
        self.mesh_regenerations.load(Ordering::SeqCst)
    }
}

impl GeometryObject for MockGeometry {
    fn name(&self) -> String {
        "mock".to_string()
    }

    fn position(&self) -> [f64; 3] {
        self.state.lock().position
    }

    fn set_position(&self, position: [f64; 3]) {
        self.state.lock().position = position;
    }

    fn rotation(&self) -> ([f64; 3], f64) {
        let state = self.state.lock();
        (state.axis, state.angle)
    }

    fn set_rotation(&self, axis: [f64; 3], angle: f64) {
        let mut state = self.state.lock();
        state.axis = axis;
        state.angle = angle;
    }

    fn scale(&self) -> f64 {
        self.state.lock().scale
    }

    fn set_scale(&self, scale: f64) {
        self.state.lock().scale = scale;
    }

    fn is_visible(&self) -> bool {
        self.state.lock().visible
    }

    fn set_visible(&self, visible: bool) {
        self.state.lock().visible = visible;
    }

    fn is_selected(&self) -> bool {
        self.state.lock().selected
    }

    fn set_selected(&self, selected: bool) {
        self.state.lock().selected = selected;
    }

    fn color(&self) -> Color {
        self.state.lock().color
    }

    fn set_color(&self, color: Color) {
        self.state.lock().color = color;
    }

    fn transparency(&self) -> f64 {
        self.state.lock().transparency
    }

    fn set_transparency(&self, transparency: f64) {
        self.state.lock().transparency = transparency;
    }

    fn material_ambient_color(&self) -> Color {
        self.state.lock().ambient
    }

    fn set_material_ambient_color(&self, color: Color) {
        self.state.lock().ambient = color;
    }

    fn material_diffuse_color(&self) -> Color {
        self.state.lock().diffuse
    }

    fn set_material_diffuse_color(&self, color: Color) {
        self.state.lock().diffuse = color;
    }

    fn material_specular_color(&self) -> Color {
        self.state.lock().specular
    }

    fn set_material_specular_color(&self, color: Color) {
        self.state.lock().specular = color;
    }

    fn material_shininess(&self) -> f64 {
        self.state.lock().shininess
    }

    fn set_material_shininess(&self, shininess: f64) {
        self.state.lock().shininess = shininess;
    }

    fn set_mesh_regeneration_needed(&self, needed: bool) {
        if needed {
            self.mesh_regenerations.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn update_from_rendering_config(&self) {
        self.config_refreshes.fetch_add(1, Ordering::SeqCst);
    }

    fn build_representation(&self) {
        self.builds.fetch_add(1, Ordering::SeqCst);
    }

    fn update_material_for_lighting(&self) {
        self.lighting_refreshes.fetch_add(1, Ordering::SeqCst);
    }

    fn force_texture_update(&self) {
        self.texture_refreshes.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct ConfigState {
    pub display_mode: DisplayMode,
    pub shading_mode: ShadingMode,
    pub quality: RenderingQuality,
    pub ambient_color: Color,
    pub ambient_intensity: f64,
    pub diffuse_color: Color,
    pub diffuse_intensity: f64,
    pub shadow_mode: ShadowMode,
    pub shadow_intensity: f64,
    pub tessellation: i64,
}

impl Default for ConfigState {
    fn default() -> Self {
        Self {
            display_mode: DisplayMode::Solid,
            shading_mode: ShadingMode::Smooth,
            quality: RenderingQuality::Normal,
            ambient_color: Color::rgb(0.2, 0.2, 0.2),
            ambient_intensity: 0.2,
            diffuse_color: Color::rgb(1.0, 1.0, 1.0),
            diffuse_intensity: 0.8,
            shadow_mode: ShadowMode::Soft,
            shadow_intensity: 0.5,
            tessellation: 3,
        }
    }
}

#[derive(Default)]
#[allow(dead_code)]
pub struct MockConfig {
    pub state: Mutex<ConfigState>,
    pub notifications: AtomicUsize,
}

#[allow(dead_code)]
impl MockConfig {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn notifications(&self) -> usize {
        self.notifications.load(Ordering::SeqCst)
    }
}

impl RenderingConfigObject for MockConfig {
    fn display_mode(&self) -> DisplayMode {
        self.state.lock().display_mode
    }

    fn set_display_mode(&self, mode: DisplayMode) {
        self.state.lock().display_mode = mode;
    }

    fn shading_mode(&self) -> ShadingMode {
        self.state.lock().shading_mode
    }

    fn set_shading_mode(&self, mode: ShadingMode) {
        self.state.lock().shading_mode = mode;
    }

    fn rendering_quality(&self) -> RenderingQuality {
        self.state.lock().quality
    }

    fn set_rendering_quality(&self, quality: RenderingQuality) {
        self.state.lock().quality = quality;
    }

    fn ambient_color(&self) -> Color {
        self.state.lock().ambient_color
    }

    fn set_ambient_color(&self, color: Color) {
        self.state.lock().ambient_color = color;
    }

    fn ambient_intensity(&self) -> f64 {
        self.state.lock().ambient_intensity
    }

    fn set_ambient_intensity(&self, intensity: f64) {
        self.state.lock().ambient_intensity = intensity;
    }

    fn diffuse_color(&self) -> Color {
        self.state.lock().diffuse_color
    }

    fn set_diffuse_color(&self, color: Color) {
        self.state.lock().diffuse_color = color;
    }

    fn diffuse_intensity(&self) -> f64 {
        self.state.lock().diffuse_intensity
    }

    fn set_diffuse_intensity(&self, intensity: f64) {
        self.state.lock().diffuse_intensity = intensity;
    }

    fn shadow_mode(&self) -> ShadowMode {
        self.state.lock().shadow_mode
    }

    fn set_shadow_mode(&self, mode: ShadowMode) {
        self.state.lock().shadow_mode = mode;
    }

    fn shadow_intensity(&self) -> f64 {
        self.state.lock().shadow_intensity
    }

    fn set_shadow_intensity(&self, intensity: f64) {
        self.state.lock().shadow_intensity = intensity;
    }

    fn tessellation_level(&self) -> i64 {
        self.state.lock().tessellation
    }

    fn set_tessellation_level(&self, level: i64) {
        self.state.lock().tessellation = level;
    }

    fn notify_settings_changed(&self) {
        self.notifications.fetch_add(1, Ordering::SeqCst);
    }
}

/// Records every update type it is asked to run, in order.
#[derive(Default)]
#[allow(dead_code)]
pub struct RecordingInterface {
    pub calls: Mutex<Vec<UpdateType>>,
}

#[allow(dead_code)]
impl RecordingInterface {
    pub fn calls(&self) -> Vec<UpdateType> {
        self.calls.lock().clone()
    }
}

impl UpdateInterface for RecordingInterface {
    fn dispatch(&self, update_type: UpdateType) {
        self.calls.lock().push(update_type);
    }
}

/// Unique scratch file path under the system temp dir.
#[allow(dead_code)]
pub fn scratch_path(name: &str) -> std::path::PathBuf {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    let n = COUNTER.fetch_add(1, Ordering::SeqCst);
    std::env::temp_dir().join(format!("unified-param-{}-{}-{}", std::process::id(), n, name))
}
