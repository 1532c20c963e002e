mod common;

use std::sync::atomic::Ordering;

use common::{MockConfig, MockGeometry, scratch_path};
use unified_param::prelude::*;

const POSITION_X: &str = "geometry/transform/position/x";
const SCALE: &str = "geometry/transform/scale";

/// A manager whose dispatch is not rate limited.
fn unthrottled() -> UnifiedParameterManager {
    UnifiedParameterManagerBuilder::default()
        .with_optimization(false)
        .build()
        .unwrap()
}

#[test]
fn test_set_position_rebuilds_once() {
    let manager = UnifiedParameterManagerBuilder::default().build().unwrap();
    let geometry = MockGeometry::shared();
    assert!(manager.register_geometry(geometry.clone()));

    assert_eq!(
        manager.set_parameter(POSITION_X, 5.0.into()),
        UpdateOutcome::Applied
    );
    assert_eq!(geometry.position()[0], 5.0);
    assert_eq!(geometry.builds(), 1);
    assert_eq!(manager.get::<f64>(POSITION_X).unwrap(), 5.0);
}

#[test]
fn test_registration_is_idempotent() {
    let manager = unthrottled();
    let geometry = MockGeometry::shared();
    let config = MockConfig::shared();
    assert!(manager.register_geometry(geometry.clone()));
    assert!(!manager.register_geometry(geometry.clone()));
    assert!(manager.register_rendering_config(config.clone()));
    assert!(!manager.register_rendering_config(config.clone()));
    assert_eq!(manager.registered_geometry_count(), 1);
    assert_eq!(manager.registered_config_count(), 1);
    assert_eq!(manager.update_manager().interface_count(), 2);

    assert!(manager.unregister_geometry(&geometry));
    assert!(!manager.unregister_geometry(&geometry));
    assert_eq!(manager.update_manager().interface_count(), 1);

    manager.set_parameter(SCALE, 2.0.into());
    assert_eq!(geometry.scale(), 1.0);
    assert_eq!(geometry.builds(), 0);
}

#[test]
fn test_batch_merges_refreshes() {
    let manager = UnifiedParameterManagerBuilder::default().build().unwrap();
    let geometry = MockGeometry::shared();
    manager.register_geometry(geometry.clone());

    {
        let batch = manager.batch();
        batch.set("geometry/transform/position/x", 1.0);
        batch.set("geometry/transform/position/y", 2.0);
        batch.set(SCALE, 3.0);
        batch.set("material/properties/shininess", 80.0);
        assert!(manager.is_in_batch_operation());
        assert_eq!(geometry.builds(), 0);
        assert_eq!(geometry.scale(), 1.0);
    }

    assert!(!manager.is_in_batch_operation());
    assert_eq!(geometry.position(), [1.0, 2.0, 0.0]);
    assert_eq!(geometry.scale(), 3.0);
    assert_eq!(geometry.material_shininess(), 80.0);
    assert_eq!(geometry.builds(), 1);
    assert_eq!(geometry.lighting_refreshes.load(Ordering::SeqCst), 1);
    assert_eq!(manager.update_manager().stats().throttled, 0);
    assert_eq!(manager.changed_parameters().len(), 4);
}

#[test]
fn test_normal_priority_waits_for_processing() {
    let manager = unthrottled();
    let config = MockConfig::shared();
    manager.register_rendering_config(config.clone());

    manager.set_parameter("rendering/mode/display_mode", DisplayMode::Points.into());
    assert_eq!(config.display_mode(), DisplayMode::Points);
    assert_eq!(config.notifications(), 0);
    assert_eq!(manager.update_manager().pending_task_count(), 1);

    assert_eq!(manager.update_manager().process_update_tasks(), 1);
    assert_eq!(config.notifications(), 1);
}

#[test]
fn test_system_changes_flow_back() {
    let manager = UnifiedParameterManagerBuilder::default()
        .with_optimization(false)
        .with_sync_direction(SyncDirection::BIDIRECTIONAL)
        .build()
        .unwrap();
    let geometry = MockGeometry::shared();
    manager.register_geometry(geometry.clone());
    let notifier = manager.synchronizer().notifier_for(&geometry);

    geometry.set_scale(4.0);
    notifier.notify(SCALE);
    assert_eq!(manager.synchronizer().process_system_changes(), 1);
    assert_eq!(manager.get::<f64>(SCALE).unwrap(), 4.0);
    assert_eq!(geometry.builds(), 1);
}

#[test]
fn test_save_and_load() {
    let path = scratch_path("params.json");
    let manager = unthrottled();
    manager.set_parameter("material/color/specular", Color::rgb(0.3, 0.3, 0.3).into());
    manager.set_parameter("shadow/mode/shadow_mode", ShadowMode::Cascade.into());
    manager.save_to_json(&path).unwrap();

    let restored = unthrottled();
    let geometry = MockGeometry::shared();
    restored.register_geometry(geometry.clone());
    let report = restored.load_from_json(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(report.unknown, 0);
    assert_eq!(report.rejected, 0);
    assert_eq!(
        restored.get::<ShadowMode>("shadow/mode/shadow_mode").unwrap(),
        ShadowMode::Cascade
    );
    assert_eq!(geometry.material_specular_color(), Color::rgb(0.3, 0.3, 0.3));
    assert!(!restored.is_in_batch_operation());
}

#[test]
fn test_load_missing_file_fails() {
    let manager = unthrottled();
    assert!(matches!(
        manager.load_from_json(scratch_path("missing.json")),
        Err(Error::Io(_))
    ));
    assert!(!manager.is_in_batch_operation());
}

#[test]
fn test_overrides_file_applied_at_build() {
    let path = scratch_path("overrides.yaml");
    std::fs::write(
        &path,
        "geometry:\n  transform:\n    scale: 2\nlighting:\n  model:\n    lighting_model: lambert\nbogus/path: 1\n",
    )
    .unwrap();

    let manager = UnifiedParameterManagerBuilder::default()
        .with_overrides_file(&path)
        .build()
        .unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(manager.get::<f64>(SCALE).unwrap(), 2.0);
    assert_eq!(
        manager.get::<LightingModel>("lighting/model/lighting_model").unwrap(),
        LightingModel::Lambert
    );
    assert!(!manager.has_parameter("bogus/path"));
}

#[test]
fn test_without_catalog_starts_empty() {
    let manager = UnifiedParameterManagerBuilder::default()
        .without_default_catalog()
        .build()
        .unwrap();
    assert!(manager.all_parameter_paths().is_empty());
    assert_eq!(manager.set_parameter(SCALE, 1.0.into()), UpdateOutcome::NotFound);
    assert!(matches!(manager.get::<f64>(SCALE), Err(Error::NotFound(_))));
}

#[test]
fn test_config_reaches_subsystems() {
    let manager = UnifiedParameterManagerBuilder::default()
        .with_max_updates_per_second(30)
        .with_debug_mode(true)
        .with_sync_direction(SyncDirection::NONE)
        .build()
        .unwrap();
    let updates = manager.update_manager();
    assert_eq!(updates.update_frequency_limit(), 30);
    assert!(updates.is_debug_mode());
    assert!(updates.is_optimization_enabled());
    assert_eq!(
        manager.synchronizer().default_sync_direction(),
        SyncDirection::NONE
    );

    manager.enable_optimization(false);
    manager.set_update_frequency_limit(0);
    manager.enable_debug_mode(false);
    assert!(!updates.is_optimization_enabled());
    assert_eq!(updates.update_frequency_limit(), 0);
    assert!(!updates.is_debug_mode());
}
