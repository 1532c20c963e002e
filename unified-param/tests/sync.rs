mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use common::{MockConfig, MockGeometry};
use unified_param::catalog;
use unified_param::prelude::*;

const POSITION_X: &str = "geometry/transform/position/x";
const SCALE: &str = "geometry/transform/scale";

fn synchronizer() -> Arc<ParameterSynchronizer> {
    let tree = Arc::new(ParameterTree::new());
    catalog::register_defaults(&tree).unwrap();
    ParameterSynchronizer::new(tree)
}

#[test]
fn test_synchronize_is_idempotent() {
    let sync = synchronizer();
    let geometry = MockGeometry::shared();
    assert!(sync.synchronize_geometry(geometry.clone()));
    assert!(!sync.synchronize_geometry(geometry.clone()));
    assert_eq!(sync.synchronized_geometry_count(), 1);
    assert!(sync.is_synchronized(&geometry));
    assert!(sync.is_parameter_synchronized(POSITION_X));

    assert!(sync.unsynchronize_geometry(&geometry));
    assert!(!sync.unsynchronize_geometry(&geometry));
    assert_eq!(sync.synchronized_geometry_count(), 0);
    assert!(!sync.is_parameter_synchronized(POSITION_X));
}

#[test]
fn test_kind_must_match_on_unsynchronize() {
    let sync = synchronizer();
    let config = MockConfig::shared();
    assert!(sync.synchronize_rendering_config(config.clone()));
    assert_eq!(sync.synchronized_config_count(), 1);
    assert_eq!(sync.synchronized_geometry_count(), 0);
    assert!(sync.unsynchronize_rendering_config(&config));
}

#[test]
fn test_tree_changes_reach_objects() {
    let sync = synchronizer();
    let geometry = MockGeometry::shared();
    let config = MockConfig::shared();
    sync.synchronize_geometry(geometry.clone());
    sync.synchronize_rendering_config(config.clone());

    let tree = sync.tree();
    tree.set_parameter_value(POSITION_X, 5.0.into());
    tree.set_parameter_value("material/color/diffuse", Color::rgb(0.5, 0.1, 0.1).into());
    tree.set_parameter_value("rendering/mode/display_mode", DisplayMode::Wireframe.into());
    tree.set_parameter_value("quality/level/tessellation_level", ParameterValue::Integer(6));

    assert_eq!(geometry.position(), [5.0, 0.0, 0.0]);
    assert_eq!(geometry.material_diffuse_color(), Color::rgb(0.5, 0.1, 0.1));
    assert_eq!(config.display_mode(), DisplayMode::Wireframe);
    assert_eq!(config.tessellation_level(), 6);
}

#[test]
fn test_batched_tree_changes_reach_objects_on_flush() {
    let sync = synchronizer();
    let geometry = MockGeometry::shared();
    sync.synchronize_geometry(geometry.clone());

    let tree = sync.tree();
    tree.begin_batch_update();
    tree.set_parameter_value(SCALE, 2.0.into());
    tree.set_parameter_value(SCALE, 4.0.into());
    assert_eq!(geometry.scale(), 1.0);
    tree.end_batch_update();
    assert_eq!(geometry.scale(), 4.0);
}

#[test]
fn test_disabled_or_unsynchronized_objects_are_left_alone() {
    let sync = synchronizer();
    let geometry = MockGeometry::shared();
    sync.synchronize_geometry(geometry.clone());

    sync.enable_synchronization(false);
    sync.tree().set_parameter_value(SCALE, 2.0.into());
    assert_eq!(geometry.scale(), 1.0);

    sync.enable_synchronization(true);
    sync.unsynchronize_geometry(&geometry);
    sync.tree().set_parameter_value(SCALE, 3.0.into());
    assert_eq!(geometry.scale(), 1.0);
}

#[test]
fn test_system_changes_need_direction() {
    let sync = synchronizer();
    let geometry = MockGeometry::shared();
    sync.synchronize_geometry(geometry.clone());
    let notifier = sync.notifier_for(&geometry);

    geometry.set_scale(2.0);
    assert!(notifier.notify(SCALE));
    assert_eq!(sync.process_system_changes(), 0);
    assert_eq!(sync.tree().get_parameter_value(SCALE), ParameterValue::Double(1.0));

    sync.set_sync_direction(SCALE, SyncDirection::BIDIRECTIONAL);
    assert!(notifier.notify(SCALE));
    assert_eq!(sync.process_system_changes(), 1);
    assert_eq!(sync.tree().get_parameter_value(SCALE), ParameterValue::Double(2.0));

    // Reporting an unchanged value writes nothing.
    notifier.notify(SCALE);
    assert_eq!(sync.process_system_changes(), 0);
}

#[test]
fn test_tree_to_system_off_for_one_path() {
    let sync = synchronizer();
    let geometry = MockGeometry::shared();
    sync.synchronize_geometry(geometry.clone());
    sync.set_sync_direction(SCALE, SyncDirection::SYSTEM_TO_TREE);

    sync.tree().set_parameter_value(SCALE, 2.0.into());
    sync.tree().set_parameter_value(POSITION_X, 2.0.into());
    assert_eq!(geometry.scale(), 1.0);
    assert_eq!(geometry.position()[0], 2.0);

    sync.clear_sync_direction(SCALE);
    assert_eq!(sync.sync_direction(SCALE), SyncDirection::TREE_TO_SYSTEM);
}

#[test]
fn test_batch_sync_defers_tree_writes() {
    let sync = synchronizer();
    sync.set_default_sync_direction(SyncDirection::BIDIRECTIONAL);
    let geometry = MockGeometry::shared();
    sync.synchronize_geometry(geometry.clone());
    let notifier = sync.notifier_for(&geometry);

    sync.begin_batch_sync();
    geometry.set_position([3.0, 0.0, 0.0]);
    notifier.notify(POSITION_X);
    assert_eq!(sync.process_system_changes(), 1);
    assert_eq!(sync.pending_sync_paths(), vec![POSITION_X]);
    assert_eq!(sync.tree().get_parameter_value(POSITION_X), ParameterValue::Double(0.0));

    sync.end_batch_sync();
    assert!(!sync.is_in_batch());
    assert!(sync.pending_sync_paths().is_empty());
    assert_eq!(sync.tree().get_parameter_value(POSITION_X), ParameterValue::Double(3.0));
}

#[test]
fn test_full_pushes_and_pulls() {
    let sync = synchronizer();
    let geometry = MockGeometry::shared();
    sync.synchronize_geometry(geometry.clone());

    geometry.set_scale(7.0);
    assert!(sync.sync_to_tree(&geometry) > 0);
    assert_eq!(sync.tree().get_parameter_value(SCALE), ParameterValue::Double(7.0));
    assert_eq!(sync.sync_from_tree(&geometry), 0);

    let other = MockGeometry::shared();
    assert_eq!(sync.sync_from_tree(&other), 0);
    sync.synchronize_geometry(other.clone());
    assert!(sync.sync_from_tree(&other) > 0);
    assert_eq!(other.scale(), 7.0);
}

#[test]
fn test_overlapping_writes_to_one_path_leave_object_current() {
    let sync = synchronizer();
    let geometry = MockGeometry::shared();
    sync.synchronize_geometry(geometry.clone());
    let tree = sync.tree().clone();

    let entered = Arc::new(AtomicBool::new(false));
    let flag = entered.clone();
    tree.add_changed_callback(
        SCALE,
        Arc::new(move |_, value| {
            if *value == ParameterValue::Double(5.0) {
                flag.store(true, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(200));
            }
        }),
    )
    .unwrap();

    let slow_writer = {
        let tree = tree.clone();
        thread::spawn(move || tree.set_parameter_value(SCALE, 5.0.into()))
    };
    while !entered.load(Ordering::SeqCst) {
        thread::yield_now();
    }
    assert_eq!(
        tree.set_parameter_value(SCALE, 7.0.into()),
        UpdateOutcome::Applied
    );
    assert_eq!(slow_writer.join().unwrap(), UpdateOutcome::Applied);

    assert_eq!(tree.get_parameter_value(SCALE), ParameterValue::Double(7.0));
    assert_eq!(geometry.scale(), 7.0);
}
