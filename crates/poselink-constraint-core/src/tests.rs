//! Behavioural coverage for constraint construction and removal.

use crate::builder::build_parent_constraint;
use crate::config::{AxisFilter, BlendWeights, ConstraintConfig, ConstraintKind};
use crate::error::ConstraintError;
use crate::primitives::set_matrix_constant;
use crate::remove::remove_constraint;
use poselink_scene_core::{
    node_output, world_matrix, Axis, Channel, InPort, Mat4, NodeKind, OutPort, Scene, SceneError,
    SceneObject, Source,
};

const TOL: f32 = 1e-3;

/// Driven under a transformed parent, with two drivers posed apart.
fn rig() -> Scene {
    let mut scene = Scene::new();
    scene.add_object(SceneObject::new("offset_grp").with_translate([1.0, 2.0, 3.0]));
    scene.add_object(
        SceneObject::new("cube")
            .with_parent("offset_grp")
            .with_translate([2.0, 0.0, 0.0])
            .with_rotate([0.3, 0.0, 0.0]),
    );
    scene.add_object(
        SceneObject::new("locator_a")
            .with_translate([5.0, 1.0, 0.0])
            .with_rotate([0.0, 0.4, 0.0]),
    );
    scene.add_object(SceneObject::new("locator_b").with_translate([-2.0, 3.0, 1.0]));
    scene
}

/// Flat rig: driven has no parent, so constraint output maps straight to
/// world space and blend arithmetic is easy to assert.
fn flat_rig(driver_positions: &[(&str, [f32; 3])]) -> Scene {
    let mut scene = Scene::new();
    scene.add_object(SceneObject::new("cube").with_translate([2.0, 0.0, 0.0]));
    for (name, pos) in driver_positions {
        scene.add_object(SceneObject::new(*name).with_translate(*pos));
    }
    scene
}

fn single_driver_config() -> ConstraintConfig {
    ConstraintConfig::new("cube", vec!["locator_a".into()])
}

// --- §8.1 offset correctness ---------------------------------------------

#[test]
fn offset_preserves_world_pose_at_build_time() {
    let mut scene = rig();
    let before = world_matrix(&scene, "cube").unwrap();

    let mut config = single_driver_config();
    config.offset = true;
    build_parent_constraint(&mut scene, &config).unwrap();

    let after = world_matrix(&scene, "cube").unwrap();
    assert!(
        after.approx_eq(&before, TOL),
        "offset build must not move the driven:\n{before:?}\nvs\n{after:?}"
    );
}

#[test]
fn offset_rides_along_when_driver_moves() {
    let mut scene = rig();
    let before = world_matrix(&scene, "cube").unwrap();
    let driver_before = world_matrix(&scene, "locator_a").unwrap();
    let relative = before.mul(&driver_before.affine_inverse());

    let mut config = single_driver_config();
    config.offset = true;
    build_parent_constraint(&mut scene, &config).unwrap();

    scene.object_mut("locator_a").unwrap().translate = [9.0, -4.0, 2.0];
    let driver_now = world_matrix(&scene, "locator_a").unwrap();
    let expected = relative.mul(&driver_now);
    let actual = world_matrix(&scene, "cube").unwrap();
    assert!(actual.approx_eq(&expected, TOL));
}

// --- §8.2 filter behaviour ------------------------------------------------

#[test]
fn all_enabled_filters_follow_driver_exactly() {
    let mut scene = rig();
    let config = single_driver_config();
    let handle = build_parent_constraint(&mut scene, &config).unwrap();

    // Pass-through topology: no decompose/compose/pick nodes were needed.
    for node in &handle.nodes {
        assert!(matches!(
            scene.node_kind(node),
            Some(NodeKind::MultMatrix | NodeKind::HoldMatrix | NodeKind::BlendMatrix)
        ));
    }

    // With no offset the driven lands exactly on the driver.
    let driver = world_matrix(&scene, "locator_a").unwrap();
    let driven = world_matrix(&scene, "cube").unwrap();
    assert!(driven.approx_eq(&driver, TOL));
}

#[test]
fn disabled_axes_collapse_to_identity() {
    let mut scene = rig();
    let mut config = single_driver_config();
    config.translate = AxisFilter {
        x: true,
        y: false,
        z: true,
    };
    build_parent_constraint(&mut scene, &config).unwrap();

    let driven = world_matrix(&scene, "cube").unwrap().decompose();
    // Driver sits at (5, 1, 0); the filtered Y component drops to zero.
    assert!((driven.translate[0] - 5.0).abs() < TOL);
    assert!(driven.translate[1].abs() < TOL);
    // Rotation passes through untouched.
    assert!((driven.rotate[1] - 0.4).abs() < TOL);
}

#[test]
fn whole_group_filter_uses_pick_topology() {
    let mut scene = rig();
    let mut config = single_driver_config();
    config.rotate = AxisFilter::NONE;
    config.scale = AxisFilter::NONE;
    config.shear = AxisFilter::NONE;
    let handle = build_parent_constraint(&mut scene, &config).unwrap();

    assert!(handle
        .nodes
        .iter()
        .any(|n| scene.node_kind(n) == Some(NodeKind::PickMatrix)));
    let driven = world_matrix(&scene, "cube").unwrap().decompose();
    assert!((driven.translate[0] - 5.0).abs() < TOL);
    assert!(driven.rotate.iter().all(|r| r.abs() < TOL));
}

// --- §8.3 blend node elision ----------------------------------------------

#[test]
fn single_driver_without_envelope_skips_blend() {
    let mut scene = rig();
    let handle = build_parent_constraint(&mut scene, &single_driver_config()).unwrap();

    assert!(handle.blend.is_none());
    assert!(!scene
        .node_names()
        .any(|n| scene.node_kind(n) == Some(NodeKind::BlendMatrix)));
    // The chain output feeds the sink directly.
    assert_eq!(scene.sink_upstream("cube"), Some(handle.chains[0].as_str()));
}

#[test]
fn multiple_drivers_blend_their_chains() {
    let mut scene = rig();
    let config = ConstraintConfig::new("cube", vec!["locator_a".into(), "locator_b".into()]);
    let handle = build_parent_constraint(&mut scene, &config).unwrap();

    let blend = handle.blend.expect("two drivers need a blend node");
    assert_eq!(scene.sink_upstream("cube"), Some(blend.as_str()));
    assert_eq!(handle.chains.len(), 2);
}

// --- §8.4 build/remove round trip -----------------------------------------

#[test]
fn round_trip_restores_prebuild_state() {
    let mut scene = rig();
    scene
        .set_offset_parent("cube", Mat4::from_translation([0.0, 0.0, 7.0]))
        .unwrap();
    // A live scalar connection into a raw channel, preserved across the
    // constraint's lifetime.
    scene
        .create_node("ext_decompose", NodeKind::DecomposeMatrix, None)
        .unwrap();
    scene
        .connect("ext_decompose", InPort::InMatrix, Source::world("locator_b"))
        .unwrap();
    let ext_source = Source::scalar("ext_decompose", Channel::Translate, Axis::X);
    scene
        .connect_channel("cube", Channel::Translate, Axis::X, ext_source.clone())
        .unwrap();

    let translate_before = scene.object("cube").unwrap().translate;
    let rotate_before = scene.object("cube").unwrap().rotate;

    let mut config = single_driver_config();
    config.offset = true;
    config.keep_hold = true;
    build_parent_constraint(&mut scene, &config).unwrap();

    // The constraint took the channels over.
    assert_eq!(scene.object("cube").unwrap().translate, [0.0; 3]);

    remove_constraint(&mut scene, "cube", None).unwrap();

    let cube = scene.object("cube").unwrap();
    assert_eq!(cube.translate, translate_before);
    assert_eq!(cube.rotate, rotate_before);
    assert_eq!(
        cube.offset_parent,
        Mat4::from_translation([0.0, 0.0, 7.0])
    );
    assert_eq!(
        cube.channel_inputs.get(&(Channel::Translate, Axis::X)),
        Some(&ext_source)
    );
    assert!(scene.offset_parent_source("cube").unwrap().is_none());
    assert!(scene.custom_attr_names("cube").is_empty());
    assert!(scene.tagged_nodes("cube").is_empty());
    // The unrelated external node survives teardown.
    assert!(scene.has_node("ext_decompose"));
}

// --- §8.5 hold indirection -------------------------------------------------

#[test]
fn hold_node_stays_editable_after_build() {
    let mut scene = rig();
    let mut config = single_driver_config();
    config.offset = true;
    config.keep_hold = true;
    let handle = build_parent_constraint(&mut scene, &config).unwrap();

    let hold = handle.holds.first().expect("keep_hold creates a hold node");
    let before = world_matrix(&scene, "cube").unwrap();

    set_matrix_constant(
        &mut scene,
        hold,
        InPort::InMatrix,
        Mat4::from_translation([0.0, 50.0, 0.0]),
    )
    .unwrap();
    let after = world_matrix(&scene, "cube").unwrap();
    assert!(!after.approx_eq(&before, TOL), "editing the hold must retarget the output");
}

#[test]
fn baked_offset_has_no_editable_node() {
    let mut scene = rig();
    let mut config = single_driver_config();
    config.offset = true;
    let handle = build_parent_constraint(&mut scene, &config).unwrap();

    assert!(handle.holds.is_empty());
    assert!(!scene
        .node_names()
        .any(|n| scene.node_kind(n) == Some(NodeKind::HoldMatrix)));
    // The baked value sits directly on the chain's offset slot.
    let chain = scene.node(&handle.chains[0]).unwrap();
    assert!(chain.constants.contains_key(&InPort::MatrixIn(0)));
}

// --- §8.6 envelope endpoints ----------------------------------------------

#[test]
fn envelope_weight_zero_keeps_preconstraint_pose() {
    let mut scene = rig();
    let before = world_matrix(&scene, "cube").unwrap();

    let mut config = single_driver_config();
    config.envelope = true;
    config.weights = BlendWeights {
        translate: 0.0,
        rotate: 0.0,
        scale: 0.0,
        shear: 0.0,
        envelope: 1.0,
    };
    build_parent_constraint(&mut scene, &config).unwrap();

    let after = world_matrix(&scene, "cube").unwrap();
    assert!(after.approx_eq(&before, TOL));
}

#[test]
fn envelope_weight_one_matches_unblended_chain() {
    let mut scene = rig();
    let mut config = single_driver_config();
    config.envelope = true;
    let handle = build_parent_constraint(&mut scene, &config).unwrap();

    let blend = handle.blend.expect("envelope forces a blend node");
    let chain_out = node_output(&scene, &handle.chains[0], &OutPort::Matrix).unwrap();
    let blend_out = node_output(&scene, &blend, &OutPort::Matrix).unwrap();
    assert!(blend_out
        .as_matrix()
        .unwrap()
        .approx_eq(chain_out.as_matrix().unwrap(), TOL));
}

#[test]
fn envelope_midpoint_interpolates_translation() {
    let mut scene = flat_rig(&[("locator_a", [10.0, 0.0, 0.0])]);
    let mut config = single_driver_config();
    config.envelope = true;
    config.weights.translate = 0.5;
    config.weights.rotate = 0.5;
    config.weights.scale = 0.5;
    config.weights.shear = 0.5;
    build_parent_constraint(&mut scene, &config).unwrap();

    // Pre-constraint x = 2, driver x = 10, halfway = 6.
    let driven = world_matrix(&scene, "cube").unwrap();
    assert!((driven.translation()[0] - 6.0).abs() < TOL);
}

// --- open question: explicit weight wiring ---------------------------------

#[test]
fn channel_weights_apply_per_blend_target() {
    let mut scene = flat_rig(&[("locator_a", [4.0, 0.0, 0.0]), ("locator_b", [8.0, 0.0, 0.0])]);
    let mut config =
        ConstraintConfig::new("cube", vec!["locator_a".into(), "locator_b".into()]);
    config.weights.translate = 0.5;
    build_parent_constraint(&mut scene, &config).unwrap();

    // Successive blending from identity: 0 -> 2 (toward 4), 2 -> 5 (toward 8).
    let driven = world_matrix(&scene, "cube").unwrap();
    assert!((driven.translation()[0] - 5.0).abs() < TOL);
}

#[test]
fn envelope_scalar_scales_all_targets() {
    let mut scene = flat_rig(&[("locator_a", [10.0, 0.0, 0.0])]);
    let mut config = single_driver_config();
    config.envelope = true;
    config.weights.envelope = 0.5;
    build_parent_constraint(&mut scene, &config).unwrap();

    // Base x = 2, target x = 10, envelope 0.5 -> 6.
    let driven = world_matrix(&scene, "cube").unwrap();
    assert!((driven.translation()[0] - 6.0).abs() < TOL);
}

// --- §8.7 detection safety --------------------------------------------------

#[test]
fn remove_without_constraint_is_silent_safe() {
    let mut scene = rig();
    let translate = scene.object("cube").unwrap().translate;

    let err = remove_constraint(&mut scene, "cube", None).unwrap_err();
    assert!(matches!(err, ConstraintError::ConstraintNotFound(_)));

    assert_eq!(scene.object("cube").unwrap().translate, translate);
    assert_eq!(scene.node_names().count(), 0);
    assert!(scene.custom_attr_names("cube").is_empty());
}

#[test]
fn remove_on_missing_object_is_unresolved() {
    let mut scene = Scene::new();
    let err = remove_constraint(&mut scene, "ghost", None).unwrap_err();
    assert!(matches!(
        err,
        ConstraintError::Scene(SceneError::UnresolvedReference(_))
    ));
}

// --- detection fallbacks -----------------------------------------------------

#[test]
fn untagged_constraints_are_found_by_name_heuristics() {
    let mut scene = rig();
    let mut config = single_driver_config();
    config.offset = true;
    let handle = build_parent_constraint(&mut scene, &config).unwrap();

    // Simulate a graph authored before tagging existed.
    for node in &handle.nodes {
        scene.node_mut(node).unwrap().tag = None;
    }

    remove_constraint(&mut scene, "cube", None).unwrap();
    for node in &handle.nodes {
        assert!(!scene.has_node(node), "legacy path must still delete `{node}`");
    }
    assert!(scene.offset_parent_source("cube").unwrap().is_none());
}

#[test]
fn declared_kind_skips_detection() {
    let mut scene = rig();
    let handle = build_parent_constraint(&mut scene, &single_driver_config()).unwrap();
    remove_constraint(&mut scene, "cube", Some(ConstraintKind::Parent)).unwrap();
    for node in &handle.nodes {
        assert!(!scene.has_node(node));
    }
}

// --- failure semantics -------------------------------------------------------

#[test]
fn missing_driver_aborts_before_any_node_exists() {
    let mut scene = rig();
    let config = ConstraintConfig::new("cube", vec!["locator_a".into(), "ghost".into()]);
    let err = build_parent_constraint(&mut scene, &config).unwrap_err();
    assert!(matches!(
        err,
        ConstraintError::Scene(SceneError::UnresolvedReference(_))
    ));
    assert_eq!(scene.node_names().count(), 0);
}

#[test]
fn empty_driver_list_is_invalid() {
    let mut scene = rig();
    let config = ConstraintConfig::new("cube", Vec::new());
    let err = build_parent_constraint(&mut scene, &config).unwrap_err();
    assert!(matches!(
        err,
        ConstraintError::Scene(SceneError::InvalidInput(_))
    ));
}

#[test]
fn mid_build_failure_rolls_the_scene_back() {
    let mut scene = rig();
    // Occupy the name the builder will ask for, forcing a failure after
    // validation has passed.
    scene
        .create_node(
            "multmatrix_cube_pconstrainedby_locator_a",
            NodeKind::HoldMatrix,
            None,
        )
        .unwrap();
    let translate = scene.object("cube").unwrap().translate;

    let err = build_parent_constraint(&mut scene, &single_driver_config()).unwrap_err();
    assert!(matches!(err, ConstraintError::Scene(SceneError::InvalidInput(_))));

    // Transaction rollback: nothing but the squatter remains.
    assert_eq!(scene.node_names().count(), 1);
    assert_eq!(scene.object("cube").unwrap().translate, translate);
    assert!(scene.custom_attr_names("cube").is_empty());
}

// --- parentless driven -------------------------------------------------------

#[test]
fn parentless_driven_uses_implicit_identity_parent() {
    let mut scene = flat_rig(&[("locator_a", [3.0, 1.0, 0.0])]);
    build_parent_constraint(&mut scene, &single_driver_config()).unwrap();

    let driven = world_matrix(&scene, "cube").unwrap();
    assert!((driven.translation()[0] - 3.0).abs() < TOL);
    assert!((driven.translation()[1] - 1.0).abs() < TOL);
}
