use criterion::{black_box, criterion_group, criterion_main, Criterion};
use poselink_constraint_core::{build_parent_constraint, remove_constraint, ConstraintConfig};
use poselink_scene_core::{world_matrix, Scene, SceneObject};

fn rig(driver_count: usize) -> (Scene, ConstraintConfig) {
    let mut scene = Scene::new();
    scene.add_object(SceneObject::new("root").with_translate([1.0, 2.0, 3.0]));
    scene.add_object(
        SceneObject::new("driven")
            .with_parent("root")
            .with_translate([2.0, 0.5, -1.0])
            .with_rotate([0.3, -0.2, 0.1]),
    );
    let mut drivers = Vec::with_capacity(driver_count);
    for i in 0..driver_count {
        let name = format!("driver_{i}");
        scene.add_object(
            SceneObject::new(&name)
                .with_translate([i as f32, 1.0, 0.0])
                .with_rotate([0.0, 0.1 * i as f32, 0.0]),
        );
        drivers.push(name);
    }
    let mut config = ConstraintConfig::new("driven", drivers);
    config.offset = true;
    config.keep_hold = true;
    (scene, config)
}

fn bench_build_teardown(c: &mut Criterion) {
    let mut group = c.benchmark_group("constraint_build");
    for driver_count in [1usize, 4] {
        let (scene, config) = rig(driver_count);
        group.bench_function(format!("build_remove_{driver_count}_drivers"), |b| {
            b.iter(|| {
                let mut scene = scene.clone();
                build_parent_constraint(&mut scene, black_box(&config)).unwrap();
                remove_constraint(&mut scene, "driven", None).unwrap();
                black_box(scene)
            })
        });
    }
    group.finish();
}

fn bench_eval(c: &mut Criterion) {
    let (mut scene, config) = rig(4);
    build_parent_constraint(&mut scene, &config).unwrap();
    c.bench_function("constrained_world_matrix", |b| {
        b.iter(|| world_matrix(black_box(&scene), "driven").unwrap())
    });
}

criterion_group!(benches, bench_build_teardown, bench_eval);
criterion_main!(benches);
