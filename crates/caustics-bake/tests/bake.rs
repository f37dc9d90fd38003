mod common;

use std::time::Duration;

use caustics_bake::{
    run_bake, BakeConfig, BakeError, Collaborators, ConfigError, ExrStorage, RenderPass,
    TargetSelection, TextureStorage,
};
use caustics_camera::ORTHO_NORMALIZATION;
use caustics_scene::{Classification, SceneContext};
use caustics_texture::TargetTexture;
use common::*;
use glam::Vec3;
use pretty_assertions::assert_eq;

fn config(samples: u32) -> BakeConfig {
    BakeConfig {
        target: TargetSelection::New {
            resolution: 64,
            image_name: "cb".to_owned(),
        },
        samples,
        sample_resolution_multiplier: SAMPLE_RESOLUTION_MULTIPLIER,
        ..Default::default()
    }
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        ((actual - expected) / expected).abs() < 1e-3,
        "{actual} is not close to {expected}"
    );
}

#[test]
fn sun_through_pane_bakes_expected_flux() {
    let log = RenderLog::default();
    let handle = run_bake(
        &config(4),
        pane_over_floor(),
        Collaborators::new(RecordingRenderer::new(&log)).with_storage(None),
    )
    .unwrap();

    let output = handle.join().unwrap();

    // One unit-area sensor, four samples, every pixel landing on the floor.
    assert_eq!(log.renders(), 4);
    assert_close(
        output.texture.total_energy().x,
        64.0 * 64.0 * ORTHO_NORMALIZATION as f64,
    );
    assert!(output.texture.data().iter().all(|texel| texel.w == 1.0));
    assert_eq!(output.path, None);
    assert!(log.was_restored());
}

#[test]
fn colored_bake_renders_two_passes_per_sample() {
    let log = RenderLog::default();
    let handle = run_bake(
        &BakeConfig {
            colored: true,
            ..config(3)
        },
        pane_over_floor(),
        Collaborators::new(RecordingRenderer::new(&log)).with_storage(None),
    )
    .unwrap();

    let output = handle.join().unwrap();

    let passes = log.passes.lock().clone();
    assert_eq!(passes.len(), 6);
    for pair in passes.chunks(2) {
        assert_eq!(pair[0].0, RenderPass::Coordinates);
        assert_eq!(pair[1].0, RenderPass::Color);
        assert_eq!(pair[0].1, pair[1].1);
    }
    assert!(passes[0].1 < passes[2].1);

    let energy = output.texture.total_energy();
    assert_close(energy.x, 64.0 * 64.0 * ORTHO_NORMALIZATION as f64);
    assert_close(energy.y, energy.x);
}

#[test]
fn every_light_adds_its_energy() {
    let mut scene = pane_over_floor();
    add_sun(&mut scene, 2.0);

    let handle = run_bake(
        &config(2),
        scene,
        Collaborators::new(RecordingRenderer::new(&RenderLog::default())).with_storage(None),
    )
    .unwrap();
    let output = handle.join().unwrap();

    // Energies 1 and 2, scaled because the bake has more than one light.
    assert_close(
        output.texture.total_energy().x,
        3.0 * 64.0 * 64.0 * ORTHO_NORMALIZATION as f64,
    );
}

#[test]
fn sensor_missing_receiver_is_skipped() {
    let mut scene = SceneContext::new();
    add(
        &mut scene,
        "pane",
        Vec3::new(-0.5, -0.5, 1.0),
        Vec3::new(0.5, 0.5, 1.0),
        Classification::Contributor,
    );
    add(
        &mut scene,
        "floor",
        Vec3::new(10.0, 10.0, 0.0),
        Vec3::new(14.0, 14.0, 0.0),
        Classification::Receiver,
    );
    add_sun(&mut scene, 1.0);

    let log = RenderLog::default();
    let handle = run_bake(
        &config(8),
        scene,
        Collaborators::new(RecordingRenderer::new(&log)).with_storage(None),
    )
    .unwrap();
    let output = handle.join().unwrap();

    assert_eq!(log.renders(), 1);
    assert_eq!(output.texture.total_energy().x, 0.0);
    assert_eq!(output.texture.resolution(), 64);
}

#[test]
fn finished_texture_is_saved() {
    let dir = tempfile::tempdir().unwrap();
    let handle = run_bake(
        &BakeConfig {
            output_dir: Some(dir.path().to_owned()),
            ..config(1)
        },
        pane_over_floor(),
        Collaborators::new(RecordingRenderer::new(&RenderLog::default())),
    )
    .unwrap();

    let output = handle.join().unwrap();

    let path = dir.path().join("cb.exr");
    assert_eq!(output.path.as_deref(), Some(path.as_path()));
    assert_eq!(TargetTexture::load(&path).unwrap(), output.texture);
}

#[test]
fn existing_target_sets_resolution_and_name() {
    let dir = tempfile::tempdir().unwrap();
    let existing = dir.path().join("floor_caustics.exr");
    ExrStorage
        .save(&existing, &TargetTexture::new(32).unwrap())
        .unwrap();

    let handle = run_bake(
        &BakeConfig {
            target: TargetSelection::Existing {
                path: existing.clone(),
            },
            output_dir: Some(dir.path().join("out")),
            ..config(1)
        },
        pane_over_floor(),
        Collaborators::new(RecordingRenderer::new(&RenderLog::default())),
    )
    .unwrap();
    let output = handle.join().unwrap();

    assert_eq!(output.texture.resolution(), 32);
    assert_eq!(
        output.path,
        Some(dir.path().join("out").join("floor_caustics.exr"))
    );
}

#[test]
fn configuration_errors_come_before_rendering() {
    let mut scene = SceneContext::new();
    add(
        &mut scene,
        "pane",
        Vec3::new(-0.5, -0.5, 1.0),
        Vec3::new(0.5, 0.5, 1.0),
        Classification::Contributor,
    );
    add_sun(&mut scene, 1.0);

    let log = RenderLog::default();
    let result = run_bake(
        &config(4),
        scene,
        Collaborators::new(RecordingRenderer::new(&log)),
    );

    assert!(matches!(result, Err(ConfigError::NoReceivers)));
    assert_eq!(log.setups.load(std::sync::atomic::Ordering::Acquire), 0);

    let zero_samples = run_bake(
        &config(0),
        pane_over_floor(),
        Collaborators::new(RecordingRenderer::new(&log)),
    );
    assert!(matches!(zero_samples, Err(ConfigError::ZeroSamples)));

    let no_pixels = run_bake(
        &BakeConfig {
            sample_resolution_multiplier: 0.0,
            ..config(1)
        },
        pane_over_floor(),
        Collaborators::new(RecordingRenderer::new(&log)),
    );
    assert!(matches!(
        no_pixels,
        Err(ConfigError::ZeroSampleResolution(_))
    ));
    assert_eq!(log.renders(), 0);
}

#[test]
fn cancelled_bake_restores_renderer() {
    let log = RenderLog::default();
    let renderer = RecordingRenderer {
        delay: Some(Duration::from_millis(20)),
        ..RecordingRenderer::new(&log)
    };
    let handle = run_bake(
        &config(1000),
        pane_over_floor(),
        Collaborators::new(renderer).with_storage(None),
    )
    .unwrap();

    handle.cancel();
    let result = handle.join();

    assert!(matches!(result, Err(BakeError::Cancelled)));
    assert!(log.renders() < 1000);
    assert!(log.was_restored());
}

#[test]
fn failing_renderer_restores_and_reports() {
    let log = RenderLog::default();
    let renderer = RecordingRenderer {
        fail: true,
        ..RecordingRenderer::new(&log)
    };
    let handle = run_bake(
        &config(2),
        pane_over_floor(),
        Collaborators::new(renderer).with_storage(None),
    )
    .unwrap();

    let result = handle.join();

    assert!(matches!(result, Err(BakeError::Render(_))));
    assert_eq!(log.renders(), 1);
    assert!(log.was_restored());
}
