#![allow(dead_code)]

use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::{anyhow, Result};
use caustics_bake::{
    FlatReceiverRenderer, RenderPass, RenderRequest, RenderSettings, Renderer,
};
use caustics_geometry::Aabb;
use caustics_scene::{Classification, Light, SceneContext, SceneObject};
use caustics_splat::SampleBuffer;
use glam::Vec3;
use parking_lot::Mutex;

/// 64 pixel sensor renders.
pub const SAMPLE_RESOLUTION_MULTIPLIER: f32 = 1.0 / 16.0;

pub fn add(scene: &mut SceneContext, name: &str, min: Vec3, max: Vec3, class: Classification) {
    let uuid = scene
        .add_object(SceneObject::from_aabb(name, Aabb::new(min, max)))
        .unwrap();
    scene.classify(uuid, class).unwrap();
}

pub fn add_sun(scene: &mut SceneContext, energy: f32) {
    let sun = scene.add_light(Light::directional("sun", Vec3::NEG_Z, energy));
    scene.classify(sun, Classification::Source).unwrap();
}

/// A unit glass pane hovering over a 4x4 floor, lit from straight above.
pub fn pane_over_floor() -> SceneContext {
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
        Vec3::new(-2.0, -2.0, 0.0),
        Vec3::new(2.0, 2.0, 0.0),
        Classification::Receiver,
    );
    add_sun(&mut scene, 1.0);
    scene
}

#[derive(Clone, Default)]
pub struct RenderLog {
    pub passes: Arc<Mutex<Vec<(RenderPass, u32)>>>,
    pub setups: Arc<AtomicUsize>,
    pub restored: Arc<AtomicBool>,
}

impl RenderLog {
    pub fn renders(&self) -> usize {
        self.passes.lock().len()
    }

    pub fn was_restored(&self) -> bool {
        self.restored.load(Ordering::Acquire)
    }
}

/// Wraps the flat renderer, recording what it was asked to do.
pub struct RecordingRenderer {
    pub inner: FlatReceiverRenderer,
    pub log: RenderLog,
    pub delay: Option<Duration>,
    pub fail: bool,
}

impl RecordingRenderer {
    pub fn new(log: &RenderLog) -> Self {
        Self {
            inner: FlatReceiverRenderer::new(),
            log: log.clone(),
            delay: None,
            fail: false,
        }
    }
}

impl Renderer for RecordingRenderer {
    fn setup(&mut self, scene: &SceneContext, settings: &RenderSettings) -> Result<()> {
        self.log.setups.fetch_add(1, Ordering::AcqRel);
        self.inner.setup(scene, settings)
    }

    fn render(&mut self, request: &RenderRequest) -> Result<SampleBuffer> {
        self.log.passes.lock().push((request.pass, request.seed));
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if self.fail {
            return Err(anyhow!("device lost"));
        }
        self.inner.render(request)
    }

    fn restore(&mut self) {
        self.log.restored.store(true, Ordering::Release);
        self.inner.restore();
    }
}
