use anyhow::Result;
use caustics_camera::Sensor;
use caustics_scene::SceneContext;
use caustics_splat::SampleBuffer;
use caustics_texture::TargetTexture;
use uuid::Uuid;

use crate::config::Device;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPass {
    /// Receiver UV in `x`, `y` and validity in `z`.
    Coordinates,
    /// RGB energy for the pixels of the preceding coordinates pass.
    Color,
}

/// Renderer state that holds for the whole bake.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSettings {
    /// Side of every square render.
    pub resolution: u32,
    pub device: Device,
    pub colored: bool,
}

/// One render the scheduler needs before it can continue.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub light: Uuid,
    pub sensor: Sensor,
    pub pass: RenderPass,
    pub resolution: u32,
    /// Changes every sample so passes decorrelate; both passes of a colored sample share it.
    pub seed: u32,
}

/// The external renderer tracing sensor rays into the scene.
pub trait Renderer: Send {
    fn setup(&mut self, scene: &SceneContext, settings: &RenderSettings) -> Result<()>;

    fn render(&mut self, request: &RenderRequest) -> Result<SampleBuffer>;

    /// Undoes `setup`. Called once on every way out of a bake.
    fn restore(&mut self);
}

pub trait Denoiser: Send {
    fn denoise(&mut self, texture: &TargetTexture) -> Result<TargetTexture>;
}
