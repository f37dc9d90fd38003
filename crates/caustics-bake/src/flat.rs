use anyhow::{anyhow, Result};
use caustics_scene::SceneContext;
use caustics_splat::SampleBuffer;
use glam::{Vec2, Vec3, Vec4};
use rayon::prelude::*;

use crate::render::{RenderPass, RenderRequest, RenderSettings, Renderer};

const GOLDEN_RATIO_FRACT: f32 = 0.618_034;
const SQRT_2_FRACT: f32 = 0.414_213_57;

/// Horizontal rectangle the receiver's UV square is stretched over.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ReceiverPlane {
    height: f32,
    min: Vec2,
    max: Vec2,
}

impl ReceiverPlane {
    fn uv(&self, origin: Vec3, direction: Vec3) -> Option<Vec2> {
        if direction.z.abs() < f32::EPSILON {
            return None;
        }

        let t = (self.height - origin.z) / direction.z;
        if t <= 0.0 {
            return None;
        }

        let hit = origin + direction * t;
        Some((hit.truncate() - self.min) / (self.max - self.min))
    }
}

/// Reference renderer for scenes whose receiver is a horizontal plane.
///
/// Every sensor ray is traced straight onto the plane of the first receiver, ignoring
/// contributors and occluders, and the plane's bounds are used as its UV square. Color
/// passes return unit energy for every hit. It exists to drive bakes without a host
/// renderer and to check that a bake conserves energy.
#[derive(Debug, Clone, Default)]
pub struct FlatReceiverRenderer {
    plane: Option<ReceiverPlane>,
}

impl FlatReceiverRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subpixel offset for a seed, so consecutive samples see different ray positions.
    fn jitter(seed: u32) -> Vec2 {
        let seed = seed as f32;
        Vec2::new(
            (seed * GOLDEN_RATIO_FRACT).fract(),
            (seed * SQRT_2_FRACT).fract(),
        )
    }
}

impl Renderer for FlatReceiverRenderer {
    fn setup(&mut self, scene: &SceneContext, _settings: &RenderSettings) -> Result<()> {
        let receiver = scene
            .receivers()
            .next()
            .ok_or_else(|| anyhow!("the scene has no receiver"))?;
        let bounds = receiver
            .bounds()
            .ok_or_else(|| anyhow!("receiver '{}' has no geometry", receiver.name))?;

        let extent = bounds.extent();
        if extent.x <= 0.0 || extent.y <= 0.0 {
            return Err(anyhow!(
                "receiver '{}' has no horizontal extent",
                receiver.name
            ));
        }

        self.plane = Some(ReceiverPlane {
            height: bounds.center().z,
            min: bounds.min.truncate(),
            max: bounds.max.truncate(),
        });
        log::debug!("Flat receiver '{}' at height {}", receiver.name, bounds.center().z);
        Ok(())
    }

    fn render(&mut self, request: &RenderRequest) -> Result<SampleBuffer> {
        puffin::profile_function!();

        let plane = self
            .plane
            .ok_or_else(|| anyhow!("render requested before setup"))?;
        let resolution = request.resolution;
        let jitter = Self::jitter(request.seed);
        let sensor = &request.sensor;

        let pixels = (0..resolution * resolution)
            .into_par_iter()
            .map(|index| {
                let pixel = Vec2::new((index % resolution) as f32, (index / resolution) as f32);
                let film_uv = (pixel + jitter) / resolution as f32;

                let uv = sensor
                    .generate_ray(film_uv)
                    .and_then(|ray| plane.uv(ray.origin, ray.direction));

                match (uv, request.pass) {
                    (Some(uv), RenderPass::Coordinates) => Vec4::new(uv.x, uv.y, 1.0, 0.0),
                    (Some(_), RenderPass::Color) => Vec4::new(1.0, 1.0, 1.0, 1.0),
                    (None, _) => Vec4::ZERO,
                }
            })
            .collect();

        Ok(SampleBuffer::new(resolution, pixels)?)
    }

    fn restore(&mut self) {
        self.plane = None;
    }
}
