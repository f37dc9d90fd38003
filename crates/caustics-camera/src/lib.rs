use core::f32::consts::PI;

use caustics_transform::Transform;
use glam::{Vec2, Vec3};
use serde::Serialize;
use thiserror::Error;

/// Calibration applied to an orthographic sensor's covered area.
pub const ORTHO_NORMALIZATION: f32 = 0.319884;
/// Calibration applied to a panoramic sensor's covered solid angle.
pub const PANO_NORMALIZATION: f32 = 0.01148094092 * 0.639726;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Projection {
    Orthographic,
    Panoramic,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Lens {
    /// Parallel projection with a `width` x `height` footprint.
    Orthographic { width: f32, height: f32 },
    /// Equidistant fisheye with a full field of view of `fov` radians.
    Panoramic { fov: f32 },
}

impl Lens {
    pub fn projection(&self) -> Projection {
        match self {
            Self::Orthographic { .. } => Projection::Orthographic,
            Self::Panoramic { .. } => Projection::Panoramic,
        }
    }

    pub fn fov(&self) -> Option<f32> {
        match self {
            Self::Panoramic { fov } => Some(*fov),
            Self::Orthographic { .. } => None,
        }
    }

    /// Side of the square an orthographic sensor renders.
    pub fn ortho_scale(&self) -> Option<f32> {
        match self {
            Self::Orthographic { width, height } => Some(width.max(*height)),
            Self::Panoramic { .. } => None,
        }
    }

    /// Pixel aspect that squeezes the square render onto a `width` x `height` footprint.
    pub fn pixel_aspect(&self) -> Vec2 {
        match self {
            Self::Orthographic { width, height } => {
                Vec2::new(*width, *height) / width.min(*height)
            }
            Self::Panoramic { .. } => Vec2::ONE,
        }
    }

    /// Area (orthographic) or angular coverage (panoramic) seen by the lens.
    /// The panoramic measure is `2π(1 - cos fov)`; the calibration constant is fitted to it.
    pub fn coverage(&self) -> f32 {
        match self {
            Self::Orthographic { width, height } => width * height,
            Self::Panoramic { fov } => 2.0 * PI * (1.0 - fov.cos()),
        }
    }

    pub fn calibration(&self) -> f32 {
        match self {
            Self::Orthographic { .. } => ORTHO_NORMALIZATION,
            Self::Panoramic { .. } => PANO_NORMALIZATION,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClipRange {
    pub near: f32,
    pub far: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorRay {
    pub origin: Vec3,
    pub direction: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum QuotaError {
    #[error("a sensor was assigned a sample quota of zero")]
    Zero,
    #[error("a sensor normalization of {0} is not finite and positive")]
    Normalization(f32),
}

/// A virtual camera capturing the caustic contribution of one coverage region.
#[derive(Debug, Clone, Serialize)]
pub struct Sensor {
    pub transform: Transform,
    lens: Lens,
    clip: ClipRange,
    sample_density: f32,
    normalization: Option<f32>,
    remaining: u32,
}

impl Sensor {
    pub fn new(transform: Transform, lens: Lens, clip: ClipRange) -> Self {
        Self {
            transform,
            lens,
            clip,
            sample_density: 1.0 / lens.coverage(),
            normalization: None,
            remaining: 0,
        }
    }

    pub fn lens(&self) -> &Lens {
        &self.lens
    }

    pub fn projection(&self) -> Projection {
        self.lens.projection()
    }

    pub fn clip(&self) -> ClipRange {
        self.clip
    }

    pub fn coverage(&self) -> f32 {
        self.lens.coverage()
    }

    pub fn sample_density(&self) -> f32 {
        self.sample_density
    }

    /// Energy each sample contributes, set once the sample quota is known.
    pub fn normalization(&self) -> Option<f32> {
        self.normalization
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Fixes the sample quota and derives the per-sample normalization from it. The
    /// sensor is left untouched when the quota or the resulting normalization is unusable.
    pub fn assign_quota(&mut self, remaining: u32, energy: f32) -> Result<(), QuotaError> {
        if remaining == 0 {
            return Err(QuotaError::Zero);
        }

        let normalization = self.coverage() * self.lens.calibration() / remaining as f32 * energy;
        if !normalization.is_finite() || normalization <= 0.0 {
            return Err(QuotaError::Normalization(normalization));
        }

        self.remaining = remaining;
        self.normalization = Some(normalization);
        Ok(())
    }

    /// Marks one sample as rendered.
    pub fn complete_sample(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
    }

    /// Drops the rest of the quota, used when a pass sees no valid sample.
    pub fn exhaust(&mut self) -> u32 {
        std::mem::take(&mut self.remaining)
    }

    /// World-space ray through `film_uv` in `[0, 1]²`. Fisheye pixels outside the image
    /// circle have no ray.
    pub fn generate_ray(&self, film_uv: Vec2) -> Option<SensorRay> {
        let centered = film_uv * 2.0 - 1.0;

        let (origin, direction) = match self.lens {
            Lens::Orthographic { width, height } => (
                Vec3::new(centered.x * width * 0.5, centered.y * height * 0.5, 0.0),
                Vec3::NEG_Z,
            ),
            Lens::Panoramic { fov } => {
                let r = centered.length();
                if r > 1.0 {
                    return None;
                }

                let theta = r * fov * 0.5;
                let phi = centered.y.atan2(centered.x);
                (
                    Vec3::ZERO,
                    Vec3::new(
                        theta.sin() * phi.cos(),
                        theta.sin() * phi.sin(),
                        -theta.cos(),
                    ),
                )
            }
        };

        Some(SensorRay {
            origin: self.transform.to_world(origin) + self.transform.forward() * self.clip.near,
            direction: self.transform.get_rotation() * direction,
        })
    }
}
