use std::cmp::Ordering;

use caustics_texture::{SplatBatch, TargetTexture};
use glam::{DVec4, UVec2, Vec2, Vec4};
use rayon::prelude::*;
use thiserror::Error;

mod lens;
pub use lens::lens_correction;

#[derive(Debug, Error)]
pub enum SplatError {
    #[error("a {resolution}x{resolution} sample buffer needs {expected} pixels, got {actual}")]
    PixelCount {
        resolution: u32,
        expected: usize,
        actual: usize,
    },
    #[error("color buffer is {colors}x{colors} but the coordinates are {coordinates}x{coordinates}")]
    ColorMismatch { coordinates: u32, colors: u32 },
}

/// One rendered pass: a square, row-major pixel buffer.
///
/// Coordinate passes store the receiver UV in `x`, `y` and depth or validity in `z`,
/// zero or below meaning the pixel missed every receiver. Color passes store energy in
/// `x`, `y`, `z`.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    resolution: u32,
    pixels: Vec<Vec4>,
}

impl SampleBuffer {
    pub fn new(resolution: u32, pixels: Vec<Vec4>) -> Result<Self, SplatError> {
        let expected = resolution as usize * resolution as usize;
        if pixels.len() != expected {
            return Err(SplatError::PixelCount {
                resolution,
                expected,
                actual: pixels.len(),
            });
        }

        Ok(Self { resolution, pixels })
    }

    pub fn from_fn(resolution: u32, f: impl Fn(UVec2) -> Vec4) -> Self {
        let pixels = (0..resolution)
            .flat_map(|y| (0..resolution).map(move |x| UVec2::new(x, y)))
            .map(f)
            .collect();

        Self { resolution, pixels }
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn pixels(&self) -> &[Vec4] {
        &self.pixels
    }

    fn pixel_id(&self, index: usize) -> UVec2 {
        let resolution = self.resolution as usize;
        UVec2::new((index % resolution) as u32, (index / resolution) as u32)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplatParams {
    /// Energy scale applied to every grouped texel.
    pub normalization: f64,
    /// Full field of view of the fisheye the pass was rendered with, `None` for
    /// orthographic passes.
    pub panoramic_fov: Option<f32>,
    /// Sample the pass belongs to, for logging.
    pub sample_index: u32,
}

/// A coordinates pixel lands on the target if it hit something inside the open UV square.
pub fn is_valid(sample: Vec4) -> bool {
    sample.z > 0.0 && sample.x > 0.0 && sample.x < 1.0 && sample.y > 0.0 && sample.y < 1.0
}

pub fn valid_count(coordinates: &SampleBuffer) -> usize {
    coordinates
        .pixels
        .par_iter()
        .filter(|sample| is_valid(**sample))
        .count()
}

/// Row-major texel a UV coordinate falls into.
pub fn texel_index(uv: Vec2, texture_resolution: u32) -> usize {
    let resolution = texture_resolution as f64;
    let last = texture_resolution.saturating_sub(1) as f64;
    let x = (uv.x as f64 * resolution).floor().clamp(0.0, last);
    let y = (uv.y as f64 * resolution).floor().clamp(0.0, last);

    (y * resolution + x) as usize
}

fn energy_order(a: &DVec4, b: &DVec4) -> Ordering {
    a.x.total_cmp(&b.x)
        .then_with(|| a.y.total_cmp(&b.y))
        .then_with(|| a.z.total_cmp(&b.z))
        .then_with(|| a.w.total_cmp(&b.w))
}

/// Bins every valid sample of a pass by target texel and sums each bin.
///
/// Samples are sorted by texel and then by energy before summing, so any permutation of
/// the same samples produces bit-identical sums. Returns `None` when the pass has no valid
/// sample.
pub fn group_samples(
    coordinates: &SampleBuffer,
    colors: Option<&SampleBuffer>,
    texture_resolution: u32,
    params: &SplatParams,
) -> Result<Option<SplatBatch>, SplatError> {
    puffin::profile_function!();

    if let Some(colors) = colors {
        if colors.resolution != coordinates.resolution {
            return Err(SplatError::ColorMismatch {
                coordinates: coordinates.resolution,
                colors: colors.resolution,
            });
        }
    }

    let correction = |index: usize| {
        params.panoramic_fov.map_or(1.0, |fov| {
            lens_correction(coordinates.resolution, fov, coordinates.pixel_id(index))
        })
    };

    let mut splats: Vec<(usize, DVec4)> = coordinates
        .pixels
        .par_iter()
        .enumerate()
        .filter(|(_, sample)| is_valid(**sample))
        .map(|(index, sample)| {
            let energy = match colors {
                Some(colors) => {
                    let color = colors.pixels[index].truncate().as_dvec3() * correction(index);
                    DVec4::new(color.x, color.y, color.z, color.x)
                }
                None => DVec4::splat(sample.z as f64 * correction(index)),
            };

            (texel_index(sample.truncate().truncate(), texture_resolution), energy)
        })
        .collect();

    if splats.is_empty() {
        return Ok(None);
    }

    splats.par_sort_unstable_by(|a, b| a.0.cmp(&b.0).then_with(|| energy_order(&a.1, &b.1)));

    let texels = splats
        .chunk_by(|a, b| a.0 == b.0)
        .map(|run| {
            let sum: DVec4 = run.iter().map(|(_, energy)| *energy).sum();
            (run[0].0, sum * params.normalization)
        })
        .collect();

    Ok(Some(SplatBatch::new(texels)))
}

/// Splats one pass into `target`. Returns the number of valid samples; with none the
/// target is left untouched.
pub fn accumulate(
    target: &mut TargetTexture,
    coordinates: &SampleBuffer,
    colors: Option<&SampleBuffer>,
    params: &SplatParams,
) -> Result<usize, SplatError> {
    let Some(batch) = group_samples(coordinates, colors, target.resolution(), params)? else {
        log::trace!("Sample {} has no valid pixels", params.sample_index);
        return Ok(0);
    };

    log::trace!(
        "Sample {} splats {} texels",
        params.sample_index,
        batch.len()
    );
    target.add_batch(&batch);

    Ok(valid_count(coordinates))
}
