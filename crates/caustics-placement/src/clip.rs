use caustics_camera::ClipRange;
use caustics_scene::{Light, SceneContext};

/// Closest clip distance a point light sensor may use.
const MIN_NEAR_CLIP: f32 = 1e-3;
/// Fraction of the scene depth added around the geometry so nothing sits on a clip plane.
const CLIP_MARGIN: f32 = 0.05;
const MIN_CLIP_MARGIN: f32 = 1e-2;

/// Where orthographic sensors of a directional light sit along the light axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrthographicClip {
    /// Light-space height of the sensor plane, above every visible point.
    pub sensor_height: f32,
    pub range: ClipRange,
}

fn margin(depth: f32) -> f32 {
    (depth * CLIP_MARGIN).max(MIN_CLIP_MARGIN)
}

/// Spans every contributor, receiver and occluder as seen down the light axis.
/// `None` when the scene has no visible geometry.
pub fn orthographic_clip(light: &Light, scene: &SceneContext) -> Option<OrthographicClip> {
    let (min_z, max_z) = scene
        .visible_objects()
        .flat_map(|object| object.points())
        .map(|p| light.transform.to_local(*p).z)
        .fold(None, |range: Option<(f32, f32)>, z| match range {
            Some((min, max)) => Some((min.min(z), max.max(z))),
            None => Some((z, z)),
        })?;

    let margin = margin(max_z - min_z);
    let sensor_height = max_z + margin;

    Some(OrthographicClip {
        sensor_height,
        range: ClipRange {
            near: 0.0,
            far: sensor_height - min_z + margin,
        },
    })
}

/// Near and far distances from a point light enclosing every visible point.
pub fn panoramic_clip(light: &Light, scene: &SceneContext) -> Option<ClipRange> {
    let origin = light.position();
    let (min_distance, max_distance) = scene
        .visible_objects()
        .flat_map(|object| object.points())
        .map(|p| p.distance(origin))
        .fold(None, |range: Option<(f32, f32)>, d| match range {
            Some((min, max)) => Some((min.min(d), max.max(d))),
            None => Some((d, d)),
        })?;

    let margin = margin(max_distance - min_distance);

    Some(ClipRange {
        near: (min_distance - margin).max(MIN_NEAR_CLIP),
        far: max_distance + margin,
    })
}
