use caustics_camera::{ClipRange, Lens, Sensor};
use caustics_geometry::{min_area_rect, DirectionCone, OrientedBox, OrientedRect};
use caustics_scene::SceneObject;
use caustics_transform::Transform;
use glam::{Quat, Vec2, Vec3};
use uuid::Uuid;

use crate::clip::OrthographicClip;

/// Smallest footprint side of an orthographic sensor, for contributors seen edge-on, as a
/// fraction of the larger footprint side or the clip depth.
pub const MIN_FOOTPRINT_FRACTION: f32 = 1e-3;
/// Narrowest field of view a panoramic sensor is given.
pub const MIN_PANORAMIC_FOV: f32 = 10.0 * core::f32::consts::PI / 180.0;
/// Points closer than this to a point light leave no usable direction.
const MIN_LIGHT_DISTANCE: f32 = 1e-6;

/// The region a candidate sensor observes, in the metric its projection overlaps in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Coverage {
    Volume(OrientedBox),
    Cone(DirectionCone),
}

impl Coverage {
    pub fn overlaps(&self, other: &Coverage) -> bool {
        match (self, other) {
            (Self::Volume(a), Self::Volume(b)) => a.overlaps(b),
            (Self::Cone(a), Self::Cone(b)) => a.overlaps(b),
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Candidate {
    pub sensor: Sensor,
    pub coverage: Coverage,
}

/// Contributors assigned to one pending sensor.
#[derive(Debug, Clone)]
pub struct ContributorGroup {
    pub members: Vec<Uuid>,
    pub points: Vec<Vec3>,
    pub candidate: Candidate,
}

/// A group needs more than a hemisphere of directions around its point light.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FullSphere;

/// Fits candidate sensors to point sets for one light.
#[derive(Debug, Clone, Copy)]
pub enum Fitter {
    Orthographic { light: Transform, clip: OrthographicClip },
    Panoramic { origin: Vec3, clip: ClipRange },
}

impl Fitter {
    pub fn new_group(&self, object: &SceneObject) -> Result<ContributorGroup, FullSphere> {
        let points = object.points().to_vec();
        let candidate = self.fit(&points)?;

        Ok(ContributorGroup {
            members: vec![*object.uuid()],
            points,
            candidate,
        })
    }

    /// Moves every member of `other` into `group` and refits the sensor over the union.
    pub fn absorb(&self, group: &mut ContributorGroup, other: ContributorGroup) -> Result<(), FullSphere> {
        group.members.extend(other.members);
        group.points.extend(other.points);
        group.candidate = self.fit(&group.points)?;
        Ok(())
    }

    pub fn clip_range(&self) -> ClipRange {
        match self {
            Self::Orthographic { clip, .. } => clip.range,
            Self::Panoramic { clip, .. } => *clip,
        }
    }

    pub fn fit(&self, points: &[Vec3]) -> Result<Candidate, FullSphere> {
        match *self {
            Self::Orthographic { light, clip } => Ok(fit_orthographic(light, clip, points)),
            Self::Panoramic { origin, clip } => fit_panoramic(origin, clip, points),
        }
    }
}

/// Footprint of the points projected along the light axis, with the sensor parked on the
/// shared sensor plane and turned to the footprint's minimum-area orientation.
fn fit_orthographic(light: Transform, clip: OrthographicClip, points: &[Vec3]) -> Candidate {
    let projected: Vec<Vec2> = points.iter().map(|p| light.to_local(*p).truncate()).collect();
    let rect = min_area_rect(&projected).unwrap_or(OrientedRect {
        center: Vec2::ZERO,
        half_extents: Vec2::ZERO,
        angle: 0.0,
    });
    let depth = clip.range.far - clip.range.near;
    let scale = rect.width().max(rect.height()).max(depth);
    let rect = rect.with_min_extent(scale * MIN_FOOTPRINT_FRACTION);

    let rotation = light.get_rotation() * Quat::from_rotation_z(rect.angle);
    let location = light.to_world(rect.center.extend(clip.sensor_height));
    let volume_center =
        light.to_world(rect.center.extend(clip.sensor_height - clip.range.near - depth * 0.5));

    Candidate {
        sensor: Sensor::new(
            Transform::new(location, rotation),
            Lens::Orthographic {
                width: rect.width(),
                height: rect.height(),
            },
            clip.range,
        ),
        coverage: Coverage::Volume(OrientedBox::new(
            volume_center,
            rotation,
            rect.half_extents.extend(depth * 0.5),
        )),
    }
}

fn fit_panoramic(origin: Vec3, clip: ClipRange, points: &[Vec3]) -> Result<Candidate, FullSphere> {
    let directions = points
        .iter()
        .map(|p| (*p - origin).try_normalize().filter(|_| p.distance(origin) > MIN_LIGHT_DISTANCE))
        .collect::<Option<Vec<Vec3>>>()
        .ok_or(FullSphere)?;

    let cone = DirectionCone::enclosing(&directions).ok_or(FullSphere)?;
    if cone.exceeds_hemisphere() {
        return Err(FullSphere);
    }

    let fov = cone.field_of_view().max(MIN_PANORAMIC_FOV);
    let cone = DirectionCone::new(cone.axis, fov * 0.5);

    Ok(Candidate {
        sensor: Sensor::new(
            Transform::looking_along(origin, cone.axis),
            Lens::Panoramic { fov },
            clip,
        ),
        coverage: Coverage::Cone(cone),
    })
}

/// The two fixed fisheye sensors that together see every direction around `origin`.
pub fn hemisphere_candidates(origin: Vec3, clip: ClipRange) -> [Candidate; 2] {
    [Quat::IDENTITY, Quat::from_rotation_x(core::f32::consts::PI)].map(|rotation| {
        let transform = Transform::new(origin, rotation);
        Candidate {
            sensor: Sensor::new(
                transform,
                Lens::Panoramic {
                    fov: core::f32::consts::PI,
                },
                clip,
            ),
            coverage: Coverage::Cone(DirectionCone::new(
                transform.forward(),
                core::f32::consts::FRAC_PI_2,
            )),
        }
    })
}
