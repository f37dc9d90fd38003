use glam::{Quat, Vec3};

use crate::Aabb;

/// Cross products shorter than this come from (nearly) parallel edges and carry no
/// separating information.
const PARALLEL_EPSILON: f32 = 1e-6;

/// A box with arbitrary orientation, used as the coverage volume of an orthographic sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientedBox {
    pub center: Vec3,
    pub axes: [Vec3; 3],
    pub half_extents: Vec3,
}

impl OrientedBox {
    pub fn new(center: Vec3, rotation: Quat, half_extents: Vec3) -> Self {
        Self {
            center,
            axes: [rotation * Vec3::X, rotation * Vec3::Y, rotation * Vec3::Z],
            half_extents: half_extents.abs(),
        }
    }

    pub fn from_aabb(aabb: &Aabb) -> Self {
        Self::new(aabb.center(), Quat::IDENTITY, aabb.extent() * 0.5)
    }

    pub fn volume(&self) -> f32 {
        8.0 * self.half_extents.x * self.half_extents.y * self.half_extents.z
    }

    pub fn corners(&self) -> [Vec3; 8] {
        std::array::from_fn(|i| {
            let sign = Vec3::new(
                if i & 1 == 0 { -1.0 } else { 1.0 },
                if i & 2 == 0 { -1.0 } else { 1.0 },
                if i & 4 == 0 { -1.0 } else { 1.0 },
            );
            self.center
                + self.axes[0] * sign.x * self.half_extents.x
                + self.axes[1] * sign.y * self.half_extents.y
                + self.axes[2] * sign.z * self.half_extents.z
        })
    }

    /// Half length of the box's shadow on `axis`, scaled by the axis length.
    fn projected_radius(&self, axis: Vec3) -> f32 {
        self.axes
            .iter()
            .zip(self.half_extents.to_array())
            .map(|(a, h)| a.dot(axis).abs() * h)
            .sum()
    }

    /// Separating axis test over the 3 + 3 face normals and 9 edge cross products.
    /// Touching boxes count as overlapping.
    pub fn overlaps(&self, other: &OrientedBox) -> bool {
        let offset = other.center - self.center;

        let face_axes = self.axes.iter().chain(other.axes.iter()).copied();
        let edge_axes = self
            .axes
            .iter()
            .flat_map(|a| other.axes.iter().map(move |b| a.cross(*b)))
            .filter(|axis| axis.length_squared() > PARALLEL_EPSILON);

        !face_axes.chain(edge_axes).any(|axis| {
            offset.dot(axis).abs() > self.projected_radius(axis) + other.projected_radius(axis)
        })
    }
}
