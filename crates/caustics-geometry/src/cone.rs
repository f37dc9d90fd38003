use core::f32::consts::{FRAC_PI_2, PI};

use glam::Vec3;

use crate::angle_between;

const ENCLOSING_CONE_ITERATIONS: u32 = 64;

/// Directions whose mean is shorter than this are spread over the whole sphere.
const DEGENERATE_MEAN_LENGTH: f32 = 1e-4;

/// A cone of directions around `axis`, the angular coverage of a panoramic sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionCone {
    pub axis: Vec3,
    pub half_angle: f32,
}

impl DirectionCone {
    pub fn new(axis: Vec3, half_angle: f32) -> Self {
        Self {
            axis: axis.normalize(),
            half_angle: half_angle.clamp(0.0, PI),
        }
    }

    pub fn full_sphere() -> Self {
        Self::new(Vec3::Z, PI)
    }

    /// Smallest cone found around a set of unit directions, `None` if there are none.
    ///
    /// The axis starts at the mean direction and is pulled towards the farthest outlier
    /// with a shrinking step (Badoiu-Clarkson on the sphere). The half-angle is measured
    /// after every step, so the result always contains every input direction.
    pub fn enclosing(directions: &[Vec3]) -> Option<Self> {
        if directions.is_empty() {
            return None;
        }

        let mean = directions.iter().copied().sum::<Vec3>();
        if mean.length() < DEGENERATE_MEAN_LENGTH * directions.len() as f32 {
            return Some(Self::full_sphere());
        }

        let measure = |axis: Vec3| {
            directions
                .iter()
                .map(|d| (angle_between(axis, *d), *d))
                .max_by(|a, b| a.0.total_cmp(&b.0))
        };

        let mut axis = mean.normalize();
        let mut best = Self {
            axis,
            half_angle: f32::MAX,
        };

        for k in 1..=ENCLOSING_CONE_ITERATIONS {
            let Some((half_angle, farthest)) = measure(axis) else {
                break;
            };
            if half_angle < best.half_angle {
                best = Self::new(axis, half_angle);
            }

            let step = (farthest - axis) / (k as f32 + 1.0);
            match (axis + step).try_normalize() {
                Some(next) => axis = next,
                None => break,
            }
        }

        Some(best)
    }

    pub fn field_of_view(&self) -> f32 {
        self.half_angle * 2.0
    }

    /// True when no single hemisphere can hold the cone.
    pub fn exceeds_hemisphere(&self) -> bool {
        self.half_angle > FRAC_PI_2
    }

    pub fn contains(&self, direction: Vec3) -> bool {
        angle_between(self.axis, direction.normalize()) <= self.half_angle
    }

    /// Cones overlap when their axes are closer than the sum of their half-angles.
    pub fn overlaps(&self, other: &DirectionCone) -> bool {
        angle_between(self.axis, other.axis) < self.half_angle + other.half_angle
    }

    pub fn solid_angle(&self) -> f32 {
        2.0 * PI * (1.0 - self.half_angle.cos())
    }
}

#[cfg(test)]
mod tests {
    use core::f32::consts::FRAC_PI_4;

    use super::*;

    #[test]
    fn enclosing_contains_all_directions() {
        let directions = [
            Vec3::new(0.1, 0.0, 1.0),
            Vec3::new(-0.3, 0.2, 1.0),
            Vec3::new(0.0, 0.5, 1.0),
            Vec3::new(0.4, -0.4, 1.0),
            Vec3::new(0.05, 0.05, 1.0),
        ]
        .map(Vec3::normalize);
        let cone = DirectionCone::enclosing(&directions).unwrap();

        for d in directions {
            assert!(angle_between(cone.axis, d) <= cone.half_angle + 1e-6);
        }
        assert!(cone.half_angle < FRAC_PI_4);
    }

    #[test]
    fn enclosing_pair_is_centered() {
        let a = Vec3::new(1.0, 0.0, 1.0).normalize();
        let b = Vec3::new(-1.0, 0.0, 1.0).normalize();
        let cone = DirectionCone::enclosing(&[a, b]).unwrap();

        assert!(cone.axis.abs_diff_eq(Vec3::Z, 1e-4));
        assert!((cone.half_angle - FRAC_PI_4).abs() < 1e-4);
    }

    #[test]
    fn opposing_directions_need_full_sphere() {
        let cone = DirectionCone::enclosing(&[Vec3::X, Vec3::NEG_X]).unwrap();

        assert!(cone.exceeds_hemisphere());
        assert!((cone.solid_angle() - 4.0 * PI).abs() < 1e-4);
        assert!(DirectionCone::enclosing(&[]).is_none());
    }

    #[test]
    fn overlap_uses_sum_of_half_angles() {
        let a = DirectionCone::new(Vec3::Z, 0.3);
        let b = DirectionCone::new(Vec3::new(0.5f32.sin(), 0.0, 0.5f32.cos()), 0.3);
        let c = DirectionCone::new(Vec3::new(0.7f32.sin(), 0.0, 0.7f32.cos()), 0.3);

        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
        assert!(a.contains(Vec3::new(0.2f32.sin(), 0.0, 0.2f32.cos())));
    }
}
