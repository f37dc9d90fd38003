pub mod aabb;
pub use aabb::*;
pub mod cone;
pub use cone::*;
pub mod hull;
pub use hull::*;
pub mod oriented_box;
pub use oriented_box::*;

pub fn safe_acos(x: f32) -> f32 {
    x.clamp(-1.0, 1.0).acos()
}

/// Angle in radians between two unit vectors.
pub fn angle_between(a: glam::Vec3, b: glam::Vec3) -> f32 {
    safe_acos(a.dot(b))
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    #[test]
    fn out_of_domain_cosines_are_clamped() {
        assert_eq!(safe_acos(1.5), 0.0);
        assert_eq!(safe_acos(-1.5), core::f32::consts::PI);
        assert_eq!(angle_between(Vec3::X, Vec3::X * 1.01), 0.0);
        assert!((angle_between(Vec3::X, Vec3::Y) - core::f32::consts::FRAC_PI_2).abs() < 1e-6);
    }
}
