use glam::UVec2;

/// Keeps `r` away from zero at the image center.
const CENTER_OFFSET: f64 = 1e-4;

/// Energy correction for a pixel of an equidistant fisheye render of `resolution`²
/// pixels spanning `fov` radians.
///
/// Fisheye pixels near the rim cover a different solid angle than pixels near the center,
/// the factor `(sin(r·fov/2) / (r·sin(fov/2)))²` evens that out. `r` is the distance of the
/// pixel center to the image center with the image radius mapped to one.
pub fn lens_correction(resolution: u32, fov: f32, pixel: UVec2) -> f64 {
    let resolution = resolution as f64;
    let fov = fov as f64;
    let half = resolution * 0.5;

    let dx = pixel.x as f64 - half + 0.5;
    let dy = pixel.y as f64 - half + 0.5;
    let r = (dx * dx + dy * dy).sqrt() / resolution * 2.0 + CENTER_OFFSET;

    let ratio = (r * fov * 0.5).sin() / (r * (fov * 0.5).sin());
    ratio * ratio
}

#[cfg(test)]
mod tests {
    use core::f32::consts::PI;

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(UVec2::new(3, 10), UVec2::new(10, 3))]
    #[case(UVec2::new(3, 10), UVec2::new(60, 10))]
    #[case(UVec2::new(0, 0), UVec2::new(63, 63))]
    #[case(UVec2::new(20, 5), UVec2::new(43, 58))]
    fn equidistant_pixels_match(#[case] a: UVec2, #[case] b: UVec2) {
        for fov in [0.5, 1.7, PI] {
            let (fa, fb) = (lens_correction(64, fov, a), lens_correction(64, fov, b));
            assert!((fa - fb).abs() < 1e-12, "{fa} != {fb} at fov {fov}");
        }
    }

    #[test]
    fn rim_of_image_circle_is_unity() {
        // 64 px image, pixel 63 on the horizontal center row sits right at the rim.
        let rim = lens_correction(64, PI, UVec2::new(63, 32));
        assert!((rim - 1.0).abs() < 0.05);
    }

    #[test]
    fn center_gets_boosted() {
        let center = lens_correction(64, PI, UVec2::new(32, 32));
        assert!(center > 2.0);
    }
}
