use glam::{Mat2, Vec2};

/// Hull tolerances relative to the size of the point set.
const HULL_RELATIVE_EPSILON: f32 = 1e-6;

fn cross(o: Vec2, a: Vec2, b: Vec2) -> f32 {
    (a - o).perp_dot(b - o)
}

/// Convex hull of a planar point set in counter-clockwise order (monotone chain).
/// Collinear points are dropped; fewer than three distinct points are returned as-is.
pub fn convex_hull(points: &[Vec2]) -> Vec<Vec2> {
    let extent = extent(points);
    let mut sorted = points.to_vec();
    sorted.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    sorted.dedup_by(|a, b| a.abs_diff_eq(*b, extent * HULL_RELATIVE_EPSILON));

    if sorted.len() < 3 {
        return sorted;
    }

    // Cross products are areas, so their tolerance scales with the square of the extent.
    let collinear = extent * extent * HULL_RELATIVE_EPSILON;
    let mut hull = Vec::with_capacity(sorted.len() + 1);
    push_chain(&mut hull, sorted.iter().copied(), collinear);
    push_chain(&mut hull, sorted.iter().rev().copied(), collinear);
    hull
}

/// Largest side of the axis-aligned bounds of `points`, zero when there are none.
fn extent(points: &[Vec2]) -> f32 {
    let Some(first) = points.first() else {
        return 0.0;
    };
    let (min, max) = points
        .iter()
        .fold((*first, *first), |(min, max), p| (min.min(*p), max.max(*p)));
    (max - min).max_element()
}

fn push_chain(hull: &mut Vec<Vec2>, points: impl Iterator<Item = Vec2>, collinear: f32) {
    let start = hull.len();
    for p in points {
        while hull.len() >= start + 2
            && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= collinear
        {
            hull.pop();
        }
        hull.push(p);
    }
    // The last point of each chain is the first of the next.
    hull.pop();
}

/// A rectangle in the plane rotated by `angle` radians around its center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientedRect {
    pub center: Vec2,
    pub half_extents: Vec2,
    pub angle: f32,
}

impl OrientedRect {
    pub fn width(&self) -> f32 {
        self.half_extents.x * 2.0
    }

    pub fn height(&self) -> f32 {
        self.half_extents.y * 2.0
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn corners(&self) -> [Vec2; 4] {
        let rotation = Mat2::from_angle(self.angle);
        [
            Vec2::new(-1.0, -1.0),
            Vec2::new(1.0, -1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(-1.0, 1.0),
        ]
        .map(|corner| self.center + rotation * (corner * self.half_extents))
    }

    /// Grows degenerate sides (points or segments seen edge-on) to `min_extent`.
    pub fn with_min_extent(mut self, min_extent: f32) -> Self {
        self.half_extents = self.half_extents.max(Vec2::splat(min_extent * 0.5));
        self
    }
}

/// Minimum-area bounding rectangle of a point set. One side of the optimum is
/// collinear with a hull edge, so every edge direction of the hull is tried.
pub fn min_area_rect(points: &[Vec2]) -> Option<OrientedRect> {
    let hull = convex_hull(points);

    let directions: Vec<Vec2> = match hull.len() {
        0 => return None,
        1 => vec![Vec2::X],
        2 => vec![(hull[1] - hull[0]).normalize_or(Vec2::X)],
        n => (0..n)
            .filter_map(|i| (hull[(i + 1) % n] - hull[i]).try_normalize())
            .collect(),
    };

    directions
        .into_iter()
        .map(|u| {
            let v = u.perp();
            let (mut min, mut max) = (Vec2::splat(f32::MAX), Vec2::splat(f32::MIN));
            for p in &hull {
                let local = Vec2::new(p.dot(u), p.dot(v));
                min = min.min(local);
                max = max.max(local);
            }

            let local_center = (min + max) * 0.5;
            OrientedRect {
                center: u * local_center.x + v * local_center.y,
                half_extents: (max - min) * 0.5,
                angle: u.y.atan2(u.x),
            }
        })
        .min_by(|a, b| a.area().total_cmp(&b.area()))
}

#[cfg(test)]
mod tests {
    use core::f32::consts::FRAC_PI_4;

    use super::*;

    #[test]
    fn hull_drops_interior_points() {
        let points = [
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
            Vec2::new(0.5, 0.5),
            Vec2::new(0.5, 0.0),
        ];
        let hull = convex_hull(&points);

        assert_eq!(hull.len(), 4);
        assert!(!hull.contains(&Vec2::new(0.5, 0.5)));
    }

    #[test]
    fn min_rect_of_axis_aligned_square() {
        let points = [
            Vec2::new(-1.0, -2.0),
            Vec2::new(3.0, -2.0),
            Vec2::new(3.0, 2.0),
            Vec2::new(-1.0, 2.0),
        ];
        let rect = min_area_rect(&points).unwrap();

        assert!((rect.area() - 16.0).abs() < 1e-4);
        assert!(rect.center.abs_diff_eq(Vec2::new(1.0, 0.0), 1e-5));
    }

    #[test]
    fn min_rect_follows_rotation() {
        let rotation = Mat2::from_angle(FRAC_PI_4);
        let points = [
            Vec2::new(-2.0, -0.5),
            Vec2::new(2.0, -0.5),
            Vec2::new(2.0, 0.5),
            Vec2::new(-2.0, 0.5),
        ]
        .map(|p| rotation * p);
        let rect = min_area_rect(&points).unwrap();

        // An axis-aligned fit of the rotated rectangle would cover 12.5 units².
        assert!((rect.area() - 4.0).abs() < 1e-3);
        for corner in rect.corners() {
            assert!(points.iter().any(|p| p.abs_diff_eq(corner, 1e-3)));
        }
    }

    #[test]
    fn tiny_point_sets_keep_their_corners() {
        let rotation = Mat2::from_angle(FRAC_PI_4);
        let points = [
            Vec2::new(-2e-4, -5e-5),
            Vec2::new(0.0, -5e-5),
            Vec2::new(2e-4, -5e-5),
            Vec2::new(2e-4, 5e-5),
            Vec2::new(-2e-4, 5e-5),
        ]
        .map(|p| rotation * p);

        let hull = convex_hull(&points);
        assert_eq!(hull.len(), 4);
        assert!(!hull.contains(&points[1]));

        let rect = min_area_rect(&points).unwrap();
        assert!((rect.area() - 4e-8).abs() < 1e-11);
    }

    #[test]
    fn degenerate_input() {
        assert!(min_area_rect(&[]).is_none());

        let rect = min_area_rect(&[Vec2::ONE]).unwrap().with_min_extent(0.1);
        assert!((rect.area() - 0.01).abs() < 1e-6);

        let segment = min_area_rect(&[Vec2::ZERO, Vec2::new(2.0, 0.0)]).unwrap();
        assert!((segment.width() - 2.0).abs() < 1e-6);
        assert_eq!(segment.height(), 0.0);
    }
}
