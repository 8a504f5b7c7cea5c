use super::{Point2, TOLERANCE};

/// Computes the signed area of a polygon (shoelace formula).
///
/// Positive for counter-clockwise, negative for clockwise.
#[must_use]
pub fn signed_area(points: &[Point2]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        sum += points[i].x * points[j].y - points[j].x * points[i].y;
    }
    sum * 0.5
}

/// Tests whether a point lies inside a closed polygon (even-odd ray cast).
///
/// Points exactly on an edge may classify either way; callers that care keep
/// such points away from the boundary by a tolerance.
#[must_use]
pub fn point_in_polygon(p: &Point2, polygon: &[Point2]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (a, b) = (&polygon[i], &polygon[j]);
        if (a.y > p.y) != (b.y > p.y) {
            let t = (p.y - a.y) / (b.y - a.y);
            if p.x < a.x + t * (b.x - a.x) {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Computes the distance from a point to the segment `[a, b]`.
#[must_use]
pub fn distance_to_segment(p: &Point2, a: &Point2, b: &Point2) -> f64 {
    let ab = b - a;
    let len2 = ab.norm_squared();
    if len2 < TOLERANCE * TOLERANCE {
        return (p - a).norm();
    }
    let t = ((p - a).dot(&ab) / len2).clamp(0.0, 1.0);
    (p - (a + ab * t)).norm()
}

/// Computes the distance from a point to a closed polyline.
#[must_use]
pub fn distance_to_polygon(p: &Point2, polygon: &[Point2]) -> f64 {
    let n = polygon.len();
    if n == 0 {
        return f64::INFINITY;
    }
    if n == 1 {
        return (p - polygon[0]).norm();
    }
    let mut best = f64::INFINITY;
    for i in 0..n {
        let j = (i + 1) % n;
        best = best.min(distance_to_segment(p, &polygon[i], &polygon[j]));
    }
    best
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn square() -> Vec<Point2> {
        vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ]
    }

    #[test]
    fn signed_area_ccw_square() {
        let area = signed_area(&square());
        assert!((area - 1.0).abs() < TOLERANCE);
    }

    #[test]
    fn signed_area_cw_square() {
        let mut pts = square();
        pts.reverse();
        let area = signed_area(&pts);
        assert!((area + 1.0).abs() < TOLERANCE);
    }

    #[test]
    fn signed_area_degenerate() {
        assert!(signed_area(&[Point2::new(0.0, 0.0)]).abs() < TOLERANCE);
        assert!(signed_area(&[]).abs() < TOLERANCE);
    }

    #[test]
    fn containment_inside_and_outside() {
        let poly = square();
        assert!(point_in_polygon(&Point2::new(0.5, 0.5), &poly));
        assert!(!point_in_polygon(&Point2::new(1.5, 0.5), &poly));
        assert!(!point_in_polygon(&Point2::new(-0.1, 0.99), &poly));
    }

    #[test]
    fn containment_concave() {
        // L-shape: the notch (upper right) is outside.
        let poly = vec![
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(2.0, 1.0),
            Point2::new(1.0, 1.0),
            Point2::new(1.0, 2.0),
            Point2::new(0.0, 2.0),
        ];
        assert!(point_in_polygon(&Point2::new(0.5, 1.5), &poly));
        assert!(!point_in_polygon(&Point2::new(1.5, 1.5), &poly));
    }

    #[test]
    fn segment_distance_projection_and_endpoints() {
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(2.0, 0.0);
        assert!((distance_to_segment(&Point2::new(1.0, 1.0), &a, &b) - 1.0).abs() < TOLERANCE);
        assert!((distance_to_segment(&Point2::new(-3.0, 4.0), &a, &b) - 5.0).abs() < TOLERANCE);
    }

    #[test]
    fn polygon_distance_from_interior_point() {
        let d = distance_to_polygon(&Point2::new(0.5, 0.5), &square());
        assert!((d - 0.5).abs() < TOLERANCE);
    }
}
