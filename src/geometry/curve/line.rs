use crate::error::{GeometryError, Result};
use crate::math::{Point2, Vector2, TOLERANCE};

use super::{Curve, CurveDomain};

/// A straight segment between two points.
///
/// The parametric form is `P(t) = start + t * (end - start)` for `t` in `[0, 1]`.
#[derive(Debug, Clone)]
pub struct Segment {
    start: Point2,
    end: Point2,
}

impl Segment {
    /// Creates a new segment.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoints coincide.
    pub fn new(start: Point2, end: Point2) -> Result<Self> {
        if (end - start).norm() < TOLERANCE {
            return Err(GeometryError::Degenerate("zero-length segment".into()).into());
        }
        Ok(Self { start, end })
    }

    /// Returns the start point.
    #[must_use]
    pub fn start(&self) -> &Point2 {
        &self.start
    }

    /// Returns the end point.
    #[must_use]
    pub fn end(&self) -> &Point2 {
        &self.end
    }
}

impl Curve for Segment {
    fn evaluate(&self, t: f64) -> Result<Point2> {
        Ok(self.start + (self.end - self.start) * t)
    }

    fn tangent(&self, _t: f64) -> Result<Vector2> {
        let d = self.end - self.start;
        Ok(d / d.norm())
    }

    fn domain(&self) -> CurveDomain {
        CurveDomain::new(0.0, 1.0)
    }

    fn length(&self) -> f64 {
        (self.end - self.start).norm()
    }

    fn is_closed(&self) -> bool {
        false
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn evaluate_endpoints_and_midpoint() {
        let s = Segment::new(Point2::new(1.0, 0.0), Point2::new(3.0, 4.0)).unwrap();
        assert!((s.evaluate(0.0).unwrap() - Point2::new(1.0, 0.0)).norm() < TOLERANCE);
        assert!((s.evaluate(1.0).unwrap() - Point2::new(3.0, 4.0)).norm() < TOLERANCE);
        assert!((s.evaluate(0.5).unwrap() - Point2::new(2.0, 2.0)).norm() < TOLERANCE);
        assert!((s.length() - (20.0_f64).sqrt()).abs() < TOLERANCE);
    }

    #[test]
    fn degenerate_segment_rejected() {
        assert!(Segment::new(Point2::new(1.0, 1.0), Point2::new(1.0, 1.0)).is_err());
    }

    #[test]
    fn tangent_is_unit() {
        let s = Segment::new(Point2::new(0.0, 0.0), Point2::new(3.0, 4.0)).unwrap();
        let t = s.tangent(0.5).unwrap();
        assert!((t.norm() - 1.0).abs() < TOLERANCE);
        assert!((t.x - 0.6).abs() < TOLERANCE);
        assert!((t.y - 0.8).abs() < TOLERANCE);
    }
}
