use std::f64::consts::PI;

use crate::error::{GeometryError, Result};
use crate::math::{Point2, Vector2, TOLERANCE};

use super::{Curve, CurveDomain};

/// A circular arc anchored at an explicit center.
///
/// Defined by a start point, a center, and an end point, both endpoints
/// equidistant from the center. The arc is always the minor one (sweep of at
/// most π); the antipodal tie resolves counter-clockwise from start to end.
#[derive(Debug, Clone)]
pub struct CircleArc {
    center: Point2,
    radius: f64,
    start_angle: f64,
    sweep: f64,
}

impl CircleArc {
    /// Creates a circular arc from a start point through a center to an end point.
    ///
    /// # Errors
    ///
    /// Returns an error if either endpoint coincides with the center, if the
    /// endpoints are not equidistant from the center, or if the endpoints
    /// coincide (a full circle is not an arc).
    pub fn from_three_points(start: Point2, center: Point2, end: Point2) -> Result<Self> {
        let rs = (start - center).norm();
        let re = (end - center).norm();
        if rs < TOLERANCE || re < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        // Relative check: the demo geometries carry radii of order 1e5.
        if (rs - re).abs() > TOLERANCE.max(1e-9 * rs) {
            return Err(GeometryError::RadiusMismatch {
                start_radius: rs,
                end_radius: re,
            }
            .into());
        }
        if (end - start).norm() < TOLERANCE {
            return Err(
                GeometryError::Degenerate("arc endpoints coincide (full circle)".into()).into(),
            );
        }

        let start_angle = (start.y - center.y).atan2(start.x - center.x);
        let end_angle = (end.y - center.y).atan2(end.x - center.x);

        // Normalize the sweep into (-π, π]: minor arc, antipodal tie goes CCW.
        let mut sweep = end_angle - start_angle;
        if sweep > PI {
            sweep -= 2.0 * PI;
        } else if sweep <= -PI {
            sweep += 2.0 * PI;
        }

        Ok(Self {
            center,
            radius: rs,
            start_angle,
            sweep,
        })
    }

    /// Returns the center of the arc.
    #[must_use]
    pub fn center(&self) -> &Point2 {
        &self.center
    }

    /// Returns the radius of the arc.
    #[must_use]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Returns the signed sweep angle in radians (positive = counter-clockwise).
    #[must_use]
    pub fn sweep(&self) -> f64 {
        self.sweep
    }
}

impl Curve for CircleArc {
    fn evaluate(&self, t: f64) -> Result<Point2> {
        let angle = self.start_angle + self.sweep * t;
        Ok(self.center + Vector2::new(angle.cos(), angle.sin()) * self.radius)
    }

    fn tangent(&self, t: f64) -> Result<Vector2> {
        let angle = self.start_angle + self.sweep * t;
        let sign = if self.sweep >= 0.0 { 1.0 } else { -1.0 };
        Ok(Vector2::new(-sign * angle.sin(), sign * angle.cos()))
    }

    fn domain(&self) -> CurveDomain {
        CurveDomain::new(0.0, 1.0)
    }

    fn length(&self) -> f64 {
        self.radius * self.sweep.abs()
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
    fn quarter_arc_ccw() {
        let arc = CircleArc::from_three_points(
            Point2::new(1.0, 0.0),
            Point2::new(0.0, 0.0),
            Point2::new(0.0, 1.0),
        )
        .unwrap();
        assert!((arc.sweep() - PI / 2.0).abs() < TOLERANCE);
        let mid = arc.evaluate(0.5).unwrap();
        let e = (PI / 4.0).cos();
        assert!((mid - Point2::new(e, e)).norm() < TOLERANCE);
        assert!((arc.length() - PI / 2.0).abs() < TOLERANCE);
    }

    #[test]
    fn quarter_arc_takes_minor_side() {
        // From (0,1) to (1,0) the minor arc is clockwise.
        let arc = CircleArc::from_three_points(
            Point2::new(0.0, 1.0),
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
        )
        .unwrap();
        assert!((arc.sweep() + PI / 2.0).abs() < TOLERANCE);
    }

    #[test]
    fn antipodal_tie_goes_counter_clockwise() {
        // From (-R,0) to (R,0): exactly π; the CCW semicircle passes (0,-R).
        let arc = CircleArc::from_three_points(
            Point2::new(-2.0, 0.0),
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 0.0),
        )
        .unwrap();
        assert!((arc.sweep() - PI).abs() < TOLERANCE);
        let mid = arc.evaluate(0.5).unwrap();
        assert!((mid - Point2::new(0.0, -2.0)).norm() < TOLERANCE);
    }

    #[test]
    fn radius_mismatch_rejected() {
        let err = CircleArc::from_three_points(
            Point2::new(1.0, 0.0),
            Point2::new(0.0, 0.0),
            Point2::new(0.0, 1.5),
        );
        assert!(err.is_err());
    }

    #[test]
    fn full_circle_rejected() {
        let err = CircleArc::from_three_points(
            Point2::new(1.0, 0.0),
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
        );
        assert!(err.is_err());
    }

    #[test]
    fn tangent_is_unit_and_oriented() {
        let arc = CircleArc::from_three_points(
            Point2::new(1.0, 0.0),
            Point2::new(0.0, 0.0),
            Point2::new(0.0, 1.0),
        )
        .unwrap();
        let t = arc.tangent(0.0).unwrap();
        assert!((t.norm() - 1.0).abs() < TOLERANCE);
        // CCW start tangent at angle 0 points in +y.
        assert!((t - Vector2::new(0.0, 1.0)).norm() < TOLERANCE);
    }
}
