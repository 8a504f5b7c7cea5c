use crate::math::{Point2, TOLERANCE};
use crate::mesh::Mesh2d;

/// The boundary geometry a mesh is adapted against.
///
/// Vertices created or moved on the mesh boundary are projected back onto
/// the true boundary through this trait.
pub trait BoundaryGeometry {
    /// Projects a point onto the boundary.
    fn project(&self, p: &Point2) -> Point2;
}

/// An analytic circle boundary.
#[derive(Debug, Clone)]
pub struct CircleBoundary {
    center: Point2,
    radius: f64,
}

impl CircleBoundary {
    /// Creates a circle boundary.
    #[must_use]
    pub fn new(center: Point2, radius: f64) -> Self {
        Self { center, radius }
    }
}

impl BoundaryGeometry for CircleBoundary {
    fn project(&self, p: &Point2) -> Point2 {
        let d = p - self.center;
        let r = d.norm();
        if r < TOLERANCE {
            // Degenerate query from the center; any boundary point will do.
            return self.center + crate::math::Vector2::x() * self.radius;
        }
        self.center + d * (self.radius / r)
    }
}

/// A boundary frozen from a mesh's boundary chords.
///
/// Projection returns the nearest point on any chord, so adapted boundaries
/// stay on the initial discrete boundary when no analytic geometry exists.
#[derive(Debug, Clone)]
pub struct PolylineBoundary {
    chords: Vec<(Point2, Point2)>,
}

impl PolylineBoundary {
    /// Freezes the boundary chords of a mesh.
    #[must_use]
    pub fn from_mesh(mesh: &Mesh2d) -> Self {
        let chords = mesh
            .segments
            .iter()
            .map(|s| (mesh.points[s.nodes[0] as usize], mesh.points[s.nodes[1] as usize]))
            .collect();
        Self { chords }
    }
}

impl BoundaryGeometry for PolylineBoundary {
    fn project(&self, p: &Point2) -> Point2 {
        let mut best = *p;
        let mut best_dist = f64::INFINITY;
        for (a, b) in &self.chords {
            let ab = b - a;
            let len2 = ab.norm_squared();
            let candidate = if len2 < TOLERANCE * TOLERANCE {
                *a
            } else {
                let t = ((p - a).dot(&ab) / len2).clamp(0.0, 1.0);
                *a + ab * t
            };
            let dist = (*p - candidate).norm();
            if dist < best_dist {
                best_dist = dist;
                best = candidate;
            }
        }
        best
    }
}

/// Distance from a point to its projection on the geometry.
pub(crate) fn deviation<G: BoundaryGeometry + ?Sized>(geometry: &G, p: &Point2) -> f64 {
    (geometry.project(p) - p).norm()
}
