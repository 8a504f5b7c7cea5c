pub mod adjacency;
mod disk;

use serde::{Deserialize, Serialize};

use crate::error::{MeshError, Result};
use crate::math::Point2;

use self::adjacency::Adjacency;

/// A triangle element: three node indices and a physical-group tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triangle {
    /// Node indices, counter-clockwise.
    pub nodes: [u32; 3],
    /// Physical-group tag (0 = untagged).
    pub group: i32,
}

/// A boundary segment element: two node indices and a physical-group tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundarySegment {
    /// Node indices, oriented along the boundary.
    pub nodes: [u32; 2],
    /// Physical-group tag (0 = untagged).
    pub group: i32,
}

/// A named physical group of curve or surface elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalGroup {
    /// Dimension of the grouped entities (1 = curves, 2 = surfaces).
    pub dim: u8,
    /// Group tag, unique per dimension.
    pub tag: i32,
    /// Group name.
    pub name: String,
}

/// A two-dimensional triangle mesh with tagged boundary segments.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Mesh2d {
    /// Vertex positions.
    pub points: Vec<Point2>,
    /// Triangle elements.
    pub triangles: Vec<Triangle>,
    /// Boundary segment elements.
    pub segments: Vec<BoundarySegment>,
    /// Physical-group name table.
    pub groups: Vec<PhysicalGroup>,
}

impl Mesh2d {
    /// Number of vertices in the mesh.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.points.len()
    }

    /// Number of triangles in the mesh.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Number of boundary segments in the mesh.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Signed area of triangle `i` (positive for counter-clockwise nodes).
    #[must_use]
    pub fn triangle_area(&self, i: usize) -> f64 {
        let [a, b, c] = self.triangles[i].nodes;
        let (pa, pb, pc) = (
            &self.points[a as usize],
            &self.points[b as usize],
            &self.points[c as usize],
        );
        0.5 * ((pb - pa).x * (pc - pa).y - (pb - pa).y * (pc - pa).x)
    }

    /// Sum of all triangle areas.
    #[must_use]
    pub fn total_area(&self) -> f64 {
        (0..self.triangles.len()).map(|i| self.triangle_area(i)).sum()
    }

    /// Scales every vertex position by `factor` about the origin.
    pub fn scale(&mut self, factor: f64) {
        for p in &mut self.points {
            p.coords *= factor;
        }
    }

    /// Checks the structural invariants of the mesh.
    ///
    /// Every node index must be in bounds, every triangle must have strictly
    /// positive area, and every segment must be a boundary edge of the
    /// triangulation (shared by exactly one triangle).
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<()> {
        if self.points.is_empty() {
            return Err(MeshError::Empty("points").into());
        }
        if self.triangles.is_empty() {
            return Err(MeshError::Empty("triangles").into());
        }

        let count = self.points.len();
        let in_bounds = |index: u32| -> Result<()> {
            if (index as usize) < count {
                Ok(())
            } else {
                Err(MeshError::IndexOutOfBounds { index, count }.into())
            }
        };
        for tri in &self.triangles {
            for &n in &tri.nodes {
                in_bounds(n)?;
            }
        }
        for seg in &self.segments {
            for &n in &seg.nodes {
                in_bounds(n)?;
            }
        }

        for i in 0..self.triangles.len() {
            let area = self.triangle_area(i);
            if area <= 0.0 {
                return Err(MeshError::InvertedTriangle { index: i, area }.into());
            }
        }

        let adj = Adjacency::build(&self.triangles);
        for (i, seg) in self.segments.iter().enumerate() {
            if adj.incident(seg.nodes[0], seg.nodes[1]).len() != 1 {
                return Err(MeshError::DanglingSegment { index: i }.into());
            }
        }

        Ok(())
    }
}
