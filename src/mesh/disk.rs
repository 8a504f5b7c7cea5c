use std::collections::{HashMap, HashSet};

use crate::math::Point2;

use super::adjacency::canonical_edge;
use super::{BoundarySegment, Mesh2d, PhysicalGroup, Triangle};

fn midpoint_index(
    a: u32,
    b: u32,
    on_boundary: bool,
    points: &mut Vec<Point2>,
    cache: &mut HashMap<(u32, u32), u32>,
) -> u32 {
    let key = canonical_edge(a, b);
    if let Some(&m) = cache.get(&key) {
        return m;
    }
    let mut p = nalgebra::center(&points[a as usize], &points[b as usize]);
    if on_boundary {
        // Keep refined boundary vertices on the unit circle.
        let r = p.coords.norm();
        if r > 0.0 {
            p.coords /= r;
        }
    }
    #[allow(clippy::cast_possible_truncation)]
    let m = points.len() as u32;
    points.push(p);
    cache.insert(key, m);
    m
}

impl Mesh2d {
    /// Builds a triangulation of the unit disk.
    ///
    /// Starts from a hexagonal fan about the origin and applies `refinements`
    /// rounds of midpoint subdivision, projecting boundary midpoints onto the
    /// unit circle. Boundary chords are tagged as physical group 1.
    #[must_use]
    pub fn unit_disk(refinements: u32) -> Self {
        let mut points = vec![Point2::origin()];
        for k in 0..6 {
            let angle = f64::from(k) * std::f64::consts::FRAC_PI_3;
            points.push(Point2::new(angle.cos(), angle.sin()));
        }
        let mut triangles: Vec<Triangle> = (0..6u32)
            .map(|k| Triangle {
                nodes: [0, 1 + k, 1 + (k + 1) % 6],
                group: 1,
            })
            .collect();
        let mut segments: Vec<BoundarySegment> = (0..6u32)
            .map(|k| BoundarySegment {
                nodes: [1 + k, 1 + (k + 1) % 6],
                group: 1,
            })
            .collect();

        for _ in 0..refinements {
            let boundary: HashSet<(u32, u32)> = segments
                .iter()
                .map(|s| canonical_edge(s.nodes[0], s.nodes[1]))
                .collect();
            let mut cache = HashMap::new();

            let mut refined = Vec::with_capacity(triangles.len() * 4);
            for tri in &triangles {
                let [a, b, c] = tri.nodes;
                let mids: Vec<u32> = [(a, b), (b, c), (c, a)]
                    .into_iter()
                    .map(|(u, v)| {
                        let on_boundary = boundary.contains(&canonical_edge(u, v));
                        midpoint_index(u, v, on_boundary, &mut points, &mut cache)
                    })
                    .collect();
                let (mab, mbc, mca) = (mids[0], mids[1], mids[2]);
                refined.push(Triangle { nodes: [a, mab, mca], group: tri.group });
                refined.push(Triangle { nodes: [mab, b, mbc], group: tri.group });
                refined.push(Triangle { nodes: [mca, mbc, c], group: tri.group });
                refined.push(Triangle { nodes: [mab, mbc, mca], group: tri.group });
            }
            triangles = refined;

            let mut split = Vec::with_capacity(segments.len() * 2);
            for seg in &segments {
                let [a, b] = seg.nodes;
                let m = midpoint_index(a, b, true, &mut points, &mut cache);
                split.push(BoundarySegment { nodes: [a, m], group: seg.group });
                split.push(BoundarySegment { nodes: [m, b], group: seg.group });
            }
            segments = split;
        }

        Self {
            points,
            triangles,
            segments,
            groups: vec![
                PhysicalGroup { dim: 1, tag: 1, name: "boundary".into() },
                PhysicalGroup { dim: 2, tag: 1, name: "disk".into() },
            ],
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn coarse_disk_counts() {
        let mesh = Mesh2d::unit_disk(0);
        assert_eq!(mesh.vertex_count(), 7);
        assert_eq!(mesh.triangle_count(), 6);
        assert_eq!(mesh.segment_count(), 6);
        mesh.validate().unwrap();
    }

    #[test]
    fn refined_disk_counts_follow_closed_form() {
        // t = 6*4^k, v = 1 + 3*2^k + 3*4^k
        for k in 0..4u32 {
            let mesh = Mesh2d::unit_disk(k);
            let t = 6 * 4usize.pow(k);
            let v = 1 + 3 * 2usize.pow(k) + 3 * 4usize.pow(k);
            assert_eq!(mesh.triangle_count(), t, "triangles at level {k}");
            assert_eq!(mesh.vertex_count(), v, "vertices at level {k}");
            assert_eq!(mesh.segment_count(), 6 * 2usize.pow(k));
            mesh.validate().unwrap();
        }
    }

    #[test]
    fn boundary_vertices_lie_on_unit_circle() {
        let mesh = Mesh2d::unit_disk(3);
        for seg in &mesh.segments {
            for &n in &seg.nodes {
                let r = mesh.points[n as usize].coords.norm();
                assert!((r - 1.0).abs() < 1e-12, "boundary vertex radius {r}");
            }
        }
    }

    #[test]
    fn refined_disk_area_approaches_pi() {
        let coarse = Mesh2d::unit_disk(1).total_area();
        let fine = Mesh2d::unit_disk(4).total_area();
        let pi = std::f64::consts::PI;
        assert!((pi - fine) < (pi - coarse));
        assert!((fine - pi).abs() / pi < 0.01);
    }

    #[test]
    fn scaled_disk_has_physical_radius() {
        let mut mesh = Mesh2d::unit_disk(2);
        mesh.scale(12e3);
        let max_r = mesh
            .points
            .iter()
            .map(|p| p.coords.norm())
            .fold(0.0_f64, f64::max);
        assert!((max_r - 12e3).abs() < 1e-6);
    }
}
