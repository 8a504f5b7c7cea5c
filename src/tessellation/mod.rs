//! Mesh generation for plane surfaces.
//!
//! Loop curves are discretized into chords at the target element size, the
//! chords are inserted as constraints into a Delaunay triangulation, the
//! interior is seeded with a hexagonal lattice, and triangles are classified
//! by constraint-parity flood fill from the outer face.

use std::collections::{HashMap, HashSet, VecDeque};

use spade::handles::{FixedFaceHandle, FixedVertexHandle, InnerTag};
use spade::{
    ConstrainedDelaunayTriangulation, InsertionError, Point2 as SpadePoint2, Triangulation,
};
use tracing::debug;

use crate::error::{MeshingError, Result};
use crate::geometry::curve::Curve;
use crate::math::polygon_2d::{distance_to_polygon, point_in_polygon};
use crate::math::Point2;
use crate::mesh::{BoundarySegment, Mesh2d, Triangle};
use crate::model::{GeoModel, LoopId, SurfaceId};

/// Parameters controlling mesh generation.
#[derive(Debug, Clone, Copy)]
pub struct MeshingParams {
    /// Minimum number of chords per curve.
    pub min_segments: usize,
    /// Maximum number of chords per curve.
    pub max_segments: usize,
    /// Minimum distance from interior seed points to the boundary,
    /// as a fraction of the target element size.
    pub boundary_clearance: f64,
}

impl Default for MeshingParams {
    fn default() -> Self {
        Self {
            min_segments: 4,
            max_segments: 1024,
            boundary_clearance: 0.7,
        }
    }
}

/// One discretized curve loop: a closed polygon plus the physical tag of
/// each chord.
struct LoopPolygon {
    points: Vec<Point2>,
    chord_tags: Vec<i32>,
}

/// Triangulates a plane surface into a [`Mesh2d`].
pub struct TriangulateSurface {
    surface: SurfaceId,
    params: MeshingParams,
}

impl TriangulateSurface {
    /// Creates a new `TriangulateSurface` operation.
    #[must_use]
    pub fn new(surface: SurfaceId, params: MeshingParams) -> Self {
        Self { surface, params }
    }

    /// Executes the triangulation, returning the tagged mesh.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface or its loops are invalid, or if
    /// constraint insertion fails.
    #[allow(clippy::cast_possible_truncation, clippy::too_many_lines)]
    pub fn execute(&self, model: &GeoModel) -> Result<Mesh2d> {
        let surface = model.surface(self.surface)?;
        let surface_tag = model.surface_physical_tag(self.surface);

        let outer = discretize_loop(model, surface.outer, &self.params)?;
        let mut holes = Vec::with_capacity(surface.holes.len());
        for &hole in &surface.holes {
            holes.push(discretize_loop(model, hole, &self.params)?);
        }

        let mut cdt = ConstrainedDelaunayTriangulation::<SpadePoint2<f64>>::new();
        let outer_handles = insert_constraint_loop(&mut cdt, &outer.points)?;
        let mut hole_handles = Vec::with_capacity(holes.len());
        for hole in &holes {
            hole_handles.push(insert_constraint_loop(&mut cdt, &hole.points)?);
        }

        let size = mean_loop_size(model, surface.outer)?;
        let seeds = interior_seeds(&outer.points, &holes, size, &self.params);
        debug!(boundary = outer.points.len(), seeds = seeds.len(), "seeding interior");
        for seed in &seeds {
            cdt.insert(SpadePoint2::new(seed.x, seed.y))
                .map_err(|e: InsertionError| {
                    MeshingError::Failed(format!("interior point insert: {e}"))
                })?;
        }

        let interior = classify_interior_faces(&cdt);

        let mut mesh = Mesh2d { groups: model.physical_groups(), ..Mesh2d::default() };
        let mut vertex_map: HashMap<usize, u32> = HashMap::new();

        for face in cdt.inner_faces() {
            if !interior.contains(&face.fix().index()) {
                continue;
            }
            let mut nodes = [0u32; 3];
            for (i, vh) in face.vertices().iter().enumerate() {
                let pos = vh.position();
                nodes[i] = get_or_insert_vertex(
                    &mut mesh,
                    &mut vertex_map,
                    vh.fix().index(),
                    Point2::new(pos.x, pos.y),
                );
            }
            mesh.triangles.push(Triangle { nodes, group: surface_tag });
        }

        emit_segments(&mut mesh, &mut vertex_map, &cdt, &outer_handles, &outer.chord_tags);
        for (handles, hole) in hole_handles.iter().zip(&holes) {
            emit_segments(&mut mesh, &mut vertex_map, &cdt, handles, &hole.chord_tags);
        }

        debug!(
            vertices = mesh.vertex_count(),
            triangles = mesh.triangle_count(),
            "triangulated surface"
        );
        Ok(mesh)
    }
}

/// Discretizes every curve of a loop into chords at the local target size.
///
/// Each curve contributes its samples except the final one, which is the next
/// curve's start; chord `i` runs from polygon point `i` to point `i + 1`
/// (wrapping) and carries the physical tag of its source curve.
fn discretize_loop(model: &GeoModel, loop_id: LoopId, params: &MeshingParams) -> Result<LoopPolygon> {
    let chain = model.curve_loop(loop_id)?.curves.clone();
    let mut points = Vec::new();
    let mut chord_tags = Vec::new();

    for curve_id in chain {
        let data = model.curve(curve_id)?;
        let curve = data.geometry.as_curve();
        let size = 0.5 * (model.point(data.start)?.size + model.point(data.end)?.size);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let n = ((curve.length() / size).ceil() as usize)
            .clamp(params.min_segments, params.max_segments);
        let tag = model.curve_physical_tag(curve_id);
        let domain = curve.domain();
        for k in 0..n {
            #[allow(clippy::cast_precision_loss)]
            let t = domain.t_min + (domain.t_max - domain.t_min) * k as f64 / n as f64;
            points.push(curve.evaluate(t)?);
            chord_tags.push(tag);
        }
    }

    if points.len() < 3 {
        return Err(MeshingError::Failed("loop discretizes to fewer than 3 points".into()).into());
    }
    Ok(LoopPolygon { points, chord_tags })
}

/// Mean target element size over a loop's curve endpoints.
fn mean_loop_size(model: &GeoModel, loop_id: LoopId) -> Result<f64> {
    let chain = &model.curve_loop(loop_id)?.curves;
    let mut sum = 0.0;
    let mut count = 0.0;
    for &curve_id in chain {
        let data = model.curve(curve_id)?;
        sum += model.point(data.start)?.size + model.point(data.end)?.size;
        count += 2.0;
    }
    Ok(sum / count)
}

/// Generates hexagonal-lattice seed points strictly inside the domain.
fn interior_seeds(
    outer: &[Point2],
    holes: &[LoopPolygon],
    size: f64,
    params: &MeshingParams,
) -> Vec<Point2> {
    let (mut x_min, mut y_min) = (f64::INFINITY, f64::INFINITY);
    let (mut x_max, mut y_max) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for p in outer {
        x_min = x_min.min(p.x);
        y_min = y_min.min(p.y);
        x_max = x_max.max(p.x);
        y_max = y_max.max(p.y);
    }

    let clearance = params.boundary_clearance * size;
    let row_height = size * 3.0_f64.sqrt() * 0.5;
    let mut seeds = Vec::new();
    let mut row = 0usize;
    let mut y = y_min + row_height;
    while y < y_max {
        let offset = if row % 2 == 0 { 0.0 } else { 0.5 * size };
        let mut x = x_min + offset;
        while x < x_max {
            let p = Point2::new(x, y);
            let inside = point_in_polygon(&p, outer)
                && distance_to_polygon(&p, outer) > clearance
                && holes.iter().all(|h| {
                    !point_in_polygon(&p, &h.points)
                        && distance_to_polygon(&p, &h.points) > clearance
                });
            if inside {
                seeds.push(p);
            }
            x += size;
        }
        row += 1;
        y += row_height;
    }
    seeds
}

/// Inserts a closed polygon as constraint edges into the CDT.
fn insert_constraint_loop(
    cdt: &mut ConstrainedDelaunayTriangulation<SpadePoint2<f64>>,
    points: &[Point2],
) -> Result<Vec<FixedVertexHandle>> {
    if points.len() < 3 {
        return Err(MeshingError::Failed("constraint loop needs at least 3 points".into()).into());
    }

    let mut handles = Vec::with_capacity(points.len());
    for pt in points {
        let h = cdt
            .insert(SpadePoint2::new(pt.x, pt.y))
            .map_err(|e: InsertionError| MeshingError::Failed(format!("CDT insert: {e}")))?;
        handles.push(h);
    }

    for i in 0..handles.len() {
        let from = handles[i];
        let to = handles[(i + 1) % handles.len()];
        if from != to {
            cdt.add_constraint(from, to);
        }
    }

    Ok(handles)
}

/// Classifies which inner faces of the CDT are inside the domain using flood-fill.
///
/// Starts from faces adjacent to the outer (infinite) face at depth 0. Each time
/// a constraint edge is crossed, depth increments. Odd depth = interior.
fn classify_interior_faces(
    cdt: &ConstrainedDelaunayTriangulation<SpadePoint2<f64>>,
) -> HashSet<usize> {
    let mut interior = HashSet::new();
    let mut depth_map: HashMap<usize, u32> = HashMap::new();
    let mut queue: VecDeque<(FixedFaceHandle<InnerTag>, u32)> = VecDeque::new();

    let outer_fix = cdt.outer_face().fix();

    // Seed: find inner faces adjacent to the outer face via directed edges
    for edge in cdt.directed_edges() {
        if edge.face().fix() == outer_fix {
            let rev_face = edge.rev().face();
            if let Some(inner) = rev_face.as_inner() {
                let idx = inner.fix().index();
                if depth_map.contains_key(&idx) {
                    continue;
                }
                let depth = u32::from(cdt.is_constraint_edge(edge.as_undirected().fix()));
                depth_map.insert(idx, depth);
                if depth % 2 == 1 {
                    interior.insert(idx);
                }
                queue.push_back((inner.fix(), depth));
            }
        }
    }

    // BFS flood-fill
    while let Some((face_fix, depth)) = queue.pop_front() {
        let face = cdt.face(face_fix);
        for edge in face.adjacent_edges() {
            let neighbor = edge.rev().face();
            if let Some(inner_neighbor) = neighbor.as_inner() {
                let n_idx = inner_neighbor.fix().index();
                if depth_map.contains_key(&n_idx) {
                    continue;
                }
                let new_depth = if cdt.is_constraint_edge(edge.as_undirected().fix()) {
                    depth + 1
                } else {
                    depth
                };
                depth_map.insert(n_idx, new_depth);
                if new_depth % 2 == 1 {
                    interior.insert(n_idx);
                }
                queue.push_back((inner_neighbor.fix(), new_depth));
            }
        }
    }

    interior
}

/// Gets an existing mesh vertex for a CDT vertex or inserts a new one.
#[allow(clippy::cast_possible_truncation)]
fn get_or_insert_vertex(
    mesh: &mut Mesh2d,
    vertex_map: &mut HashMap<usize, u32>,
    handle_index: usize,
    position: Point2,
) -> u32 {
    if let Some(&existing) = vertex_map.get(&handle_index) {
        return existing;
    }
    let index = mesh.points.len() as u32;
    mesh.points.push(position);
    vertex_map.insert(handle_index, index);
    index
}

/// Emits one tagged boundary segment per loop chord.
fn emit_segments(
    mesh: &mut Mesh2d,
    vertex_map: &mut HashMap<usize, u32>,
    cdt: &ConstrainedDelaunayTriangulation<SpadePoint2<f64>>,
    handles: &[FixedVertexHandle],
    chord_tags: &[i32],
) {
    for i in 0..handles.len() {
        let from = handles[i];
        let to = handles[(i + 1) % handles.len()];
        if from == to {
            continue;
        }
        let nodes = [from, to].map(|h| {
            let pos = cdt.vertex(h).position();
            get_or_insert_vertex(mesh, vertex_map, h.index(), Point2::new(pos.x, pos.y))
        });
        mesh.segments.push(BoundarySegment { nodes, group: chord_tags[i] });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::GeoModel;

    fn unit_square_model() -> (GeoModel, SurfaceId) {
        let mut model = GeoModel::new();
        let size = 0.25;
        let a = model.add_point(0.0, 0.0, size).unwrap();
        let b = model.add_point(1.0, 0.0, size).unwrap();
        let c = model.add_point(1.0, 1.0, size).unwrap();
        let d = model.add_point(0.0, 1.0, size).unwrap();
        let ab = model.add_line(a, b).unwrap();
        let bc = model.add_line(b, c).unwrap();
        let cd = model.add_line(c, d).unwrap();
        let da = model.add_line(d, a).unwrap();
        let lp = model.add_curve_loop(&[ab, bc, cd, da]).unwrap();
        let s = model.add_plane_surface(lp, &[]).unwrap();
        model.add_physical_curve("walls", &[ab, bc, cd, da]).unwrap();
        model.add_physical_surface("interior", &[s]).unwrap();
        (model, s)
    }

    #[test]
    fn square_triangulation_covers_the_area() {
        let (model, s) = unit_square_model();
        let mesh = TriangulateSurface::new(s, MeshingParams::default())
            .execute(&model)
            .unwrap();
        mesh.validate().unwrap();
        assert!((mesh.total_area() - 1.0).abs() < 1e-9, "area {}", mesh.total_area());
    }

    #[test]
    fn square_triangulation_tags_elements() {
        let (model, s) = unit_square_model();
        let mesh = TriangulateSurface::new(s, MeshingParams::default())
            .execute(&model)
            .unwrap();
        assert!(mesh.triangles.iter().all(|t| t.group == 1));
        assert!(mesh.segments.iter().all(|seg| seg.group == 1));
        assert_eq!(mesh.groups.len(), 2);
    }

    #[test]
    fn interior_seeding_refines_the_mesh() {
        let (model, s) = unit_square_model();
        let mesh = TriangulateSurface::new(s, MeshingParams::default())
            .execute(&model)
            .unwrap();
        // 4 chords per side alone would give 16 boundary points; lattice
        // seeding must add interior vertices.
        assert!(mesh.vertex_count() > 16, "vertices {}", mesh.vertex_count());
    }

    #[test]
    fn hole_is_excluded_from_triangulation() {
        let mut model = GeoModel::new();
        let size = 0.2;
        let a = model.add_point(0.0, 0.0, size).unwrap();
        let b = model.add_point(3.0, 0.0, size).unwrap();
        let c = model.add_point(3.0, 3.0, size).unwrap();
        let d = model.add_point(0.0, 3.0, size).unwrap();
        let outer = [
            model.add_line(a, b).unwrap(),
            model.add_line(b, c).unwrap(),
            model.add_line(c, d).unwrap(),
            model.add_line(d, a).unwrap(),
        ];
        let ha = model.add_point(1.0, 1.0, size).unwrap();
        let hb = model.add_point(2.0, 1.0, size).unwrap();
        let hc = model.add_point(2.0, 2.0, size).unwrap();
        let hd = model.add_point(1.0, 2.0, size).unwrap();
        let hole = [
            model.add_line(ha, hb).unwrap(),
            model.add_line(hb, hc).unwrap(),
            model.add_line(hc, hd).unwrap(),
            model.add_line(hd, ha).unwrap(),
        ];
        let outer_loop = model.add_curve_loop(&outer).unwrap();
        let hole_loop = model.add_curve_loop(&hole).unwrap();
        let s = model.add_plane_surface(outer_loop, &[hole_loop]).unwrap();

        let mesh = TriangulateSurface::new(s, MeshingParams::default())
            .execute(&model)
            .unwrap();
        mesh.validate().unwrap();
        assert!((mesh.total_area() - 8.0).abs() < 1e-9, "area {}", mesh.total_area());

        // No triangle centroid inside the hole.
        for (i, tri) in mesh.triangles.iter().enumerate() {
            let centroid = tri
                .nodes
                .iter()
                .fold(Point2::origin(), |acc, &n| acc + mesh.points[n as usize].coords / 3.0);
            let in_hole =
                centroid.x > 1.0 && centroid.x < 2.0 && centroid.y > 1.0 && centroid.y < 2.0;
            assert!(!in_hole, "triangle {i} centroid {centroid:?} inside the hole");
        }
    }

    #[test]
    fn arc_loop_triangulates_to_analytic_area() {
        // Idealized ice-shelf domain: lower semicircle of radius r plus the
        // shallow arc centered at (0, -4r).
        let mut model = GeoModel::new();
        let r = 2.0;
        let size = 0.2;
        let x1 = model.add_point(-r, 0.0, size).unwrap();
        let x2 = model.add_point(r, 0.0, size).unwrap();
        let c1 = model.add_point(0.0, 0.0, size).unwrap();
        let c2 = model.add_point(0.0, -4.0 * r, size).unwrap();
        let a1 = model.add_circle_arc(x1, c1, x2).unwrap();
        let a2 = model.add_circle_arc(x2, c2, x1).unwrap();
        let lp = model.add_curve_loop(&[a1, a2]).unwrap();
        let s = model.add_plane_surface(lp, &[]).unwrap();

        let mesh = TriangulateSurface::new(s, MeshingParams::default())
            .execute(&model)
            .unwrap();
        mesh.validate().unwrap();

        // The triangulation covers the constraint polygon exactly.
        let polygon = discretize_loop(&model, model.surface(s).unwrap().outer, &MeshingParams::default())
            .unwrap()
            .points;
        let polygon_area = crate::math::polygon_2d::signed_area(&polygon);
        assert!(
            (mesh.total_area() - polygon_area).abs() / polygon_area < 1e-9,
            "mesh area {} vs polygon area {polygon_area}",
            mesh.total_area()
        );

        // Semicircle below the chord plus the circular segment above it.
        let rho = (17.0_f64).sqrt() * r;
        let theta = 2.0 * (r / rho).asin();
        let expected =
            std::f64::consts::FRAC_PI_2 * r * r + 0.5 * rho * rho * (theta - theta.sin());
        let area = mesh.total_area();
        assert!(
            (area - expected).abs() / expected < 0.01,
            "area {area}, expected {expected}"
        );
    }
}
