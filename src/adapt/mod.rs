//! Metric-driven mesh adaptation.
//!
//! The remesher iterates local modifications until edge lengths measured in
//! the metric fall into the unit range: long edges are split, short edges
//! collapsed, interior edges flipped toward regular vertex valences, and
//! interior vertices relaxed. Boundary vertices stay on the true boundary
//! geometry within the metric's hausdorff parameter.

pub mod boundary;

pub use boundary::{BoundaryGeometry, CircleBoundary, PolylineBoundary};

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::error::{AdaptError, MetricError, Result};
use crate::math::{Matrix2, Point2};
use crate::mesh::adjacency::{canonical_edge, vertex_neighbors, vertex_triangles, Adjacency};
use crate::mesh::{BoundarySegment, Mesh2d, PhysicalGroup, Triangle};
use crate::metric::{metric_edge_length, MetricField};

use boundary::deviation;

/// Parameters controlling the adaptation loop.
#[derive(Debug, Clone, Copy)]
pub struct AdaptParams {
    /// Maximum number of split/collapse/flip/smooth passes.
    pub max_iterations: usize,
    /// Metric length above which an edge is split.
    pub split_threshold: f64,
    /// Metric length below which an edge is collapsed.
    pub collapse_threshold: f64,
    /// Relaxation factor for tangential smoothing (0 = off, 1 = full).
    pub smoothing_factor: f64,
}

impl Default for AdaptParams {
    fn default() -> Self {
        Self {
            max_iterations: 20,
            split_threshold: std::f64::consts::SQRT_2,
            collapse_threshold: std::f64::consts::FRAC_1_SQRT_2,
            smoothing_factor: 0.5,
        }
    }
}

/// Operation counts accumulated over an adaptation run.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdaptStats {
    /// Number of passes performed.
    pub iterations: usize,
    /// Number of edge splits.
    pub splits: usize,
    /// Number of edge collapses.
    pub collapses: usize,
    /// Number of edge flips.
    pub flips: usize,
}

/// Adapts a mesh to a Riemannian metric field against a boundary geometry.
pub struct Remesher<'a, G: BoundaryGeometry> {
    geometry: &'a G,
    hausdorff: f64,
    points: Vec<Point2>,
    tensors: Vec<Matrix2>,
    triangles: Vec<Triangle>,
    /// Canonical boundary edge -> physical tag.
    boundary_tags: HashMap<(u32, u32), i32>,
    groups: Vec<PhysicalGroup>,
    stats: AdaptStats,
}

impl<'a, G: BoundaryGeometry> Remesher<'a, G> {
    /// Creates a remesher over a mesh, a metric field, and a boundary geometry.
    ///
    /// # Errors
    ///
    /// Returns an error if the mesh is invalid or the metric field does not
    /// have one tensor per mesh vertex.
    pub fn new(mesh: &Mesh2d, metric: &MetricField, geometry: &'a G) -> Result<Self> {
        mesh.validate()?;
        if metric.len() != mesh.points.len() {
            return Err(MetricError::SizeMismatch {
                metric_len: metric.len(),
                mesh_len: mesh.points.len(),
            }
            .into());
        }
        let boundary_tags = mesh
            .segments
            .iter()
            .map(|s| (canonical_edge(s.nodes[0], s.nodes[1]), s.group))
            .collect();
        Ok(Self {
            geometry,
            hausdorff: metric.params().hausdorff,
            points: mesh.points.clone(),
            tensors: metric.tensors().to_vec(),
            triangles: mesh.triangles.clone(),
            boundary_tags,
            groups: mesh.groups.clone(),
            stats: AdaptStats::default(),
        })
    }

    /// Runs the adaptation loop until a fixed point or the iteration cap,
    /// then compacts and checks the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the adapted mesh violates a structural invariant.
    pub fn remesh(&mut self, params: &AdaptParams) -> Result<AdaptStats> {
        for iteration in 0..params.max_iterations {
            let splits = self.split_pass(params.split_threshold);
            let collapses = self.collapse_pass(params.collapse_threshold);
            let flips = self.flip_pass();
            self.smooth_pass(params.smoothing_factor);

            self.stats.iterations = iteration + 1;
            self.stats.splits += splits;
            self.stats.collapses += collapses;
            self.stats.flips += flips;
            debug!(iteration, splits, collapses, flips, "adaptation pass");

            if splits + collapses + flips == 0 {
                break;
            }
        }
        self.compact();
        self.check()?;
        Ok(self.stats)
    }

    /// Returns the operation counts accumulated so far.
    #[must_use]
    pub fn stats(&self) -> AdaptStats {
        self.stats
    }

    /// Checks the structural invariants of the current mesh state.
    ///
    /// # Errors
    ///
    /// Returns an error if a triangle is inverted, an index is out of
    /// bounds, or a boundary segment lost its triangle.
    pub fn check(&self) -> Result<()> {
        self.to_mesh()
            .validate()
            .map_err(|e| AdaptError::InvalidResult(e.to_string()).into())
    }

    /// Extracts the current mesh state.
    #[must_use]
    pub fn to_mesh(&self) -> Mesh2d {
        let mut segments: Vec<BoundarySegment> = self
            .boundary_tags
            .iter()
            .map(|(&(a, b), &group)| BoundarySegment { nodes: [a, b], group })
            .collect();
        segments.sort_unstable_by_key(|s| s.nodes);
        Mesh2d {
            points: self.points.clone(),
            triangles: self.triangles.clone(),
            segments,
            groups: self.groups.clone(),
        }
    }

    fn edge_length(&self, a: u32, b: u32) -> f64 {
        metric_edge_length(
            &self.points[a as usize],
            &self.points[b as usize],
            &self.tensors[a as usize],
            &self.tensors[b as usize],
        )
    }

    fn area(&self, nodes: [u32; 3]) -> f64 {
        let (pa, pb, pc) = (
            &self.points[nodes[0] as usize],
            &self.points[nodes[1] as usize],
            &self.points[nodes[2] as usize],
        );
        0.5 * ((pb - pa).x * (pc - pa).y - (pb - pa).y * (pc - pa).x)
    }

    fn boundary_vertices(&self) -> HashSet<u32> {
        self.boundary_tags
            .keys()
            .flat_map(|&(a, b)| [a, b])
            .collect()
    }

    /// Splits edges whose metric length exceeds the threshold, plus boundary
    /// edges whose chord deviates from the geometry by more than `hausdorff`.
    #[allow(clippy::cast_possible_truncation)]
    fn split_pass(&mut self, threshold: f64) -> usize {
        let adj = Adjacency::build(&self.triangles);
        let edges: Vec<(u32, u32)> = adj.edges().map(|(e, _)| e).collect();
        let mut dirty: HashSet<u32> = HashSet::new();
        let mut splits = 0;

        for (a, b) in edges {
            let on_boundary = self.boundary_tags.contains_key(&(a, b));
            let mut mid = nalgebra::center(&self.points[a as usize], &self.points[b as usize]);
            let forced = on_boundary && deviation(self.geometry, &mid) > self.hausdorff;
            if self.edge_length(a, b) <= threshold && !forced {
                continue;
            }
            let incident = adj.incident(a, b);
            if incident.iter().any(|t| dirty.contains(t)) {
                continue;
            }

            if on_boundary {
                mid = self.geometry.project(&mid);
            }
            let m = self.points.len() as u32;
            self.points.push(mid);
            self.tensors
                .push(0.5 * (self.tensors[a as usize] + self.tensors[b as usize]));

            for &t in incident {
                let tri = self.triangles[t as usize];
                let Some(i) = (0..3).find(|&i| {
                    let (u, v) = (tri.nodes[i], tri.nodes[(i + 1) % 3]);
                    (u == a && v == b) || (u == b && v == a)
                }) else {
                    continue;
                };
                let (u, v, w) = (tri.nodes[i], tri.nodes[(i + 1) % 3], tri.nodes[(i + 2) % 3]);
                self.triangles[t as usize] = Triangle { nodes: [u, m, w], group: tri.group };
                let fresh = self.triangles.len() as u32;
                self.triangles.push(Triangle { nodes: [m, v, w], group: tri.group });
                dirty.insert(t);
                dirty.insert(fresh);
            }

            if on_boundary {
                if let Some(tag) = self.boundary_tags.remove(&(a, b)) {
                    self.boundary_tags.insert(canonical_edge(a, m), tag);
                    self.boundary_tags.insert(canonical_edge(m, b), tag);
                }
            }
            splits += 1;
        }
        splits
    }

    /// Collapses edges whose metric length falls below the threshold.
    #[allow(clippy::too_many_lines)]
    fn collapse_pass(&mut self, threshold: f64) -> usize {
        let adj = Adjacency::build(&self.triangles);
        let vertex_count = self.points.len();
        let neighbors = vertex_neighbors(&self.triangles, vertex_count);
        let stars = vertex_triangles(&self.triangles, vertex_count);
        let on_boundary = self.boundary_vertices();
        let boundary_neighbors = self.boundary_neighbor_map();

        let short: Vec<(u32, u32)> = adj
            .edges()
            .map(|(e, _)| e)
            .filter(|&(a, b)| self.edge_length(a, b) < threshold)
            .collect();

        let mut touched: HashSet<u32> = HashSet::new();
        let mut collapses = 0;

        for (a, b) in short {
            if touched.contains(&a) || touched.contains(&b) {
                continue;
            }
            let edge_on_boundary = self.boundary_tags.contains_key(&(a, b));
            let (target, victim) = match (on_boundary.contains(&a), on_boundary.contains(&b)) {
                (true, true) => {
                    // Both on the boundary: only a boundary edge may collapse,
                    // never a chord through the interior.
                    if !edge_on_boundary {
                        continue;
                    }
                    (a, b)
                }
                (true, false) => (a, b),
                (false, true) => (b, a),
                (false, false) => (a, b),
            };

            // Manifold guard: an interior edge has exactly two common
            // neighbors, a boundary edge exactly one.
            let common = neighbors[target as usize]
                .iter()
                .filter(|n| neighbors[victim as usize].contains(n))
                .count();
            let expected = if edge_on_boundary { 1 } else { 2 };
            if common != expected {
                continue;
            }

            if edge_on_boundary
                && (!self.boundary_collapse_allowed(target, victim, &boundary_neighbors)
                    || self.boundary_loop_length(victim, &boundary_neighbors) <= 3)
            {
                continue;
            }

            let valid = stars[victim as usize].iter().all(|&t| {
                let nodes = self.triangles[t as usize].nodes;
                if nodes.contains(&target) {
                    // Removed together with the edge.
                    return true;
                }
                let mapped = nodes.map(|n| if n == victim { target } else { n });
                self.area(mapped) > 0.0
            });
            if !valid {
                continue;
            }

            for &t in &stars[victim as usize] {
                for n in &mut self.triangles[t as usize].nodes {
                    if *n == victim {
                        *n = target;
                    }
                }
            }

            if on_boundary.contains(&victim) {
                let stale: Vec<((u32, u32), i32)> = self
                    .boundary_tags
                    .iter()
                    .filter(|(&(u, v), _)| u == victim || v == victim)
                    .map(|(&e, &tag)| (e, tag))
                    .collect();
                for ((u, v), tag) in stale {
                    self.boundary_tags.remove(&(u, v));
                    let nu = if u == victim { target } else { u };
                    let nv = if v == victim { target } else { v };
                    if nu != nv {
                        self.boundary_tags.insert(canonical_edge(nu, nv), tag);
                    }
                }
            }

            touched.insert(target);
            touched.insert(victim);
            touched.extend(neighbors[victim as usize].iter().copied());
            touched.extend(neighbors[target as usize].iter().copied());
            collapses += 1;
        }

        self.triangles.retain(|t| {
            let [x, y, z] = t.nodes;
            x != y && y != z && z != x
        });
        collapses
    }

    /// Map from each boundary vertex to its neighbors along the boundary.
    fn boundary_neighbor_map(&self) -> HashMap<u32, Vec<u32>> {
        let mut map: HashMap<u32, Vec<u32>> = HashMap::new();
        for &(a, b) in self.boundary_tags.keys() {
            map.entry(a).or_default().push(b);
            map.entry(b).or_default().push(a);
        }
        map
    }

    /// Walks the boundary cycle through `start`, returning its edge count.
    fn boundary_loop_length(&self, start: u32, boundary_neighbors: &HashMap<u32, Vec<u32>>) -> usize {
        let Some(adjacent) = boundary_neighbors.get(&start) else {
            return 0;
        };
        let Some(&first) = adjacent.first() else {
            return 0;
        };
        let mut length = 1;
        let (mut prev, mut current) = (start, first);
        while current != start {
            let Some(next) = boundary_neighbors
                .get(&current)
                .and_then(|n| n.iter().find(|&&x| x != prev))
            else {
                return length;
            };
            prev = current;
            current = *next;
            length += 1;
            if length > self.boundary_tags.len() {
                break;
            }
        }
        length
    }

    /// A boundary collapse must keep the merged chords within `hausdorff`
    /// of the geometry.
    fn boundary_collapse_allowed(
        &self,
        target: u32,
        victim: u32,
        boundary_neighbors: &HashMap<u32, Vec<u32>>,
    ) -> bool {
        let Some(adjacent) = boundary_neighbors.get(&victim) else {
            return false;
        };
        if adjacent.len() != 2 {
            return false;
        }
        adjacent.iter().filter(|&&x| x != target).all(|&x| {
            let mid = nalgebra::center(&self.points[target as usize], &self.points[x as usize]);
            deviation(self.geometry, &mid) <= self.hausdorff
        })
    }

    /// Flips interior edges that reduce the vertex-valence deviation
    /// (target valence 6 for interior vertices, 4 on the boundary).
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    fn flip_pass(&mut self) -> usize {
        let adj = Adjacency::build(&self.triangles);
        let vertex_count = self.points.len();
        let neighbors = vertex_neighbors(&self.triangles, vertex_count);
        let mut valence: Vec<i32> = neighbors.iter().map(|n| n.len() as i32).collect();
        let on_boundary = self.boundary_vertices();
        let target = |v: u32| if on_boundary.contains(&v) { 4_i32 } else { 6 };

        let mut edge_set: HashSet<(u32, u32)> = adj.edges().map(|(e, _)| e).collect();
        let interior: Vec<((u32, u32), [u32; 2])> = adj
            .edges()
            .filter_map(|(e, tris)| match tris {
                [t1, t2] => Some((e, [*t1, *t2])),
                _ => None,
            })
            .collect();

        let mut dirty: HashSet<u32> = HashSet::new();
        let mut flips = 0;

        for ((a, b), [t1, t2]) in interior {
            if self.boundary_tags.contains_key(&(a, b))
                || dirty.contains(&t1)
                || dirty.contains(&t2)
            {
                continue;
            }
            // Orient so that t1 holds the directed edge (u, v) and t2 holds (v, u).
            let (u, v, w1) = match opposite_of_directed(self.triangles[t1 as usize].nodes, a, b) {
                Some(w) => (a, b, w),
                None => match opposite_of_directed(self.triangles[t1 as usize].nodes, b, a) {
                    Some(w) => (b, a, w),
                    None => continue,
                },
            };
            let Some(w2) = opposite_of_directed(self.triangles[t2 as usize].nodes, v, u) else {
                continue;
            };
            if edge_set.contains(&canonical_edge(w1, w2)) {
                continue;
            }

            let new1 = [u, w2, w1];
            let new2 = [v, w1, w2];
            if self.area(new1) <= 0.0 || self.area(new2) <= 0.0 {
                continue;
            }

            let dev = |x: u32, val: i32| (val - target(x)).abs();
            let before = dev(u, valence[u as usize])
                + dev(v, valence[v as usize])
                + dev(w1, valence[w1 as usize])
                + dev(w2, valence[w2 as usize]);
            let after = dev(u, valence[u as usize] - 1)
                + dev(v, valence[v as usize] - 1)
                + dev(w1, valence[w1 as usize] + 1)
                + dev(w2, valence[w2 as usize] + 1);
            if after >= before {
                continue;
            }

            let group = self.triangles[t1 as usize].group;
            self.triangles[t1 as usize] = Triangle { nodes: new1, group };
            self.triangles[t2 as usize] = Triangle { nodes: new2, group };
            valence[u as usize] -= 1;
            valence[v as usize] -= 1;
            valence[w1 as usize] += 1;
            valence[w2 as usize] += 1;
            edge_set.remove(&canonical_edge(a, b));
            edge_set.insert(canonical_edge(w1, w2));
            dirty.insert(t1);
            dirty.insert(t2);
            flips += 1;
        }
        flips
    }

    /// Relaxes interior vertices toward their neighbor centroid.
    fn smooth_pass(&mut self, factor: f64) {
        if factor <= 0.0 {
            return;
        }
        let vertex_count = self.points.len();
        let neighbors = vertex_neighbors(&self.triangles, vertex_count);
        let stars = vertex_triangles(&self.triangles, vertex_count);
        let on_boundary = self.boundary_vertices();

        for v in 0..vertex_count {
            #[allow(clippy::cast_possible_truncation)]
            let vid = v as u32;
            if on_boundary.contains(&vid) || neighbors[v].is_empty() {
                continue;
            }
            let mut centroid = nalgebra::Vector2::zeros();
            for &n in &neighbors[v] {
                centroid += self.points[n as usize].coords;
            }
            #[allow(clippy::cast_precision_loss)]
            let centroid = Point2::from(centroid / neighbors[v].len() as f64);
            let candidate = self.points[v] + (centroid - self.points[v]) * factor;

            let previous = self.points[v];
            self.points[v] = candidate;
            let valid = stars[v]
                .iter()
                .all(|&t| self.area(self.triangles[t as usize].nodes) > 0.0);
            if !valid {
                self.points[v] = previous;
            }
        }
    }

    /// Drops vertices no longer referenced by any triangle and remaps indices.
    #[allow(clippy::cast_possible_truncation)]
    fn compact(&mut self) {
        let mut remap: Vec<Option<u32>> = vec![None; self.points.len()];
        let mut points = Vec::new();
        let mut tensors = Vec::new();

        let mut resolve = |n: u32, points: &mut Vec<Point2>, tensors: &mut Vec<Matrix2>| {
            if let Some(mapped) = remap[n as usize] {
                return mapped;
            }
            let fresh = points.len() as u32;
            points.push(self.points[n as usize]);
            tensors.push(self.tensors[n as usize]);
            remap[n as usize] = Some(fresh);
            fresh
        };

        let mut triangles = Vec::with_capacity(self.triangles.len());
        for tri in &self.triangles {
            let nodes = tri.nodes.map(|n| resolve(n, &mut points, &mut tensors));
            triangles.push(Triangle { nodes, group: tri.group });
        }
        let boundary_tags = self
            .boundary_tags
            .iter()
            .filter_map(|(&(a, b), &tag)| {
                // Boundary vertices always survive; a missing mapping means the
                // edge lost its triangles and is dropped.
                match (remap[a as usize], remap[b as usize]) {
                    (Some(na), Some(nb)) => Some((canonical_edge(na, nb), tag)),
                    _ => None,
                }
            })
            .collect();

        self.points = points;
        self.tensors = tensors;
        self.triangles = triangles;
        self.boundary_tags = boundary_tags;
    }
}

/// Returns the vertex opposite the directed edge `(u, v)` if the triangle
/// contains that directed edge.
fn opposite_of_directed(nodes: [u32; 3], u: u32, v: u32) -> Option<u32> {
    (0..3).find_map(|i| {
        if nodes[i] == u && nodes[(i + 1) % 3] == v {
            Some(nodes[(i + 2) % 3])
        } else {
            None
        }
    })
}
