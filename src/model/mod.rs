//! Geometry model builder.
//!
//! Points with target element sizes, curves anchored at points, closed curve
//! loops, plane surfaces bounded by loops, and named physical groups.
//! Entities live in typed arenas and reference each other by id; the strict
//! build-up is points, then curves, then loops, surfaces, and groups.

use slotmap::SlotMap;

use crate::error::{ModelError, Result};
use crate::geometry::curve::{CircleArc, Curve, Segment};
use crate::math::Point2;
use crate::mesh::PhysicalGroup;

slotmap::new_key_type! {
    /// Unique identifier for a model point.
    pub struct PointId;
    /// Unique identifier for a model curve.
    pub struct CurveId;
    /// Unique identifier for a curve loop.
    pub struct LoopId;
    /// Unique identifier for a plane surface.
    pub struct SurfaceId;
}

/// A model point with an attached target element size.
#[derive(Debug, Clone)]
pub struct PointData {
    /// Position in the plane.
    pub position: Point2,
    /// Target element size near this point.
    pub size: f64,
}

/// The geometric shape of a model curve.
#[derive(Debug, Clone)]
pub enum CurveGeometry {
    /// A straight segment.
    Segment(Segment),
    /// A circular arc.
    Arc(CircleArc),
}

impl CurveGeometry {
    /// Returns the shape as a parametric curve.
    #[must_use]
    pub fn as_curve(&self) -> &dyn Curve {
        match self {
            CurveGeometry::Segment(s) => s,
            CurveGeometry::Arc(a) => a,
        }
    }
}

/// A model curve between two points.
#[derive(Debug, Clone)]
pub struct CurveData {
    /// Start point.
    pub start: PointId,
    /// End point.
    pub end: PointId,
    /// Geometric shape.
    pub geometry: CurveGeometry,
}

/// An ordered, head-to-tail chained, closed sequence of curves.
#[derive(Debug, Clone)]
pub struct LoopData {
    /// Member curves, traversed start to end.
    pub curves: Vec<CurveId>,
}

/// A plane surface bounded by an outer loop with optional holes.
#[derive(Debug, Clone)]
pub struct SurfaceData {
    /// Outer boundary loop.
    pub outer: LoopId,
    /// Hole loops.
    pub holes: Vec<LoopId>,
}

#[derive(Debug, Clone)]
struct PhysicalCurveGroup {
    tag: i32,
    name: String,
    curves: Vec<CurveId>,
}

#[derive(Debug, Clone)]
struct PhysicalSurfaceGroup {
    tag: i32,
    name: String,
    surfaces: Vec<SurfaceId>,
}

/// Central arena that owns all model entities.
#[derive(Debug, Default)]
pub struct GeoModel {
    points: SlotMap<PointId, PointData>,
    curves: SlotMap<CurveId, CurveData>,
    loops: SlotMap<LoopId, LoopData>,
    surfaces: SlotMap<SurfaceId, SurfaceData>,
    physical_curves: Vec<PhysicalCurveGroup>,
    physical_surfaces: Vec<PhysicalSurfaceGroup>,
}

impl GeoModel {
    /// Creates a new, empty model.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a point with a target element size.
    ///
    /// # Errors
    ///
    /// Returns an error if the size is not strictly positive.
    pub fn add_point(&mut self, x: f64, y: f64, size: f64) -> Result<PointId> {
        if !(size > 0.0 && size.is_finite()) {
            return Err(crate::error::GeometryError::ParameterOutOfRange {
                parameter: "size",
                value: size,
                min: 0.0,
                max: f64::INFINITY,
            }
            .into());
        }
        Ok(self.points.insert(PointData { position: Point2::new(x, y), size }))
    }

    /// Returns a reference to the point data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the model.
    pub fn point(&self, id: PointId) -> Result<&PointData> {
        self.points
            .get(id)
            .ok_or_else(|| ModelError::EntityNotFound("point".into()).into())
    }

    /// Adds a straight line curve between two points.
    ///
    /// # Errors
    ///
    /// Returns an error if a point id is dangling or the endpoints coincide.
    pub fn add_line(&mut self, start: PointId, end: PointId) -> Result<CurveId> {
        let p0 = self.point(start)?.position;
        let p1 = self.point(end)?.position;
        let geometry = CurveGeometry::Segment(Segment::new(p0, p1)?);
        Ok(self.curves.insert(CurveData { start, end, geometry }))
    }

    /// Adds a circular arc from `start` to `end` anchored at `center`.
    ///
    /// The minor arc is taken; the antipodal tie resolves counter-clockwise.
    ///
    /// # Errors
    ///
    /// Returns an error if a point id is dangling, the endpoints are not
    /// equidistant from the center, or the arc is degenerate.
    pub fn add_circle_arc(
        &mut self,
        start: PointId,
        center: PointId,
        end: PointId,
    ) -> Result<CurveId> {
        let p0 = self.point(start)?.position;
        let pc = self.point(center)?.position;
        let p1 = self.point(end)?.position;
        let geometry = CurveGeometry::Arc(CircleArc::from_three_points(p0, pc, p1)?);
        Ok(self.curves.insert(CurveData { start, end, geometry }))
    }

    /// Returns a reference to the curve data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the model.
    pub fn curve(&self, id: CurveId) -> Result<&CurveData> {
        self.curves
            .get(id)
            .ok_or_else(|| ModelError::EntityNotFound("curve".into()).into())
    }

    /// Adds a closed loop of head-to-tail chained curves.
    ///
    /// # Errors
    ///
    /// Returns an error if the sequence is empty, a member id is dangling,
    /// a member does not start at the previous member's end, or the last
    /// member does not end at the first member's start.
    pub fn add_curve_loop(&mut self, curves: &[CurveId]) -> Result<LoopId> {
        if curves.is_empty() {
            return Err(ModelError::LoopNotClosed.into());
        }
        for (index, pair) in curves.windows(2).enumerate() {
            if self.curve(pair[0])?.end != self.curve(pair[1])?.start {
                return Err(ModelError::BrokenChain { index: index + 1 }.into());
            }
        }
        let first = self.curve(curves[0])?.start;
        let last = self.curve(curves[curves.len() - 1])?.end;
        if first != last {
            return Err(ModelError::LoopNotClosed.into());
        }
        Ok(self.loops.insert(LoopData { curves: curves.to_vec() }))
    }

    /// Returns a reference to the loop data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the model.
    pub fn curve_loop(&self, id: LoopId) -> Result<&LoopData> {
        self.loops
            .get(id)
            .ok_or_else(|| ModelError::EntityNotFound("curve loop".into()).into())
    }

    /// Adds a plane surface bounded by an outer loop with optional holes.
    ///
    /// # Errors
    ///
    /// Returns an error if a loop id is dangling.
    pub fn add_plane_surface(&mut self, outer: LoopId, holes: &[LoopId]) -> Result<SurfaceId> {
        self.curve_loop(outer)?;
        for &hole in holes {
            self.curve_loop(hole)?;
        }
        Ok(self.surfaces.insert(SurfaceData { outer, holes: holes.to_vec() }))
    }

    /// Returns a reference to the surface data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the model.
    pub fn surface(&self, id: SurfaceId) -> Result<&SurfaceData> {
        self.surfaces
            .get(id)
            .ok_or_else(|| ModelError::EntityNotFound("surface".into()).into())
    }

    /// Adds a named physical group of curves, returning its tag.
    ///
    /// Tags are sequential per dimension, starting at 1.
    ///
    /// # Errors
    ///
    /// Returns an error if the group is empty or a member id is dangling.
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn add_physical_curve(&mut self, name: &str, curves: &[CurveId]) -> Result<i32> {
        if curves.is_empty() {
            return Err(ModelError::EmptyPhysicalGroup.into());
        }
        for &c in curves {
            self.curve(c)?;
        }
        let tag = self.physical_curves.len() as i32 + 1;
        self.physical_curves.push(PhysicalCurveGroup {
            tag,
            name: name.to_owned(),
            curves: curves.to_vec(),
        });
        Ok(tag)
    }

    /// Adds a named physical group of surfaces, returning its tag.
    ///
    /// Tags are sequential per dimension, starting at 1.
    ///
    /// # Errors
    ///
    /// Returns an error if the group is empty or a member id is dangling.
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn add_physical_surface(&mut self, name: &str, surfaces: &[SurfaceId]) -> Result<i32> {
        if surfaces.is_empty() {
            return Err(ModelError::EmptyPhysicalGroup.into());
        }
        for &s in surfaces {
            self.surface(s)?;
        }
        let tag = self.physical_surfaces.len() as i32 + 1;
        self.physical_surfaces.push(PhysicalSurfaceGroup {
            tag,
            name: name.to_owned(),
            surfaces: surfaces.to_vec(),
        });
        Ok(tag)
    }

    /// Returns the physical tag of a curve (first group wins), or 0 if untagged.
    #[must_use]
    pub fn curve_physical_tag(&self, id: CurveId) -> i32 {
        self.physical_curves
            .iter()
            .find(|g| g.curves.contains(&id))
            .map_or(0, |g| g.tag)
    }

    /// Returns the physical tag of a surface (first group wins), or 0 if untagged.
    #[must_use]
    pub fn surface_physical_tag(&self, id: SurfaceId) -> i32 {
        self.physical_surfaces
            .iter()
            .find(|g| g.surfaces.contains(&id))
            .map_or(0, |g| g.tag)
    }

    /// Returns the physical-group name table for mesh emission.
    #[must_use]
    pub fn physical_groups(&self) -> Vec<PhysicalGroup> {
        let mut groups: Vec<PhysicalGroup> = self
            .physical_curves
            .iter()
            .map(|g| PhysicalGroup { dim: 1, tag: g.tag, name: g.name.clone() })
            .collect();
        groups.extend(self.physical_surfaces.iter().map(|g| PhysicalGroup {
            dim: 2,
            tag: g.tag,
            name: g.name.clone(),
        }));
        groups
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn point_size_must_be_positive() {
        let mut model = GeoModel::new();
        assert!(model.add_point(0.0, 0.0, 0.0).is_err());
        assert!(model.add_point(0.0, 0.0, -1.0).is_err());
        assert!(model.add_point(0.0, 0.0, 1.0).is_ok());
    }

    #[test]
    fn chained_arcs_close_into_a_loop() {
        let mut model = GeoModel::new();
        let x1 = model.add_point(-1.0, 0.0, 0.1).unwrap();
        let x2 = model.add_point(1.0, 0.0, 0.1).unwrap();
        let c = model.add_point(0.0, 0.0, 0.1).unwrap();
        let c2 = model.add_point(0.0, -4.0, 0.1).unwrap();
        let a1 = model.add_circle_arc(x1, c, x2).unwrap();
        let a2 = model.add_circle_arc(x2, c2, x1).unwrap();
        model.add_curve_loop(&[a1, a2]).unwrap();
    }

    #[test]
    fn broken_chain_is_rejected() {
        let mut model = GeoModel::new();
        let a = model.add_point(0.0, 0.0, 0.1).unwrap();
        let b = model.add_point(1.0, 0.0, 0.1).unwrap();
        let c = model.add_point(1.0, 1.0, 0.1).unwrap();
        let ab = model.add_line(a, b).unwrap();
        // Runs b->c; chaining ab then cb reversed breaks the chain.
        let cb = model.add_line(c, b).unwrap();
        let err = model.add_curve_loop(&[ab, cb]);
        assert!(err.is_err());
    }

    #[test]
    fn open_chain_is_rejected() {
        let mut model = GeoModel::new();
        let a = model.add_point(0.0, 0.0, 0.1).unwrap();
        let b = model.add_point(1.0, 0.0, 0.1).unwrap();
        let c = model.add_point(1.0, 1.0, 0.1).unwrap();
        let ab = model.add_line(a, b).unwrap();
        let bc = model.add_line(b, c).unwrap();
        assert!(model.add_curve_loop(&[ab, bc]).is_err());
    }

    #[test]
    fn physical_tags_are_sequential_per_dimension() {
        let mut model = GeoModel::new();
        let a = model.add_point(0.0, 0.0, 0.1).unwrap();
        let b = model.add_point(1.0, 0.0, 0.1).unwrap();
        let c = model.add_point(0.5, 1.0, 0.1).unwrap();
        let ab = model.add_line(a, b).unwrap();
        let bc = model.add_line(b, c).unwrap();
        let ca = model.add_line(c, a).unwrap();
        let lp = model.add_curve_loop(&[ab, bc, ca]).unwrap();
        let s = model.add_plane_surface(lp, &[]).unwrap();

        assert_eq!(model.add_physical_curve("base", &[ab]).unwrap(), 1);
        assert_eq!(model.add_physical_curve("sides", &[bc, ca]).unwrap(), 2);
        assert_eq!(model.add_physical_surface("interior", &[s]).unwrap(), 1);

        assert_eq!(model.curve_physical_tag(ab), 1);
        assert_eq!(model.curve_physical_tag(bc), 2);
        assert_eq!(model.surface_physical_tag(s), 1);
        assert_eq!(model.physical_groups().len(), 3);
    }

    #[test]
    fn empty_physical_group_is_rejected() {
        let mut model = GeoModel::new();
        assert!(model.add_physical_curve("empty", &[]).is_err());
    }

    #[test]
    fn dangling_ids_are_reported() {
        let model = GeoModel::new();
        let mut other = GeoModel::new();
        let p = other.add_point(0.0, 0.0, 1.0).unwrap();
        assert!(model.point(p).is_err());
    }
}
