//! Riemannian metric fields for anisotropic mesh adaptation.
//!
//! A metric field assigns a symmetric positive definite 2x2 tensor to every
//! mesh vertex. The tensor's eigenvalues are the inverse squared target edge
//! lengths along its eigenvector directions, so a unit-length edge in metric
//! space has exactly the desired size and orientation.

use crate::error::{MetricError, Result};
use crate::math::tensor_2d::{clamp_eigenvalues, is_positive_definite};
use crate::math::{Matrix2, Point2};
use crate::mesh::Mesh2d;

/// Adaptation-time parameters attached to a metric field.
#[derive(Debug, Clone, Copy)]
pub struct MetricParams {
    /// Maximum allowed deviation between boundary chords and the true
    /// boundary geometry, in mesh units.
    pub hausdorff: f64,
}

impl Default for MetricParams {
    fn default() -> Self {
        Self { hausdorff: f64::INFINITY }
    }
}

/// A per-vertex symmetric positive definite tensor field.
#[derive(Debug, Clone)]
pub struct MetricField {
    tensors: Vec<Matrix2>,
    params: MetricParams,
}

impl MetricField {
    /// Evaluates a closed-form tensor expression at every mesh vertex.
    ///
    /// # Errors
    ///
    /// Returns an error if the expression yields a tensor that is not
    /// symmetric positive definite at some vertex.
    pub fn from_fn<F>(mesh: &Mesh2d, f: F) -> Result<Self>
    where
        F: Fn(&Point2) -> Matrix2,
    {
        let mut tensors = Vec::with_capacity(mesh.points.len());
        for (vertex, p) in mesh.points.iter().enumerate() {
            let m = f(p);
            if !is_positive_definite(&m) {
                return Err(MetricError::NotPositiveDefinite { vertex }.into());
            }
            tensors.push(m);
        }
        Ok(Self { tensors, params: MetricParams::default() })
    }

    /// Sets the adaptation parameters, consuming and returning the field.
    #[must_use]
    pub fn with_params(mut self, params: MetricParams) -> Self {
        self.params = params;
        self
    }

    /// Returns the adaptation parameters.
    #[must_use]
    pub fn params(&self) -> &MetricParams {
        &self.params
    }

    /// Number of tensors in the field.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    /// Returns whether the field is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    /// Returns the tensor at vertex `i`.
    #[must_use]
    pub fn tensor(&self, i: usize) -> &Matrix2 {
        &self.tensors[i]
    }

    /// Returns the full tensor table.
    #[must_use]
    pub fn tensors(&self) -> &[Matrix2] {
        &self.tensors
    }

    /// Clamps every tensor's target sizes into `[h_min, h_max]`.
    ///
    /// Eigenvalues are clamped into `[1/h_max^2, 1/h_min^2]`, preserving the
    /// eigenvector directions.
    pub fn bound_sizes(&mut self, h_min: f64, h_max: f64) {
        let lo = 1.0 / (h_max * h_max);
        let hi = 1.0 / (h_min * h_min);
        for m in &mut self.tensors {
            *m = clamp_eigenvalues(m, lo, hi);
        }
    }

    /// Metric length of the edge `(i, j)`.
    ///
    /// Uses the endpoint-averaged tensor, a two-point approximation of the
    /// metric length integral.
    #[must_use]
    pub fn edge_length(&self, points: &[Point2], i: u32, j: u32) -> f64 {
        metric_edge_length(
            &points[i as usize],
            &points[j as usize],
            &self.tensors[i as usize],
            &self.tensors[j as usize],
        )
    }

    /// Interpolated tensor for a vertex inserted between `i` and `j`.
    #[must_use]
    pub fn midpoint_tensor(&self, i: u32, j: u32) -> Matrix2 {
        0.5 * (self.tensors[i as usize] + self.tensors[j as usize])
    }
}

/// Metric length of the chord `a -> b` under the averaged endpoint tensors.
#[must_use]
pub fn metric_edge_length(a: &Point2, b: &Point2, ma: &Matrix2, mb: &Matrix2) -> f64 {
    let d = b - a;
    let m = 0.5 * (ma + mb);
    d.dot(&(m * d)).max(0.0).sqrt()
}
