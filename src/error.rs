use thiserror::Error;

/// Top-level error type for the floemesh kernel.
#[derive(Debug, Error)]
pub enum FloemeshError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Mesh(#[from] MeshError),

    #[error(transparent)]
    Metric(#[from] MetricError),

    #[error(transparent)]
    Adapt(#[from] AdaptError),

    #[error(transparent)]
    Meshing(#[from] MeshingError),

    #[error(transparent)]
    Io(#[from] IoError),
}

/// Errors related to geometric computations.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("parameter {parameter} = {value} is out of range [{min}, {max}]")]
    ParameterOutOfRange {
        parameter: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("degenerate geometry: {0}")]
    Degenerate(String),

    #[error("zero-length vector")]
    ZeroVector,

    #[error("arc endpoints are not equidistant from the center: |c-s| = {start_radius}, |c-e| = {end_radius}")]
    RadiusMismatch { start_radius: f64, end_radius: f64 },
}

/// Errors related to the geometry model builder.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("entity not found: {0}")]
    EntityNotFound(String),

    #[error("curve loop is not closed")]
    LoopNotClosed,

    #[error("curve loop member {index} does not start where the previous curve ends")]
    BrokenChain { index: usize },

    #[error("physical group must reference at least one entity")]
    EmptyPhysicalGroup,

    #[error("invalid model: {0}")]
    InvalidModel(String),
}

/// Errors related to mesh data.
#[derive(Debug, Error)]
pub enum MeshError {
    #[error("mesh has no {0}")]
    Empty(&'static str),

    #[error("node index {index} out of bounds (mesh has {count} points)")]
    IndexOutOfBounds { index: u32, count: usize },

    #[error("triangle {index} has non-positive area {area}")]
    InvertedTriangle { index: usize, area: f64 },

    #[error("segment {index} is not an edge of the triangulation")]
    DanglingSegment { index: usize },
}

/// Errors related to Riemannian metric fields.
#[derive(Debug, Error)]
pub enum MetricError {
    #[error("metric tensor at vertex {vertex} is not symmetric positive definite")]
    NotPositiveDefinite { vertex: usize },

    #[error("metric field has {metric_len} tensors but the mesh has {mesh_len} points")]
    SizeMismatch { metric_len: usize, mesh_len: usize },
}

/// Errors related to metric-driven adaptation.
#[derive(Debug, Error)]
pub enum AdaptError {
    #[error("adaptation produced an invalid mesh: {0}")]
    InvalidResult(String),

    #[error("adaptation failed: {0}")]
    Failed(String),
}

/// Errors related to mesh generation from a geometry model.
#[derive(Debug, Error)]
pub enum MeshingError {
    #[error("invalid meshing parameters: {0}")]
    InvalidParameters(String),

    #[error("triangulation failed: {0}")]
    Failed(String),
}

/// Errors related to reading and writing mesh files.
#[derive(Debug, Error)]
pub enum IoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("checkpoint codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("not a floemesh checkpoint (bad magic)")]
    BadMagic,

    #[error("unsupported checkpoint version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("malformed mesh file: {0}")]
    Format(String),
}

/// Convenience type alias for results using [`FloemeshError`].
pub type Result<T> = std::result::Result<T, FloemeshError>;
