//! Adapts a disk mesh to an anisotropic metric concentrated on an annular
//! band, prints the adapted vertex count, and writes a mesh checkpoint.

use floemesh::adapt::{AdaptParams, CircleBoundary, Remesher};
use floemesh::io::checkpoint;
use floemesh::math::{Matrix2, Point2};
use floemesh::mesh::Mesh2d;
use floemesh::metric::{MetricField, MetricParams};

fn main() -> floemesh::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing_subscriber::filter::LevelFilter::WARN.into())
        .add_directive("floemesh=info".parse().unwrap_or_default());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let radius = 12e3;
    let mut mesh = Mesh2d::unit_disk(3);
    mesh.scale(radius);

    let r_1 = 6e3;
    let r_2 = 10e3;
    let alpha = 100.0;
    let dx = 1e3;

    // Identity metric at size dx everywhere, radially compressed inside the
    // band r_1 < r < r_2.
    let metric = MetricField::from_fn(&mesh, |x| {
        let r = x.coords.norm();
        let p = 4.0 * f64::max(0.0, (r_2 - r) * (r - r_1)) / (r_1 * r_2);
        let stretch = x.coords * x.coords.transpose() * (alpha * p / (r_1 * r_2));
        (Matrix2::identity() + stretch) / (dx * dx)
    })?
    .with_params(MetricParams { hausdorff: 10.0 });

    let geometry = CircleBoundary::new(Point2::origin(), radius);
    let mut remesher = Remesher::new(&mesh, &metric, &geometry)?;
    remesher.remesh(&AdaptParams::default())?;
    let adapted = remesher.to_mesh();

    println!("{}", adapted.vertex_count());

    checkpoint::save_mesh("aniso-mesh.ckpt", &adapted)?;
    Ok(())
}
