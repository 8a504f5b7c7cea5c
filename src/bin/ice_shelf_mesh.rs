//! Builds an idealized ice-shelf domain from two circular arcs, triangulates
//! it, and writes the mesh with named boundary and interior groups.

use floemesh::io::msh;
use floemesh::model::GeoModel;
use floemesh::tessellation::{MeshingParams, TriangulateSurface};

fn main() -> floemesh::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing_subscriber::filter::LevelFilter::WARN.into())
        .add_directive("floemesh=info".parse().unwrap_or_default());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let r = 200e3;
    let dx = 5e3;

    let mut model = GeoModel::new();

    let x_1 = model.add_point(-r, 0.0, dx)?;
    let x_2 = model.add_point(r, 0.0, dx)?;
    let center_1 = model.add_point(0.0, 0.0, dx)?;
    let center_2 = model.add_point(0.0, -4.0 * r, dx)?;

    let arcs = [
        model.add_circle_arc(x_1, center_1, x_2)?,
        model.add_circle_arc(x_2, center_2, x_1)?,
    ];

    let boundary = model.add_curve_loop(&arcs)?;
    let surface = model.add_plane_surface(boundary, &[])?;

    for (arc, name) in arcs.iter().zip(["calving-front", "inflow"]) {
        model.add_physical_curve(name, &[*arc])?;
    }
    model.add_physical_surface("shelf", &[surface])?;

    let mesh = TriangulateSurface::new(surface, MeshingParams::default()).execute(&model)?;
    msh::write_msh("ice-shelf.msh", &mesh)?;
    Ok(())
}
