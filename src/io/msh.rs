//! Gmsh MSH 2.2 ASCII reading and writing.
//!
//! Only the element types the kernel produces are supported: 2-node lines
//! and 3-node triangles, with physical names carried in `$PhysicalNames`.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{IoError, Result};
use crate::math::Point2;
use crate::mesh::{BoundarySegment, Mesh2d, PhysicalGroup, Triangle};

/// Writes a mesh to a MSH 2.2 ASCII file, overwriting any existing file.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn write_msh<P: AsRef<Path>>(path: P, mesh: &Mesh2d) -> Result<()> {
    let file = File::create(path).map_err(IoError::from)?;
    let mut writer = BufWriter::new(file);
    write_sections(&mut writer, mesh).map_err(IoError::from)?;
    writer.flush().map_err(IoError::from)?;
    Ok(())
}

fn write_sections<W: Write>(w: &mut W, mesh: &Mesh2d) -> std::io::Result<()> {
    writeln!(w, "$MeshFormat")?;
    writeln!(w, "2.2 0 8")?;
    writeln!(w, "$EndMeshFormat")?;

    if !mesh.groups.is_empty() {
        writeln!(w, "$PhysicalNames")?;
        writeln!(w, "{}", mesh.groups.len())?;
        for g in &mesh.groups {
            writeln!(w, "{} {} \"{}\"", g.dim, g.tag, g.name)?;
        }
        writeln!(w, "$EndPhysicalNames")?;
    }

    writeln!(w, "$Nodes")?;
    writeln!(w, "{}", mesh.points.len())?;
    for (i, p) in mesh.points.iter().enumerate() {
        writeln!(w, "{} {} {} 0", i + 1, p.x, p.y)?;
    }
    writeln!(w, "$EndNodes")?;

    writeln!(w, "$Elements")?;
    writeln!(w, "{}", mesh.segments.len() + mesh.triangles.len())?;
    let mut id = 0usize;
    for seg in &mesh.segments {
        id += 1;
        writeln!(
            w,
            "{} 1 2 {} {} {} {}",
            id,
            seg.group,
            seg.group,
            seg.nodes[0] + 1,
            seg.nodes[1] + 1
        )?;
    }
    for tri in &mesh.triangles {
        id += 1;
        writeln!(
            w,
            "{} 2 2 {} {} {} {} {}",
            id,
            tri.group,
            tri.group,
            tri.nodes[0] + 1,
            tri.nodes[1] + 1,
            tri.nodes[2] + 1
        )?;
    }
    writeln!(w, "$EndElements")?;
    Ok(())
}

/// Reads a mesh from a MSH 2.2 ASCII file.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or does not follow the
/// supported MSH 2.2 subset.
pub fn read_msh<P: AsRef<Path>>(path: P) -> Result<Mesh2d> {
    let file = File::open(path).map_err(IoError::from)?;
    let reader = BufReader::new(file);
    let mut lines = reader.lines();

    let mut mesh = Mesh2d::default();

    while let Some(line) = lines.next() {
        let line = line.map_err(IoError::from)?;
        match line.trim() {
            "$MeshFormat" => {
                let version = next_line(&mut lines)?;
                if !version.starts_with("2.2") {
                    return Err(
                        IoError::Format(format!("unsupported MSH version: {version}")).into()
                    );
                }
                expect_end(&mut lines, "$EndMeshFormat")?;
            }
            "$PhysicalNames" => read_physical_names(&mut lines, &mut mesh)?,
            "$Nodes" => read_nodes(&mut lines, &mut mesh)?,
            "$Elements" => read_elements(&mut lines, &mut mesh)?,
            _ => {}
        }
    }

    Ok(mesh)
}

fn next_line<B: BufRead>(lines: &mut std::io::Lines<B>) -> Result<String> {
    match lines.next() {
        Some(line) => Ok(line.map_err(IoError::from)?),
        None => Err(IoError::Format("unexpected end of file".into()).into()),
    }
}

fn expect_end<B: BufRead>(lines: &mut std::io::Lines<B>, marker: &str) -> Result<()> {
    let line = next_line(lines)?;
    if line.trim() == marker {
        Ok(())
    } else {
        Err(IoError::Format(format!("expected {marker}, found {line}")).into())
    }
}

fn parse<T: std::str::FromStr>(token: Option<&str>, what: &str) -> Result<T> {
    token
        .and_then(|t| t.parse().ok())
        .ok_or_else(|| IoError::Format(format!("bad {what}")).into())
}

fn read_physical_names<B: BufRead>(lines: &mut std::io::Lines<B>, mesh: &mut Mesh2d) -> Result<()> {
    let count: usize = parse(Some(next_line(lines)?.trim()), "physical name count")?;
    for _ in 0..count {
        let line = next_line(lines)?;
        let mut tokens = line.split_whitespace();
        let dim: u8 = parse(tokens.next(), "physical name dimension")?;
        let tag: i32 = parse(tokens.next(), "physical name tag")?;
        let name = tokens.collect::<Vec<_>>().join(" ");
        let name = name.trim_matches('"').to_owned();
        mesh.groups.push(PhysicalGroup { dim, tag, name });
    }
    expect_end(lines, "$EndPhysicalNames")
}

fn read_nodes<B: BufRead>(lines: &mut std::io::Lines<B>, mesh: &mut Mesh2d) -> Result<()> {
    let count: usize = parse(Some(next_line(lines)?.trim()), "node count")?;
    mesh.points.reserve(count);
    for i in 0..count {
        let line = next_line(lines)?;
        let mut tokens = line.split_whitespace();
        let id: usize = parse(tokens.next(), "node id")?;
        if id != i + 1 {
            return Err(IoError::Format(format!("non-sequential node id {id}")).into());
        }
        let x: f64 = parse(tokens.next(), "node x")?;
        let y: f64 = parse(tokens.next(), "node y")?;
        mesh.points.push(Point2::new(x, y));
    }
    expect_end(lines, "$EndNodes")
}

#[allow(clippy::cast_possible_truncation)]
fn read_elements<B: BufRead>(lines: &mut std::io::Lines<B>, mesh: &mut Mesh2d) -> Result<()> {
    let count: usize = parse(Some(next_line(lines)?.trim()), "element count")?;
    for _ in 0..count {
        let line = next_line(lines)?;
        let mut tokens = line.split_whitespace();
        let _id: usize = parse(tokens.next(), "element id")?;
        let kind: usize = parse(tokens.next(), "element type")?;
        let tag_count: usize = parse(tokens.next(), "element tag count")?;
        let mut group = 0i32;
        for t in 0..tag_count {
            let tag: i32 = parse(tokens.next(), "element tag")?;
            if t == 0 {
                group = tag;
            }
        }
        let mut node = |what| -> Result<u32> {
            let id: u32 = parse(tokens.next(), what)?;
            if id == 0 || id as usize > mesh.points.len() {
                return Err(IoError::Format(format!("element references node {id}")).into());
            }
            Ok(id - 1)
        };
        match kind {
            1 => {
                let nodes = [node("line node")?, node("line node")?];
                mesh.segments.push(BoundarySegment { nodes, group });
            }
            2 => {
                let nodes = [
                    node("triangle node")?,
                    node("triangle node")?,
                    node("triangle node")?,
                ];
                mesh.triangles.push(Triangle { nodes, group });
            }
            other => {
                return Err(IoError::Format(format!("unsupported element type {other}")).into());
            }
        }
    }
    expect_end(lines, "$EndElements")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("floemesh-{}-{name}", std::process::id()))
    }

    #[test]
    fn round_trip_preserves_structure() {
        let mesh = Mesh2d::unit_disk(2);
        let path = temp_path("roundtrip.msh");
        write_msh(&path, &mesh).unwrap();
        let loaded = read_msh(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded.vertex_count(), mesh.vertex_count());
        assert_eq!(loaded.triangle_count(), mesh.triangle_count());
        assert_eq!(loaded.segment_count(), mesh.segment_count());
        assert_eq!(loaded.groups, mesh.groups);
        assert!((loaded.total_area() - mesh.total_area()).abs() < 1e-12);
        loaded.validate().unwrap();
    }

    #[test]
    fn physical_group_counts_survive() {
        let mesh = Mesh2d::unit_disk(1);
        let path = temp_path("groups.msh");
        write_msh(&path, &mesh).unwrap();
        let loaded = read_msh(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded.groups.iter().filter(|g| g.dim == 1).count(), 1);
        assert_eq!(loaded.groups.iter().filter(|g| g.dim == 2).count(), 1);
    }

    #[test]
    fn two_arc_domain_file_carries_its_groups() {
        use crate::model::GeoModel;
        use crate::tessellation::{MeshingParams, TriangulateSurface};

        let mut model = GeoModel::new();
        let (r, dx) = (200e3, 5e3);
        let x1 = model.add_point(-r, 0.0, dx).unwrap();
        let x2 = model.add_point(r, 0.0, dx).unwrap();
        let c1 = model.add_point(0.0, 0.0, dx).unwrap();
        let c2 = model.add_point(0.0, -4.0 * r, dx).unwrap();
        let front = model.add_circle_arc(x1, c1, x2).unwrap();
        let inflow = model.add_circle_arc(x2, c2, x1).unwrap();
        let boundary = model.add_curve_loop(&[front, inflow]).unwrap();
        let surface = model.add_plane_surface(boundary, &[]).unwrap();
        model.add_physical_curve("calving-front", &[front]).unwrap();
        model.add_physical_curve("inflow", &[inflow]).unwrap();
        model.add_physical_surface("shelf", &[surface]).unwrap();

        let mesh = TriangulateSurface::new(surface, MeshingParams::default())
            .execute(&model)
            .unwrap();

        let path = temp_path("shelf.msh");
        write_msh(&path, &mesh).unwrap();
        let loaded = read_msh(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded.groups.iter().filter(|g| g.dim == 1).count(), 2);
        assert_eq!(loaded.groups.iter().filter(|g| g.dim == 2).count(), 1);
        assert!(loaded.segments.iter().any(|s| s.group == 1));
        assert!(loaded.segments.iter().any(|s| s.group == 2));
        assert!(loaded.triangles.iter().all(|t| t.group == 1));
        assert!(loaded.vertex_count() > 0);
        loaded.validate().unwrap();
    }

    #[test]
    fn write_overwrites_existing_file() {
        let path = temp_path("overwrite.msh");
        write_msh(&path, &Mesh2d::unit_disk(2)).unwrap();
        write_msh(&path, &Mesh2d::unit_disk(0)).unwrap();
        let loaded = read_msh(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded.vertex_count(), 7);
    }

    #[test]
    fn malformed_file_is_rejected() {
        let path = temp_path("malformed.msh");
        std::fs::write(&path, "$Nodes\nnot-a-count\n").unwrap();
        let err = read_msh(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(err.is_err());
    }
}
