//! Binary mesh checkpoints.
//!
//! A checkpoint is a magic-tagged, versioned `bincode` snapshot of a
//! [`Mesh2d`], written in overwrite mode under a caller-chosen filename.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{IoError, Result};
use crate::mesh::Mesh2d;

const MAGIC: [u8; 8] = *b"FLOEMESH";
const VERSION: u32 = 1;

/// Saves a mesh checkpoint, overwriting any existing file.
///
/// # Errors
///
/// Returns an error if the file cannot be created or the mesh cannot be
/// encoded.
pub fn save_mesh<P: AsRef<Path>>(path: P, mesh: &Mesh2d) -> Result<()> {
    let file = File::create(path).map_err(IoError::from)?;
    let mut writer = BufWriter::new(file);
    bincode::serialize_into(&mut writer, &(MAGIC, VERSION, mesh)).map_err(IoError::from)?;
    writer.flush().map_err(IoError::from)?;
    Ok(())
}

/// Loads a mesh checkpoint.
///
/// # Errors
///
/// Returns an error if the file cannot be opened, is not a checkpoint, or
/// carries an unsupported version.
pub fn load_mesh<P: AsRef<Path>>(path: P) -> Result<Mesh2d> {
    let file = File::open(path).map_err(IoError::from)?;
    let reader = BufReader::new(file);
    let (magic, version, mesh): ([u8; 8], u32, Mesh2d) =
        bincode::deserialize_from(reader).map_err(IoError::from)?;
    if magic != MAGIC {
        return Err(IoError::BadMagic.into());
    }
    if version != VERSION {
        return Err(IoError::UnsupportedVersion { found: version, expected: VERSION }.into());
    }
    Ok(mesh)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("floemesh-{}-{name}", std::process::id()))
    }

    #[test]
    fn round_trip_preserves_the_mesh() {
        let mut mesh = Mesh2d::unit_disk(2);
        mesh.scale(12e3);
        let path = temp_path("roundtrip.ckpt");
        save_mesh(&path, &mesh).unwrap();
        let loaded = load_mesh(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded.vertex_count(), mesh.vertex_count());
        assert_eq!(loaded.triangle_count(), mesh.triangle_count());
        assert_eq!(loaded.groups, mesh.groups);
        assert!((loaded.total_area() - mesh.total_area()).abs() < 1e-6);
        loaded.validate().unwrap();
    }

    #[test]
    fn save_overwrites_existing_checkpoint() {
        let path = temp_path("overwrite.ckpt");
        save_mesh(&path, &Mesh2d::unit_disk(2)).unwrap();
        save_mesh(&path, &Mesh2d::unit_disk(0)).unwrap();
        let loaded = load_mesh(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded.vertex_count(), 7);
    }

    #[test]
    fn junk_file_is_rejected() {
        let path = temp_path("junk.ckpt");
        std::fs::write(&path, b"definitely not a checkpoint").unwrap();
        let err = load_mesh(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(err.is_err());
    }

    #[test]
    fn missing_file_is_reported() {
        assert!(load_mesh(temp_path("does-not-exist.ckpt")).is_err());
    }
}
