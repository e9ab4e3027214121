//! Mesh containers, selected by file extension.
//!
//! Readers yield the parametrized tet mesh; writers take one output mesh
//! type each. Format selection happens before extraction so a bad output
//! extension fails fast.

mod hexex_file;
mod medit;
mod obj;
mod ovm;

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use hexex::{HexMesh, Parametrization, PiecewiseLinearMesh, TetMesh};

pub use hexex_file::HexexReader;
#[cfg(test)]
pub(crate) use hexex_file::write_hexex;
pub use medit::MeditWriter;
pub use obj::ObjWriter;
pub use ovm::{OvmReader, OvmWriter};
#[cfg(test)]
pub(crate) use ovm::write_tet_ovm;

/// Parses a parametrized tetrahedral mesh.
pub trait MeshReader {
    fn read(&self, input: &mut dyn BufRead) -> Result<(TetMesh, Parametrization)>;
}

/// Serializes one kind of output mesh.
pub trait MeshWriter<M> {
    fn write(&self, mesh: &M, out: &mut dyn Write) -> Result<()>;
}

fn extension(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default()
}

pub fn reader_for(path: &Path) -> Result<Box<dyn MeshReader>> {
    match extension(path).as_str() {
        "hexex" => Ok(Box::new(HexexReader)),
        "ovm" => Ok(Box::new(OvmReader)),
        other => bail!(
            "unsupported input format '.{other}' for {} (expected .hexex or .ovm)",
            path.display()
        ),
    }
}

pub fn hex_writer_for(path: &Path) -> Result<Box<dyn MeshWriter<HexMesh>>> {
    match extension(path).as_str() {
        "mesh" => Ok(Box::new(MeditWriter)),
        "ovm" => Ok(Box::new(OvmWriter)),
        other => bail!(
            "unsupported hex mesh format '.{other}' for {} (expected .mesh or .ovm)",
            path.display()
        ),
    }
}

pub fn pwl_writer_for(path: &Path) -> Result<Box<dyn MeshWriter<PiecewiseLinearMesh>>> {
    match extension(path).as_str() {
        "ovm" => Ok(Box::new(OvmWriter)),
        "obj" => Ok(Box::new(ObjWriter)),
        other => bail!(
            "unsupported piecewise-linear format '.{other}' for {} (expected .ovm or .obj)",
            path.display()
        ),
    }
}

pub fn read_input(path: &Path) -> Result<(TetMesh, Parametrization)> {
    let reader = reader_for(path)?;
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    reader
        .read(&mut BufReader::new(file))
        .with_context(|| format!("reading {}", path.display()))
}

/// Create `path`'s parent directory if it is missing.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating output dir {}", parent.display()))?;
        }
    }
    Ok(())
}

pub fn write_output<M>(path: &Path, writer: &dyn MeshWriter<M>, mesh: &M) -> Result<()> {
    ensure_parent_dir(path)?;
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut out = BufWriter::new(file);
    writer
        .write(mesh, &mut out)
        .with_context(|| format!("writing {}", path.display()))?;
    out.flush()
        .with_context(|| format!("flushing {}", path.display()))?;
    Ok(())
}
