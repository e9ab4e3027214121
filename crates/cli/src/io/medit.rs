//! Medit `.mesh` writer for hex meshes (ASCII, 1-based ids, zero labels).

use std::io::Write;

use anyhow::Result;
use hexex::HexMesh;

use super::MeshWriter;

pub struct MeditWriter;

impl MeshWriter<HexMesh> for MeditWriter {
    fn write(&self, mesh: &HexMesh, out: &mut dyn Write) -> Result<()> {
        writeln!(out, "MeshVersionFormatted 2")?;
        writeln!(out, "Dimension 3")?;
        writeln!(out, "Vertices")?;
        writeln!(out, "{}", mesh.num_vertices())?;
        for v in &mesh.vertices {
            writeln!(out, "{} {} {} 0", v.x, v.y, v.z)?;
        }
        writeln!(out, "Hexahedra")?;
        writeln!(out, "{}", mesh.num_cells())?;
        for cell in &mesh.cells {
            for v in cell {
                write!(out, "{} ", v + 1)?;
            }
            writeln!(out, "0")?;
        }
        writeln!(out, "End")?;
        Ok(())
    }
}
