//! Wavefront OBJ writer for the piecewise-linear mesh.
//!
//! Faces become polygon `f` records; edges not bounding any face (feature
//! curves) become `l` records.

use std::io::Write;

use anyhow::Result;
use hexex::PiecewiseLinearMesh;

use super::MeshWriter;

pub struct ObjWriter;

impl MeshWriter<PiecewiseLinearMesh> for ObjWriter {
    fn write(&self, mesh: &PiecewiseLinearMesh, out: &mut dyn Write) -> Result<()> {
        for p in &mesh.points {
            writeln!(out, "v {} {} {}", p.x, p.y, p.z)?;
        }
        let mut on_face = vec![false; mesh.edges.len()];
        for (f, hes) in mesh.faces.iter().enumerate() {
            write!(out, "f")?;
            for v in mesh.face_vertices(f) {
                write!(out, " {}", v + 1)?;
            }
            writeln!(out)?;
            for he in hes {
                on_face[he / 2] = true;
            }
        }
        for (e, [a, b]) in mesh.edges.iter().enumerate() {
            if !on_face[e] {
                writeln!(out, "l {} {}", a + 1, b + 1)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    #[test]
    fn faces_and_loose_edges() {
        let mesh = PiecewiseLinearMesh {
            points: vec![
                Vector3::zeros(),
                Vector3::x(),
                Vector3::y(),
                Vector3::new(0.0, 0.0, 1.0),
            ],
            edges: vec![[0, 1], [1, 2], [0, 2], [0, 3]],
            faces: vec![vec![0, 2, 5]],
        };
        let mut buf = Vec::new();
        ObjWriter.write(&mesh, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], "v 0 0 0");
        assert_eq!(lines[4], "f 1 2 3");
        assert_eq!(lines[5], "l 1 4");
    }
}
