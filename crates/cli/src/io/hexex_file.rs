//! `.hexex` text container: tet mesh plus per-cell parametrization.
//!
//! Layout (whitespace separated, line breaks insignificant):
//! - vertex count, then `x y z` per vertex;
//! - tet count, then per tet 4 vertex ids followed by the 4 corner
//!   parameters `u v w` in the same corner order.

use std::io::BufRead;

use anyhow::{anyhow, bail, Context, Result};
use hexex::{Parametrization, TetMesh};
use nalgebra::Vector3;

use super::MeshReader;

pub struct HexexReader;

struct Tokens<'a> {
    iter: std::str::SplitWhitespace<'a>,
    consumed: usize,
}

impl<'a> Tokens<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            iter: text.split_whitespace(),
            consumed: 0,
        }
    }

    fn next<T>(&mut self, what: &str) -> Result<T>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        let tok = self
            .iter
            .next()
            .ok_or_else(|| anyhow!("unexpected end of file while reading {what}"))?;
        self.consumed += 1;
        tok.parse::<T>()
            .map_err(|e| anyhow!("token {} ('{tok}') for {what}: {e}", self.consumed))
    }

    fn vector(&mut self, what: &str) -> Result<Vector3<f64>> {
        Ok(Vector3::new(
            self.next(what)?,
            self.next(what)?,
            self.next(what)?,
        ))
    }
}

impl MeshReader for HexexReader {
    fn read(&self, input: &mut dyn BufRead) -> Result<(TetMesh, Parametrization)> {
        let mut text = String::new();
        input
            .read_to_string(&mut text)
            .context("reading .hexex text")?;
        let mut tok = Tokens::new(&text);

        let nv: usize = tok.next("vertex count")?;
        let mut vertices = Vec::with_capacity(nv);
        for i in 0..nv {
            vertices.push(tok.vector(&format!("vertex {i}"))?);
        }

        let nt: usize = tok.next("tet count")?;
        let mut cells = Vec::with_capacity(nt);
        let mut corners = Vec::with_capacity(nt);
        for t in 0..nt {
            let what = format!("tet {t}");
            let mut cell = [0usize; 4];
            for v in &mut cell {
                *v = tok.next(&what)?;
            }
            let mut params = [Vector3::zeros(); 4];
            for p in &mut params {
                *p = tok.vector(&what)?;
            }
            cells.push(cell);
            corners.push(params);
        }
        if let Some(extra) = tok.iter.next() {
            bail!("trailing data after {nt} tets: '{extra}'");
        }
        Ok((TetMesh::new(vertices, cells), Parametrization::new(corners)))
    }
}

/// Serialize in the `.hexex` layout (used to build test inputs).
#[cfg(test)]
pub(crate) fn write_hexex(
    mesh: &TetMesh,
    igm: &Parametrization,
    out: &mut dyn std::io::Write,
) -> std::io::Result<()> {
    writeln!(out, "{}", mesh.vertices.len())?;
    for v in &mesh.vertices {
        writeln!(out, "{} {} {}", v.x, v.y, v.z)?;
    }
    writeln!(out, "{}", mesh.cells.len())?;
    for (cell, params) in mesh.cells.iter().zip(&igm.corners) {
        write!(out, "{} {} {} {}", cell[0], cell[1], cell[2], cell[3])?;
        for p in params {
            write!(out, " {} {} {}", p.x, p.y, p.z)?;
        }
        writeln!(out)?;
    }
    Ok(())
}
