//! OpenVolumeMesh ASCII (`.ovm`): tet mesh input, hex and piecewise-linear output.
//!
//! Faces are written as half-edge loops (`2e` walks edge `e` as stored,
//! `2e + 1` against it). Polyhedra list half-faces the same way, each
//! oriented outward from its cell.
//!
//! Input tets carry their parametrization in the polyhedron property
//! [`IGM_PROPERTY`] of type `igm`: one line per cell holding four
//! `vertex u v w` groups. That order is the cell's corner order.

use std::collections::HashMap;
use std::io::{BufRead, Write};

use anyhow::{anyhow, bail, Context, Result};
use hexex::lattice::HEX_FACES;
use hexex::{HexMesh, Parametrization, PiecewiseLinearMesh, TetMesh};
use nalgebra::Vector3;

use super::{MeshReader, MeshWriter};

/// Polyhedron property holding the per-cell parametrization.
pub const IGM_PROPERTY: &str = "HexHex::Parametrization";

pub struct OvmWriter;

pub struct OvmReader;

/// Non-empty, non-comment lines with their 1-based line numbers.
struct Lines<'a> {
    iter: std::iter::Enumerate<std::str::Lines<'a>>,
    line: usize,
}

impl<'a> Lines<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            iter: text.lines().enumerate(),
            line: 0,
        }
    }

    fn try_next(&mut self) -> Option<&'a str> {
        for (i, l) in self.iter.by_ref() {
            let l = l.trim();
            if l.is_empty() || l.starts_with('#') {
                continue;
            }
            self.line = i + 1;
            return Some(l);
        }
        None
    }

    fn next(&mut self, what: &str) -> Result<&'a str> {
        self.try_next()
            .ok_or_else(|| anyhow!("unexpected end of file while reading {what}"))
    }

    fn keyword(&mut self, word: &str) -> Result<()> {
        let l = self.next(word)?;
        if !l.eq_ignore_ascii_case(word) {
            bail!("line {}: expected '{word}', found '{l}'", self.line);
        }
        Ok(())
    }

    fn numbers<T>(&mut self, what: &str) -> Result<Vec<T>>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        let l = self.next(what)?;
        l.split_whitespace()
            .map(|tok| {
                tok.parse::<T>()
                    .map_err(|e| anyhow!("line {} ('{tok}') for {what}: {e}", self.line))
            })
            .collect()
    }

    /// A section keyword followed by its entity count.
    fn section(&mut self, word: &str) -> Result<usize> {
        self.keyword(word)?;
        match self.numbers::<usize>(word)?.as_slice() {
            [n] => Ok(*n),
            other => bail!("line {}: expected one {word} count, found {other:?}", self.line),
        }
    }
}

fn check_ids(ids: &[usize], bound: usize, what: &str, line: usize) -> Result<()> {
    if let Some(id) = ids.iter().find(|&&id| id >= bound) {
        bail!("line {line}: {what} references {id}, only {bound} exist");
    }
    Ok(())
}

impl MeshReader for OvmReader {
    fn read(&self, input: &mut dyn BufRead) -> Result<(TetMesh, Parametrization)> {
        let mut text = String::new();
        input
            .read_to_string(&mut text)
            .context("reading .ovm text")?;
        let mut lines = Lines::new(&text);
        lines.keyword("OVM ASCII")?;

        let nv = lines.section("Vertices")?;
        let mut vertices = Vec::with_capacity(nv);
        for i in 0..nv {
            match lines.numbers::<f64>(&format!("vertex {i}"))?.as_slice() {
                [x, y, z] => vertices.push(Vector3::new(*x, *y, *z)),
                _ => bail!("line {}: vertex {i} needs three coordinates", lines.line),
            }
        }

        let ne = lines.section("Edges")?;
        let mut edges = Vec::with_capacity(ne);
        for i in 0..ne {
            let what = format!("edge {i}");
            match lines.numbers::<usize>(&what)?.as_slice() {
                &[a, b] => {
                    check_ids(&[a, b], nv, &what, lines.line)?;
                    edges.push([a, b]);
                }
                _ => bail!("line {}: {what} needs two vertices", lines.line),
            }
        }

        let nf = lines.section("Faces")?;
        let mut faces: Vec<Vec<usize>> = Vec::with_capacity(nf);
        for i in 0..nf {
            let what = format!("face {i}");
            let ids = lines.numbers::<usize>(&what)?;
            let (&k, hes) = ids
                .split_first()
                .ok_or_else(|| anyhow!("line {}: empty {what}", lines.line))?;
            if hes.len() != k {
                bail!("line {}: {what} announces {k} half-edges, lists {}", lines.line, hes.len());
            }
            check_ids(hes, 2 * ne, &what, lines.line)?;
            faces.push(hes.iter().map(|&he| edges[he / 2][he % 2]).collect());
        }

        let nc = lines.section("Polyhedra")?;
        let mut cell_sets = Vec::with_capacity(nc);
        for i in 0..nc {
            let what = format!("polyhedron {i}");
            let ids = lines.numbers::<usize>(&what)?;
            let (&k, hfs) = ids
                .split_first()
                .ok_or_else(|| anyhow!("line {}: empty {what}", lines.line))?;
            if hfs.len() != k {
                bail!("line {}: {what} announces {k} half-faces, lists {}", lines.line, hfs.len());
            }
            check_ids(hfs, 2 * nf, &what, lines.line)?;
            let mut set: Vec<usize> = hfs.iter().flat_map(|&hf| faces[hf / 2].iter().copied()).collect();
            set.sort_unstable();
            set.dedup();
            match set.as_slice() {
                &[a, b, c, d] if k == 4 => cell_sets.push([a, b, c, d]),
                _ => bail!("line {}: {what} is not a tetrahedron", lines.line),
            }
        }

        let mut parametrized = None;
        while let Some(header) = lines.try_next() {
            let (kind, name) = header
                .split_once(char::is_whitespace)
                .map(|(k, n)| (k, n.trim().trim_matches('"')))
                .ok_or_else(|| anyhow!("line {}: malformed property header '{header}'", lines.line))?;
            let entities = match kind {
                "Vertex_Property" => nv,
                "Edge_Property" => ne,
                "HalfEdge_Property" => 2 * ne,
                "Face_Property" => nf,
                "HalfFace_Property" => 2 * nf,
                "Polyhedron_Property" => nc,
                "Mesh_Property" => 1,
                other => bail!("line {}: unknown property kind '{other}'", lines.line),
            };
            let ty = lines.next(name)?;
            if kind == "Polyhedron_Property" && name == IGM_PROPERTY {
                if ty != "igm" {
                    bail!("line {}: property '{name}' has type '{ty}', expected 'igm'", lines.line);
                }
                parametrized = Some(read_igm(&mut lines, &cell_sets)?);
            } else {
                for _ in 0..entities {
                    lines.next(name)?;
                }
            }
        }
        let (cells, corners) = parametrized
            .ok_or_else(|| anyhow!("missing polyhedron property '{IGM_PROPERTY}'"))?;
        Ok((TetMesh::new(vertices, cells), Parametrization::new(corners)))
    }
}

type CellsAndCorners = (Vec<[usize; 4]>, Vec<[Vector3<f64>; 4]>);

fn read_igm(lines: &mut Lines<'_>, cell_sets: &[[usize; 4]]) -> Result<CellsAndCorners> {
    let mut cells = Vec::with_capacity(cell_sets.len());
    let mut corners = Vec::with_capacity(cell_sets.len());
    for (i, set) in cell_sets.iter().enumerate() {
        let what = format!("parametrization of polyhedron {i}");
        let vals = lines.numbers::<f64>(&what)?;
        if vals.len() != 16 {
            bail!("line {}: {what} needs 16 values, found {}", lines.line, vals.len());
        }
        let mut cell = [0usize; 4];
        let mut params = [Vector3::zeros(); 4];
        for k in 0..4 {
            let id = vals[4 * k];
            if id < 0.0 || id.fract() != 0.0 {
                bail!("line {}: {what}: '{id}' is not a vertex id", lines.line);
            }
            cell[k] = id as usize;
            params[k] = Vector3::new(vals[4 * k + 1], vals[4 * k + 2], vals[4 * k + 3]);
        }
        let mut sorted = cell;
        sorted.sort_unstable();
        if sorted != *set {
            bail!("line {}: {what} names vertices {cell:?}, the polyhedron has {set:?}", lines.line);
        }
        cells.push(cell);
        corners.push(params);
    }
    Ok((cells, corners))
}

/// Serialize a parametrized tet mesh as `.ovm` (used to build test inputs).
#[cfg(test)]
pub(crate) fn write_tet_ovm(mesh: &TetMesh, igm: &Parametrization, out: &mut dyn Write) -> Result<()> {
    use std::collections::BTreeMap;

    let mut edges: BTreeMap<[usize; 2], usize> = BTreeMap::new();
    let mut faces: BTreeMap<[usize; 3], usize> = BTreeMap::new();
    for cell in &mesh.cells {
        for skip in 0..4 {
            let mut tri = [cell[(skip + 1) % 4], cell[(skip + 2) % 4], cell[(skip + 3) % 4]];
            tri.sort_unstable();
            let n = faces.len();
            faces.entry(tri).or_insert(n);
            for (a, b) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[0], tri[2])] {
                let n = edges.len();
                edges.entry([a, b]).or_insert(n);
            }
        }
    }
    let mut edge_list = vec![[0, 0]; edges.len()];
    for (&e, &i) in &edges {
        edge_list[i] = e;
    }
    let mut face_list = vec![Vec::new(); faces.len()];
    for (&[a, b, c], &i) in &faces {
        face_list[i] = [(a, b), (b, c), (c, a)]
            .iter()
            .map(|&(p, q)| match edges.get(&[p.min(q), p.max(q)]) {
                Some(&e) if p < q => 2 * e,
                Some(&e) => 2 * e + 1,
                None => unreachable!("every face side was registered"),
            })
            .collect();
    }

    write_vertices(out, &mesh.vertices)?;
    write_edges(out, &edge_list)?;
    write_faces(out, &face_list)?;
    writeln!(out, "Polyhedra")?;
    writeln!(out, "{}", mesh.num_cells())?;
    for cell in &mesh.cells {
        write!(out, "4")?;
        for skip in 0..4 {
            let mut tri = [cell[(skip + 1) % 4], cell[(skip + 2) % 4], cell[(skip + 3) % 4]];
            tri.sort_unstable();
            write!(out, " {}", 2 * faces[&tri])?;
        }
        writeln!(out)?;
    }
    writeln!(out, "Polyhedron_Property \"{IGM_PROPERTY}\"")?;
    writeln!(out, "igm")?;
    for (cell, params) in mesh.cells.iter().zip(&igm.corners) {
        let groups: Vec<String> = cell
            .iter()
            .zip(params)
            .map(|(v, p)| format!("{v} {} {} {}", p.x, p.y, p.z))
            .collect();
        writeln!(out, "{}", groups.join(" "))?;
    }
    Ok(())
}

fn write_vertices(out: &mut dyn Write, vertices: &[Vector3<f64>]) -> Result<()> {
    writeln!(out, "OVM ASCII")?;
    writeln!(out, "Vertices")?;
    writeln!(out, "{}", vertices.len())?;
    for v in vertices {
        writeln!(out, "{} {} {}", v.x, v.y, v.z)?;
    }
    Ok(())
}

fn write_edges(out: &mut dyn Write, edges: &[[usize; 2]]) -> Result<()> {
    writeln!(out, "Edges")?;
    writeln!(out, "{}", edges.len())?;
    for [a, b] in edges {
        writeln!(out, "{a} {b}")?;
    }
    Ok(())
}

fn write_faces(out: &mut dyn Write, faces: &[Vec<usize>]) -> Result<()> {
    writeln!(out, "Faces")?;
    writeln!(out, "{}", faces.len())?;
    for f in faces {
        write!(out, "{}", f.len())?;
        for he in f {
            write!(out, " {he}")?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Whether `a` is a cyclic rotation of `b`.
fn same_cycle(a: &[usize; 4], b: &[usize; 4]) -> bool {
    (0..4).any(|r| (0..4).all(|i| a[(i + r) % 4] == b[i]))
}

fn sorted4(mut v: [usize; 4]) -> [usize; 4] {
    v.sort_unstable();
    v
}

impl MeshWriter<HexMesh> for OvmWriter {
    fn write(&self, mesh: &HexMesh, out: &mut dyn Write) -> Result<()> {
        let edges: Vec<[usize; 2]> = mesh.edges.iter().map(|e| e.vertices).collect();
        let edge_index: HashMap<[usize; 2], usize> =
            edges.iter().enumerate().map(|(i, &e)| (e, i)).collect();
        let halfedge = |a: usize, b: usize| -> Result<usize> {
            let key = [a.min(b), a.max(b)];
            let e = edge_index
                .get(&key)
                .ok_or_else(|| anyhow!("face side {a}-{b} is not a mesh edge"))?;
            Ok(if edges[*e] == [a, b] { 2 * e } else { 2 * e + 1 })
        };
        let faces = mesh
            .faces
            .iter()
            .map(|f| {
                let v = f.vertices;
                (0..4).map(|i| halfedge(v[i], v[(i + 1) % 4])).collect()
            })
            .collect::<Result<Vec<Vec<usize>>>>()?;

        let face_index: HashMap<[usize; 4], usize> = mesh
            .faces
            .iter()
            .enumerate()
            .map(|(i, f)| (sorted4(f.vertices), i))
            .collect();

        write_vertices(out, &mesh.vertices)?;
        write_edges(out, &edges)?;
        write_faces(out, &faces)?;
        writeln!(out, "Polyhedra")?;
        writeln!(out, "{}", mesh.num_cells())?;
        for cell in &mesh.cells {
            write!(out, "6")?;
            for local in HEX_FACES {
                let quad = local.map(|k| cell[k]);
                let f = face_index
                    .get(&sorted4(quad))
                    .ok_or_else(|| anyhow!("cell face {quad:?} is not a mesh face"))?;
                let hf = if same_cycle(&mesh.faces[*f].vertices, &quad) {
                    2 * f
                } else {
                    2 * f + 1
                };
                write!(out, " {hf}")?;
            }
            writeln!(out)?;
        }
        Ok(())
    }
}

impl MeshWriter<PiecewiseLinearMesh> for OvmWriter {
    fn write(&self, mesh: &PiecewiseLinearMesh, out: &mut dyn Write) -> Result<()> {
        write_vertices(out, &mesh.points)?;
        write_edges(out, &mesh.edges)?;
        write_faces(out, &mesh.faces)?;
        writeln!(out, "Polyhedra")?;
        writeln!(out, "0")?;
        Ok(())
    }
}
