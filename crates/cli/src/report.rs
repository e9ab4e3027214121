//! JSON run report: the library `Report` plus the files it was produced from.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use hexex::Report;
use serde_json::{json, Value};

use crate::io::ensure_parent_dir;

/// Report document as written to disk.
pub fn report_document(report: &Report, tet_path: &Path, hex_path: Option<&Path>) -> Result<Value> {
    let mut doc = serde_json::to_value(report).context("serializing report")?;
    if let Value::Object(map) = &mut doc {
        map.insert(
            "tet_mesh_filename".into(),
            json!(tet_path.to_string_lossy()),
        );
        map.insert(
            "hex_mesh_filename".into(),
            json!(hex_path.map(|p| p.to_string_lossy())),
        );
        map.insert("code_rev".into(), json!(code_rev()));
        map.insert("version".into(), json!(hexex::VERSION));
    }
    Ok(doc)
}

/// Pretty-print the report document to `path`.
pub fn write_report(
    path: &Path,
    report: &Report,
    tet_path: &Path,
    hex_path: Option<&Path>,
) -> Result<()> {
    ensure_parent_dir(path)?;
    let doc = report_document(report, tet_path, hex_path)?;
    fs::write(path, serde_json::to_vec_pretty(&doc)?)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Build identifier: `GIT_COMMIT` at run time, then at build time, else the
/// library version.
fn code_rev() -> String {
    std::env::var("GIT_COMMIT")
        .ok()
        .or_else(|| option_env!("GIT_COMMIT").map(str::to_string))
        .filter(|rev| !rev.is_empty())
        .unwrap_or_else(|| format!("hexex-{}", hexex::VERSION))
}
