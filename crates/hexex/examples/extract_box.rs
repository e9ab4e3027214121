//! Extract a jittered Kuhn box and print the report as JSON.
//!
//! Usage: cargo run -p hexex --example extract_box -- [scale] [seed]

use hexex::fixtures::{jitter_world, kuhn_box};
use hexex::{extract, Config};

fn main() {
    let mut args = std::env::args().skip(1);
    let scale: i64 = args.next().and_then(|s| s.parse().ok()).unwrap_or(3);
    let seed: u64 = args.next().and_then(|s| s.parse().ok()).unwrap_or(42);

    let (mut mesh, igm) = kuhn_box([2, 2, 2]);
    jitter_world(&mut mesh, 0.05, seed);
    let cfg = Config {
        igm_scaling_factor: scale,
        extract_piecewise_linear_faces: true,
        ..Config::default()
    };
    match extract(&mesh, &igm, &cfg) {
        Ok(res) => {
            let hex = res.hex_mesh.as_ref();
            println!(
                "cells={} vertices={} world_volume={:.6}",
                hex.map_or(0, |h| h.num_cells()),
                hex.map_or(0, |h| h.num_vertices()),
                hex.map_or(0.0, |h| h.total_volume()),
            );
            match serde_json::to_string_pretty(&res.report) {
                Ok(s) => println!("{s}"),
                Err(e) => eprintln!("report serialization failed: {e}"),
            }
        }
        Err(e) => eprintln!("extraction failed: {e}"),
    }
}
