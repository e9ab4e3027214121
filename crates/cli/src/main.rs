//! `hexex`: extract a hex mesh from a parametrized tet mesh.

mod io;
mod report;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use hexex::{extract, Config, ExtractionResult};
use tracing::{error, info, warn};
use tracing_subscriber::fmt::SubscriberBuilder;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "hexex")]
#[command(version, about = "Hexahedral mesh extraction from integer-grid maps")]
struct Args {
    /// Parametrized tet mesh (.hexex or .ovm)
    #[arg(short = 'i', long = "in")]
    input: PathBuf,
    /// Hex mesh output (.mesh or .ovm)
    #[arg(short = 'o', long = "out-hex")]
    out_hex: PathBuf,
    /// Piecewise-linear output (.ovm or .obj); enables face and edge tracing
    #[arg(long)]
    out_pwl: Option<PathBuf>,
    /// JSON report output
    #[arg(long)]
    report: Option<PathBuf>,
    /// JSON config file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,
    /// Parametrization scaling factor
    #[arg(long, value_parser = clap::value_parser!(i64).range(1..))]
    scale: Option<i64>,
    /// Worker threads; zero or negative uses all cores
    #[arg(long, allow_negative_numbers = true)]
    nthreads: Option<i64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Outcome {
    Success,
    InvalidInput,
    NoHexMesh,
    PwlFailed,
}

impl Outcome {
    fn code(self) -> u8 {
        match self {
            Outcome::Success => 0,
            Outcome::InvalidInput => 1,
            Outcome::NoHexMesh => 2,
            Outcome::PwlFailed => 3,
        }
    }
}

/// Defaults < config file < flags.
fn resolve_config(args: &Args) -> Result<Config> {
    let mut cfg = match &args.config {
        Some(path) => Config::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(scale) = args.scale {
        cfg.igm_scaling_factor = scale;
    }
    if let Some(n) = args.nthreads {
        cfg.num_threads = n;
    }
    if args.out_pwl.is_some() {
        cfg.extract_piecewise_linear_faces = true;
        cfg.extract_piecewise_linear_edges = true;
    }
    cfg.validate()?;
    Ok(cfg)
}

fn write_results(args: &Args, res: &ExtractionResult) -> Result<Outcome> {
    let hex_writer = io::hex_writer_for(&args.out_hex)?;
    let pwl_writer = args.out_pwl.as_deref().map(io::pwl_writer_for).transpose()?;

    let mut outcome = Outcome::Success;
    let hex_written = match &res.hex_mesh {
        Some(hex) => {
            io::write_output(&args.out_hex, hex_writer.as_ref(), hex)?;
            info!(path = %args.out_hex.display(), cells = hex.num_cells(), "hex mesh written");
            true
        }
        None => {
            error!(reason = ?res.report.failure, "hex extraction failed");
            outcome = Outcome::NoHexMesh;
            false
        }
    };

    if let (Some(path), Some(writer)) = (&args.out_pwl, pwl_writer) {
        match &res.piecewise_linear_mesh {
            Some(pwl) => {
                io::write_output(path, writer.as_ref(), pwl)?;
                info!(path = %path.display(), faces = pwl.faces.len(), "piecewise-linear mesh written");
            }
            None => {
                error!("piecewise-linear extraction failed");
                if outcome == Outcome::Success {
                    outcome = Outcome::PwlFailed;
                }
            }
        }
    }

    if let Some(path) = &args.report {
        let hex_path = hex_written.then_some(args.out_hex.as_path());
        report::write_report(path, &res.report, &args.input, hex_path)?;
        info!(path = %path.display(), "report written");
    }
    Ok(outcome)
}

fn run(args: &Args) -> Result<Outcome> {
    let cfg = resolve_config(args)?;
    // Fail on unsupported output formats before the expensive part.
    io::hex_writer_for(&args.out_hex)?;
    if let Some(path) = &args.out_pwl {
        io::pwl_writer_for(path)?;
    }

    let (mesh, igm) = io::read_input(&args.input)?;
    info!(
        path = %args.input.display(),
        vertices = mesh.vertices.len(),
        tets = mesh.num_cells(),
        "tet mesh loaded"
    );
    let res = extract(&mesh, &igm, &cfg)?;
    if res.report.topology_anomalies() > 0 {
        warn!(
            anomalies = res.report.topology_anomalies(),
            "hex mesh has topology anomalies"
        );
    }
    write_results(args, &res)
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    SubscriberBuilder::default()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    init_logging();
    let args = Args::parse();
    match run(&args) {
        Ok(outcome) => ExitCode::from(outcome.code()),
        Err(e) => {
            error!("{e:#}");
            ExitCode::from(Outcome::InvalidInput.code())
        }
    }
}
