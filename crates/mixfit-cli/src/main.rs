//! mixfit CLI — fit Gaussian mixture models to 2D point sets with the EM
//! algorithm.

mod data;

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use mixfit_core::{fit, DegenerateRowPolicy, FitConfig, FitSummary};
use nalgebra::DMatrix;
use rand::{rngs::StdRng, SeedableRng};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "mixfit")]
#[command(about = "Fit Gaussian mixture models to 2D point sets with the EM algorithm")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate noisy points on a circle and write them as JSON.
    Gen(GenArgs),

    /// Fit a mixture to points read from a JSON file.
    Fit(FitArgs),

    /// Generate the reference dataset and fit it in one go.
    Demo(DemoArgs),
}

#[derive(Debug, Clone, Args)]
struct GenArgs {
    #[command(flatten)]
    gen: GenParams,

    /// Path to write the points (JSON array of [x, y] pairs).
    #[arg(long)]
    out: PathBuf,
}

#[derive(Debug, Clone, Args)]
struct FitArgs {
    /// Path to the input points (JSON array of [x, y] pairs).
    #[arg(long)]
    points: PathBuf,

    /// Number of mixture components.
    #[arg(long, default_value = "2")]
    clusters: usize,

    #[command(flatten)]
    em: EmArgs,

    /// Path to write the fit report (JSON); stdout if omitted.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct DemoArgs {
    #[command(flatten)]
    gen: GenParams,

    /// Number of mixture components.
    #[arg(long, default_value = "2")]
    clusters: usize,

    #[command(flatten)]
    em: EmArgs,
}

/// Generation knobs shared between `gen` and `demo`.
#[derive(Debug, Clone, Args)]
struct GenParams {
    /// Circle radius.
    #[arg(long, default_value = "2.0")]
    radius: f64,

    /// Number of points to sample.
    #[arg(long, default_value = "1000")]
    num_points: usize,

    /// Standard deviation of the per-axis Gaussian noise.
    #[arg(long, default_value = "0.3")]
    noise_std: f64,

    /// Seed for the data generator.
    #[arg(long, default_value = "0")]
    data_seed: u64,
}

/// EM configuration flags mirroring [`FitConfig`].
#[derive(Debug, Clone, Args)]
struct EmArgs {
    /// Cap on E/M iterations.
    #[arg(long, default_value = "100")]
    max_iterations: usize,

    /// Per-parameter convergence tolerance.
    #[arg(long, default_value = "1e-3")]
    tolerance: f64,

    /// Diagonal epsilon guarding covariance invertibility.
    #[arg(long, default_value = "1e-6")]
    variance_floor: f64,

    /// Fail on responsibility rows with vanishing mass instead of
    /// substituting the uniform distribution.
    #[arg(long)]
    strict_rows: bool,

    /// Seed for parameter initialization.
    #[arg(long, default_value = "0")]
    seed: u64,
}

impl EmArgs {
    fn to_config(&self) -> FitConfig {
        FitConfig {
            max_iterations: self.max_iterations,
            tolerance: self.tolerance,
            variance_floor: self.variance_floor,
            degenerate_row_policy: if self.strict_rows {
                DegenerateRowPolicy::Fail
            } else {
                DegenerateRowPolicy::Uniform
            },
            seed: self.seed,
        }
    }
}

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> CliResult<()> {
    match Cli::parse().command {
        Commands::Gen(args) => cmd_gen(&args),
        Commands::Fit(args) => cmd_fit(&args),
        Commands::Demo(args) => cmd_demo(&args),
    }
}

fn cmd_gen(args: &GenArgs) -> CliResult<()> {
    let mut rng = StdRng::seed_from_u64(args.gen.data_seed);
    let points = data::circle_points(
        args.gen.radius,
        args.gen.num_points,
        args.gen.noise_std,
        &mut rng,
    );

    write_points(&args.out, &points)?;
    eprintln!("wrote {} points to {}", points.nrows(), args.out.display());
    Ok(())
}

fn cmd_fit(args: &FitArgs) -> CliResult<()> {
    let points = read_points(&args.points)?;
    let report = fit(&points, args.clusters, &args.em.to_config())?;
    let summary = FitSummary::from(&report);

    match &args.out {
        Some(path) => {
            let file = File::create(path)?;
            serde_json::to_writer_pretty(BufWriter::new(file), &summary)?;
            eprintln!(
                "{} after {} iterations, report written to {}",
                termination_label(&summary),
                summary.iterations,
                path.display()
            );
        }
        None => println!("{}", serde_json::to_string_pretty(&summary)?),
    }
    Ok(())
}

fn cmd_demo(args: &DemoArgs) -> CliResult<()> {
    let mut rng = StdRng::seed_from_u64(args.gen.data_seed);
    let points = data::circle_points(
        args.gen.radius,
        args.gen.num_points,
        args.gen.noise_std,
        &mut rng,
    );

    let report = fit(&points, args.clusters, &args.em.to_config())?;
    let summary = FitSummary::from(&report);
    eprintln!(
        "{} after {} iterations",
        termination_label(&summary),
        summary.iterations
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn termination_label(summary: &FitSummary) -> &'static str {
    if summary.converged {
        "converged"
    } else {
        "iteration budget exhausted"
    }
}

fn write_points(path: &PathBuf, points: &DMatrix<f64>) -> CliResult<()> {
    let pairs: Vec<[f64; 2]> = (0..points.nrows())
        .map(|i| [points[(i, 0)], points[(i, 1)]])
        .collect();
    let file = File::create(path)?;
    serde_json::to_writer(BufWriter::new(file), &pairs)?;
    Ok(())
}

fn read_points(path: &PathBuf) -> CliResult<DMatrix<f64>> {
    let file = File::open(path)?;
    let pairs: Vec<[f64; 2]> = serde_json::from_reader(BufReader::new(file))?;
    if pairs.is_empty() {
        return Err(format!("no points in {}", path.display()).into());
    }
    let rows: Vec<f64> = pairs.iter().flat_map(|p| p.iter().copied()).collect();
    Ok(DMatrix::from_row_slice(pairs.len(), 2, &rows))
}
