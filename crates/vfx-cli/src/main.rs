//! vfx - exponent transform shader tool
//!
//! Generates WGSL for exponent transforms and checks shader output against
//! the CPU reference.

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use vfx_gpu::{Backend, NumericBackend};
use vfx_ops::NegativeStyle;

mod commands;

#[derive(Parser)]
#[command(name = "vfx")]
#[command(author, version, about = "Exponent transform shader generation and GPU parity checks")]
#[command(long_about = "
Generates GPU shaders for OCIO-style exponent transforms and verifies that
they match the CPU reference.

Examples:
  vfx parity                                  # Builtin matrix, best backend
  vfx parity --backend software --numeric fast-pow
  vfx parity --matrix cases.yaml --filter inverse --json
  vfx shader --gamma 2.2                      # Modern WGSL
  vfx shader --gamma 2.4 --offset 0.055 --inverse
  vfx shader --gamma 2.6,1.0,1.8,1.1 --schema-version 1 --legacy 32
  vfx matrix -o cases.yaml                    # Dump builtin matrix
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Number of threads (0 = auto)
    #[arg(short = 'j', long, global = true, default_value = "0")]
    threads: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the parity matrix
    #[command(visible_alias = "p")]
    Parity(ParityArgs),

    /// Print generated WGSL for an exponent transform
    #[command(visible_alias = "s")]
    Shader(ShaderArgs),

    /// Print the builtin matrix as YAML
    Matrix(MatrixArgs),
}

#[derive(Args)]
struct ParityArgs {
    /// YAML matrix file (builtin matrix if omitted)
    #[arg(short, long)]
    matrix: Option<PathBuf>,

    /// Executor: auto, software, wgpu
    #[arg(short, long, default_value = "auto")]
    backend: Backend,

    /// Software pow flavour: ieee, native-gpu, fast-pow
    #[arg(short, long, default_value = "ieee")]
    numeric: NumericBackend,

    /// Only run cases whose name contains this
    #[arg(short, long)]
    filter: Option<String>,

    /// Divergences reported per failing case
    #[arg(long, default_value = "8")]
    budget: usize,

    /// Machine-readable output (JSON)
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum StyleArg {
    Clamp,
    Mirror,
    PassThru,
    Linear,
}

impl From<StyleArg> for NegativeStyle {
    fn from(style: StyleArg) -> Self {
        match style {
            StyleArg::Clamp => NegativeStyle::Clamp,
            StyleArg::Mirror => NegativeStyle::Mirror,
            StyleArg::PassThru => NegativeStyle::PassThru,
            StyleArg::Linear => NegativeStyle::Linear,
        }
    }
}

#[derive(Args)]
struct ShaderArgs {
    /// Exponents: one value (RGB), three (RGB) or four (RGBA)
    #[arg(short, long, required = true, value_delimiter = ',')]
    gamma: Vec<f64>,

    /// Linear segment offsets, same layout as --gamma
    #[arg(short, long, value_delimiter = ',')]
    offset: Option<Vec<f64>>,

    /// Negative handling (default: clamp, or linear with --offset)
    #[arg(short, long, value_enum)]
    style: Option<StyleArg>,

    /// Generate the inverse transform
    #[arg(short, long)]
    inverse: bool,

    /// Config schema major version
    #[arg(long = "schema-version", default_value = "2")]
    schema_version: u32,

    /// Bake to a lattice with this many samples per axis
    #[arg(long)]
    legacy: Option<usize>,

    /// Name of the generated transform function
    #[arg(long)]
    function_name: Option<String>,
}

#[derive(Args)]
struct MatrixArgs {
    /// Write to file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // Configure thread pool
    if cli.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
            .context("Failed to configure thread pool")?;
    }

    match cli.command {
        Commands::Parity(args) => commands::parity::run(args, cli.verbose),
        Commands::Shader(args) => commands::shader::run(args, cli.verbose),
        Commands::Matrix(args) => commands::matrix::run(args),
    }
}
