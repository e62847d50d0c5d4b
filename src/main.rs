use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use tracing::{info, warn};

use zeta_stats::config::{AnalysisConfig, DEFAULT_CONFIG_FILE};
use zeta_stats::pipeline::{self, Stage};
use zeta_stats::report;

#[derive(Parser)]
#[command(name = "zeta-stats")]
#[command(author, version, about = "Statistical analysis of Riemann zeta zeros")]
#[command(propagate_version = true)]
struct Cli {
    /// TOML configuration file [default: ./zeta-stats.toml when present]
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Zero dataset (one γ or `index γ` per line)
    #[arg(short, long, global = true)]
    data: Option<PathBuf>,

    /// Directory for the text and JSON reports
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Base seed of the Monte Carlo experiments
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Trials per Monte Carlo experiment (per level for perturbations)
    #[arg(long, global = true)]
    simulations: Option<usize>,

    /// Number of highest zeros used by the Monte Carlo experiments
    #[arg(long, global = true)]
    sample_size: Option<usize>,

    /// Print the JSON report instead of the text report
    #[arg(long, global = true)]
    json: bool,

    /// Abort on the first malformed dataset row
    #[arg(long, global = true)]
    strict: bool,

    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Descriptive statistics of the heights and gaps
    Describe,
    /// Counting function, region spacing and density comparisons
    Weyl,
    /// Unfolded spacing distribution and pair correlation
    Spacing,
    /// Resonance scan of the physical and control constants
    Scan,
    /// Negative control with random log-uniform constants
    MonteCarlo,
    /// Robustness of the observed patterns under perturbed constants
    Perturb,
    /// Every stage
    All,
}

impl Commands {
    fn stages(self) -> Vec<Stage> {
        match self {
            Commands::Describe => vec![Stage::Describe],
            Commands::Weyl => vec![Stage::Weyl],
            Commands::Spacing => vec![Stage::Spacing],
            Commands::Scan => vec![Stage::Scan],
            Commands::MonteCarlo => vec![Stage::NegativeControl],
            Commands::Perturb => vec![Stage::Perturbation],
            Commands::All => Stage::ALL.to_vec(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = AnalysisConfig::resolve(cli.config.as_deref(), DEFAULT_CONFIG_FILE)?;
    apply_overrides(&mut config, &cli);
    config.validate().context("Invalid settings after command-line overrides")?;

    let (dataset, load) = pipeline::load_dataset(&config.data)
        .with_context(|| format!("Failed to load dataset: {}", config.data.path.display()))?;
    if !load.malformed.is_empty() {
        warn!(rows = load.malformed.len(), "malformed rows were skipped");
    }

    let mut report = pipeline::analyse(&dataset, &config, &cli.command.stages())
        .context("Analysis aborted")?;
    report.source = Some(config.data.path.display().to_string());
    report.load = Some(load);

    let paths = report::write_reports(&report, &config.output.dir)
        .with_context(|| format!("Failed to write reports to {}", config.output.dir.display()))?;

    if config.output.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report::render_text(&report));
    }
    info!(text = %paths.text.display(), json = %paths.json.display(), "done");
    Ok(())
}

fn apply_overrides(config: &mut AnalysisConfig, cli: &Cli) {
    if let Some(path) = &cli.data {
        config.data.path = path.clone();
    }
    if let Some(dir) = &cli.output {
        config.output.dir = dir.clone();
    }
    if let Some(seed) = cli.seed {
        config.set_seed(seed);
    }
    if let Some(n) = cli.simulations {
        config.set_simulations(n);
    }
    if let Some(n) = cli.sample_size {
        config.set_sample_size(n);
    }
    if cli.json {
        config.output.json = true;
    }
    if cli.strict {
        config.data.strict = true;
    }
}

/// Initialise the `tracing` subscriber on stderr.
fn init_logging(verbose: u8) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_level = match verbose {
        0 => "zeta_stats=info",
        1 => "zeta_stats=debug",
        _ => "zeta_stats=trace",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let json_logging = std::env::var("ZETA_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }
}
