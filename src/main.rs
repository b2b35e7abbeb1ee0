use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use zsc_eval::config::{HeatmapSettings, MissingEpisodePolicy, SweepConfig};
use zsc_eval::episode::load_episode_file;
use zsc_eval::heatmap::render_heatmap;
use zsc_eval::sweep::{read_by_agent, Sweep};

#[derive(Parser)]
#[command(name = "zsc-eval", version, about = "Aggregate multi-agent evaluation episodes against solo runs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum MissingArg {
    #[value(name = "skip")]
    Skip,
    #[value(name = "strict")]
    Strict,
}

impl From<MissingArg> for MissingEpisodePolicy {
    fn from(value: MissingArg) -> Self {
        match value {
            MissingArg::Skip => Self::Skip,
            MissingArg::Strict => Self::Strict,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run a sweep described by a JSON config
    Run {
        config: PathBuf,
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long)]
        workers: Option<usize>,
        #[arg(long, value_enum)]
        missing_episodes: Option<MissingArg>,
        #[arg(long)]
        latex: bool,
        #[arg(long)]
        heatmap: Option<PathBuf>,
        #[arg(long, default_value = "composite_success")]
        heatmap_metric: String,
    },
    /// Render a heatmap from a written summary
    Heatmap {
        summary: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[arg(long, default_value = "composite_success")]
        metric: String,
    },
    /// Print the metrics extracted from one result file
    Inspect { file: PathBuf },
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("zsc_eval=info,warn"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            output,
            workers,
            missing_episodes,
            latex,
            heatmap,
            heatmap_metric,
        } => {
            let mut sweep_config = SweepConfig::from_file(&config)
                .with_context(|| format!("loading sweep config {}", config.display()))?;
            if let Some(output) = output {
                sweep_config.output = output;
            }
            if let Some(workers) = workers {
                sweep_config.workers = workers;
            }
            if let Some(policy) = missing_episodes {
                sweep_config.missing_episodes = policy.into();
            }
            if latex {
                sweep_config.latex = true;
            }
            if let Some(path) = heatmap {
                sweep_config.heatmap = Some(HeatmapSettings {
                    path,
                    metric: heatmap_metric,
                });
            }

            let sweep = Sweep::new(sweep_config)?;
            println!("\n\nResults");
            let mut stdout = std::io::stdout().lock();
            sweep.run(&mut stdout).context("sweep failed")?;
            stdout.flush()?;
        }
        Commands::Heatmap {
            summary,
            output,
            metric,
        } => {
            let by_agent = read_by_agent(&summary)
                .with_context(|| format!("reading summary {}", summary.display()))?;
            render_heatmap(&by_agent, &metric, &output)?;
            println!("{}", output.display());
        }
        Commands::Inspect { file } => match load_episode_file(&file)? {
            Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
            None => println!("{}: no episode record", file.display()),
        },
    }
    Ok(())
}
