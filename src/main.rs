use anyhow::{Context, Result};
use clap::{ArgGroup, Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use cinemood::config::Config;
use cinemood::export::write_all;
use cinemood::models::PlotInput;
use cinemood::orchestrator::Pipeline;
use cinemood::server::{serve, AppState};

/// Cinemood - emotional arc analysis of movie plots
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to config file (overrides CINEMOOD_CONFIG environment variable)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze one plot and write the artifacts to disk
    Analyze(AnalyzeArgs),
    /// Run the HTTP API
    Serve {
        /// Address to bind (default from config, "127.0.0.1:8000")
        #[arg(short, long)]
        bind: Option<String>,
    },
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("source").required(true).multiple(false)))]
struct AnalyzeArgs {
    /// Movie title to look up on Wikipedia
    #[arg(short, long, group = "source")]
    title: Option<String>,

    /// File containing the plot text
    #[arg(long, group = "source")]
    plot_file: Option<PathBuf>,

    /// Plot text given inline
    #[arg(long, group = "source")]
    text: Option<String>,

    /// Output directory for generated files (default from config, "out")
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
}

impl AnalyzeArgs {
    fn plot_input(&self) -> Result<PlotInput> {
        let text = match (&self.plot_file, &self.text) {
            (Some(path), _) => Some(
                std::fs::read_to_string(path).with_context(|| format!("Reading plot file {}", path.display()))?,
            ),
            (None, Some(text)) => Some(text.clone()),
            (None, None) => None,
        };
        let title = self.title.clone().or_else(|| {
            self.plot_file
                .as_ref()
                .and_then(|p| p.file_stem())
                .map(|s| s.to_string_lossy().into_owned())
        });
        PlotInput::from_parts(title, text).context("Nothing to analyze: title and plot text are both blank")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_line_number(true)
        .init();

    let cli = Cli::parse();
    info!("Starting cinemood v{}", env!("CARGO_PKG_VERSION"));

    let cfg = Config::load(cli.config.as_deref())?;
    debug!(
        "Config loaded - classifier={}, plot_source={}, strategy={:?}",
        cfg.classifier.endpoint, cfg.plot_source.api_base, cfg.segmenter.strategy
    );

    let pipeline = Pipeline::from_config(&cfg)?;

    match cli.command {
        Command::Analyze(args) => {
            let input = args.plot_input()?;
            let out_dir = args.output_dir.clone().unwrap_or_else(|| cfg.output.dir.clone());

            let report = pipeline.run(input).await?;
            for w in &report.warnings {
                warn!("{}", w);
            }
            let run_dir = write_all(&out_dir, &report)?;
            info!(
                "Analysis written - title={}, scenes={}, directory={}",
                report.title,
                report.result.scenes.len(),
                run_dir.display()
            );
            println!("{}", run_dir.display());
        }
        Command::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| cfg.server.bind.clone());
            serve(AppState::new(pipeline), &bind, &cfg.server.allowed_origins).await?;
        }
    }

    Ok(())
}
