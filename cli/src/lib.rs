use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

use slide_common::{GenerationRequest, OutputMode, ProjectId, SlideConfig};
use slide_core::{
    DemoBackend, ErrorReporter, GenerationOrchestrator, OrchestratorConfig, ProjectSnapshot,
};
use slide_protocol::{Event, JobStatus};

#[derive(Parser)]
#[command(name = "slide")]
#[command(about = "AI-assisted slide deck and poster generation")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,

    /// Config file (defaults to <config dir>/slide/config.json)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the simulated build latency in milliseconds
    #[arg(long)]
    pub build_delay_ms: Option<u64>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Open the workspace
    Interactive {
        /// Prompt to submit as soon as the workspace opens
        #[arg(short, long)]
        prompt: Option<String>,
        /// Output mode: deck | poster
        #[arg(short, long)]
        mode: Option<OutputMode>,
    },
    /// Generate without the workspace and print the result
    Generate {
        /// What the presentation is about
        prompt: String,
        /// Output mode: deck | poster
        #[arg(short, long)]
        mode: Option<OutputMode>,
        /// Print the final project state as JSON
        #[arg(long)]
        json: bool,
    },
}

pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli).await?;

    match cli.command {
        Some(Commands::Interactive { prompt, mode }) => {
            init_tracing(cli.debug, Some(&config.log_path))?;
            let initial = prompt.map(|p| GenerationRequest::new(p, mode.unwrap_or(config.default_mode)));
            slide_tui::run_interactive(&config, initial).await?;
        }
        Some(Commands::Generate { prompt, mode, json }) => {
            init_tracing(cli.debug, None)?;
            let mode = mode.unwrap_or(config.default_mode);
            generate(&config, &prompt, mode, json).await?;
        }
        None => {
            // Default to interactive mode
            init_tracing(cli.debug, Some(&config.log_path))?;
            slide_tui::run_interactive(&config, None).await?;
        }
    }

    Ok(())
}

async fn load_config(cli: &Cli) -> Result<SlideConfig> {
    let config = match &cli.config {
        Some(path) => SlideConfig::load_from(path).await?,
        None => SlideConfig::load().await?,
    };
    let mut config = config.apply_env()?;
    if let Some(ms) = cli.build_delay_ms {
        config.build_delay_ms = ms;
    }
    Ok(config)
}

fn init_tracing(debug: bool, log_file: Option<&Path>) -> Result<()> {
    let level = if debug { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_env("SLIDE_LOG").unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };
    installed.map_err(|error| anyhow!("failed to initialize tracing subscriber: {error}"))
}

async fn generate(config: &SlideConfig, prompt: &str, mode: OutputMode, json: bool) -> Result<()> {
    let orchestrator = GenerationOrchestrator::spawn(
        ProjectId::generate(),
        Arc::new(DemoBackend::new(config.build_delay())),
        OrchestratorConfig::from(config),
    );
    tracing::debug!(
        "Headless generation for project {} (build delay {}ms)",
        orchestrator.project_id(),
        config.build_delay_ms
    );
    eprintln!("Generating a {mode} for: {prompt}");
    orchestrator
        .submit(prompt, mode)
        .await
        .map_err(|e| anyhow!(ErrorReporter::format_user_error(&e)))?;

    while let Some(event) = orchestrator.next_event().await {
        if let Event::JobStatusChanged { status, .. } = event {
            if !status.is_active() {
                break;
            }
        }
    }
    let snapshot = orchestrator.shutdown().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print!("{}", render_outline(&snapshot));
    }

    if snapshot.status == Some(JobStatus::Failed) {
        anyhow::bail!("generation failed");
    }
    Ok(())
}

/// Plain-text rendering of the deck followed by the chat transcript.
pub fn render_outline(snapshot: &ProjectSnapshot) -> String {
    let mut content = String::new();
    for (i, slide) in snapshot.slides.iter().enumerate() {
        content.push_str(&format!("## Slide {} ({})\n", i + 1, slide.variant()));
        for line in slide_tui::slide_lines(slide) {
            let text: String = line.spans.iter().map(|s| s.content.as_ref()).collect();
            content.push_str(&text);
            content.push('\n');
        }
        content.push('\n');
    }
    content.push_str("---\n");
    for turn in &snapshot.turns {
        content.push_str(&format!(
            "{} • {}: {}\n",
            turn.speaker.label(),
            turn.display_time(),
            turn.text
        ));
    }
    content
}
