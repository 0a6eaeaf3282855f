//! CLI entry point for muse.
//!
//! Provides commands for building the profile index, analyzing text from the
//! terminal and serving the HTTP API.

use anyhow::Context;
use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use muse::analysis::{
    AnalysisReport, BuildOptions, ConfidenceTier, IndexSource, build_analyzer,
};
use muse::display::{THEME, create_match_table, create_summary_table, with_spinner};
use muse::server::{AnalyzeRequest, AnalyzeResponse};
use muse::{EmbeddingGenerator, FastEmbedGenerator, MuseError, Settings};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Semantic profile matching
#[derive(Parser)]
#[command(
    name = "muse",
    version = env!("CARGO_PKG_VERSION"),
    about = "Match your writing against a corpus of reference profiles",
    long_about = "Embed free-form text, rank it against reference profiles by semantic similarity and explain each match.",
    next_line_help = true,
    styles = clap_cargo_style()
)]
struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
enum Commands {
    /// Initialize project
    #[command(about = "Set up .muse directory with default configuration")]
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Build the profile index from the dataset
    #[command(about = "Embed the dataset and save the index")]
    Index {
        /// Rebuild even if a saved index exists
        #[arg(short, long)]
        force: bool,

        /// Hide the embedding progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// Analyze a piece of text
    #[command(
        about = "Find the profiles closest to a text",
        after_help = "Examples:\n  muse analyze \"What is a life well lived? ...\"\n  muse analyze --file essay.txt --top-k 5\n  cat essay.txt | muse analyze --mode quick --json"
    )]
    Analyze {
        /// Text to analyze; read from --file or stdin when omitted
        text: Option<String>,

        /// Read the text from a file
        #[arg(short, long, conflicts_with = "text")]
        file: Option<PathBuf>,

        /// Number of matches to return
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Explanation style: detailed or quick
        #[arg(short, long, default_value = "detailed")]
        mode: String,

        /// Print the response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Start the HTTP API
    #[cfg(feature = "http-server")]
    #[command(
        about = "Serve the analysis API over HTTP",
        after_help = "Examples:\n  muse serve\n  muse serve --bind 0.0.0.0:8000"
    )]
    Serve {
        /// Bind address (overrides server.bind)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Show current configuration settings
    #[command(about = "Display active settings from .muse/settings.toml")]
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path).unwrap_or_else(|e| {
            report_error(&MuseError::Config {
                reason: format!("loading {}: {e}", path.display()),
            });
            std::process::exit(1);
        }),
        None => Settings::load().unwrap_or_else(|e| {
            eprintln!("Configuration error: {e}");
            Settings::default()
        }),
    };

    muse::logging::init(&settings.logging, settings.debug || cli.verbose);

    if let Err(e) = run(cli.command, settings).await {
        match e.downcast_ref::<MuseError>() {
            Some(muse_error) => report_error(muse_error),
            None => eprintln!("{}", THEME.error_with_icon(&format!("{e:#}"))),
        }
        std::process::exit(1);
    }
}

fn report_error(error: &MuseError) {
    eprintln!("{}", THEME.error_with_icon(&error.to_string()));
    for suggestion in error.recovery_suggestions() {
        eprintln!("  {}", THEME.apply(&THEME.dim, suggestion));
    }
}

async fn run(command: Commands, settings: Settings) -> anyhow::Result<()> {
    match command {
        Commands::Init { force } => {
            let path = Settings::init_config_file(force)?;
            println!(
                "{}",
                THEME.success_with_icon(&format!(
                    "Created configuration file at: {}",
                    path.display()
                ))
            );
            println!("Edit this file to customize your settings.");
        }

        Commands::Config => {
            println!("Current Configuration:");
            println!("{}", "=".repeat(50));
            println!("{}", settings.to_toml()?);
        }

        Commands::Index { force, no_progress } => {
            let embedder = load_embedder(&settings)?;
            let outcome = build_analyzer(
                &settings,
                embedder,
                BuildOptions {
                    force_rebuild: force,
                    show_progress: !no_progress,
                },
            )?;

            let analyzer = &outcome.analyzer;
            let source = match outcome.source {
                IndexSource::Loaded => "loaded from disk",
                IndexSource::Rebuilt => "embedded from dataset",
            };
            println!(
                "{}",
                create_summary_table(&[
                    ("Profiles", analyzer.index().len().to_string()),
                    ("Dimension", analyzer.index().dimension().to_string()),
                    ("Model", analyzer.model_name().to_string()),
                    ("Source", source.to_string()),
                    ("Index path", settings.index_path.display().to_string()),
                    ("Time", format!("{:?}", outcome.elapsed)),
                ])
            );
            if outcome.source == IndexSource::Rebuilt && !settings.analysis.persist_index {
                println!(
                    "{}",
                    THEME.warning_with_icon("analysis.persist_index is off, nothing was saved")
                );
            }
        }

        Commands::Analyze {
            text,
            file,
            top_k,
            mode,
            json,
        } => {
            let text = read_input(text, file)?;
            let request = AnalyzeRequest { text, mode, top_k }
                .validate(&settings.analysis)
                .map_err(MuseError::from)?;

            let embedder = load_embedder(&settings)?;
            let outcome = build_analyzer(
                &settings,
                embedder,
                BuildOptions {
                    force_rebuild: false,
                    show_progress: !json,
                },
            )?;

            let run_analysis = || {
                outcome
                    .analyzer
                    .analyze(&request.text, request.top_k, request.mode)
            };
            let report = if json {
                run_analysis()?
            } else {
                with_spinner("Analyzing text", run_analysis)?
            };

            if json {
                let response = AnalyzeResponse::from(report);
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                print_report(&report);
            }
        }

        #[cfg(feature = "http-server")]
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| settings.server.bind.clone());
            let embedder = load_embedder(&settings)?;
            let outcome = build_analyzer(
                &settings,
                embedder,
                BuildOptions {
                    force_rebuild: false,
                    show_progress: true,
                },
            )?;

            let handle = muse::AnalyzerHandle::new(outcome.analyzer);
            muse::server::serve_http(settings, handle, bind).await?;
        }
    }

    Ok(())
}

fn load_embedder(settings: &Settings) -> anyhow::Result<Arc<dyn EmbeddingGenerator>> {
    let generator = FastEmbedGenerator::new(
        &settings.embedding.model,
        &settings.embedding.cache_dir,
        settings.embedding.show_download_progress,
        settings.embedding.batch_size,
    )
    .map_err(MuseError::from)?;
    Ok(Arc::new(generator))
}

fn read_input(text: Option<String>, file: Option<PathBuf>) -> anyhow::Result<String> {
    if let Some(text) = text {
        return Ok(text);
    }
    if let Some(path) = file {
        return std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read '{}'", path.display()));
    }

    let mut buffer = String::new();
    std::io::stdin()
        .read_to_string(&mut buffer)
        .context("Failed to read text from stdin")?;
    Ok(buffer)
}

fn print_report(report: &AnalysisReport) {
    if report.matches.is_empty() {
        println!("{}", THEME.warning_with_icon("No matches found"));
    } else {
        println!("{}", create_match_table(&report.matches));
        let best = &report.matches[0];
        println!(
            "Closest match: {} ({} match)",
            THEME.apply(&THEME.name, &best.name),
            THEME.apply(
                THEME.tier_style(best.score),
                ConfidenceTier::from_score(best.score)
            )
        );
    }

    for m in &report.matches {
        if let Some(book) = m.recommendation.get("book") {
            let details: Vec<&str> = ["type", "year"]
                .iter()
                .filter_map(|key| m.recommendation.get(*key).map(String::as_str))
                .collect();
            let suffix = if details.is_empty() {
                String::new()
            } else {
                format!(" ({})", details.join(", "))
            };
            println!(
                "  {} {}{}",
                THEME.apply(&THEME.name, &m.name),
                THEME.apply(&THEME.dim, format!("recommends \"{book}\"")),
                suffix
            );
        }
    }

    let summary = &report.summary;
    let themes: Vec<&str> = summary.themes.iter().map(|t| t.as_str()).collect();
    println!();
    println!("{}", THEME.apply(&THEME.header, "Your text"));
    println!(
        "  {} sentences, {} words, {:.1} words per sentence",
        summary.features.sentence_count,
        summary.features.word_count,
        summary.features.avg_sentence_length
    );
    if !themes.is_empty() {
        println!("  Themes: {}", themes.join(", "));
    }
    println!(
        "  {}",
        THEME.apply(
            &THEME.dim,
            format!("Analyzed in {:.1}ms", report.processing_time_ms)
        )
    );
}
