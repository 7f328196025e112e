//! `unfold`: extract text from a rendered web page or a YouTube video.
//!
//! Results are printed to stdout as JSON; logs go to the rolling file sink and,
//! unless disabled in config, to stderr.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use unfold_common::UnfoldConfig;
use unfold_common::observability::{LogConfig, init_logging};
use unfold_config::UnfoldConfigLoader;
use unfold_video::{TranscriptError, TranscriptFetcher};
use unfold_web::{Outcome, ScrapeEngine, ScrapeError};

const DEFAULT_CONFIG_FILE: &str = "unfold.yaml";

#[derive(Parser)]
#[command(name = "unfold")]
#[command(about = "Extract readable text from dynamic pages and video transcripts")]
#[command(version)]
struct Cli {
    /// YAML configuration file. Defaults to ./unfold.yaml when present.
    #[arg(short, long, global = true, env = "UNFOLD_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a page in headless Chrome and print its text
    Scrape {
        /// Absolute http(s) URL
        url: String,
    },

    /// Print the title and transcript of a YouTube video
    Transcript {
        /// Any watch, short, embed, /v/ or /e/ link
        video_url: String,
    },
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    detail: String,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Environment overrides the file.
    let loader = match &cli.config {
        Some(path) => UnfoldConfigLoader::new().with_file(path),
        None => UnfoldConfigLoader::new().with_optional_file(DEFAULT_CONFIG_FILE),
    };
    let cfg = loader.load().context("failed to load configuration")?;

    let log_path = init_logging(LogConfig::from_settings("unfold", &cfg.log))?;
    tracing::debug!(log_path = %log_path.display(), "app.logging_ready");

    match cli.command {
        Commands::Scrape { url } => scrape(&cfg, &url).await,
        Commands::Transcript { video_url } => transcript(&cfg, &video_url).await,
    }
}

async fn scrape(cfg: &UnfoldConfig, url: &str) -> Result<ExitCode> {
    let engine = ScrapeEngine::from_config(cfg)?;
    match engine.scrape_page(url).await {
        Ok(result) => {
            print_json(&result)?;
            Ok(if result.outcome == Outcome::Failed {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }
        Err(err @ ScrapeError::InvalidInput(_)) => {
            print_json(&ErrorBody {
                error: "invalid_input",
                detail: err.to_string(),
            })?;
            Ok(ExitCode::from(2))
        }
        Err(err) => Err(err.into()),
    }
}

async fn transcript(cfg: &UnfoldConfig, video_url: &str) -> Result<ExitCode> {
    let fetcher = TranscriptFetcher::from_config(&cfg.youtube)?;
    match fetcher.get_youtube_transcript(video_url).await {
        Ok(result) => {
            print_json(&result)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err @ TranscriptError::InvalidInput(_)) => {
            print_json(&ErrorBody {
                error: "invalid_input",
                detail: err.to_string(),
            })?;
            Ok(ExitCode::from(2))
        }
        Err(err @ TranscriptError::Unavailable) => {
            print_json(&ErrorBody {
                error: "unavailable",
                detail: err.to_string(),
            })?;
            Ok(ExitCode::FAILURE)
        }
        Err(err) => Err(err.into()),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_scrape_with_global_config() {
        let cli = Cli::try_parse_from([
            "unfold",
            "scrape",
            "https://example.com",
            "--config",
            "/etc/unfold.yaml",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/etc/unfold.yaml")));
        assert!(matches!(cli.command, Commands::Scrape { url } if url == "https://example.com"));
    }

    #[test]
    fn transcript_requires_a_url() {
        assert!(Cli::try_parse_from(["unfold", "transcript"]).is_err());
    }
}
