//! Transcode Interop - drives a native transcoding engine.
//!
//! This library turns user-facing encode tasks into engine jobs, estimates
//! bitrate and output size, resolves output geometry and audio tracks, and
//! runs the asynchronous scan/encode lifecycle against a [`NativeEngine`].
//!
//! [`NativeEngine`]: engine::NativeEngine

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod job;
pub mod media;
pub mod task;
pub mod testing;
pub mod validation;

use std::path::Path;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::{BitrateArgs, Cli, Commands, SizeArgs, TranslateArgs, ValidateArgs};
use crate::error::{AppError, InstanceError, ValidationError};
use crate::job::{EncodeJob, EncodeOptions};
use crate::media::scan::{decode_title_set, ScanResult};
use crate::media::{estimate, TitleSet};
use crate::validation::report::{format_brief_summary, format_report};

/// Runs the command selected on the command line.
pub async fn run(cli: Cli) -> Result<()> {
    setup_logging(&log_level(&cli))?;

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Translate(args) => translate_task(args),
        Commands::Validate(args) => validate_task(args),
        Commands::Bitrate(args) => estimate_bitrate(args),
        Commands::Size(args) => estimate_size(args),
        Commands::ConfigValidate => validate_config(config_path),
        Commands::ConfigShow => show_config(config_path),
    }
}

/// `-v` flags win; without them the configured level applies. A config that
/// cannot be read falls back to `info` and is reported by the command itself.
fn log_level(cli: &Cli) -> String {
    if cli.verbose > 0 {
        return cli.log_level().to_string();
    }
    config::load_or_default(cli.config.as_deref())
        .map(|config| config.global.log_level)
        .unwrap_or_else(|_| cli.log_level().to_string())
}

/// Initializes the tracing subscriber for structured logging.
fn setup_logging(level: &str) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(filter)
        .json()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

/// Loads a task file and translates it.
fn load_job(path: &Path) -> Result<EncodeJob, AppError> {
    let task = task::loader::load_from_path(path)?;
    let job = job::translate(&task);
    debug!(
        task = %path.display(),
        title = job.title,
        audio_tracks = job.profile.audio_encodings.len(),
        "Translated task"
    );
    Ok(job)
}

/// Loads a title set saved from the engine.
fn load_titles(path: &Path) -> Result<TitleSet, AppError> {
    let raw = std::fs::read(path)?;
    let titles = decode_title_set(&raw)?;
    info!(
        path = %path.display(),
        titles = titles.len(),
        feature_title = titles.feature_title,
        "Loaded title set"
    );
    Ok(titles)
}

/// Prints the translated job, or the engine payload when a title set is given.
fn translate_task(args: TranslateArgs) -> Result<()> {
    let job = load_job(&args.task)?;

    let json = match args.titles {
        Some(titles_path) => {
            let scan = ScanResult::new(load_titles(&titles_path)?.into());
            let payload = job::payload::build(&job, &scan, &EncodeOptions::default())?;
            serde_json::to_string_pretty(&payload)?
        }
        None => serde_json::to_string_pretty(&job)?,
    };

    println!("{}", json);
    Ok(())
}

/// Validates a task file and prints the report.
fn validate_task(args: ValidateArgs) -> Result<()> {
    let task = task::loader::load_from_path(&args.task)?;

    let mut result = validation::validate_task(&task);
    if !args.skip_paths {
        result.extend(validation::paths::validate(&task));
    }

    info!("{}", format_brief_summary(&result, "Task"));
    println!("{}", format_report(&result, "Task"));

    if !result.is_valid() {
        anyhow::bail!(ValidationError::Rejected {
            error_count: result.error_count()
        });
    }
    Ok(())
}

fn estimate_bitrate(args: BitrateArgs) -> Result<()> {
    let job = load_job(&args.task)?;
    let titles = load_titles(&args.titles)?;
    let title = titles
        .get(job.title)
        .ok_or(InstanceError::TitleNotFound { title: job.title })?;

    let kbps = estimate::bitrate_for_target_size(&job, title, args.size_mb, args.length);
    println!("{} kbps", kbps);
    Ok(())
}

fn estimate_size(args: SizeArgs) -> Result<()> {
    let job = load_job(&args.task)?;
    let titles = load_titles(&args.titles)?;
    let title = titles
        .get(job.title)
        .ok_or(InstanceError::TitleNotFound { title: job.title })?;

    let size_mb = estimate::size_for_bitrate(&job, title, args.bitrate);
    println!("{:.1} MB", size_mb);
    Ok(())
}

/// Validates the configuration file and reports any issues.
fn validate_config(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_and_validate(config_path)?;

    println!("Configuration is valid.");
    println!(
        "Polling every {} ms (scan) / {} ms (encode), {} preview(s) per title.",
        config.engine.scan_poll_interval_ms,
        config.engine.encode_poll_interval_ms,
        config.scan.preview_count
    );
    Ok(())
}

/// Displays the parsed configuration.
fn show_config(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_and_validate(config_path)?;
    let yaml = serde_yaml::to_string(&config)?;
    println!("{}", yaml);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_log_level_from_config() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "global:\n  log_level: warn").unwrap();
        let path = file.path().to_str().unwrap();

        let cli = parse(&["transcode-interop", "--config", path, "config-show"]);
        assert_eq!(log_level(&cli), "warn");

        let cli = parse(&["transcode-interop", "-v", "--config", path, "config-show"]);
        assert_eq!(log_level(&cli), "debug");
    }

    #[test]
    fn test_log_level_defaults() {
        let cli = parse(&["transcode-interop", "config-show"]);
        assert_eq!(log_level(&cli), "info");

        let cli = parse(&["transcode-interop", "--config", "/nonexistent/t.yaml", "config-show"]);
        assert_eq!(log_level(&cli), "info");
    }
}
