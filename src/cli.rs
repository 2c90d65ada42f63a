//! Command-line interface definitions.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Offline tooling for encode tasks: translation, validation and estimates.
#[derive(Parser, Debug)]
#[command(name = "transcode-interop", version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file. Defaults apply when omitted.
    #[arg(short, long, env = "TRANSCODE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Returns the log level based on verbosity flags.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Translate a task file into an encode job and print it as JSON.
    Translate(TranslateArgs),

    /// Validate a task file.
    Validate(ValidateArgs),

    /// Video bitrate that fits a task into a target size.
    Bitrate(BitrateArgs),

    /// Estimated output size of a task at a video bitrate.
    Size(SizeArgs),

    /// Validate the configuration file.
    #[command(name = "config-validate")]
    ConfigValidate,

    /// Display the parsed configuration.
    #[command(name = "config-show")]
    ConfigShow,
}

/// Arguments for the translate subcommand.
#[derive(Args, Debug)]
pub struct TranslateArgs {
    /// Task file (YAML).
    pub task: PathBuf,

    /// Scanned title set (engine JSON). When given, the engine job payload
    /// is printed instead of the translated job.
    #[arg(long)]
    pub titles: Option<PathBuf>,
}

/// Arguments for the validate subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Task file (YAML).
    pub task: PathBuf,

    /// Skip the source and destination filesystem checks.
    #[arg(long, default_value = "false")]
    pub skip_paths: bool,
}

/// Arguments for the bitrate subcommand.
#[derive(Args, Debug)]
pub struct BitrateArgs {
    /// Task file (YAML).
    pub task: PathBuf,

    /// Scanned title set (engine JSON).
    pub titles: PathBuf,

    /// Target output size in MB.
    #[arg(long)]
    pub size_mb: u32,

    /// Length in seconds to use instead of the task's range.
    #[arg(long, default_value = "0")]
    pub length: f64,
}

/// Arguments for the size subcommand.
#[derive(Args, Debug)]
pub struct SizeArgs {
    /// Task file (YAML).
    pub task: PathBuf,

    /// Scanned title set (engine JSON).
    pub titles: PathBuf,

    /// Video bitrate in kbps.
    #[arg(long)]
    pub bitrate: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bitrate_command() {
        let cli = Cli::try_parse_from([
            "transcode-interop",
            "-vv",
            "bitrate",
            "task.yaml",
            "titles.json",
            "--size-mb",
            "700",
        ])
        .unwrap();

        assert_eq!(cli.log_level(), "trace");
        let Commands::Bitrate(args) = cli.command else {
            panic!("expected bitrate command");
        };
        assert_eq!(args.size_mb, 700);
        assert_eq!(args.length, 0.0);
    }

    #[test]
    fn test_config_is_global() {
        let cli =
            Cli::try_parse_from(["transcode-interop", "config-show", "--config", "/etc/t.yaml"])
                .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/etc/t.yaml")));
        assert!(matches!(cli.command, Commands::ConfigShow));
    }
}
