// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Command-line arguments for `buildweave`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "buildweave",
    version,
    about = "Resolve dependencies and build native libraries and app packages in dependency order.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Buildweave.toml` in the current working directory.
    #[arg(
        long,
        global = true,
        value_name = "PATH",
        default_value_os_t = crate::config::default_config_path()
    )]
    pub config: PathBuf,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `BUILDWEAVE_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Resolve dependencies, then run every out-of-date task.
    Build(BuildArgs),
    /// Delete all build outputs and forget every fingerprint.
    Clean,
    /// Resolve dependencies, write the lockfile and print the resolved set.
    Resolve,
}

#[derive(Debug, Clone, Default, Args)]
pub struct BuildArgs {
    /// Run the clean task first, forcing every task to execute.
    #[arg(long)]
    pub clean: bool,

    /// Stop dispatching new tasks after the first failure.
    #[arg(long)]
    pub fail_fast: bool,

    /// Maximum number of tasks running at once.
    ///
    /// Default: `[config].jobs`, else the number of available CPUs.
    #[arg(long, short = 'j', value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    pub jobs: Option<u64>,

    /// Parse + validate + resolve, print the task order, but don't execute
    /// any task.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_flags_parse() {
        let args = CliArgs::try_parse_from([
            "buildweave",
            "--config",
            "android/Buildweave.toml",
            "build",
            "--clean",
            "--fail-fast",
            "--jobs",
            "3",
        ])
        .unwrap();

        assert_eq!(args.config, PathBuf::from("android/Buildweave.toml"));
        let Command::Build(build) = args.command else {
            panic!("expected build command");
        };
        assert!(build.clean);
        assert!(build.fail_fast);
        assert_eq!(build.jobs, Some(3));
        assert!(!build.dry_run);
    }

    #[test]
    fn zero_jobs_is_rejected() {
        assert!(CliArgs::try_parse_from(["buildweave", "build", "--jobs", "0"]).is_err());
    }

    #[test]
    fn global_options_after_subcommand() {
        let args =
            CliArgs::try_parse_from(["buildweave", "clean", "--log-level", "debug"]).unwrap();
        assert!(matches!(args.command, Command::Clean));
        assert!(matches!(args.log_level, Some(LogLevel::Debug)));
    }
}
