// src/cli.rs

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::OutputMode;

/// Natural-language to script generator with a denylist gate and a
/// scratch-directory sandbox.
///
/// `config.yaml` is the primary source of truth.
/// CLI flags only override config values.
#[derive(Parser, Debug)]
#[command(name = "scriptgen", version, disable_help_subcommand = true)]
pub struct Cli {
    /// Path to config file (optional; defaults apply when missing)
    #[arg(short, long, global = true, default_value = "config.yaml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a script for a task and print the response.
    ///
    /// Example:
    /// scriptgen generate "list the 10 largest files in ~/Downloads" --language bash
    Generate {
        /// Natural-language task description
        task: String,

        /// Target language (python | powershell | bash | javascript)
        #[arg(short, long, default_value = "python")]
        language: String,

        /// Run the script after generation.
        ///
        /// Only honoured when execution.enabled (or ALLOW_LOCAL_RUN=true).
        #[arg(long)]
        run: bool,

        /// Override output.mode
        #[arg(long, value_enum)]
        output: Option<OutputMode>,
    },

    /// Run the safety gate over a script file.
    ///
    /// Exits non-zero when any denylist pattern matches.
    Check {
        /// Script file to scan
        file: PathBuf,
    },

    /// Serve the HTTP API.
    Serve {
        /// Override server.addr
        #[arg(long)]
        addr: Option<String>,
    },

    /// Write a starter config.yaml (never overwrites).
    Init,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_flags_parse() {
        let cli = Cli::parse_from([
            "scriptgen", "generate", "print hello", "-l", "bash", "--run", "--output", "simple",
        ]);
        match cli.command {
            Command::Generate {
                task,
                language,
                run,
                output,
            } => {
                assert_eq!(task, "print hello");
                assert_eq!(language, "bash");
                assert!(run);
                assert_eq!(output, Some(OutputMode::Simple));
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(cli.config, PathBuf::from("config.yaml"));
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::parse_from(["scriptgen", "serve", "--config", "prod.yaml"]);
        assert_eq!(cli.config, PathBuf::from("prod.yaml"));
    }
}
