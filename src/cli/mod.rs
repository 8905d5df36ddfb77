//! CLI module for Grasp
//!
//! Provides command-line interface parsing and handling for the grasp-server binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod init;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Grasp - learn from YouTube videos with timestamp-aware chat
///
/// Loads video captions, indexes them for retrieval and answers questions
/// about what is on screen using OpenAI, Anthropic or Gemini.
#[derive(Parser, Debug)]
#[command(
    name = "grasp-server",
    version,
    about = "Grasp - timestamp-aware chat and notes for YouTube videos",
    long_about = "Backend for the Grasp learning app: caption extraction, chunking,\n\
                  embedding, retrieval-augmented chat and timestamped notes.\n\n\
                  Run without arguments to start the server, or use 'init' to scaffold a new project.",
    after_help = "EXAMPLES:\n    \
                  grasp-server init                      # Scaffold grasp.toml and .env.example\n    \
                  grasp-server init --provider anthropic # Default to Claude\n    \
                  grasp-server                           # Start the server (requires grasp.toml)\n    \
                  grasp-server config --validate         # Check the configuration"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "grasp.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new Grasp project
    ///
    /// Creates grasp.toml, .env.example and the data/ directory.
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite existing files without prompting
        #[arg(short, long)]
        force: bool,

        /// Default chat provider (openai, anthropic, gemini or all)
        #[arg(long, default_value = "openai")]
        provider: String,

        /// Host address for the server
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port for the server
        #[arg(long, default_value = "8000")]
        port: u16,
    },

    /// Show configuration information
    Config {
        /// Validate the configuration file
        #[arg(long)]
        validate: bool,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["grasp-server"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("grasp.toml"));
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_init_args() {
        let cli = Cli::try_parse_from([
            "grasp-server",
            "init",
            "proj",
            "--provider",
            "gemini",
            "--port",
            "9001",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Init {
                path,
                force,
                provider,
                port,
                ..
            }) => {
                assert_eq!(path, PathBuf::from("proj"));
                assert!(!force);
                assert_eq!(provider, "gemini");
                assert_eq!(port, 9001);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_config_flag_after_subcommand() {
        let cli = Cli::try_parse_from(["grasp-server", "config", "--validate", "-c", "other.toml"])
            .unwrap();
        assert_eq!(cli.config, PathBuf::from("other.toml"));
        assert!(matches!(cli.command, Some(Commands::Config { validate: true })));
    }
}
