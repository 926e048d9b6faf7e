//! CLI command definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI arguments for magi-quorum
#[derive(Parser, Debug)]
#[command(name = "magi-quorum")]
#[command(author, version, about = "Weighted-quorum review service - independent LLM judges vote on a payload")]
#[command(long_about = r#"
magi-quorum runs a panel of LLM judges behind a WebSocket gateway.

A client connects to /ws?app_id=<id>&token=<token> and sends review requests.
Each request is fanned out to every active judge; their votes are weighted and
reduced to a single decision that is streamed back on the same connection.

Configuration files are loaded from (in priority order):
1. MAGI_* environment variables (e.g. MAGI_GATEWAY__SECRET)
2. --config <path>     Explicit config file
3. ./magi.toml         Project-level config
4. ~/.config/magi-quorum/config.toml   Global config

Example:
  magi-quorum serve --port 9000
  magi-quorum token --app-id my_app
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the gateway, dispatcher, judge workers and aggregator (default)
    Serve {
        /// Override the configured bind host
        #[arg(long)]
        host: Option<String>,

        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print the token a client with this app id would present right now
    Token {
        #[arg(long, value_name = "ID")]
        app_id: String,
    },
}

impl Cli {
    /// The subcommand to run; `serve` with configured values when none is given.
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve {
            host: None,
            port: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_serve() {
        let cli = Cli::parse_from(["magi-quorum"]);
        assert_eq!(
            cli.command(),
            Command::Serve {
                host: None,
                port: None
            }
        );
        assert_eq!(cli.verbose, 0);
        assert!(!cli.no_config);
    }

    #[test]
    fn test_serve_overrides() {
        let cli = Cli::parse_from(["magi-quorum", "-vv", "serve", "--port", "9000"]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(
            cli.command(),
            Command::Serve {
                host: None,
                port: Some(9000)
            }
        );
    }

    #[test]
    fn test_token_subcommand() {
        let cli = Cli::parse_from([
            "magi-quorum",
            "token",
            "--app-id",
            "test_app",
            "--config",
            "magi.toml",
        ]);
        assert_eq!(
            cli.command(),
            Command::Token {
                app_id: "test_app".to_string()
            }
        );
        assert_eq!(cli.config, Some(PathBuf::from("magi.toml")));
    }

    #[test]
    fn test_token_requires_app_id() {
        assert!(Cli::try_parse_from(["magi-quorum", "token"]).is_err());
    }
}
