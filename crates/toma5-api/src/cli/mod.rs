//! CLI command definitions for the `toma5` binary.
//!
//! `serve` runs the REST API plus the daily scheduler; `sweep` and
//! `purge-notifications` run one maintenance step and exit.

pub mod maintenance;

use clap::{Parser, Subcommand};

/// Toma 5 task authorization workflow service.
#[derive(Parser)]
#[command(name = "toma5", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the REST API server and the daily sweep scheduler.
    Serve {
        /// Address to bind (defaults to `server.host` from config.toml).
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (defaults to `server.port` from config.toml).
        #[arg(long, short)]
        port: Option<u16>,

        /// Export tracing spans through OpenTelemetry (stdout exporter).
        #[arg(long, env = "TOMA5_OTEL")]
        otel: bool,

        /// Emit log lines as JSON.
        #[arg(long, env = "TOMA5_JSON_LOGS")]
        json_logs: bool,
    },

    /// Auto-cancel every PENDING task assigned before today, then exit.
    Sweep,

    /// Delete read notifications older than the retention window, then exit.
    PurgeNotifications {
        /// Override `notifications.retention_days` from config.toml.
        #[arg(long)]
        days: Option<u32>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        <Cli as clap::CommandFactory>::command().debug_assert();
    }

    #[test]
    fn test_parse_serve_flags() {
        let cli = Cli::try_parse_from([
            "toma5", "serve", "--host", "0.0.0.0", "--port", "8080", "--json-logs",
        ])
        .unwrap();
        match cli.command {
            Commands::Serve {
                host,
                port,
                otel,
                json_logs,
            } => {
                assert_eq!(host.as_deref(), Some("0.0.0.0"));
                assert_eq!(port, Some(8080));
                assert!(json_logs);
                assert!(!otel);
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_parse_purge_with_override() {
        let cli = Cli::try_parse_from(["toma5", "--json", "purge-notifications", "--days", "7"])
            .unwrap();
        assert!(cli.json);
        assert!(matches!(
            cli.command,
            Commands::PurgeNotifications { days: Some(7) }
        ));
    }
}
