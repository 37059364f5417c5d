//! Toma 5 CLI and REST API entry point.
//!
//! Binary name: `toma5`
//!
//! Parses CLI arguments, initializes tracing, database and the workflow
//! engine, then either runs a one-shot maintenance command or starts the REST
//! API server together with the daily sweep scheduler.

mod cli;
mod http;
mod state;

use clap::Parser;
use toma5_core::workflow::DailyScheduler;
use toma5_observe::tracing_setup::{LogFormat, init_tracing, shutdown_tracing};

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (format, otel) = match &cli.command {
        Commands::Serve {
            otel, json_logs, ..
        } => {
            let format = if *json_logs {
                LogFormat::Json
            } else {
                LogFormat::Pretty
            };
            (format, *otel)
        }
        _ => (LogFormat::Pretty, false),
    };
    if let Err(err) = init_tracing(format, otel) {
        eprintln!("Warning: failed to initialize tracing: {err}");
    }

    let state = AppState::init().await?;

    let result = match cli.command {
        Commands::Serve { host, port, .. } => serve(state, host, port, cli.quiet).await,
        Commands::Sweep => cli::maintenance::sweep(&state, cli.json, cli.quiet).await,
        Commands::PurgeNotifications { days } => {
            cli::maintenance::purge_notifications(&state, days, cli.json, cli.quiet).await
        }
    };

    shutdown_tracing();
    result
}

/// Run the HTTP server until Ctrl+C or SIGTERM.
async fn serve(
    state: AppState,
    host: Option<String>,
    port: Option<u16>,
    quiet: bool,
) -> anyhow::Result<()> {
    let schedule = state.config.schedule.clone();

    if schedule.catch_up_on_start {
        // A sweep missed while the process was down is applied now.
        let report = state.run_daily_maintenance(state.engine.now()).await?;
        tracing::info!(
            cancelled = report.sweep.cancelled,
            purged = report.purged_notifications,
            "catch-up maintenance finished"
        );
    }

    let scheduler = DailyScheduler::new(state.engine.timezone());
    scheduler.start().await?;
    scheduler
        .schedule(&schedule.sweep_at, state.daily_callback())
        .await?;

    let host = host.unwrap_or_else(|| state.config.server.host.clone());
    let port = port.unwrap_or(state.config.server.port);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    if !quiet {
        println!(
            "  {} Toma 5 API listening on {}",
            console::style("⚡").bold(),
            console::style(format!("http://{addr}")).cyan()
        );
        println!(
            "  {} Daily sweep at {} (UTC{})",
            console::style("⏰").bold(),
            console::style(&schedule.sweep_at).cyan(),
            state.engine.timezone()
        );
        println!("  {}", console::style("Press Ctrl+C to stop").dim());
    }

    let router = http::router::build_router(state.clone());

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.stop().await?;
    state.engine.outbox().flush().await;

    if !quiet {
        println!("\n  Server stopped.");
    }
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("failed to install SIGTERM handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
