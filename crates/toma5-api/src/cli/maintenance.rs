//! One-shot maintenance commands: `toma5 sweep` and `toma5 purge-notifications`.

use console::style;

use crate::state::AppState;

/// Run the stale-task sweep once and wait for its notifications to land.
pub async fn sweep(state: &AppState, json: bool, quiet: bool) -> anyhow::Result<()> {
    let now = state.engine.now();
    let summary = state.engine.run_stale_sweep(now).await?;
    state.engine.outbox().flush().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }
    if quiet {
        return Ok(());
    }

    let day = summary
        .day
        .map(|d| d.to_string())
        .unwrap_or_else(|| "-".to_string());

    println!();
    println!(
        "  {} Stale-task sweep for {}",
        style("✓").green().bold(),
        style(day).cyan()
    );
    println!();
    println!("  Examined:   {}", summary.examined);
    println!("  Cancelled:  {}", style(summary.cancelled).green());
    println!("  Skipped:    {}", summary.skipped);
    if summary.failed > 0 {
        println!("  Failed:     {}", style(summary.failed).red().bold());
    } else {
        println!("  Failed:     0");
    }
    for id in &summary.cancelled_task_ids {
        println!("    {}", style(id).dim());
    }
    println!();
    Ok(())
}

/// Delete read notifications older than the retention window.
pub async fn purge_notifications(
    state: &AppState,
    days: Option<u32>,
    json: bool,
    quiet: bool,
) -> anyhow::Result<()> {
    let retention_days = days.unwrap_or(state.config.notifications.retention_days);
    let purged = state
        .dispatcher
        .purge_read(state.engine.now(), retention_days)
        .await?;

    if json {
        let out = serde_json::json!({
            "purged": purged,
            "retention_days": retention_days,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else if !quiet {
        println!();
        println!(
            "  {} Purged {} read notification(s) older than {} day(s)",
            style("✓").green().bold(),
            style(purged).cyan(),
            retention_days
        );
        println!();
    }
    Ok(())
}
