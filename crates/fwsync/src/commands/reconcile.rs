//! Reconciliation handlers: one-shot cycle and long-running watch mode.

use std::sync::Arc;
use std::time::Duration;

use fwsync_config::Config;
use fwsync_core::{CycleSummary, ReconcileScheduler};

use crate::cli::{GlobalOpts, ReconcileCommand};
use crate::error::CliError;
use crate::output;

use super::Context;

fn summary_detail(s: &CycleSummary) -> String {
    let mut lines = vec![
        format!("Total rules: {}", s.total_rules),
        format!("Verified:    {}", s.verified),
        format!("Updated:     {}", s.updated),
        format!("Errors:      {}", s.errors),
    ];
    for message in &s.error_messages {
        lines.push(format!("  - {message}"));
    }
    lines.join("\n")
}

pub async fn handle(
    ctx: &Context,
    cmd: ReconcileCommand,
    global: &GlobalOpts,
    config: &Config,
) -> Result<(), CliError> {
    match cmd {
        ReconcileCommand::Run => {
            let summary = ctx.reconciler.run_cycle().await;
            let out = output::render_single(&global.output, &summary, summary_detail, |s| {
                format!("{}/{}", s.verified, s.total_rules)
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ReconcileCommand::Watch => {
            let scheduler = ReconcileScheduler::new(
                Arc::clone(&ctx.reconciler),
                Duration::from_secs(config.reconcile.interval_secs),
                Duration::from_secs(config.reconcile.initial_delay_secs),
            );
            scheduler.start();

            if !global.quiet {
                eprintln!(
                    "Reconciling every {}s (first cycle in {}s) -- ctrl-c to stop",
                    config.reconcile.interval_secs, config.reconcile.initial_delay_secs
                );
            }

            tokio::signal::ctrl_c().await?;
            scheduler.stop().await;
            Ok(())
        }
    }
}
