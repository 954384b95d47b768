//! `scs monitor [--once] [--interval <secs>]`

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tokio::sync::broadcast;

use scs_sync::{monitor, MonitorOptions};

use super::{connect, runtime, GlobalArgs};

/// Arguments for `scs monitor`.
#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// Run a single pass and exit.
    #[arg(long)]
    pub once: bool,

    /// Seconds between passes, overriding `monitor_interval_secs`.
    #[arg(long, value_name = "SECS")]
    pub interval: Option<u64>,
}

impl MonitorArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let project = global.load_project()?;
        let client = connect(&project.config)?;

        let interval = self
            .interval
            .map(Duration::from_secs)
            .unwrap_or_else(|| project.config.monitor_interval());
        let options = MonitorOptions {
            mirror_dir: project.mirror_dir.clone(),
            interval,
            loop_forever: !self.once,
        };

        if options.loop_forever {
            println!(
                "Monitoring {} every {}s. Press Ctrl-C to stop.",
                options.mirror_dir.display(),
                interval.as_secs()
            );
        }

        let summary = runtime()?.block_on(async move {
            let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
            let signal = {
                let shutdown = shutdown_tx.clone();
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        tracing::info!("received ctrl-c, finishing current pass");
                        let _ = shutdown.send(());
                    }
                })
            };

            let result = monitor(client, &options, shutdown_rx).await;
            signal.abort();
            drop(shutdown_tx);
            result
        });
        let summary = summary.context("monitor failed")?;

        println!(
            "{} {} passes: {} pushed, {} skipped, {} failed",
            "✓".green(),
            summary.passes,
            summary.pushed,
            summary.skipped,
            summary.failed
        );
        Ok(())
    }
}
