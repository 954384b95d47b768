//! `scs pull` — mirror every script of the place locally.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use scs_sync::{pull, PullOptions, PullReport};

use super::{connect, runtime, GlobalArgs};

/// Arguments for `scs pull`.
#[derive(Args, Debug)]
pub struct PullArgs {
    /// Walker pool size, overriding `workers` from the config.
    #[arg(long, short = 'j')]
    pub workers: Option<usize>,

    /// Emit the report as JSON.
    #[arg(long)]
    pub json: bool,
}

impl PullArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let project = global.load_project()?;
        let client = connect(&project.config)?;

        let mut options = PullOptions::from_project(&project.config, &project.mirror_dir);
        if let Some(workers) = self.workers {
            options.workers = workers;
        }

        let report = runtime()?
            .block_on(pull(client, &options))
            .context("pull failed")?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_report(&report);
        }
        if !report.is_complete() {
            anyhow::bail!("{} subtrees could not be listed", report.failures.len());
        }
        Ok(())
    }
}

fn print_report(report: &PullReport) {
    let mark = if report.is_complete() {
        "✓".green()
    } else {
        "!".yellow()
    };
    println!(
        "{mark} Pulled {} scripts from {} containers",
        report.written.len(),
        report.containers_visited
    );
    for written in &report.written {
        println!("  ✎  {}", written.path.display());
    }
    for failure in &report.failures {
        println!(
            "  {}  {} ({}): {}",
            "✗".red(),
            failure.name,
            failure.container,
            failure.error
        );
    }
}
