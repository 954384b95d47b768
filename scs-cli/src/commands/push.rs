//! `scs push` — upload every bound mirror file.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use scs_sync::{push, PushOptions, PushOutcome, PushReport};

use super::{connect, GlobalArgs};

/// Arguments for `scs push`.
#[derive(Args, Debug)]
pub struct PushArgs {
    /// Emit the report as JSON.
    #[arg(long)]
    pub json: bool,
}

impl PushArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let project = global.load_project()?;
        let client = connect(&project.config)?;

        let report = push(&client, &PushOptions::new(&project.mirror_dir))
            .with_context(|| format!("push failed for '{}'", project.mirror_dir.display()))?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_report(&report);
        }
        if report.failed() > 0 {
            anyhow::bail!("{} files failed to push", report.failed());
        }
        Ok(())
    }
}

#[derive(Tabled)]
struct OutcomeRow {
    #[tabled(rename = "file")]
    file: String,
    #[tabled(rename = "result")]
    result: String,
    #[tabled(rename = "detail")]
    detail: String,
}

impl From<&PushOutcome> for OutcomeRow {
    fn from(outcome: &PushOutcome) -> Self {
        let file = outcome
            .path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (result, detail) = match outcome {
            PushOutcome::Pushed {
                id, remote_path, ..
            } => (
                "pushed".to_owned(),
                remote_path.clone().unwrap_or_else(|| id.to_string()),
            ),
            PushOutcome::MissingBinding { .. } => {
                ("skipped".to_owned(), "no metadata block".to_owned())
            }
            PushOutcome::Failed { error, .. } | PushOutcome::ReadFailed { error, .. } => {
                ("failed".to_owned(), error.clone())
            }
        };
        Self {
            file,
            result,
            detail,
        }
    }
}

fn print_report(report: &PushReport) {
    if report.outcomes.is_empty() {
        println!("Mirror is empty. Run `scs pull` first.");
        return;
    }

    let rows: Vec<OutcomeRow> = report.outcomes.iter().map(OutcomeRow::from).collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    let mark = if report.failed() == 0 {
        "✓".green()
    } else {
        "✗".red()
    };
    println!(
        "{mark} {} pushed, {} skipped, {} failed",
        report.pushed(),
        report.skipped(),
        report.failed()
    );
}
