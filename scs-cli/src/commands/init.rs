//! `scs init --universe <id> --place <id> [--allow <name>]... [--force]`

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use scs_core::{config, ProjectConfig};

use super::GlobalArgs;

/// Write a starter `scs.yaml`.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Universe (experience) id.
    #[arg(long, short = 'u')]
    pub universe: String,

    /// Place id inside the universe.
    #[arg(long, short = 'p')]
    pub place: String,

    /// Container name the walker always descends into. Repeatable.
    #[arg(long = "allow", value_name = "NAME")]
    pub allow_list: Vec<String>,

    /// Replace an existing config file.
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let path = global.config_path();
        let mut project = ProjectConfig::new(self.universe, self.place);
        project.allow_list = self.allow_list;

        config::write_template_at(&path, &project, self.force)
            .with_context(|| format!("failed to write '{}'", path.display()))?;

        let mirror_dir = global.mirror_dir(&project);
        std::fs::create_dir_all(&mirror_dir)
            .with_context(|| format!("failed to create '{}'", mirror_dir.display()))?;

        println!("{} Wrote {}", "✓".green(), path.display());
        println!("  Mirror directory: {}", mirror_dir.display());
        println!("  Put your API key in SCS_API_KEY or a .env file, then run `scs pull`.");
        Ok(())
    }
}
