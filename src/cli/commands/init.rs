//! Init Command
//!
//! Create the configuration skeleton, globally or for the current project.

use crate::cli::ui::Output;
use crate::config::ConfigLoader;
use crate::types::Result;

pub fn run(global: bool, force: bool) -> Result<()> {
    let output = Output::new();

    if global {
        let dir = ConfigLoader::init_global(force)?;
        output.success(&format!("Initialized global configuration in {}", dir.display()));
    } else {
        let dir = ConfigLoader::init_project(force)?;
        output.success(&format!("Initialized project configuration in {}", dir.display()));
        println!();
        println!("Next steps:");
        println!("  1. Set OPENAI_API_KEY (or llm.api_key in the config)");
        println!("  2. Run 'briefsmith run <notes-file>' to build a lesson pack");
        println!("  3. Enable [publish] in {} to push packs to Google Docs", dir.join("config.toml").display());
    }

    Ok(())
}
