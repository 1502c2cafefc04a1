//! Setup/initialization module - handles application startup tasks
//!
//! Includes:
//! - Logger initialization
//! - Preview folder initialization

use anyhow::{Context, Result};
use env_logger::{Builder, Env};
use std::io::Write;
use std::path::Path;

/// Initialize the logger. `RUST_LOG` overrides the default `info` filter.
pub fn initialize_logger() {
    let _ = Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let level_style = buf.default_level_style(record.level());
            writeln!(
                buf,
                "{} {}{}{} {} {}",
                buf.timestamp(),
                level_style.render(),
                record.level(),
                level_style.render_reset(),
                record.target(),
                record.args()
            )
        })
        .try_init();
}

/// Create the folder structure required before the first entry is added.
pub fn initialize_folder(preview_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(preview_dir)
        .context(format!("failed to create preview directory {:?}", preview_dir))?;
    Ok(())
}
