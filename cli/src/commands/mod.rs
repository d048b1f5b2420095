pub mod checks;
pub mod run;
pub mod scores;

use std::path::PathBuf;

use anyhow::Result;
use codab::Config;

use crate::cli::Cli;

/// Configuration from `--config`, with `--admin-levels` applied on top.
pub fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_path(path)?,
        None => Config::default(),
    };
    if let Some(levels) = cli.admin_levels {
        config.admin_levels = levels;
    }
    Ok(config)
}

#[inline]
pub fn data_dir(cli: &Cli) -> PathBuf {
    cli.data_dir.clone().unwrap_or_else(|| "./data".into())
}
