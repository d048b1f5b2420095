use anyhow::Result;
use codab::CldrExemplars;

use crate::cli::{Cli, CountryArgs};

use super::{data_dir, load_config};

pub fn run(cli: &Cli, args: &CountryArgs) -> Result<()> {
    let config = load_config(cli)?;
    let exemplars = CldrExemplars::builtin()?;
    let iso3 = args.iso3.to_ascii_uppercase();

    match codab::checks::main(&iso3, &data_dir(cli), &config, &exemplars)? {
        Some(table) => eprintln!("[checks] {iso3}: {} admin levels checked", table.height()),
        None => eprintln!("[checks] {iso3}: no boundary layers found"),
    }
    Ok(())
}
