use anyhow::Result;

use crate::cli::{Cli, CountryArgs};

use super::{data_dir, load_config};

pub fn run(cli: &Cli, args: &CountryArgs) -> Result<()> {
    let config = load_config(cli)?;
    let iso3 = args.iso3.to_ascii_uppercase();

    let score = codab::scores::main(&iso3, &data_dir(cli), &config)?;
    println!("{iso3} Score: {score}");
    Ok(())
}
