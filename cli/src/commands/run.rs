use anyhow::Result;
use codab::{discover_countries, process_country, CldrExemplars};
use tracing::error;

use crate::cli::{Cli, RunArgs};

use super::{data_dir, load_config};

/// Process each country in turn. A failing country is logged and skipped.
pub fn run(cli: &Cli, args: &RunArgs) -> Result<()> {
    let config = load_config(cli)?;
    let exemplars = CldrExemplars::builtin()?;
    let data_dir = data_dir(cli);

    let countries = if args.iso3.is_empty() {
        discover_countries(&data_dir)?
    } else {
        args.iso3.iter().map(|c| c.to_ascii_uppercase()).collect()
    };

    for iso3 in countries {
        match process_country(&iso3, &data_dir, &config, &exemplars) {
            Ok(report) => println!("{} Score: {}", report.iso3, report.score),
            Err(e) => error!(iso3 = %iso3, error = %format!("{e:#}"), "country failed"),
        }
    }
    Ok(())
}
