use std::path::PathBuf;

/// COD-AB quality checks and scoring CLI
#[derive(clap::Parser, Debug)]
#[command(name = "codab", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// TOML configuration file; unset keys keep their defaults
    #[arg(short, long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Directory holding one `<iso3>/` folder per country, defaults to "./data"
    #[arg(short, long, global = true, value_hint = clap::ValueHint::DirPath)]
    pub data_dir: Option<PathBuf>,

    /// Deepest admin level to look for (overrides the configuration)
    #[arg(long, global = true)]
    pub admin_levels: Option<u8>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Run the checks for one country and write `<iso3>_checks.csv`
    Checks(CountryArgs),

    /// Score an existing checks table and write `<iso3>_scores.csv`
    Scores(CountryArgs),

    /// Check and score countries, printing each composite score
    Run(RunArgs),
}

#[derive(clap::Args, Debug)]
pub struct CountryArgs {
    /// Three-letter country code, e.g. AFG
    pub iso3: String,
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Country codes to process; every country folder in the data directory if none
    pub iso3: Vec<String>,
}
