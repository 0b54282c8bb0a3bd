use clap::Parser;
use std::path::PathBuf;

/// Serves the phone battery estimator form and prediction API.
#[derive(Parser, Clone, Debug)]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// YAML configuration file, created with defaults when missing
    #[arg(
        short = 'c',
        long = "config",
        value_name = "CONFIG_PATH",
        default_value = "config.yaml"
    )]
    pub config_path: PathBuf,
}
