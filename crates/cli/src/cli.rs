use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "tbg-chat")]
#[command(about = "Terminal client for the TBG forums chat")]
#[command(version)]
pub struct Cli {
    /// Forum username (prompted for when missing)
    pub username: Option<String>,

    /// Forum password (prompted for when missing)
    #[arg(long, env = "TBG_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Load forum settings from a JSON file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Seconds between polls of the chat
    #[arg(long, default_value = "1")]
    pub interval: f64,
}

impl Cli {
    pub fn interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.interval).unwrap_or(Duration::from_secs(1))
    }
}
