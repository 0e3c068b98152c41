use std::{path::PathBuf, time::Duration};

use clap::Parser;

use crate::session::RecordingTarget;

pub const DEFAULT_BASE_URL: &str = "https://twitcasting.tv";
pub const DEFAULT_PROBE_URL: &str = "https://www.google.com";
pub const DEFAULT_ORIGIN: &str = "https://twitcasting.tv/";

/// Watch a TwitCasting broadcaster and record every live stream.
#[derive(Parser, Debug)]
#[command(name = "twitcast-rec", version, about)]
pub struct Args {
    /// Broadcaster to watch
    pub target: RecordingTarget,

    /// Seconds to wait between polls
    #[arg(default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: u64,

    /// Root directory for recordings
    #[arg(long, env = "TWITCAST_REC_OUTPUT_DIR", default_value = "record_video")]
    pub output_dir: PathBuf,

    /// Base URL of the status endpoint
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// URL fetched to check network connectivity
    #[arg(long, default_value = DEFAULT_PROBE_URL)]
    pub probe_url: String,

    /// Origin header sent when opening the stream
    #[arg(long, default_value = DEFAULT_ORIGIN)]
    pub origin: String,

    /// HTTP request timeout in seconds
    #[arg(long, default_value_t = 10)]
    pub timeout: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub target: RecordingTarget,
    pub interval: Duration,
    pub output_dir: PathBuf,
    pub base_url: String,
    pub probe_url: String,
    pub origin: String,
    pub timeout: Duration,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            target: args.target,
            interval: Duration::from_secs(args.interval),
            output_dir: args.output_dir,
            base_url: args.base_url,
            probe_url: args.probe_url,
            origin: args.origin,
            timeout: Duration::from_secs(args.timeout),
        }
    }
}
