use clap::Args;

/// One-off status lookup.
#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    /// Video ids to look up
    #[arg(required = true, value_delimiter = ',')]
    pub ids: Vec<i64>,
}

/// Polls until interrupted and prints only rows whose state changed.
#[derive(Args, Debug, Clone)]
pub struct WatchArgs {
    #[arg(required = true, value_delimiter = ',')]
    pub ids: Vec<i64>,
    /// Seconds between polls; defaults to polling.interval_seconds
    #[arg(long)]
    pub interval: Option<u64>,
    /// Stops after this many successful polls
    #[arg(long)]
    pub max_polls: Option<usize>,
    /// Stops once every video finished processing
    #[arg(long, default_value_t = false)]
    pub until_settled: bool,
}

#[derive(Args, Debug, Clone)]
pub struct PlaybackArgs {
    /// Backend video id
    pub id: i64,
}
