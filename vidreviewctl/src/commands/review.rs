use clap::{Args, Subcommand};

#[derive(Subcommand, Debug, Clone)]
pub enum ReviewCommands {
    /// Marks a video as accepted
    Accept(ReviewArgs),
    /// Marks a video as rejected
    Reject(ReviewArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ReviewArgs {
    /// Backend video id
    pub id: i64,
}
