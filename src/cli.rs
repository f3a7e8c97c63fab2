//! Command line interface for the `wirelink` demo binary.
//!
//! The binary pushes one message across an in-memory link with simulated
//! loss so the retransmission behaviour can be observed from a shell.

use clap::Parser;

/// Command line arguments for the `wirelink` binary.
#[derive(Debug, Parser)]
#[command(
    name = "wirelink",
    version,
    about = "Send text across a simulated lossy link"
)]
pub struct Cli {
    /// Text to send. Read from standard input when omitted.
    #[arg(short, long)]
    pub text: Option<String>,

    /// Maximum text bytes per fragment.
    #[arg(long, default_value_t = 512)]
    pub fragment_bytes: usize,

    /// Milliseconds to wait for an acknowledgment before resending.
    #[arg(long, default_value_t = 1_500)]
    pub ack_timeout_ms: u64,

    /// Retransmissions allowed per fragment.
    #[arg(long, default_value_t = 5)]
    pub max_retries: u32,

    /// Drop every Nth frame in each direction; 0 disables loss.
    #[arg(long, default_value_t = 0)]
    pub drop_every: usize,

    /// Frames each direction can queue before the link reports busy.
    #[arg(long, default_value_t = 16)]
    pub capacity: usize,
}
