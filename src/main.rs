//! Demo binary for `wirelink`.
//!
//! Sends one message from a segmenter to a reassembler over an in-memory
//! link and reports what each side observed.

mod cli;

use std::{io::Read, num::NonZeroUsize, process::ExitCode, time::Duration};

use clap::Parser;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use wirelink::{
    Delivery,
    DeliveryOutcome,
    LinkConfig,
    Reassembler,
    Segmenter,
    config::ConfigError,
    memory_link,
};

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    // Applications embedding the library should install their own subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = cli::Cli::parse();
    let text = match cli.text {
        Some(text) => text,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let fragment_bytes = NonZeroUsize::new(cli.fragment_bytes)
        .ok_or(ConfigError::FragmentTooSmall(cli.fragment_bytes))?;
    let config = LinkConfig::default()
        .with_max_fragment_bytes(fragment_bytes)
        .with_ack_timeout(Duration::from_millis(cli.ack_timeout_ms))
        .with_max_retries(cli.max_retries);
    config.validate()?;

    let (phone, watch) = memory_link(cli.capacity.max(1), config.encoded_fragment_ceiling());
    phone.channel.drop_every(cli.drop_every);
    watch.channel.drop_every(cli.drop_every);

    let (events, mut received) = mpsc::unbounded_channel();
    let mut reassembler = Reassembler::new(watch.channel, events, config)?;
    let shutdown = CancellationToken::new();
    let receiver = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { reassembler.run(watch.inbound, shutdown).await }
    });

    let phone_channel = phone.channel.clone();
    let mut segmenter = Segmenter::new(phone.channel, phone.inbound, config)?;
    let outcome = segmenter.send(&text).await?;

    shutdown.cancel();
    receiver.await?;

    println!(
        "sender: {outcome:?} after {} frame(s), {} lost",
        phone_channel.transmitted(),
        phone_channel.dropped()
    );
    while let Some(event) = received.recv().await {
        match event {
            Delivery::Complete { message_id, text } => {
                println!("receiver: message {message_id} complete ({} bytes)", text.len());
            }
            Delivery::Failed { message_id, reason } => {
                println!("receiver: message {message_id} failed: {reason}");
            }
        }
    }

    Ok(match outcome {
        DeliveryOutcome::Delivered(_) => ExitCode::SUCCESS,
        DeliveryOutcome::Failed(..) => ExitCode::FAILURE,
    })
}
