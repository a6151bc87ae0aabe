use std::time::Duration;

use clap::Parser;
use log::info;
use segbuf::BufferConfig;

mod datagram;
mod endpoint;
mod link;
mod sim;

use link::LinkConfig;
use sim::SimConfig;

/// Simulated transfer over a lossy, reordering, duplicating link
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Number of segments to transfer
    #[arg(long, default_value_t = 200)]
    segments: usize,

    /// Bytes per segment
    #[arg(long, default_value_t = 512)]
    segment_size: usize,

    /// Initial congestion window in segments
    #[arg(long, default_value_t = segbuf::DEFAULT_WINDOW_SIZE)]
    window: usize,

    /// Probability that a datagram is dropped
    #[arg(long, default_value_t = 0.1)]
    loss: f64,

    /// Probability that a datagram is duplicated
    #[arg(long, default_value_t = 0.02)]
    duplicate: f64,

    /// Probability that a datagram is reordered
    #[arg(long, default_value_t = 0.05)]
    reorder: f64,

    /// Seed for the fault model
    #[arg(long, default_value_t = 7)]
    seed: u64,

    /// Retransmission timeout in milliseconds
    #[arg(long, default_value_t = 20)]
    rto_ms: u64,
}

impl Args {
    fn into_config(self) -> SimConfig {
        SimConfig {
            segments: self.segments,
            segment_size: self.segment_size,
            buffer: BufferConfig::new().with_window_size(self.window),
            link: LinkConfig {
                loss_rate: self.loss,
                duplicate_rate: self.duplicate,
                reorder_rate: self.reorder,
                ..LinkConfig::default()
            },
            seed: self.seed,
            rto: Duration::from_millis(self.rto_ms),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Args::parse().into_config();
    info!(
        "Transferring {} x {} bytes, window {}, loss {}, seed {}",
        config.segments,
        config.segment_size,
        config.buffer.window_size,
        config.link.loss_rate,
        config.seed
    );

    let report = sim::run(&config).await?;
    let sender = &report.sender;
    let receiver = &report.receiver;
    let bytes = config.segments * config.segment_size;

    info!("=== Transfer Complete ===");
    info!("Total delivered: {} KB", bytes / 1024);
    info!("Time: {:.2} seconds", report.elapsed.as_secs_f64());
    info!(
        "Speed: {:.2} KB/s",
        (bytes as f64 / 1024.0) / report.elapsed.as_secs_f64()
    );
    info!(
        "Retransmissions: {} ({:.1}%), timeouts: {}",
        sender.stats.retransmissions,
        sender.stats.retransmit_rate(),
        sender.timeouts
    );
    info!(
        "Window: {} increases, {} decreases, final {}",
        sender.stats.window_increases, sender.stats.window_decreases, sender.final_window
    );
    info!(
        "Acks: {} received, {} duplicate",
        sender.stats.acks_received, sender.stats.duplicate_acks
    );
    info!(
        "Receiver: {} duplicates dropped ({:.1}%)",
        receiver.stats.duplicates,
        receiver.stats.duplicate_rate()
    );
    info!(
        "Data link: {} sent, {} dropped, {} duplicated, {} reordered",
        sender.link.sent, sender.link.dropped, sender.link.duplicated, sender.link.reordered
    );
    info!(
        "Ack link: {} sent, {} dropped, {} duplicated, {} reordered",
        receiver.link.sent, receiver.link.dropped, receiver.link.duplicated, receiver.link.reordered
    );

    Ok(())
}
