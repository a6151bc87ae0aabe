//! One simulated transfer: a sender task and a receiver task joined by two
//! lossy links.

use std::time::{Duration, Instant};

use anyhow::{ensure, Result};
use segbuf::{BufferConfig, RecvBuffer, SendBuffer};

use crate::endpoint::{self, ReceiverSummary, SenderSummary};
use crate::link::{self, LinkConfig};

/// Parameters of a simulated transfer.
#[derive(Debug, Clone)]
pub struct SimConfig {
    pub segments: usize,
    pub segment_size: usize,
    pub buffer: BufferConfig,
    pub link: LinkConfig,
    pub seed: u64,
    pub rto: Duration,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            segments: 200,
            segment_size: 512,
            buffer: BufferConfig::default(),
            link: LinkConfig::default(),
            seed: 7,
            rto: Duration::from_millis(20),
        }
    }
}

/// Outcome of a transfer whose delivered data matched what was sent.
#[derive(Debug, Clone)]
pub struct SimReport {
    pub sender: SenderSummary,
    pub receiver: ReceiverSummary,
    pub elapsed: Duration,
}

/// Payload of segment `index`: a byte pattern unique to its position.
fn payload(index: usize, size: usize) -> Vec<u8> {
    (0..size).map(|j| (index * 31 + j) as u8).collect()
}

/// Runs a transfer and checks that every payload arrived once, in order.
pub async fn run(config: &SimConfig) -> Result<SimReport> {
    config.link.validate()?;

    let (data_link, data_rx) = link::channel(config.link.clone(), config.seed);
    let (ack_link, ack_rx) = link::channel(config.link.clone(), config.seed.wrapping_add(1));

    let mut send_buffer = SendBuffer::with_config(&config.buffer);
    for index in 0..config.segments {
        send_buffer.enqueue(payload(index, config.segment_size));
    }
    let recv_buffer = RecvBuffer::with_config(&config.buffer);

    let start = Instant::now();
    let sender = tokio::spawn(endpoint::run_sender(send_buffer, data_link, ack_rx, config.rto));
    let receiver = tokio::spawn(endpoint::run_receiver(recv_buffer, ack_link, data_rx));
    let (sender, receiver) = tokio::join!(sender, receiver);
    let elapsed = start.elapsed();

    let sender = sender??;
    let receiver = receiver?;

    ensure!(
        receiver.delivered.len() == config.segments,
        "Delivered {} segments, expected {}",
        receiver.delivered.len(),
        config.segments
    );
    for (index, data) in receiver.delivered.iter().enumerate() {
        ensure!(
            *data == payload(index, config.segment_size),
            "Segment {} delivered corrupted or out of order",
            index
        );
    }

    Ok(SimReport {
        sender,
        receiver,
        elapsed,
    })
}
