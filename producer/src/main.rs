use std::error::Error;
use std::time::Instant;

use clap::Parser;
use serde_derive::{Deserialize, Serialize};

use workq::{CancelToken, QueueConfig, QueueError};

#[derive(Parser)]
struct Opts {
    #[clap(short = 'c', long = "config", default_value = "workq-producer.toml")]
    config: String,
    /// Overwrite the oldest message instead of waiting when the queue is full.
    #[clap(long)]
    cyclic: bool,
    /// Stop after this many messages (0 = until terminated).
    #[clap(short = 'n', long, default_value = "0")]
    count: u64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ProducerConfig {
    queue: QueueConfig,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let opts: Opts = Opts::parse();
    let cfg: ProducerConfig = confy::load_path(&opts.config)?;

    let mut queue = cfg.queue.create()?;
    println!(
        "producing to queue: key={} msg_size={}B max_len={}",
        queue.key(),
        queue.msg_size(),
        queue.max_len()
    );

    let cancel = CancelToken::on_termination()?;
    let result = run(&queue, &cancel, &opts);
    queue.close()?;
    result
}

fn run(queue: &workq::Queue, cancel: &CancelToken, opts: &Opts) -> Result<(), Box<dyn Error>> {
    let mut msg = vec![0u8; queue.msg_size() as usize];
    let start = Instant::now();
    let mut sent = 0u64;

    while opts.count == 0 || sent < opts.count {
        msg[..8].copy_from_slice(&sent.to_le_bytes());
        if opts.cyclic {
            if cancel.is_cancelled() {
                break;
            }
            queue.enqueue_shift(&msg);
        } else {
            match queue.enqueue_block(cancel, &msg) {
                Ok(()) => {}
                Err(QueueError::Cancelled) => break,
                Err(e) => return Err(Box::new(e)),
            }
        }
        sent += 1;
        if sent % 1_000_000 == 0 {
            eprint!("\rtotal {} messages", sent);
        }
    }

    let duration = start.elapsed();
    let iops = (sent as f64) / duration.as_secs_f64();
    println!(
        "\nsent {} messages, {:.0}K msg/s, time: {:?}",
        sent,
        iops / 1000.0,
        duration
    );
    Ok(())
}
