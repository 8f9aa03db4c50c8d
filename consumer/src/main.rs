use std::error::Error;
use std::time::Instant;

use clap::Parser;
use serde_derive::{Deserialize, Serialize};

use workq::{CancelToken, QueueConfig, QueueError};

#[derive(Parser)]
struct Opts {
    #[clap(short = 'c', long = "config", default_value = "workq-consumer.toml")]
    config: String,
    /// Delete the queue from the system after draining it.
    #[clap(long)]
    delete: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ConsumerConfig {
    queue: QueueConfig,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let opts: Opts = Opts::parse();
    let cfg: ConsumerConfig = confy::load_path(&opts.config)?;

    let mut queue = cfg.queue.open()?;
    println!(
        "consuming from queue: key={} msg_size={}B max_len={}",
        queue.key(),
        queue.msg_size(),
        queue.max_len()
    );

    let cancel = CancelToken::on_termination()?;
    let result = run(&queue, &cancel);
    if opts.delete {
        queue.delete()?;
    }
    queue.close()?;
    result
}

fn run(queue: &workq::Queue, cancel: &CancelToken) -> Result<(), Box<dyn Error>> {
    let mut msg = vec![0u8; queue.msg_size() as usize];
    let start = Instant::now();
    let mut received = 0u64;

    loop {
        match queue.dequeue_block(cancel, &mut msg) {
            Ok(()) => received += 1,
            Err(QueueError::Cancelled) => break,
            Err(e) => return Err(Box::new(e)),
        }
        if received % 1_000_000 == 0 {
            eprint!("\rtotal {} messages", received);
        }
    }

    let duration = start.elapsed();
    let iops = (received as f64) / duration.as_secs_f64();
    println!(
        "\nreceived {} messages, {:.0}K msg/s, time: {:?}",
        received,
        iops / 1000.0,
        duration
    );
    Ok(())
}
