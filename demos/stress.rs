use rand::{Rng, SeedableRng, rngs::StdRng, seq::SliceRandom};
use rbuddy::DefaultBuddyAllocator;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Blocks allocated per round.
const BLOCKS_PER_ROUND: usize = 16;

/// Requests are drawn from `0..MAX_REQUEST` bytes.
const MAX_REQUEST: usize = 64 * 1024;

/// Runs randomized allocate/release rounds against a default allocator.
///
/// Usage: `cargo run --example stress -- [seed] [rounds]`
fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let mut args = std::env::args().skip(1);
  let seed: u64 = args.next().and_then(|arg| arg.parse().ok()).unwrap_or(0);
  let rounds: usize = args.next().and_then(|arg| arg.parse().ok()).unwrap_or(100);

  info!(seed, rounds, "testing buddy allocator");

  let mut allocator = DefaultBuddyAllocator::new();
  let mut rng = StdRng::seed_from_u64(seed);
  let mut failures = 0;

  for round in 0..rounds {
    let mut blocks = Vec::with_capacity(BLOCKS_PER_ROUND);

    for _ in 0..BLOCKS_PER_ROUND {
      let size = rng.random_range(0..MAX_REQUEST);

      match allocator.allocate(size) {
        Ok(address) => {
          unsafe { address.as_ptr().write_bytes(round as u8, size) };
          blocks.push(address);
        }
        Err(error) => {
          debug!(round, size, %error, "allocation failed");
          failures += 1;
        }
      }
    }

    if let Some(dump) = allocator.dump() {
      debug!(round, "tree after allocating:\n{dump}");
    }

    blocks.shuffle(&mut rng);

    for address in blocks {
      if let Err(error) = allocator.release(address.as_ptr()) {
        warn!(round, %error, "release failed");
      }
    }

    if !allocator.tree().is_none_or(|tree| tree.is_pristine()) {
      warn!(round, "tree did not return to a single free block");
    }
  }

  info!(failures, stats = ?allocator.stats(), "done");
}
