use thiserror::Error;

/// Failures reported by the allocator.
///
/// A failed call never changes the block tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BuddyError {
  /// The request needs an order the tree cannot hold.
  #[error("request of {size} bytes needs order {order}, largest allocatable order is {}", .max_order - 1)]
  OversizedRequest {
    size: usize,
    order: usize,
    max_order: usize,
  },

  /// No free block of a sufficient order exists.
  #[error("out of memory: no free block for {size} bytes (order {order})")]
  OutOfMemory { size: usize, order: usize },

  /// Zero-byte requests are rejected.
  #[error("invalid request of {size} bytes")]
  InvalidRequest { size: usize },

  /// An address inside the region that does not start an allocated block.
  #[error("invalid release of {address:#x}: {reason}")]
  InvalidRelease { address: usize, reason: &'static str },

  /// The region provider could not supply the backing memory.
  #[error("unable to acquire a region of {bytes} bytes")]
  RegionUnavailable { bytes: usize },
}

pub type Result<T> = core::result::Result<T, BuddyError>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_messages() {
    let oversized = BuddyError::OversizedRequest {
      size: 4096,
      order: 2,
      max_order: 2,
    };
    assert_eq!(
      "request of 4096 bytes needs order 2, largest allocatable order is 1",
      oversized.to_string()
    );

    let release = BuddyError::InvalidRelease {
      address: 0x1010,
      reason: "not the start of a block",
    };
    assert_eq!("invalid release of 0x1010: not the start of a block", release.to_string());
  }
}
