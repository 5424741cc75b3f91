/// Computes the block order needed to hold `size` bytes.
///
/// The order is the smallest `k` such that `2^k` blocks of `block_size`
/// bytes accommodate `size`. Sizes of `0` and `1` map to order `0`; rejecting
/// degenerate requests is left to the caller, as is rejecting orders that do
/// not fit the tree.
///
/// When the block count cannot be rounded up to a power of two without
/// overflowing, `usize::BITS` is returned, which no tree can hold.
///
/// # Examples
///
/// ```rust
/// use rbuddy::order_of;
///
/// assert_eq!(order_of(100, 1024), 0);
/// assert_eq!(order_of(1024, 1024), 0);
/// assert_eq!(order_of(1025, 1024), 1);
/// assert_eq!(order_of(4096, 1024), 2);
/// ```
pub const fn order_of(
  size: usize,
  block_size: usize,
) -> usize {
  if size <= 1 {
    return 0;
  }

  let blocks = size.div_ceil(block_size);

  match blocks.checked_next_power_of_two() {
    Some(rounded) => rounded.trailing_zeros() as usize,
    None => usize::BITS as usize,
  }
}

/// Byte size of a block of the given order.
#[inline]
pub const fn block_bytes(
  order: usize,
  block_size: usize,
) -> usize {
  (1 << order) * block_size
}
