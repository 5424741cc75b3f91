use std::ptr::NonNull;

use tracing::{debug, trace};

use crate::{
  address::AddressMapper,
  dump::TreeDump,
  error::{BuddyError, Result},
  order::{block_bytes, order_of},
  region::{MmapProvider, RegionProvider},
  tree::{BlockTree, ROOT, buddy, left, parent},
};

/// Bytes in an order-0 block unless configured otherwise.
pub const DEFAULT_BLOCK_SIZE: usize = 1024;

/// Depth of the tree unless configured otherwise (a 2 MiB region).
pub const DEFAULT_MAX_ORDER: usize = 11;

pub type DefaultBuddyAllocator = BuddyAllocator<DEFAULT_BLOCK_SIZE, DEFAULT_MAX_ORDER>;

/// Occupancy summary of an allocator's region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuddyStats {
  pub capacity: usize,
  pub allocated_bytes: usize,
  pub free_bytes: usize,
  pub allocated_blocks: usize,
  pub free_blocks: usize,
  pub largest_free_order: Option<usize>,
}

/// The region together with the tree that partitions it.
struct Heap {
  base: NonNull<u8>,
  tree: BlockTree,
}

impl Heap {
  fn offset_of(
    &self,
    address: *const u8,
    heap_size: usize,
  ) -> Option<usize> {
    let offset = (address as usize).checked_sub(self.base.as_ptr() as usize)?;
    (offset < heap_size).then_some(offset)
  }
}

/// Binary buddy allocator over a single region of
/// `BLOCK_SIZE * 2^MAX_ORDER` bytes.
///
/// The region is requested from `P` on the first allocation and handed back
/// when the allocator is dropped. Requests are served with blocks of order
/// `0` up to `MAX_ORDER - 1`; the whole region is never handed out as one
/// block.
///
/// The allocator is not thread-safe. Share it behind a single lock.
pub struct BuddyAllocator<const BLOCK_SIZE: usize, const MAX_ORDER: usize, P: RegionProvider = MmapProvider> {
  provider: P,
  heap: Option<Heap>,
}

impl<const BLOCK_SIZE: usize, const MAX_ORDER: usize> BuddyAllocator<BLOCK_SIZE, MAX_ORDER> {
  pub fn new() -> Self {
    Self::with_provider(MmapProvider)
  }
}

impl<const BLOCK_SIZE: usize, const MAX_ORDER: usize> Default for BuddyAllocator<BLOCK_SIZE, MAX_ORDER> {
  fn default() -> Self {
    Self::new()
  }
}

impl<const BLOCK_SIZE: usize, const MAX_ORDER: usize, P: RegionProvider> BuddyAllocator<BLOCK_SIZE, MAX_ORDER, P> {
  /// Size of the managed region in bytes.
  pub const HEAP_SIZE: usize = {
    assert!(BLOCK_SIZE.is_power_of_two(), "BLOCK_SIZE must be a power of two");
    assert!(MAX_ORDER > 0, "MAX_ORDER must be at least 1");
    assert!(MAX_ORDER < usize::BITS as usize - 1, "MAX_ORDER exceeds the pointer width");

    match BLOCK_SIZE.checked_mul(1 << MAX_ORDER) {
      Some(size) => size,
      None => panic!("BLOCK_SIZE * 2^MAX_ORDER overflows usize"),
    }
  };

  const MAPPER: AddressMapper = AddressMapper::new(BLOCK_SIZE, MAX_ORDER);

  pub fn with_provider(provider: P) -> Self {
    let _ = Self::HEAP_SIZE;

    Self { provider, heap: None }
  }

  /// Hands out a block of at least `size` bytes.
  ///
  /// The returned address is aligned to the block size relative to the
  /// region base.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> Result<NonNull<u8>> {
    if size == 0 {
      debug!(size, "rejecting zero-size request");
      return Err(BuddyError::InvalidRequest { size });
    }

    let order = order_of(size, BLOCK_SIZE);

    if order >= MAX_ORDER {
      debug!(size, order, "rejecting oversized request");
      return Err(BuddyError::OversizedRequest {
        size,
        order,
        max_order: MAX_ORDER,
      });
    }

    let heap = self.heap()?;

    let position = match heap.tree.exact_fit(order) {
      Some(position) => position,
      None => {
        let Some(mut position) = heap.tree.closest_fit(order) else {
          debug!(size, order, "out of memory");
          return Err(BuddyError::OutOfMemory { size, order });
        };

        while heap.tree.node(position).order > order {
          heap.tree.split(position);
          position = left(position);
        }

        position
      }
    };

    heap.tree.set_allocated(position, true);

    let offset = Self::MAPPER.position_to_offset(&heap.tree, position);
    trace!(size, order, position, offset, "allocated block");

    // SAFETY: `offset` lies inside the region, which spans `HEAP_SIZE` bytes.
    Ok(unsafe { heap.base.add(offset) })
  }

  /// Returns the block starting at `address` to the allocator.
  ///
  /// Addresses outside the region, null included, are ignored. An address
  /// inside the region that does not start an allocated block is rejected
  /// without touching the tree.
  pub fn release(
    &mut self,
    address: *mut u8,
  ) -> Result<()> {
    let Some(heap) = self.heap.as_mut() else {
      trace!(?address, "ignoring release before the region exists");
      return Ok(());
    };

    let Some(offset) = heap.offset_of(address, Self::HEAP_SIZE) else {
      trace!(?address, "ignoring release outside the region");
      return Ok(());
    };

    let mut position = Self::MAPPER.offset_to_position(&heap.tree, offset, ROOT);

    if Self::MAPPER.position_to_offset(&heap.tree, position) != offset {
      debug!(?address, offset, "release does not match a block boundary");
      return Err(BuddyError::InvalidRelease {
        address: address as usize,
        reason: "not the start of a block",
      });
    }

    if !heap.tree.node(position).is_allocated {
      debug!(?address, offset, "release of a free block");
      return Err(BuddyError::InvalidRelease {
        address: address as usize,
        reason: "block is not allocated",
      });
    }

    heap.tree.set_allocated(position, false);
    trace!(offset, position, "released block");

    while position != ROOT && heap.tree.node(buddy(position)).is_free_leaf() {
      position = parent(position);
      heap.tree.coalesce(position);
    }

    Ok(())
  }

  /// Size of the allocated block starting at `address`, if there is one.
  pub fn usable_size(
    &self,
    address: *const u8,
  ) -> Option<usize> {
    let heap = self.heap.as_ref()?;
    let offset = heap.offset_of(address, Self::HEAP_SIZE)?;
    let position = Self::MAPPER.offset_to_position(&heap.tree, offset, ROOT);
    let node = heap.tree.node(position);

    (node.is_allocated && Self::MAPPER.position_to_offset(&heap.tree, position) == offset)
      .then(|| block_bytes(node.order, BLOCK_SIZE))
  }

  /// Whether `address` falls inside the managed region.
  pub fn contains(
    &self,
    address: *const u8,
  ) -> bool {
    self
      .heap
      .as_ref()
      .is_some_and(|heap| heap.offset_of(address, Self::HEAP_SIZE).is_some())
  }

  /// Base of the region, once it has been acquired.
  pub fn base(&self) -> Option<NonNull<u8>> {
    self.heap.as_ref().map(|heap| heap.base)
  }

  /// The block tree, once the region has been acquired.
  pub fn tree(&self) -> Option<&BlockTree> {
    self.heap.as_ref().map(|heap| &heap.tree)
  }

  /// Diagnostic listing of the tree, once the region has been acquired.
  pub fn dump(&self) -> Option<TreeDump<'_>> {
    self.tree().map(|tree| TreeDump::new(tree, Self::MAPPER))
  }

  pub fn stats(&self) -> BuddyStats {
    let mut stats = BuddyStats {
      capacity: Self::HEAP_SIZE,
      allocated_bytes: 0,
      free_bytes: 0,
      allocated_blocks: 0,
      free_blocks: 0,
      largest_free_order: None,
    };

    let Some(tree) = self.tree() else {
      stats.free_bytes = Self::HEAP_SIZE;
      stats.free_blocks = 1;
      stats.largest_free_order = Some(MAX_ORDER);
      return stats;
    };

    for (_, node) in tree.leaves() {
      let bytes = block_bytes(node.order, BLOCK_SIZE);

      if node.is_allocated {
        stats.allocated_bytes += bytes;
        stats.allocated_blocks += 1;
      } else {
        stats.free_bytes += bytes;
        stats.free_blocks += 1;
        stats.largest_free_order = stats.largest_free_order.max(Some(node.order));
      }
    }

    stats
  }

  fn heap(&mut self) -> Result<&mut Heap> {
    let heap = match self.heap.take() {
      Some(heap) => heap,
      None => {
        let base = self.provider.acquire_region(Self::HEAP_SIZE)?;
        debug!(?base, bytes = Self::HEAP_SIZE, "acquired region");

        Heap {
          base,
          tree: BlockTree::new(MAX_ORDER),
        }
      }
    };

    Ok(self.heap.insert(heap))
  }
}

impl<const BLOCK_SIZE: usize, const MAX_ORDER: usize, P: RegionProvider> Drop
  for BuddyAllocator<BLOCK_SIZE, MAX_ORDER, P>
{
  fn drop(&mut self) {
    if let Some(heap) = self.heap.take() {
      debug!(base = ?heap.base, bytes = Self::HEAP_SIZE, "releasing region");
      unsafe { self.provider.release_region(heap.base, Self::HEAP_SIZE) };
    }
  }
}
