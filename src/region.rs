//! Sources of backing memory for an allocator.

use std::{
  alloc::{self, Layout},
  ptr::{self, NonNull},
};

use libc::{MAP_ANONYMOUS, MAP_FAILED, MAP_PRIVATE, PROT_READ, PROT_WRITE, c_void, mmap, munmap};
use tracing::debug;

use crate::error::{BuddyError, Result};

/// Hands out the single contiguous region an allocator manages.
///
/// # Safety
///
/// A successful `acquire_region` must return `byte_count` bytes, readable
/// and writable, that nothing else uses until the same range is passed back
/// to `release_region`.
pub unsafe trait RegionProvider {
  fn acquire_region(
    &self,
    byte_count: usize,
  ) -> Result<NonNull<u8>>;

  /// Returns a region obtained from `acquire_region`.
  ///
  /// # Safety
  ///
  /// `base` and `byte_count` must come from a prior `acquire_region` call on
  /// this provider, and the region must not be used afterwards.
  unsafe fn release_region(
    &self,
    base: NonNull<u8>,
    byte_count: usize,
  );
}

/// Anonymous private mappings obtained with `mmap(2)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MmapProvider;

unsafe impl RegionProvider for MmapProvider {
  fn acquire_region(
    &self,
    byte_count: usize,
  ) -> Result<NonNull<u8>> {
    let address = unsafe {
      mmap(
        ptr::null_mut(),
        byte_count,
        PROT_READ | PROT_WRITE,
        MAP_PRIVATE | MAP_ANONYMOUS,
        -1,
        0,
      )
    };

    if address == MAP_FAILED {
      return Err(BuddyError::RegionUnavailable { bytes: byte_count });
    }

    NonNull::new(address as *mut u8).ok_or(BuddyError::RegionUnavailable { bytes: byte_count })
  }

  unsafe fn release_region(
    &self,
    base: NonNull<u8>,
    byte_count: usize,
  ) {
    let status = unsafe { munmap(base.as_ptr() as *mut c_void, byte_count) };

    if status != 0 {
      debug!(?base, byte_count, "munmap failed");
    }
  }
}

/// Regions taken from the global Rust allocator, zero-filled.
#[derive(Debug, Clone, Copy)]
pub struct HeapProvider {
  align: usize,
}

impl HeapProvider {
  /// # Panics
  ///
  /// Panics if `align` is not a power of two.
  pub fn new(align: usize) -> Self {
    assert!(align.is_power_of_two(), "alignment {align} is not a power of two");
    Self { align }
  }
}

impl Default for HeapProvider {
  fn default() -> Self {
    Self::new(4096)
  }
}

unsafe impl RegionProvider for HeapProvider {
  fn acquire_region(
    &self,
    byte_count: usize,
  ) -> Result<NonNull<u8>> {
    let unavailable = BuddyError::RegionUnavailable { bytes: byte_count };

    if byte_count == 0 {
      return Err(unavailable);
    }

    let layout = Layout::from_size_align(byte_count, self.align).map_err(|_| unavailable)?;

    NonNull::new(unsafe { alloc::alloc_zeroed(layout) }).ok_or(unavailable)
  }

  unsafe fn release_region(
    &self,
    base: NonNull<u8>,
    byte_count: usize,
  ) {
    unsafe {
      let layout = Layout::from_size_align_unchecked(byte_count, self.align);
      alloc::dealloc(base.as_ptr(), layout);
    }
  }
}
