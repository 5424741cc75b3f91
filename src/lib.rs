//! # rbuddy - A Binary Buddy Memory Allocator
//!
//! This crate provides a fixed-capacity **binary buddy allocator**: it manages
//! one contiguous region of memory, carves it into power-of-two sized blocks
//! and serves requests by splitting and coalescing those blocks.
//!
//! ## Overview
//!
//! The region holds `2^MAX_ORDER` blocks of `BLOCK_SIZE` bytes. Every block
//! has an *order*: an order-`k` block spans `2^k` of the smallest blocks.
//!
//! ```text
//!   Block Tree (MAX_ORDER = 3):
//!
//!   order 3   ┌───────────────────────────────────────────────┐
//!             │                      [1]                      │
//!             └───────────────────────────────────────────────┘
//!   order 2   ┌───────────────────────┬───────────────────────┐
//!             │          [2]          │          [3]          │
//!             └───────────────────────┴───────────────────────┘
//!   order 1   ┌───────────┬───────────┬───────────┬───────────┐
//!             │    [4]    │    [5]    │    [6]    │    [7]    │
//!             └───────────┴───────────┴───────────┴───────────┘
//!   order 0   ┌─────┬─────┬─────┬─────┬─────┬─────┬─────┬─────┐
//!             │ [8] │ [9] │[10] │[11] │[12] │[13] │[14] │[15] │
//!             └─────┴─────┴─────┴─────┴─────┴─────┴─────┴─────┘
//!
//!   Children of [p] live at [2p] and [2p + 1]; [p] and [p ^ 1] are buddies.
//! ```
//!
//! The live tree is a subset of this implicit layout: its leaves always
//! partition the region exactly, each leaf being either free or allocated.
//!
//! ## Crate Structure
//!
//! ```text
//!   rbuddy
//!   ├── order    - Size to order computation (order_of, block_bytes)
//!   ├── node     - Node record stored in the tree arena
//!   ├── tree     - BlockTree: exact fit, closest fit, split, coalesce
//!   ├── address  - AddressMapper: tree position <-> region offset
//!   ├── region   - RegionProvider, MmapProvider, HeapProvider
//!   ├── dump     - TreeDump diagnostic listing
//!   ├── error    - BuddyError
//!   └── buddy    - BuddyAllocator facade
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rbuddy::DefaultBuddyAllocator;
//!
//! fn main() {
//!     let mut allocator = DefaultBuddyAllocator::new();
//!
//!     // 100 bytes fit in a single 1 KiB block
//!     let ptr = allocator.allocate(100).unwrap();
//!
//!     unsafe { ptr.as_ptr().write_bytes(0xAB, 100) };
//!
//!     allocator.release(ptr.as_ptr()).unwrap();
//! }
//! ```
//!
//! ## How It Works
//!
//! Allocating finds a free block of exactly the needed order. Failing that,
//! the smallest larger free block is split in halves, always descending into
//! the left half, until a block of the right order exists:
//!
//! ```text
//!   allocate(order 0) on an empty tree of order 2:
//!
//!   ┌───────────────────────┐     ┌───────────┬───────────┐     ┌─────┬─────┬───────────┐
//!   │         free          │ ──▶ │   free    │   free    │ ──▶ │ A   │free │   free    │
//!   └───────────────────────┘     └───────────┴───────────┘     └─────┴─────┴───────────┘
//! ```
//!
//! Releasing marks the block free and merges it with its buddy for as long as
//! the buddy is a free leaf too, climbing towards the root.
//!
//! ## Features
//!
//! - **Logarithmic bookkeeping**: coalescing costs at most `MAX_ORDER` steps
//! - **Explicit failures**: every failure is a [`BuddyError`], never a null
//! - **Pluggable backing memory**: `mmap(2)` by default, any [`RegionProvider`]
//! - **Checked releases**: misaligned and double releases are detected
//!
//! ## Limitations
//!
//! - **Single-threaded only**: No synchronization primitives
//! - **Fixed capacity**: The region never grows or shrinks
//! - **Block granularity**: Addresses are aligned to their block size relative
//!   to the region base, nothing more
//! - **Unix-only**: The default provider requires `libc` and `mmap`

mod address;
mod buddy;
mod dump;
mod error;
mod node;
mod order;
mod region;
mod tree;

pub use address::AddressMapper;
pub use buddy::{BuddyAllocator, BuddyStats, DEFAULT_BLOCK_SIZE, DEFAULT_MAX_ORDER, DefaultBuddyAllocator};
pub use dump::TreeDump;
pub use error::{BuddyError, Result};
pub use node::Node;
pub use order::{block_bytes, order_of};
pub use region::{HeapProvider, MmapProvider, RegionProvider};
pub use tree::{BlockTree, ROOT};
