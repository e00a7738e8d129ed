//! Sequence containers with pluggable allocation strategies.
//!
//! Three containers share one set of allocation plumbing:
//!
//! - [`ScratchBuffer`]: a double-ended buffer with spare room on both sides of
//!   its elements. It is the relocation target every container grows through.
//! - [`DynArray`]: a contiguous growable array with amortized constant-time
//!   appends and the strong exception guarantee for single-element inserts.
//! - [`BlockDeque`]: a double-ended queue stored in fixed-size blocks, with
//!   constant-time pushes and pops at both ends.
//!
//! Every container is generic over an [`Allocator`](allocator_api2::alloc::Allocator)
//! and defaults to the global allocator. Fallible `try_*` methods report
//! [`Error`] instead of aborting or panicking.
//!
//! # Example
//!
//! ```
//! use seqbuf::{BlockDeque, DynArray};
//!
//! let mut arr = DynArray::new();
//! arr.push_back(1);
//! arr.insert(0, 0);
//! arr.extend_from_slice(&[2, 3]);
//! assert_eq!(arr, [0, 1, 2, 3]);
//!
//! let mut deque: BlockDeque<i32> = arr.into_iter().collect();
//! deque.push_front(-1);
//! assert_eq!(deque.pop_back(), Some(3));
//! assert_eq!(deque, [-1, 0, 1, 2]);
//! ```

pub mod block_deque;
pub mod config;
pub mod dyn_array;
pub mod error;
mod raw;
pub mod scratch;

#[cfg(test)]
mod testing;

pub use block_deque::BlockDeque;
pub use config::DequeConfig;
pub use dyn_array::DynArray;
pub use error::{Error, Result};
pub use scratch::ScratchBuffer;
