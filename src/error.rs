//! Error types shared by every container in the crate.

use std::alloc::Layout;

use thiserror::Error;

/// The error type for fallible container operations.
///
/// Infallible methods (`push_back`, `reserve`, ...) report these conditions
/// through [`handle_error`] instead of returning them.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Error {
    /// The requested element count cannot be represented by the allocation strategy.
    #[error("requested length {requested} exceeds the maximum of {max} elements")]
    LengthExceeded {
        /// Number of elements requested.
        requested: usize,
        /// Largest element count the strategy can hand out for this type.
        max: usize,
    },
    /// The allocation strategy refused to hand out memory.
    #[error("memory allocation of {} bytes failed", .layout.size())]
    AllocFailed {
        /// Layout of the refused request.
        layout: Layout,
    },
    /// A checked access was made past the end of the container.
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange {
        /// Index that was accessed.
        index: usize,
        /// Length of the container at the time of the access.
        len: usize,
    },
    /// A deque configuration asked for blocks that cannot hold an element.
    #[error("invalid block size {0}")]
    InvalidBlockSize(usize),
}

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub(crate) fn length_exceeded(requested: usize, max: usize) -> Self {
        Self::LengthExceeded { requested, max }
    }

    pub(crate) fn index_out_of_range(index: usize, len: usize) -> Self {
        Self::IndexOutOfRange { index, len }
    }
}

/// Turns an error from an infallible code path into a panic or an abort.
///
/// Allocation failures go to [`std::alloc::handle_alloc_error`]; everything
/// else panics, matching the behaviour of the standard collections.
#[cold]
#[inline(never)]
#[track_caller]
pub(crate) fn handle_error(err: Error) -> ! {
    match err {
        Error::AllocFailed { layout } => std::alloc::handle_alloc_error(layout),
        Error::LengthExceeded { .. } => panic!("capacity overflow"),
        other => panic!("{other}"),
    }
}
