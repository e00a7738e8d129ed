//! Block size policy for [`BlockDeque`](crate::BlockDeque).

use std::mem;

use crate::error::{Error, Result};

/// Target size in bytes of one block for small element types.
const BLOCK_BYTES: usize = 4096;

/// Elements at least this large get a fixed element count per block instead.
const LARGE_ELEMENT: usize = 256;

/// Element count per block for large element types.
const LARGE_BLOCK_LEN: usize = 16;

/// Number of elements per block used when no configuration is given.
///
/// Small types fill roughly a page per block; types of 256 bytes or more get
/// 16 elements per block. Zero-sized types use 4096.
pub const fn default_block_size<T>() -> usize {
    let size = mem::size_of::<T>();
    if size == 0 {
        BLOCK_BYTES
    } else if size < LARGE_ELEMENT {
        BLOCK_BYTES / size
    } else {
        LARGE_BLOCK_LEN
    }
}

/// Construction-time settings for a [`BlockDeque`](crate::BlockDeque).
///
/// # Example
///
/// ```
/// use seqbuf::{BlockDeque, DequeConfig};
///
/// let config = DequeConfig::with_block_size(4).unwrap();
/// let mut deque: BlockDeque<u32> = BlockDeque::with_config(config);
/// deque.push_back(1);
/// assert_eq!(deque.block_size(), 4);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DequeConfig {
    block_size: usize,
}

impl DequeConfig {
    /// The default configuration for element type `T`.
    pub const fn for_type<T>() -> Self {
        Self {
            block_size: default_block_size::<T>(),
        }
    }

    /// A configuration with exactly `block_size` elements per block.
    ///
    /// Returns [`Error::InvalidBlockSize`] for a block size of zero.
    pub fn with_block_size(block_size: usize) -> Result<Self> {
        if block_size == 0 {
            return Err(Error::InvalidBlockSize(block_size));
        }
        Ok(Self { block_size })
    }

    /// Elements per block.
    #[inline]
    pub const fn block_size(&self) -> usize {
        self.block_size
    }
}
