//! Owning iterator for `DynArray`.

use std::fmt;
use std::iter::FusedIterator;

use allocator_api2::alloc::{Allocator, Global};

use crate::scratch::ScratchBuffer;

/// An owning iterator over the elements of a [`DynArray`](super::DynArray).
///
/// The array's storage is handed over to a scratch buffer that is consumed
/// from both ends; whatever is left is dropped with the iterator.
pub struct IntoIter<T, A: Allocator = Global> {
    buf: ScratchBuffer<T, A>,
}

impl<T, A: Allocator> IntoIter<T, A> {
    #[inline]
    pub(super) fn new(buf: ScratchBuffer<T, A>) -> Self {
        Self { buf }
    }

    /// Returns the remaining items as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        self.buf.as_slice()
    }

    /// Returns the remaining items as a mutable slice.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.buf.as_mut_slice()
    }

    /// The allocation strategy the storage came from.
    #[inline]
    pub fn allocator(&self) -> &A {
        self.buf.allocator()
    }
}

impl<T, A: Allocator> Iterator for IntoIter<T, A> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<T> {
        self.buf.pop_front()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.buf.len();
        (remaining, Some(remaining))
    }

    #[inline]
    fn count(self) -> usize {
        self.buf.len()
    }
}

impl<T, A: Allocator> DoubleEndedIterator for IntoIter<T, A> {
    #[inline]
    fn next_back(&mut self) -> Option<T> {
        self.buf.pop_back()
    }
}

impl<T, A: Allocator> ExactSizeIterator for IntoIter<T, A> {}

impl<T, A: Allocator> FusedIterator for IntoIter<T, A> {}

impl<T: Clone, A: Allocator + Clone> Clone for IntoIter<T, A> {
    fn clone(&self) -> Self {
        let mut buf = ScratchBuffer::with_capacity_in(self.buf.len(), 0, self.allocator().clone());
        buf.extend(self.as_slice().iter().cloned());
        Self { buf }
    }
}

impl<T: fmt::Debug, A: Allocator> fmt::Debug for IntoIter<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IntoIter").field(&self.as_slice()).finish()
    }
}
