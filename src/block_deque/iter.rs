//! Borrowing iterators for `BlockDeque`.

use std::fmt;
use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::ptr::NonNull;

use super::block_map::BlockPos;

/// Cursor pair shared by [`Iter`] and [`IterMut`].
///
/// `head` is the next slot to yield from the front, `tail` is one past the
/// next slot to yield from the back.
struct Cursor<'a, T> {
    blocks: &'a [NonNull<T>],
    block_size: usize,
    head: BlockPos,
    tail: BlockPos,
    remaining: usize,
}

impl<T> Clone for Cursor<'_, T> {
    fn clone(&self) -> Self {
        Self {
            blocks: self.blocks,
            block_size: self.block_size,
            head: self.head,
            tail: self.tail,
            remaining: self.remaining,
        }
    }
}

impl<'a, T> Cursor<'a, T> {
    fn new(blocks: &'a [NonNull<T>], block_size: usize, from: usize, to: usize) -> Self {
        let head = BlockPos::at(from, block_size);
        let tail = BlockPos::at(to, block_size);
        Self {
            blocks,
            block_size,
            head,
            tail,
            remaining: tail.distance(head, block_size),
        }
    }

    #[inline]
    fn ptr(&self, pos: BlockPos) -> *mut T {
        unsafe { self.blocks[pos.block].as_ptr().add(pos.offset) }
    }

    #[inline]
    fn next(&mut self) -> Option<*mut T> {
        if self.remaining == 0 {
            return None;
        }
        let ptr = self.ptr(self.head);
        self.head.step_forward(self.block_size);
        self.remaining -= 1;
        Some(ptr)
    }

    #[inline]
    fn next_back(&mut self) -> Option<*mut T> {
        if self.remaining == 0 {
            return None;
        }
        self.tail.step_back(self.block_size);
        self.remaining -= 1;
        Some(self.ptr(self.tail))
    }

    fn nth(&mut self, n: usize) -> Option<*mut T> {
        if n >= self.remaining {
            self.head = self.tail;
            self.remaining = 0;
            return None;
        }
        self.head = self.head.offset_by(n as isize, self.block_size);
        self.remaining -= n;
        self.next()
    }

    fn nth_back(&mut self, n: usize) -> Option<*mut T> {
        if n >= self.remaining {
            self.tail = self.head;
            self.remaining = 0;
            return None;
        }
        self.tail = self.tail.offset_by(-(n as isize), self.block_size);
        self.remaining -= n;
        self.next_back()
    }
}

/// An iterator over references to the elements of a [`BlockDeque`](super::BlockDeque).
pub struct Iter<'a, T> {
    cursor: Cursor<'a, T>,
}

impl<'a, T> Iter<'a, T> {
    pub(super) fn new(blocks: &'a [NonNull<T>], block_size: usize, from: usize, to: usize) -> Self {
        Self {
            cursor: Cursor::new(blocks, block_size, from, to),
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    #[inline]
    fn next(&mut self) -> Option<&'a T> {
        self.cursor.next().map(|ptr| unsafe { &*ptr })
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.cursor.remaining, Some(self.cursor.remaining))
    }

    #[inline]
    fn nth(&mut self, n: usize) -> Option<&'a T> {
        self.cursor.nth(n).map(|ptr| unsafe { &*ptr })
    }

    #[inline]
    fn count(self) -> usize {
        self.cursor.remaining
    }

    #[inline]
    fn last(mut self) -> Option<&'a T> {
        self.next_back()
    }
}

impl<T> DoubleEndedIterator for Iter<'_, T> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        self.cursor.next_back().map(|ptr| unsafe { &*ptr })
    }

    #[inline]
    fn nth_back(&mut self, n: usize) -> Option<Self::Item> {
        self.cursor.nth_back(n).map(|ptr| unsafe { &*ptr })
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Self {
            cursor: self.cursor.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Iter<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Iter").field(&self.clone().collect::<Vec<_>>()).finish()
    }
}

// Safety: Iter only yields shared references
unsafe impl<T: Sync> Sync for Iter<'_, T> {}
unsafe impl<T: Sync> Send for Iter<'_, T> {}

/// An iterator over mutable references to the elements of a [`BlockDeque`](super::BlockDeque).
pub struct IterMut<'a, T> {
    cursor: Cursor<'a, T>,
    _marker: PhantomData<&'a mut T>,
}

impl<'a, T> IterMut<'a, T> {
    /// The caller must hold the deque's unique borrow for `'a`.
    pub(super) fn new(blocks: &'a [NonNull<T>], block_size: usize, from: usize, to: usize) -> Self {
        Self {
            cursor: Cursor::new(blocks, block_size, from, to),
            _marker: PhantomData,
        }
    }
}

impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = &'a mut T;

    #[inline]
    fn next(&mut self) -> Option<&'a mut T> {
        self.cursor.next().map(|ptr| unsafe { &mut *ptr })
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.cursor.remaining, Some(self.cursor.remaining))
    }

    #[inline]
    fn nth(&mut self, n: usize) -> Option<&'a mut T> {
        self.cursor.nth(n).map(|ptr| unsafe { &mut *ptr })
    }

    #[inline]
    fn count(self) -> usize {
        self.cursor.remaining
    }

    #[inline]
    fn last(mut self) -> Option<&'a mut T> {
        self.next_back()
    }
}

impl<T> DoubleEndedIterator for IterMut<'_, T> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        self.cursor.next_back().map(|ptr| unsafe { &mut *ptr })
    }

    #[inline]
    fn nth_back(&mut self, n: usize) -> Option<Self::Item> {
        self.cursor.nth_back(n).map(|ptr| unsafe { &mut *ptr })
    }
}

impl<T> ExactSizeIterator for IterMut<'_, T> {}

impl<T> FusedIterator for IterMut<'_, T> {}

// Safety: IterMut yields exclusive references
unsafe impl<T: Send> Send for IterMut<'_, T> {}
unsafe impl<T: Sync> Sync for IterMut<'_, T> {}
