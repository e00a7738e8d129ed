//! Owning iterator for `BlockDeque`.

use std::fmt;
use std::iter::FusedIterator;

use allocator_api2::alloc::{Allocator, Global};

use super::BlockDeque;

/// An owning iterator over the elements of a [`BlockDeque`].
///
/// This struct is created by the `into_iter` method on `BlockDeque`
/// (provided by the [`IntoIterator`] trait). Blocks are released as the
/// iterator drains them.
pub struct IntoIter<T, A: Allocator = Global> {
    deque: BlockDeque<T, A>,
}

impl<T, A: Allocator> IntoIter<T, A> {
    #[inline]
    pub(super) fn new(deque: BlockDeque<T, A>) -> Self {
        Self { deque }
    }
}

impl<T, A: Allocator> Iterator for IntoIter<T, A> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<T> {
        self.deque.pop_front()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.deque.len();
        (remaining, Some(remaining))
    }

    #[inline]
    fn count(self) -> usize {
        self.deque.len()
    }
}

impl<T, A: Allocator> DoubleEndedIterator for IntoIter<T, A> {
    #[inline]
    fn next_back(&mut self) -> Option<T> {
        self.deque.pop_back()
    }
}

impl<T, A: Allocator> ExactSizeIterator for IntoIter<T, A> {}

impl<T, A: Allocator> FusedIterator for IntoIter<T, A> {}

impl<T: Clone, A: Allocator + Clone> Clone for IntoIter<T, A> {
    fn clone(&self) -> Self {
        Self {
            deque: self.deque.clone(),
        }
    }
}

impl<T: fmt::Debug, A: Allocator> fmt::Debug for IntoIter<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IntoIter").field(&self.deque).finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::{BlockDeque, DequeConfig};
    use std::cell::Cell;
    use std::rc::Rc;

    struct Counted(Rc<Cell<usize>>);

    impl Drop for Counted {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn test_into_iter_both_ends() {
        let deque: BlockDeque<i32> = (0..10).collect();
        let mut iter = deque.into_iter();
        assert_eq!(iter.next(), Some(0));
        assert_eq!(iter.next_back(), Some(9));
        assert_eq!(iter.len(), 8);
        let rest: Vec<_> = iter.rev().collect();
        assert_eq!(rest, [8, 7, 6, 5, 4, 3, 2, 1]);
    }

    #[test]
    fn test_into_iter_drops_remaining() {
        let drops = Rc::new(Cell::new(0));
        let mut deque = BlockDeque::with_config(DequeConfig::with_block_size(2).unwrap());
        for _ in 0..9 {
            deque.push_front(Counted(drops.clone()));
        }
        let mut iter = deque.into_iter();
        drop(iter.next());
        drop(iter.next_back());
        assert_eq!(drops.get(), 2);
        drop(iter);
        assert_eq!(drops.get(), 9);
    }
}
