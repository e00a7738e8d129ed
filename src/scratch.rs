//! A double-ended raw buffer used as the relocation target for growth.
//!
//! [`ScratchBuffer`] owns one allocation with spare room on both sides of its
//! occupied range. Containers build one whenever their capacity has to change,
//! move their elements into it, and then swap storage with it; the buffer is
//! dropped at the end of the operation and takes the old allocation with it.

use std::cmp;
use std::fmt;
use std::mem;
use std::ops::{Deref, DerefMut};

use allocator_api2::alloc::{Allocator, Global};

use crate::error::{handle_error, Error, Result};
use crate::raw::{self, RawParts};

/// How far to slide the occupied range when one side is full and the other
/// side has `spare` free slots. Always at least one slot when `spare > 0`.
#[inline]
pub const fn rebalance_step(spare: usize) -> usize {
    (spare + 1) / 2
}

/// Minimum capacity used when an iterator of unknown length overflows the buffer.
const MIN_ITER_GROWTH: usize = 8;

/// A double-ended buffer with independent front and back spare capacity.
///
/// ```text
/// storage      head            tail         cap
///    |  front   |    elements    |   back    |
///    |  spare   |                |   spare   |
/// ```
///
/// Elements live in `[head, tail)`. The buffer is never cloned; it is moved or
/// swapped, which is all the relocation protocol needs.
pub struct ScratchBuffer<T, A: Allocator = Global> {
    pub(crate) raw: RawParts<T>,
    pub(crate) alloc: A,
}

impl<T> ScratchBuffer<T> {
    /// Creates an empty buffer without allocating.
    #[inline]
    pub const fn new() -> Self {
        Self::new_in(Global)
    }

    /// Creates a buffer with `capacity` slots whose occupied range starts at
    /// `front_spare`.
    ///
    /// # Panics
    ///
    /// Panics if `front_spare > capacity` or the allocation fails.
    pub fn with_capacity(capacity: usize, front_spare: usize) -> Self {
        Self::with_capacity_in(capacity, front_spare, Global)
    }
}

impl<T, A: Allocator> ScratchBuffer<T, A> {
    /// Creates an empty buffer using `alloc` without allocating.
    #[inline]
    pub const fn new_in(alloc: A) -> Self {
        Self {
            raw: RawParts::dangling(),
            alloc,
        }
    }

    /// Like [`ScratchBuffer::with_capacity`], with an explicit allocation strategy.
    pub fn with_capacity_in(capacity: usize, front_spare: usize, alloc: A) -> Self {
        match Self::try_with_capacity_in(capacity, front_spare, alloc) {
            Ok(buf) => buf,
            Err(err) => handle_error(err),
        }
    }

    /// Fallible form of [`ScratchBuffer::with_capacity_in`].
    pub fn try_with_capacity_in(capacity: usize, front_spare: usize, alloc: A) -> Result<Self> {
        let raw = RawParts::allocate_in(&alloc, capacity, front_spare)?;
        Ok(Self { raw, alloc })
    }

    /// Rebuilds a buffer from parts taken out of another owner.
    ///
    /// # Safety
    ///
    /// `raw` must describe storage that `alloc` may release.
    pub(crate) unsafe fn from_parts_in(raw: RawParts<T>, alloc: A) -> Self {
        Self { raw, alloc }
    }

    /// Number of live elements.
    #[inline]
    pub const fn len(&self) -> usize {
        self.raw.len()
    }

    /// Returns `true` if the buffer holds no elements.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.raw.head == self.raw.tail
    }

    /// Total number of slots in the allocation.
    #[inline]
    pub const fn capacity(&self) -> usize {
        self.raw.cap
    }

    /// Free slots in front of the first element.
    #[inline]
    pub const fn front_spare(&self) -> usize {
        self.raw.front_spare()
    }

    /// Free slots after the last element.
    #[inline]
    pub const fn back_spare(&self) -> usize {
        self.raw.back_spare()
    }

    /// The allocation strategy backing this buffer.
    #[inline]
    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        self.raw.as_slice()
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.raw.as_mut_slice()
    }

    #[inline]
    pub fn front(&self) -> Option<&T> {
        self.as_slice().first()
    }

    #[inline]
    pub fn front_mut(&mut self) -> Option<&mut T> {
        self.as_mut_slice().first_mut()
    }

    #[inline]
    pub fn back(&self) -> Option<&T> {
        self.as_slice().last()
    }

    #[inline]
    pub fn back_mut(&mut self) -> Option<&mut T> {
        self.as_mut_slice().last_mut()
    }

    /// Grows the allocation to exactly `capacity` slots, keeping the current
    /// front spare. Does nothing if the buffer is already at least that large.
    pub fn reserve_capacity(&mut self, capacity: usize) {
        if let Err(err) = self.try_reserve_capacity(capacity) {
            handle_error(err);
        }
    }

    /// Fallible form of [`ScratchBuffer::reserve_capacity`].
    ///
    /// On error the buffer is unchanged.
    pub fn try_reserve_capacity(&mut self, capacity: usize) -> Result<()> {
        if capacity > self.capacity() {
            self.relocate_into(capacity, self.front_spare())?;
        }
        Ok(())
    }

    /// Shrinks the allocation to exactly `len()` slots.
    ///
    /// Shrinking is best effort: if the smaller allocation cannot be obtained
    /// the buffer keeps its current storage.
    pub fn shrink_to_fit(&mut self) {
        if self.capacity() > self.len() {
            if let Err(err) = self.relocate_into(self.len(), 0) {
                tracing::debug!(%err, len = self.len(), "scratch buffer shrink skipped");
            }
        }
    }

    /// Prepends `value`.
    ///
    /// # Panics
    ///
    /// Panics if a needed reallocation fails.
    pub fn push_front(&mut self, value: T) {
        if let Err(err) = self.make_front_room() {
            handle_error(err);
        }
        unsafe { self.raw.push_front_in_spare(value) };
    }

    /// Fallible form of [`ScratchBuffer::push_front`].
    ///
    /// On error the buffer is unchanged and `value` is dropped.
    pub fn try_push_front(&mut self, value: T) -> Result<()> {
        self.make_front_room()?;
        unsafe { self.raw.push_front_in_spare(value) };
        Ok(())
    }

    /// Appends `value`.
    ///
    /// # Panics
    ///
    /// Panics if a needed reallocation fails.
    pub fn push_back(&mut self, value: T) {
        self.emplace_back_with(|| value);
    }

    /// Fallible form of [`ScratchBuffer::push_back`].
    ///
    /// On error the buffer is unchanged and `value` is dropped.
    pub fn try_push_back(&mut self, value: T) -> Result<()> {
        self.try_emplace_back_with(|| value).map(|_| ())
    }

    /// Makes room at the back, then constructs the value produced by `f` there.
    ///
    /// If `f` panics the buffer keeps its elements; only spare room may have
    /// moved.
    pub fn emplace_back_with<F>(&mut self, f: F) -> &mut T
    where
        F: FnOnce() -> T,
    {
        match self.try_emplace_back_with(f) {
            Ok(slot) => slot,
            Err(err) => handle_error(err),
        }
    }

    /// Fallible form of [`ScratchBuffer::emplace_back_with`].
    pub fn try_emplace_back_with<F>(&mut self, f: F) -> Result<&mut T>
    where
        F: FnOnce() -> T,
    {
        self.make_back_room()?;
        let slot = self.raw.slot(self.raw.tail);
        unsafe {
            raw::construct(slot, f());
            self.raw.tail += 1;
            Ok(&mut *slot)
        }
    }

    /// Removes and returns the first element.
    #[inline]
    pub fn pop_front(&mut self) -> Option<T> {
        self.raw.take_front()
    }

    /// Removes and returns the last element.
    #[inline]
    pub fn pop_back(&mut self) -> Option<T> {
        self.raw.take_back()
    }

    /// Destroys every element. The allocation is kept.
    pub fn clear(&mut self) {
        self.destruct_at_end(self.raw.head);
    }

    /// Keeps the first `len` elements and destroys the rest.
    pub fn truncate(&mut self, len: usize) {
        if len < self.len() {
            self.destruct_at_end(self.raw.head + len);
        }
    }

    /// Keeps the last `len` elements and destroys the rest.
    pub fn truncate_front(&mut self, len: usize) {
        if len < self.len() {
            self.destruct_at_begin(self.raw.tail - len);
        }
    }

    /// Exchanges contents, storage and allocator with `other`.
    #[inline]
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(self, other);
    }

    /// Ensures at least one free slot at the back.
    fn make_back_room(&mut self) -> Result<()> {
        if self.raw.tail < self.raw.cap {
            return Ok(());
        }
        if self.raw.head > 0 {
            let step = rebalance_step(self.raw.head);
            tracing::trace!(step, len = self.len(), "scratch buffer rebalanced toward front");
            self.raw.shift_toward_front(step);
            return Ok(());
        }
        let new_cap = self.doubled_capacity()?;
        self.relocate_into(new_cap, new_cap / 4)
    }

    /// Ensures at least one free slot at the front.
    fn make_front_room(&mut self) -> Result<()> {
        if self.raw.head > 0 {
            return Ok(());
        }
        if self.raw.tail < self.raw.cap {
            let step = rebalance_step(self.raw.back_spare());
            tracing::trace!(step, len = self.len(), "scratch buffer rebalanced toward back");
            self.raw.shift_toward_back(step);
            return Ok(());
        }
        let new_cap = self.doubled_capacity()?;
        self.relocate_into(new_cap, (new_cap + 3) / 4)
    }

    fn doubled_capacity(&self) -> Result<usize> {
        let cap = self.capacity();
        let doubled = cap
            .checked_mul(2)
            .ok_or_else(|| Error::length_exceeded(cap, raw::max_len::<T>()))?;
        Ok(cmp::max(doubled, 1))
    }

    /// Moves every element into a fresh allocation of `capacity` slots whose
    /// occupied range starts at `front_spare`, then releases the old storage.
    fn relocate_into(&mut self, capacity: usize, front_spare: usize) -> Result<()> {
        debug_assert!(front_spare + self.len() <= capacity);
        let mut buf = ScratchBuffer::try_with_capacity_in(capacity, front_spare, &self.alloc)?;
        let head = self.raw.head;
        buf.take_around(&mut self.raw, head);
        tracing::trace!(
            old_capacity = buf.capacity(),
            new_capacity = capacity,
            "scratch buffer reallocated"
        );
        Ok(())
    }

    /// Relocates the live range of `target` into this buffer and swaps storage.
    ///
    /// Elements before `pos` go in front of this buffer's occupied range and
    /// elements from `pos` onward go after it, so anything already constructed
    /// here ends up between the two halves. Afterwards `target` owns this
    /// buffer's former allocation and `self` owns the old one, now empty.
    pub(crate) fn take_around(&mut self, target: &mut RawParts<T>, pos: usize) {
        debug_assert!(target.head <= pos && pos <= target.tail);
        let prefix = pos - target.head;
        let suffix = target.tail - pos;
        debug_assert!(prefix <= self.front_spare() && suffix <= self.back_spare());
        unsafe {
            self.relocate_to_front(target.slot(target.head), prefix);
            self.relocate_to_end(target.slot(pos), suffix);
        }
        target.tail = target.head;
        mem::swap(&mut self.raw, target);
    }

    /// Moves `count` values from `src` directly in front of the occupied range.
    ///
    /// # Safety
    ///
    /// `src` must point to `count` live values that the caller will treat as
    /// moved-out, and `count <= front_spare()`.
    pub(crate) unsafe fn relocate_to_front(&mut self, src: *const T, count: usize) {
        debug_assert!(count <= self.front_spare());
        raw::relocate(src, self.raw.slot(self.raw.head - count), count);
        self.raw.head -= count;
    }

    /// Moves `count` values from `src` directly after the occupied range.
    ///
    /// # Safety
    ///
    /// `src` must point to `count` live values that the caller will treat as
    /// moved-out, and `count <= back_spare()`.
    pub(crate) unsafe fn relocate_to_end(&mut self, src: *const T, count: usize) {
        debug_assert!(count <= self.back_spare());
        raw::relocate(src, self.raw.slot(self.raw.tail), count);
        self.raw.tail += count;
    }

    /// Constructs `count` values produced by `f` at the end, without a
    /// capacity check. A panicking `f` leaves every value built so far live.
    ///
    /// # Safety
    ///
    /// `count <= back_spare()`.
    pub(crate) unsafe fn construct_at_end_with<F>(&mut self, count: usize, mut f: F)
    where
        F: FnMut() -> T,
    {
        debug_assert!(count <= self.back_spare());
        for _ in 0..count {
            raw::construct(self.raw.slot(self.raw.tail), f());
            self.raw.tail += 1;
        }
    }

    /// Constructs the values of `iter` at the end, growing when the buffer fills up.
    pub(crate) fn construct_at_end_from<I>(&mut self, iter: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
    {
        for value in iter {
            if self.raw.tail == self.raw.cap {
                let wanted = cmp::max(self.doubled_capacity()?, MIN_ITER_GROWTH);
                self.relocate_into(wanted, self.front_spare())?;
            }
            unsafe { raw::construct(self.raw.slot(self.raw.tail), value) };
            self.raw.tail += 1;
        }
        Ok(())
    }

    /// Destroys elements from the front until the range starts at `new_head`.
    pub(crate) fn destruct_at_begin(&mut self, new_head: usize) {
        debug_assert!(self.raw.head <= new_head && new_head <= self.raw.tail);
        while self.raw.head != new_head {
            let slot = self.raw.slot(self.raw.head);
            self.raw.head += 1;
            unsafe { raw::destroy(slot) };
        }
    }

    /// Destroys elements from the back until the range ends at `new_tail`.
    pub(crate) fn destruct_at_end(&mut self, new_tail: usize) {
        debug_assert!(self.raw.head <= new_tail && new_tail <= self.raw.tail);
        while self.raw.tail != new_tail {
            self.raw.tail -= 1;
            unsafe { raw::destroy(self.raw.slot(self.raw.tail)) };
        }
    }
}

impl<T, A: Allocator> Drop for ScratchBuffer<T, A> {
    fn drop(&mut self) {
        self.clear();
        unsafe { self.raw.release_in(&self.alloc) };
    }
}

impl<T, A: Allocator> Deref for ScratchBuffer<T, A> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T, A: Allocator> DerefMut for ScratchBuffer<T, A> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T> Default for ScratchBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, A: Allocator> Extend<T> for ScratchBuffer<T, A> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        if let Err(err) = self.construct_at_end_from(iter) {
            handle_error(err);
        }
    }
}

impl<T: fmt::Debug, A: Allocator> fmt::Debug for ScratchBuffer<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScratchBuffer")
            .field("front_spare", &self.front_spare())
            .field("elements", &self.as_slice())
            .field("back_spare", &self.back_spare())
            .finish()
    }
}

// Safety: the buffer uniquely owns its elements and its allocation.
unsafe impl<T: Send, A: Allocator + Send> Send for ScratchBuffer<T, A> {}
unsafe impl<T: Sync, A: Allocator + Sync> Sync for ScratchBuffer<T, A> {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Clone)]
    struct Counted(Rc<Cell<usize>>);

    impl Drop for Counted {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn test_new_is_empty() {
        let buf: ScratchBuffer<i32> = ScratchBuffer::new();
        assert!(buf.is_empty());
        assert_eq!(buf.capacity(), 0);
        assert_eq!(buf.front_spare(), 0);
        assert_eq!(buf.back_spare(), 0);
    }

    #[test]
    fn test_front_spare_bias() {
        let mut buf = ScratchBuffer::with_capacity(10, 3);
        for i in 1..=5 {
            buf.push_back(i);
        }
        assert_eq!(buf.as_slice(), &[1, 2, 3, 4, 5]);
        assert_eq!(buf.front_spare(), 3);
        assert_eq!(buf.back_spare(), 2);
        assert_eq!(buf.capacity(), 10);
    }

    #[test]
    fn test_reserve_keeps_front_spare() {
        let mut buf = ScratchBuffer::with_capacity(10, 3);
        buf.extend(1..=5);
        buf.reserve_capacity(20);
        assert_eq!(buf.capacity(), 20);
        assert_eq!(buf.front_spare(), 3);
        assert_eq!(buf.as_slice(), &[1, 2, 3, 4, 5]);

        buf.reserve_capacity(4);
        assert_eq!(buf.capacity(), 20);
    }

    #[test]
    fn test_shrink_to_fit() {
        let mut buf = ScratchBuffer::with_capacity(10, 3);
        buf.extend(1..=5);
        buf.shrink_to_fit();
        assert_eq!(buf.capacity(), 5);
        assert_eq!(buf.front_spare(), 0);
        assert_eq!(buf.back_spare(), 0);
        assert_eq!(buf.as_slice(), &[1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_push_back_rebalances_before_growing() {
        let mut buf = ScratchBuffer::with_capacity(4, 4);
        buf.push_back(1);
        assert_eq!(buf.capacity(), 4);
        assert_eq!(buf.front_spare(), 2);
        buf.push_back(2);
        buf.push_back(3);
        buf.push_back(4);
        assert_eq!(buf.capacity(), 4);
        assert_eq!(buf.as_slice(), &[1, 2, 3, 4]);

        // Both sides are full now; the next push doubles.
        buf.push_back(5);
        assert_eq!(buf.capacity(), 8);
        assert_eq!(buf.front_spare(), 2);
        assert_eq!(buf.as_slice(), &[1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_push_front_from_empty() {
        let mut buf = ScratchBuffer::new();
        for i in 0..10 {
            buf.push_front(i);
        }
        let expected: Vec<i32> = (0..10).rev().collect();
        assert_eq!(buf.as_slice(), expected.as_slice());
        assert!(buf.capacity() >= 10);
    }

    #[test]
    fn test_mixed_pushes_and_pops() {
        let mut buf = ScratchBuffer::new();
        buf.push_back(2);
        buf.push_front(1);
        buf.push_back(3);
        buf.push_front(0);
        assert_eq!(buf.as_slice(), &[0, 1, 2, 3]);
        assert_eq!(buf.pop_front(), Some(0));
        assert_eq!(buf.pop_back(), Some(3));
        assert_eq!(buf.front(), Some(&1));
        assert_eq!(buf.back(), Some(&2));
        buf.clear();
        assert_eq!(buf.pop_back(), None);
        assert_eq!(buf.pop_front(), None);
    }

    #[test]
    fn test_emplace_panic_leaves_contents() {
        let mut buf = ScratchBuffer::with_capacity(2, 0);
        buf.push_back(1);
        buf.push_back(2);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            buf.emplace_back_with(|| panic!("constructor failed"));
        }));
        assert!(result.is_err());
        assert_eq!(buf.as_slice(), &[1, 2]);
    }

    #[test]
    fn test_drop_destroys_each_element_once() {
        let drops = Rc::new(Cell::new(0));
        {
            let mut buf = ScratchBuffer::new();
            for _ in 0..10 {
                buf.push_back(Counted(drops.clone()));
                buf.push_front(Counted(drops.clone()));
            }
            drop(buf.pop_front());
            assert_eq!(drops.get(), 1);
            buf.truncate(5);
            assert_eq!(drops.get(), 15);
        }
        assert_eq!(drops.get(), 20);
    }

    #[test]
    fn test_construct_at_end_from_grows() {
        let mut buf = ScratchBuffer::new();
        buf.construct_at_end_from(0..20).unwrap();
        assert_eq!(buf.len(), 20);
        assert!(buf.capacity() >= 20);
        assert!(buf.iter().copied().eq(0..20));
    }

    #[test]
    fn test_destruct_at_begin() {
        let mut buf = ScratchBuffer::with_capacity(6, 1);
        buf.extend(0..5);
        let head = buf.raw.head;
        buf.destruct_at_begin(head + 2);
        assert_eq!(buf.as_slice(), &[2, 3, 4]);
        assert_eq!(buf.front_spare(), 3);
    }

    #[test]
    fn test_truncate_both_ends() {
        let mut buf = ScratchBuffer::with_capacity(8, 2);
        buf.extend(0..6);
        buf.truncate_front(4);
        assert_eq!(buf.as_slice(), &[2, 3, 4, 5]);
        buf.truncate(3);
        assert_eq!(buf.as_slice(), &[2, 3, 4]);
        buf.truncate_front(10);
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.front_spare() + buf.len() + buf.back_spare(), 8);
    }

    #[test]
    fn test_zst() {
        let mut buf = ScratchBuffer::new();
        for _ in 0..100 {
            buf.push_back(());
        }
        assert_eq!(buf.len(), 100);
        assert_eq!(buf.pop_front(), Some(()));
        assert_eq!(buf.len(), 99);
    }
}
