//! Raw storage management shared by every container.
//!
//! This module is the only place that talks to the allocation strategy. It
//! hands out uninitialized arrays, takes them back, and knows how to construct,
//! destroy and relocate elements inside them. It never tracks which slots are
//! initialized beyond the `[head, tail)` range recorded in [`RawParts`].

use std::alloc::Layout;
use std::mem;
use std::ops::{Bound, Range, RangeBounds};
use std::ptr::{self, NonNull};

use allocator_api2::alloc::Allocator;

use crate::error::{Error, Result};
use crate::scratch::rebalance_step;

/// Whether `T` is a zero-sized type. Such types never touch the allocator.
#[inline]
pub(crate) const fn is_zst<T>() -> bool {
    mem::size_of::<T>() == 0
}

/// Largest element count a single allocation of `T` may hold.
#[inline]
pub(crate) const fn max_len<T>() -> usize {
    if is_zst::<T>() {
        usize::MAX
    } else {
        isize::MAX as usize / mem::size_of::<T>()
    }
}

fn array_layout<T>(count: usize) -> Result<Layout> {
    let max = max_len::<T>();
    if count > max {
        return Err(Error::length_exceeded(count, max));
    }
    Layout::array::<T>(count).map_err(|_| Error::length_exceeded(count, max))
}

/// Allocates uninitialized storage for `count` values of `T`.
///
/// Zero-length requests and zero-sized types get a dangling pointer and never
/// reach the allocator.
pub(crate) fn allocate<T, A: Allocator>(alloc: &A, count: usize) -> Result<NonNull<T>> {
    if count == 0 || is_zst::<T>() {
        return Ok(NonNull::dangling());
    }
    let layout = array_layout::<T>(count)?;
    match alloc.allocate(layout) {
        Ok(ptr) => Ok(ptr.cast()),
        Err(_) => Err(Error::AllocFailed { layout }),
    }
}

/// Returns storage obtained from [`allocate`].
///
/// # Safety
///
/// `ptr` must come from `allocate::<T>(alloc, count)` (or an allocator that
/// compares equal) with the same `count`, and must not be used afterwards.
pub(crate) unsafe fn deallocate<T, A: Allocator>(alloc: &A, ptr: NonNull<T>, count: usize) {
    if count == 0 || is_zst::<T>() {
        return;
    }
    // The layout was validated when the storage was handed out.
    let layout =
        Layout::from_size_align_unchecked(mem::size_of::<T>() * count, mem::align_of::<T>());
    alloc.deallocate(ptr.cast(), layout);
}

/// Constructs `value` in the uninitialized slot `slot`.
///
/// # Safety
///
/// `slot` must be valid for writes and hold no live value.
#[inline]
pub(crate) unsafe fn construct<T>(slot: *mut T, value: T) {
    ptr::write(slot, value);
}

/// Destroys the live value in `slot`, leaving it uninitialized.
///
/// # Safety
///
/// `slot` must hold a live value that nothing else will drop.
#[inline]
pub(crate) unsafe fn destroy<T>(slot: *mut T) {
    ptr::drop_in_place(slot);
}

/// Moves `count` live values from `src` into the uninitialized slots at `dst`.
///
/// Afterwards the source slots are logically uninitialized. Rust moves cannot
/// fail, so relocation never needs a copying fallback.
///
/// # Safety
///
/// Both ranges must be valid and must not overlap.
#[inline]
pub(crate) unsafe fn relocate<T>(src: *const T, dst: *mut T, count: usize) {
    ptr::copy_nonoverlapping(src, dst, count);
}

/// Converts `range` into concrete bounds for a sequence of `len` elements.
///
/// # Panics
///
/// Panics if the start exceeds the end or the end exceeds `len`.
#[track_caller]
pub(crate) fn resolve_range<R: RangeBounds<usize>>(range: R, len: usize) -> Range<usize> {
    let start = match range.start_bound() {
        Bound::Included(&n) => n,
        Bound::Excluded(&n) => n.checked_add(1).unwrap_or_else(|| panic!("range start overflows usize")),
        Bound::Unbounded => 0,
    };
    let end = match range.end_bound() {
        Bound::Included(&n) => n.checked_add(1).unwrap_or_else(|| panic!("range end overflows usize")),
        Bound::Excluded(&n) => n,
        Bound::Unbounded => len,
    };
    assert!(start <= end, "range start {start} is greater than end {end}");
    assert!(end <= len, "range end {end} out of range for length {len}");
    start..end
}

/// The pointer bundle of one allocation: `storage` plus the occupied range
/// `[head, tail)` and the allocation end `cap`, all as offsets.
///
/// Invariant: `head <= tail <= cap`; slots in `[head, tail)` are live.
/// `RawParts` never frees anything on its own; its owner decides when.
pub(crate) struct RawParts<T> {
    pub(crate) storage: NonNull<T>,
    pub(crate) head: usize,
    pub(crate) tail: usize,
    pub(crate) cap: usize,
}

impl<T> RawParts<T> {
    /// Parts describing no allocation at all.
    #[inline]
    pub(crate) const fn dangling() -> Self {
        Self {
            storage: NonNull::dangling(),
            head: 0,
            tail: 0,
            cap: 0,
        }
    }

    /// Allocates `cap` slots with an empty occupied range starting at `front_spare`.
    pub(crate) fn allocate_in<A: Allocator>(
        alloc: &A,
        cap: usize,
        front_spare: usize,
    ) -> Result<Self> {
        assert!(front_spare <= cap, "front spare exceeds capacity");
        let storage = allocate::<T, A>(alloc, cap)?;
        Ok(Self {
            storage,
            head: front_spare,
            tail: front_spare,
            cap,
        })
    }

    /// Returns the allocation to `alloc` and resets to [`RawParts::dangling`].
    ///
    /// # Safety
    ///
    /// The live range must already be empty and the storage must have come
    /// from `alloc` (or an allocator comparing equal).
    pub(crate) unsafe fn release_in<A: Allocator>(&mut self, alloc: &A) {
        debug_assert_eq!(self.head, self.tail);
        deallocate(alloc, self.storage, self.cap);
        *self = Self::dangling();
    }

    #[inline]
    pub(crate) const fn len(&self) -> usize {
        self.tail - self.head
    }

    #[inline]
    pub(crate) const fn front_spare(&self) -> usize {
        self.head
    }

    #[inline]
    pub(crate) const fn back_spare(&self) -> usize {
        self.cap - self.tail
    }

    /// Pointer to slot `offset` of the allocation (`offset <= cap`).
    #[inline]
    pub(crate) fn slot(&self, offset: usize) -> *mut T {
        debug_assert!(offset <= self.cap);
        unsafe { self.storage.as_ptr().add(offset) }
    }

    #[inline]
    pub(crate) fn as_slice(&self) -> &[T] {
        unsafe { std::slice::from_raw_parts(self.slot(self.head), self.len()) }
    }

    #[inline]
    pub(crate) fn as_mut_slice(&mut self) -> &mut [T] {
        unsafe { std::slice::from_raw_parts_mut(self.slot(self.head), self.len()) }
    }

    /// Slides the live range `step` slots toward the front of the allocation.
    pub(crate) fn shift_toward_front(&mut self, step: usize) {
        debug_assert!(step <= self.head);
        unsafe { ptr::copy(self.slot(self.head), self.slot(self.head - step), self.len()) };
        self.head -= step;
        self.tail -= step;
    }

    /// Slides the live range `step` slots toward the back of the allocation.
    pub(crate) fn shift_toward_back(&mut self, step: usize) {
        debug_assert!(step <= self.back_spare());
        unsafe { ptr::copy(self.slot(self.head), self.slot(self.head + step), self.len()) };
        self.head += step;
        self.tail += step;
    }

    /// Appends `value`, rebalancing into the front spare if the back is full.
    ///
    /// # Safety
    ///
    /// The allocation must have at least one spare slot on either side.
    pub(crate) unsafe fn push_back_in_spare(&mut self, value: T) {
        if self.tail == self.cap {
            debug_assert!(self.head > 0);
            self.shift_toward_front(rebalance_step(self.head));
        }
        construct(self.slot(self.tail), value);
        self.tail += 1;
    }

    /// Prepends `value`, rebalancing into the back spare if the front is full.
    ///
    /// # Safety
    ///
    /// The allocation must have at least one spare slot on either side.
    pub(crate) unsafe fn push_front_in_spare(&mut self, value: T) {
        if self.head == 0 {
            debug_assert!(self.tail < self.cap);
            self.shift_toward_back(rebalance_step(self.back_spare()));
        }
        construct(self.slot(self.head - 1), value);
        self.head -= 1;
    }

    /// Moves the first live value out, narrowing the range.
    pub(crate) fn take_front(&mut self) -> Option<T> {
        if self.head == self.tail {
            return None;
        }
        let value = unsafe { ptr::read(self.slot(self.head)) };
        self.head += 1;
        Some(value)
    }

    /// Moves the last live value out, narrowing the range.
    pub(crate) fn take_back(&mut self) -> Option<T> {
        if self.head == self.tail {
            return None;
        }
        self.tail -= 1;
        Some(unsafe { ptr::read(self.slot(self.tail)) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use allocator_api2::alloc::Global;

    #[test]
    fn test_zero_length_is_dangling() {
        let ptr = allocate::<u64, _>(&Global, 0).unwrap();
        assert_eq!(ptr, NonNull::dangling());
        unsafe { deallocate(&Global, ptr, 0) };
    }

    #[test]
    fn test_zst_never_allocates() {
        let ptr = allocate::<(), _>(&Global, 1_000_000).unwrap();
        assert_eq!(ptr, NonNull::dangling());
        assert_eq!(max_len::<()>(), usize::MAX);
    }

    #[test]
    fn test_length_exceeded() {
        let err = allocate::<u64, _>(&Global, usize::MAX).unwrap_err();
        assert_eq!(err, Error::length_exceeded(usize::MAX, max_len::<u64>()));
    }

    #[test]
    fn test_resolve_range() {
        assert_eq!(resolve_range(.., 5), 0..5);
        assert_eq!(resolve_range(1..=2, 5), 1..3);
        assert_eq!(resolve_range(3.., 5), 3..5);
        assert_eq!(resolve_range(..0, 5), 0..0);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_resolve_range_past_end() {
        resolve_range(2..6, 5);
    }

    #[test]
    fn test_spare_bookkeeping() {
        let mut parts = RawParts::<i32>::allocate_in(&Global, 8, 3).unwrap();
        assert_eq!(parts.front_spare(), 3);
        assert_eq!(parts.back_spare(), 5);
        assert_eq!(parts.len(), 0);

        unsafe {
            parts.push_back_in_spare(1);
            parts.push_back_in_spare(2);
            parts.push_front_in_spare(0);
        }
        assert_eq!(parts.as_slice(), &[0, 1, 2]);
        assert_eq!(parts.front_spare(), 2);
        assert_eq!(parts.back_spare(), 3);

        parts.tail = parts.head;
        unsafe { parts.release_in(&Global) };
        assert_eq!(parts.cap, 0);
    }

    #[test]
    fn test_push_rebalances_when_one_side_is_full() {
        let mut parts = RawParts::<i32>::allocate_in(&Global, 4, 4).unwrap();
        unsafe {
            // Back is full from the start; the first push slides toward the front.
            parts.push_back_in_spare(10);
            parts.push_back_in_spare(11);
        }
        assert_eq!(parts.as_slice(), &[10, 11]);
        assert!(parts.tail <= parts.cap);

        assert_eq!(parts.take_front(), Some(10));
        assert_eq!(parts.take_back(), Some(11));
        assert_eq!(parts.take_back(), None);
        unsafe { parts.release_in(&Global) };
    }
}
