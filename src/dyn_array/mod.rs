//! A contiguous growable array with a pluggable allocation strategy.
//!
//! [`DynArray`] keeps its elements at the front of a single allocation. All
//! reallocation goes through a [`ScratchBuffer`]: the new storage is built
//! first, new elements are placed in it, the existing elements are relocated
//! around them, and the buffers swap storage. If anything fails before the
//! swap the array is untouched.

mod into_iter;

pub use into_iter::IntoIter;

use std::cmp::{self, Ordering};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::mem::{self, ManuallyDrop};
use std::ops::{Deref, DerefMut, Index, IndexMut, RangeBounds};
use std::ptr;
use std::slice::SliceIndex;

use allocator_api2::alloc::{Allocator, Global};

use crate::error::{handle_error, Error, Result};
use crate::raw::{self, RawParts};
use crate::scratch::ScratchBuffer;

/// A contiguous growable array.
///
/// Growth follows a doubling policy: when more room is needed the capacity
/// becomes `max(2 * capacity, required)`, clamped to [`DynArray::max_len`].
/// [`DynArray::reserve`] and [`DynArray::shrink_to_fit`] request exact sizes.
///
/// # Example
///
/// ```
/// use seqbuf::DynArray;
///
/// let mut arr = DynArray::new();
/// arr.push_back(1);
/// arr.push_back(3);
/// arr.insert(1, 2);
/// assert_eq!(arr, [1, 2, 3]);
/// assert!(arr.at(5).is_err());
/// ```
pub struct DynArray<T, A: Allocator = Global> {
    /// Storage with `head` pinned at zero.
    raw: RawParts<T>,
    alloc: A,
}

impl<T> DynArray<T> {
    /// Creates an empty array. Does not allocate.
    #[inline]
    pub const fn new() -> Self {
        Self::new_in(Global)
    }

    /// Creates an empty array with room for exactly `capacity` elements.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` exceeds [`DynArray::max_len`].
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_in(capacity, Global)
    }

    /// Creates an array holding `n` clones of `value`.
    ///
    /// ```
    /// use seqbuf::DynArray;
    ///
    /// let arr = DynArray::from_elem("x", 3);
    /// assert_eq!(arr, ["x", "x", "x"]);
    /// assert_eq!(arr.capacity(), 3);
    /// ```
    pub fn from_elem(value: T, n: usize) -> Self
    where
        T: Clone,
    {
        let mut arr = Self::with_capacity(n);
        arr.resize(n, value);
        arr
    }

    /// Creates an array holding `n` default values.
    pub fn from_default(n: usize) -> Self
    where
        T: Default,
    {
        let mut arr = Self::with_capacity(n);
        arr.resize_with(n, T::default);
        arr
    }
}

impl<T, A: Allocator> DynArray<T, A> {
    /// Creates an empty array using `alloc`. Does not allocate.
    #[inline]
    pub const fn new_in(alloc: A) -> Self {
        Self {
            raw: RawParts::dangling(),
            alloc,
        }
    }

    /// Creates an empty array with room for exactly `capacity` elements, using `alloc`.
    pub fn with_capacity_in(capacity: usize, alloc: A) -> Self {
        match Self::try_with_capacity_in(capacity, alloc) {
            Ok(arr) => arr,
            Err(err) => handle_error(err),
        }
    }

    /// Fallible form of [`DynArray::with_capacity_in`].
    pub fn try_with_capacity_in(capacity: usize, alloc: A) -> Result<Self> {
        let raw = RawParts::allocate_in(&alloc, capacity, 0)?;
        Ok(Self { raw, alloc })
    }

    /// Moves `other` into an array that allocates from `alloc`.
    ///
    /// When `alloc` compares equal to the allocator of `other` the storage is
    /// adopted as is. Otherwise fresh storage is obtained from `alloc`, the
    /// elements are relocated into it, and the old storage is returned to the
    /// allocator it came from.
    ///
    /// # Panics
    ///
    /// Panics if the fresh allocation fails.
    pub fn move_in(mut other: Self, alloc: A) -> Self
    where
        A: PartialEq,
    {
        if other.alloc == alloc {
            let raw = mem::replace(&mut other.raw, RawParts::dangling());
            return Self { raw, alloc };
        }
        let len = other.len();
        let mut moved = Self::with_capacity_in(len, alloc);
        unsafe { raw::relocate(other.raw.slot(0), moved.raw.slot(0), len) };
        other.raw.tail = 0;
        moved.raw.tail = len;
        tracing::trace!(len, "dynamic array relocated across allocators");
        moved
    }

    /// Number of elements.
    #[inline]
    pub const fn len(&self) -> usize {
        self.raw.tail
    }

    /// Returns `true` if the array holds no elements.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.raw.tail == 0
    }

    /// Number of elements the array can hold without reallocating.
    #[inline]
    pub const fn capacity(&self) -> usize {
        self.raw.cap
    }

    /// Largest length the allocation strategy can represent for `T`.
    #[inline]
    pub const fn max_len(&self) -> usize {
        raw::max_len::<T>()
    }

    /// The allocation strategy backing this array.
    #[inline]
    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    /// Ensures the capacity is at least `capacity`, allocating exactly that
    /// much if it has to grow.
    ///
    /// Unlike [`Vec::reserve`] the argument is a total, not an additional count.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` exceeds [`DynArray::max_len`].
    pub fn reserve(&mut self, capacity: usize) {
        if let Err(err) = self.try_reserve(capacity) {
            handle_error(err);
        }
    }

    /// Fallible form of [`DynArray::reserve`]. On error the array is unchanged.
    pub fn try_reserve(&mut self, capacity: usize) -> Result<()> {
        if capacity <= self.capacity() {
            return Ok(());
        }
        let max = self.max_len();
        if capacity > max {
            return Err(Error::length_exceeded(capacity, max));
        }
        self.relocate_into(capacity)
    }

    /// Reduces the capacity to the length.
    ///
    /// If the smaller allocation cannot be obtained the array keeps its
    /// current storage; no error is reported.
    pub fn shrink_to_fit(&mut self) {
        if self.capacity() > self.len() {
            if let Err(err) = self.relocate_into(self.len()) {
                tracing::debug!(%err, len = self.len(), "dynamic array shrink skipped");
            }
        }
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        self.raw.as_slice()
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.raw.as_mut_slice()
    }

    /// Pointer to the first element. Dangling when the capacity is zero.
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.raw.storage.as_ptr()
    }

    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.raw.storage.as_ptr()
    }

    /// Bounds-checked access.
    ///
    /// Returns [`Error::IndexOutOfRange`] when `index >= len()`.
    pub fn at(&self, index: usize) -> Result<&T> {
        let len = self.len();
        self.as_slice()
            .get(index)
            .ok_or(Error::index_out_of_range(index, len))
    }

    /// Bounds-checked mutable access.
    pub fn at_mut(&mut self, index: usize) -> Result<&mut T> {
        let len = self.len();
        self.as_mut_slice()
            .get_mut(index)
            .ok_or(Error::index_out_of_range(index, len))
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

    /// Appends `value`.
    ///
    /// # Panics
    ///
    /// Panics if the length would exceed [`DynArray::max_len`].
    #[inline]
    pub fn push_back(&mut self, value: T) {
        self.emplace_back_with(|| value);
    }

    /// Fallible form of [`DynArray::push_back`]. On error the array is
    /// unchanged and `value` is dropped.
    #[inline]
    pub fn try_push_back(&mut self, value: T) -> Result<()> {
        self.try_emplace_back_with(|| value).map(|_| ())
    }

    /// Appends the value produced by `f` and returns a reference to it.
    ///
    /// When the array is full `f` runs after the new storage is obtained but
    /// before any existing element moves, so a panic in `f` leaves the array
    /// unchanged.
    #[inline]
    pub fn emplace_back_with<F>(&mut self, f: F) -> &mut T
    where
        F: FnOnce() -> T,
    {
        match self.try_emplace_back_with(f) {
            Ok(slot) => slot,
            Err(err) => handle_error(err),
        }
    }

    /// Fallible form of [`DynArray::emplace_back_with`].
    pub fn try_emplace_back_with<F>(&mut self, f: F) -> Result<&mut T>
    where
        F: FnOnce() -> T,
    {
        if self.raw.tail == self.raw.cap {
            return self.emplace_realloc(self.len(), f);
        }
        let slot = self.raw.slot(self.raw.tail);
        unsafe {
            raw::construct(slot, f());
            self.raw.tail += 1;
            Ok(&mut *slot)
        }
    }

    /// Removes the last element and returns it.
    #[inline]
    pub fn pop_back(&mut self) -> Option<T> {
        self.raw.take_back()
    }

    /// Inserts `value` at `index`, shifting later elements back.
    ///
    /// # Panics
    ///
    /// Panics if `index > len()`.
    pub fn insert(&mut self, index: usize, value: T) {
        self.emplace(index, || value);
    }

    /// Inserts the value produced by `f` at `index` and returns a reference to it.
    ///
    /// A panic in `f` leaves the array unchanged.
    ///
    /// # Panics
    ///
    /// Panics if `index > len()`.
    pub fn emplace<F>(&mut self, index: usize, f: F) -> &mut T
    where
        F: FnOnce() -> T,
    {
        let len = self.len();
        assert!(
            index <= len,
            "insertion index (is {index}) should be <= len (is {len})"
        );
        if self.raw.tail == self.raw.cap {
            return match self.emplace_realloc(index, f) {
                Ok(slot) => slot,
                Err(err) => handle_error(err),
            };
        }
        let value = f();
        unsafe {
            let slot = self.raw.slot(index);
            ptr::copy(slot, slot.add(1), len - index);
            raw::construct(slot, value);
            self.raw.tail += 1;
            &mut *slot
        }
    }

    /// Inserts `count` clones of `value` at `index`.
    ///
    /// If a clone panics while the array is reallocating, the array is
    /// unchanged. In place, the clones made so far stay and the rest of the
    /// array closes up behind them.
    ///
    /// # Panics
    ///
    /// Panics if `index > len()`.
    pub fn insert_n(&mut self, index: usize, count: usize, value: &T)
    where
        T: Clone,
    {
        self.insert_with(index, count, |_| value.clone());
    }

    /// Inserts clones of `items` at `index`, with the same guarantees as
    /// [`DynArray::insert_n`].
    pub fn insert_from_slice(&mut self, index: usize, items: &[T])
    where
        T: Clone,
    {
        self.insert_with(index, items.len(), |i| items[i].clone());
    }

    /// Inserts every item of `iter` at `index`, preserving their order.
    ///
    /// The items are appended first and then rotated into place. If the
    /// iterator panics the items produced so far remain at the end.
    pub fn insert_iter<I>(&mut self, index: usize, iter: I)
    where
        I: IntoIterator<Item = T>,
    {
        let len = self.len();
        assert!(
            index <= len,
            "insertion index (is {index}) should be <= len (is {len})"
        );
        self.extend(iter);
        self.as_mut_slice()[index..].rotate_left(len - index);
    }

    /// Removes and returns the element at `index`, shifting later elements forward.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn remove(&mut self, index: usize) -> T {
        let len = self.len();
        assert!(
            index < len,
            "removal index (is {index}) should be < len (is {len})"
        );
        unsafe {
            let slot = self.raw.slot(index);
            let value = ptr::read(slot);
            ptr::copy(slot.add(1), slot, len - index - 1);
            self.raw.tail -= 1;
            value
        }
    }

    /// Destroys the elements in `range` and closes the gap.
    ///
    /// # Panics
    ///
    /// Panics if the range is out of bounds. If an element's destructor
    /// panics, the remaining elements of the range are still destroyed and
    /// the gap is still closed.
    pub fn erase<R>(&mut self, range: R)
    where
        R: RangeBounds<usize>,
    {
        let len = self.len();
        let range = raw::resolve_range(range, len);
        if range.is_empty() {
            return;
        }
        self.raw.tail = range.start;
        let gap = GapGuard {
            raw: &mut self.raw,
            start: range.start,
            filled: 0,
            width: range.len(),
            suffix: len - range.end,
        };
        unsafe {
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(
                gap.raw.slot(range.start),
                range.len(),
            ));
        }
    }

    /// Keeps the first `len` elements and destroys the rest.
    pub fn truncate(&mut self, len: usize) {
        let old_len = self.len();
        if len >= old_len {
            return;
        }
        self.raw.tail = len;
        unsafe {
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(
                self.raw.slot(len),
                old_len - len,
            ));
        }
    }

    /// Destroys every element. The capacity is kept.
    #[inline]
    pub fn clear(&mut self) {
        self.truncate(0);
    }

    /// Resizes to `new_len`, filling new slots with values produced by `f`.
    pub fn resize_with<F>(&mut self, new_len: usize, mut f: F)
    where
        F: FnMut() -> T,
    {
        let len = self.len();
        if new_len <= len {
            self.truncate(new_len);
            return;
        }
        if let Err(err) = self.grow_amortized(new_len - len) {
            handle_error(err);
        }
        while self.raw.tail < new_len {
            unsafe { raw::construct(self.raw.slot(self.raw.tail), f()) };
            self.raw.tail += 1;
        }
    }

    /// Resizes to `new_len`, filling new slots with clones of `value`.
    pub fn resize(&mut self, new_len: usize, value: T)
    where
        T: Clone,
    {
        self.resize_with(new_len, || value.clone());
    }

    /// Appends clones of `items`. If a clone panics during reallocation the
    /// array is unchanged.
    pub fn extend_from_slice(&mut self, items: &[T])
    where
        T: Clone,
    {
        self.insert_from_slice(self.len(), items);
    }

    /// Replaces the contents with the items of `iter`.
    pub fn assign_iter<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = T>,
    {
        self.clear();
        self.extend(iter);
    }

    /// Replaces the contents with `n` clones of `value`.
    pub fn assign_elem(&mut self, n: usize, value: &T)
    where
        T: Clone,
    {
        self.clear();
        self.resize_with(n, || value.clone());
    }

    /// Exchanges contents, storage and allocator with `other`.
    #[inline]
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(self, other);
    }

    /// Capacity to grow to so that `new_len` elements fit.
    fn recommend(&self, new_len: usize) -> Result<usize> {
        let max = self.max_len();
        if new_len > max {
            return Err(Error::length_exceeded(new_len, max));
        }
        let cap = self.capacity();
        if cap >= max / 2 {
            return Ok(max);
        }
        Ok(cmp::max(2 * cap, new_len))
    }

    fn grown_len(&self, additional: usize) -> Result<usize> {
        self.len()
            .checked_add(additional)
            .ok_or_else(|| Error::length_exceeded(usize::MAX, self.max_len()))
    }

    /// Ensures room for `additional` more elements under the growth policy.
    fn grow_amortized(&mut self, additional: usize) -> Result<()> {
        let needed = self.grown_len(additional)?;
        if needed > self.capacity() {
            let cap = self.recommend(needed)?;
            self.relocate_into(cap)?;
        }
        Ok(())
    }

    /// Moves every element into a fresh allocation of exactly `capacity` slots.
    fn relocate_into(&mut self, capacity: usize) -> Result<()> {
        let mut buf = ScratchBuffer::try_with_capacity_in(capacity, 0, &self.alloc)?;
        buf.take_around(&mut self.raw, 0);
        tracing::trace!(
            old_capacity = buf.capacity(),
            new_capacity = capacity,
            "dynamic array reallocated"
        );
        Ok(())
    }

    /// Grows, constructing the value from `f` in the new storage at `index`
    /// before relocating the existing elements around it.
    #[cold]
    #[inline(never)]
    fn emplace_realloc<F>(&mut self, index: usize, f: F) -> Result<&mut T>
    where
        F: FnOnce() -> T,
    {
        let new_cap = self.recommend(self.grown_len(1)?)?;
        let mut buf = ScratchBuffer::try_with_capacity_in(new_cap, index, &self.alloc)?;
        unsafe { buf.raw.push_back_in_spare(f()) };
        buf.take_around(&mut self.raw, index);
        tracing::trace!(
            old_capacity = buf.capacity(),
            new_capacity = new_cap,
            "dynamic array reallocated"
        );
        Ok(unsafe { &mut *self.raw.slot(index) })
    }

    /// Inserts `count` values, the `i`th produced by `f(i)`, at `index`.
    fn insert_with<F>(&mut self, index: usize, count: usize, mut f: F)
    where
        F: FnMut(usize) -> T,
    {
        let len = self.len();
        assert!(
            index <= len,
            "insertion index (is {index}) should be <= len (is {len})"
        );
        if count == 0 {
            return;
        }

        if count <= self.raw.back_spare() {
            unsafe {
                let base = self.raw.slot(index);
                ptr::copy(base, base.add(count), len - index);
            }
            self.raw.tail = index;
            let mut gap = GapGuard {
                raw: &mut self.raw,
                start: index,
                filled: 0,
                width: count,
                suffix: len - index,
            };
            while gap.filled < count {
                let value = f(gap.filled);
                unsafe { raw::construct(gap.raw.slot(index + gap.filled), value) };
                gap.filled += 1;
            }
            return;
        }

        let new_cap = match self.grown_len(count).and_then(|n| self.recommend(n)) {
            Ok(cap) => cap,
            Err(err) => handle_error(err),
        };
        let mut buf = match ScratchBuffer::try_with_capacity_in(new_cap, index, &self.alloc) {
            Ok(buf) => buf,
            Err(err) => handle_error(err),
        };
        let mut produced = 0;
        unsafe {
            buf.construct_at_end_with(count, || {
                let value = f(produced);
                produced += 1;
                value
            });
        }
        buf.take_around(&mut self.raw, index);
        tracing::trace!(
            old_capacity = buf.capacity(),
            new_capacity = new_cap,
            count,
            "dynamic array reallocated for bulk insert"
        );
    }
}

/// A hole of `width` slots at `start`, followed by `suffix` live elements.
///
/// The first `filled` slots of the hole are live. Dropping the guard moves
/// the suffix down to sit right after them and publishes the new length, so
/// it closes the hole whether or not filling finished.
struct GapGuard<'a, T> {
    raw: &'a mut RawParts<T>,
    start: usize,
    filled: usize,
    width: usize,
    suffix: usize,
}

impl<T> Drop for GapGuard<'_, T> {
    fn drop(&mut self) {
        let end = self.start + self.filled;
        if self.filled != self.width {
            unsafe {
                ptr::copy(
                    self.raw.slot(self.start + self.width),
                    self.raw.slot(end),
                    self.suffix,
                );
            }
        }
        self.raw.tail = end + self.suffix;
    }
}

impl<T, A: Allocator> Drop for DynArray<T, A> {
    fn drop(&mut self) {
        self.clear();
        unsafe { self.raw.release_in(&self.alloc) };
    }
}

impl<T, A: Allocator> Deref for DynArray<T, A> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T, A: Allocator> DerefMut for DynArray<T, A> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T, I: SliceIndex<[T]>, A: Allocator> Index<I> for DynArray<T, A> {
    type Output = I::Output;

    #[inline]
    fn index(&self, index: I) -> &Self::Output {
        Index::index(self.as_slice(), index)
    }
}

impl<T, I: SliceIndex<[T]>, A: Allocator> IndexMut<I> for DynArray<T, A> {
    #[inline]
    fn index_mut(&mut self, index: I) -> &mut Self::Output {
        IndexMut::index_mut(self.as_mut_slice(), index)
    }
}

impl<T: Clone, A: Allocator + Clone> Clone for DynArray<T, A> {
    fn clone(&self) -> Self {
        let mut copy = Self::with_capacity_in(self.len(), self.alloc.clone());
        copy.extend_from_slice(self);
        copy
    }
}

impl<T, A: Allocator + Default> Default for DynArray<T, A> {
    fn default() -> Self {
        Self::new_in(A::default())
    }
}

impl<T: fmt::Debug, A: Allocator> fmt::Debug for DynArray<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_slice(), f)
    }
}

impl<T, U, A: Allocator, B: Allocator> PartialEq<DynArray<U, B>> for DynArray<T, A>
where
    T: PartialEq<U>,
{
    fn eq(&self, other: &DynArray<U, B>) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T, U, A: Allocator> PartialEq<[U]> for DynArray<T, A>
where
    T: PartialEq<U>,
{
    fn eq(&self, other: &[U]) -> bool {
        self.as_slice() == other
    }
}

impl<T, U, A: Allocator> PartialEq<Vec<U>> for DynArray<T, A>
where
    T: PartialEq<U>,
{
    fn eq(&self, other: &Vec<U>) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T, U, A: Allocator, const N: usize> PartialEq<[U; N]> for DynArray<T, A>
where
    T: PartialEq<U>,
{
    fn eq(&self, other: &[U; N]) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Eq, A: Allocator> Eq for DynArray<T, A> {}

impl<T: PartialOrd, A: Allocator> PartialOrd for DynArray<T, A> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.as_slice().partial_cmp(other.as_slice())
    }
}

impl<T: Ord, A: Allocator> Ord for DynArray<T, A> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_slice().cmp(other.as_slice())
    }
}

impl<T: Hash, A: Allocator> Hash for DynArray<T, A> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_slice().hash(state);
    }
}

impl<T, A: Allocator> Extend<T> for DynArray<T, A> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        let (lower, _) = iter.size_hint();
        if let Err(err) = self.grow_amortized(lower) {
            handle_error(err);
        }
        for value in iter {
            self.push_back(value);
        }
    }
}

impl<'a, T: Copy + 'a, A: Allocator> Extend<&'a T> for DynArray<T, A> {
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        self.extend(iter.into_iter().copied());
    }
}

impl<T> FromIterator<T> for DynArray<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut arr = Self::new();
        arr.extend(iter);
        arr
    }
}

impl<T: Clone> From<&[T]> for DynArray<T> {
    fn from(items: &[T]) -> Self {
        let mut arr = Self::with_capacity(items.len());
        arr.extend_from_slice(items);
        arr
    }
}

impl<T, const N: usize> From<[T; N]> for DynArray<T> {
    fn from(items: [T; N]) -> Self {
        let mut arr = Self::with_capacity(N);
        arr.extend(items);
        arr
    }
}

impl<T, A: Allocator> IntoIterator for DynArray<T, A> {
    type Item = T;
    type IntoIter = IntoIter<T, A>;

    fn into_iter(self) -> Self::IntoIter {
        let this = ManuallyDrop::new(self);
        // `this` is never dropped, so its storage and allocator move to the iterator exactly once.
        let buf = unsafe {
            ScratchBuffer::from_parts_in(ptr::read(&this.raw), ptr::read(&this.alloc))
        };
        IntoIter::new(buf)
    }
}

impl<'a, T, A: Allocator> IntoIterator for &'a DynArray<T, A> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.as_slice().iter()
    }
}

impl<'a, T, A: Allocator> IntoIterator for &'a mut DynArray<T, A> {
    type Item = &'a mut T;
    type IntoIter = std::slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.as_mut_slice().iter_mut()
    }
}

// Safety: DynArray uniquely owns its elements and its allocation.
unsafe impl<T: Send, A: Allocator + Send> Send for DynArray<T, A> {}
unsafe impl<T: Sync, A: Allocator + Sync> Sync for DynArray<T, A> {}
