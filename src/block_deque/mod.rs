//! A double-ended queue stored in fixed-size blocks.
//!
//! [`BlockDeque`] keeps its elements in equally sized blocks reached through
//! a block index. Growing at either end adds whole blocks, so existing
//! elements never move when the deque grows; only the block pointers do.
//! Empty blocks at one end are recycled to the other end before any fresh
//! block is allocated.

mod block_map;
mod into_iter;
mod iter;

pub use into_iter::IntoIter;
pub use iter::{Iter, IterMut};

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter as std_iter;
use std::mem;
use std::ops::{Index, IndexMut, Range, RangeBounds};
use std::ptr;

use allocator_api2::alloc::{Allocator, Global};

use crate::config::DequeConfig;
use crate::error::{handle_error, Error, Result};
use crate::raw;
use block_map::BlockMap;

/// A double-ended queue built from fixed-size blocks.
///
/// Elements occupy the absolute slots `start..start + len` across the
/// concatenated blocks. The front slack is `start`; the back slack is
/// everything between the last element and the capacity.
///
/// # Example
///
/// ```
/// use seqbuf::BlockDeque;
///
/// let mut deque = BlockDeque::new();
/// deque.push_back(2);
/// deque.push_front(1);
/// deque.insert(2, 3);
/// assert_eq!(deque, [1, 2, 3]);
/// assert_eq!(deque.pop_front(), Some(1));
/// assert_eq!(deque[1], 3);
/// ```
pub struct BlockDeque<T, A: Allocator = Global> {
    map: BlockMap<T, A>,
    start: usize,
    len: usize,
}

impl<T> BlockDeque<T> {
    /// Creates an empty deque with the default block size for `T`.
    /// Does not allocate.
    #[inline]
    pub const fn new() -> Self {
        Self::new_in(Global)
    }

    /// Creates an empty deque with the given configuration.
    #[inline]
    pub const fn with_config(config: DequeConfig) -> Self {
        Self::with_config_in(config, Global)
    }

    /// Creates a deque holding `n` clones of `value`.
    pub fn from_elem(value: T, n: usize) -> Self
    where
        T: Clone,
    {
        let mut deque = Self::new();
        deque.resize(n, value);
        deque
    }

    /// Creates a deque holding `n` default values.
    pub fn from_default(n: usize) -> Self
    where
        T: Default,
    {
        let mut deque = Self::new();
        deque.resize_with(n, T::default);
        deque
    }
}

impl<T, A: Allocator> BlockDeque<T, A> {
    #[inline]
    pub const fn new_in(alloc: A) -> Self {
        Self::with_config_in(DequeConfig::for_type::<T>(), alloc)
    }

    #[inline]
    pub const fn with_config_in(config: DequeConfig, alloc: A) -> Self {
        Self::with_block_size_in(config.block_size(), alloc)
    }

    const fn with_block_size_in(block_size: usize, alloc: A) -> Self {
        Self {
            map: BlockMap::new_in(block_size, alloc),
            start: 0,
            len: 0,
        }
    }

    /// Moves `other` into a deque that allocates from `alloc`.
    ///
    /// When `alloc` compares equal to the allocator of `other` the blocks are
    /// adopted as they are. Otherwise each element is moved into blocks
    /// obtained from `alloc`, and the old blocks go back to the allocator of
    /// `other`.
    pub fn move_in(mut other: Self, alloc: A) -> Self
    where
        A: PartialEq,
    {
        if *other.allocator() == alloc {
            drop(mem::replace(&mut other.map.index.alloc, alloc));
            return other;
        }
        let mut moved = Self::with_block_size_in(other.block_size(), alloc);
        if let Err(err) = moved.reserve_back(other.len()) {
            handle_error(err);
        }
        while let Some(value) = other.pop_front() {
            moved.push_back(value);
        }
        tracing::trace!(len = moved.len(), "block deque relocated across allocators");
        moved
    }

    /// Number of elements.
    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Usable slots across all blocks: `block_count * block_size - 1`, or 0
    /// when no block is allocated.
    #[inline]
    pub const fn capacity(&self) -> usize {
        self.map.capacity()
    }

    #[inline]
    pub const fn block_size(&self) -> usize {
        self.map.block_size()
    }

    #[inline]
    pub const fn block_count(&self) -> usize {
        self.map.count()
    }

    /// Free slots before the first element.
    #[inline]
    pub const fn front_slack(&self) -> usize {
        self.start
    }

    /// Free slots after the last element.
    #[inline]
    pub const fn back_slack(&self) -> usize {
        self.capacity() - self.start - self.len
    }

    /// Largest length the allocation strategy can represent for `T`.
    #[inline]
    pub const fn max_len(&self) -> usize {
        raw::max_len::<T>()
    }

    #[inline]
    pub fn allocator(&self) -> &A {
        self.map.allocator()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        if index < self.len {
            Some(unsafe { &*self.map.slot(self.start + index) })
        } else {
            None
        }
    }

    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if index < self.len {
            Some(unsafe { &mut *self.map.slot(self.start + index) })
        } else {
            None
        }
    }

    /// Bounds-checked access.
    ///
    /// Returns [`Error::IndexOutOfRange`] when `index >= len()`.
    pub fn at(&self, index: usize) -> Result<&T> {
        let len = self.len;
        self.get(index).ok_or(Error::index_out_of_range(index, len))
    }

    /// Bounds-checked mutable access.
    pub fn at_mut(&mut self, index: usize) -> Result<&mut T> {
        let len = self.len;
        self.get_mut(index)
            .ok_or(Error::index_out_of_range(index, len))
    }

    #[inline]
    pub fn front(&self) -> Option<&T> {
        self.get(0)
    }

    #[inline]
    pub fn front_mut(&mut self) -> Option<&mut T> {
        self.get_mut(0)
    }

    #[inline]
    pub fn back(&self) -> Option<&T> {
        match self.len {
            0 => None,
            n => self.get(n - 1),
        }
    }

    #[inline]
    pub fn back_mut(&mut self) -> Option<&mut T> {
        match self.len {
            0 => None,
            n => self.get_mut(n - 1),
        }
    }

    /// Front-to-back iterator.
    #[inline]
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(
            self.map.blocks(),
            self.block_size(),
            self.start,
            self.start + self.len,
        )
    }

    /// Front-to-back iterator that allows modifying each element.
    #[inline]
    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        let (block_size, from, to) = (self.block_size(), self.start, self.start + self.len);
        IterMut::new(self.map.blocks(), block_size, from, to)
    }

    /// Prepends `value`.
    ///
    /// # Panics
    ///
    /// Panics if the length would exceed the maximum for `T`.
    #[inline]
    pub fn push_front(&mut self, value: T) {
        self.emplace_front_with(|| value);
    }

    /// Appends `value`.
    ///
    /// # Panics
    ///
    /// Panics if the length would exceed the maximum for `T`.
    #[inline]
    pub fn push_back(&mut self, value: T) {
        self.emplace_back_with(|| value);
    }

    /// Fallible form of [`BlockDeque::push_front`]. On error the deque is
    /// unchanged and `value` is dropped.
    pub fn try_push_front(&mut self, value: T) -> Result<()> {
        self.try_emplace_front_with(|| value).map(|_| ())
    }

    /// Fallible form of [`BlockDeque::push_back`].
    pub fn try_push_back(&mut self, value: T) -> Result<()> {
        self.try_emplace_back_with(|| value).map(|_| ())
    }

    /// Prepends the value produced by `f`.
    ///
    /// Room is secured before `f` runs; if `f` panics the deque keeps its
    /// elements and only gains slack.
    pub fn emplace_front_with<F>(&mut self, f: F) -> &mut T
    where
        F: FnOnce() -> T,
    {
        match self.try_emplace_front_with(f) {
            Ok(slot) => slot,
            Err(err) => handle_error(err),
        }
    }

    /// Appends the value produced by `f`, with the same guarantees as
    /// [`BlockDeque::emplace_front_with`].
    pub fn emplace_back_with<F>(&mut self, f: F) -> &mut T
    where
        F: FnOnce() -> T,
    {
        match self.try_emplace_back_with(f) {
            Ok(slot) => slot,
            Err(err) => handle_error(err),
        }
    }

    pub fn try_emplace_front_with<F>(&mut self, f: F) -> Result<&mut T>
    where
        F: FnOnce() -> T,
    {
        if self.start == 0 {
            self.reserve_front(1)?;
        }
        let slot = self.map.slot(self.start - 1);
        unsafe { raw::construct(slot, f()) };
        self.start -= 1;
        self.len += 1;
        Ok(unsafe { &mut *slot })
    }

    pub fn try_emplace_back_with<F>(&mut self, f: F) -> Result<&mut T>
    where
        F: FnOnce() -> T,
    {
        if self.back_slack() == 0 {
            self.reserve_back(1)?;
        }
        let slot = self.map.slot(self.start + self.len);
        unsafe { raw::construct(slot, f()) };
        self.len += 1;
        Ok(unsafe { &mut *slot })
    }

    /// Removes the first element. Releases the front block once two whole
    /// blocks of front slack have built up.
    pub fn pop_front(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let value = unsafe { ptr::read(self.map.slot(self.start)) };
        self.start += 1;
        self.len -= 1;
        self.trim_front();
        Some(value)
    }

    /// Removes the last element. Releases the back block once two whole
    /// blocks of back slack have built up.
    pub fn pop_back(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        let value = unsafe { ptr::read(self.map.slot(self.start + self.len)) };
        self.trim_back();
        Some(value)
    }

    /// Inserts `value` at `index`, shifting whichever side is shorter.
    ///
    /// # Panics
    ///
    /// Panics if `index > len()`.
    pub fn insert(&mut self, index: usize, value: T) {
        self.emplace(index, || value);
    }

    /// Inserts the value produced by `f` at `index` and returns a reference to it.
    ///
    /// Slack is secured and `f` runs before any element moves, so a panic in
    /// `f` leaves the elements untouched.
    ///
    /// # Panics
    ///
    /// Panics if `index > len()`.
    pub fn emplace<F>(&mut self, index: usize, f: F) -> &mut T
    where
        F: FnOnce() -> T,
    {
        let len = self.len;
        assert!(
            index <= len,
            "insertion index (is {index}) should be <= len (is {len})"
        );
        if index < len - index {
            if self.start == 0 {
                if let Err(err) = self.reserve_front(1) {
                    handle_error(err);
                }
            }
            let value = f();
            let new_start = self.start - 1;
            for i in 0..index {
                self.move_slot(self.start + i, new_start + i);
            }
            let slot = self.map.slot(new_start + index);
            unsafe { raw::construct(slot, value) };
            self.start = new_start;
            self.len += 1;
            unsafe { &mut *slot }
        } else {
            if self.back_slack() == 0 {
                if let Err(err) = self.reserve_back(1) {
                    handle_error(err);
                }
            }
            let value = f();
            for i in (index..len).rev() {
                self.move_slot(self.start + i, self.start + i + 1);
            }
            let slot = self.map.slot(self.start + index);
            unsafe { raw::construct(slot, value) };
            self.len += 1;
            unsafe { &mut *slot }
        }
    }

    /// Inserts `count` clones of `value` at `index`.
    pub fn insert_n(&mut self, index: usize, count: usize, value: &T)
    where
        T: Clone,
    {
        self.insert_iter(index, std_iter::repeat(value).take(count).cloned());
    }

    /// Inserts every item of `iter` at `index`, preserving their order.
    ///
    /// Items are pushed onto the end nearer to `index` and then rotated into
    /// place. If the iterator panics the items produced so far stay at that end.
    ///
    /// # Panics
    ///
    /// Panics if `index > len()`.
    pub fn insert_iter<I>(&mut self, index: usize, iter: I)
    where
        I: IntoIterator<Item = T>,
    {
        let len = self.len;
        assert!(
            index <= len,
            "insertion index (is {index}) should be <= len (is {len})"
        );
        let iter = iter.into_iter();
        let (lower, _) = iter.size_hint();

        if index < len - index {
            if let Err(err) = self.reserve_front(lower) {
                handle_error(err);
            }
            for value in iter {
                self.push_front(value);
            }
            let count = self.len - len;
            self.reverse_range(0, count + index);
            self.reverse_range(0, index);
        } else {
            if let Err(err) = self.reserve_back(lower) {
                handle_error(err);
            }
            for value in iter {
                self.push_back(value);
            }
            let end = self.len;
            self.reverse_range(index, len);
            self.reverse_range(len, end);
            self.reverse_range(index, end);
        }
    }

    /// Removes and returns the element at `index`, or `None` if out of range.
    pub fn remove(&mut self, index: usize) -> Option<T> {
        if index >= self.len {
            return None;
        }
        let value = unsafe { ptr::read(self.map.slot(self.start + index)) };
        if index < self.len - index - 1 {
            for i in (0..index).rev() {
                self.move_slot(self.start + i, self.start + i + 1);
            }
            self.start += 1;
            self.len -= 1;
            self.trim_front();
        } else {
            for i in index + 1..self.len {
                self.move_slot(self.start + i, self.start + i - 1);
            }
            self.len -= 1;
            self.trim_back();
        }
        Some(value)
    }

    /// Destroys the elements in `range`.
    ///
    /// The doomed elements are rotated to the nearer end and popped there,
    /// so a panicking destructor leaves the survivors in order.
    ///
    /// # Panics
    ///
    /// Panics if the range is out of bounds.
    pub fn erase<R>(&mut self, range: R)
    where
        R: RangeBounds<usize>,
    {
        let len = self.len;
        let Range { start, end } = raw::resolve_range(range, len);
        let count = end - start;
        if count == 0 {
            return;
        }
        if start < len - end {
            self.reverse_range(0, end);
            self.reverse_range(count, end);
            for _ in 0..count {
                drop(self.pop_front());
            }
        } else {
            self.reverse_range(start, len);
            self.reverse_range(start, start + (len - end));
            for _ in 0..count {
                drop(self.pop_back());
            }
        }
    }

    /// Keeps the first `len` elements and destroys the rest.
    pub fn truncate(&mut self, len: usize) {
        while self.len > len {
            drop(self.pop_back());
        }
    }

    /// Destroys every element and releases all blocks but one, which is kept
    /// with the slack split evenly around the empty range.
    pub fn clear(&mut self) {
        let (start, len) = (self.start, self.len);
        self.len = 0;
        for pos in start..start + len {
            unsafe { raw::destroy(self.map.slot(pos)) };
        }
        self.map.release_down_to(1);
        self.start = if self.map.count() > 0 {
            self.block_size() / 2
        } else {
            0
        };
    }

    /// Resizes to `new_len`, filling new slots at the back with values from `f`.
    pub fn resize_with<F>(&mut self, new_len: usize, mut f: F)
    where
        F: FnMut() -> T,
    {
        if new_len <= self.len {
            self.truncate(new_len);
            return;
        }
        if let Err(err) = self.reserve_back(new_len - self.len) {
            handle_error(err);
        }
        while self.len < new_len {
            self.push_back(f());
        }
    }

    /// Resizes to `new_len`, filling new slots at the back with clones of `value`.
    pub fn resize(&mut self, new_len: usize, value: T)
    where
        T: Clone,
    {
        self.resize_with(new_len, || value.clone());
    }

    /// Releases every block that holds no element and shrinks the block index.
    pub fn shrink_to_fit(&mut self) {
        let b = self.block_size();
        if self.len == 0 {
            self.map.release_down_to(0);
            self.start = 0;
        } else {
            while self.start >= b {
                self.map.release_front();
                self.start -= b;
            }
            while self.back_slack() >= b {
                self.map.release_back();
            }
        }
        self.map.shrink_index();
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

    /// Exchanges contents, blocks and allocator with `other`.
    #[inline]
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(self, other);
    }

    fn check_growth(&self, additional: usize) -> Result<()> {
        let max = raw::max_len::<T>();
        match self.len.checked_add(additional) {
            Some(total) if total <= max => Ok(()),
            _ => Err(Error::length_exceeded(
                self.len.saturating_add(additional),
                max,
            )),
        }
    }

    /// Ensures at least `additional` slots of front slack.
    fn reserve_front(&mut self, additional: usize) -> Result<()> {
        self.check_growth(additional)?;
        if self.start < additional {
            self.start = self
                .map
                .alloc_front(additional - self.start, self.start, self.len)?;
        }
        Ok(())
    }

    /// Ensures at least `additional` slots of back slack.
    fn reserve_back(&mut self, additional: usize) -> Result<()> {
        self.check_growth(additional)?;
        let slack = self.back_slack();
        if slack < additional {
            self.start = self.map.alloc_back(additional - slack, self.start)?;
        }
        Ok(())
    }

    fn trim_front(&mut self) {
        let b = self.block_size();
        if self.start >= 2 * b {
            self.map.release_front();
            self.start -= b;
        }
    }

    fn trim_back(&mut self) {
        if self.back_slack() >= 2 * self.block_size() {
            self.map.release_back();
        }
    }

    /// Moves the live value in absolute slot `from` into the empty slot `to`.
    #[inline]
    fn move_slot(&self, from: usize, to: usize) {
        unsafe { raw::relocate(self.map.slot(from), self.map.slot(to), 1) };
    }

    /// Reverses the elements with logical indices in `lo..hi`.
    fn reverse_range(&mut self, lo: usize, hi: usize) {
        let (mut i, mut j) = (self.start + lo, self.start + hi);
        while j > i + 1 {
            j -= 1;
            unsafe { ptr::swap(self.map.slot(i), self.map.slot(j)) };
            i += 1;
        }
    }
}

impl<T, A: Allocator> Drop for BlockDeque<T, A> {
    fn drop(&mut self) {
        // The remaining block is freed by the block map.
        self.clear();
    }
}

impl<T, A: Allocator> Index<usize> for BlockDeque<T, A> {
    type Output = T;

    #[inline]
    fn index(&self, index: usize) -> &T {
        match self.get(index) {
            Some(value) => value,
            None => panic!(
                "index out of bounds: the len is {} but the index is {index}",
                self.len
            ),
        }
    }
}

impl<T, A: Allocator> IndexMut<usize> for BlockDeque<T, A> {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut T {
        let len = self.len;
        match self.get_mut(index) {
            Some(value) => value,
            None => panic!("index out of bounds: the len is {len} but the index is {index}"),
        }
    }
}

impl<T: Clone, A: Allocator + Clone> Clone for BlockDeque<T, A> {
    fn clone(&self) -> Self {
        let mut copy = Self::with_block_size_in(self.block_size(), self.allocator().clone());
        copy.extend(self.iter().cloned());
        copy
    }
}

impl<T, A: Allocator + Default> Default for BlockDeque<T, A> {
    fn default() -> Self {
        Self::new_in(A::default())
    }
}

impl<T: fmt::Debug, A: Allocator> fmt::Debug for BlockDeque<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T, U, A: Allocator, B: Allocator> PartialEq<BlockDeque<U, B>> for BlockDeque<T, A>
where
    T: PartialEq<U>,
{
    fn eq(&self, other: &BlockDeque<U, B>) -> bool {
        self.len == other.len() && self.iter().eq(other.iter())
    }
}

impl<T, U, A: Allocator> PartialEq<[U]> for BlockDeque<T, A>
where
    T: PartialEq<U>,
{
    fn eq(&self, other: &[U]) -> bool {
        self.len == other.len() && self.iter().eq(other.iter())
    }
}

impl<T, U, A: Allocator> PartialEq<Vec<U>> for BlockDeque<T, A>
where
    T: PartialEq<U>,
{
    fn eq(&self, other: &Vec<U>) -> bool {
        *self == *other.as_slice()
    }
}

impl<T, U, A: Allocator, const N: usize> PartialEq<[U; N]> for BlockDeque<T, A>
where
    T: PartialEq<U>,
{
    fn eq(&self, other: &[U; N]) -> bool {
        *self == *other.as_slice()
    }
}

impl<T: Eq, A: Allocator> Eq for BlockDeque<T, A> {}

impl<T: PartialOrd, A: Allocator> PartialOrd for BlockDeque<T, A> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.iter().partial_cmp(other.iter())
    }
}

impl<T: Ord, A: Allocator> Ord for BlockDeque<T, A> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.iter().cmp(other.iter())
    }
}

impl<T: Hash, A: Allocator> Hash for BlockDeque<T, A> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.len);
        for value in self.iter() {
            value.hash(state);
        }
    }
}

impl<T, A: Allocator> Extend<T> for BlockDeque<T, A> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        let (lower, _) = iter.size_hint();
        if let Err(err) = self.reserve_back(lower) {
            handle_error(err);
        }
        for value in iter {
            self.push_back(value);
        }
    }
}

impl<'a, T: Copy + 'a, A: Allocator> Extend<&'a T> for BlockDeque<T, A> {
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        self.extend(iter.into_iter().copied());
    }
}

impl<T> FromIterator<T> for BlockDeque<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut deque = Self::new();
        deque.extend(iter);
        deque
    }
}

impl<T: Clone> From<&[T]> for BlockDeque<T> {
    fn from(items: &[T]) -> Self {
        items.iter().cloned().collect()
    }
}

impl<T, const N: usize> From<[T; N]> for BlockDeque<T> {
    fn from(items: [T; N]) -> Self {
        items.into_iter().collect()
    }
}

impl<T, A: Allocator> IntoIterator for BlockDeque<T, A> {
    type Item = T;
    type IntoIter = IntoIter<T, A>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter::new(self)
    }
}

impl<'a, T, A: Allocator> IntoIterator for &'a BlockDeque<T, A> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T, A: Allocator> IntoIterator for &'a mut BlockDeque<T, A> {
    type Item = &'a mut T;
    type IntoIter = IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

// Safety: the deque uniquely owns its blocks and the elements in them.
unsafe impl<T: Send, A: Allocator + Send> Send for BlockDeque<T, A> {}
unsafe impl<T: Sync, A: Allocator + Sync> Sync for BlockDeque<T, A> {}
