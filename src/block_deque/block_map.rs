//! Block engine behind [`BlockDeque`](super::BlockDeque).
//!
//! The deque's elements live in fixed-size blocks. The block index is a
//! [`ScratchBuffer`] of block pointers, so it has spare room on both ends and
//! grows with the same relocate-and-swap protocol as every other container in
//! the crate.
//!
//! Positions are absolute slot numbers across the concatenated blocks. With
//! `m` blocks of `B` slots the usable capacity is `m * B - 1`: the last slot
//! is never occupied, so the one-past-the-end position always falls inside an
//! existing block.

use std::cmp;
use std::mem;
use std::ptr::NonNull;

use allocator_api2::alloc::Allocator;

use crate::error::Result;
use crate::raw::{self, RawParts};
use crate::scratch::ScratchBuffer;

/// A slot address as (block number, offset inside the block).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct BlockPos {
    pub(crate) block: usize,
    pub(crate) offset: usize,
}

impl BlockPos {
    /// Position of absolute slot `pos`.
    #[inline]
    pub(crate) const fn at(pos: usize, block_size: usize) -> Self {
        Self {
            block: pos / block_size,
            offset: pos % block_size,
        }
    }

    #[inline]
    pub(crate) fn step_forward(&mut self, block_size: usize) {
        self.offset += 1;
        if self.offset == block_size {
            self.block += 1;
            self.offset = 0;
        }
    }

    #[inline]
    pub(crate) fn step_back(&mut self, block_size: usize) {
        if self.offset == 0 {
            self.block -= 1;
            self.offset = block_size - 1;
        } else {
            self.offset -= 1;
        }
    }

    /// Moves by `delta` slots in either direction.
    ///
    /// Backward moves are measured from the last slot of the current block,
    /// so both division and remainder only ever see non-negative values.
    pub(crate) fn offset_by(self, delta: isize, block_size: usize) -> Self {
        let magnitude = delta.unsigned_abs();
        if delta >= 0 {
            let total = self.offset + magnitude;
            Self {
                block: self.block + total / block_size,
                offset: total % block_size,
            }
        } else {
            let back = block_size - 1 - self.offset + magnitude;
            Self {
                block: self.block - back / block_size,
                offset: block_size - 1 - back % block_size,
            }
        }
    }

    /// Number of slots from `earlier` to `self`.
    #[inline]
    pub(crate) fn distance(self, earlier: Self, block_size: usize) -> usize {
        (self.block - earlier.block) * block_size + self.offset - earlier.offset
    }
}

/// The block index plus the block size.
pub(crate) struct BlockMap<T, A: Allocator> {
    pub(crate) index: ScratchBuffer<NonNull<T>, A>,
    block_size: usize,
}

impl<T, A: Allocator> BlockMap<T, A> {
    pub(crate) const fn new_in(block_size: usize, alloc: A) -> Self {
        Self {
            index: ScratchBuffer::new_in(alloc),
            block_size,
        }
    }

    #[inline]
    pub(crate) const fn block_size(&self) -> usize {
        self.block_size
    }

    /// Number of allocated blocks.
    #[inline]
    pub(crate) const fn count(&self) -> usize {
        self.index.len()
    }

    /// Usable slots across all blocks.
    #[inline]
    pub(crate) const fn capacity(&self) -> usize {
        match self.count() {
            0 => 0,
            n => n * self.block_size - 1,
        }
    }

    #[inline]
    pub(crate) fn blocks(&self) -> &[NonNull<T>] {
        self.index.as_slice()
    }

    #[inline]
    pub(crate) fn allocator(&self) -> &A {
        self.index.allocator()
    }

    /// Pointer to absolute slot `pos`, which must lie inside an allocated block.
    #[inline]
    pub(crate) fn slot(&self, pos: usize) -> *mut T {
        let at = BlockPos::at(pos, self.block_size);
        unsafe { self.blocks()[at.block].as_ptr().add(at.offset) }
    }

    /// Makes at least `n` more slots available after `start + len` and
    /// returns the adjusted `start`.
    ///
    /// Empty whole blocks in front of `start` are moved to the back first;
    /// only the remainder is freshly allocated. On error nothing observable
    /// changes and no fresh block is kept.
    pub(crate) fn alloc_back(&mut self, n: usize, start: usize) -> Result<usize> {
        let b = self.block_size;
        let m = self.count();
        let wanted = (n + usize::from(m == 0)).div_ceil(b);
        let recycled = cmp::min(start / b, wanted);
        let fresh = wanted - recycled;

        if fresh > self.index.front_spare() + self.index.back_spare() {
            return self.grow_back(fresh, recycled, start);
        }
        if fresh > 0 {
            let mut batch = BlockBatch::new(&mut self.index.raw, &self.index.alloc, b);
            batch.allocate(fresh)?;
            batch.commit();
        }
        for _ in 0..recycled {
            if let Some(block) = self.index.raw.take_front() {
                unsafe { self.index.raw.push_back_in_spare(block) };
            }
        }
        tracing::trace!(fresh, recycled, blocks = self.count(), "blocks added at back");
        Ok(start - recycled * b)
    }

    /// Makes at least `n` more slots available before `start` and returns the
    /// adjusted `start`. The mirror image of [`BlockMap::alloc_back`].
    pub(crate) fn alloc_front(&mut self, n: usize, start: usize, len: usize) -> Result<usize> {
        let b = self.block_size;
        let m = self.count();
        let was_empty = usize::from(m == 0);
        let wanted = (n + was_empty).div_ceil(b);
        let back_slack = self.capacity() - start - len;
        let recycled = cmp::min(back_slack / b, wanted);
        let fresh = wanted - recycled;

        if fresh > self.index.front_spare() + self.index.back_spare() {
            return self.grow_front(fresh, recycled, start, was_empty);
        }
        if fresh > 0 {
            // Appended blocks sit behind everything until rotated, so a failed
            // batch never shifts the live range.
            let mut batch = BlockBatch::new(&mut self.index.raw, &self.index.alloc, b);
            batch.allocate(fresh)?;
            batch.commit();
        }
        for _ in 0..fresh + recycled {
            if let Some(block) = self.index.raw.take_back() {
                unsafe { self.index.raw.push_front_in_spare(block) };
            }
        }
        tracing::trace!(fresh, recycled, blocks = self.count(), "blocks added at front");
        Ok(start + (fresh + recycled) * b - was_empty)
    }

    /// Rebuilds the index as `[kept blocks][fresh][recycled]`.
    #[cold]
    #[inline(never)]
    fn grow_back(&mut self, fresh: usize, recycled: usize, start: usize) -> Result<usize> {
        let b = self.block_size;
        let m = self.count();
        let capacity = cmp::max(self.index.capacity().saturating_mul(2), fresh + m);
        let alloc = &self.index.alloc;
        let mut buf = ScratchBuffer::try_with_capacity_in(capacity, m - recycled, alloc)?;
        let mut batch = BlockBatch::new(&mut buf.raw, alloc, b);
        batch.allocate(fresh)?;
        batch.commit();

        let index = &mut self.index.raw;
        unsafe {
            buf.relocate_to_front(index.slot(index.head + recycled), m - recycled);
            buf.relocate_to_end(index.slot(index.head), recycled);
        }
        index.tail = index.head;
        mem::swap(&mut buf.raw, index);
        tracing::trace!(
            old_capacity = buf.capacity(),
            new_capacity = capacity,
            fresh,
            recycled,
            "block index grown at back"
        );
        Ok(start - recycled * b)
    }

    /// Rebuilds the index as `[fresh][recycled][kept blocks]`.
    #[cold]
    #[inline(never)]
    fn grow_front(
        &mut self,
        fresh: usize,
        recycled: usize,
        start: usize,
        was_empty: usize,
    ) -> Result<usize> {
        let b = self.block_size;
        let m = self.count();
        let capacity = cmp::max(self.index.capacity().saturating_mul(2), fresh + m);
        let alloc = &self.index.alloc;
        let mut buf = ScratchBuffer::try_with_capacity_in(capacity, 0, alloc)?;
        let mut batch = BlockBatch::new(&mut buf.raw, alloc, b);
        batch.allocate(fresh)?;
        batch.commit();

        let index = &mut self.index.raw;
        unsafe {
            buf.relocate_to_end(index.slot(index.tail - recycled), recycled);
            buf.relocate_to_end(index.slot(index.head), m - recycled);
        }
        index.tail = index.head;
        mem::swap(&mut buf.raw, index);
        tracing::trace!(
            old_capacity = buf.capacity(),
            new_capacity = capacity,
            fresh,
            recycled,
            "block index grown at front"
        );
        Ok(start + (fresh + recycled) * b - was_empty)
    }

    /// Frees the first block. It must hold no live element.
    pub(crate) fn release_front(&mut self) {
        if let Some(block) = self.index.raw.take_front() {
            unsafe { raw::deallocate(&self.index.alloc, block, self.block_size) };
            tracing::trace!(blocks = self.count(), "front block released");
        }
    }

    /// Frees the last block. It must hold no live element.
    pub(crate) fn release_back(&mut self) {
        if let Some(block) = self.index.raw.take_back() {
            unsafe { raw::deallocate(&self.index.alloc, block, self.block_size) };
            tracing::trace!(blocks = self.count(), "back block released");
        }
    }

    /// Frees blocks from the back until at most `keep` remain. They must be empty.
    pub(crate) fn release_down_to(&mut self, keep: usize) {
        while self.count() > keep {
            self.release_back();
        }
    }

    /// Shrinks the index allocation to the number of blocks.
    pub(crate) fn shrink_index(&mut self) {
        self.index.shrink_to_fit();
    }
}

impl<T, A: Allocator> Drop for BlockMap<T, A> {
    fn drop(&mut self) {
        self.release_down_to(0);
    }
}

/// Fresh blocks pushed onto the back of an index, freed again unless committed.
struct BlockBatch<'a, T, A: Allocator> {
    target: &'a mut RawParts<NonNull<T>>,
    alloc: &'a A,
    block_size: usize,
    pending: usize,
}

impl<'a, T, A: Allocator> BlockBatch<'a, T, A> {
    fn new(target: &'a mut RawParts<NonNull<T>>, alloc: &'a A, block_size: usize) -> Self {
        Self {
            target,
            alloc,
            block_size,
            pending: 0,
        }
    }

    /// Allocates `count` blocks. The target must have that much spare room.
    fn allocate(&mut self, count: usize) -> Result<()> {
        debug_assert!(count <= self.target.front_spare() + self.target.back_spare());
        for _ in 0..count {
            let block = raw::allocate::<T, A>(self.alloc, self.block_size)?;
            unsafe { self.target.push_back_in_spare(block) };
            self.pending += 1;
        }
        Ok(())
    }

    fn commit(mut self) {
        self.pending = 0;
    }
}

impl<T, A: Allocator> Drop for BlockBatch<'_, T, A> {
    fn drop(&mut self) {
        if self.pending > 0 {
            tracing::debug!(blocks = self.pending, "rolling back partial block batch");
        }
        while self.pending > 0 {
            if let Some(block) = self.target.take_back() {
                unsafe { raw::deallocate(self.alloc, block, self.block_size) };
            }
            self.pending -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Budget;
    use allocator_api2::alloc::Global;

    #[test]
    fn test_block_pos_steps() {
        let mut pos = BlockPos::at(7, 4);
        assert_eq!(pos, BlockPos { block: 1, offset: 3 });
        pos.step_forward(4);
        assert_eq!(pos, BlockPos { block: 2, offset: 0 });
        pos.step_back(4);
        pos.step_back(4);
        assert_eq!(pos, BlockPos { block: 1, offset: 2 });
    }

    #[test]
    fn test_block_pos_offset_by() {
        for start in 0..40usize {
            for delta in -(start as isize)..40 {
                let pos = BlockPos::at(start, 4).offset_by(delta, 4);
                let expected = (start as isize + delta) as usize;
                assert_eq!(pos, BlockPos::at(expected, 4), "{start} + {delta}");
            }
        }
    }

    #[test]
    fn test_block_pos_distance() {
        let a = BlockPos::at(3, 5);
        let b = BlockPos::at(17, 5);
        assert_eq!(b.distance(a, 5), 14);
        assert_eq!(a.distance(a, 5), 0);
    }

    #[test]
    fn test_alloc_back_from_empty() {
        let mut map = BlockMap::<u32, _>::new_in(4, Global);
        assert_eq!(map.capacity(), 0);
        let start = map.alloc_back(1, 0).unwrap();
        assert_eq!(start, 0);
        assert_eq!(map.count(), 1);
        assert_eq!(map.capacity(), 3);

        // Three usable slots exist; four more take one extra block.
        let start = map.alloc_back(4, start).unwrap();
        assert_eq!(start, 0);
        assert_eq!(map.count(), 2);
    }

    #[test]
    fn test_alloc_front_from_empty() {
        let mut map = BlockMap::<u32, _>::new_in(4, Global);
        let start = map.alloc_front(1, 0, 0).unwrap();
        assert_eq!(map.count(), 1);
        assert_eq!(start, 3);
        assert!(start <= map.capacity());
    }

    #[test]
    fn test_alloc_back_recycles_front_blocks() {
        let mut map = BlockMap::<u32, _>::new_in(4, Global);
        map.alloc_back(11, 0).unwrap();
        assert_eq!(map.count(), 3);
        let before: Vec<_> = map.blocks().to_vec();

        // Pretend the first two blocks drained: start = 9, one live element.
        let start = map.alloc_back(4, 9).unwrap();
        assert_eq!(map.count(), 3, "no fresh block needed");
        assert_eq!(start, 5);
        assert_eq!(map.blocks()[0], before[1]);
        assert_eq!(map.blocks()[1], before[2]);
        assert_eq!(map.blocks()[2], before[0]);
    }

    #[test]
    fn test_alloc_front_recycles_back_blocks() {
        let mut map = BlockMap::<u32, _>::new_in(4, Global);
        map.alloc_back(11, 0).unwrap();
        let last = map.blocks()[2];
        // One live element at slot 0: back slack is 10, two whole blocks.
        let start = map.alloc_front(1, 0, 1).unwrap();
        assert_eq!(map.count(), 3);
        assert_eq!(start, 4);
        assert_eq!(map.blocks()[0], last);
    }

    #[test]
    fn test_grow_keeps_block_order() {
        let mut map = BlockMap::<u64, _>::new_in(2, Global);
        let mut start = 0;
        for _ in 0..10 {
            start = map.alloc_front(2, start, 0).unwrap();
        }
        let before: Vec<_> = map.blocks().to_vec();
        let start_before = start;
        start = map.alloc_back(50, start).unwrap();
        assert!(map.capacity() >= start + 50);
        assert!(start <= start_before);
        // Every pre-existing block is still indexed exactly once.
        for block in before {
            assert_eq!(map.blocks().iter().filter(|b| **b == block).count(), 1);
        }
    }

    #[test]
    fn test_failed_batch_rolls_back() {
        let budget = Budget::new(2);
        let mut map = BlockMap::<u32, _>::new_in(4, budget.clone());
        let start = map.alloc_back(1, 0).unwrap();
        assert_eq!(budget.live(), 2);
        let before: Vec<_> = map.blocks().to_vec();

        // Growing the index succeeds but the third fresh block is refused.
        budget.set_remaining(3);
        assert!(map.alloc_back(16, start).is_err());
        assert_eq!(map.blocks(), before.as_slice());
        assert_eq!(budget.live(), 2);

        budget.set_remaining(10);
        map.alloc_back(16, start).unwrap();
        assert_eq!(map.count(), 5);
        map.release_back();
        map.release_back();
        let live = budget.live();

        // Room in the index: the batch is appended in place and rolled back.
        budget.set_remaining(1);
        assert!(map.alloc_back(8, 0).is_err());
        assert_eq!(map.count(), 3);
        assert_eq!(budget.live(), live);
    }

    #[test]
    fn test_release() {
        let mut map = BlockMap::<u8, _>::new_in(8, Global);
        map.alloc_back(40, 0).unwrap();
        let count = map.count();
        map.release_front();
        map.release_back();
        assert_eq!(map.count(), count - 2);
        map.release_down_to(1);
        assert_eq!(map.count(), 1);
        map.shrink_index();
        assert_eq!(map.index.capacity(), 1);
    }
}
