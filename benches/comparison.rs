//! Benchmarks comparing the seqbuf containers with std::Vec and
//! std::collections::VecDeque using divan.
//!
//! Run with: `cargo bench`

use seqbuf::{BlockDeque, DynArray};
use std::collections::VecDeque;

fn main() {
    divan::main();
}

// Trait to abstract over Vec and DynArray for generic benchmarks
trait ArrayLike<T>: Default {
    fn with_capacity(cap: usize) -> Self;
    fn push(&mut self, val: T);
    fn pop(&mut self) -> Option<T>;
    fn get(&self, idx: usize) -> Option<&T>;
    fn len(&self) -> usize;
    fn iter<'a>(&'a self) -> impl Iterator<Item = &'a T>
    where
        T: 'a;
    fn insert(&mut self, idx: usize, val: T);
    fn remove(&mut self, idx: usize) -> T;
}

impl<T> ArrayLike<T> for Vec<T> {
    fn with_capacity(cap: usize) -> Self {
        Vec::with_capacity(cap)
    }
    fn push(&mut self, val: T) {
        self.push(val);
    }
    fn pop(&mut self) -> Option<T> {
        self.pop()
    }
    fn get(&self, idx: usize) -> Option<&T> {
        <[T]>::get(self, idx)
    }
    fn len(&self) -> usize {
        self.len()
    }
    fn iter<'a>(&'a self) -> impl Iterator<Item = &'a T>
    where
        T: 'a,
    {
        <[T]>::iter(self)
    }
    fn insert(&mut self, idx: usize, val: T) {
        self.insert(idx, val);
    }
    fn remove(&mut self, idx: usize) -> T {
        self.remove(idx)
    }
}

impl<T> ArrayLike<T> for DynArray<T> {
    fn with_capacity(cap: usize) -> Self {
        DynArray::with_capacity(cap)
    }
    fn push(&mut self, val: T) {
        self.push_back(val);
    }
    fn pop(&mut self) -> Option<T> {
        self.pop_back()
    }
    fn get(&self, idx: usize) -> Option<&T> {
        <[T]>::get(self, idx)
    }
    fn len(&self) -> usize {
        DynArray::len(self)
    }
    fn iter<'a>(&'a self) -> impl Iterator<Item = &'a T>
    where
        T: 'a,
    {
        <[T]>::iter(self)
    }
    fn insert(&mut self, idx: usize, val: T) {
        DynArray::insert(self, idx, val);
    }
    fn remove(&mut self, idx: usize) -> T {
        DynArray::remove(self, idx)
    }
}

// Trait to abstract over VecDeque and BlockDeque
trait DequeLike<T>: Default {
    fn push_front(&mut self, val: T);
    fn push_back(&mut self, val: T);
    fn pop_front(&mut self) -> Option<T>;
    fn pop_back(&mut self) -> Option<T>;
    fn get(&self, idx: usize) -> Option<&T>;
    fn insert(&mut self, idx: usize, val: T);
    fn iter<'a>(&'a self) -> impl Iterator<Item = &'a T>
    where
        T: 'a;
}

impl<T> DequeLike<T> for VecDeque<T> {
    fn push_front(&mut self, val: T) {
        self.push_front(val);
    }
    fn push_back(&mut self, val: T) {
        self.push_back(val);
    }
    fn pop_front(&mut self) -> Option<T> {
        self.pop_front()
    }
    fn pop_back(&mut self) -> Option<T> {
        self.pop_back()
    }
    fn get(&self, idx: usize) -> Option<&T> {
        self.get(idx)
    }
    fn insert(&mut self, idx: usize, val: T) {
        self.insert(idx, val);
    }
    fn iter<'a>(&'a self) -> impl Iterator<Item = &'a T>
    where
        T: 'a,
    {
        VecDeque::iter(self)
    }
}

impl<T> DequeLike<T> for BlockDeque<T> {
    fn push_front(&mut self, val: T) {
        self.push_front(val);
    }
    fn push_back(&mut self, val: T) {
        self.push_back(val);
    }
    fn pop_front(&mut self) -> Option<T> {
        self.pop_front()
    }
    fn pop_back(&mut self) -> Option<T> {
        self.pop_back()
    }
    fn get(&self, idx: usize) -> Option<&T> {
        self.get(idx)
    }
    fn insert(&mut self, idx: usize, val: T) {
        self.insert(idx, val);
    }
    fn iter<'a>(&'a self) -> impl Iterator<Item = &'a T>
    where
        T: 'a,
    {
        BlockDeque::iter(self)
    }
}

fn filled<V: ArrayLike<i32>>(n: usize) -> V {
    let mut v = V::default();
    for i in 0..n as i32 {
        v.push(i);
    }
    v
}

fn filled_deque<D: DequeLike<i32>>(n: usize) -> D {
    let mut d = D::default();
    for i in 0..n as i32 {
        d.push_back(i);
    }
    d
}

// ============================================================================
// Push Benchmarks
// ============================================================================

#[divan::bench(types = [Vec<i32>, DynArray<i32>], consts = [100, 1000, 10000])]
fn push<V: ArrayLike<i32>, const N: usize>() -> V {
    filled(N)
}

#[divan::bench(types = [Vec<i32>, DynArray<i32>], consts = [100, 1000, 10000])]
fn push_with_capacity<V: ArrayLike<i32>, const N: usize>() -> V {
    let mut v = V::with_capacity(N);
    for i in 0..N as i32 {
        v.push(i);
    }
    v
}

#[divan::bench(types = [VecDeque<i32>, BlockDeque<i32>], consts = [100, 1000, 10000])]
fn push_front<D: DequeLike<i32>, const N: usize>() -> D {
    let mut d = D::default();
    for i in 0..N as i32 {
        d.push_front(i);
    }
    d
}

#[divan::bench(types = [VecDeque<i32>, BlockDeque<i32>], consts = [100, 1000, 10000])]
fn push_both_ends<D: DequeLike<i32>, const N: usize>() -> D {
    let mut d = D::default();
    for i in 0..N as i32 {
        if i % 2 == 0 {
            d.push_front(i);
        } else {
            d.push_back(i);
        }
    }
    d
}

// ============================================================================
// Pop Benchmarks
// ============================================================================

#[divan::bench(types = [Vec<i32>, DynArray<i32>], consts = [100, 1000, 10000])]
fn pop<V: ArrayLike<i32>, const N: usize>(bencher: divan::Bencher) {
    bencher
        .with_inputs(|| filled::<V>(N))
        .bench_local_values(|mut v| {
            while v.pop().is_some() {}
            v
        });
}

#[divan::bench(types = [VecDeque<i32>, BlockDeque<i32>], consts = [100, 1000, 10000])]
fn pop_both_ends<D: DequeLike<i32>, const N: usize>(bencher: divan::Bencher) {
    bencher
        .with_inputs(|| filled_deque::<D>(N))
        .bench_local_values(|mut d| {
            while d.pop_front().is_some() && d.pop_back().is_some() {}
            d
        });
}

// ============================================================================
// Queue Benchmarks
// ============================================================================

#[divan::bench(types = [VecDeque<i32>, BlockDeque<i32>], consts = [100, 1000, 10000])]
fn queue_churn<D: DequeLike<i32>, const N: usize>(bencher: divan::Bencher) {
    bencher
        .with_inputs(|| filled_deque::<D>(64))
        .bench_local_values(|mut d| {
            for i in 0..N as i32 {
                d.push_back(i);
                d.pop_front();
            }
            d
        });
}

// ============================================================================
// Access Benchmarks
// ============================================================================

#[divan::bench(types = [Vec<i32>, DynArray<i32>], consts = [100, 1000, 10000])]
fn sequential_read<V: ArrayLike<i32>, const N: usize>(bencher: divan::Bencher) {
    bencher
        .with_inputs(|| filled::<V>(N))
        .bench_local_refs(|v| {
            let mut sum = 0i32;
            for i in 0..N {
                sum = sum.wrapping_add(*v.get(i).unwrap());
            }
            sum
        });
}

#[divan::bench(types = [VecDeque<i32>, BlockDeque<i32>], consts = [100, 1000, 10000])]
fn random_read<D: DequeLike<i32>, const N: usize>(bencher: divan::Bencher) {
    use rand::prelude::*;
    let mut rng = rand::rng();
    let indices: Vec<usize> = (0..N).map(|_| rng.random_range(0..N)).collect();

    bencher
        .with_inputs(|| filled_deque::<D>(N))
        .bench_local_refs(|d| {
            let mut sum = 0i32;
            for &i in &indices {
                sum = sum.wrapping_add(*d.get(i).unwrap());
            }
            sum
        });
}

// ============================================================================
// Iteration Benchmarks
// ============================================================================

#[divan::bench(types = [Vec<i32>, DynArray<i32>], consts = [100, 1000, 10000])]
fn iterate<V: ArrayLike<i32>, const N: usize>(bencher: divan::Bencher) {
    bencher
        .with_inputs(|| filled::<V>(N))
        .bench_local_refs(|v| v.iter().fold(0i32, |acc, &x| acc.wrapping_add(x)));
}

#[divan::bench(types = [VecDeque<i32>, BlockDeque<i32>], consts = [100, 1000, 10000])]
fn iterate_deque<D: DequeLike<i32>, const N: usize>(bencher: divan::Bencher) {
    bencher
        .with_inputs(|| filled_deque::<D>(N))
        .bench_local_refs(|d| d.iter().fold(0i32, |acc, &x| acc.wrapping_add(x)));
}

// ============================================================================
// Insert/Remove Benchmarks
// ============================================================================

#[divan::bench(types = [Vec<i32>, DynArray<i32>], consts = [100, 1000])]
fn insert_middle<V: ArrayLike<i32>, const N: usize>(bencher: divan::Bencher) {
    bencher.bench_local(|| {
        let mut v = V::default();
        for i in 0..N as i32 {
            v.insert(v.len() / 2, i);
        }
        v
    });
}

#[divan::bench(types = [VecDeque<i32>, BlockDeque<i32>], consts = [100, 1000])]
fn insert_near_front<D: DequeLike<i32>, const N: usize>(bencher: divan::Bencher) {
    bencher.bench_local(|| {
        let mut d = D::default();
        for i in 0..N as i32 {
            d.push_back(i);
            d.insert(i as usize / 4, i);
        }
        d
    });
}

#[divan::bench(types = [Vec<i32>, DynArray<i32>], consts = [100, 1000])]
fn remove_front<V: ArrayLike<i32>, const N: usize>(bencher: divan::Bencher) {
    bencher
        .with_inputs(|| filled::<V>(N))
        .bench_local_values(|mut v| {
            while v.len() > 0 {
                v.remove(0);
            }
            v
        });
}

// ============================================================================
// Clone Benchmarks
// ============================================================================

#[divan::bench(types = [Vec<i32>, DynArray<i32>], consts = [100, 1000, 10000])]
fn clone<V: ArrayLike<i32> + Clone, const N: usize>(bencher: divan::Bencher) {
    bencher
        .with_inputs(|| filled::<V>(N))
        .bench_local_refs(|v| v.clone());
}
