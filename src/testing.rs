//! Allocators shared by the unit tests.

use std::alloc::Layout;
use std::cell::Cell;
use std::ptr::NonNull;
use std::rc::Rc;

use allocator_api2::alloc::{AllocError, Allocator, Global};

/// Delegates to `Global`. Two instances compare equal when their tags match.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Tagged(pub(crate) u8);

unsafe impl Allocator for Tagged {
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        Global.allocate(layout)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        unsafe { Global.deallocate(ptr, layout) }
    }
}

/// Grants a fixed number of allocations, then refuses. Clones share the budget.
#[derive(Clone, Debug, Default)]
pub(crate) struct Budget {
    remaining: Rc<Cell<usize>>,
    live: Rc<Cell<usize>>,
}

impl Budget {
    pub(crate) fn new(allocations: usize) -> Self {
        let budget = Self::default();
        budget.remaining.set(allocations);
        budget
    }

    /// Allocations handed out and not yet returned.
    pub(crate) fn live(&self) -> usize {
        self.live.get()
    }

    pub(crate) fn set_remaining(&self, allocations: usize) {
        self.remaining.set(allocations);
    }
}

unsafe impl Allocator for Budget {
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        match self.remaining.get() {
            0 => Err(AllocError),
            n => {
                self.remaining.set(n - 1);
                self.live.set(self.live.get() + 1);
                Global.allocate(layout)
            }
        }
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.live.set(self.live.get() - 1);
        unsafe { Global.deallocate(ptr, layout) }
    }
}
