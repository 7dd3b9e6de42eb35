//! Thread-local reuse pools for scratch buffers.
//!
//! Decoders borrow a `String` for accumulating string contents and writers
//! borrow a `Vec<u8>` for buffering output. Both are short-lived, so instead of
//! allocating them afresh for every document they are taken from a pool keyed
//! by buffer type and handed back, cleared, when their owner is dropped.
//!
//! Pools are per thread, so no locking is involved. A buffer that grew past
//! [`MAX_RETAINED_CAPACITY`] is released instead of pooled, and each pool keeps
//! at most [`MAX_POOLED`] buffers.

use core::{
    cell::RefCell,
    ops::{Deref, DerefMut},
};

pub(crate) const MAX_POOLED: usize = 16;
pub(crate) const MAX_RETAINED_CAPACITY: usize = 1 << 20;

thread_local! {
    static BYTES: RefCell<Vec<Vec<u8>>> = const { RefCell::new(Vec::new()) };
    static STRINGS: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

/// A buffer type with its own pool.
pub(crate) trait Recycle: Default + Sized {
    const NAME: &'static str;

    /// Clears contents, keeping the allocation.
    fn reset(&mut self);

    fn capacity(&self) -> usize;

    /// Runs `f` against this type's pool. Returns `None` once the thread's
    /// pool has been torn down.
    fn with_pool<T>(f: impl FnOnce(&mut Vec<Self>) -> T) -> Option<T>;
}

impl Recycle for Vec<u8> {
    const NAME: &'static str = "byte buffer";

    fn reset(&mut self) {
        self.clear();
    }

    fn capacity(&self) -> usize {
        Vec::capacity(self)
    }

    fn with_pool<T>(f: impl FnOnce(&mut Vec<Self>) -> T) -> Option<T> {
        BYTES.try_with(|pool| f(&mut pool.borrow_mut())).ok()
    }
}

impl Recycle for String {
    const NAME: &'static str = "string buffer";

    fn reset(&mut self) {
        self.clear();
    }

    fn capacity(&self) -> usize {
        String::capacity(self)
    }

    fn with_pool<T>(f: impl FnOnce(&mut Vec<Self>) -> T) -> Option<T> {
        STRINGS.try_with(|pool| f(&mut pool.borrow_mut())).ok()
    }
}

/// A buffer on loan from its pool; returned on drop.
#[derive(Debug)]
pub(crate) struct Pooled<T: Recycle> {
    item: T,
}

impl<T: Recycle> Pooled<T> {
    pub(crate) fn take() -> Self {
        let item = T::with_pool(Vec::pop).flatten();
        match item {
            Some(item) => {
                log::trace!("reusing pooled {} ({} bytes)", T::NAME, item.capacity());
                Self { item }
            }
            None => Self { item: T::default() },
        }
    }
}

impl<T: Recycle> Deref for Pooled<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.item
    }
}

impl<T: Recycle> DerefMut for Pooled<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.item
    }
}

impl<T: Recycle> Drop for Pooled<T> {
    fn drop(&mut self) {
        let mut item = core::mem::take(&mut self.item);
        if item.capacity() == 0 {
            return;
        }
        if item.capacity() > MAX_RETAINED_CAPACITY {
            log::trace!("discarding oversized {} ({} bytes)", T::NAME, item.capacity());
            return;
        }
        item.reset();
        T::with_pool(|pool| {
            if pool.len() < MAX_POOLED {
                pool.push(item);
            }
        });
    }
}
