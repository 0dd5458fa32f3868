//! Reusable object pool with guard-based release.
//!
//! The pooled transport keeps its request/response scratch objects here so a
//! hot path does not allocate fresh header maps and body buffers per call.
//! [`ObjectPool::acquire`] hands out an exclusive [`Pooled`] guard; dropping
//! the guard resets the object and returns it, whichever way the caller exits.

use parking_lot::Mutex;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Objects that can be cleared for reuse without giving up their allocations.
pub trait Reset {
    fn reset(&mut self);
}

/// Bounded pool of reusable objects.
///
/// At most `capacity` idle objects are retained; extra ones are dropped on
/// release. The pool is `Sync` so one transport can serve concurrent callers.
#[derive(Debug)]
pub struct ObjectPool<T> {
    idle: Mutex<Vec<T>>,
    capacity: usize,
    created: AtomicUsize,
}

impl<T: Reset + Default> ObjectPool<T> {
    /// Create an empty pool that retains up to `capacity` idle objects
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::with_capacity(capacity)),
            capacity,
            created: AtomicUsize::new(0),
        }
    }

    /// Check out an object, creating one when none is idle
    #[must_use]
    pub fn acquire(&self) -> Pooled<'_, T> {
        let reused = self.idle.lock().pop();
        let object = reused.unwrap_or_else(|| {
            let created = self.created.fetch_add(1, Ordering::Relaxed) + 1;
            tracing::debug!(created, "object pool miss, allocating");
            T::default()
        });
        Pooled { pool: self, object }
    }

    /// Number of objects currently waiting for reuse
    #[must_use]
    pub fn idle(&self) -> usize {
        self.idle.lock().len()
    }

    /// Number of objects allocated over the pool's lifetime
    #[must_use]
    pub fn created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }

    fn release(&self, mut object: T) {
        object.reset();
        let mut idle = self.idle.lock();
        if idle.len() < self.capacity {
            idle.push(object);
        }
    }
}

/// Exclusive checkout from an [`ObjectPool`]; returns the object on drop.
#[derive(Debug)]
pub struct Pooled<'a, T: Reset + Default> {
    pool: &'a ObjectPool<T>,
    object: T,
}

impl<T: Reset + Default> Deref for Pooled<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.object
    }
}

impl<T: Reset + Default> DerefMut for Pooled<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.object
    }
}

impl<T: Reset + Default> Drop for Pooled<'_, T> {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.object));
    }
}
