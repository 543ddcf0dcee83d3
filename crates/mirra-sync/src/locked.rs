//! Data guarded by a [`SharedSpinlock`]

use crate::spinlock::SharedSpinlock;
use std::cell::UnsafeCell;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// A value guarded by a [`SharedSpinlock`]
///
/// The raw lock is exposed through [`Locked::lock`] so a thread can hold it
/// exclusively across re-entrant work (for example user initialisers) while
/// taking short data borrows inside. Because the writer may re-enter, the data
/// borrows themselves are tracked like a `RefCell` for the owning thread:
/// overlapping a [`WriteGuard`] with any other guard on the same thread panics
/// instead of aliasing.
///
/// A thread holding a shared guard must not request a write guard on the same
/// cell; the lock has no upgrade path.
pub struct Locked<T> {
    lock: SharedSpinlock,

    /// A `WriteGuard` is alive (only touched by the exclusive owner)
    writing: AtomicBool,

    /// Read guards taken by the exclusive owner without a reader slot
    owner_reads: AtomicUsize,

    data: UnsafeCell<T>,
}

unsafe impl<T: Send> Send for Locked<T> {}
unsafe impl<T: Send + Sync> Sync for Locked<T> {}

impl<T> Locked<T> {
    /// Wrap a value with the default spin limit
    pub fn new(value: T) -> Self {
        Self::with_lock(value, SharedSpinlock::new())
    }

    /// Wrap a value with a lock that spins `spin_limit` rounds before parking
    pub fn with_spin_limit(value: T, spin_limit: u32) -> Self {
        Self::with_lock(value, SharedSpinlock::with_spin_limit(spin_limit))
    }

    fn with_lock(value: T, lock: SharedSpinlock) -> Self {
        Self {
            lock,
            writing: AtomicBool::new(false),
            owner_reads: AtomicUsize::new(0),
            data: UnsafeCell::new(value),
        }
    }

    /// The underlying lock
    pub fn lock(&self) -> &SharedSpinlock {
        &self.lock
    }

    /// Borrow the value for reading
    ///
    /// # Panics
    ///
    /// Panics if the calling thread holds a [`WriteGuard`] on this cell.
    pub fn read(&self) -> ReadGuard<'_, T> {
        let counted = self.lock.lock_shared();
        if !counted {
            if self.writing.load(Ordering::Relaxed) {
                panic!("Locked value already mutably borrowed by this thread");
            }
            self.owner_reads.fetch_add(1, Ordering::Relaxed);
        }
        ReadGuard {
            cell: self,
            counted,
        }
    }

    /// Borrow the value for writing
    ///
    /// # Panics
    ///
    /// Panics if the calling thread already holds a guard on this cell.
    pub fn write(&self) -> WriteGuard<'_, T> {
        self.lock.lock_exclusive();
        if self.writing.load(Ordering::Relaxed) || self.owner_reads.load(Ordering::Relaxed) > 0 {
            self.lock.unlock_exclusive();
            panic!("Locked value already borrowed by this thread");
        }
        self.writing.store(true, Ordering::Relaxed);
        WriteGuard { cell: self }
    }

    /// Mutable access without locking (statically exclusive)
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    /// Consume the cell, returning the value
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T: Default> Default for Locked<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Locked<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Locked")
            .field("lock", &self.lock)
            .field("data", &&*self.read())
            .finish()
    }
}

/// Shared borrow of a [`Locked`] value
pub struct ReadGuard<'a, T> {
    cell: &'a Locked<T>,
    counted: bool,
}

impl<T> Deref for ReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        unsafe { &*self.cell.data.get() }
    }
}

impl<T> Drop for ReadGuard<'_, T> {
    fn drop(&mut self) {
        if !self.counted {
            self.cell.owner_reads.fetch_sub(1, Ordering::Relaxed);
        }
        self.cell.lock.unlock_shared(self.counted);
    }
}

/// Exclusive borrow of a [`Locked`] value
pub struct WriteGuard<'a, T> {
    cell: &'a Locked<T>,
}

impl<T> Deref for WriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        unsafe { &*self.cell.data.get() }
    }
}

impl<T> DerefMut for WriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.cell.data.get() }
    }
}

impl<T> Drop for WriteGuard<'_, T> {
    fn drop(&mut self) {
        self.cell.writing.store(false, Ordering::Relaxed);
        self.cell.lock.unlock_exclusive();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_write_roundtrip() {
        let cell = Locked::new(vec![1, 2]);
        cell.write().push(3);
        assert_eq!(*cell.read(), vec![1, 2, 3]);
        assert!(!cell.lock().is_locked());
    }

    #[test]
    fn test_reentrant_short_borrows() {
        let cell = Locked::new(0u32);
        let _outer = cell.lock().write();

        *cell.write() += 1;
        assert_eq!(*cell.read(), 1);
        *cell.write() += 1;
        assert_eq!(*cell.read(), 2);
        assert_eq!(cell.lock().exclusive_depth(), 1);
    }

    #[test]
    #[should_panic(expected = "already borrowed")]
    fn test_overlapping_write_panics() {
        let cell = Locked::new(0u32);
        let _first = cell.write();
        let _second = cell.write();
    }

    #[test]
    #[should_panic(expected = "already mutably borrowed")]
    fn test_read_during_write_panics() {
        let cell = Locked::new(0u32);
        let _write = cell.write();
        let _read = cell.read();
    }

    #[test]
    fn test_lock_released_after_panic_check() {
        let cell = Locked::new(0u32);
        let _outer = cell.lock().write();
        {
            let _read = cell.read();
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                let _write = cell.write();
            }));
            assert!(result.is_err());
        }
        assert_eq!(cell.lock().exclusive_depth(), 1);
    }

    #[test]
    fn test_into_inner() {
        let mut cell = Locked::new(String::from("a"));
        cell.get_mut().push('b');
        assert_eq!(cell.into_inner(), "ab");
    }
}
