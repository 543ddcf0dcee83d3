//! Shared spinlock with a recursive writer
//!
//! Readers and writers spin for a bounded number of rounds before parking on
//! a condition variable. The thread holding the exclusive lock may lock it
//! again (exclusively or shared) without deadlocking itself.

use crossbeam::utils::Backoff;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Number of cooperative spin rounds before a waiter parks
pub const DEFAULT_SPIN_LIMIT: u32 = 12;

/// State bit set while a writer holds the lock
const EXCLUSIVE: usize = 1;

/// Increment applied to the state for every shared holder
const READER: usize = 2;

/// Token identifying the calling thread, never zero.
///
/// The address of a thread-local is unique among live threads, which is all
/// the owner check needs.
pub fn current_thread_token() -> usize {
    thread_local! {
        static TOKEN: u8 = const { 0 };
    }
    TOKEN.with(|token| token as *const u8 as usize)
}

/// Reader/writer spinlock with recursive exclusive ownership
///
/// - The exclusive owner may re-acquire the lock exclusively; each acquisition
///   must be matched by a release.
/// - The exclusive owner may take a shared lock, which is a no-op.
/// - Readers coalesce: while any reader holds the lock, further readers enter
///   without waiting.
pub struct SharedSpinlock {
    /// `EXCLUSIVE` bit plus `READER` times the number of shared holders
    state: AtomicUsize,

    /// Thread token of the exclusive owner (0 if none)
    owner: AtomicUsize,

    /// Recursion depth of the exclusive owner
    depth: AtomicUsize,

    /// Threads currently parked on `wakeup`
    sleepers: AtomicUsize,

    parking: Mutex<()>,
    wakeup: Condvar,

    spin_limit: u32,
}

impl SharedSpinlock {
    /// Create an unlocked spinlock with the default spin limit
    pub const fn new() -> Self {
        Self::with_spin_limit(DEFAULT_SPIN_LIMIT)
    }

    /// Create an unlocked spinlock that spins `spin_limit` rounds before parking
    pub const fn with_spin_limit(spin_limit: u32) -> Self {
        Self {
            state: AtomicUsize::new(0),
            owner: AtomicUsize::new(0),
            depth: AtomicUsize::new(0),
            sleepers: AtomicUsize::new(0),
            parking: Mutex::new(()),
            wakeup: Condvar::new(),
            spin_limit,
        }
    }

    /// Spin rounds before parking
    pub fn spin_limit(&self) -> u32 {
        self.spin_limit
    }

    // ========================================================================
    // Exclusive locking
    // ========================================================================

    /// Acquire the lock exclusively, blocking until available
    pub fn lock_exclusive(&self) {
        let me = current_thread_token();
        if self.owner.load(Ordering::Relaxed) == me {
            self.depth.fetch_add(1, Ordering::Relaxed);
            return;
        }

        let backoff = Backoff::new();
        let mut spins = 0;
        loop {
            if self
                .state
                .compare_exchange_weak(0, EXCLUSIVE, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                self.owner.store(me, Ordering::Relaxed);
                self.depth.store(1, Ordering::Relaxed);
                return;
            }

            if spins < self.spin_limit {
                spins += 1;
                backoff.snooze();
            } else {
                self.park(|state| state != 0);
                spins = 0;
                backoff.reset();
            }
        }
    }

    /// Try to acquire the lock exclusively without waiting
    pub fn try_lock_exclusive(&self) -> bool {
        let me = current_thread_token();
        if self.owner.load(Ordering::Relaxed) == me {
            self.depth.fetch_add(1, Ordering::Relaxed);
            return true;
        }
        if self
            .state
            .compare_exchange(0, EXCLUSIVE, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            self.owner.store(me, Ordering::Relaxed);
            self.depth.store(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Release one level of exclusive ownership
    ///
    /// # Panics
    ///
    /// Panics if the calling thread does not own the lock.
    pub fn unlock_exclusive(&self) {
        assert!(
            self.is_owned_by_current_thread(),
            "unlock_exclusive called by a thread that does not own the lock"
        );

        if self.depth.fetch_sub(1, Ordering::Relaxed) > 1 {
            return;
        }

        self.owner.store(0, Ordering::Relaxed);
        self.state.store(0, Ordering::SeqCst);
        self.wake_sleepers();
    }

    /// Acquire the lock exclusively, returning a guard that releases it
    pub fn write(&self) -> ExclusiveGuard<'_> {
        self.lock_exclusive();
        ExclusiveGuard { lock: self }
    }

    // ========================================================================
    // Shared locking
    // ========================================================================

    /// Acquire the lock for reading, blocking while a writer holds it
    ///
    /// Returns `true` if a reader slot was taken. The exclusive owner reading
    /// its own data takes no slot and gets `false`; pass the returned value to
    /// [`unlock_shared`](Self::unlock_shared).
    pub fn lock_shared(&self) -> bool {
        if self.is_owned_by_current_thread() {
            return false;
        }

        let backoff = Backoff::new();
        let mut spins = 0;
        loop {
            let state = self.state.load(Ordering::Relaxed);
            if state & EXCLUSIVE == 0 {
                if self
                    .state
                    .compare_exchange_weak(
                        state,
                        state + READER,
                        Ordering::Acquire,
                        Ordering::Relaxed,
                    )
                    .is_ok()
                {
                    return true;
                }
                continue;
            }

            if spins < self.spin_limit {
                spins += 1;
                backoff.snooze();
            } else {
                self.park(|state| state & EXCLUSIVE != 0);
                spins = 0;
                backoff.reset();
            }
        }
    }

    /// Try to acquire the lock for reading without waiting
    ///
    /// Returns `None` if a writer holds the lock, otherwise the value to pass to
    /// [`unlock_shared`](Self::unlock_shared).
    pub fn try_lock_shared(&self) -> Option<bool> {
        if self.is_owned_by_current_thread() {
            return Some(false);
        }
        let mut state = self.state.load(Ordering::Relaxed);
        while state & EXCLUSIVE == 0 {
            match self.state.compare_exchange_weak(
                state,
                state + READER,
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Some(true),
                Err(actual) => state = actual,
            }
        }
        None
    }

    /// Release a shared lock taken by [`lock_shared`](Self::lock_shared)
    pub fn unlock_shared(&self, counted: bool) {
        if !counted {
            return;
        }
        let previous = self.state.fetch_sub(READER, Ordering::SeqCst);
        debug_assert!(previous >= READER, "unlock_shared without a reader");
        if previous == READER {
            self.wake_sleepers();
        }
    }

    /// Acquire the lock for reading, returning a guard that releases it
    pub fn read(&self) -> SharedGuard<'_> {
        let counted = self.lock_shared();
        SharedGuard {
            lock: self,
            counted,
        }
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Check if any thread holds the lock
    pub fn is_locked(&self) -> bool {
        self.state.load(Ordering::Relaxed) != 0
    }

    /// Check if a writer holds the lock
    pub fn is_locked_exclusive(&self) -> bool {
        self.state.load(Ordering::Relaxed) & EXCLUSIVE != 0
    }

    /// Number of threads holding a shared lock
    pub fn reader_count(&self) -> usize {
        self.state.load(Ordering::Relaxed) / READER
    }

    /// Check if the calling thread holds the lock exclusively
    pub fn is_owned_by_current_thread(&self) -> bool {
        self.owner.load(Ordering::Relaxed) == current_thread_token()
    }

    /// Recursion depth of the exclusive owner (0 when not exclusively held)
    pub fn exclusive_depth(&self) -> usize {
        if self.is_locked_exclusive() {
            self.depth.load(Ordering::Relaxed)
        } else {
            0
        }
    }

    // ========================================================================
    // Parking
    // ========================================================================

    fn park(&self, blocked: impl Fn(usize) -> bool) {
        let mut guard = self.parking.lock();
        self.sleepers.fetch_add(1, Ordering::SeqCst);
        tracing::trace!(sleepers = self.sleepers.load(Ordering::Relaxed), "spinlock parking");
        while blocked(self.state.load(Ordering::SeqCst)) {
            self.wakeup.wait(&mut guard);
        }
        self.sleepers.fetch_sub(1, Ordering::SeqCst);
    }

    fn wake_sleepers(&self) {
        if self.sleepers.load(Ordering::SeqCst) > 0 {
            let _guard = self.parking.lock();
            self.wakeup.notify_all();
        }
    }
}

impl Default for SharedSpinlock {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SharedSpinlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedSpinlock")
            .field("exclusive", &self.is_locked_exclusive())
            .field("depth", &self.exclusive_depth())
            .field("readers", &self.reader_count())
            .finish()
    }
}

/// RAII guard for one level of exclusive ownership
#[must_use = "the lock is released when the guard is dropped"]
pub struct ExclusiveGuard<'a> {
    lock: &'a SharedSpinlock,
}

impl Drop for ExclusiveGuard<'_> {
    fn drop(&mut self) {
        self.lock.unlock_exclusive();
    }
}

/// RAII guard for a shared lock
#[must_use = "the lock is released when the guard is dropped"]
pub struct SharedGuard<'a> {
    lock: &'a SharedSpinlock,
    counted: bool,
}

impl Drop for SharedGuard<'_> {
    fn drop(&mut self) {
        self.lock.unlock_shared(self.counted);
    }
}
