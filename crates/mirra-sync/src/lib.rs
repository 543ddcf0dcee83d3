//! Mirra synchronization primitives
//!
//! This crate provides the shared spinlock that guards the type database and
//! every descriptor's tables:
//! - Readers enter whenever no writer holds the lock, even past a waiting writer
//! - The writer may re-acquire its own lock (recursive) and read under it
//! - Waiters spin a bounded number of rounds, then park until release

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod locked;
mod spinlock;

pub use locked::{Locked, ReadGuard, WriteGuard};
pub use spinlock::{
    current_thread_token, ExclusiveGuard, SharedGuard, SharedSpinlock, DEFAULT_SPIN_LIMIT,
};
