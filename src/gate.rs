//! # Gate
//!
//! A minimal spin-based exclusive section.
//!
//! The gate guards no data of its own: holding a [`GateGuard`] only means no
//! other thread holds one for the same [`Gate`]. [`SerializedList`] uses it
//! to turn "one consumer at a time" from a caller contract into a property.
//!
//! Entry is test-and-test-and-set with an exponential [`BackOff`]. The gate
//! is neither fair nor reentrant. Under `--cfg loom` the gate is a loom
//! `Mutex`, so models check the callers' exclusion without exploring the
//! spin itself.
//!
//! [`SerializedList`]: crate::SerializedList
//! [`BackOff`]: crate::BackOff

use core::fmt;

#[cfg(not(loom))]
use crate::{
    loom::sync::atomic::{
        AtomicBool,
        Ordering::{Acquire, Relaxed, Release},
    },
    BackOff,
};

pub(crate) struct Gate {
    #[cfg(not(loom))]
    held: AtomicBool,
    #[cfg(loom)]
    held: crate::loom::sync::Mutex<()>,
}

/// Releases the [`Gate`] when dropped.
#[must_use = "the gate is released as soon as the guard is dropped"]
pub(crate) struct GateGuard<'a> {
    #[cfg(not(loom))]
    gate: &'a Gate,
    #[cfg(loom)]
    _held: crate::loom::sync::MutexGuard<'a, ()>,
}

impl Gate {
    #[cfg(not(loom))]
    pub(crate) const fn new() -> Self {
        Self {
            held: AtomicBool::new(false),
        }
    }

    #[cfg(loom)]
    pub(crate) fn new() -> Self {
        Self {
            held: crate::loom::sync::Mutex::new(()),
        }
    }

    /// Spins until the gate is free, then takes it.
    #[cfg(not(loom))]
    #[inline]
    pub(crate) fn enter(&self) -> GateGuard<'_> {
        let backoff = BackOff::new();
        loop {
            if !self.held.swap(true, Acquire) {
                return GateGuard { gate: self };
            }
            while self.held.load(Relaxed) {
                backoff.wait();
            }
        }
    }

    /// Blocks the model thread until the gate is free, then takes it.
    #[cfg(loom)]
    pub(crate) fn enter(&self) -> GateGuard<'_> {
        // The guarded data is `()`, so a poisoned lock is still usable.
        let held = self
            .held
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        GateGuard { _held: held }
    }

    #[cfg(not(loom))]
    #[inline]
    pub(crate) fn is_held(&self) -> bool {
        self.held.load(Relaxed)
    }

    #[cfg(loom)]
    pub(crate) fn is_held(&self) -> bool {
        self.held.try_lock().is_err()
    }
}

#[cfg(not(loom))]
impl Drop for GateGuard<'_> {
    #[inline]
    fn drop(&mut self) {
        self.gate.held.store(false, Release);
    }
}

impl fmt::Debug for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gate").field("held", &self.is_held()).finish()
    }
}
