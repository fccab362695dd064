//! # BackOff
//!
//! Exponential backoff for compare-and-swap retry loops.
//!
//! Every list operation that can lose a race ([`push_one`], [`push_batch`],
//! [`pop_one`]) retries until its CAS succeeds. There is no retry cap: the
//! loops are lock-free, not wait-free. A [`BackOff`] only stretches the gap
//! between attempts so that contending cores stop hammering the same cache
//! line, it never gives up.
//!
//! ## Behavior
//! - Each call to [`BackOff::wait`] spins for the current count using
//!   [`core::hint::spin_loop`], then doubles the count up to [`MAX_SPIN`].
//! - With the `std` feature, once the count passes a yield threshold the
//!   thread also calls [`std::thread::yield_now`].
//! - Under `--cfg loom` a wait is a single model-checker yield point.
//!
//! ## Example
//! ```rust
//! use axiom_llist::BackOff;
//! use core::sync::atomic::{AtomicUsize, Ordering};
//!
//! let word = AtomicUsize::new(0);
//! let backoff = BackOff::new();
//! let mut seen = word.load(Ordering::Relaxed);
//! loop {
//!     match word.compare_exchange_weak(seen, seen + 1, Ordering::AcqRel, Ordering::Relaxed) {
//!         Ok(_) => break,
//!         Err(actual) => {
//!             seen = actual;
//!             backoff.wait();
//!         }
//!     }
//! }
//! assert_eq!(word.load(Ordering::Relaxed), 1);
//! ```
//!
//! [`push_one`]: crate::ListHead::push_one
//! [`push_batch`]: crate::ListHead::push_batch
//! [`pop_one`]: crate::ListHead::pop_one

use core::cell::Cell;

use crate::loom::hint::spin_loop;

/// Upper bound for a single wait, in spin iterations.
pub const MAX_SPIN: u32 = 1 << 10;

/// Default starting spin count.
const START_VALUE: u32 = 1;

/// Spin count past which `std` builds also yield the thread.
#[cfg(all(feature = "std", not(loom)))]
const YIELD_THRESHOLD: u32 = 1 << 6;

/// An exponential backoff counter.
///
/// Create one per retry loop. It is `!Sync` (interior `Cell`).
pub struct BackOff {
    spin: Cell<u32>,
}

impl BackOff {
    /// Creates a new [`BackOff`] with the default starting spin count.
    #[inline(always)]
    pub const fn new() -> Self {
        Self {
            spin: Cell::new(START_VALUE),
        }
    }

    /// Creates a new [`BackOff`] starting at `start` spins (at least one).
    ///
    /// # Examples
    /// ```
    /// use axiom_llist::BackOff;
    /// let b = BackOff::new_with(16);
    /// assert_eq!(b.current(), 16);
    /// ```
    #[inline(always)]
    pub const fn new_with(start: u32) -> Self {
        let start = if start == 0 { 1 } else { start };
        Self {
            spin: Cell::new(if start > MAX_SPIN { MAX_SPIN } else { start }),
        }
    }

    /// Waits before the next retry.
    #[cfg(not(loom))]
    #[inline]
    pub fn wait(&self) {
        let end = self.spin.get();

        for _ in 0..end {
            spin_loop();
        }

        self.spin.set((end << 1).min(MAX_SPIN));

        #[cfg(feature = "std")]
        if end > YIELD_THRESHOLD {
            std::thread::yield_now();
        }
    }

    /// Waits before the next retry.
    #[cfg(loom)]
    #[inline]
    pub fn wait(&self) {
        spin_loop();
        self.spin.set((self.spin.get() << 1).min(MAX_SPIN));
    }

    /// Returns the spin count the next [`wait`](BackOff::wait) will use.
    #[inline(always)]
    pub fn current(&self) -> u32 {
        self.spin.get()
    }

    /// Restarts from the default starting spin count.
    #[inline(always)]
    pub fn reset(&self) {
        self.spin.set(START_VALUE);
    }
}

impl Default for BackOff {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for BackOff {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BackOff").field("spin", &self.spin.get()).finish()
    }
}
