//! Synchronization shim.
//!
//! Under `RUSTFLAGS="--cfg loom"` every atomic, thread and spin hint used by
//! the crate is routed through [`loom`](https://docs.rs/loom) so the model
//! checker can explore interleavings. Otherwise these are plain `core` items.

#[cfg(loom)]
#[allow(unused_imports)]
pub(crate) use loom::{hint, model, sync, thread};

#[cfg(not(loom))]
pub(crate) mod sync {
    pub(crate) mod atomic {
        pub(crate) use core::sync::atomic::{AtomicBool, AtomicPtr, Ordering};
    }
}

#[cfg(not(loom))]
pub(crate) mod hint {
    pub(crate) use core::hint::spin_loop;
}
