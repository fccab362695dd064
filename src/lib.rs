//! # axiom-llist 🔗
//!
//! A lightweight, **`no_std`-compatible** lock-less list for moving elements
//! between threads without taking a lock on the hot path.
//!
//! The crate includes:
//!
//! - [`ListHead<T>`]: a null-terminated, singly-linked intrusive list with
//!   multi-producer [`push_one`](ListHead::push_one) /
//!   [`push_batch`](ListHead::push_batch), a single-consumer
//!   [`pop_one`](ListHead::pop_one) and an any-consumer
//!   [`pop_all`](ListHead::pop_all).
//! - [`SerializedList<T>`]: the same list with a gated consumer side, so
//!   `pop_one` is safe from many threads.
//! - [`Batch`] / [`Drain`]: private chains: built locally before one
//!   splice, or handed back by a drain.
//! - [`BackOff`]: an adaptive exponential backoff for CAS retry loops.
//!
//! It is meant to sit inside higher-level subsystems: work queues, free
//! lists, deferred-event queues.
//!
//! ## ✨ Features
//!
//! - ✅ `no_std` compatible (uses `core` only, never allocates)
//! - ⚙️ Optional `std` feature to yield the CPU under heavy contention
//! - 🔍 Optional `tracing` feature to log every list operation
//! - 🧪 `loom` model-checked (`RUSTFLAGS="--cfg loom"`)
//!
//! ## 🚀 Quick Example
//!
//! ```rust
//! use axiom_llist::{Batch, Linked, ListHead, Node};
//! use core::ptr::NonNull;
//!
//! struct Work {
//!     links: Node<Work>,
//!     id: u32,
//! }
//!
//! impl Work {
//!     fn new(id: u32) -> Box<Self> {
//!         Box::new(Work { links: Node::new(), id })
//!     }
//! }
//!
//! unsafe impl Linked for Work {
//!     type Handle = Box<Work>;
//!
//!     fn into_ptr(work: Box<Work>) -> NonNull<Work> {
//!         NonNull::from(Box::leak(work))
//!     }
//!
//!     unsafe fn from_ptr(ptr: NonNull<Work>) -> Box<Work> {
//!         unsafe { Box::from_raw(ptr.as_ptr()) }
//!     }
//!
//!     unsafe fn links(ptr: NonNull<Work>) -> NonNull<Node<Work>> {
//!         unsafe { NonNull::new_unchecked(core::ptr::addr_of_mut!((*ptr.as_ptr()).links)) }
//!     }
//! }
//!
//! let queue: ListHead<Work> = ListHead::new();
//!
//! // Producers: one at a time, or many in a single CAS.
//! queue.push_one(Work::new(1));
//! let batch: Batch<Work> = (2..=4).map(Work::new).collect();
//! queue.push_batch(batch);
//!
//! // Consumer: take everything, process in push order.
//! let mut drained = queue.pop_all();
//! drained.reverse();
//! let ids: Vec<u32> = drained.map(|w| w.id).collect();
//! assert_eq!(ids, [1, 2, 3, 4]);
//! ```
//!
//! ## 🧠 Design
//!
//! ### ListHead
//!
//! `ListHead` is one [`AtomicPtr`](core::sync::atomic::AtomicPtr). Pushes
//! link the new element(s) to the observed front and publish with a
//! `Release` compare-and-swap, retrying with [`BackOff`] until they win.
//! `pop_all` is a single `AcqRel` swap with null. `pop_one` reads the front
//! with `Acquire` and CASes it to its successor.
//!
//! The retry loops have no iteration cap: they are **lock-free, not
//! wait-free**.
//!
//! ### Elements
//!
//! Elements embed a [`Node`] and implement the [`Linked`] trait, which
//! converts between an owning handle (`Box<T>`, `&'static T`, ...) and the
//! raw pointer the list stores. The list reads and writes only the node's
//! `next` link, and never allocates or frees.
//!
//! ## ⚠️ Safety & Usage Notes
//!
//! - [`ListHead::pop_one`] is `unsafe`: only one `pop_one` may run on a list
//!   at a time (the ABA hazard). Use `pop_all` or [`SerializedList`] for
//!   multiple consumers.
//! - An element must not be pushed while it is still linked. Debug builds
//!   poison the link of every element that leaves a list and assert on
//!   obvious reuse; release builds check nothing.
//! - The operations rely on the platform's atomic CAS and swap. Where those
//!   are not safe inside an asynchronous interrupt or signal handler, do not
//!   call into the list from one.
//! - Dropping a list (or a `Batch`/`Drain`) drops the handles it still
//!   holds. With non-owning handles that is a leak-free no-op; drain
//!   explicitly with `pop_all` if elements need other teardown.
//!
//! ## 📦 Modules
//!
//! - [`llist`]: the lock-less list itself.
//! - [`chain`]: local batches and detached drains.
//! - [`serialized`]: the gated-consumer list.
//! - [`backoff`]: adaptive exponential backoff.
//! - [`trace`]: optional `tracing` output.
#![cfg_attr(not(any(feature = "std", test)), no_std)]
#![warn(missing_debug_implementations)]

pub mod backoff;
pub mod chain;
mod gate;
pub mod llist;
mod loom;
pub mod serialized;
pub mod trace;

#[cfg(test)]
#[cfg_attr(loom, allow(dead_code))]
mod test_util;

pub use backoff::BackOff;
pub use chain::{Batch, Drain};
pub use llist::{Linked, ListHead, Node};
pub use serialized::SerializedList;
