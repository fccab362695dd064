//! # SerializedList
//!
//! A [`ListHead`] whose consumer side is serialized.
//!
//! Producers behave exactly as on a bare [`ListHead`]: `push_one` and
//! `push_batch` are lock-free and never touch the gate. Consumers enter a
//! small exclusive section first, which makes [`pop_one`] safe to call from
//! any number of threads.
//!
//! [`pop_all`] enters the gate too. An ungated drain could hand a node to
//! its caller, who frees or re-pushes it while a gated `pop_one` is still
//! reading that node's link.
//!
//! [`pop_one`]: SerializedList::pop_one
//! [`pop_all`]: SerializedList::pop_all
//!
//! ## Example
//! ```rust
//! use axiom_llist::{Linked, Node, SerializedList};
//! use core::ptr::NonNull;
//! use std::thread;
//!
//! struct Job {
//!     links: Node<Job>,
//!     id: usize,
//! }
//!
//! unsafe impl Linked for Job {
//!     type Handle = Box<Job>;
//!
//!     fn into_ptr(job: Box<Job>) -> NonNull<Job> {
//!         NonNull::from(Box::leak(job))
//!     }
//!
//!     unsafe fn from_ptr(ptr: NonNull<Job>) -> Box<Job> {
//!         unsafe { Box::from_raw(ptr.as_ptr()) }
//!     }
//!
//!     unsafe fn links(ptr: NonNull<Job>) -> NonNull<Node<Job>> {
//!         unsafe { NonNull::new_unchecked(core::ptr::addr_of_mut!((*ptr.as_ptr()).links)) }
//!     }
//! }
//!
//! let queue = SerializedList::<Job>::new();
//! for id in 0..100 {
//!     queue.push_one(Box::new(Job { links: Node::new(), id }));
//! }
//!
//! // Two consumers popping one job at a time.
//! let total: usize = thread::scope(|s| {
//!     let workers: Vec<_> = (0..2)
//!         .map(|_| {
//!             s.spawn(|| {
//!                 let mut sum = 0;
//!                 while let Some(job) = queue.pop_one() {
//!                     sum += job.id;
//!                 }
//!                 sum
//!             })
//!         })
//!         .collect();
//!     workers.into_iter().map(|w| w.join().unwrap()).sum()
//! });
//! assert_eq!(total, (0..100).sum());
//! ```

use core::fmt;

use crate::{
    chain::{Batch, Drain},
    gate::Gate,
    llist::{Linked, ListHead},
};

/// A lock-less list with a serialized consumer side.
///
/// See the [module-level documentation](crate::serialized) for details.
pub struct SerializedList<T: Linked> {
    list: ListHead<T>,
    consumer: Gate,
}

impl<T: Linked> SerializedList<T> {
    /// Returns a new, empty list.
    #[cfg(not(loom))]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            list: ListHead::new(),
            consumer: Gate::new(),
        }
    }

    /// Returns a new, empty list.
    #[cfg(loom)]
    #[must_use]
    pub fn new() -> Self {
        Self {
            list: ListHead::new(),
            consumer: Gate::new(),
        }
    }

    /// See [`ListHead::push_one`]. Lock-free.
    #[inline]
    pub fn push_one(&self, element: T::Handle) -> bool {
        self.list.push_one(element)
    }

    /// See [`ListHead::push_batch`]. Lock-free.
    #[inline]
    pub fn push_batch(&self, batch: Batch<T>) -> bool {
        self.list.push_batch(batch)
    }

    /// Removes the front element, or returns `None` if the list is empty.
    ///
    /// Unlike [`ListHead::pop_one`] this is safe from any number of threads.
    /// Overlapping calls wait for each other.
    pub fn pop_one(&self) -> Option<T::Handle> {
        let _consumer = self.consumer.enter();
        unsafe {
            // Safety: the gate admits one consumer at a time, and ungated
            // `pop_all` is not reachable through this type.
            self.list.pop_one()
        }
    }

    /// Detaches every element, see [`ListHead::pop_all`].
    #[must_use = "dropping the drain drops every element it holds"]
    pub fn pop_all(&self) -> Drain<T> {
        let _consumer = self.consumer.enter();
        self.list.pop_all()
    }

    /// See [`ListHead::is_empty`].
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

impl<T: Linked> Default for SerializedList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Linked> fmt::Debug for SerializedList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { list, consumer } = self;
        f.debug_struct("SerializedList")
            .field("list", list)
            .field("consumer", consumer)
            .finish()
    }
}
