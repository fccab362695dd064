//! Private chains: the unsynchronized halves of the list.
//!
//! A [`Batch`] is built by one producer before being spliced onto a
//! [`ListHead`](crate::ListHead) with a single CAS. A [`Drain`] is what
//! [`pop_all`](crate::ListHead::pop_all) hands to a consumer. Neither is
//! shared, so neither needs atomics beyond the node links themselves.

use core::{fmt, iter::FusedIterator, marker::PhantomData, ptr::NonNull};

use crate::llist::{debug_assert_unlinked, detach, next_of, set_next, Linked};

/// A chain of elements linked locally, ready for
/// [`push_batch`](crate::ListHead::push_batch).
///
/// [`push`](Batch::push) adds to the front, so the last element pushed is
/// the first one a consumer will see.
///
/// Dropping a non-empty `Batch` drops its elements.
pub struct Batch<T: Linked> {
    head: Option<NonNull<T>>,
    tail: Option<NonNull<T>>,
    len: usize,
}

/// The chain detached by [`pop_all`](crate::ListHead::pop_all).
///
/// Iterating yields element handles front first, i.e. most recently pushed
/// first. Call [`reverse`](Drain::reverse) beforehand for push order.
///
/// Dropping a `Drain` drops the elements not yet yielded.
pub struct Drain<T: Linked> {
    head: Option<NonNull<T>>,
}

/// Borrowing iterator over a [`Drain`], see [`Drain::iter`].
pub struct Iter<'a, T: Linked> {
    curr: Option<NonNull<T>>,
    _drain: PhantomData<&'a Drain<T>>,
}

// === impl Batch ===

impl<T: Linked> Batch<T> {
    /// Returns an empty batch.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            head: None,
            tail: None,
            len: 0,
        }
    }

    /// Links `element` in front of the batch, taking ownership of it.
    ///
    /// O(1), no atomics beyond a relaxed store to the element's own link.
    pub fn push(&mut self, element: T::Handle) {
        let ptr = T::into_ptr(element);
        unsafe {
            // Safety: `into_ptr` gave us sole ownership of the element.
            debug_assert_unlinked(ptr);
            set_next(ptr, self.head);
        }
        if self.tail.is_none() {
            self.tail = Some(ptr);
        }
        self.head = Some(ptr);
        self.len += 1;
    }

    /// Number of elements in the batch.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Gives up the chain as its `(first, last)` ends, leaving the batch
    /// empty. `None` for an empty batch.
    pub(crate) fn take_ends(&mut self) -> Option<(NonNull<T>, NonNull<T>)> {
        let first = self.head.take()?;
        let last = self.tail.take()?;
        self.len = 0;
        Some((first, last))
    }
}

impl<T: Linked> Drop for Batch<T> {
    fn drop(&mut self) {
        self.tail = None;
        drop(unsafe {
            // Safety: the batch owns its chain and its tail link is null.
            Drain::from_raw(self.head.take())
        });
    }
}

impl<T: Linked> Default for Batch<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Linked> Extend<T::Handle> for Batch<T> {
    fn extend<I: IntoIterator<Item = T::Handle>>(&mut self, iter: I) {
        for element in iter {
            self.push(element);
        }
    }
}

impl<T: Linked> FromIterator<T::Handle> for Batch<T> {
    fn from_iter<I: IntoIterator<Item = T::Handle>>(iter: I) -> Self {
        let mut batch = Self::new();
        batch.extend(iter);
        batch
    }
}

impl<T: Linked> fmt::Debug for Batch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { head, tail, len } = self;
        f.debug_struct("Batch")
            .field("head", head)
            .field("tail", tail)
            .field("len", len)
            .finish()
    }
}

unsafe impl<T: Linked> Send for Batch<T> where T::Handle: Send {}

// === impl Drain ===

impl<T: Linked> Drain<T> {
    /// # Safety
    ///
    /// The caller must own the null-terminated chain starting at `head`.
    pub(crate) unsafe fn from_raw(head: Option<NonNull<T>>) -> Self {
        Self { head }
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Reverses the chain in place, so that iteration follows push order.
    ///
    /// O(n) and unsynchronized; the chain is private to this `Drain`.
    pub fn reverse(&mut self) {
        let mut rest = self.head.take();
        let mut reversed = None;
        while let Some(node) = rest {
            unsafe {
                // Safety: we own every node in the chain.
                rest = next_of(node);
                set_next(node, reversed);
            }
            reversed = Some(node);
        }
        self.head = reversed;
    }

    /// Returns an iterator over references to the elements, front first,
    /// without removing them.
    #[must_use]
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            curr: self.head,
            _drain: PhantomData,
        }
    }

    /// Turns the remaining chain back into a [`Batch`], so unprocessed work
    /// can be requeued with one [`push_batch`](crate::ListHead::push_batch).
    ///
    /// O(n): the tail has to be found.
    #[must_use]
    pub fn into_batch(mut self) -> Batch<T> {
        let head = self.head.take();
        let mut tail = head;
        let mut len = 0;
        let mut curr = head;
        while let Some(node) = curr {
            tail = Some(node);
            len += 1;
            curr = unsafe {
                // Safety: we own every node in the chain.
                next_of(node)
            };
        }
        Batch { head, tail, len }
    }
}

impl<T: Linked> Iterator for Drain<T> {
    type Item = T::Handle;

    fn next(&mut self) -> Option<Self::Item> {
        // Taken first, so a failed link check in `next_of` leaves the drain
        // empty for its `Drop`.
        let head = self.head.take()?;
        unsafe {
            // Safety: we own the chain, and `head` leaves it here.
            self.head = next_of(head);
            detach(head);
            Some(T::from_ptr(head))
        }
    }
}

impl<T: Linked> FusedIterator for Drain<T> {}

impl<T: Linked> Drop for Drain<T> {
    fn drop(&mut self) {
        for element in self.by_ref() {
            drop(element);
        }
    }
}

impl<T: Linked> fmt::Debug for Drain<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Drain").field("head", &self.head).finish()
    }
}

/// # Safety
///
/// Moving a `Drain` moves the handles it owns.
unsafe impl<T: Linked> Send for Drain<T> where T::Handle: Send {}

/// # Safety
///
/// `&Drain` only exposes `&T` through [`Drain::iter`].
unsafe impl<T: Linked + Sync> Sync for Drain<T> {}

// === impl Iter ===

impl<'a, T: Linked> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let curr = self.curr?;
        unsafe {
            // Safety: the borrowed `Drain` keeps the chain alive and unchanged.
            self.curr = next_of(curr);
            Some(curr.as_ref())
        }
    }
}

impl<T: Linked> FusedIterator for Iter<'_, T> {}

impl<T: Linked> fmt::Debug for Iter<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Iter").field("curr", &self.curr).finish()
    }
}
