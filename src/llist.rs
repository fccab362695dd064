//! # ListHead
//!
//! A lock-less, null-terminated, singly-linked intrusive list.
//!
//! Any number of producers may [`push_one`](ListHead::push_one) or
//! [`push_batch`](ListHead::push_batch) concurrently. Consumers remove
//! elements with one of two protocols:
//!
//! - [`pop_all`](ListHead::pop_all) detaches the whole chain with a single
//!   atomic swap. Any number of threads may call it at once.
//! - [`pop_one`](ListHead::pop_one) detaches only the front element. It is
//!   `unsafe`: two overlapping `pop_one` calls on one list can fall into the
//!   ABA hazard, so callers must serialize them. [`SerializedList`] does
//!   that for you.
//!
//! Every operation is a plain CAS or swap on the head pointer. Retry loops
//! have no iteration cap; they are lock-free, not wait-free.
//!
//! The list never allocates. Elements embed a [`Node`] and implement
//! [`Linked`]; the list only ever touches the node's `next` field.
//!
//! [`SerializedList`]: crate::SerializedList

use core::{
    fmt,
    marker::{PhantomData, PhantomPinned},
    ptr::{self, NonNull},
};

use crate::{
    chain::{Batch, Drain},
    loom::sync::atomic::{
        AtomicPtr,
        Ordering::{AcqRel, Acquire, Relaxed, Release},
    },
    trace::trace,
    BackOff,
};

/// Trait implemented by types which can be members of a [`ListHead`].
///
/// # Safety
///
/// Implementations must guarantee that:
///
/// - an element stays at the same address, and is not deallocated, while it
///   is linked into a list or a detached [`Drain`]/[`Batch`];
/// - [`links`](Linked::links) returns the [`Node`] embedded in the element
///   pointed to by `ptr`, and the same one on every call;
/// - a `Handle` represents at most one list membership at a time. Owning
///   handles such as `Box<T>` or `Pin<Box<T>>` guarantee this by
///   construction. For shared handles such as `&'static T` the caller must
///   not push an element that is already linked.
///
/// Debug builds catch only part of that last misuse. A push asserts that the
/// element's link is null or poisoned, which spots an element in the middle
/// of a chain but not one that is the tail or the only element of a list:
/// its link is null too. Do not rely on the check to reject those.
pub unsafe trait Linked: Sized {
    /// The handle owning elements while they are in a list.
    type Handle;

    /// Converts a `Handle` into a raw pointer, giving up ownership.
    fn into_ptr(handle: Self::Handle) -> NonNull<Self>;

    /// Converts a raw pointer back into a `Handle`.
    ///
    /// # Safety
    ///
    /// `ptr` must have come from [`into_ptr`](Linked::into_ptr) and must not
    /// have been converted back already.
    unsafe fn from_ptr(ptr: NonNull<Self>) -> Self::Handle;

    /// Returns the link field of the element pointed to by `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr` must point to a live instance of `Self`.
    unsafe fn links(ptr: NonNull<Self>) -> NonNull<Node<Self>>;
}

/// The intrusive link embedded in every list element.
///
/// A `Node` carries no payload: it is a single atomic `next` pointer. It is
/// `!Unpin` so the containing element never receives `noalias` treatment
/// while linked.
pub struct Node<T> {
    next: AtomicPtr<T>,
    _unpin: PhantomPinned,
}

/// Lock-less list head.
///
/// A single atomic pointer to the front element, null when empty. It needs
/// no initialization beyond [`new`](ListHead::new) and can live in a
/// `static`:
///
/// ```rust
/// use axiom_llist::{Linked, ListHead, Node};
/// use core::ptr::NonNull;
///
/// struct Event {
///     links: Node<Event>,
///     code: u32,
/// }
///
/// unsafe impl Linked for Event {
///     type Handle = &'static Event;
///
///     fn into_ptr(handle: &'static Event) -> NonNull<Event> {
///         NonNull::from(handle)
///     }
///
///     unsafe fn from_ptr(ptr: NonNull<Event>) -> &'static Event {
///         unsafe { &*ptr.as_ptr() }
///     }
///
///     unsafe fn links(ptr: NonNull<Event>) -> NonNull<Node<Event>> {
///         unsafe { NonNull::new_unchecked(core::ptr::addr_of_mut!((*ptr.as_ptr()).links)) }
///     }
/// }
///
/// static PENDING: ListHead<Event> = ListHead::new();
/// static POWER: Event = Event { links: Node::new(), code: 1 };
/// static THERMAL: Event = Event { links: Node::new(), code: 2 };
///
/// assert!(PENDING.push_one(&POWER));
/// assert!(!PENDING.push_one(&THERMAL));
///
/// let codes: Vec<u32> = PENDING.pop_all().map(|ev| ev.code).collect();
/// assert_eq!(codes, [2, 1]);
/// assert!(PENDING.is_empty());
/// ```
pub struct ListHead<T: Linked> {
    first: AtomicPtr<T>,
    _handles: PhantomData<*const T>,
}

// Debug builds write this into `next` when an element leaves a list.
const POISON_ADDR: usize = 0x100;

#[inline(always)]
fn poison<T>() -> *mut T {
    POISON_ADDR as *mut T
}

#[inline(always)]
fn is_poisoned<T>(next: *mut T) -> bool {
    cfg!(debug_assertions) && next as usize == POISON_ADDR
}

/// Reads the successor of a node owned by the caller.
///
/// # Safety
///
/// `ptr` must point to a live element that is not reachable from a shared
/// list.
#[inline]
pub(crate) unsafe fn next_of<T: Linked>(ptr: NonNull<T>) -> Option<NonNull<T>> {
    let next = unsafe { T::links(ptr).as_ref() }.next.load(Relaxed);
    debug_assert!(
        !is_poisoned(next),
        "followed the link of an element that already left its list"
    );
    NonNull::new(next)
}

/// Overwrites the successor of a node owned by the caller.
///
/// # Safety
///
/// Same as [`next_of`].
#[inline]
pub(crate) unsafe fn set_next<T: Linked>(ptr: NonNull<T>, next: Option<NonNull<T>>) {
    let next = next.map_or(ptr::null_mut(), NonNull::as_ptr);
    unsafe { T::links(ptr).as_ref() }.next.store(next, Relaxed);
}

/// Marks a node as handed back to the caller.
///
/// # Safety
///
/// Same as [`next_of`].
#[inline]
pub(crate) unsafe fn detach<T: Linked>(ptr: NonNull<T>) {
    if cfg!(debug_assertions) {
        unsafe { T::links(ptr).as_ref() }.next.store(poison(), Relaxed);
    }
}

/// Debug check that a node about to be linked is not in the middle of a
/// chain: its `next` must be fresh (null) or poisoned. A linked tail also
/// has a null `next` and passes.
///
/// # Safety
///
/// `ptr` must point to a live element.
#[inline]
pub(crate) unsafe fn debug_assert_unlinked<T: Linked>(ptr: NonNull<T>) {
    if cfg!(debug_assertions) {
        let next = unsafe { T::links(ptr).as_ref() }.next.load(Relaxed);
        assert!(
            next.is_null() || is_poisoned(next),
            "pushed an element that is still linked into a list"
        );
    }
}

// === impl ListHead ===

impl<T: Linked> ListHead<T> {
    /// Returns a new, empty list.
    #[cfg(not(loom))]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            first: AtomicPtr::new(ptr::null_mut()),
            _handles: PhantomData,
        }
    }

    /// Returns a new, empty list.
    #[cfg(loom)]
    #[must_use]
    pub fn new() -> Self {
        Self {
            first: AtomicPtr::new(ptr::null_mut()),
            _handles: PhantomData,
        }
    }

    /// Adds `element` to the front of the list, taking ownership of it.
    ///
    /// Returns `true` if the list was empty before this push, which lets a
    /// producer decide whether a consumer needs waking.
    ///
    /// Lock-free: the CAS is retried until it wins against concurrent
    /// producers and consumers.
    pub fn push_one(&self, element: T::Handle) -> bool {
        let ptr = T::into_ptr(element);
        unsafe {
            // Safety: `into_ptr` gave us sole ownership of the element.
            debug_assert_unlinked(ptr);
            self.splice(ptr, ptr)
        }
    }

    /// Splices a locally built [`Batch`] onto the front of the list.
    ///
    /// The batch becomes visible in one atomic step: no consumer can observe
    /// the list with only part of it inserted. Linking the batch cost no
    /// synchronization, so `N` elements pay for a single contended CAS.
    ///
    /// Returns `true` if the list was empty before this push. An empty batch
    /// is a no-op and returns `false`.
    pub fn push_batch(&self, mut batch: Batch<T>) -> bool {
        let Some((first, last)) = batch.take_ends() else {
            trace!("ListHead::push_batch -> empty batch");
            return false;
        };
        unsafe {
            // Safety: the batch owned `first..=last` and gave it up.
            self.splice(first, last)
        }
    }

    /// Installs the chain `first..=last` as the new front of the list.
    ///
    /// # Safety
    ///
    /// `first..=last` must be a chain of live elements owned by the caller,
    /// linked through their `next` fields.
    unsafe fn splice(&self, first: NonNull<T>, last: NonNull<T>) -> bool {
        let last_links = unsafe { T::links(last).as_ref() };
        let backoff = BackOff::new();
        let mut observed = self.first.load(Relaxed);
        loop {
            last_links.next.store(observed, Relaxed);
            match self
                .first
                .compare_exchange_weak(observed, first.as_ptr(), Release, Relaxed)
            {
                Ok(_) => {
                    trace!(?first, ?last, ?observed, "ListHead::push -> linked");
                    return observed.is_null();
                }
                Err(actual) => {
                    observed = actual;
                    backoff.wait();
                }
            }
        }
    }

    /// Removes the front element and returns it, or `None` if the list is
    /// empty.
    ///
    /// An empty list returns immediately. Otherwise the CAS that moves
    /// `first` to its successor is retried until it wins.
    ///
    /// # Safety
    ///
    /// At most one `pop_one` may run on this list at a time. Producers may
    /// push concurrently without restriction.
    ///
    /// [`pop_all`](ListHead::pop_all) may run concurrently, provided the
    /// elements it detaches are neither freed nor pushed back while a
    /// `pop_one` could still be reading them.
    ///
    /// Violating this does not crash by itself. Two overlapping `pop_one`
    /// calls can observe the same front element, and if it is popped and
    /// pushed back in between, the stale CAS still succeeds and installs a
    /// successor that already belongs to someone else (the ABA hazard).
    /// When more than one consumer is needed use `pop_all` and distribute
    /// the detached chain, or use [`SerializedList`](crate::SerializedList).
    pub unsafe fn pop_one(&self) -> Option<T::Handle> {
        let backoff = BackOff::new();
        let mut observed = self.first.load(Acquire);
        loop {
            let Some(entry) = NonNull::new(observed) else {
                trace!("ListHead::pop_one -> empty");
                return None;
            };
            // Not `next_of`: under a concurrent `pop_all` this read may see
            // a poisoned link, and the CAS below then fails.
            let next = unsafe { T::links(entry).as_ref() }.next.load(Relaxed);
            match self
                .first
                .compare_exchange_weak(observed, next, AcqRel, Acquire)
            {
                Ok(_) => {
                    trace!(?entry, ?next, "ListHead::pop_one -> popped");
                    return unsafe {
                        detach(entry);
                        Some(T::from_ptr(entry))
                    };
                }
                Err(actual) => {
                    observed = actual;
                    backoff.wait();
                }
            }
        }
    }

    /// Detaches every element currently in the list and returns them as a
    /// private [`Drain`], front (most recently pushed) first.
    ///
    /// This is a single atomic swap with null. It never loops, and any
    /// number of threads may call it concurrently with anything else: each
    /// element ends up in exactly one returned `Drain`.
    #[must_use = "dropping the drain drops every element it holds"]
    pub fn pop_all(&self) -> Drain<T> {
        let head = self.first.swap(ptr::null_mut(), AcqRel);
        trace!(?head, "ListHead::pop_all");
        unsafe {
            // Safety: the swap gave us the only reference to this chain.
            Drain::from_raw(NonNull::new(head))
        }
    }

    /// Returns `true` if the list has no elements.
    ///
    /// This is a snapshot; a concurrent push or pop may change the answer
    /// before the caller acts on it.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.first.load(Acquire).is_null()
    }
}

impl<T: Linked> Drop for ListHead<T> {
    fn drop(&mut self) {
        // The list owns whatever is still linked; hand it back through the
        // element handles.
        drop(self.pop_all());
    }
}

impl<T: Linked> Default for ListHead<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Linked> fmt::Debug for ListHead<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListHead")
            .field("first", &self.first.load(Relaxed))
            .finish()
    }
}

/// # Safety
///
/// Pushing through `&ListHead` moves handles between threads, so both `Send`
/// and `Sync` need `T::Handle: Send`.
unsafe impl<T: Linked> Send for ListHead<T> where T::Handle: Send {}

unsafe impl<T: Linked> Sync for ListHead<T> where T::Handle: Send {}

// === impl Node ===

impl<T> Node<T> {
    /// Returns new, unlinked links.
    #[cfg(not(loom))]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next: AtomicPtr::new(ptr::null_mut()),
            _unpin: PhantomPinned,
        }
    }

    /// Returns new, unlinked links.
    #[cfg(loom)]
    #[must_use]
    pub fn new() -> Self {
        Self {
            next: AtomicPtr::new(ptr::null_mut()),
            _unpin: PhantomPinned,
        }
    }
}

impl<T> Default for Node<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Node<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("llist::Node { ... }")
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use crate::test_util::{entry, tracked, Entry, StaticEntry};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    fn next_ptr<T: Linked>(element: &T) -> *mut T {
        unsafe { T::links(NonNull::from(element)).as_ref() }
            .next
            .load(Relaxed)
    }

    fn drain_vals(list: &ListHead<Entry>) -> Vec<usize> {
        list.pop_all().map(|e| e.val).collect()
    }

    #[test]
    fn empty_list_stays_empty() {
        let list = ListHead::<Entry>::new();
        assert!(list.is_empty());

        assert!(unsafe { list.pop_one() }.is_none());
        assert!(list.pop_all().is_empty());

        // and again, after both kinds of removal
        assert!(unsafe { list.pop_one() }.is_none());
        assert!(list.pop_all().next().is_none());
        assert!(list.is_empty());
    }

    #[test]
    fn pop_one_returns_most_recent_first() {
        let list = ListHead::<Entry>::new();
        list.push_one(entry(1)); // A
        list.push_one(entry(2)); // B
        list.push_one(entry(3)); // C

        let popped: Vec<_> = (0..3)
            .map(|_| unsafe { list.pop_one() }.expect("list should not be empty").val)
            .collect();
        assert_eq!(popped, [3, 2, 1]);
        assert!(unsafe { list.pop_one() }.is_none());
    }

    #[test]
    fn push_reports_empty_transition() {
        let list = ListHead::<Entry>::new();
        assert!(list.push_one(entry(1)));
        assert!(!list.push_one(entry(2)));

        drop(list.pop_all());
        assert!(list.push_one(entry(3)));

        let mut batch = Batch::<Entry>::new();
        batch.push(entry(4));
        assert!(!list.push_batch(batch));
    }

    #[test]
    fn push_batch_splices_whole_chain_in_front() {
        let list = ListHead::<Entry>::new();
        list.push_one(entry(0));

        // X -> Y -> Z, built back to front.
        let mut batch = Batch::<Entry>::new();
        batch.push(entry(3)); // Z
        batch.push(entry(2)); // Y
        batch.push(entry(1)); // X
        assert_eq!(batch.len(), 3);

        assert!(!list.push_batch(batch));
        assert_eq!(drain_vals(&list), [1, 2, 3, 0]);
    }

    #[test]
    fn push_batch_onto_empty_list() {
        let list = ListHead::<Entry>::new();
        let mut batch = Batch::<Entry>::new();
        batch.push(entry(7));
        batch.push(entry(8));
        assert!(list.push_batch(batch));
        assert_eq!(drain_vals(&list), [8, 7]);
    }

    #[test]
    fn empty_batch_is_noop() {
        let list = ListHead::<Entry>::new();
        assert!(!list.push_batch(Batch::new()));
        assert!(list.is_empty());
    }

    #[test]
    fn pop_one_after_pop_all_and_repush() {
        let list = ListHead::<Entry>::new();
        for i in 0..4 {
            list.push_one(entry(i));
        }
        let drained: Vec<_> = list.pop_all().collect();
        for e in drained {
            list.push_one(e);
        }
        // Re-pushing in drain order reverses the list.
        let popped: Vec<_> = std::iter::from_fn(|| unsafe { list.pop_one() })
            .map(|e| e.val)
            .collect();
        assert_eq!(popped, [0, 1, 2, 3]);
    }

    #[test]
    fn drop_releases_linked_elements() {
        let dropped = Arc::new(AtomicUsize::new(0));
        {
            let list = ListHead::<Entry>::new();
            for i in 0..5 {
                list.push_one(tracked(i, &dropped));
            }
            let one = unsafe { list.pop_one() };
            assert!(one.is_some());
            assert_eq!(dropped.load(Ordering::SeqCst), 0);
            drop(one);
            assert_eq!(dropped.load(Ordering::SeqCst), 1);
        }
        assert_eq!(dropped.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn static_head_with_static_elements() {
        static LIST: ListHead<StaticEntry> = ListHead::new();
        static A: StaticEntry = StaticEntry::new(10);
        static B: StaticEntry = StaticEntry::new(20);

        assert!(LIST.push_one(&A));
        assert!(!LIST.push_one(&B));
        let vals: Vec<_> = LIST.pop_all().map(|e| e.val).collect();
        assert_eq!(vals, [20, 10]);

        // Popped static elements can be reused.
        LIST.push_one(&A);
        assert_eq!(unsafe { LIST.pop_one() }.map(|e| e.val), Some(10));
        assert!(LIST.is_empty());
    }

    #[test]
    #[cfg(debug_assertions)]
    fn detached_elements_are_poisoned() {
        static LIST: ListHead<StaticEntry> = ListHead::new();
        static A: StaticEntry = StaticEntry::new(1);
        static B: StaticEntry = StaticEntry::new(2);

        LIST.push_one(&A);
        LIST.push_one(&B);
        let b = unsafe { LIST.pop_one() }.unwrap();
        assert!(is_poisoned(next_ptr(b)));
        let a: Vec<_> = LIST.pop_all().collect();
        assert!(is_poisoned(next_ptr(a[0])));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "still linked")]
    fn pushing_a_linked_element_panics_in_debug() {
        static LIST: ListHead<StaticEntry> = ListHead::new();
        static A: StaticEntry = StaticEntry::new(1);
        static B: StaticEntry = StaticEntry::new(2);

        LIST.push_one(&A);
        LIST.push_one(&B);
        // B now links to A; pushing it again would create a cycle.
        LIST.push_one(&B);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "already left its list")]
    fn draining_a_self_linked_element_panics_in_debug() {
        static LIST: ListHead<StaticEntry> = ListHead::new();
        static A: StaticEntry = StaticEntry::new(1);

        // The sole element's link is null, so pushing it twice is not caught
        // at push time. The drain yields `A` once, then trips on its poison.
        LIST.push_one(&A);
        LIST.push_one(&A);
        let _ = LIST.pop_all().take(5).count();
    }

    #[test]
    fn push_contention_loses_nothing() {
        const THREADS: usize = 8;
        const PUSHES: usize = 2_000;

        let list = ListHead::<Entry>::new();
        thread::scope(|s| {
            for t in 0..THREADS {
                let list = &list;
                s.spawn(move || {
                    for i in 0..PUSHES {
                        list.push_one(entry(t * PUSHES + i));
                    }
                });
            }
        });

        let mut vals = drain_vals(&list);
        assert_eq!(vals.len(), THREADS * PUSHES);
        vals.sort_unstable();
        vals.dedup();
        assert_eq!(vals.len(), THREADS * PUSHES, "a tag appeared twice");
        assert!(list.is_empty());
    }

    #[test]
    fn concurrent_pop_all_is_exclusive() {
        const ELEMENTS: usize = 10_000;

        for _ in 0..16 {
            let list = ListHead::<Entry>::new();
            for i in 0..ELEMENTS {
                list.push_one(entry(i));
            }

            let (a, b) = thread::scope(|s| {
                let a = s.spawn(|| drain_vals(&list));
                let b = s.spawn(|| drain_vals(&list));
                (a.join().unwrap(), b.join().unwrap())
            });

            // One of them won the swap outright.
            assert!(a.is_empty() || b.is_empty());
            let mut all: Vec<_> = a.into_iter().chain(b).collect();
            all.sort_unstable();
            assert_eq!(all, (0..ELEMENTS).collect::<Vec<_>>());
        }
    }

    #[test]
    fn push_pop_all_race_loses_nothing() {
        const PUSHES: usize = 20_000;

        let list = ListHead::<Entry>::new();
        let done = AtomicBool::new(false);

        let mut seen = thread::scope(|s| {
            s.spawn(|| {
                for i in 0..PUSHES {
                    list.push_one(entry(i));
                }
                done.store(true, Ordering::Release);
            });

            let mut seen = Vec::new();
            while !done.load(Ordering::Acquire) {
                seen.extend(drain_vals(&list));
                thread::yield_now();
            }
            seen
        });
        seen.extend(drain_vals(&list));

        let unique: HashSet<_> = seen.iter().copied().collect();
        assert_eq!(unique.len(), seen.len(), "an element was drained twice");
        assert_eq!(seen.len(), PUSHES);
    }

    #[test]
    fn batches_are_observed_whole() {
        const BATCHES: usize = 5_000;

        let list = ListHead::<Entry>::new();
        let done = AtomicBool::new(false);

        let drains = thread::scope(|s| {
            s.spawn(|| {
                for b in 0..BATCHES {
                    let base = b * 3;
                    let mut batch = Batch::<Entry>::new();
                    batch.push(entry(base + 2));
                    batch.push(entry(base + 1));
                    batch.push(entry(base));
                    list.push_batch(batch);
                }
                done.store(true, Ordering::Release);
            });

            let mut drains = Vec::new();
            while !done.load(Ordering::Acquire) {
                drains.push(drain_vals(&list));
            }
            drains.push(drain_vals(&list));
            drains
        });

        let mut total = 0;
        for drained in drains {
            assert_eq!(drained.len() % 3, 0, "observed a partial batch");
            for chunk in drained.chunks(3) {
                assert_eq!(chunk[0] % 3, 0);
                assert_eq!(chunk, [chunk[0], chunk[0] + 1, chunk[0] + 2]);
            }
            total += drained.len();
        }
        assert_eq!(total, BATCHES * 3);
    }

    #[test]
    fn single_consumer_pop_one_with_many_producers() {
        const PRODUCERS: usize = 4;
        const PUSHES: usize = 5_000;

        let list = ListHead::<Entry>::new();
        let seen = thread::scope(|s| {
            for t in 0..PRODUCERS {
                let list = &list;
                s.spawn(move || {
                    for i in 0..PUSHES {
                        list.push_one(entry(t * PUSHES + i));
                    }
                });
            }

            // The only consumer.
            let consumer = s.spawn(|| {
                let mut seen = Vec::with_capacity(PRODUCERS * PUSHES);
                while seen.len() < PRODUCERS * PUSHES {
                    match unsafe { list.pop_one() } {
                        Some(e) => seen.push(e.val),
                        None => thread::yield_now(),
                    }
                }
                seen
            });
            consumer.join().unwrap()
        });

        let unique: HashSet<_> = seen.iter().copied().collect();
        assert_eq!(unique.len(), PRODUCERS * PUSHES);
        assert!(list.is_empty());
    }
}
