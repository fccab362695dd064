//! Element types shared by the unit and loom tests.

use core::ptr::{self, NonNull};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use crate::{Linked, Node};

/// A heap element owned through `Box`.
pub(crate) struct Entry {
    links: Node<Entry>,
    pub(crate) val: usize,
    dropped: Option<Arc<AtomicUsize>>,
}

/// A `'static` element, for lists living in statics.
pub(crate) struct StaticEntry {
    links: Node<StaticEntry>,
    pub(crate) val: usize,
}

pub(crate) fn entry(val: usize) -> Box<Entry> {
    Box::new(Entry {
        links: Node::new(),
        val,
        dropped: None,
    })
}

/// An entry that bumps `dropped` when it is dropped.
pub(crate) fn tracked(val: usize, dropped: &Arc<AtomicUsize>) -> Box<Entry> {
    Box::new(Entry {
        links: Node::new(),
        val,
        dropped: Some(dropped.clone()),
    })
}

impl Drop for Entry {
    fn drop(&mut self) {
        if let Some(dropped) = &self.dropped {
            dropped.fetch_add(1, Ordering::SeqCst);
        }
    }
}

unsafe impl Linked for Entry {
    type Handle = Box<Entry>;

    fn into_ptr(handle: Box<Entry>) -> NonNull<Entry> {
        NonNull::from(Box::leak(handle))
    }

    unsafe fn from_ptr(ptr: NonNull<Entry>) -> Box<Entry> {
        unsafe { Box::from_raw(ptr.as_ptr()) }
    }

    unsafe fn links(ptr: NonNull<Entry>) -> NonNull<Node<Entry>> {
        unsafe { NonNull::new_unchecked(ptr::addr_of_mut!((*ptr.as_ptr()).links)) }
    }
}

#[cfg(not(loom))]
impl StaticEntry {
    pub(crate) const fn new(val: usize) -> Self {
        Self {
            links: Node::new(),
            val,
        }
    }
}

unsafe impl Linked for StaticEntry {
    type Handle = &'static StaticEntry;

    fn into_ptr(handle: &'static StaticEntry) -> NonNull<StaticEntry> {
        NonNull::from(handle)
    }

    unsafe fn from_ptr(ptr: NonNull<StaticEntry>) -> &'static StaticEntry {
        unsafe { &*ptr.as_ptr() }
    }

    unsafe fn links(ptr: NonNull<StaticEntry>) -> NonNull<Node<StaticEntry>> {
        unsafe { NonNull::new_unchecked(ptr::addr_of_mut!((*ptr.as_ptr()).links)) }
    }
}
