//! Demo of the `axiom-llist` lock-less list used as a work queue.
//!
//! Eight producer threads each queue 100 000 jobs on a shared static
//! `ListHead`, half of them one at a time and half in batches of 16. A single
//! consumer drains the list with `pop_all` until every job has arrived, then
//! checks that each job was seen exactly once.
//!
//! Run with `--features tracing` and `RUST_LOG=axiom_llist=trace` to watch
//! individual operations (very noisy).

use axiom_llist::{trace::init_tracing, Batch, Linked, ListHead, Node};
use core::ptr::{self, NonNull};
use std::thread;
use std::time::Instant;

const PRODUCERS: usize = 8;
const JOBS_PER_PRODUCER: usize = 100_000;
const BATCH: usize = 16;

struct Job {
    links: Node<Job>,
    id: usize,
}

unsafe impl Linked for Job {
    type Handle = Box<Job>;

    fn into_ptr(job: Box<Job>) -> NonNull<Job> {
        NonNull::from(Box::leak(job))
    }

    unsafe fn from_ptr(ptr: NonNull<Job>) -> Box<Job> {
        unsafe { Box::from_raw(ptr.as_ptr()) }
    }

    unsafe fn links(ptr: NonNull<Job>) -> NonNull<Node<Job>> {
        unsafe { NonNull::new_unchecked(ptr::addr_of_mut!((*ptr.as_ptr()).links)) }
    }
}

// Shared queue; lives for the whole process and is drained before exit.
static QUEUE: ListHead<Job> = ListHead::new();

fn job(id: usize) -> Box<Job> {
    Box::new(Job {
        links: Node::new(),
        id,
    })
}

/// Queue this producer's jobs: first half singly, second half in batches.
fn produce(producer: usize) -> usize {
    let base = producer * JOBS_PER_PRODUCER;
    let half = JOBS_PER_PRODUCER / 2;
    let mut wakeups = 0;

    for id in base..base + half {
        if QUEUE.push_one(job(id)) {
            wakeups += 1;
        }
    }

    let mut batch = Batch::<Job>::new();
    for id in base + half..base + JOBS_PER_PRODUCER {
        batch.push(job(id));
        if batch.len() == BATCH && QUEUE.push_batch(std::mem::take(&mut batch)) {
            wakeups += 1;
        }
    }
    if QUEUE.push_batch(batch) {
        wakeups += 1;
    }

    wakeups
}

fn main() {
    init_tracing();
    println!("Starting llist demo...");

    let total = PRODUCERS * JOBS_PER_PRODUCER;
    let start = Instant::now();

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| thread::spawn(move || produce(p)))
        .collect();

    let mut seen = vec![false; total];
    let mut received = 0;
    let mut drains = 0;
    while received < total {
        let mut drained = QUEUE.pop_all();
        if drained.is_empty() {
            thread::yield_now();
            continue;
        }
        drains += 1;
        drained.reverse();
        for job in drained {
            assert!(!seen[job.id], "job {} delivered twice", job.id);
            seen[job.id] = true;
            received += 1;
        }
    }

    let wakeups: usize = producers
        .into_iter()
        .map(|p| p.join().expect("producer panicked"))
        .sum();

    assert!(QUEUE.is_empty());
    println!("Received {received} jobs in {drains} drains ({wakeups} empty-to-busy transitions)");
    println!("Elapsed: {:?}", start.elapsed());
}
