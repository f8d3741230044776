//! Bounded, name-ordered buffer between intake and dispatch
//!
//! Intake inserts admitted units as they are discovered; dispatch drains the
//! whole buffer at once in ascending name order. Equal names keep their
//! insertion order.

use crate::error::{FlowError, Result};
use crate::unit::UnitOfWork;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Default buffer capacity
pub const DEFAULT_CAPACITY: usize = 1000;

struct Buffered {
    seq: u64,
    unit: UnitOfWork,
}

impl Buffered {
    fn key(&self) -> (&str, u64) {
        (self.unit.name(), self.seq)
    }
}

impl PartialEq for Buffered {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Buffered {}

impl PartialOrd for Buffered {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Buffered {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

#[derive(Default)]
struct Inner {
    heap: BinaryHeap<Reverse<Buffered>>,
    next_seq: u64,
}

/// Mutex-guarded min-heap keyed on (name, insertion sequence).
pub struct OrderingBuffer {
    capacity: usize,
    inner: Mutex<Inner>,
}

impl OrderingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Buffer a unit. Fails with `CapacityExceeded` when full; the buffered
    /// units are left untouched and the rejected unit is dropped.
    pub fn insert(&self, unit: UnitOfWork) -> Result<()> {
        let mut inner = self.lock();
        if inner.heap.len() >= self.capacity {
            return Err(FlowError::CapacityExceeded {
                name: unit.name().to_string(),
                capacity: self.capacity,
            });
        }
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.heap.push(Reverse(Buffered { seq, unit }));
        Ok(())
    }

    /// Atomically take every buffered unit, in ascending name order.
    pub fn drain_all(&self) -> Vec<UnitOfWork> {
        let mut heap = std::mem::take(&mut self.lock().heap);
        let mut drained = Vec::with_capacity(heap.len());
        while let Some(Reverse(buffered)) = heap.pop() {
            drained.push(buffered.unit);
        }
        drained
    }

    pub fn len(&self) -> usize {
        self.lock().heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Every mutation is a single push or take, so a poisoned heap is still consistent
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for OrderingBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl std::fmt::Debug for OrderingBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderingBuffer")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}
