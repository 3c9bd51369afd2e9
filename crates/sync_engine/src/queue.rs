//! Per-stream dispatch queue with stamp ordering.
//!
//! Uses index-based separation so sorted insertion stays cheap:
//! - a `VecDeque` holds lightweight metadata (stamp + slab key) in stamp order
//! - a `Slab` holds the actual dispatches
//!
//! Payloads never move while the index is shifted or trimmed.

use std::collections::VecDeque;
use std::fmt;

use contracts::{Dispatch, Insertion, OverflowPolicy, Stamp};
use slab::Slab;

/// Lightweight metadata stored in the ordered index
#[derive(Debug, Clone, Copy)]
struct Slot<S> {
    stamp: S,
    key: usize,
}

/// What happened to an inserted dispatch.
///
/// Carries the dispatch that left the queue, if any, so the owner can hand
/// it to an overflow monitor.
#[derive(Debug)]
pub enum Admission<S, T> {
    Accepted,
    /// Stored; the oldest entry was evicted to make room.
    Evicted(Dispatch<S, T>),
    /// Not stored because the queue is full.
    Overflow(Dispatch<S, T>),
    /// Not stored because an entry with the same stamp is queued.
    Duplicate(Dispatch<S, T>),
}

impl<S, T> Admission<S, T> {
    pub fn insertion(&self) -> Insertion {
        match self {
            Admission::Accepted => Insertion::Accepted,
            Admission::Evicted(_) => Insertion::EvictedOldest,
            Admission::Overflow(_) | Admission::Duplicate(_) => Insertion::Rejected,
        }
    }

    /// Dispatch dropped because of capacity, not because of a duplicate stamp.
    pub fn overflowed(&self) -> Option<&Dispatch<S, T>> {
        match self {
            Admission::Evicted(d) | Admission::Overflow(d) => Some(d),
            _ => None,
        }
    }
}

/// Bounded, stamp-sorted buffer of dispatches.
pub struct DispatchQueue<S, T> {
    index: VecDeque<Slot<S>>,
    storage: Slab<Dispatch<S, T>>,
    capacity: usize,
    overflow: OverflowPolicy,
    overflow_count: u64,
    duplicate_count: u64,
    out_of_order_count: u64,
}

impl<S: Stamp, T> fmt::Debug for DispatchQueue<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchQueue")
            .field("len", &self.index.len())
            .field("capacity", &self.capacity)
            .field("oldest", &self.oldest_stamp())
            .field("newest", &self.newest_stamp())
            .field("overflowed", &self.overflow_count)
            .finish()
    }
}

impl<S: Stamp, T> DispatchQueue<S, T> {
    pub fn new(capacity: usize, overflow: OverflowPolicy) -> Self {
        Self {
            index: VecDeque::with_capacity(capacity),
            storage: Slab::with_capacity(capacity),
            capacity,
            overflow,
            overflow_count: 0,
            duplicate_count: 0,
            out_of_order_count: 0,
        }
    }

    /// Insert keeping stamps sorted front (oldest) to back (newest).
    pub fn insert(&mut self, dispatch: Dispatch<S, T>) -> Admission<S, T> {
        let stamp = dispatch.stamp;
        let mut pos = self.lower_bound(stamp);

        if self.index.get(pos).is_some_and(|slot| slot.stamp == stamp) {
            self.duplicate_count += 1;
            return Admission::Duplicate(dispatch);
        }

        let mut evicted = None;
        if self.is_full() {
            // A full queue only makes room by dropping its front, so an incoming
            // dispatch older than everything queued is the one to go.
            if self.overflow == OverflowPolicy::RejectNewest || pos == 0 {
                self.overflow_count += 1;
                return Admission::Overflow(dispatch);
            }
            if let Some(front) = self.index.pop_front() {
                evicted = Some(self.storage.remove(front.key));
                pos -= 1;
            }
            self.overflow_count += 1;
        }

        if pos < self.index.len() {
            self.out_of_order_count += 1;
        }

        let key = self.storage.insert(dispatch);
        self.index.insert(pos, Slot { stamp, key });

        match evicted {
            Some(d) => Admission::Evicted(d),
            None => Admission::Accepted,
        }
    }

    /// Remove and return every dispatch with a stamp strictly before `stamp`.
    pub fn remove_before(&mut self, stamp: S) -> Vec<Dispatch<S, T>> {
        let n = self.lower_bound(stamp);
        self.remove_first_n(n)
    }

    /// Remove and return the `n` oldest dispatches.
    pub fn remove_first_n(&mut self, n: usize) -> Vec<Dispatch<S, T>> {
        let n = n.min(self.index.len());
        let mut removed = Vec::with_capacity(n);
        for slot in self.index.drain(..n) {
            removed.push(self.storage.remove(slot.key));
        }
        removed
    }

    /// Read-only view of dispatches with `lower <= stamp <= upper`.
    pub fn range(&self, lower: S, upper: S) -> impl Iterator<Item = &Dispatch<S, T>> + '_ {
        let start = self.lower_bound(lower);
        let end = self.upper_bound(upper).max(start);
        self.index
            .range(start..end)
            .map(move |slot| &self.storage[slot.key])
    }

    /// Drop everything. Returns how many dispatches were removed.
    pub fn clear(&mut self) -> usize {
        let n = self.index.len();
        self.index.clear();
        self.storage.clear();
        n
    }

    /// Number of queued entries with a stamp strictly before `stamp`.
    #[inline]
    pub fn lower_bound(&self, stamp: S) -> usize {
        self.index.partition_point(|slot| slot.stamp < stamp)
    }

    /// Number of queued entries with a stamp at or before `stamp`.
    #[inline]
    pub fn upper_bound(&self, stamp: S) -> usize {
        self.index.partition_point(|slot| slot.stamp <= stamp)
    }

    #[inline]
    pub fn get(&self, i: usize) -> Option<&Dispatch<S, T>> {
        self.index.get(i).map(|slot| &self.storage[slot.key])
    }

    #[inline]
    pub fn stamp_at(&self, i: usize) -> Option<S> {
        self.index.get(i).map(|slot| slot.stamp)
    }

    #[inline]
    pub fn front(&self) -> Option<&Dispatch<S, T>> {
        self.get(0)
    }

    #[inline]
    pub fn back(&self) -> Option<&Dispatch<S, T>> {
        self.index.back().map(|slot| &self.storage[slot.key])
    }

    #[inline]
    pub fn oldest_stamp(&self) -> Option<S> {
        self.index.front().map(|slot| slot.stamp)
    }

    #[inline]
    pub fn newest_stamp(&self) -> Option<S> {
        self.index.back().map(|slot| slot.stamp)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Dispatch<S, T>> + '_ {
        self.index.iter().map(move |slot| &self.storage[slot.key])
    }

    pub fn stamps(&self) -> impl Iterator<Item = S> + '_ {
        self.index.iter().map(|slot| slot.stamp)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.index.len() >= self.capacity
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn overflow_policy(&self) -> OverflowPolicy {
        self.overflow
    }

    /// Dispatches dropped or refused because of capacity
    #[inline]
    pub fn overflow_count(&self) -> u64 {
        self.overflow_count
    }

    #[inline]
    pub fn duplicate_count(&self) -> u64 {
        self.duplicate_count
    }

    /// Insertions that landed before an already queued stamp
    #[inline]
    pub fn out_of_order_count(&self) -> u64 {
        self.out_of_order_count
    }
}
