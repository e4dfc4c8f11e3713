//! Per-node packet buffer with timestamp-based ordering.
//!
//! Uses index-based separation:
//! - BinaryHeap stores lightweight metadata (timestamp + arrival seq + slab key)
//! - Slab stores actual RawPacket data
//!
//! Mesh routing delivers packets out of order; draining by timestamp
//! restores the order the node produced them in.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fmt;

use contracts::RawPacket;
use slab::Slab;

/// Lightweight metadata stored in the heap
#[derive(Debug, Clone, Copy)]
struct PacketMeta {
    /// Timestamp for ordering
    timestamp: f64,
    /// Arrival sequence, breaks timestamp ties
    seq: u64,
    /// Key into the slab storage
    slab_key: usize,
}

impl PartialEq for PacketMeta {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PacketMeta {}

impl PartialOrd for PacketMeta {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PacketMeta {
    fn cmp(&self, other: &Self) -> Ordering {
        self.timestamp
            .total_cmp(&other.timestamp)
            .then(self.seq.cmp(&other.seq))
    }
}

/// Per-node reorder buffer
///
/// Unbounded: depth is reported through [`len`](Self::len) so growth can be
/// observed instead of silently dropping packets.
pub struct PacketReorderBuffer {
    /// Min-heap of metadata
    index: BinaryHeap<Reverse<PacketMeta>>,
    /// Actual packet storage
    storage: Slab<RawPacket>,
    /// Post-handshake drain threshold
    drain_threshold: usize,
    next_seq: u64,
    out_of_order_count: u64,
    last_timestamp: Option<f64>,
}

impl fmt::Debug for PacketReorderBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PacketReorderBuffer")
            .field("len", &self.index.len())
            .field("drain_threshold", &self.drain_threshold)
            .field("out_of_order", &self.out_of_order_count)
            .finish()
    }
}

impl Default for PacketReorderBuffer {
    fn default() -> Self {
        Self::new(0)
    }
}

impl PacketReorderBuffer {
    #[inline]
    pub fn new(drain_threshold: usize) -> Self {
        Self {
            index: BinaryHeap::new(),
            storage: Slab::new(),
            drain_threshold,
            next_seq: 0,
            out_of_order_count: 0,
            last_timestamp: None,
        }
    }

    /// Insert a packet at its timestamp position.
    #[inline]
    pub fn accept(&mut self, packet: RawPacket) {
        let timestamp = packet.timestamp;

        // Track out-of-order arrivals
        if let Some(last) = self.last_timestamp {
            if timestamp < last {
                self.out_of_order_count += 1;
            }
        }
        self.last_timestamp = Some(timestamp);

        let slab_key = self.storage.insert(packet);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.index.push(Reverse(PacketMeta {
            timestamp,
            seq,
            slab_key,
        }));
    }

    /// Remove and return the earliest packet (by timestamp)
    #[inline]
    pub fn drain_next(&mut self) -> Option<RawPacket> {
        let Reverse(meta) = self.index.pop()?;
        Some(self.storage.remove(meta.slab_key))
    }

    /// Packet to process after an `accept`, if the drain policy allows one.
    ///
    /// Before the handshake every accept drains one packet. Afterwards one
    /// packet drains only while more than `drain_threshold` are buffered.
    pub fn next_ready(&mut self, handshake_acknowledged: bool) -> Option<RawPacket> {
        if !handshake_acknowledged || self.len() > self.drain_threshold {
            self.drain_next()
        } else {
            None
        }
    }

    /// Peek at the earliest packet without removing
    #[inline]
    pub fn peek(&self) -> Option<&RawPacket> {
        self.index
            .peek()
            .and_then(|Reverse(meta)| self.storage.get(meta.slab_key))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Discard everything buffered. Counters are kept.
    pub fn clear(&mut self) {
        self.index.clear();
        self.storage.clear();
        self.last_timestamp = None;
    }

    pub fn drain_threshold(&self) -> usize {
        self.drain_threshold
    }

    pub fn set_drain_threshold(&mut self, threshold: usize) {
        self.drain_threshold = threshold;
    }

    /// Get out-of-order packet count
    #[inline]
    pub fn out_of_order_count(&self) -> u64 {
        self.out_of_order_count
    }
}
