//! Page-replacement strategies (spec §4.2). Each implementation is grounded
//! directly on the corresponding teaching reference strategy.

use crate::Frame;
use std::fmt::Debug;

/// Called on every pin (`on_pin`) and consulted when the pool has no free
/// frame (`find_victim`). Implementations never return a pinned frame.
pub trait ReplacementStrategy: Debug + Send {
    fn on_pin(&mut self, frame_index: usize, pin_sequence_number: u64);
    fn find_victim(&mut self, frames: &[Frame]) -> Option<usize>;
}

/// Circular scan with a per-frame second-chance bit.
#[derive(Debug)]
pub struct ClockStrategy {
    last_chance_bits: Vec<bool>,
    cursor: usize,
    pool_size: usize,
}

impl ClockStrategy {
    pub fn new(count_frames: usize) -> Self {
        Self {
            last_chance_bits: vec![true; count_frames],
            cursor: 0,
            pool_size: count_frames.saturating_sub(1).max(1),
        }
    }
}

impl ReplacementStrategy for ClockStrategy {
    fn on_pin(&mut self, frame_index: usize, _pin_sequence_number: u64) {
        self.last_chance_bits[frame_index] = true;
    }

    fn find_victim(&mut self, frames: &[Frame]) -> Option<usize> {
        let frame_id = self.cursor % self.pool_size;
        self.cursor = self.cursor.wrapping_add(1);
        if frames[frame_id].is_pinned() {
            return None;
        }
        if self.last_chance_bits[frame_id] {
            self.last_chance_bits[frame_id] = false;
            None
        } else {
            Some(frame_id)
        }
    }
}

/// Per-frame last-pin timestamp; evicts the unpinned frame pinned longest ago.
#[derive(Debug)]
pub struct LruStrategy {
    last_pin_timestamps: Vec<u64>,
}

impl LruStrategy {
    pub fn new(count_frames: usize) -> Self {
        Self {
            last_pin_timestamps: vec![0; count_frames],
        }
    }
}

impl ReplacementStrategy for LruStrategy {
    fn on_pin(&mut self, frame_index: usize, pin_sequence_number: u64) {
        self.last_pin_timestamps[frame_index] = pin_sequence_number;
    }

    fn find_victim(&mut self, frames: &[Frame]) -> Option<usize> {
        let mut evict_index = None;
        let mut oldest = u64::MAX;
        for (idx, frame) in frames.iter().enumerate() {
            if frame.is_pinned() {
                continue;
            }
            let ts = self.last_pin_timestamps[idx];
            if ts < oldest {
                oldest = ts;
                evict_index = Some(idx);
            }
        }
        if let Some(idx) = evict_index {
            self.last_pin_timestamps[idx] = 0;
        }
        evict_index
    }
}

/// Classic O'Neil LRU-K: per-frame history of the last `k` pin timestamps.
#[derive(Debug)]
pub struct LruKStrategy {
    history: Vec<Vec<u64>>,
    k: usize,
}

impl LruKStrategy {
    pub fn new(count_frames: usize, k: usize) -> Self {
        Self {
            history: vec![Vec::new(); count_frames],
            k: k.max(1),
        }
    }
}

impl ReplacementStrategy for LruKStrategy {
    fn on_pin(&mut self, frame_index: usize, pin_sequence_number: u64) {
        self.history[frame_index].push(pin_sequence_number);
    }

    fn find_victim(&mut self, frames: &[Frame]) -> Option<usize> {
        let mut group1_victim = None;
        let mut group1_ts = u64::MAX;
        let mut group2_victim = None;
        let mut group2_ts = u64::MAX;

        for (idx, frame) in frames.iter().enumerate() {
            if frame.is_pinned() {
                continue;
            }
            let history = &self.history[idx];
            if history.len() < self.k {
                let last_ts = history.last().copied().unwrap_or(0);
                if last_ts < group1_ts {
                    group1_ts = last_ts;
                    group1_victim = Some(idx);
                }
            } else {
                let k_ts = history[history.len() - self.k];
                if k_ts < group2_ts {
                    group2_ts = k_ts;
                    group2_victim = Some(idx);
                }
            }
        }

        let victim = group1_victim.or(group2_victim)?;
        self.history[victim].clear();
        Some(victim)
    }
}

/// Per-frame pin counter; evicts the least-frequently-pinned unpinned frame.
#[derive(Debug)]
pub struct LfuStrategy {
    pin_count: Vec<u64>,
}

impl LfuStrategy {
    pub fn new(count_frames: usize) -> Self {
        Self {
            pin_count: vec![0; count_frames],
        }
    }
}

impl ReplacementStrategy for LfuStrategy {
    fn on_pin(&mut self, frame_index: usize, _pin_sequence_number: u64) {
        self.pin_count[frame_index] += 1;
    }

    fn find_victim(&mut self, frames: &[Frame]) -> Option<usize> {
        let mut evict_index = None;
        let mut min_frequency = u64::MAX;
        for (idx, frame) in frames.iter().enumerate() {
            if frame.is_pinned() {
                continue;
            }
            if self.pin_count[idx] < min_frequency {
                min_frequency = self.pin_count[idx];
                evict_index = Some(idx);
            }
        }
        if let Some(idx) = evict_index {
            self.pin_count[idx] = 0;
        }
        evict_index
    }
}
