//! Bounded resource accumulators.
//!
//! A [`ResourceBuffer`] holds an integer amount of one resource in
//! `[0, capacity]`. Every operation saturates; nothing is ever lost or
//! fabricated beyond the declared capacity.

use serde::{Deserialize, Serialize};

use crate::fixed::{Fixed64, ratio};

/// The two resources that flow between devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    /// Energy in RF/FE units.
    Energy,
    /// Fluid in millibuckets.
    Fluid,
}

/// A bounded accumulator of a single resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceBuffer {
    amount: u32,
    capacity: u32,
    /// Cap applied by [`receive`](Self::receive) and
    /// [`extract`](Self::extract), i.e. per transfer call.
    max_transfer: u32,
}

impl ResourceBuffer {
    /// An empty buffer. The transfer cap is clamped to the capacity.
    pub fn new(capacity: u32, max_transfer: u32) -> Self {
        Self {
            amount: 0,
            capacity,
            max_transfer: max_transfer.min(capacity),
        }
    }

    pub fn amount(&self) -> u32 {
        self.amount
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn max_transfer(&self) -> u32 {
        self.max_transfer
    }

    /// Free space left before the buffer is full.
    pub fn headroom(&self) -> u32 {
        self.capacity - self.amount
    }

    pub fn is_empty(&self) -> bool {
        self.amount == 0
    }

    pub fn is_full(&self) -> bool {
        self.amount >= self.capacity
    }

    /// Add up to `amount`; returns the amount accepted.
    pub fn fill(&mut self, amount: u32) -> u32 {
        if amount == 0 {
            return 0;
        }
        let accepted = amount.min(self.headroom());
        self.amount += accepted;
        accepted
    }

    /// Remove up to `amount`; returns the amount removed.
    pub fn drain(&mut self, amount: u32) -> u32 {
        let removed = amount.min(self.amount);
        self.amount -= removed;
        removed
    }

    /// [`fill`](Self::fill) limited by the per-transfer cap.
    pub fn receive(&mut self, amount: u32) -> u32 {
        self.fill(amount.min(self.max_transfer))
    }

    /// [`drain`](Self::drain) limited by the per-transfer cap.
    pub fn extract(&mut self, amount: u32) -> u32 {
        self.drain(amount.min(self.max_transfer))
    }

    /// Overwrite the amount, clamped to the capacity. Only used when
    /// restoring saved state.
    pub fn set_amount(&mut self, amount: u32) {
        self.amount = amount.min(self.capacity);
    }

    /// Fill level as a fraction in `[0, 1]`.
    pub fn level_fraction(&self) -> Fixed64 {
        ratio(self.amount, self.capacity)
    }

    /// Fill level in percent, rounded down.
    pub fn percent(&self) -> u32 {
        if self.capacity == 0 {
            return 0;
        }
        ((self.amount as u64 * 100) / self.capacity as u64) as u32
    }
}
