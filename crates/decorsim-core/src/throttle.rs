//! Countdown timers gating how often a device performs real work.
//!
//! A device calls [`Throttle::tick`] once per world tick. The timer counts
//! down and reports `true` when it reaches zero; the device then does its
//! update and re-arms the timer with [`Throttle::arm`], choosing the normal
//! interval or a longer idle interval. A fresh timer fires on the first
//! tick.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Throttle {
    remaining: u32,
}

impl Throttle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count down one tick. Returns `true` when the timer has expired and
    /// the gated work should run now.
    pub fn tick(&mut self) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining == 0
    }

    /// Re-arm the timer. An interval of 0 behaves like 1.
    pub fn arm(&mut self, interval: u32) {
        self.remaining = interval.max(1);
    }

    /// Expire the timer so the next [`tick`](Self::tick) fires.
    pub fn reset(&mut self) {
        self.remaining = 0;
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }
}
