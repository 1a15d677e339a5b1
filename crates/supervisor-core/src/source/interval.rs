// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};

use super::ArmState;

/// `StartInterval`: fire every `period_seconds` seconds, measured from
/// the last dispatch (or from daemon startup if it has never fired).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartInterval {
    pub period_seconds: u64,
    pub last_fired_epoch_ms: Option<u64>,
    pub arm_state: ArmState,
}

impl StartInterval {
    pub fn new(period_seconds: u64) -> Self {
        Self { period_seconds, last_fired_epoch_ms: None, arm_state: ArmState::Unarmed }
    }

    pub fn is_due(&self, now_epoch_ms: u64) -> bool {
        match self.last_fired_epoch_ms {
            None => true,
            Some(last) => now_epoch_ms.saturating_sub(last) >= self.period_seconds.saturating_mul(1000),
        }
    }

    pub fn record_fire(&mut self, now_epoch_ms: u64) {
        self.last_fired_epoch_ms = Some(now_epoch_ms);
    }
}

#[cfg(test)]
#[path = "interval_tests.rs"]
mod tests;
