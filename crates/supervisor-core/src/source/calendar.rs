// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::cron::CalendarInterval;

use super::ArmState;

/// A single `StartCalendarInterval` entry plus the one-shot timer state
/// that it drives. Unlike `StartInterval`, a calendar source recomputes
/// its next absolute fire time after every dispatch rather than ticking
/// on a fixed period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarSource {
    pub interval: CalendarInterval,
    pub next_fire: Option<NaiveDateTime>,
    pub arm_state: ArmState,
}

impl CalendarSource {
    pub fn new(interval: CalendarInterval) -> Self {
        Self { interval, next_fire: None, arm_state: ArmState::Unarmed }
    }

    /// Recompute `next_fire` relative to `now` and return it. Called by
    /// the daemon right before (re-)registering the timer, and again
    /// once the source fires so the schedule keeps moving forward.
    pub fn recompute(&mut self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        self.next_fire = self.interval.next_fire(now);
        self.next_fire
    }

    /// Whether `now` has reached the scheduled fire time.
    pub fn is_due(&self, now: NaiveDateTime) -> bool {
        matches!(self.next_fire, Some(fire) if now >= fire)
    }
}

#[cfg(test)]
#[path = "calendar_tests.rs"]
mod tests;
