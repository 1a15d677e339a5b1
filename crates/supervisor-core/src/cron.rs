// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Calendar-interval next-fire computation.
//!
//! Pure arithmetic on broken-down local time: "wildcards recurse, fixed
//! fields clamp-and-advance". Each field is tried from the coarsest
//! (month) to the finest (minute); a wildcard field walks forward one
//! unit at a time trying every value of the next-finer field, while a
//! fixed field either accepts the current value, jumps forward to it
//! within the current unit, or signals "not reachable this unit" so the
//! caller advances the next-coarser field instead.
//!
//! When `weekday` and `mday` are both given, the spec's OR rule applies:
//! fire at the earlier of the mday-only and weekday-only schedules.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// How many years ahead `next_fire` will search before giving up. A
/// well-formed spec (e.g. `Month: 2, Day: 30`, which no February has)
/// would otherwise search forever; real submissions never need more
/// than one year of lookahead, so eight is generous headroom.
const MAX_YEARS_AHEAD: i32 = 8;

/// How many days ahead the weekday-only schedule will search.
const MAX_WDAY_DAYS_AHEAD: i64 = 8 * 366;

/// A partial calendar spec with `None` standing in for `-1` ("any value").
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarInterval {
    pub minute: Option<u32>,
    pub hour: Option<u32>,
    pub mday: Option<u32>,
    /// 0 and 7 both mean Sunday, matching cron convention.
    pub weekday: Option<u32>,
    /// 1-12.
    pub month: Option<u32>,
}

impl CalendarInterval {
    /// The next fire time strictly after `after`. Returns `None` only for
    /// a spec that can never be satisfied (e.g. day 30 in a month fixed
    /// to February) within the search horizon.
    pub fn next_fire(&self, after: NaiveDateTime) -> Option<NaiveDateTime> {
        let mday_schedule = cronemu(after, self.month, self.mday, self.hour, self.minute);

        match self.weekday {
            None => mday_schedule,
            Some(wday) => {
                let wday_schedule = cronemu_wday(after, wday, self.hour, self.minute);
                match (self.mday, mday_schedule, wday_schedule) {
                    (None, _, wday_only) => wday_only,
                    (Some(_), Some(a), Some(b)) => Some(a.min(b)),
                    (Some(_), Some(a), None) => Some(a),
                    (Some(_), None, b) => b,
                }
            }
        }
    }
}

fn start_of_search(after: NaiveDateTime) -> Option<NaiveDateTime> {
    after.with_second(0)?.with_nanosecond(0)?.checked_add_signed(Duration::minutes(1))
}

fn cronemu(
    after: NaiveDateTime,
    month: Option<u32>,
    mday: Option<u32>,
    hour: Option<u32>,
    minute: Option<u32>,
) -> Option<NaiveDateTime> {
    let mut working = start_of_search(after)?;
    for _ in 0..MAX_YEARS_AHEAD {
        if let Some(found) = cronemu_mon(working, month, mday, hour, minute) {
            return Some(found);
        }
        working = NaiveDate::from_ymd_opt(working.year() + 1, 1, 1)?.and_hms_opt(0, 0, 0)?;
    }
    None
}

fn cronemu_wday(after: NaiveDateTime, wday: u32, hour: Option<u32>, minute: Option<u32>) -> Option<NaiveDateTime> {
    let wday = if wday == 7 { 0 } else { wday };
    let mut working = start_of_search(after)?;
    for _ in 0..MAX_WDAY_DAYS_AHEAD {
        if working.weekday().num_days_from_sunday() == wday {
            if let Some(found) = cronemu_hour(working, hour, minute) {
                return Some(found);
            }
        }
        working = working.date().succ_opt()?.and_hms_opt(0, 0, 0)?;
    }
    None
}

/// Try to satisfy `month` (then recurse into mday/hour/minute). Returns
/// `None` to signal "not reachable within the current year" so `cronemu`
/// advances to January 1 of the next year.
fn cronemu_mon(
    wtm: NaiveDateTime,
    month: Option<u32>,
    mday: Option<u32>,
    hour: Option<u32>,
    minute: Option<u32>,
) -> Option<NaiveDateTime> {
    match month {
        None => {
            let mut working = wtm;
            loop {
                if let Some(found) = cronemu_mday(working, mday, hour, minute) {
                    return Some(found);
                }
                let next_month = working.month() + 1;
                if next_month > 12 {
                    return None;
                }
                working = NaiveDate::from_ymd_opt(working.year(), next_month, 1)?.and_hms_opt(0, 0, 0)?;
            }
        }
        Some(month) => {
            if month < wtm.month() {
                return None;
            }
            let working = if month > wtm.month() {
                NaiveDate::from_ymd_opt(wtm.year(), month, 1)?.and_hms_opt(0, 0, 0)?
            } else {
                wtm
            };
            cronemu_mday(working, mday, hour, minute)
        }
    }
}

/// Try to satisfy `mday`. Returns `None` to signal "not reachable within
/// the current month" so `cronemu_mon`'s wildcard path advances a month.
fn cronemu_mday(wtm: NaiveDateTime, mday: Option<u32>, hour: Option<u32>, minute: Option<u32>) -> Option<NaiveDateTime> {
    match mday {
        None => {
            let mut working = wtm;
            loop {
                if let Some(found) = cronemu_hour(working, hour, minute) {
                    return Some(found);
                }
                let candidate = working.date().succ_opt()?.and_hms_opt(0, 0, 0)?;
                if candidate.month() != working.month() {
                    return None;
                }
                working = candidate;
            }
        }
        Some(mday) => {
            if mday < wtm.day() {
                return None;
            }
            let working = if mday > wtm.day() {
                match NaiveDate::from_ymd_opt(wtm.year(), wtm.month(), mday) {
                    Some(date) => date.and_hms_opt(0, 0, 0)?,
                    // e.g. Day: 30 in a fixed Month: 2 — never satisfiable this month.
                    None => return None,
                }
            } else {
                wtm
            };
            cronemu_hour(working, hour, minute)
        }
    }
}

/// Try to satisfy `hour`. Returns `None` to signal "not reachable within
/// the current day" so the caller advances a day.
fn cronemu_hour(wtm: NaiveDateTime, hour: Option<u32>, minute: Option<u32>) -> Option<NaiveDateTime> {
    match hour {
        None => {
            let mut working = wtm;
            loop {
                if let Some(found) = cronemu_min(working, minute) {
                    return Some(found);
                }
                let next_hour = working.hour() + 1;
                if next_hour > 23 {
                    return None;
                }
                working = working.date().and_hms_opt(next_hour, 0, 0)?;
            }
        }
        Some(hour) => {
            if hour < wtm.hour() {
                return None;
            }
            let working = if hour > wtm.hour() {
                working_at_hour(wtm, hour)?
            } else {
                wtm
            };
            cronemu_min(working, minute)
        }
    }
}

fn working_at_hour(wtm: NaiveDateTime, hour: u32) -> Option<NaiveDateTime> {
    wtm.date().and_hms_opt(hour, 0, 0)
}

/// Try to satisfy `minute`. Never signals "not reachable" — a minute is
/// always reachable within its hour by clamping forward.
fn cronemu_min(wtm: NaiveDateTime, minute: Option<u32>) -> Option<NaiveDateTime> {
    match minute {
        None => Some(wtm),
        Some(minute) => {
            if minute < wtm.minute() {
                None
            } else if minute > wtm.minute() {
                wtm.with_minute(minute)
            } else {
                Some(wtm)
            }
        }
    }
}

#[cfg(test)]
#[path = "cron_tests.rs"]
mod tests;
