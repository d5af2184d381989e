// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cron-style schedule model.
//!
//! A [`Schedule`] holds five match rules: minute (0-59), hour (0-23),
//! day of month (1-31), month (1-12), and day of week (0-6, 0 = Monday).
//! Each field accepts `*`, a single value, a range (`1-5`), a step
//! (`*/5`), or a stepped range (`10-40/5`). A fire instant must satisfy
//! every field; resolution is one minute, seconds are always zero.
//!
//! The persisted form is a JSON object keyed by field name with omitted
//! fields defaulting to `*` (e.g. `{"minute": "*/5"}`); serialization
//! goes through the same parser, so the blob round-trips losslessly.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use chrono::{DateTime, Datelike, NaiveDate, TimeDelta, Timelike, Utc};

/// Days scanned by [`Schedule::next_after`] before giving up.
///
/// One full leap cycle plus slack: a schedule that matches no date in
/// this window (e.g. day 30 in February) never fires.
const SEARCH_WINDOW_DAYS: usize = 1466;

/// Errors from parsing a schedule field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    /// Field text does not match any accepted form.
    #[error("malformed {field} field: '{value}'")]
    Malformed { field: &'static str, value: String },
    /// A numeric component lies outside the field's domain.
    #[error("{field} value {value} out of range {min}..={max}")]
    OutOfRange {
        field: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },
    /// A step of zero can never advance.
    #[error("{field} step must be at least 1")]
    ZeroStep { field: &'static str },
    /// Range lower bound exceeds its upper bound.
    #[error("{field} range {lo}-{hi} is inverted")]
    InvertedRange {
        field: &'static str,
        lo: u32,
        hi: u32,
    },
}

/// One match rule within a schedule.
///
/// Each variant corresponds to exactly one textual form, so rendering
/// and re-parsing a field is lossless.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CronField {
    /// `*` — matches every value.
    #[default]
    Any,
    /// `N` — matches one value.
    Value(u32),
    /// `A-B` — matches the inclusive range.
    Range(u32, u32),
    /// `*/S` — matches every S-th value counted from the domain minimum.
    Step(u32),
    /// `A-B/S` — matches every S-th value within the inclusive range.
    RangeStep(u32, u32, u32),
}

impl CronField {
    /// True for the `*` rule.
    pub fn is_any(&self) -> bool {
        matches!(self, CronField::Any)
    }

    /// Whether `value` satisfies this rule.
    ///
    /// `domain_min` anchors step counting (`*/5` on a 1-based field
    /// matches 1, 6, 11, ...). A zero step matches nothing; the parser
    /// rejects it, so that arm only guards hand-built values.
    fn matches(&self, value: u32, domain_min: u32) -> bool {
        match *self {
            CronField::Any => true,
            CronField::Value(v) => value == v,
            CronField::Range(lo, hi) => value >= lo && value <= hi,
            CronField::Step(step) => step != 0 && (value - domain_min) % step == 0,
            CronField::RangeStep(lo, hi, step) => {
                step != 0 && value >= lo && value <= hi && (value - lo) % step == 0
            }
        }
    }
}

impl fmt::Display for CronField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            CronField::Any => write!(f, "*"),
            CronField::Value(v) => write!(f, "{v}"),
            CronField::Range(lo, hi) => write!(f, "{lo}-{hi}"),
            CronField::Step(step) => write!(f, "*/{step}"),
            CronField::RangeStep(lo, hi, step) => write!(f, "{lo}-{hi}/{step}"),
        }
    }
}

/// Position of a field within the schedule, carrying its name and domain.
#[derive(Debug, Clone, Copy)]
enum FieldKind {
    Minute,
    Hour,
    Day,
    Month,
    DayOfWeek,
}

impl FieldKind {
    fn name(self) -> &'static str {
        match self {
            FieldKind::Minute => "minute",
            FieldKind::Hour => "hour",
            FieldKind::Day => "day",
            FieldKind::Month => "month",
            FieldKind::DayOfWeek => "day_of_week",
        }
    }

    fn bounds(self) -> (u32, u32) {
        match self {
            FieldKind::Minute => (0, 59),
            FieldKind::Hour => (0, 23),
            FieldKind::Day => (1, 31),
            FieldKind::Month => (1, 12),
            FieldKind::DayOfWeek => (0, 6),
        }
    }
}

fn parse_num(field: &'static str, whole: &str, part: &str) -> Result<u32, ScheduleError> {
    part.parse().map_err(|_| ScheduleError::Malformed {
        field,
        value: whole.to_string(),
    })
}

fn check_bounds(field: &'static str, value: u32, min: u32, max: u32) -> Result<u32, ScheduleError> {
    if value < min || value > max {
        return Err(ScheduleError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(value)
}

fn parse_field(kind: FieldKind, text: &str) -> Result<CronField, ScheduleError> {
    let field = kind.name();
    let (min, max) = kind.bounds();
    let text = text.trim();

    if text == "*" {
        return Ok(CronField::Any);
    }

    if let Some((base, step)) = text.split_once('/') {
        let step = parse_num(field, text, step)?;
        if step == 0 {
            return Err(ScheduleError::ZeroStep { field });
        }
        if base == "*" {
            return Ok(CronField::Step(step));
        }
        let (lo, hi) = base.split_once('-').ok_or_else(|| ScheduleError::Malformed {
            field,
            value: text.to_string(),
        })?;
        let lo = check_bounds(field, parse_num(field, text, lo)?, min, max)?;
        let hi = check_bounds(field, parse_num(field, text, hi)?, min, max)?;
        if lo > hi {
            return Err(ScheduleError::InvertedRange { field, lo, hi });
        }
        return Ok(CronField::RangeStep(lo, hi, step));
    }

    if let Some((lo, hi)) = text.split_once('-') {
        let lo = check_bounds(field, parse_num(field, text, lo)?, min, max)?;
        let hi = check_bounds(field, parse_num(field, text, hi)?, min, max)?;
        if lo > hi {
            return Err(ScheduleError::InvertedRange { field, lo, hi });
        }
        return Ok(CronField::Range(lo, hi));
    }

    Ok(CronField::Value(check_bounds(
        field,
        parse_num(field, text, text)?,
        min,
        max,
    )?))
}

/// A validated five-field cron schedule.
///
/// Constructed through [`Schedule::from_fields`] or deserialization,
/// both of which validate every field, so a held `Schedule` is always
/// well-formed. The default matches every minute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSchedule", into = "RawSchedule")]
pub struct Schedule {
    pub minute: CronField,
    pub hour: CronField,
    /// Day of month, 1-31.
    pub day: CronField,
    pub month: CronField,
    /// 0 = Monday .. 6 = Sunday.
    pub day_of_week: CronField,
}

impl Schedule {
    /// Parse all five fields from their textual forms.
    pub fn from_fields(
        minute: &str,
        hour: &str,
        day: &str,
        month: &str,
        day_of_week: &str,
    ) -> Result<Self, ScheduleError> {
        Ok(Self {
            minute: parse_field(FieldKind::Minute, minute)?,
            hour: parse_field(FieldKind::Hour, hour)?,
            day: parse_field(FieldKind::Day, day)?,
            month: parse_field(FieldKind::Month, month)?,
            day_of_week: parse_field(FieldKind::DayOfWeek, day_of_week)?,
        })
    }

    /// Whether the instant satisfies all five fields.
    pub fn matches(&self, t: DateTime<Utc>) -> bool {
        self.date_matches(t.date_naive())
            && self.hour.matches(t.hour(), 0)
            && self.minute.matches(t.minute(), 0)
    }

    fn date_matches(&self, date: NaiveDate) -> bool {
        self.month.matches(date.month(), 1)
            && self.day.matches(date.day(), 1)
            && self.day_of_week.matches(date.weekday().num_days_from_monday(), 0)
    }

    /// The first matching instant strictly after `after`, or `None` if
    /// nothing matches within the search window.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        // First candidate: the next whole minute strictly after `after`.
        let start = after.with_second(0)?.with_nanosecond(0)? + TimeDelta::minutes(1);
        let start_date = start.date_naive();

        let mut date = start_date;
        for _ in 0..SEARCH_WINDOW_DAYS {
            if self.date_matches(date) {
                let (from_hour, from_minute) = if date == start_date {
                    (start.hour(), start.minute())
                } else {
                    (0, 0)
                };
                if let Some(t) = self.first_time_on(date, from_hour, from_minute) {
                    return Some(t);
                }
            }
            date = date.succ_opt()?;
        }
        None
    }

    /// Earliest matching time on `date` at or after `from_hour:from_minute`.
    fn first_time_on(
        &self,
        date: NaiveDate,
        from_hour: u32,
        from_minute: u32,
    ) -> Option<DateTime<Utc>> {
        for hour in from_hour..24 {
            if !self.hour.matches(hour, 0) {
                continue;
            }
            let minute_floor = if hour == from_hour { from_minute } else { 0 };
            for minute in minute_floor..60 {
                if self.minute.matches(minute, 0) {
                    return date.and_hms_opt(hour, minute, 0).map(|t| t.and_utc());
                }
            }
        }
        None
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            self.minute, self.hour, self.day, self.month, self.day_of_week
        )
    }
}

/// Wire shape of a schedule: field-name keys, textual values, omitted
/// fields meaning `*`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawSchedule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    minute: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    hour: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    day: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    month: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    day_of_week: Option<String>,
}

impl TryFrom<RawSchedule> for Schedule {
    type Error = ScheduleError;

    fn try_from(raw: RawSchedule) -> Result<Self, Self::Error> {
        fn field(kind: FieldKind, text: Option<&str>) -> Result<CronField, ScheduleError> {
            match text {
                Some(t) => parse_field(kind, t),
                None => Ok(CronField::Any),
            }
        }
        Ok(Self {
            minute: field(FieldKind::Minute, raw.minute.as_deref())?,
            hour: field(FieldKind::Hour, raw.hour.as_deref())?,
            day: field(FieldKind::Day, raw.day.as_deref())?,
            month: field(FieldKind::Month, raw.month.as_deref())?,
            day_of_week: field(FieldKind::DayOfWeek, raw.day_of_week.as_deref())?,
        })
    }
}

impl From<Schedule> for RawSchedule {
    fn from(schedule: Schedule) -> Self {
        fn text(field: CronField) -> Option<String> {
            if field.is_any() {
                None
            } else {
                Some(field.to_string())
            }
        }
        Self {
            minute: text(schedule.minute),
            hour: text(schedule.hour),
            day: text(schedule.day),
            month: text(schedule.month),
            day_of_week: text(schedule.day_of_week),
        }
    }
}

#[cfg(test)]
#[path = "schedule_tests.rs"]
mod tests;
