//! Time formatter: money -> ranked "time to earn" string
//!
//! Units are measured in working time, not calendar time: a "day" is one
//! working day of `hoursPerDay`, a "week" is `daysPerWeek` of those, and so on.
//!
//! The amount is converted to whole minutes of wages and decomposed greedily
//! from the largest unit down. At most three units are emitted; whatever is
//! left after the third unit is dropped, not rounded.

use serde::{Deserialize, Serialize};

use crate::settings::WorkSchedule;

/// Returned when the amount is worth less than one minute of wages
pub const BELOW_ONE_MINUTE: &str = "<1 min";

/// Maximum number of units in a formatted duration
pub const MAX_UNITS: usize = 3;

// =============================================================================
// DurationUnit
// =============================================================================

/// Work-time units, largest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    Century,
    Year,
    Month,
    Week,
    Day,
    Hour,
    Minute,
}

impl DurationUnit {
    /// Descending magnitude
    pub const ALL: [DurationUnit; 7] = [
        DurationUnit::Century,
        DurationUnit::Year,
        DurationUnit::Month,
        DurationUnit::Week,
        DurationUnit::Day,
        DurationUnit::Hour,
        DurationUnit::Minute,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            DurationUnit::Century => "c",
            DurationUnit::Year => "y",
            DurationUnit::Month => "mo",
            DurationUnit::Week => "w",
            DurationUnit::Day => "d",
            DurationUnit::Hour => "h",
            DurationUnit::Minute => "min",
        }
    }

    /// Working minutes in one of this unit
    pub fn minutes(&self, schedule: &WorkSchedule) -> f64 {
        match self {
            DurationUnit::Century => schedule.minutes_per_year() * 100.0,
            DurationUnit::Year => schedule.minutes_per_year(),
            DurationUnit::Month => schedule.minutes_per_month(),
            DurationUnit::Week => schedule.minutes_per_week(),
            DurationUnit::Day => schedule.minutes_per_day(),
            DurationUnit::Hour => 60.0,
            DurationUnit::Minute => 1.0,
        }
    }
}

/// One emitted `{count}{label}` part
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DurationPart {
    pub unit: DurationUnit,
    pub count: u64,
}

// =============================================================================
// Formatting
// =============================================================================

/// Whole minutes of wages needed to earn `amount`.
///
/// `None` when amount or rate is non-positive or non-finite.
pub fn wage_minutes(amount: f64, schedule: &WorkSchedule) -> Option<f64> {
    let rate = schedule.hourly_rate();
    if !amount.is_finite() || amount <= 0.0 || !rate.is_finite() || rate <= 0.0 {
        return None;
    }
    let minutes = (amount * 60.0 / rate).floor();
    minutes.is_finite().then_some(minutes)
}

/// Greedy decomposition into at most [`MAX_UNITS`] parts.
///
/// Empty when the amount is below one minute of wages.
pub fn decompose(amount: f64, schedule: &WorkSchedule) -> Option<Vec<DurationPart>> {
    let mut remaining = wage_minutes(amount, schedule)?;
    let mut parts = Vec::with_capacity(MAX_UNITS);

    for unit in DurationUnit::ALL {
        if parts.len() >= MAX_UNITS {
            break;
        }
        let unit_minutes = unit.minutes(schedule);
        let count = (remaining / unit_minutes).floor();
        if count >= 1.0 {
            remaining -= count * unit_minutes;
            parts.push(DurationPart { unit, count: count as u64 });
        }
    }

    Some(parts)
}

/// Format `amount` as compact working time, e.g. `1w3d2h`.
pub fn format_duration(amount: f64, schedule: &WorkSchedule) -> Option<String> {
    let parts = decompose(amount, schedule)?;
    if parts.is_empty() {
        return Some(BELOW_ONE_MINUTE.to_string());
    }
    Some(
        parts
            .iter()
            .map(|p| format!("{}{}", p.count, p.unit.label()))
            .collect(),
    )
}

// =============================================================================
// Tests
// =============================================================================
