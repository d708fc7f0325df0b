//! Settings: wage basis, display mode and engine tunables
//!
//! Settings arrive from an external key-value store as loosely typed JSON.
//! Every key is read leniently: a missing or invalid value falls back to its
//! documented default and never prevents startup.
//!
//! # Store keys
//! - `hourlyRate` - wage per hour (default 15)
//! - `hoursPerDay` / `daysPerWeek` - work-time basis (default 8 / 5)
//! - `hoursPerWeek` / `weeklyHours` - legacy; used when `hoursPerDay` is absent
//! - `displayMode` - `inline` | `tooltip` | `replace` (default `inline`)
//! - `currencySymbol` - display only (default `£`)

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Constants
// =============================================================================

pub const DEFAULT_HOURLY_RATE: f64 = 15.0;
pub const DEFAULT_HOURS_PER_DAY: f64 = 8.0;
pub const DEFAULT_DAYS_PER_WEEK: f64 = 5.0;
pub const DEFAULT_CURRENCY_SYMBOL: &str = "£";

/// Work weeks in a year. Months are a twelfth of this.
pub const WEEKS_PER_YEAR: f64 = 52.0;

/// Legacy store keys holding total weekly hours
const LEGACY_WEEKLY_KEYS: &[&str] = &["hoursPerWeek", "weeklyHours"];

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

// =============================================================================
// WorkSchedule
// =============================================================================

/// Wage and work-time basis used to turn money into working time.
///
/// All three fields are strictly positive. Construction with any invalid field
/// yields the default schedule as a whole, never a partially corrected one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "ScheduleFields", into = "ScheduleFields")]
pub struct WorkSchedule {
    hourly_rate: f64,
    hours_per_day: f64,
    days_per_week: f64,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleFields {
    #[serde(default = "default_rate")]
    hourly_rate: f64,
    #[serde(default = "default_hours")]
    hours_per_day: f64,
    #[serde(default = "default_days")]
    days_per_week: f64,
}

fn default_rate() -> f64 { DEFAULT_HOURLY_RATE }
fn default_hours() -> f64 { DEFAULT_HOURS_PER_DAY }
fn default_days() -> f64 { DEFAULT_DAYS_PER_WEEK }

impl From<ScheduleFields> for WorkSchedule {
    fn from(f: ScheduleFields) -> Self {
        WorkSchedule::new(f.hourly_rate, f.hours_per_day, f.days_per_week)
    }
}

impl From<WorkSchedule> for ScheduleFields {
    fn from(s: WorkSchedule) -> Self {
        ScheduleFields {
            hourly_rate: s.hourly_rate,
            hours_per_day: s.hours_per_day,
            days_per_week: s.days_per_week,
        }
    }
}

impl Default for WorkSchedule {
    fn default() -> Self {
        Self {
            hourly_rate: DEFAULT_HOURLY_RATE,
            hours_per_day: DEFAULT_HOURS_PER_DAY,
            days_per_week: DEFAULT_DAYS_PER_WEEK,
        }
    }
}

impl WorkSchedule {
    /// Build a schedule, falling back to defaults if any input is invalid.
    pub fn new(hourly_rate: f64, hours_per_day: f64, days_per_week: f64) -> Self {
        if is_positive(hourly_rate) && is_positive(hours_per_day) && is_positive(days_per_week) {
            Self { hourly_rate, hours_per_day, days_per_week }
        } else {
            tracing::debug!(
                hourly_rate,
                hours_per_day,
                days_per_week,
                "invalid work schedule, using defaults"
            );
            Self::default()
        }
    }

    pub fn hourly_rate(&self) -> f64 {
        self.hourly_rate
    }

    pub fn hours_per_day(&self) -> f64 {
        self.hours_per_day
    }

    pub fn days_per_week(&self) -> f64 {
        self.days_per_week
    }

    pub fn minutes_per_day(&self) -> f64 {
        self.hours_per_day * 60.0
    }

    pub fn minutes_per_week(&self) -> f64 {
        self.minutes_per_day() * self.days_per_week
    }

    pub fn minutes_per_month(&self) -> f64 {
        self.minutes_per_week() * WEEKS_PER_YEAR / 12.0
    }

    pub fn minutes_per_year(&self) -> f64 {
        self.minutes_per_week() * WEEKS_PER_YEAR
    }
}

// =============================================================================
// DisplayMode
// =============================================================================

/// How a formatted duration is attached to the matched text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    /// `$5 (20min)`
    #[default]
    Inline,
    /// Original text unchanged, duration as hover label
    Tooltip,
    /// Original text replaced by the duration
    Replace,
}

impl DisplayMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayMode::Inline => "inline",
            DisplayMode::Tooltip => "tooltip",
            DisplayMode::Replace => "replace",
        }
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DisplayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inline" => Ok(DisplayMode::Inline),
            "tooltip" => Ok(DisplayMode::Tooltip),
            "replace" => Ok(DisplayMode::Replace),
            other => Err(format!("unknown display mode: {}", other)),
        }
    }
}

// =============================================================================
// Settings
// =============================================================================

/// Process-wide current settings. Replaced wholesale, never merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(flatten)]
    pub schedule: WorkSchedule,
    #[serde(default)]
    pub display_mode: DisplayMode,
    #[serde(default = "default_symbol")]
    pub currency_symbol: String,
}

fn default_symbol() -> String {
    DEFAULT_CURRENCY_SYMBOL.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schedule: WorkSchedule::default(),
            display_mode: DisplayMode::default(),
            currency_symbol: default_symbol(),
        }
    }
}

impl Settings {
    /// Read settings from a config-store snapshot.
    ///
    /// Each key falls back independently; the resulting schedule is then
    /// validated as a whole by [`WorkSchedule::new`].
    pub fn from_store(store: &Map<String, Value>) -> Self {
        let days_per_week = positive_number(store, "daysPerWeek");
        let hours_per_day = positive_number(store, "hoursPerDay").or_else(|| {
            LEGACY_WEEKLY_KEYS
                .iter()
                .find_map(|key| positive_number(store, key))
                .map(|weekly| weekly / days_per_week.unwrap_or(DEFAULT_DAYS_PER_WEEK))
        });

        let schedule = WorkSchedule::new(
            positive_number(store, "hourlyRate").unwrap_or(DEFAULT_HOURLY_RATE),
            hours_per_day.unwrap_or(DEFAULT_HOURS_PER_DAY),
            days_per_week.unwrap_or(DEFAULT_DAYS_PER_WEEK),
        );

        let display_mode = match store.get("displayMode").and_then(Value::as_str) {
            Some(raw) => raw.parse().unwrap_or_else(|e: String| {
                tracing::debug!(error = %e, "falling back to inline display");
                DisplayMode::default()
            }),
            None => DisplayMode::default(),
        };

        let currency_symbol = store
            .get("currencySymbol")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(default_symbol);

        Self { schedule, display_mode, currency_symbol }
    }

    /// Parse a store snapshot given as JSON text. Anything that is not a JSON
    /// object yields the defaults.
    pub fn from_json(json: &str) -> Self {
        match serde_json::from_str::<Value>(json) {
            Ok(Value::Object(map)) => Self::from_store(&map),
            _ => Self::default(),
        }
    }
}

/// Numbers may be stored as JSON numbers or numeric strings.
fn positive_number(store: &Map<String, Value>, key: &str) -> Option<f64> {
    let value = match store.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    is_positive(value).then_some(value)
}

// =============================================================================
// Income conversion (settings surface helper)
// =============================================================================

/// Period an income figure is quoted in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncomePeriod {
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl FromStr for IncomePeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hourly" | "hour" => Ok(IncomePeriod::Hourly),
            "daily" | "day" => Ok(IncomePeriod::Daily),
            "weekly" | "week" => Ok(IncomePeriod::Weekly),
            "monthly" | "month" => Ok(IncomePeriod::Monthly),
            "yearly" | "year" | "annual" => Ok(IncomePeriod::Yearly),
            other => Err(format!("unknown income period: {}", other)),
        }
    }
}

/// Income as entered by the user, before conversion to an hourly rate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Income {
    pub amount: f64,
    pub period: IncomePeriod,
}

impl Income {
    pub fn new(amount: f64, period: IncomePeriod) -> Self {
        Self { amount, period }
    }

    /// Effective hourly rate for the given schedule.
    ///
    /// Monthly and yearly figures use a 52-week year. Returns `None` when the
    /// inputs cannot produce a positive finite rate.
    pub fn hourly_rate(&self, hours_per_day: f64, days_per_week: f64) -> Option<f64> {
        if !is_positive(self.amount) || !is_positive(hours_per_day) || !is_positive(days_per_week) {
            return None;
        }
        let hours_per_week = hours_per_day * days_per_week;
        let rate = match self.period {
            IncomePeriod::Hourly => self.amount,
            IncomePeriod::Daily => self.amount / hours_per_day,
            IncomePeriod::Weekly => self.amount / hours_per_week,
            IncomePeriod::Monthly => self.amount * 12.0 / WEEKS_PER_YEAR / hours_per_week,
            IncomePeriod::Yearly => self.amount / WEEKS_PER_YEAR / hours_per_week,
        };
        is_positive(rate).then_some(rate)
    }
}

// =============================================================================
// Engine tunables
// =============================================================================

/// Tunables for the scan engine itself (not user-facing)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Quiescence window before a rescan fires, in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: f64,
    /// Maximum remembered money-free text hashes before the cache is cleared
    #[serde(default = "default_quiet_capacity")]
    pub quiet_cache_capacity: usize,
}

fn default_debounce_ms() -> f64 { 250.0 }
fn default_quiet_capacity() -> usize { 4096 }

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            quiet_cache_capacity: default_quiet_capacity(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_schedule_derivations() {
        let s = WorkSchedule::default();
        assert_eq!(s.minutes_per_day(), 480.0);
        assert_eq!(s.minutes_per_week(), 2400.0);
        assert_eq!(s.minutes_per_month(), 10400.0);
        assert_eq!(s.minutes_per_year(), 124800.0);
    }

    #[test]
    fn test_invalid_schedule_falls_back_wholesale() {
        let s = WorkSchedule::new(40.0, 0.0, 4.0);
        assert_eq!(s, WorkSchedule::default());

        let s = WorkSchedule::new(f64::NAN, 7.5, 4.0);
        assert_eq!(s.hours_per_day(), DEFAULT_HOURS_PER_DAY);
        assert_eq!(s.hourly_rate(), DEFAULT_HOURLY_RATE);
    }

    #[test]
    fn test_empty_store_gives_defaults() {
        let settings = Settings::from_store(&Map::new());
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.currency_symbol, "£");
        assert_eq!(settings.display_mode, DisplayMode::Inline);
    }

    #[test]
    fn test_store_reads_all_keys() {
        let settings = Settings::from_store(&store(json!({
            "hourlyRate": 30,
            "hoursPerDay": "7.5",
            "daysPerWeek": 4,
            "displayMode": "Tooltip",
            "currencySymbol": "$",
        })));
        assert_eq!(settings.schedule.hourly_rate(), 30.0);
        assert_eq!(settings.schedule.hours_per_day(), 7.5);
        assert_eq!(settings.schedule.days_per_week(), 4.0);
        assert_eq!(settings.display_mode, DisplayMode::Tooltip);
        assert_eq!(settings.currency_symbol, "$");
    }

    #[test]
    fn test_invalid_keys_fall_back_individually() {
        let settings = Settings::from_store(&store(json!({
            "hourlyRate": -3,
            "hoursPerDay": "lots",
            "daysPerWeek": 6,
            "displayMode": "sideways",
            "currencySymbol": "  ",
        })));
        assert_eq!(settings.schedule.hourly_rate(), DEFAULT_HOURLY_RATE);
        assert_eq!(settings.schedule.hours_per_day(), DEFAULT_HOURS_PER_DAY);
        assert_eq!(settings.schedule.days_per_week(), 6.0);
        assert_eq!(settings.display_mode, DisplayMode::Inline);
        assert_eq!(settings.currency_symbol, DEFAULT_CURRENCY_SYMBOL);
    }

    #[test]
    fn test_legacy_weekly_hours() {
        let settings = Settings::from_store(&store(json!({
            "weeklyHours": 36,
            "daysPerWeek": 4,
        })));
        assert_eq!(settings.schedule.hours_per_day(), 9.0);

        // hoursPerDay wins over the legacy key
        let settings = Settings::from_store(&store(json!({
            "hoursPerDay": 6,
            "hoursPerWeek": 40,
        })));
        assert_eq!(settings.schedule.hours_per_day(), 6.0);
    }

    #[test]
    fn test_from_json_non_object() {
        assert_eq!(Settings::from_json("[1, 2]"), Settings::default());
        assert_eq!(Settings::from_json("not json"), Settings::default());
    }

    #[test]
    fn test_settings_serde_round_trip_camel_case() {
        let settings = Settings {
            schedule: WorkSchedule::new(20.0, 8.0, 5.0),
            display_mode: DisplayMode::Replace,
            currency_symbol: "€".into(),
        };
        let value = serde_json::to_value(&settings).unwrap();
        assert_eq!(value["hourlyRate"], json!(20.0));
        assert_eq!(value["displayMode"], json!("replace"));

        let back: Settings = serde_json::from_value(value).unwrap();
        assert_eq!(back, settings);
    }

    #[test]
    fn test_income_conversion() {
        let hpd = 8.0;
        let dpw = 5.0;
        assert_eq!(Income::new(15.0, IncomePeriod::Hourly).hourly_rate(hpd, dpw), Some(15.0));
        assert_eq!(Income::new(120.0, IncomePeriod::Daily).hourly_rate(hpd, dpw), Some(15.0));
        assert_eq!(Income::new(600.0, IncomePeriod::Weekly).hourly_rate(hpd, dpw), Some(15.0));
        assert_eq!(Income::new(31200.0, IncomePeriod::Yearly).hourly_rate(hpd, dpw), Some(15.0));
        assert_eq!(Income::new(2600.0, IncomePeriod::Monthly).hourly_rate(hpd, dpw), Some(15.0));
        assert_eq!(Income::new(0.0, IncomePeriod::Hourly).hourly_rate(hpd, dpw), None);
        assert_eq!(Income::new(10.0, IncomePeriod::Daily).hourly_rate(0.0, dpw), None);
    }

    #[test]
    fn test_engine_config_defaults() {
        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.debounce_ms, 250.0);
        assert_eq!(config.quiet_cache_capacity, 4096);
    }
}
