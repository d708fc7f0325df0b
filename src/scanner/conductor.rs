//! ScanConductor: settings-gated coordinator for the scan engine
//!
//! # Design Principles
//! 1. State machine: AwaitingSettings → Ready
//! 2. Settings are swapped wholesale between passes, never during one
//! 3. Host failures end the current pass, never the engine
//!
//! # Usage
//! ```rust,ignore
//! let mut conductor = ScanConductor::new();
//! conductor.load_settings(Settings::from_store(&store));
//! conductor.scan(&mut tree, &root);                 // initial pass
//!
//! // on every batch of mutation notifications
//! conductor.notify_mutations(records.len(), now);
//! // when the host timer fires
//! conductor.poll(&mut tree, &root, now);
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};
use wasm_bindgen::prelude::*;

use crate::scanner::annotate::build_fragment;
use crate::scanner::debounce::Debouncer;
use crate::scanner::duration::format_duration;
use crate::scanner::lexer::find_amounts;
use crate::scanner::scheduler::{ScanReport, ScanScheduler};
use crate::settings::{EngineConfig, Income, IncomePeriod, Settings};
use crate::tree::DocumentTree;

// =============================================================================
// State Machine
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Settings not loaded yet; scans are deferred
    AwaitingSettings,
    /// Settings loaded, scans run
    Ready,
}

/// Result of asking the conductor to scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum ScanOutcome {
    /// Settings are not available yet
    Deferred,
    Completed(ScanReport),
    /// Host tree failed mid-pass; the next notification retries
    Abandoned { reason: String },
}

impl ScanOutcome {
    pub fn report(&self) -> Option<&ScanReport> {
        match self {
            ScanOutcome::Completed(report) => Some(report),
            _ => None,
        }
    }
}

// =============================================================================
// ScanConductor
// =============================================================================

/// Single coordinator for scanning one document.
///
/// Owns the current settings, the scheduler and the rescan debounce.
/// The host owns the tree and the clock.
#[wasm_bindgen]
pub struct ScanConductor {
    settings: Settings,
    state: State,
    scheduler: ScanScheduler,
    debouncer: Debouncer,
    last_report: Option<ScanReport>,
    abandoned: u64,
    /// Annotations from older settings still need reverting before a pass
    refresh_pending: bool,
}

impl Default for ScanConductor {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanConductor {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            settings: Settings::default(),
            state: State::AwaitingSettings,
            scheduler: ScanScheduler::new(config.quiet_cache_capacity),
            debouncer: Debouncer::new(config.debounce_ms),
            last_report: None,
            abandoned: 0,
            refresh_pending: false,
        }
    }

    /// Install the first settings snapshot. Marks conductor as Ready.
    pub fn load_settings(&mut self, settings: Settings) {
        self.settings = settings;
        self.state = State::Ready;
    }

    /// Hot reload: swap settings, revert every existing annotation under
    /// `root`, then rescan so the page reflects the new wage and mode.
    ///
    /// If reverting fails the pass is abandoned and every later `scan`,
    /// `poll` or `flush` retries the revert before scanning.
    pub fn replace_settings<T: DocumentTree>(
        &mut self,
        tree: &mut T,
        root: &T::Node,
        settings: Settings,
    ) -> ScanOutcome {
        self.load_settings(settings);
        // The refresh pass below covers anything a pending rescan would
        self.debouncer.cancel();
        self.refresh_pending = true;
        self.scan(tree, root)
    }

    /// A settings reload is still waiting for its annotations to be reverted
    pub fn refresh_pending(&self) -> bool {
        self.refresh_pending
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn is_ready(&self) -> bool {
        self.state == State::Ready
    }

    /// Current state name (for debugging)
    pub fn state_name(&self) -> &'static str {
        match self.state {
            State::AwaitingSettings => "awaitingSettings",
            State::Ready => "ready",
        }
    }

    /// Full pass over `root` now. Deferred until settings are loaded.
    pub fn scan<T: DocumentTree>(&mut self, tree: &mut T, root: &T::Node) -> ScanOutcome {
        if self.state != State::Ready {
            return ScanOutcome::Deferred;
        }
        if self.refresh_pending {
            match tree.clear_annotations(root) {
                Ok(reverted) => {
                    debug!(reverted, "annotations cleared for settings reload");
                    self.refresh_pending = false;
                }
                Err(e) => return self.abandon(e.to_string()),
            }
        }
        match self.scheduler.scan(tree, root, &self.settings) {
            Ok(report) => {
                self.last_report = Some(report.clone());
                ScanOutcome::Completed(report)
            }
            Err(e) => self.abandon(e.to_string()),
        }
    }

    /// Record `count` mutation notifications observed at `now` (ms).
    /// Returns the deadline the host should arm its timer for.
    pub fn notify_mutations(&mut self, count: usize, now: f64) -> Option<f64> {
        if count == 0 || self.state != State::Ready {
            return None;
        }
        Some(self.debouncer.notify(now))
    }

    pub fn rescan_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    pub fn rescan_deadline(&self) -> Option<f64> {
        self.debouncer.deadline()
    }

    /// Run the debounced rescan if its window has elapsed at `now`
    pub fn poll<T: DocumentTree>(&mut self, tree: &mut T, root: &T::Node, now: f64) -> Option<ScanOutcome> {
        if self.debouncer.take_due(now) {
            Some(self.scan(tree, root))
        } else {
            None
        }
    }

    /// Run a pending rescan immediately (the host timer fired)
    pub fn flush<T: DocumentTree>(&mut self, tree: &mut T, root: &T::Node) -> Option<ScanOutcome> {
        if self.debouncer.take_pending() {
            Some(self.scan(tree, root))
        } else {
            None
        }
    }

    /// Cancel any pending rescan
    pub fn stop(&mut self) {
        self.debouncer.cancel();
    }

    pub fn last_report(&self) -> Option<&ScanReport> {
        self.last_report.as_ref()
    }

    /// Passes abandoned because of host failures
    pub fn abandoned_count(&self) -> u64 {
        self.abandoned
    }

    /// Rescans actually fired by the debounce
    pub fn debounced_scans(&self) -> u64 {
        self.debouncer.stats().fired
    }

    fn abandon(&mut self, reason: String) -> ScanOutcome {
        self.abandoned += 1;
        warn!(%reason, "scan pass abandoned");
        ScanOutcome::Abandoned { reason }
    }
}

// =============================================================================
// WASM Bindings
// =============================================================================

#[wasm_bindgen]
impl ScanConductor {
    /// Create new conductor (JS binding)
    #[wasm_bindgen(constructor)]
    pub fn js_new() -> Self {
        Self::new()
    }

    /// Create with engine tunables `{ debounce_ms, quiet_cache_capacity }`
    #[wasm_bindgen(js_name = "withConfig")]
    pub fn js_with_config(config: JsValue) -> Result<ScanConductor, JsValue> {
        let config: EngineConfig = serde_wasm_bindgen::from_value(config)
            .map_err(|e| JsValue::from_str(&format!("Failed to parse config: {}", e)))?;
        Ok(Self::with_config(config))
    }

    /// Load settings from a config-store snapshot object (JS binding)
    /// Expects { hourlyRate, hoursPerDay, daysPerWeek, displayMode, currencySymbol }
    #[wasm_bindgen(js_name = "setSettings")]
    pub fn js_set_settings(&mut self, store: JsValue) -> Result<(), JsValue> {
        let store: Map<String, Value> = serde_wasm_bindgen::from_value(store)
            .map_err(|e| JsValue::from_str(&format!("Failed to parse settings: {}", e)))?;
        self.load_settings(Settings::from_store(&store));
        Ok(())
    }

    /// Current settings as a plain object (JS binding)
    #[wasm_bindgen(js_name = "getSettings")]
    pub fn js_get_settings(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.settings)
            .map_err(|e| JsValue::from_str(&format!("Failed to serialize settings: {}", e)))
    }

    /// Build the annotated fragment for a text run (JS binding)
    /// Returns { segments: [{ kind, ... }] }
    #[wasm_bindgen(js_name = "annotateText")]
    pub fn js_annotate_text(&self, text: &str) -> Result<JsValue, JsValue> {
        let fragment = build_fragment(text, &find_amounts(text), &self.settings);
        serde_wasm_bindgen::to_value(&fragment)
            .map_err(|e| JsValue::from_str(&format!("Failed to serialize fragment: {}", e)))
    }

    /// Time-to-earn string for an amount, or undefined (JS binding)
    #[wasm_bindgen(js_name = "formatAmount")]
    pub fn js_format_amount(&self, amount: f64) -> Option<String> {
        format_duration(amount, &self.settings.schedule)
    }

    /// Money mentions in a text run (JS binding)
    #[wasm_bindgen(js_name = "findAmounts")]
    pub fn js_find_amounts(&self, text: &str) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&find_amounts(text))
            .map_err(|e| JsValue::from_str(&format!("Failed to serialize matches: {}", e)))
    }

    /// Convert an income figure to an hourly rate (JS binding)
    #[wasm_bindgen(js_name = "hourlyRateFromIncome")]
    pub fn js_hourly_rate_from_income(
        amount: f64,
        period: &str,
        hours_per_day: f64,
        days_per_week: f64,
    ) -> Result<Option<f64>, JsValue> {
        let period: IncomePeriod = period.parse().map_err(|e: String| JsValue::from_str(&e))?;
        Ok(Income::new(amount, period).hourly_rate(hours_per_day, days_per_week))
    }

    /// Statistics of the last completed pass (JS binding)
    #[wasm_bindgen(js_name = "lastReport")]
    pub fn js_last_report(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.last_report)
            .map_err(|e| JsValue::from_str(&format!("Failed to serialize report: {}", e)))
    }

    /// Check if ready (JS binding)
    #[wasm_bindgen(js_name = "isReady")]
    pub fn js_is_ready(&self) -> bool {
        self.is_ready()
    }

    /// Get state name (JS binding)
    #[wasm_bindgen(js_name = "stateName")]
    pub fn js_state_name(&self) -> String {
        self.state_name().to_string()
    }
}

// =============================================================================
// Tests
// =============================================================================
