//! Wagetime: money mention scanner + time-to-earn annotator
//!
//! A Rust/WASM engine that finds prices in a live document and decorates
//! each one with how long it takes to earn at the user's hourly wage.
//!
//! # Architecture
//!
//! ## Scanner Components
//! - `lexer.rs` - AmountLexer: symbol / number-code / code-number money mentions
//! - `duration.rs` - Time formatter: work-time units, at most three, truncated
//! - `annotate.rs` - Annotation builder: text + matches -> fragment
//! - `mutator.rs` - Tree mutator: one fragment, one host operation
//! - `structured.rs` - Composite prices split across sibling elements
//! - `scheduler.rs` - ScanScheduler: one full, marker-pruned pass
//! - `change.rs` - QuietTextCache: skip text known to hold no money
//! - `debounce.rs` - Trailing-edge debounce over host timestamps
//! - `conductor.rs` - ScanConductor: settings gate, hot reload, JS bindings
//!
//! ## Document Tree
//! - `tree/mod.rs` - `DocumentTree` capability, markers, errors
//! - `tree/memory.rs` - Arena-backed tree for embedding and tests
//! - `tree/dom.rs` - Browser DOM (wasm32 only)
//!
//! # Usage (WASM)
//! ```javascript,ignore
//! import init, { MoneyWatcher, ScanConductor } from 'wagetime';
//!
//! await init();
//!
//! // Live page: waits for settings, scans, then follows mutations
//! const watcher = await MoneyWatcher.start(document.body, loadSettings());
//! watcher.updateSettings({ hourlyRate: 30, displayMode: 'tooltip' });
//!
//! // Text only
//! const conductor = new ScanConductor();
//! conductor.setSettings({ hourlyRate: 15 });
//! conductor.formatAmount(1000);          // "1w3d2h"
//! conductor.annotateText("Pay $5 now");  // { segments: [...] }
//! ```

pub mod scanner;
pub mod settings;
pub mod tree;
#[cfg(target_arch = "wasm32")]
pub mod watcher;

// Public exports
pub use scanner::*;
pub use settings::*;
pub use tree::{DocumentTree, Marker, MemoryTree, Mutation, MutationKind, NodeId, TreeError};
#[cfg(target_arch = "wasm32")]
pub use watcher::MoneyWatcher;

use wasm_bindgen::prelude::*;

// When the `wee_alloc` feature is enabled, use `wee_alloc` as the global
// allocator for smaller WASM bundle size.
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Get version information
#[wasm_bindgen]
pub fn version() -> String {
    format!("wagetime v{}", env!("CARGO_PKG_VERSION"))
}
