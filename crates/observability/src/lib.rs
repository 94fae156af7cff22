//! Shared tracing/logging setup.
//!
//! Every warehouse process calls [`init`] once at startup; the movement
//! engine and fulfillment services emit structured `tracing` events (task
//! lifecycle, ledger adjustments, replenishment decisions, dispatch
//! refusals) against whatever subscriber is installed here.

/// Tracing configuration (filters, output format).
pub mod tracing;

/// Initialize process-wide observability.
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}
