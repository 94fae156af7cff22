//! `wareflow-ledger` — the append-safe stock ledger.
//!
//! Every unit of inventory in the warehouse is a row keyed by
//! `(location, product, batch)`. Rows never go negative, adjustments are
//! atomic under a per-row lock, and the two-row transfer used by every
//! movement task either applies fully or not at all.

pub mod ledger;

pub use ledger::{StockKey, StockLedger, StockSnapshot, TransferOutcome};
