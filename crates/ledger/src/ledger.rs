use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use wareflow_core::{DomainError, DomainResult, LocationCode, ProductId};
use wareflow_products::BatchNumber;

/// Unique key of a ledger row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StockKey {
    pub location: LocationCode,
    pub product: ProductId,
    pub batch: BatchNumber,
}

impl StockKey {
    pub fn new(location: LocationCode, product: ProductId, batch: BatchNumber) -> Self {
        Self {
            location,
            product,
            batch,
        }
    }
}

impl core::fmt::Display for StockKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}/{}/{}", self.location, self.product, self.batch)
    }
}

#[derive(Debug)]
struct StockRow {
    quantity: u32,
    expiration_date: Option<NaiveDate>,
    last_updated: DateTime<Utc>,
}

/// Point-in-time copy of a ledger row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockSnapshot {
    pub key: StockKey,
    pub quantity: u32,
    pub expiration_date: Option<NaiveDate>,
    pub last_updated: DateTime<Utc>,
}

/// Post-transfer quantities on both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferOutcome {
    pub source_quantity: u32,
    pub destination_quantity: u32,
}

/// Quantity-per-(location, product, batch) ledger.
///
/// Each row sits behind its own mutex: operations on disjoint keys never
/// block each other, operations on the same key serialize, and the outer map
/// lock is held only long enough to look up or create a row entry. Rows are
/// never removed, so a held `Arc<Mutex<_>>` can never dangle.
#[derive(Debug, Default)]
pub struct StockLedger {
    rows: RwLock<HashMap<StockKey, Arc<Mutex<StockRow>>>>,
}

impl StockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn row(&self, key: &StockKey) -> Option<Arc<Mutex<StockRow>>> {
        let map = self.rows.read().expect("stock ledger poisoned");
        map.get(key).cloned()
    }

    fn row_or_create(&self, key: &StockKey) -> Arc<Mutex<StockRow>> {
        if let Some(row) = self.row(key) {
            return row;
        }
        let mut map = self.rows.write().expect("stock ledger poisoned");
        map.entry(key.clone())
            .or_insert_with(|| {
                Arc::new(Mutex::new(StockRow {
                    quantity: 0,
                    expiration_date: None,
                    last_updated: Utc::now(),
                }))
            })
            .clone()
    }

    fn apply_delta(
        key: &StockKey,
        guard: &mut MutexGuard<'_, StockRow>,
        delta: i64,
    ) -> DomainResult<u32> {
        let next = i64::from(guard.quantity) + delta;
        if next < 0 {
            return Err(DomainError::insufficient_stock(format!(
                "row {key} holds {}, delta {delta} would go negative",
                guard.quantity
            )));
        }
        guard.quantity = u32::try_from(next).map_err(|_| {
            DomainError::invariant(format!(
                "row {key} holds {}, delta {delta} would overflow the row quantity",
                guard.quantity
            ))
        })?;
        guard.last_updated = Utc::now();
        Ok(guard.quantity)
    }

    /// Atomically adjust one row by `delta`, returning the new quantity.
    ///
    /// Zero delta succeeds idempotently without creating anything. A row is
    /// created on first positive arrival; decrementing a missing row is the
    /// same as decrementing zero.
    pub fn adjust(&self, key: &StockKey, delta: i64) -> DomainResult<u32> {
        if delta == 0 {
            return Ok(self.quantity(key));
        }
        if delta < 0 && self.row(key).is_none() {
            return Err(DomainError::insufficient_stock(format!(
                "row {key} does not exist, delta {delta} would go negative"
            )));
        }
        let row = self.row_or_create(key);
        let mut guard = row.lock().expect("stock row poisoned");
        let quantity = Self::apply_delta(key, &mut guard, delta)?;
        debug!(key = %key, delta, quantity, "ledger adjusted");
        Ok(quantity)
    }

    /// Record an arrival of stock, stamping the batch's expiry date.
    pub fn receive(
        &self,
        key: &StockKey,
        quantity: u32,
        expiration_date: Option<NaiveDate>,
    ) -> DomainResult<u32> {
        let row = self.row_or_create(key);
        let mut guard = row.lock().expect("stock row poisoned");
        let new_quantity = Self::apply_delta(key, &mut guard, i64::from(quantity))?;
        if expiration_date.is_some() {
            guard.expiration_date = expiration_date;
        }
        debug!(key = %key, quantity = new_quantity, "stock received");
        Ok(new_quantity)
    }

    /// Move `quantity` units between two locations as one atomic unit.
    ///
    /// Both rows are locked in deterministic key order, so concurrent
    /// transfers over the same pair cannot deadlock or lose updates. The
    /// destination row is created at 0 if absent. If the source cannot cover
    /// the quantity nothing is mutated and `InsufficientStock` is returned.
    pub fn transfer_atomic(
        &self,
        source: &LocationCode,
        destination: &LocationCode,
        product: ProductId,
        batch: &BatchNumber,
        quantity: u32,
    ) -> DomainResult<TransferOutcome> {
        if source == destination {
            return Err(DomainError::invariant(format!(
                "transfer source and destination are both {source}"
            )));
        }

        let src_key = StockKey::new(source.clone(), product, batch.clone());
        let dst_key = StockKey::new(destination.clone(), product, batch.clone());

        if quantity == 0 {
            // Idempotent no-op: both rows untouched.
            return Ok(TransferOutcome {
                source_quantity: self.quantity(&src_key),
                destination_quantity: self.quantity(&dst_key),
            });
        }

        let Some(src_row) = self.row(&src_key) else {
            return Err(DomainError::insufficient_stock(format!(
                "no stock row {src_key} to transfer from"
            )));
        };
        let dst_row = self.row_or_create(&dst_key);

        // Lock both rows in key order.
        let (mut src_guard, mut dst_guard) = if src_key < dst_key {
            let s = src_row.lock().expect("stock row poisoned");
            let d = dst_row.lock().expect("stock row poisoned");
            (s, d)
        } else {
            let d = dst_row.lock().expect("stock row poisoned");
            let s = src_row.lock().expect("stock row poisoned");
            (s, d)
        };

        if u64::from(src_guard.quantity) < u64::from(quantity) {
            return Err(DomainError::insufficient_stock(format!(
                "row {src_key} holds {}, cannot transfer {quantity}",
                src_guard.quantity
            )));
        }

        let source_quantity = Self::apply_delta(&src_key, &mut src_guard, -i64::from(quantity))?;
        let destination_quantity =
            Self::apply_delta(&dst_key, &mut dst_guard, i64::from(quantity))?;
        // Expiry travels with the batch.
        if dst_guard.expiration_date.is_none() {
            dst_guard.expiration_date = src_guard.expiration_date;
        }

        debug!(
            source = %src_key,
            destination = %dst_key,
            quantity,
            "stock transferred"
        );
        Ok(TransferOutcome {
            source_quantity,
            destination_quantity,
        })
    }

    /// Current quantity of one row (0 if the row does not exist).
    pub fn quantity(&self, key: &StockKey) -> u32 {
        match self.row(key) {
            Some(row) => row.lock().expect("stock row poisoned").quantity,
            None => 0,
        }
    }

    /// Total quantity of a product at a location, across batches.
    pub fn quantity_at(&self, location: &LocationCode, product: ProductId) -> u32 {
        let map = self.rows.read().expect("stock ledger poisoned");
        map.iter()
            .filter(|(key, _)| key.location == *location && key.product == product)
            .map(|(_, row)| row.lock().expect("stock row poisoned").quantity)
            .sum()
    }

    /// Snapshot of every row at a location with nonzero quantity.
    pub fn rows_at(&self, location: &LocationCode) -> Vec<StockSnapshot> {
        let mut rows = self.snapshot_where(|key| key.location == *location);
        rows.retain(|r| r.quantity > 0);
        rows.sort_by(|a, b| a.key.cmp(&b.key));
        rows
    }

    /// Rows whose expiry precedes `as_of`, ordered by expiry ascending.
    ///
    /// Each call produces a fresh, restartable sequence over a point-in-time
    /// snapshot; rows without an expiry date never qualify.
    pub fn expired_stock(&self, as_of: NaiveDate) -> impl Iterator<Item = StockSnapshot> {
        let mut rows = self.snapshot_where(|_| true);
        rows.retain(|r| r.quantity > 0 && r.expiration_date.is_some_and(|d| d < as_of));
        rows.sort_by(|a, b| {
            a.expiration_date
                .cmp(&b.expiration_date)
                .then_with(|| a.key.cmp(&b.key))
        });
        rows.into_iter()
    }

    /// Find the location holding the most of `product`, among locations
    /// accepted by `filter`, with at least `min_quantity` units in total.
    ///
    /// Tie-break: descending total quantity, then ascending location code,
    /// so replenishment source selection is deterministic. Returns `None`
    /// (not an error) when nothing qualifies.
    pub fn find_location_with_stock(
        &self,
        product: ProductId,
        min_quantity: u32,
        filter: impl Fn(&LocationCode) -> bool,
    ) -> Option<(LocationCode, u32)> {
        let mut totals: HashMap<LocationCode, u32> = HashMap::new();
        {
            let map = self.rows.read().expect("stock ledger poisoned");
            for (key, row) in map.iter() {
                if key.product != product {
                    continue;
                }
                let quantity = row.lock().expect("stock row poisoned").quantity;
                if quantity == 0 {
                    continue;
                }
                *totals.entry(key.location.clone()).or_insert(0) += quantity;
            }
        }

        let mut candidates: Vec<(LocationCode, u32)> = totals
            .into_iter()
            .filter(|(code, total)| *total >= min_quantity.max(1) && filter(code))
            .collect();
        candidates.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        candidates.into_iter().next()
    }

    fn snapshot_where(&self, pred: impl Fn(&StockKey) -> bool) -> Vec<StockSnapshot> {
        let map = self.rows.read().expect("stock ledger poisoned");
        map.iter()
            .filter(|(key, _)| pred(key))
            .map(|(key, row)| {
                let guard = row.lock().expect("stock row poisoned");
                StockSnapshot {
                    key: key.clone(),
                    quantity: guard.quantity,
                    expiration_date: guard.expiration_date,
                    last_updated: guard.last_updated,
                }
            })
            .collect()
    }
}
