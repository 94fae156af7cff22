use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use wareflow_core::{DomainError, DomainResult, Entity, ProductId};

/// Batch number for tracking a specific production batch of a product.
///
/// Part of the stock-ledger row key; two batches of the same product at the
/// same location are separate rows (they may carry different expiry dates).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchNumber(String);

impl BatchNumber {
    pub fn new(batch: impl Into<String>) -> DomainResult<Self> {
        let batch = batch.into();
        if batch.trim().is_empty() {
            return Err(DomainError::validation("batch number cannot be empty"));
        }
        Ok(Self(batch))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for BatchNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Priority attached to replenishment work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskPriority(pub u8);

impl TaskPriority {
    pub const URGENT: TaskPriority = TaskPriority(100);
    pub const ROUTINE: TaskPriority = TaskPriority(10);
}

/// A product as the warehouse knows it: one catalog entry per received batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    id: ProductId,
    sku: String,
    name: String,
    batch_number: BatchNumber,
    storage_temperature: String,
    date_received: NaiveDate,
    expiration_date: NaiveDate,
    /// Units per full pallet; order completion sources whole pallets.
    pallet_size: u32,
    is_high_demand: bool,
}

impl Product {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: ProductId,
        sku: impl Into<String>,
        name: impl Into<String>,
        batch_number: BatchNumber,
        storage_temperature: impl Into<String>,
        date_received: NaiveDate,
        expiration_date: NaiveDate,
        pallet_size: u32,
        is_high_demand: bool,
    ) -> DomainResult<Self> {
        let sku = sku.into();
        let name = name.into();
        if sku.trim().is_empty() {
            return Err(DomainError::validation("sku cannot be empty"));
        }
        if name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if pallet_size == 0 {
            return Err(DomainError::validation("pallet_size must be positive"));
        }
        Ok(Self {
            id,
            sku,
            name,
            batch_number,
            storage_temperature: storage_temperature.into(),
            date_received,
            expiration_date,
            pallet_size,
            is_high_demand,
        })
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn batch_number(&self) -> &BatchNumber {
        &self.batch_number
    }

    pub fn storage_temperature(&self) -> &str {
        &self.storage_temperature
    }

    pub fn date_received(&self) -> NaiveDate {
        self.date_received
    }

    pub fn expiration_date(&self) -> NaiveDate {
        self.expiration_date
    }

    pub fn pallet_size(&self) -> u32 {
        self.pallet_size
    }

    pub fn is_high_demand(&self) -> bool {
        self.is_high_demand
    }

    /// Whether this batch is expired relative to `as_of`.
    pub fn is_expired(&self, as_of: NaiveDate) -> bool {
        self.expiration_date < as_of
    }

    /// Priority for replenishment work moving this product.
    ///
    /// Large movements and high-demand products jump the queue.
    pub fn replenishment_priority(&self, quantity: u32) -> TaskPriority {
        if quantity > 100 || self.is_high_demand {
            TaskPriority::URGENT
        } else {
            TaskPriority::ROUTINE
        }
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_product(pallet_size: u32, high_demand: bool) -> Product {
        Product::new(
            ProductId::new(),
            "SKU-001",
            "Tinned Tomatoes",
            BatchNumber::new("B-2026-01").unwrap(),
            "ambient",
            NaiveDate::from_ymd_opt(2026, 1, 10).unwrap(),
            NaiveDate::from_ymd_opt(2027, 1, 10).unwrap(),
            pallet_size,
            high_demand,
        )
        .unwrap()
    }

    #[test]
    fn rejects_blank_sku_and_zero_pallet() {
        let batch = BatchNumber::new("B1").unwrap();
        let date = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        assert!(
            Product::new(
                ProductId::new(),
                " ",
                "x",
                batch.clone(),
                "ambient",
                date,
                date,
                10,
                false
            )
            .is_err()
        );
        assert!(
            Product::new(
                ProductId::new(),
                "SKU",
                "x",
                batch,
                "ambient",
                date,
                date,
                0,
                false
            )
            .is_err()
        );
    }

    #[test]
    fn expiry_is_strictly_before_as_of() {
        let p = test_product(10, false);
        assert!(!p.is_expired(p.expiration_date()));
        assert!(p.is_expired(p.expiration_date() + chrono::Days::new(1)));
    }

    #[test]
    fn priority_rule_matches_quantity_and_demand() {
        let routine = test_product(10, false);
        assert_eq!(routine.replenishment_priority(50), TaskPriority::ROUTINE);
        assert_eq!(routine.replenishment_priority(101), TaskPriority::URGENT);

        let hot = test_product(10, true);
        assert_eq!(hot.replenishment_priority(1), TaskPriority::URGENT);
    }

    #[test]
    fn batch_number_cannot_be_blank() {
        assert!(BatchNumber::new("  ").is_err());
    }
}
