use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wareflow_core::{CustomerId, DomainError, DomainResult, Entity, OrderId, ProductId};

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Cancelled,
}

/// One line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub quantity: u32,
    /// Price in smallest currency unit (e.g., pence).
    pub unit_price: u64,
}

impl OrderItem {
    pub fn total_price(&self) -> u64 {
        u64::from(self.quantity) * self.unit_price
    }
}

/// A customer order aggregating items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    customer_id: CustomerId,
    order_date: DateTime<Utc>,
    status: OrderStatus,
    items: Vec<OrderItem>,
    is_paid: bool,
    payment_date: Option<DateTime<Utc>>,
}

impl Order {
    pub fn new(
        id: OrderId,
        customer_id: CustomerId,
        order_date: DateTime<Utc>,
        items: Vec<OrderItem>,
    ) -> DomainResult<Self> {
        if items.is_empty() {
            return Err(DomainError::validation("order must have at least one item"));
        }
        if items.iter().any(|i| i.quantity == 0) {
            return Err(DomainError::validation("item quantity must be positive"));
        }
        Ok(Self {
            id,
            customer_id,
            order_date,
            status: OrderStatus::Pending,
            items,
            is_paid: false,
            payment_date: None,
        })
    }

    pub fn id_typed(&self) -> OrderId {
        self.id
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn order_date(&self) -> DateTime<Utc> {
        self.order_date
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn is_paid(&self) -> bool {
        self.is_paid
    }

    pub fn total_amount(&self) -> u64 {
        self.items.iter().map(OrderItem::total_price).sum()
    }

    /// Whether completion may proceed from the current status.
    pub fn is_completable(&self) -> bool {
        matches!(self.status, OrderStatus::Pending | OrderStatus::Processing)
    }

    pub fn mark_processing(&mut self) -> DomainResult<()> {
        if self.status != OrderStatus::Pending {
            return Err(DomainError::invalid_transition(format!(
                "order {} is {:?}, cannot move to processing",
                self.id, self.status
            )));
        }
        self.status = OrderStatus::Processing;
        Ok(())
    }

    /// Completion marks the order shipped; callers must have checked
    /// [`is_completable`] and sourced every item first.
    pub fn mark_shipped(&mut self) -> DomainResult<()> {
        if !self.is_completable() {
            return Err(DomainError::invalid_transition(format!(
                "order {} is {:?}, cannot ship",
                self.id, self.status
            )));
        }
        self.status = OrderStatus::Shipped;
        Ok(())
    }

    pub fn cancel(&mut self) -> DomainResult<()> {
        if self.status == OrderStatus::Shipped {
            return Err(DomainError::invalid_transition(format!(
                "order {} already shipped, cannot cancel",
                self.id
            )));
        }
        self.status = OrderStatus::Cancelled;
        Ok(())
    }

    pub fn record_payment(&mut self, when: DateTime<Utc>) {
        self.is_paid = true;
        self.payment_date = Some(when);
    }

    /// Plain-text invoice rendering.
    pub fn generate_invoice(&self) -> String {
        let mut lines = vec![
            format!("Invoice for Order {}", self.id),
            format!("Order Date: {}", self.order_date.format("%Y-%m-%d %H:%M")),
            format!("Status: {:?}", self.status),
            "Items:".to_string(),
        ];
        for item in &self.items {
            lines.push(format!(
                " - {} x {}, unit {}, total {}",
                item.product_id,
                item.quantity,
                item.unit_price,
                item.total_price()
            ));
        }
        lines.push(format!("Total Amount: {}", self.total_amount()));
        lines.push(format!("Paid: {}", if self.is_paid { "yes" } else { "no" }));
        if let Some(paid) = self.payment_date {
            lines.push(format!("Payment Date: {}", paid.format("%Y-%m-%d %H:%M")));
        }
        lines.join("\n")
    }
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
