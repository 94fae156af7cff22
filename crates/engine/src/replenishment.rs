//! Pick-face replenishment decisions.
//!
//! The reactor runs synchronously after any ledger mutation that touches a
//! pick face. It only decides; the [`TaskEngine`](crate::TaskEngine) turns a
//! `Replenish` decision into an actual movement task. Triggering is
//! at-least-once: a duplicate run against an unchanged ledger re-derives the
//! same decision, and the quantity-0 suppression below keeps that benign.

use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use wareflow_core::{DomainError, DomainResult, LocationCode};
use wareflow_events::domain::{ReplenishmentUnavailable, StockBelowThreshold};
use wareflow_events::{EventBus, InMemoryEventBus, WarehouseEvent};
use wareflow_ledger::StockLedger;
use wareflow_locations::{LocationKindTag, LocationRegistry};
use wareflow_products::{ProductCatalog, TaskPriority};
use wareflow_tasks::ReplenishMethod;

/// Outcome of evaluating one pick face.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplenishmentDecision {
    /// Stock is at or above the low-stock threshold.
    Satisfied,
    /// Below threshold, but target − current is zero; no task is worth
    /// creating (threshold/target misconfiguration or a concurrent top-up).
    Suppressed,
    /// Below threshold and no donor location holds the product. This is an
    /// observed operational condition, not an error.
    Unavailable,
    /// A top-up task should move `quantity` units from `donor`.
    Replenish {
        donor: LocationCode,
        method: ReplenishMethod,
        quantity: u32,
        priority: TaskPriority,
    },
}

/// Decides when and how a pick face gets topped up.
#[derive(Debug)]
pub struct ReplenishmentReactor {
    registry: Arc<LocationRegistry>,
    ledger: Arc<StockLedger>,
    catalog: Arc<ProductCatalog>,
    bus: Arc<InMemoryEventBus<WarehouseEvent>>,
}

impl ReplenishmentReactor {
    pub fn new(
        registry: Arc<LocationRegistry>,
        ledger: Arc<StockLedger>,
        catalog: Arc<ProductCatalog>,
        bus: Arc<InMemoryEventBus<WarehouseEvent>>,
    ) -> Self {
        Self {
            registry,
            ledger,
            catalog,
            bus,
        }
    }

    /// Evaluate one pick face against its thresholds.
    ///
    /// Current stock is derived from the ledger, never from the pick face's
    /// cached mirror. Publishes `StockBelowThreshold` as soon as the
    /// threshold is crossed and `ReplenishmentUnavailable` when no donor
    /// exists; the caller creates the task for a `Replenish` decision.
    pub fn evaluate(&self, pick_face: &LocationCode) -> DomainResult<ReplenishmentDecision> {
        let Some(spec) = self.registry.pick_face_spec(pick_face)? else {
            return Err(DomainError::invariant(format!(
                "location {pick_face} is not a pick face"
            )));
        };

        let current = self.ledger.quantity_at(pick_face, spec.product_id);
        if current >= spec.low_stock_threshold {
            return Ok(ReplenishmentDecision::Satisfied);
        }

        self.publish(WarehouseEvent::StockBelowThreshold(StockBelowThreshold {
            pick_face: pick_face.clone(),
            product_id: spec.product_id,
            current_stock: current,
            low_stock_threshold: spec.low_stock_threshold,
            occurred_at: Utc::now(),
        }));

        let quantity = spec.target_stock_level.saturating_sub(current);
        if quantity == 0 {
            return Ok(ReplenishmentDecision::Suppressed);
        }

        // Donors are bulk locations only; pick faces never feed each other.
        let donor = self.ledger.find_location_with_stock(spec.product_id, 1, |code| {
            matches!(
                self.registry.kind_tag(code),
                Ok(LocationKindTag::Storage | LocationKindTag::InboundFloor)
            )
        });
        let Some((donor, _)) = donor else {
            warn!(pick_face = %pick_face, product = %spec.product_id, "no donor stock for replenishment");
            self.publish(WarehouseEvent::ReplenishmentUnavailable(
                ReplenishmentUnavailable {
                    pick_face: pick_face.clone(),
                    product_id: spec.product_id,
                    occurred_at: Utc::now(),
                },
            ));
            return Ok(ReplenishmentDecision::Unavailable);
        };

        // Floor-level donors are cross-docked; racking donors need the VNA.
        let method = match self.registry.kind_tag(&donor)? {
            LocationKindTag::InboundFloor | LocationKindTag::OutboundFloor => {
                ReplenishMethod::CrossDock
            }
            _ => ReplenishMethod::Vna,
        };

        let priority = match self.catalog.get(spec.product_id) {
            Ok(product) => product.replenishment_priority(quantity),
            Err(_) => {
                warn!(product = %spec.product_id, "pick face product missing from catalog");
                TaskPriority::ROUTINE
            }
        };

        Ok(ReplenishmentDecision::Replenish {
            donor,
            method,
            quantity,
            priority,
        })
    }

    fn publish(&self, event: WarehouseEvent) {
        if let Err(err) = self.bus.publish(event) {
            warn!(?err, "event publish failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use wareflow_core::ProductId;
    use wareflow_events::Event;
    use wareflow_locations::{Location, LocationKind, PickFaceSpec, StatusThresholds};
    use wareflow_ledger::StockKey;
    use wareflow_products::{BatchNumber, Product};

    fn code(s: &str) -> LocationCode {
        LocationCode::new(s).unwrap()
    }

    fn setup(product: ProductId) -> ReplenishmentReactor {
        let registry = Arc::new(LocationRegistry::new());
        registry
            .insert(
                Location::new(
                    code("PF-01"),
                    "",
                    LocationKind::PickFace(PickFaceSpec {
                        product_id: product,
                        current_stock: 0,
                        low_stock_threshold: 10,
                        target_stock_level: 100,
                    }),
                    None,
                    StatusThresholds::default(),
                )
                .unwrap(),
            )
            .unwrap();
        registry
            .insert(
                Location::new(
                    code("S-01"),
                    "",
                    LocationKind::Storage,
                    None,
                    StatusThresholds::default(),
                )
                .unwrap(),
            )
            .unwrap();

        let catalog = Arc::new(ProductCatalog::new());
        let date = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        catalog
            .insert(
                Product::new(
                    product,
                    "SKU-1",
                    "Beans",
                    BatchNumber::new("B1").unwrap(),
                    "ambient",
                    date,
                    date,
                    26,
                    false,
                )
                .unwrap(),
            )
            .unwrap();

        ReplenishmentReactor::new(
            registry,
            Arc::new(StockLedger::new()),
            catalog,
            Arc::new(InMemoryEventBus::new()),
        )
    }

    fn stock(reactor: &ReplenishmentReactor, location: &str, product: ProductId, quantity: i64) {
        reactor
            .ledger
            .adjust(
                &StockKey::new(code(location), product, BatchNumber::new("B1").unwrap()),
                quantity,
            )
            .unwrap();
    }

    #[test]
    fn at_threshold_is_satisfied() {
        let product = ProductId::new();
        let reactor = setup(product);
        stock(&reactor, "PF-01", product, 10);
        assert_eq!(
            reactor.evaluate(&code("PF-01")).unwrap(),
            ReplenishmentDecision::Satisfied
        );
    }

    #[test]
    fn below_threshold_with_donor_replenishes_to_target() {
        let product = ProductId::new();
        let reactor = setup(product);
        let sub = reactor.bus.subscribe();
        stock(&reactor, "PF-01", product, 5);
        stock(&reactor, "S-01", product, 200);

        let decision = reactor.evaluate(&code("PF-01")).unwrap();
        assert_eq!(
            decision,
            ReplenishmentDecision::Replenish {
                donor: code("S-01"),
                method: ReplenishMethod::Vna,
                quantity: 95,
                priority: TaskPriority::ROUTINE,
            }
        );

        let events = sub.drain();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), "stock.below_threshold");
    }

    #[test]
    fn no_donor_is_unavailable_not_an_error() {
        let product = ProductId::new();
        let reactor = setup(product);
        let sub = reactor.bus.subscribe();
        stock(&reactor, "PF-01", product, 5);

        assert_eq!(
            reactor.evaluate(&code("PF-01")).unwrap(),
            ReplenishmentDecision::Unavailable
        );
        let types: Vec<_> = sub.drain().iter().map(|e| e.event_type()).collect();
        assert_eq!(
            types,
            vec!["stock.below_threshold", "replenishment.unavailable"]
        );
    }

    #[test]
    fn pick_face_stock_never_feeds_another_pick_face() {
        let product = ProductId::new();
        let reactor = setup(product);
        reactor
            .registry
            .insert(
                Location::new(
                    code("PF-02"),
                    "",
                    LocationKind::PickFace(PickFaceSpec {
                        product_id: product,
                        current_stock: 0,
                        low_stock_threshold: 10,
                        target_stock_level: 100,
                    }),
                    None,
                    StatusThresholds::default(),
                )
                .unwrap(),
            )
            .unwrap();
        stock(&reactor, "PF-01", product, 5);
        stock(&reactor, "PF-02", product, 500);

        assert_eq!(
            reactor.evaluate(&code("PF-01")).unwrap(),
            ReplenishmentDecision::Unavailable
        );
    }

    #[test]
    fn high_demand_product_gets_urgent_priority() {
        let product = ProductId::new();
        let reactor = setup(product);
        // Replace catalog entry wholesale with a high-demand product.
        let catalog = Arc::new(ProductCatalog::new());
        let date = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        catalog
            .insert(
                Product::new(
                    product,
                    "SKU-1",
                    "Beans",
                    BatchNumber::new("B1").unwrap(),
                    "ambient",
                    date,
                    date,
                    26,
                    true,
                )
                .unwrap(),
            )
            .unwrap();
        let reactor = ReplenishmentReactor::new(
            Arc::clone(&reactor.registry),
            Arc::clone(&reactor.ledger),
            catalog,
            Arc::clone(&reactor.bus),
        );
        stock(&reactor, "PF-01", product, 5);
        stock(&reactor, "S-01", product, 200);

        match reactor.evaluate(&code("PF-01")).unwrap() {
            ReplenishmentDecision::Replenish { priority, .. } => {
                assert_eq!(priority, TaskPriority::URGENT)
            }
            other => panic!("unexpected decision: {other:?}"),
        }
    }

    #[test]
    fn inbound_floor_donor_selects_cross_dock() {
        let product = ProductId::new();
        let reactor = setup(product);
        reactor
            .registry
            .insert(
                Location::new(
                    code("IN-01"),
                    "",
                    LocationKind::InboundFloor,
                    None,
                    StatusThresholds::default(),
                )
                .unwrap(),
            )
            .unwrap();
        stock(&reactor, "PF-01", product, 5);
        stock(&reactor, "IN-01", product, 300);

        match reactor.evaluate(&code("PF-01")).unwrap() {
            ReplenishmentDecision::Replenish { donor, method, .. } => {
                assert_eq!(donor, code("IN-01"));
                assert_eq!(method, ReplenishMethod::CrossDock);
            }
            other => panic!("unexpected decision: {other:?}"),
        }
    }

    #[test]
    fn non_pick_face_is_rejected() {
        let reactor = setup(ProductId::new());
        assert!(matches!(
            reactor.evaluate(&code("S-01")).unwrap_err(),
            DomainError::InvariantViolation(_)
        ));
    }
}
