//! Cross-service scenarios exercising the engine end to end.

use std::sync::{Arc, Barrier};

use chrono::NaiveDate;

use wareflow_core::{CustomerId, DomainError, LocationCode, ProductId, TaskId, WorkerId};
use wareflow_events::{Event, EventBus, InMemoryEventBus, WarehouseEvent};
use wareflow_fulfillment::{FinalizeOutcome, InboundStatus, LoadingConfirmation, OrderItem, OrderStatus};
use wareflow_ledger::{StockKey, StockLedger};
use wareflow_locations::{
    Location, LocationKind, LocationRegistry, OutboundSpec, PickFaceSpec, PndSpec,
    StatusThresholds,
};
use wareflow_products::{BatchNumber, Product, ProductCatalog, TaskPriority};
use wareflow_tasks::{ReplenishMethod, TaskKind, TaskStatus};

use crate::fulfillment_service::{CompleteOrderOutcome, FulfillmentConfig, FulfillmentService};
use crate::task_engine::{EngineConfig, TaskEngine};

fn code(s: &str) -> LocationCode {
    LocationCode::new(s).unwrap()
}

fn batch(s: &str) -> BatchNumber {
    BatchNumber::new(s).unwrap()
}

struct Warehouse {
    registry: Arc<LocationRegistry>,
    ledger: Arc<StockLedger>,
    catalog: Arc<ProductCatalog>,
    bus: Arc<InMemoryEventBus<WarehouseEvent>>,
    engine: Arc<TaskEngine>,
    service: FulfillmentService,
    product: ProductId,
}

impl Warehouse {
    fn add_product(&self, pallet_size: u32, high_demand: bool) -> ProductId {
        let id = ProductId::new();
        let date = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        self.catalog
            .insert(
                Product::new(
                    id,
                    format!("SKU-{id}"),
                    "Tinned Tomatoes",
                    batch("B1"),
                    "ambient",
                    date,
                    NaiveDate::from_ymd_opt(2027, 1, 1).unwrap(),
                    pallet_size,
                    high_demand,
                )
                .unwrap(),
            )
            .unwrap();
        id
    }

    fn stock(&self, location: &str, product: ProductId, quantity: i64) {
        self.ledger
            .adjust(&StockKey::new(code(location), product, batch("B1")), quantity)
            .unwrap();
    }

    fn quantity(&self, location: &str, product: ProductId) -> u32 {
        self.ledger.quantity_at(&code(location), product)
    }

    /// Run one task through its whole lifecycle.
    fn run_task(&self, id: TaskId) {
        self.engine.assign_task(id, WorkerId::new()).unwrap();
        self.engine.start_task(id).unwrap();
        self.engine.complete_task(id).unwrap();
    }
}

fn setup() -> Warehouse {
    let registry = Arc::new(LocationRegistry::new());
    let ledger = Arc::new(StockLedger::new());
    let catalog = Arc::new(ProductCatalog::new());
    let bus = Arc::new(InMemoryEventBus::new());
    let product = ProductId::new();

    let thresholds = StatusThresholds::default();
    let add = |codename: &str, kind: LocationKind| {
        registry
            .insert(Location::new(code(codename), "", kind, None, thresholds).unwrap())
            .unwrap();
    };
    add("S-01", LocationKind::Storage);
    add("S-02", LocationKind::Storage);
    add("IN-01", LocationKind::InboundFloor);
    add(
        "PND-01",
        LocationKind::Pnd(PndSpec {
            temperature_range: "ambient".to_owned(),
            capacity: 4,
        }),
    );
    add(
        "PF-01",
        LocationKind::PickFace(PickFaceSpec {
            product_id: product,
            current_stock: 0,
            low_stock_threshold: 10,
            target_stock_level: 100,
        }),
    );
    add(
        "OUT-STAGE",
        LocationKind::OutboundFloor(OutboundSpec {
            bay_number: 1,
            max_capacity: 20,
        }),
    );
    add(
        "OUT-BAY-02",
        LocationKind::OutboundFloor(OutboundSpec {
            bay_number: 2,
            max_capacity: 20,
        }),
    );

    let date = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
    catalog
        .insert(
            Product::new(
                product,
                "SKU-MAIN",
                "Baked Beans",
                batch("B1"),
                "ambient",
                date,
                NaiveDate::from_ymd_opt(2027, 1, 1).unwrap(),
                26,
                false,
            )
            .unwrap(),
        )
        .unwrap();

    let engine = Arc::new(
        TaskEngine::new(
            Arc::clone(&registry),
            Arc::clone(&ledger),
            Arc::clone(&catalog),
            Arc::clone(&bus),
            EngineConfig {
                picking_chain_destination: code("OUT-STAGE"),
            },
        )
        .unwrap(),
    );
    let service = FulfillmentService::new(
        Arc::clone(&engine),
        Arc::clone(&registry),
        Arc::clone(&ledger),
        Arc::clone(&bus),
        FulfillmentConfig {
            outbound_staging: code("OUT-STAGE"),
            dispatch_bay: code("OUT-BAY-02"),
        },
    )
    .unwrap();

    Warehouse {
        registry,
        ledger,
        catalog,
        bus,
        engine,
        service,
        product,
    }
}

#[test]
fn engine_rejects_a_misconfigured_chain_destination() {
    let registry = Arc::new(LocationRegistry::new());
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

    let build = |destination: &str| {
        TaskEngine::new(
            Arc::clone(&registry),
            Arc::new(StockLedger::new()),
            Arc::new(ProductCatalog::new()),
            Arc::new(InMemoryEventBus::new()),
            EngineConfig {
                picking_chain_destination: code(destination),
            },
        )
    };

    assert!(matches!(
        build("OUT-NOWHERE").unwrap_err(),
        DomainError::NotFound(_)
    ));
    assert!(matches!(
        build("S-01").unwrap_err(),
        DomainError::InvalidState(_)
    ));
}

#[test]
fn replenishment_round_trip_tops_up_the_pick_face() {
    let w = setup();
    w.stock("PF-01", w.product, 5);
    w.stock("S-01", w.product, 200);

    let task_id = w
        .engine
        .run_replenishment(&code("PF-01"))
        .unwrap()
        .expect("a top-up task should be created");
    let task = w.engine.task(task_id).unwrap();
    assert_eq!(
        task.kind(),
        TaskKind::Replenishment {
            method: ReplenishMethod::Vna
        }
    );
    assert_eq!(task.quantity(), 95);
    assert_eq!(task.source(), &code("S-01"));
    assert_eq!(task.destination(), &code("PF-01"));

    w.run_task(task_id);

    assert_eq!(w.quantity("PF-01", w.product), 100);
    assert_eq!(w.quantity("S-01", w.product), 105);
    // Cached mirror follows the ledger.
    let spec = w.registry.pick_face_spec(&code("PF-01")).unwrap().unwrap();
    assert_eq!(spec.current_stock, 100);
    // Back above threshold: no second task was chained.
    assert_eq!(w.engine.tasks().len(), 1);
}

#[test]
fn cross_dock_replenishment_from_the_inbound_floor() {
    let w = setup();
    w.stock("PF-01", w.product, 2);
    w.stock("IN-01", w.product, 300);

    let task_id = w.engine.run_replenishment(&code("PF-01")).unwrap().unwrap();
    let task = w.engine.task(task_id).unwrap();
    assert_eq!(
        task.kind(),
        TaskKind::Replenishment {
            method: ReplenishMethod::CrossDock
        }
    );
    assert_eq!(task.source(), &code("IN-01"));
}

#[test]
fn replenishment_without_donor_publishes_and_creates_nothing() {
    let w = setup();
    let sub = w.bus.subscribe();
    w.stock("PF-01", w.product, 5);

    assert_eq!(w.engine.run_replenishment(&code("PF-01")).unwrap(), None);
    assert!(w.engine.tasks().is_empty());
    let types: Vec<_> = sub.drain().iter().map(|e| e.event_type()).collect();
    assert_eq!(
        types,
        vec!["stock.below_threshold", "replenishment.unavailable"]
    );
}

#[test]
fn completing_a_task_into_a_pick_face_triggers_the_reactor() {
    let w = setup();
    w.stock("S-01", w.product, 200);

    // Move a small top-up manually; the pick face is still below threshold
    // afterwards, so completion itself must chain a replenishment task.
    let manual = w
        .engine
        .create_task(
            TaskKind::Replenishment {
                method: ReplenishMethod::Vna,
            },
            w.product,
            4,
            batch("B1"),
            code("S-01"),
            code("PF-01"),
            TaskPriority::ROUTINE,
        )
        .unwrap();
    w.run_task(manual);

    let tasks = w.engine.tasks();
    assert_eq!(tasks.len(), 2);
    let chained = &tasks[1];
    assert_eq!(chained.status(), TaskStatus::Pending);
    assert_eq!(chained.quantity(), 96);
    assert_eq!(chained.destination(), &code("PF-01"));
}

#[test]
fn concurrent_completion_has_exactly_one_winner() {
    let w = setup();
    w.stock("S-01", w.product, 50);
    let task_id = w
        .engine
        .create_task(
            TaskKind::FltTransfer,
            w.product,
            30,
            batch("B1"),
            code("S-01"),
            code("S-02"),
            TaskPriority::ROUTINE,
        )
        .unwrap();
    w.engine.start_task(task_id).unwrap();

    let engine = Arc::clone(&w.engine);
    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                barrier.wait();
                engine.complete_task(task_id)
            })
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    assert!(results.iter().any(|r| matches!(
        r,
        Err(DomainError::AlreadyCompleted(_))
    )));
    // The transfer was applied exactly once.
    assert_eq!(w.quantity("S-01", w.product), 20);
    assert_eq!(w.quantity("S-02", w.product), 30);
}

#[test]
fn insufficient_stock_leaves_the_task_retryable() {
    let w = setup();
    w.stock("S-01", w.product, 10);
    let task_id = w
        .engine
        .create_task(
            TaskKind::FltTransfer,
            w.product,
            30,
            batch("B1"),
            code("S-01"),
            code("S-02"),
            TaskPriority::ROUTINE,
        )
        .unwrap();
    w.engine.start_task(task_id).unwrap();

    let err = w.engine.complete_task(task_id).unwrap_err();
    assert!(matches!(err, DomainError::InsufficientStock(_)));
    assert_eq!(w.engine.task(task_id).unwrap().status(), TaskStatus::InProgress);

    // Stock arrives; the same completion now succeeds.
    w.stock("S-01", w.product, 25);
    w.engine.complete_task(task_id).unwrap();
    assert_eq!(w.quantity("S-02", w.product), 30);
}

#[test]
fn order_picking_completion_chains_a_follow_on_transfer() {
    let w = setup();
    w.stock("S-01", w.product, 40);
    let picking = w
        .engine
        .create_task(
            TaskKind::OrderPicking,
            w.product,
            26,
            batch("B1"),
            code("S-01"),
            code("PND-01"),
            TaskPriority::URGENT,
        )
        .unwrap();
    w.run_task(picking);

    let tasks = w.engine.tasks();
    assert_eq!(tasks.len(), 2);
    let follow_on = &tasks[1];
    assert_eq!(follow_on.kind(), TaskKind::FltTransfer);
    assert_eq!(follow_on.status(), TaskStatus::Pending);
    assert_eq!(follow_on.source(), &code("PND-01"));
    assert_eq!(follow_on.destination(), &code("OUT-STAGE"));
    assert_eq!(follow_on.quantity(), 26);
    assert_eq!(follow_on.priority(), TaskPriority::URGENT);
}

#[test]
fn inbound_chain_from_gatehouse_to_stored() {
    let w = setup();
    let worker = WorkerId::new();

    let booking = w
        .service
        .record_booking("A. Driver", "Haulage Co", "AB12 CDE", "TR-9", chrono::Utc::now());
    let provisional = w
        .service
        .assign_provisional_bay(booking, "BAY-1", worker)
        .unwrap();
    // Provisional is advisory and may be revised before confirmation.
    w.service
        .revise_provisional_bay(provisional, "BAY-2", worker)
        .unwrap();
    let final_bay = w
        .service
        .confirm_final_bay(provisional, "BAY-2", worker)
        .unwrap();

    let inbound = w
        .service
        .record_inbound(final_bay, w.product, 40, batch("B1"), Some(worker), code("IN-01"))
        .unwrap();
    assert_eq!(w.quantity("IN-01", w.product), 40);
    assert_eq!(w.service.inbound(inbound).unwrap().status(), InboundStatus::Pending);

    let putaway = w.service.release_inbound(inbound, code("PND-01")).unwrap();
    assert_eq!(
        w.service.inbound(inbound).unwrap().status(),
        InboundStatus::Released
    );
    let task = w.engine.task(putaway).unwrap();
    assert_eq!(task.kind(), TaskKind::InboundPutaway);
    assert_eq!(task.source(), &code("IN-01"));

    w.engine.start_task(putaway).unwrap();
    w.service.complete_putaway(putaway).unwrap();
    assert_eq!(
        w.service.inbound(inbound).unwrap().status(),
        InboundStatus::Stored
    );
    assert_eq!(w.quantity("IN-01", w.product), 0);
    assert_eq!(w.quantity("PND-01", w.product), 40);
}

#[test]
fn released_strictly_requires_pending() {
    let w = setup();
    let worker = WorkerId::new();
    let booking = w
        .service
        .record_booking("A. Driver", "Haulage Co", "AB12 CDE", "TR-9", chrono::Utc::now());
    let provisional = w
        .service
        .assign_provisional_bay(booking, "BAY-1", worker)
        .unwrap();
    let final_bay = w
        .service
        .confirm_final_bay(provisional, "BAY-1", worker)
        .unwrap();
    let inbound = w
        .service
        .record_inbound(final_bay, w.product, 10, batch("B1"), None, code("IN-01"))
        .unwrap();

    w.service.mark_inbound_received(inbound).unwrap();
    let err = w
        .service
        .release_inbound(inbound, code("PND-01"))
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidTransition(_)));
    // The refused release created no task.
    assert!(w.engine.tasks().is_empty());
}

#[test]
fn one_provisional_per_booking_and_one_final_per_provisional() {
    let w = setup();
    let worker = WorkerId::new();
    let booking = w
        .service
        .record_booking("A. Driver", "Haulage Co", "AB12 CDE", "TR-9", chrono::Utc::now());
    let provisional = w
        .service
        .assign_provisional_bay(booking, "BAY-1", worker)
        .unwrap();
    assert!(matches!(
        w.service.assign_provisional_bay(booking, "BAY-3", worker),
        Err(DomainError::Conflict(_))
    ));

    w.service.confirm_final_bay(provisional, "BAY-1", worker).unwrap();
    assert!(matches!(
        w.service.confirm_final_bay(provisional, "BAY-4", worker),
        Err(DomainError::Conflict(_))
    ));
    // Once final, the provisional can no longer be revised.
    assert!(matches!(
        w.service.revise_provisional_bay(provisional, "BAY-5", worker),
        Err(DomainError::Conflict(_))
    ));
}

#[test]
fn loading_confirmation_is_one_shot() {
    let w = setup();
    let worker = WorkerId::new();
    let booking = w
        .service
        .record_booking("A. Driver", "Haulage Co", "AB12 CDE", "TR-9", chrono::Utc::now());
    let provisional = w
        .service
        .assign_provisional_bay(booking, "BAY-1", worker)
        .unwrap();
    let final_bay = w
        .service
        .confirm_final_bay(provisional, "BAY-1", worker)
        .unwrap();

    assert_eq!(
        w.service.confirm_loading(final_bay, worker).unwrap(),
        LoadingConfirmation::Confirmed
    );
    let first = w.service.final_bay(final_bay).unwrap();
    let loaded_at = first.loaded_at().unwrap();

    let second_loader = WorkerId::new();
    assert_eq!(
        w.service.confirm_loading(final_bay, second_loader).unwrap(),
        LoadingConfirmation::AlreadyConfirmed
    );
    let after = w.service.final_bay(final_bay).unwrap();
    assert_eq!(after.loaded_at(), Some(loaded_at));
    assert_eq!(after.loader(), first.loader());
}

#[test]
fn order_with_one_unsourceable_item_is_refused_untouched() {
    let w = setup();
    let scarce = w.add_product(26, false);
    w.stock("S-01", w.product, 100);
    // Scarce product exists only below a full pallet.
    w.stock("S-02", scarce, 10);

    let order = w
        .service
        .place_order(
            CustomerId::new(),
            vec![
                OrderItem {
                    product_id: w.product,
                    quantity: 26,
                    unit_price: 120,
                },
                OrderItem {
                    product_id: scarce,
                    quantity: 26,
                    unit_price: 80,
                },
            ],
        )
        .unwrap();

    let outcome = w
        .service
        .complete_order(order, "A. Driver", "AB12 CDE", "TR-9")
        .unwrap();
    assert!(matches!(outcome, CompleteOrderOutcome::Refused { .. }));

    // Nothing mutated: order untouched, no tasks, no dispatch.
    assert_eq!(w.service.order(order).unwrap().status(), OrderStatus::Pending);
    assert!(w.engine.tasks().is_empty());
    assert!(matches!(
        w.service.dispatch_for_order(order),
        Err(DomainError::NotFound(_))
    ));
}

#[test]
fn outbound_chain_from_order_to_shipment() {
    let w = setup();
    let worker = WorkerId::new();
    w.stock("S-01", w.product, 100);
    let sub = w.bus.subscribe();

    let order = w
        .service
        .place_order(
            CustomerId::new(),
            vec![OrderItem {
                product_id: w.product,
                quantity: 26,
                unit_price: 120,
            }],
        )
        .unwrap();
    w.service.mark_order_processing(order).unwrap();

    let outcome = w
        .service
        .complete_order(order, "A. Driver", "AB12 CDE", "TR-9")
        .unwrap();
    let CompleteOrderOutcome::Completed {
        dispatch_id,
        transfer_task_ids,
        loader_task_ids,
    } = outcome
    else {
        panic!("completion refused");
    };
    assert_eq!(transfer_task_ids.len(), 1);
    assert_eq!(loader_task_ids.len(), 1);
    assert_eq!(w.service.order(order).unwrap().status(), OrderStatus::Shipped);
    assert!(
        sub.drain()
            .iter()
            .any(|e| e.event_type() == "order.shipped")
    );

    // Work the floor: stage the pallet, then load it.
    w.run_task(transfer_task_ids[0]);
    assert_eq!(w.quantity("OUT-STAGE", w.product), 26);
    w.run_task(loader_task_ids[0]);
    assert_eq!(w.quantity("OUT-BAY-02", w.product), 26);

    // Dock paperwork.
    let booking =
        w.service
            .record_booking("A. Driver", "Haulage Co", "AB12 CDE", "TR-9", chrono::Utc::now());
    let provisional = w
        .service
        .assign_provisional_bay(booking, "BAY-2", worker)
        .unwrap();
    let final_bay = w
        .service
        .confirm_final_bay(provisional, "BAY-2", worker)
        .unwrap();
    w.service.link_dispatch_bay(dispatch_id, final_bay).unwrap();

    // Not loaded yet: finalization refuses, shipment cannot exist.
    assert!(matches!(
        w.service.finalize_dispatch(dispatch_id).unwrap(),
        FinalizeOutcome::Refused { .. }
    ));
    assert!(matches!(
        w.service.record_shipment(dispatch_id, worker, None),
        Err(DomainError::InvariantViolation(_))
    ));

    w.service.confirm_loading(final_bay, worker).unwrap();
    assert!(matches!(
        w.service.finalize_dispatch(dispatch_id).unwrap(),
        FinalizeOutcome::Finalized { .. }
    ));

    w.service.attach_cmr(dispatch_id, worker, "CMR-0001").unwrap();
    assert!(matches!(
        w.service.attach_cmr(dispatch_id, worker, "CMR-0002"),
        Err(DomainError::Conflict(_))
    ));
    w.service
        .record_shipment(dispatch_id, worker, Some("TRK-42".to_owned()))
        .unwrap();
    assert!(matches!(
        w.service.record_shipment(dispatch_id, worker, None),
        Err(DomainError::Conflict(_))
    ));

    let dispatch = w.service.dispatch(dispatch_id).unwrap();
    assert!(dispatch.finalized_at().is_some());
    assert_eq!(dispatch.cmr().unwrap().document_ref, "CMR-0001");
    assert_eq!(
        dispatch.shipment().unwrap().tracking_number.as_deref(),
        Some("TRK-42")
    );
}

#[test]
fn dispatch_finalization_waits_for_loader_tasks() {
    let w = setup();
    let worker = WorkerId::new();
    w.stock("S-01", w.product, 100);

    let order = w
        .service
        .place_order(
            CustomerId::new(),
            vec![OrderItem {
                product_id: w.product,
                quantity: 26,
                unit_price: 120,
            }],
        )
        .unwrap();
    let CompleteOrderOutcome::Completed { dispatch_id, .. } = w
        .service
        .complete_order(order, "A. Driver", "AB12 CDE", "TR-9")
        .unwrap()
    else {
        panic!("completion refused");
    };

    let booking =
        w.service
            .record_booking("A. Driver", "Haulage Co", "AB12 CDE", "TR-9", chrono::Utc::now());
    let provisional = w
        .service
        .assign_provisional_bay(booking, "BAY-2", worker)
        .unwrap();
    let final_bay = w
        .service
        .confirm_final_bay(provisional, "BAY-2", worker)
        .unwrap();
    w.service.link_dispatch_bay(dispatch_id, final_bay).unwrap();
    w.service.confirm_loading(final_bay, worker).unwrap();

    // Bay says loaded, but the loader task never ran.
    assert!(matches!(
        w.service.finalize_dispatch(dispatch_id).unwrap(),
        FinalizeOutcome::Refused { .. }
    ));
}

#[test]
fn stock_changed_events_cover_both_endpoints() {
    let w = setup();
    w.stock("S-01", w.product, 50);
    let task_id = w
        .engine
        .create_task(
            TaskKind::FltTransfer,
            w.product,
            20,
            batch("B1"),
            code("S-01"),
            code("S-02"),
            TaskPriority::ROUTINE,
        )
        .unwrap();
    let sub = w.bus.subscribe();
    w.engine.start_task(task_id).unwrap();
    w.engine.complete_task(task_id).unwrap();

    let events = sub.drain();
    let changed: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            WarehouseEvent::StockChanged(c) => Some((c.location.clone(), c.quantity)),
            _ => None,
        })
        .collect();
    assert_eq!(changed, vec![(code("S-01"), 30), (code("S-02"), 20)]);
    assert!(events.iter().any(|e| e.event_type() == "task.completed"));
}
