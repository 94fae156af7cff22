use serde::{Deserialize, Serialize};

use wareflow_core::{DomainError, DomainResult, Entity, LocationCode, ProductId};

/// Occupancy status of a location, derived from sensor weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationStatus {
    Empty,
    Full,
    /// Sensor reading inconsistent with the location's capacity; a human
    /// must verify the slot before it is trusted again.
    VerificationRequired,
    /// Reserved for the pick-scheduling surface (out of scope); derivation
    /// never produces it.
    UrgentPick,
    UrgentReplenish,
    LowStock,
}

/// Kind-specific payload: PND staging buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PndSpec {
    /// Suitable temperature range, e.g. "0-4C" for chilled.
    pub temperature_range: String,
    /// Maximum pallet capacity of the buffer slot.
    pub capacity: u32,
}

/// Kind-specific payload: pick face.
///
/// `current_stock` is a cached mirror of the stock ledger's rows for the
/// bound product at this location; the engine refreshes it after every
/// transfer touching the pick face.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickFaceSpec {
    pub product_id: ProductId,
    pub current_stock: u32,
    pub low_stock_threshold: u32,
    pub target_stock_level: u32,
}

/// Kind-specific payload: outbound floor / dispatch bay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundSpec {
    pub bay_number: u32,
    pub max_capacity: u32,
}

/// One location record with a kind discriminator; kind-specific payload
/// lives inline on the variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LocationKind {
    Storage,
    Pnd(PndSpec),
    PickFace(PickFaceSpec),
    InboundFloor,
    OutboundFloor(OutboundSpec),
}

/// Payload-free discriminator, used in routing rules and donor filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationKindTag {
    Storage,
    Pnd,
    PickFace,
    InboundFloor,
    OutboundFloor,
}

impl LocationKind {
    pub fn tag(&self) -> LocationKindTag {
        match self {
            LocationKind::Storage => LocationKindTag::Storage,
            LocationKind::Pnd(_) => LocationKindTag::Pnd,
            LocationKind::PickFace(_) => LocationKindTag::PickFace,
            LocationKind::InboundFloor => LocationKindTag::InboundFloor,
            LocationKind::OutboundFloor(_) => LocationKindTag::OutboundFloor,
        }
    }
}

/// Weight thresholds (kg) driving status derivation for non-PND locations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatusThresholds {
    pub low_stock: f64,
    pub urgent_replenish: f64,
}

impl Default for StatusThresholds {
    fn default() -> Self {
        Self {
            low_stock: 50.0,
            urgent_replenish: 20.0,
        }
    }
}

/// Pure status derivation from sensor weight.
///
/// PND buffers are binary (a pallet is present or it is not); every other
/// kind maps weight through the urgent-replenish and low-stock thresholds.
/// A reading above the slot's capacity means the sensor and the slot
/// disagree, which demands verification.
pub fn derive_status(
    kind: LocationKindTag,
    weight: f64,
    thresholds: StatusThresholds,
    capacity: Option<f64>,
) -> LocationStatus {
    if let Some(cap) = capacity {
        if weight > cap {
            return LocationStatus::VerificationRequired;
        }
    }
    match kind {
        LocationKindTag::Pnd => {
            if weight == 0.0 {
                LocationStatus::Empty
            } else {
                LocationStatus::Full
            }
        }
        _ => {
            if weight == 0.0 {
                LocationStatus::Empty
            } else if weight <= thresholds.urgent_replenish {
                LocationStatus::UrgentReplenish
            } else if weight <= thresholds.low_stock {
                LocationStatus::LowStock
            } else {
                LocationStatus::Full
            }
        }
    }
}

/// One addressable slot of racking or floor space.
///
/// Created once during layout setup; mutated by sensor updates and task
/// completion; never deleted while stock records reference it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    code: LocationCode,
    description: String,
    kind: LocationKind,
    status: LocationStatus,
    /// Last sensor-reported weight, kg.
    weight: f64,
    /// Weight capacity of the slot, kg; `None` for unmetered floor space.
    capacity: Option<f64>,
    thresholds: StatusThresholds,
}

impl Location {
    pub fn new(
        code: LocationCode,
        description: impl Into<String>,
        kind: LocationKind,
        capacity: Option<f64>,
        thresholds: StatusThresholds,
    ) -> DomainResult<Self> {
        if let Some(cap) = capacity {
            if cap <= 0.0 {
                return Err(DomainError::validation("capacity must be positive"));
            }
        }
        Ok(Self {
            code,
            description: description.into(),
            kind,
            status: LocationStatus::Empty,
            weight: 0.0,
            capacity,
            thresholds,
        })
    }

    pub fn code(&self) -> &LocationCode {
        &self.code
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn kind(&self) -> &LocationKind {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut LocationKind {
        &mut self.kind
    }

    pub fn kind_tag(&self) -> LocationKindTag {
        self.kind.tag()
    }

    pub fn status(&self) -> LocationStatus {
        self.status
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn capacity(&self) -> Option<f64> {
        self.capacity
    }

    /// Apply a sensor weight reading: update weight, re-derive status.
    ///
    /// Only the derivation routine ever writes `status`; fails with an
    /// `InvalidState` error if the pair would violate the weight/empty
    /// invariant (negative readings are the one way to get there).
    pub fn apply_sensor_weight(&mut self, weight: f64) -> DomainResult<LocationStatus> {
        if weight < 0.0 {
            return Err(DomainError::invalid_state(format!(
                "negative sensor weight {weight} at {}",
                self.code
            )));
        }
        let status = derive_status(self.kind.tag(), weight, self.thresholds, self.capacity);
        if weight > 0.0 && status == LocationStatus::Empty {
            return Err(DomainError::invalid_state(format!(
                "location {} has weight {weight} but derived status empty",
                self.code
            )));
        }
        self.weight = weight;
        self.status = status;
        Ok(status)
    }
}

impl Entity for Location {
    type Id = LocationCode;

    fn id(&self) -> &Self::Id {
        &self.code
    }
}
