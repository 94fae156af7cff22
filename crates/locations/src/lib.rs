//! `wareflow-locations` — the typed spatial model of the warehouse.
//!
//! A [`Location`] is one addressable slot of racking or floor space. Its
//! `kind` is a tagged variant (storage, PND buffer, pick face, inbound floor,
//! outbound floor) carrying kind-specific payload, and its `status` is always
//! derived from sensor weight, never set by callers.

pub mod layout;
pub mod location;
pub mod registry;

pub use layout::{Aisle, Level, Rack, Side, Zone};
pub use location::{
    Location, LocationKind, LocationKindTag, LocationStatus, OutboundSpec, PickFaceSpec, PndSpec,
    StatusThresholds, derive_status,
};
pub use registry::LocationRegistry;
