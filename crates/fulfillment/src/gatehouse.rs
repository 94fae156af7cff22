//! Gatehouse side of the inbound chain: booking → provisional bay → final bay.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wareflow_core::{BayAssignmentId, BookingId, Entity, WorkerId};

/// A vehicle arrival recorded at the gatehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatehouseBooking {
    id: BookingId,
    pub driver_name: String,
    pub company: String,
    pub vehicle_registration: String,
    pub trailer_number: String,
    pub arrival_time: DateTime<Utc>,
    /// Reference to paperwork held by the document store (out of scope).
    pub paperwork_ref: Option<String>,
}

impl GatehouseBooking {
    pub fn new(
        id: BookingId,
        driver_name: impl Into<String>,
        company: impl Into<String>,
        vehicle_registration: impl Into<String>,
        trailer_number: impl Into<String>,
        arrival_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            driver_name: driver_name.into(),
            company: company.into(),
            vehicle_registration: vehicle_registration.into(),
            trailer_number: trailer_number.into(),
            arrival_time,
            paperwork_ref: None,
        }
    }

    pub fn id_typed(&self) -> BookingId {
        self.id
    }
}

impl Entity for GatehouseBooking {
    type Id = BookingId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Advisory bay assignment made on arrival; may be revised until the final
/// assignment is confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionalBayAssignment {
    id: BayAssignmentId,
    pub booking_id: BookingId,
    pub bay: String,
    pub assigned_by: WorkerId,
    pub assigned_at: DateTime<Utc>,
}

impl ProvisionalBayAssignment {
    pub fn new(
        id: BayAssignmentId,
        booking_id: BookingId,
        bay: impl Into<String>,
        assigned_by: WorkerId,
        assigned_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            booking_id,
            bay: bay.into(),
            assigned_by,
            assigned_at,
        }
    }

    pub fn id_typed(&self) -> BayAssignmentId {
        self.id
    }

    /// Provisional assignments are advisory: the bay may be revised.
    pub fn revise_bay(&mut self, bay: impl Into<String>, by: WorkerId, at: DateTime<Utc>) {
        self.bay = bay.into();
        self.assigned_by = by;
        self.assigned_at = at;
    }
}

impl Entity for ProvisionalBayAssignment {
    type Id = BayAssignmentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Result of a loading confirmation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadingConfirmation {
    /// Loading confirmed, vehicle ready for departure.
    Confirmed,
    /// Loading was already confirmed; nothing changed.
    AlreadyConfirmed,
}

/// Authoritative bay assignment; carries the one-shot loading flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalBayAssignment {
    id: BayAssignmentId,
    pub provisional_id: BayAssignmentId,
    pub bay: String,
    pub confirmed_by: WorkerId,
    pub confirmed_at: DateTime<Utc>,
    is_loaded: bool,
    loaded_at: Option<DateTime<Utc>>,
    loader: Option<WorkerId>,
}

impl FinalBayAssignment {
    pub fn new(
        id: BayAssignmentId,
        provisional_id: BayAssignmentId,
        bay: impl Into<String>,
        confirmed_by: WorkerId,
        confirmed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            provisional_id,
            bay: bay.into(),
            confirmed_by,
            confirmed_at,
            is_loaded: false,
            loaded_at: None,
            loader: None,
        }
    }

    pub fn id_typed(&self) -> BayAssignmentId {
        self.id
    }

    pub fn is_loaded(&self) -> bool {
        self.is_loaded
    }

    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.loaded_at
    }

    pub fn loader(&self) -> Option<WorkerId> {
        self.loader
    }

    /// One-shot loading confirmation.
    ///
    /// The flag only ever transitions false → true; repeat calls report
    /// [`LoadingConfirmation::AlreadyConfirmed`] and leave the original
    /// loader and timestamp untouched.
    pub fn confirm_loading(&mut self, loader: WorkerId, now: DateTime<Utc>) -> LoadingConfirmation {
        if self.is_loaded {
            return LoadingConfirmation::AlreadyConfirmed;
        }
        self.is_loaded = true;
        self.loaded_at = Some(now);
        self.loader = Some(loader);
        LoadingConfirmation::Confirmed
    }
}

impl Entity for FinalBayAssignment {
    type Id = BayAssignmentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
