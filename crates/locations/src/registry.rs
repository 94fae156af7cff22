//! Thread-safe registry of all locations, keyed by code.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use wareflow_core::{DomainError, DomainResult, LocationCode};

use crate::location::{Location, LocationKind, LocationKindTag, LocationStatus, PickFaceSpec};

/// Concurrent map of location code → location.
///
/// Each location sits behind its own mutex so sensor updates on different
/// slots never contend; the outer map lock is held only for lookup/insert.
#[derive(Debug, Default)]
pub struct LocationRegistry {
    inner: RwLock<HashMap<LocationCode, Arc<Mutex<Location>>>>,
}

impl LocationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a location created during layout setup.
    pub fn insert(&self, location: Location) -> DomainResult<()> {
        let mut map = self.inner.write().expect("location registry poisoned");
        let code = location.code().clone();
        if map.contains_key(&code) {
            return Err(DomainError::conflict(format!(
                "location {code} already exists"
            )));
        }
        map.insert(code, Arc::new(Mutex::new(location)));
        Ok(())
    }

    fn entry(&self, code: &LocationCode) -> DomainResult<Arc<Mutex<Location>>> {
        let map = self.inner.read().expect("location registry poisoned");
        map.get(code)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("location {code}")))
    }

    pub fn contains(&self, code: &LocationCode) -> bool {
        let map = self.inner.read().expect("location registry poisoned");
        map.contains_key(code)
    }

    /// Point-in-time copy of a location.
    pub fn snapshot(&self, code: &LocationCode) -> DomainResult<Location> {
        let entry = self.entry(code)?;
        let guard = entry.lock().expect("location poisoned");
        Ok(guard.clone())
    }

    pub fn kind_tag(&self, code: &LocationCode) -> DomainResult<LocationKindTag> {
        Ok(self.snapshot(code)?.kind_tag())
    }

    /// All registered codes, sorted for deterministic iteration.
    pub fn codes(&self) -> Vec<LocationCode> {
        let map = self.inner.read().expect("location registry poisoned");
        let mut codes: Vec<_> = map.keys().cloned().collect();
        codes.sort();
        codes
    }

    /// Apply a sensor weight reading to one location.
    pub fn apply_sensor_weight(
        &self,
        code: &LocationCode,
        weight: f64,
    ) -> DomainResult<LocationStatus> {
        let entry = self.entry(code)?;
        let mut guard = entry.lock().expect("location poisoned");
        guard.apply_sensor_weight(weight)
    }

    /// Read the pick-face payload of a location, if it is one.
    pub fn pick_face_spec(&self, code: &LocationCode) -> DomainResult<Option<PickFaceSpec>> {
        let snapshot = self.snapshot(code)?;
        Ok(match snapshot.kind() {
            LocationKind::PickFace(spec) => Some(spec.clone()),
            _ => None,
        })
    }

    /// Refresh a pick face's cached `current_stock` mirror from the ledger.
    pub fn set_pick_face_stock(&self, code: &LocationCode, quantity: u32) -> DomainResult<()> {
        let entry = self.entry(code)?;
        let mut guard = entry.lock().expect("location poisoned");
        match guard.kind_mut() {
            LocationKind::PickFace(spec) => {
                spec.current_stock = quantity;
                Ok(())
            }
            _ => Err(DomainError::invariant(format!(
                "location {code} is not a pick face"
            ))),
        }
    }
}
