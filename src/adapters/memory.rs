//! In-memory read-side stores.
//!
//! [`LatestReading`] and [`CropProfiles`] are cheap handles over shared
//! state: clone one into the sensor-feed thread or the request layer and
//! another into [`FarmIo`](super::farm::FarmIo), and both see the same data.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::info;

use crate::app::ports::{CropProfileStore, SensorGateway, StoreError};
use crate::model::{CropProfile, SensorReading};

fn guard<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Most recent sensor reading.
#[derive(Debug, Clone, Default)]
pub struct LatestReading {
    inner: Arc<Mutex<Option<SensorReading>>>,
}

impl LatestReading {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored reading unless `reading` is older than it.
    /// Returns `false` when the reading was dropped as out of order.
    pub fn record(&self, reading: SensorReading) -> bool {
        let mut slot = guard(&self.inner);
        if slot
            .as_ref()
            .is_some_and(|current| current.timestamp_ms > reading.timestamp_ms)
        {
            return false;
        }
        *slot = Some(reading);
        true
    }

    pub fn get(&self) -> Option<SensorReading> {
        *guard(&self.inner)
    }
}

impl SensorGateway for LatestReading {
    fn latest_reading(&self) -> Result<Option<SensorReading>, StoreError> {
        Ok(self.get())
    }
}

#[derive(Debug, Default)]
struct ProfileTable {
    profiles: Vec<CropProfile>,
    active: Option<usize>,
}

/// Crop setpoints, at most one active.
#[derive(Debug, Clone, Default)]
pub struct CropProfiles {
    inner: Arc<Mutex<ProfileTable>>,
}

impl CropProfiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace by `crop_id`. Does not change which crop is active.
    pub fn upsert(&self, profile: CropProfile) {
        let mut table = guard(&self.inner);
        match table.profiles.iter_mut().find(|p| p.crop_id == profile.crop_id) {
            Some(existing) => *existing = profile,
            None => table.profiles.push(profile),
        }
    }

    /// Make `crop_id` the active profile, deactivating every other one.
    /// Returns `false` if no such profile exists.
    pub fn activate(&self, crop_id: &str) -> bool {
        let mut table = guard(&self.inner);
        match table.profiles.iter().position(|p| p.crop_id == crop_id) {
            Some(idx) => {
                table.active = Some(idx);
                info!("Crop: '{}' is now active", crop_id);
                true
            }
            None => false,
        }
    }

    /// Upsert and activate in one step.
    pub fn set_active(&self, profile: CropProfile) {
        let id = profile.crop_id.clone();
        self.upsert(profile);
        self.activate(&id);
    }

    pub fn len(&self) -> usize {
        guard(&self.inner).profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CropProfileStore for CropProfiles {
    fn active_profile(&self) -> Result<Option<CropProfile>, StoreError> {
        let table = guard(&self.inner);
        Ok(table.active.and_then(|i| table.profiles.get(i)).cloned())
    }
}
