// ── Device directory ──
//
// Read-through cache from device code to numeric id. Devices are immutable,
// so entries never expire for the lifetime of the directory.

use dashmap::DashMap;

use crate::error::CoreError;
use crate::model::DeviceId;
use crate::store::Store;

/// Shared code → id resolver used by the API and the ingestion loop.
///
/// Concurrent misses for the same code may both hit the store; they write
/// the same value, so whichever insert lands last is equally correct.
pub struct DeviceDirectory {
    store: Store,
    cache: DashMap<String, DeviceId>,
}

impl DeviceDirectory {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            cache: DashMap::new(),
        }
    }

    /// Resolve a device code to its id, filling the cache on a miss.
    pub fn resolve(&self, code: &str) -> Result<DeviceId, CoreError> {
        if let Some(id) = self.cache.get(code) {
            return Ok(*id);
        }

        if code.is_empty() {
            return Err(CoreError::UnknownDevice { code: String::new() });
        }

        match self.store.device_id_by_code(code)? {
            Some(id) => {
                self.cache.insert(code.to_owned(), id);
                tracing::debug!(device = code, %id, "device cached");
                Ok(id)
            }
            None => Err(CoreError::UnknownDevice {
                code: code.to_owned(),
            }),
        }
    }

    /// Number of cached codes.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}
