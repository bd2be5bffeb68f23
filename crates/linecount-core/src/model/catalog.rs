// ── Lookup entities ──
//
// Clients, products and the device listing are plain pass-through data for
// operator tooling; the core only ever resolves devices by code.

use serde::{Deserialize, Serialize};

use super::ids::DeviceId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: i64,
    #[serde(rename = "nome")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    #[serde(rename = "nome")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    #[serde(rename = "codigo")]
    pub code: String,
    #[serde(rename = "descricao")]
    pub description: String,
}

/// Entries inserted at startup when missing. Existing rows are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSeed {
    #[serde(default)]
    pub clients: Vec<String>,
    #[serde(default)]
    pub products: Vec<String>,
    #[serde(default)]
    pub devices: Vec<DeviceSeed>,
}

impl CatalogSeed {
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty() && self.products.is_empty() && self.devices.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSeed {
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// How many seed rows were actually new.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub clients: usize,
    pub products: usize,
    pub devices: usize,
}
