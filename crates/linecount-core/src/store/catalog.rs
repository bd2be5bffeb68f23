use rusqlite::{OptionalExtension, params};

use super::Store;
use crate::error::CoreError;
use crate::model::{CatalogSeed, Client, Device, DeviceId, Product, SeedReport};

impl Store {
    pub(crate) fn device_id_by_code(&self, code: &str) -> Result<Option<DeviceId>, CoreError> {
        self.with_conn(|conn| {
            conn.query_row("SELECT id FROM devices WHERE code = ?1", [code], |row| {
                row.get(0)
            })
            .optional()
        })
    }

    pub fn clients(&self) -> Result<Vec<Client>, CoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached("SELECT id, name FROM clients ORDER BY name ASC")?;
            let rows = stmt.query_map([], |row| {
                Ok(Client {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?;
            rows.collect()
        })
    }

    pub fn products(&self) -> Result<Vec<Product>, CoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached("SELECT id, name FROM products ORDER BY name ASC")?;
            let rows = stmt.query_map([], |row| {
                Ok(Product {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?;
            rows.collect()
        })
    }

    pub fn devices(&self) -> Result<Vec<Device>, CoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT id, code, COALESCE(description, '') FROM devices ORDER BY code ASC",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(Device {
                    id: row.get(0)?,
                    code: row.get(1)?,
                    description: row.get(2)?,
                })
            })?;
            rows.collect()
        })
    }

    pub fn insert_client(&self, name: &str) -> Result<i64, CoreError> {
        self.with_conn(|conn| {
            conn.execute("INSERT INTO clients (name) VALUES (?1)", [name])?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn insert_product(&self, name: &str) -> Result<i64, CoreError> {
        self.with_conn(|conn| {
            conn.execute("INSERT INTO products (name) VALUES (?1)", [name])?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn insert_device(
        &self,
        code: &str,
        description: Option<&str>,
    ) -> Result<DeviceId, CoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO devices (code, description) VALUES (?1, ?2)",
                params![code, description],
            )?;
            Ok(DeviceId(conn.last_insert_rowid()))
        })
    }

    /// Insert any seed entries that are not there yet, in one transaction.
    pub fn seed_catalog(&self, seed: &CatalogSeed) -> Result<SeedReport, CoreError> {
        let inner = &self.inner;
        let mut conn = inner
            .conn
            .lock()
            .map_err(|_| CoreError::Internal("store connection lock poisoned".into()))?;
        let tx = conn.transaction()?;
        let mut report = SeedReport::default();

        for name in &seed.clients {
            report.clients +=
                tx.execute("INSERT OR IGNORE INTO clients (name) VALUES (?1)", [name])?;
        }
        for name in &seed.products {
            report.products +=
                tx.execute("INSERT OR IGNORE INTO products (name) VALUES (?1)", [name])?;
        }
        for device in &seed.devices {
            report.devices += tx.execute(
                "INSERT OR IGNORE INTO devices (code, description) VALUES (?1, ?2)",
                params![device.code, device.description],
            )?;
        }

        tx.commit()?;
        Ok(report)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::DeviceSeed;

    #[test]
    fn lookups_are_sorted() {
        let store = Store::in_memory().unwrap();
        store.insert_client("Zeta").unwrap();
        store.insert_client("Alpha").unwrap();
        store.insert_device("B-2", Some("line end")).unwrap();
        store.insert_device("A-1", None).unwrap();

        let clients: Vec<String> = store.clients().unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(clients, vec!["Alpha", "Zeta"]);

        let devices = store.devices().unwrap();
        assert_eq!(devices[0].code, "A-1");
        assert_eq!(devices[0].description, "");
        assert_eq!(devices[1].description, "line end");
    }

    #[test]
    fn seeding_is_idempotent() {
        let store = Store::in_memory().unwrap();
        let seed = CatalogSeed {
            clients: vec!["ACME".into()],
            products: vec!["Widget".into(), "Gadget".into()],
            devices: vec![DeviceSeed {
                code: "DEV1".into(),
                description: Some("press 1".into()),
            }],
        };

        let first = store.seed_catalog(&seed).unwrap();
        assert_eq!(
            first,
            SeedReport {
                clients: 1,
                products: 2,
                devices: 1
            }
        );

        let second = store.seed_catalog(&seed).unwrap();
        assert_eq!(second, SeedReport::default());
        assert_eq!(store.products().unwrap().len(), 2);
    }

    #[test]
    fn unknown_code_resolves_to_none() {
        let store = Store::in_memory().unwrap();
        let id = store.insert_device("DEV1", None).unwrap();
        assert_eq!(store.device_id_by_code("DEV1").unwrap(), Some(id));
        assert_eq!(store.device_id_by_code("nope").unwrap(), None);
    }
}
