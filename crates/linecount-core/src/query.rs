// ── Query facade ──
//
// Read-only views for the control API: session detail with its running
// total and latest readings, the paginated session list, and catalog
// lookups.

use std::sync::Arc;

use crate::error::CoreError;
use crate::ledger::TelemetryLedger;
use crate::model::{
    Client, Device, Page, PageRequest, Product, SessionDetail, SessionId, SessionSummary,
};
use crate::store::Store;

/// How many readings a session detail carries.
pub const RECENT_READINGS: usize = 20;

pub struct QueryFacade {
    store: Store,
    ledger: Arc<TelemetryLedger>,
}

impl QueryFacade {
    pub fn new(store: Store, ledger: Arc<TelemetryLedger>) -> Self {
        Self { store, ledger }
    }

    /// Session detail; readings are the latest [`RECENT_READINGS`] in
    /// chronological order.
    pub fn get(&self, session_id: SessionId) -> Result<SessionDetail, CoreError> {
        let session = self
            .store
            .session(session_id)?
            .ok_or_else(|| CoreError::session_not_found(session_id))?;
        let total = self.ledger.aggregate_total(session_id)?;
        let mut recent_readings = self.ledger.recent(session_id, RECENT_READINGS)?;
        recent_readings.reverse();

        Ok(SessionDetail {
            session,
            total,
            recent_readings,
        })
    }

    /// Sessions newest first.
    pub fn list(&self, request: PageRequest) -> Result<Page<SessionSummary>, CoreError> {
        let rows = self.store.session_summaries(&request)?;
        Ok(Page {
            page: request.page(),
            size: request.size(),
            rows,
        })
    }

    pub fn clients(&self) -> Result<Vec<Client>, CoreError> {
        self.store.clients()
    }

    pub fn products(&self) -> Result<Vec<Product>, CoreError> {
        self.store.products()
    }

    pub fn devices(&self) -> Result<Vec<Device>, CoreError> {
        self.store.devices()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::directory::DeviceDirectory;
    use crate::model::{NewReading, SessionStatus};
    use crate::store::sessions::SessionRow;

    struct Fixture {
        store: Store,
        ledger: Arc<TelemetryLedger>,
        query: QueryFacade,
    }

    fn fixture() -> Fixture {
        let store = Store::in_memory().unwrap();
        store.insert_device("DEV1", None).unwrap();
        store.insert_client("ACME").unwrap();
        store.insert_product("Widget").unwrap();
        let ledger = Arc::new(TelemetryLedger::new(
            store.clone(),
            Arc::new(DeviceDirectory::new(store.clone())),
        ));
        Fixture {
            query: QueryFacade::new(store.clone(), Arc::clone(&ledger)),
            store,
            ledger,
        }
    }

    fn session(store: &Store) -> SessionId {
        store
            .insert_session(&SessionRow {
                client_id: 1,
                product_id: 1,
                lot: "L1",
                operator_id: 9,
                started_at: Utc::now(),
            })
            .unwrap()
    }

    #[test]
    fn detail_of_unknown_session_is_not_found() {
        let f = fixture();
        assert!(matches!(
            f.query.get(SessionId(77)),
            Err(CoreError::NotFound { entity_type: "session", .. })
        ));
    }

    #[test]
    fn detail_carries_total_and_latest_readings_oldest_first() {
        let f = fixture();
        let id = session(&f.store);
        let base = Utc.with_ymd_and_hms(2024, 3, 1, 6, 0, 0).unwrap();

        for i in 1..=25 {
            f.ledger
                .append(&NewReading::new(id, "DEV1", i).at(base + Duration::seconds(i)))
                .unwrap();
        }

        let detail = f.query.get(id).unwrap();
        assert_eq!(detail.total, (1..=25).sum::<i64>());
        assert_eq!(detail.session.status, SessionStatus::Active);
        assert_eq!(detail.recent_readings.len(), RECENT_READINGS);

        let increments: Vec<i64> = detail.recent_readings.iter().map(|r| r.increment).collect();
        assert_eq!(increments, (6..=25).collect::<Vec<_>>());
    }

    #[test]
    fn detail_serializes_with_api_field_names() {
        let f = fixture();
        let id = session(&f.store);
        f.ledger.append(&NewReading::new(id, "DEV1", 5)).unwrap();

        let json = serde_json::to_value(f.query.get(id).unwrap()).unwrap();
        assert_eq!(json["id"], id.get());
        assert_eq!(json["cliente_id"], 1);
        assert_eq!(json["lote"], "L1");
        assert_eq!(json["status"], "ativa");
        assert_eq!(json["total"], 5);
        assert!(json["fim"].is_null());
        assert_eq!(json["ultimas_leituras"][0]["contagem_incremental"], 5);
    }

    #[test]
    fn list_reports_names_and_totals() {
        let f = fixture();
        let first = session(&f.store);
        let second = session(&f.store);
        f.ledger.append(&NewReading::new(first, "DEV1", 3)).unwrap();

        let page = f.query.list(PageRequest::default()).unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.size, 20);
        assert_eq!(page.rows.len(), 2);
        assert_eq!(page.rows[0].id, second);
        assert_eq!(page.rows[0].total, 0);
        assert_eq!(page.rows[1].total, 3);
        assert_eq!(page.rows[1].client.as_deref(), Some("ACME"));
        assert_eq!(page.rows[1].product.as_deref(), Some("Widget"));
    }

    #[test]
    fn page_past_the_end_is_empty() {
        let f = fixture();
        session(&f.store);
        let page = f.query.list(PageRequest::new(5, 10)).unwrap();
        assert!(page.rows.is_empty());
        assert_eq!(page.page, 5);
    }

    #[test]
    fn catalog_lookups_pass_through() {
        let f = fixture();
        assert_eq!(f.query.clients().unwrap()[0].name, "ACME");
        assert_eq!(f.query.products().unwrap()[0].name, "Widget");
        assert_eq!(f.query.devices().unwrap()[0].code, "DEV1");
    }

    #[test]
    fn reads_survive_an_increment_that_would_overflow_the_total() {
        let f = fixture();
        let id = session(&f.store);

        f.ledger
            .append(&NewReading::new(id, "DEV1", i64::MAX))
            .unwrap();
        let err = f.ledger.append(&NewReading::new(id, "DEV1", 1)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidArgument { .. }));

        assert_eq!(f.query.get(id).unwrap().total, i64::MAX);
        let page = f.query.list(PageRequest::default()).unwrap();
        assert_eq!(page.rows[0].total, i64::MAX);
    }
}
