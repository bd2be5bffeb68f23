// ── Line service ──
//
// Wires the directory, registry, ledger, query facade and ingestor around
// one store and one transport queue. This is what the HTTP layer holds.

use std::sync::Arc;

use linecount_transport::{InboundMessage, Namespace, OutboundMessage};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::command::CommandPublisher;
use crate::directory::DeviceDirectory;
use crate::ingest::{EventIngestor, IngestStats};
use crate::ledger::TelemetryLedger;
use crate::query::QueryFacade;
use crate::registry::SessionRegistry;
use crate::store::Store;

// ── LineService ──────────────────────────────────────────────────

/// Entry point for the control API and the ingestion task.
///
/// Cheaply cloneable via `Arc<ServiceInner>`.
#[derive(Clone)]
pub struct LineService {
    inner: Arc<ServiceInner>,
}

struct ServiceInner {
    store: Store,
    namespace: Namespace,
    directory: Arc<DeviceDirectory>,
    ledger: Arc<TelemetryLedger>,
    registry: SessionRegistry,
    query: QueryFacade,
    publisher: CommandPublisher,
    stats: Arc<IngestStats>,
}

impl LineService {
    /// Build the service. Commands go to `outbound`; nothing is consumed
    /// until [`spawn_ingestor`](Self::spawn_ingestor) is called.
    pub fn new(store: Store, namespace: Namespace, outbound: mpsc::Sender<OutboundMessage>) -> Self {
        let directory = Arc::new(DeviceDirectory::new(store.clone()));
        let ledger = Arc::new(TelemetryLedger::new(store.clone(), Arc::clone(&directory)));
        let publisher = CommandPublisher::new(namespace.clone(), outbound);
        let registry =
            SessionRegistry::new(store.clone(), Arc::clone(&directory), publisher.clone());
        let query = QueryFacade::new(store.clone(), Arc::clone(&ledger));

        Self {
            inner: Arc::new(ServiceInner {
                store,
                namespace,
                directory,
                ledger,
                registry,
                query,
                publisher,
                stats: Arc::new(IngestStats::default()),
            }),
        }
    }

    pub fn store(&self) -> &Store {
        &self.inner.store
    }

    pub fn namespace(&self) -> &Namespace {
        &self.inner.namespace
    }

    pub fn directory(&self) -> &DeviceDirectory {
        &self.inner.directory
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.inner.registry
    }

    pub fn ledger(&self) -> &TelemetryLedger {
        &self.inner.ledger
    }

    pub fn query(&self) -> &QueryFacade {
        &self.inner.query
    }

    pub fn publisher(&self) -> &CommandPublisher {
        &self.inner.publisher
    }

    pub fn ingest_stats(&self) -> &IngestStats {
        &self.inner.stats
    }

    // ── Ingestion ────────────────────────────────────────────────

    /// An ingestor sharing this service's directory, ledger and counters.
    pub fn ingestor(&self) -> EventIngestor {
        EventIngestor::new(
            self.inner.namespace.clone(),
            Arc::clone(&self.inner.directory),
            Arc::clone(&self.inner.ledger),
            Arc::clone(&self.inner.stats),
        )
    }

    /// Run the ingestor on its own task until `inbound` closes or `cancel`
    /// fires.
    pub fn spawn_ingestor(
        &self,
        inbound: mpsc::Receiver<InboundMessage>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(self.ingestor().run(inbound, cancel))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::model::{NewSession, SessionStatus};

    fn service() -> (LineService, mpsc::Receiver<OutboundMessage>) {
        let store = Store::in_memory().unwrap();
        store.insert_device("DEV1", None).unwrap();
        let (tx, rx) = mpsc::channel(8);
        (LineService::new(store, Namespace::default(), tx), rx)
    }

    #[tokio::test]
    async fn command_loop_end_to_end() {
        let (service, mut outbound) = service();
        let (inbound_tx, inbound_rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let task = service.spawn_ingestor(inbound_rx, cancel.clone());

        let created = service
            .registry()
            .create(&NewSession {
                client_id: 1,
                product_id: 1,
                operator_id: 1,
                lot: Some("L1".into()),
                device_code: "DEV1".into(),
            })
            .unwrap();
        let start = outbound.recv().await.unwrap();
        assert!(start.topic.ends_with("/device/DEV1/cmd"));

        let body = format!(
            r#"{{"type":"count_delta","sessionId":{},"delta":5}}"#,
            created.session_id
        );
        inbound_tx
            .send(InboundMessage::new(
                "factory/default/line/1/device/DEV1/event",
                body,
            ))
            .await
            .unwrap();

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while service.ingest_stats().snapshot().accepted < 1
            && tokio::time::Instant::now() < deadline
        {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let detail = service.query().get(created.session_id).unwrap();
        assert_eq!(detail.total, 5);
        assert_eq!(detail.recent_readings.len(), 1);

        service.registry().finalize(created.session_id, "DEV1").unwrap();
        assert_eq!(
            service.query().get(created.session_id).unwrap().session.status,
            SessionStatus::Finalized
        );

        cancel.cancel();
        task.await.unwrap();
    }
}
