//! HTTP control API and the `serve` lifecycle.
//!
//! `serve` opens the store, seeds the catalog, binds the listener, starts
//! the MQTT transport and the ingestion task, then serves the router until
//! ctrl-c or SIGTERM.
//! Shutdown cancels ingestion and the transport through one token.

mod body;
mod error;
mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use linecount_config::Config;
use linecount_core::{LineService, Store};
use linecount_transport::{MqttTransport, ReconnectConfig};

use crate::error::CliError;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub service: LineService,
    pub mqtt_host: Arc<str>,
}

/// Build the control API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/clientes", get(handlers::clients))
        .route("/produtos", get(handlers::products))
        .route("/dispositivos", get(handlers::devices))
        .route(
            "/sessoes",
            get(handlers::list_sessions).post(handlers::create_session),
        )
        .route("/sessoes/:id", get(handlers::get_session))
        .route("/sessoes/:id/finalizar", post(handlers::finalize_session))
        .route("/leituras", post(handlers::add_reading))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Run the service until a shutdown signal arrives.
pub async fn serve(config: &Config) -> Result<(), CliError> {
    let addr = config.bind_addr()?;
    let namespace = config.namespace();

    let store = Store::open(&config.database.path)?;
    let seed = config.catalog_seed();
    if !seed.is_empty() {
        let report = store.seed_catalog(&seed)?;
        info!(
            clients = report.clients,
            products = report.products,
            devices = report.devices,
            "catalog seeded"
        );
    }

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| CliError::Bind {
            addr: addr.to_string(),
            source: e,
        })?;
    info!(%addr, database = %config.database.path.display(), "control API listening");

    let cancel = CancellationToken::new();
    let mut transport = MqttTransport::start(
        &config.mqtt_config(),
        &namespace,
        ReconnectConfig::default(),
        cancel.clone(),
    )
    .map_err(linecount_core::CoreError::from)?;
    let inbound = transport
        .take_inbound()
        .ok_or_else(|| CliError::Internal("transport inbound already taken".into()))?;

    let service = LineService::new(store, namespace, transport.outbound());
    let ingest = service.spawn_ingestor(inbound, cancel.clone());

    let app = router(AppState {
        service,
        mqtt_host: Arc::from(config.mqtt.host.as_str()),
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await?;

    cancel.cancel();
    if let Err(e) = ingest.await {
        error!(error = %e, "ingestion task failed");
    }
    transport.shutdown().await;
    info!("shutdown complete");
    Ok(())
}

/// Resolves on ctrl-c, SIGTERM, or when `cancel` fires elsewhere.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "ctrl-c handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
        () = cancel.cancelled() => {}
    }
    info!("shutdown requested");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use linecount_transport::{InboundMessage, Namespace, OutboundMessage};
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    use super::*;

    struct Harness {
        app: Router,
        service: LineService,
        outbound: mpsc::Receiver<OutboundMessage>,
    }

    fn harness() -> Harness {
        let store = Store::in_memory().unwrap();
        store.insert_client("ACME").unwrap();
        store.insert_product("Widget").unwrap();
        store.insert_device("DEV1", Some("press 1")).unwrap();

        let (tx, outbound) = mpsc::channel(16);
        let service = LineService::new(store, Namespace::default(), tx);
        let app = router(AppState {
            service: service.clone(),
            mqtt_host: Arc::from("broker.test"),
        });
        Harness {
            app,
            service,
            outbound,
        }
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.map_or_else(Body::empty, |b| Body::from(b.to_owned())))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn create(h: &Harness) -> i64 {
        let (status, body) = call(
            &h.app,
            "POST",
            "/sessoes",
            Some(r#"{"cliente_id":1,"produto_id":1,"operador_id":7,"dispositivo_codigo":"DEV1","lote":"L1"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["sessao_id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn create_session_returns_id_and_sends_start() {
        let mut h = harness();
        let id = create(&h).await;

        let message = h.outbound.try_recv().unwrap();
        assert_eq!(message.topic, "factory/default/line/1/device/DEV1/cmd");
        let command: Value = serde_json::from_slice(&message.payload).unwrap();
        assert_eq!(command, json!({"action": "start", "sessao_id": id}));

        let (status, detail) = call(&h.app, "GET", &format!("/sessoes/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(detail["status"], "ativa");
        assert_eq!(detail["lote"], "L1");
        assert_eq!(detail["operador_id"], 7);
        assert_eq!(detail["total"], 0);
        assert!(detail["fim"].is_null());
    }

    #[tokio::test]
    async fn create_accepts_numeric_strings() {
        let h = harness();
        let (status, body) = call(
            &h.app,
            "POST",
            "/sessoes",
            Some(r#"{"cliente_id":"1","produto_id":"1","operador_id":"2","dispositivo_codigo":" DEV1 "}"#),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let id = body["sessao_id"].as_i64().unwrap();
        let (_, detail) = call(&h.app, "GET", &format!("/sessoes/{id}"), None).await;
        assert_eq!(detail["lote"], "default");
    }

    #[tokio::test]
    async fn create_rejects_bad_input() {
        let h = harness();
        let cases = [
            ("{not json", "invalid JSON"),
            (r#"{"cliente_id":1}"#, "missing required fields"),
            (
                r#"{"cliente_id":"x","produto_id":1,"operador_id":1,"dispositivo_codigo":"DEV1"}"#,
                "cliente_id",
            ),
            (
                r#"{"cliente_id":1,"produto_id":1,"operador_id":1,"dispositivo_codigo":"NOPE"}"#,
                "NOPE",
            ),
        ];
        for (body, needle) in cases {
            let (status, response) = call(&h.app, "POST", "/sessoes", Some(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
            assert!(
                response["error"].as_str().unwrap().contains(needle),
                "{body} -> {response}"
            );
        }
        let (_, page) = call(&h.app, "GET", "/sessoes", None).await;
        assert_eq!(page["rows"], json!([]));
    }

    #[tokio::test]
    async fn manual_reading_raises_total() {
        let h = harness();
        let id = create(&h).await;

        let (status, body) = call(
            &h.app,
            "POST",
            "/leituras",
            Some(&format!(
                r#"{{"sessao_id":{id},"device_code":"DEV1","inc":5,"ts":"2024-05-01T08:00:00Z"}}"#
            )),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"ok": true, "sessao_id": id, "inc": 5}));

        let (_, detail) = call(&h.app, "GET", &format!("/sessoes/{id}"), None).await;
        assert_eq!(detail["total"], 5);
        assert_eq!(detail["ultimas_leituras"][0]["contagem_incremental"], 5);
    }

    #[tokio::test]
    async fn reading_errors_map_to_status_codes() {
        let h = harness();
        let id = create(&h).await;

        let cases = [
            (format!(r#"{{"sessao_id":{id},"device_code":"DEV1","inc":0}}"#), StatusCode::BAD_REQUEST),
            (format!(r#"{{"sessao_id":{id},"device_code":"DEV1","inc":-2}}"#), StatusCode::BAD_REQUEST),
            (r#"{"device_code":"DEV1","inc":1}"#.to_owned(), StatusCode::BAD_REQUEST),
            (format!(r#"{{"sessao_id":{id},"device_code":"DEV1","inc":"lots"}}"#), StatusCode::BAD_REQUEST),
            (r#"{"sessao_id":9999,"device_code":"DEV1","inc":1}"#.to_owned(), StatusCode::NOT_FOUND),
            (format!(r#"{{"sessao_id":{id},"device_code":"GHOST","inc":1}}"#), StatusCode::BAD_REQUEST),
        ];
        for (body, expected) in cases {
            let (status, _) = call(&h.app, "POST", "/leituras", Some(&body)).await;
            assert_eq!(status, expected, "{body}");
        }

        let (_, detail) = call(&h.app, "GET", &format!("/sessoes/{id}"), None).await;
        assert_eq!(detail["total"], 0);
    }

    #[tokio::test]
    async fn finalize_without_device_code_changes_nothing() {
        let mut h = harness();
        let id = create(&h).await;
        let _start = h.outbound.try_recv().unwrap();

        let (status, body) = call(
            &h.app,
            "POST",
            &format!("/sessoes/{id}/finalizar"),
            Some(r#"{"dispositivo_codigo":"  "}"#),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
        assert!(h.outbound.try_recv().is_err());

        let (_, detail) = call(&h.app, "GET", &format!("/sessoes/{id}"), None).await;
        assert_eq!(detail["status"], "ativa");
        assert!(detail["fim"].is_null());
    }

    #[tokio::test]
    async fn finalize_sets_status_and_sends_stop() {
        let mut h = harness();
        let id = create(&h).await;
        let _start = h.outbound.try_recv().unwrap();

        let (status, body) = call(
            &h.app,
            "POST",
            &format!("/sessoes/{id}/finalizar"),
            Some(r#"{"dispositivo_codigo":"DEV1"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"ok": true}));

        let stop: Value = serde_json::from_slice(&h.outbound.try_recv().unwrap().payload).unwrap();
        assert_eq!(stop, json!({"action": "stop", "sessao_id": id}));

        let (_, detail) = call(&h.app, "GET", &format!("/sessoes/{id}"), None).await;
        assert_eq!(detail["status"], "finalizada");
        assert!(detail["fim"].is_string());
    }

    #[tokio::test]
    async fn finalize_unknown_session_is_ok() {
        let h = harness();
        let (status, _) = call(
            &h.app,
            "POST",
            "/sessoes/4040/finalizar",
            Some(r#"{"dispositivo_codigo":"DEV1"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(&h.app, "GET", "/sessoes/4040", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn list_paginates_and_clamps() {
        let h = harness();
        for _ in 0..3 {
            create(&h).await;
        }

        let (_, page) = call(&h.app, "GET", "/sessoes?page=1&size=2", None).await;
        assert_eq!(page["page"], 1);
        assert_eq!(page["size"], 2);
        assert_eq!(page["rows"].as_array().unwrap().len(), 2);
        assert_eq!(page["rows"][0]["cliente"], "ACME");
        assert_eq!(page["rows"][0]["produto"], "Widget");

        let (_, page) = call(&h.app, "GET", "/sessoes?page=0&size=999", None).await;
        assert_eq!((page["page"].clone(), page["size"].clone()), (json!(1), json!(100)));

        let (_, page) = call(&h.app, "GET", "/sessoes?page=abc", None).await;
        assert_eq!((page["page"].clone(), page["size"].clone()), (json!(1), json!(20)));
    }

    #[tokio::test]
    async fn catalog_lookups_use_api_names() {
        let h = harness();
        let (_, clients) = call(&h.app, "GET", "/clientes", None).await;
        assert_eq!(clients, json!([{"id": 1, "nome": "ACME"}]));

        let (_, devices) = call(&h.app, "GET", "/dispositivos", None).await;
        assert_eq!(devices[0]["codigo"], "DEV1");
        assert_eq!(devices[0]["descricao"], "press 1");

        let (_, products) = call(&h.app, "GET", "/produtos", None).await;
        assert_eq!(products[0]["nome"], "Widget");
    }

    #[tokio::test]
    async fn device_counts_flow_through_to_session_detail() {
        let h = harness();
        let id = create(&h).await;
        let ingestor = h.service.ingestor();

        for body in [
            format!(r#"{{"type":"count_delta","sessionId":{id},"delta":5}}"#),
            format!(r#"{{"type":"count_delta","sessionId":{id},"delta":-3}}"#),
        ] {
            ingestor.handle(&InboundMessage::new(
                "factory/default/line/1/device/DEV1/event",
                body,
            ));
        }

        let (_, detail) = call(&h.app, "GET", &format!("/sessoes/{id}"), None).await;
        assert_eq!(detail["total"], 5);

        let (status, health) = call(&h.app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(health["ok"], true);
        assert_eq!(health["mqtt_host"], "broker.test");
        assert_eq!(health["database"], ":memory:");
        assert_eq!(health["ingest"]["accepted"], 1);
        assert_eq!(health["ingest"]["dropped"]["rejected"], 1);
    }
}
