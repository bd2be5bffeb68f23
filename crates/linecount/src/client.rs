// HTTP client for a running linecount control API.
//
// Used by the operator subcommands. Response bodies deserialize straight
// into the core model types the server serializes.

use std::time::Duration;

use linecount_core::{Client, Device, Page, Product, SessionDetail, SessionSummary};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::debug;
use url::Url;

// ── Error ────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid API URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("could not reach {url}")]
    Connection {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("unexpected response body: {message}")]
    Decode { message: String },
}

/// `{"error": "..."}` as returned by the control API.
#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

// ── Response shapes ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Created {
    pub sessao_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingAck {
    pub ok: bool,
    pub sessao_id: i64,
    pub inc: i64,
}

/// Request body for `POST /sessoes`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateSession {
    pub cliente_id: i64,
    pub produto_id: i64,
    pub operador_id: i64,
    pub dispositivo_codigo: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lote: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────

pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let mut url = Url::parse(base_url).map_err(|e| ClientError::InvalidUrl {
            url: base_url.into(),
            reason: e.to_string(),
        })?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Connection {
                url: base_url.into(),
                source: e,
            })?;
        Ok(Self {
            http,
            base_url: url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Endpoints ────────────────────────────────────────────────────

    pub async fn create_session(&self, body: &CreateSession) -> Result<Created, ClientError> {
        self.post("sessoes", body).await
    }

    pub async fn finalize_session(&self, id: i64, device_code: &str) -> Result<(), ClientError> {
        let _: Value = self
            .post(
                &format!("sessoes/{id}/finalizar"),
                &json!({ "dispositivo_codigo": device_code }),
            )
            .await?;
        Ok(())
    }

    pub async fn session(&self, id: i64) -> Result<SessionDetail, ClientError> {
        self.get(&format!("sessoes/{id}"), &[]).await
    }

    pub async fn sessions(&self, page: i64, size: i64) -> Result<Page<SessionSummary>, ClientError> {
        self.get(
            "sessoes",
            &[("page", page.to_string()), ("size", size.to_string())],
        )
        .await
    }

    pub async fn add_reading(
        &self,
        session_id: i64,
        device_code: &str,
        inc: i64,
        ts: Option<&str>,
    ) -> Result<ReadingAck, ClientError> {
        let mut body = json!({
            "sessao_id": session_id,
            "device_code": device_code,
            "inc": inc,
        });
        if let Some(ts) = ts {
            body["ts"] = Value::from(ts);
        }
        self.post("leituras", &body).await
    }

    pub async fn clients(&self) -> Result<Vec<Client>, ClientError> {
        self.get("clientes", &[]).await
    }

    pub async fn products(&self) -> Result<Vec<Product>, ClientError> {
        self.get("produtos", &[]).await
    }

    pub async fn devices(&self) -> Result<Vec<Device>, ClientError> {
        self.get("dispositivos", &[]).await
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::InvalidUrl {
                url: format!("{}{path}", self.base_url),
                reason: e.to_string(),
            })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, ClientError> {
        let url = self.url(path)?;
        debug!("GET {url} params={params:?}");

        let resp = self
            .http
            .get(url.clone())
            .query(params)
            .send()
            .await
            .map_err(|e| connection(&url, e))?;
        handle_response(resp).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let url = self.url(path)?;
        debug!("POST {url}");

        let resp = self
            .http
            .post(url.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| connection(&url, e))?;
        handle_response(resp).await
    }
}

fn connection(url: &Url, source: reqwest::Error) -> ClientError {
    ClientError::Connection {
        url: url.to_string(),
        source,
    }
}

async fn handle_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ClientError> {
    let status = resp.status();
    let body = resp.text().await.map_err(|e| ClientError::Decode {
        message: e.to_string(),
    })?;

    if !status.is_success() {
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.error)
            .unwrap_or_else(|_| {
                if body.is_empty() {
                    status.to_string()
                } else {
                    body.clone()
                }
            });
        return Err(ClientError::Status {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_str(&body).map_err(|e| {
        let preview: String = body.chars().take(200).collect();
        ClientError::Decode {
            message: format!("{e} (body preview: {preview:?})"),
        }
    })
}
