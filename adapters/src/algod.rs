//! Application box storage through algod.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use algoledger_core::config::Endpoint;

use crate::error::DecodeError;

const TOKEN_HEADER: &str = "X-Algo-API-Token";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BoxListResponse {
    #[serde(default)]
    pub boxes: Vec<BoxDescriptor>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BoxDescriptor {
    pub name: String, // base64
}

#[derive(Debug, Clone, Deserialize)]
pub struct BoxValueResponse {
    #[serde(default)]
    pub round: Option<u64>,
    pub value: String, // base64
}

impl BoxListResponse {
    pub fn names(&self) -> Result<Vec<Vec<u8>>, DecodeError> {
        self.boxes
            .iter()
            .map(|b| STANDARD.decode(&b.name).map_err(|_| DecodeError::Base64 { field: "box name" }))
            .collect()
    }
}

impl BoxValueResponse {
    pub fn bytes(&self) -> Result<Vec<u8>, DecodeError> {
        STANDARD
            .decode(&self.value)
            .map_err(|_| DecodeError::Base64 { field: "box value" })
    }
}

#[async_trait::async_trait]
pub trait BoxStore: Send + Sync {
    async fn box_names(&self, app_id: u64) -> anyhow::Result<Vec<Vec<u8>>>;
    async fn box_value(&self, app_id: u64, name: &[u8]) -> anyhow::Result<Vec<u8>>;
}

#[derive(Clone)]
pub struct AlgodClient {
    base: String,
    token: Option<String>,
    http: Client,
}

impl AlgodClient {
    pub fn new(endpoint: &Endpoint) -> Self {
        Self {
            base: endpoint.server.trim_end_matches('/').to_string(),
            token: endpoint.token.clone(),
            http: Client::new(),
        }
    }

    async fn get_text(&self, path: &str, query: &[(&str, String)]) -> anyhow::Result<String> {
        let mut req = self.http.get(format!("{}{}", self.base, path)).query(query);
        if let Some(token) = &self.token {
            req = req.header(TOKEN_HEADER, token);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(anyhow::anyhow!("algod_http_{}: {}", status.as_u16(), text));
        }
        Ok(text)
    }
}

#[async_trait::async_trait]
impl BoxStore for AlgodClient {
    async fn box_names(&self, app_id: u64) -> anyhow::Result<Vec<Vec<u8>>> {
        let text = self
            .get_text(&format!("/v2/applications/{}/boxes", app_id), &[])
            .await?;
        let body: BoxListResponse = serde_json::from_str(&text)?;
        debug!(app_id, count = body.boxes.len(), "box list fetched");
        Ok(body.names()?)
    }

    async fn box_value(&self, app_id: u64, name: &[u8]) -> anyhow::Result<Vec<u8>> {
        let name = format!("b64:{}", STANDARD.encode(name));
        let text = self
            .get_text(&format!("/v2/applications/{}/box", app_id), &[("name", name)])
            .await?;
        let body: BoxValueResponse = serde_json::from_str(&text)?;
        Ok(body.bytes()?)
    }
}
