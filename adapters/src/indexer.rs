//! Indexer transaction search.
//!
//! The indexer has shipped two spellings for the same fields (camelCase from
//! the SDK models, kebab-case from the REST API). Round and round time are
//! modelled as two explicit optional fields each; nested objects accept both
//! spellings through aliases. [`IndexerTransaction::resolve`] collapses all of
//! it into one [`AppCallRecord`], the only shape the decoders see.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use algoledger_core::config::Endpoint;
use algoledger_core::models::MicroAlgos;

use crate::error::DecodeError;

const TOKEN_HEADER: &str = "X-Indexer-API-Token";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionSearchResponse {
    #[serde(default)]
    pub transactions: Vec<IndexerTransaction>,
    #[serde(default, rename = "nextToken", alias = "next-token")]
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IndexerTransaction {
    pub id: String,
    #[serde(default)]
    pub sender: String,

    #[serde(default, rename = "confirmedRound")]
    pub confirmed_round: Option<u64>,
    #[serde(default, rename = "confirmed-round")]
    pub confirmed_round_legacy: Option<u64>,

    #[serde(default, rename = "roundTime")]
    pub round_time: Option<u64>,
    #[serde(default, rename = "round-time")]
    pub round_time_legacy: Option<u64>,

    #[serde(default)]
    pub logs: Vec<String>,
    #[serde(default, rename = "innerTxns", alias = "inner-txns")]
    pub inner_txns: Vec<InnerTransaction>,
    #[serde(default, rename = "applicationTransaction", alias = "application-transaction")]
    pub application_transaction: Option<ApplicationFields>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InnerTransaction {
    #[serde(default)]
    pub sender: String,
    #[serde(default, rename = "paymentTransaction", alias = "payment-transaction")]
    pub payment_transaction: Option<PaymentFields>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentFields {
    #[serde(default)]
    pub amount: u64,
    #[serde(default)]
    pub receiver: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplicationFields {
    #[serde(default, rename = "applicationId", alias = "application-id")]
    pub application_id: u64,
}

/// First inner payment of an application call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerPayment {
    pub sender: String,
    pub receiver: String,
    pub amount: MicroAlgos,
}

/// A log line as the indexer returned it, plus its base64 decoding when it has one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub raw: String,
    pub decoded: Option<String>,
}

impl LogLine {
    pub fn new(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            decoded: decode_log(raw),
        }
    }

    /// Case-insensitive match against either form; plain text can also be valid base64.
    pub fn mentions(&self, marker: &str) -> bool {
        let marker = marker.to_lowercase();
        self.raw.to_lowercase().contains(&marker)
            || self
                .decoded
                .as_deref()
                .is_some_and(|text| text.to_lowercase().contains(&marker))
    }
}

/// Canonical application call, resolved from an [`IndexerTransaction`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppCallRecord {
    pub id: String,
    pub sender: String,
    pub round: u64,
    pub timestamp: Option<u64>,
    pub application_id: Option<u64>,
    pub logs: Vec<LogLine>,
    pub first_payment: Option<InnerPayment>,
}

impl IndexerTransaction {
    pub fn application_id(&self) -> Option<u64> {
        self.application_transaction.as_ref().map(|a| a.application_id)
    }

    pub fn resolve(self) -> Result<AppCallRecord, DecodeError> {
        let round = self
            .confirmed_round
            .or(self.confirmed_round_legacy)
            .ok_or_else(|| DecodeError::MissingRound { id: self.id.clone() })?;
        let application_id = self.application_id();

        let first_payment = self.inner_txns.into_iter().find_map(|inner| {
            inner.payment_transaction.map(|pay| InnerPayment {
                sender: inner.sender,
                receiver: pay.receiver,
                amount: MicroAlgos(pay.amount),
            })
        });

        Ok(AppCallRecord {
            id: self.id,
            sender: self.sender,
            round,
            timestamp: self.round_time.or(self.round_time_legacy),
            application_id,
            logs: self.logs.iter().map(|l| LogLine::new(l)).collect(),
            first_payment,
        })
    }
}

/// Logs come base64 encoded from the REST API; `None` when the line is not base64.
pub fn decode_log(raw: &str) -> Option<String> {
    STANDARD
        .decode(raw)
        .ok()
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
}

#[async_trait::async_trait]
pub trait TransactionSearch: Send + Sync {
    /// Application calls involving `address`, newest page first.
    async fn search_app_calls(&self, address: &str, limit: u32) -> anyhow::Result<Vec<IndexerTransaction>>;
}

#[derive(Clone)]
pub struct IndexerClient {
    base: String,
    token: Option<String>,
    http: Client,
}

impl IndexerClient {
    pub fn new(endpoint: &Endpoint) -> Self {
        Self {
            base: endpoint.server.trim_end_matches('/').to_string(),
            token: endpoint.token.clone(),
            http: Client::new(),
        }
    }

    #[inline]
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }
}

#[async_trait::async_trait]
impl TransactionSearch for IndexerClient {
    async fn search_app_calls(&self, address: &str, limit: u32) -> anyhow::Result<Vec<IndexerTransaction>> {
        let mut req = self.http.get(self.url("/v2/transactions")).query(&[
            ("address", address.to_string()),
            ("tx-type", "appl".to_string()),
            ("limit", limit.to_string()),
        ]);
        if let Some(token) = &self.token {
            req = req.header(TOKEN_HEADER, token);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(anyhow::anyhow!("indexer_http_{}: {}", status.as_u16(), text));
        }

        let body: TransactionSearchResponse = serde_json::from_str(&text)?;
        debug!(address, count = body.transactions.len(), "indexer search done");
        Ok(body.transactions)
    }
}
