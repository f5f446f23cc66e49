use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, info};

use algoledger_core::address::{application_address, PUBLIC_KEY_LEN};
use algoledger_core::config::{Config, DEFAULT_BOX_FETCH_CONCURRENCY};
use algoledger_core::models::{DepositorRecord, LedgerSource, Statement};

use crate::algod::{AlgodClient, BoxStore};
use crate::algorand_parser::{parse_depositor, parse_statements};
use crate::indexer::{AppCallRecord, IndexerClient, TransactionSearch};

pub struct AlgorandAdapter {
    search: Arc<dyn TransactionSearch>,
    boxes: Arc<dyn BoxStore>,
    search_limit: u32,
    box_concurrency: usize,
}

impl AlgorandAdapter {
    pub fn new(search: Arc<dyn TransactionSearch>, boxes: Arc<dyn BoxStore>, search_limit: u32) -> Self {
        Self {
            search,
            boxes,
            search_limit,
            box_concurrency: DEFAULT_BOX_FETCH_CONCURRENCY,
        }
    }

    /// Caps the number of box value requests in flight. Zero is treated as one.
    pub fn with_box_concurrency(mut self, limit: usize) -> Self {
        self.box_concurrency = limit.max(1);
        self
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(IndexerClient::new(&config.indexer)),
            Arc::new(AlgodClient::new(&config.algod)),
            config.search_limit,
        )
        .with_box_concurrency(config.box_fetch_concurrency)
    }
}

#[async_trait::async_trait]
impl LedgerSource for AlgorandAdapter {
    async fn fetch_statements(&self, account: &str, app_id: u64) -> anyhow::Result<Vec<Statement>> {
        let txs = self.search.search_app_calls(account, self.search_limit).await?;
        let total = txs.len();

        let records = txs
            .into_iter()
            .filter(|t| t.application_id() == Some(app_id))
            .map(|t| t.resolve())
            .collect::<Result<Vec<AppCallRecord>, _>>()?;
        debug!(account, app_id, total, matched = records.len(), "application calls filtered");

        let app_address = application_address(app_id);
        Ok(parse_statements(&records, account, &app_address))
    }

    async fn fetch_depositors(&self, app_id: u64) -> anyhow::Result<Vec<DepositorRecord>> {
        let names = self.boxes.box_names(app_id).await?;
        let total = names.len();
        let names: Vec<Vec<u8>> = names
            .into_iter()
            .filter(|n| n.len() == PUBLIC_KEY_LEN)
            .collect();

        // Results come back in enumeration order. Any failed fetch or decode fails the whole roster.
        let depositors: Vec<Option<DepositorRecord>> = stream::iter(names)
            .map(|name| async move {
                let value = self.boxes.box_value(app_id, &name).await?;
                Ok::<_, anyhow::Error>(parse_depositor(&name, &value)?)
            })
            .buffered(self.box_concurrency)
            .try_collect()
            .await?;

        let depositors: Vec<DepositorRecord> = depositors.into_iter().flatten().collect();
        info!(app_id, total, depositors = depositors.len(), "depositor boxes decoded");
        Ok(depositors)
    }
}
