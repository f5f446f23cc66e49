use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use algoledger_adapters::algod::{BoxListResponse, BoxStore, BoxValueResponse};
use algoledger_adapters::algorand::AlgorandAdapter;
use algoledger_adapters::indexer::{IndexerTransaction, TransactionSearch};
use algoledger_core::address::{application_address, encode_address};
use algoledger_core::models::{DepositorRecord, LedgerSource, StatementKind};
use serde_json::json;

const ACCOUNT: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAY5HFKQ";
const APP_ID: u64 = 1234;

struct FakeIndexer {
    txs: Vec<IndexerTransaction>,
}

#[async_trait::async_trait]
impl TransactionSearch for FakeIndexer {
    async fn search_app_calls(&self, address: &str, _limit: u32) -> anyhow::Result<Vec<IndexerTransaction>> {
        assert_eq!(address, ACCOUNT);
        Ok(self.txs.clone())
    }
}

#[derive(Default)]
struct FakeBoxes {
    values: Vec<(Vec<u8>, Vec<u8>)>,
    broken: Option<Vec<u8>>,
}

#[async_trait::async_trait]
impl BoxStore for FakeBoxes {
    async fn box_names(&self, _app_id: u64) -> anyhow::Result<Vec<Vec<u8>>> {
        Ok(self.values.iter().map(|(n, _)| n.clone()).collect())
    }

    async fn box_value(&self, _app_id: u64, name: &[u8]) -> anyhow::Result<Vec<u8>> {
        if self.broken.as_deref() == Some(name) {
            anyhow::bail!("algod_http_500: boom");
        }
        let values: HashMap<_, _> = self.values.iter().cloned().collect();
        values
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("algod_http_404: box not found"))
    }
}

fn adapter(txs: serde_json::Value, boxes: FakeBoxes) -> AlgorandAdapter {
    let txs: Vec<IndexerTransaction> = serde_json::from_value(txs).expect("Bad fixture");
    AlgorandAdapter::new(Arc::new(FakeIndexer { txs }), Arc::new(boxes), 100)
}

#[tokio::test]
async fn test_statements_keep_only_target_application() {
    let app = application_address(APP_ID);
    let adapter = adapter(
        json!([
            { "id": "OURS", "confirmed-round": 10, "application-transaction": { "application-id": APP_ID },
              "inner-txns": [ { "sender": app, "payment-transaction": { "amount": 4_000_000u64, "receiver": ACCOUNT } } ] },
            { "id": "OTHER", "confirmed-round": 11, "application-transaction": { "application-id": 999 } },
            { "id": "NOT_APPL", "confirmed-round": 12 }
        ]),
        FakeBoxes::default(),
    );

    let statements = adapter.fetch_statements(ACCOUNT, APP_ID).await.expect("Fetch failed");
    assert_eq!(statements.len(), 1);
    assert_eq!(statements[0].id, "OURS");
    assert_eq!(statements[0].kind, StatementKind::Withdrawal);
    assert_eq!(statements[0].amount.to_string(), "4");
    assert_eq!(statements[0].counterparty, app);
}

#[tokio::test]
async fn test_statements_fail_on_unresolvable_record() {
    let adapter = adapter(
        json!([{ "id": "NO_ROUND", "applicationTransaction": { "applicationId": APP_ID } }]),
        FakeBoxes::default(),
    );
    let err = adapter.fetch_statements(ACCOUNT, APP_ID).await.unwrap_err();
    assert!(err.to_string().contains("NO_ROUND"));
}

#[tokio::test]
async fn test_depositors_filter_key_length() {
    let boxes = FakeBoxes {
        values: vec![
            (vec![1u8; 32], 2_500_000u64.to_be_bytes().to_vec()),
            (b"global_total".to_vec(), 1u64.to_be_bytes().to_vec()),
            (vec![3u8; 31], 1u64.to_be_bytes().to_vec()),
            (vec![4u8; 33], 1u64.to_be_bytes().to_vec()),
            (vec![2u8; 32], 1_000_000u64.to_be_bytes().to_vec()),
        ],
        broken: None,
    };
    let adapter = adapter(json!([]), boxes);

    let roster = adapter.fetch_depositors(APP_ID).await.expect("Fetch failed");
    assert_eq!(
        roster,
        vec![
            DepositorRecord {
                address: encode_address(&[1u8; 32]),
                balance: "2.5".into()
            },
            DepositorRecord {
                address: encode_address(&[2u8; 32]),
                balance: "1".into()
            },
        ]
    );
}

#[tokio::test]
async fn test_depositors_all_or_nothing() {
    let good = vec![1u8; 32];
    let bad = vec![2u8; 32];
    let boxes = FakeBoxes {
        values: vec![
            (good, 1_000_000u64.to_be_bytes().to_vec()),
            (bad.clone(), 1_000_000u64.to_be_bytes().to_vec()),
        ],
        broken: Some(bad),
    };
    let adapter = adapter(json!([]), boxes);
    assert!(adapter.fetch_depositors(APP_ID).await.is_err());
}

#[tokio::test]
async fn test_depositors_short_value_aborts() {
    let boxes = FakeBoxes {
        values: vec![([1u8; 32].to_vec(), vec![0, 0, 1])],
        broken: None,
    };
    let adapter = adapter(json!([]), boxes);
    let err = adapter.fetch_depositors(APP_ID).await.unwrap_err();
    assert!(err.to_string().contains("expected at least 8"));
}

/// Earlier boxes answer later, and the peak number of concurrent requests is recorded.
struct SlowBoxes {
    names: Vec<Vec<u8>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl SlowBoxes {
    fn new(count: u8) -> Self {
        Self {
            names: (1..=count).map(|i| vec![i; 32]).collect(),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl BoxStore for SlowBoxes {
    async fn box_names(&self, _app_id: u64) -> anyhow::Result<Vec<Vec<u8>>> {
        Ok(self.names.clone())
    }

    async fn box_value(&self, _app_id: u64, name: &[u8]) -> anyhow::Result<Vec<u8>> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let index = name[0] as u64;
        let delay = (self.names.len() as u64 + 1 - index) * 10;
        tokio::time::sleep(Duration::from_millis(delay)).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok((index * 1_000_000).to_be_bytes().to_vec())
    }
}

#[tokio::test]
async fn test_depositors_keep_enumeration_order_with_bounded_fetches() {
    let boxes = Arc::new(SlowBoxes::new(6));
    let adapter = AlgorandAdapter::new(
        Arc::new(FakeIndexer { txs: vec![] }),
        boxes.clone(),
        100,
    )
    .with_box_concurrency(2);

    let roster = adapter.fetch_depositors(APP_ID).await.expect("Fetch failed");
    let addresses: Vec<_> = roster.iter().map(|r| r.address.clone()).collect();
    let expected: Vec<_> = (1..=6u8).map(|i| encode_address(&[i; 32])).collect();
    assert_eq!(addresses, expected);
    assert_eq!(roster[0].balance, "1");
    assert_eq!(roster[5].balance, "6");

    let peak = boxes.peak.load(Ordering::SeqCst);
    assert!(peak <= 2, "Peak in-flight box fetches was {}", peak);
    assert!(peak >= 1);
}

#[test]
fn test_algod_box_responses() {
    let list: BoxListResponse = serde_json::from_value(json!({
        "boxes": [ { "name": "AAAAAA==" }, { "name": "Z2xvYmFs" } ]
    }))
    .unwrap();
    let names = list.names().unwrap();
    assert_eq!(names, vec![vec![0u8, 0, 0, 0], b"global".to_vec()]);

    let value: BoxValueResponse = serde_json::from_value(json!({
        "name": "Z2xvYmFs", "round": 42, "value": "AAAAAAAmJaA="
    }))
    .unwrap();
    assert_eq!(value.round, Some(42));
    assert_eq!(value.bytes().unwrap(), 2_500_000u64.to_be_bytes().to_vec());

    let bad: BoxValueResponse = serde_json::from_value(json!({ "value": "!!" })).unwrap();
    assert!(bad.bytes().is_err());
}
