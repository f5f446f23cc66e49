use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

pub const MICROALGOS_PER_ALGO: u64 = 1_000_000;

/// Amount in the chain's smallest unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MicroAlgos(pub u64);

impl MicroAlgos {
    pub fn from_algos(algos: u64) -> Self {
        Self(algos.saturating_mul(MICROALGOS_PER_ALGO))
    }

    /// Display-unit string without trailing zeros: 2_500_000 -> "2.5".
    pub fn to_algos_string(self) -> String {
        let whole = self.0 / MICROALGOS_PER_ALGO;
        let frac = self.0 % MICROALGOS_PER_ALGO;
        if frac == 0 {
            return whole.to_string();
        }
        let frac = format!("{frac:06}");
        format!("{whole}.{}", frac.trim_end_matches('0'))
    }

    pub fn to_algos(self) -> BigDecimal {
        // The string form is always a plain decimal literal.
        BigDecimal::from_str(&self.to_algos_string()).unwrap_or_default()
    }
}

impl fmt::Display for MicroAlgos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_algos_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementKind {
    Deposit,
    Withdrawal,
}

impl StatementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatementKind::Deposit => "deposit",
            StatementKind::Withdrawal => "withdrawal",
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reconstructed call into the bank application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub id: String,
    pub round: u64,
    pub amount: BigDecimal, // Algos
    pub kind: StatementKind,
    pub sender: String,
    pub counterparty: String, // Application address
    pub timestamp: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositorRecord {
    pub address: String,
    pub balance: String, // Algos, decimal string
}

/// The account and bank application a view is built for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankTarget {
    pub account: Option<String>,
    pub app_id: Option<u64>,
}

impl BankTarget {
    pub fn new(account: Option<String>, app_id: Option<u64>) -> Self {
        Self {
            account: account.filter(|a| !a.trim().is_empty()),
            app_id: app_id.filter(|id| *id > 0),
        }
    }
}

#[async_trait::async_trait]
pub trait LedgerSource: Send + Sync {
    /// Every call `account` made into application `app_id`, decoded.
    async fn fetch_statements(&self, account: &str, app_id: u64) -> anyhow::Result<Vec<Statement>>;

    /// Full depositor roster of application `app_id`.
    async fn fetch_depositors(&self, app_id: u64) -> anyhow::Result<Vec<DepositorRecord>>;
}
