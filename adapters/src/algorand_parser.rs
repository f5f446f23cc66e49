use algoledger_core::address::{encode_address, PUBLIC_KEY_LEN};
use algoledger_core::models::{DepositorRecord, MicroAlgos, Statement, StatementKind};

use crate::error::DecodeError;
use crate::indexer::AppCallRecord;

/// Amount shown when a call moved no funds through an inner payment.
pub const PLACEHOLDER_AMOUNT: MicroAlgos = MicroAlgos(1_000_000);

const WITHDRAW_MARKER: &str = "withdraw";

/// One statement per record. `records` must already be limited to calls into the bank application.
pub fn parse_statements(records: &[AppCallRecord], account: &str, app_address: &str) -> Vec<Statement> {
    records
        .iter()
        .map(|record| parse_statement(record, account, app_address))
        .collect()
}

pub fn parse_statement(record: &AppCallRecord, account: &str, app_address: &str) -> Statement {
    let mut amount = PLACEHOLDER_AMOUNT;
    let mut kind = StatementKind::Deposit;

    if record
        .logs
        .iter()
        .any(|line| line.mentions(WITHDRAW_MARKER))
    {
        kind = StatementKind::Withdrawal;
    }

    if let Some(payment) = &record.first_payment {
        amount = payment.amount;
        if payment.sender == app_address && payment.receiver == account {
            kind = StatementKind::Withdrawal;
        }
    }

    Statement {
        id: record.id.clone(),
        round: record.round,
        amount: amount.to_algos(),
        kind,
        sender: record.sender.clone(),
        counterparty: app_address.to_string(),
        timestamp: record.timestamp,
    }
}

/// Address encoded in a box name, if the name has the depositor layout.
pub fn depositor_address(name: &[u8]) -> Option<String> {
    let key: &[u8; PUBLIC_KEY_LEN] = name.try_into().ok()?;
    Some(encode_address(key))
}

/// Balance stored in a depositor box: big-endian u64 microAlgos in the first 8 bytes.
pub fn decode_balance(name: &[u8], value: &[u8]) -> Result<MicroAlgos, DecodeError> {
    let head: [u8; 8] = value
        .get(..8)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| DecodeError::ShortBoxValue {
            name: depositor_address(name).unwrap_or_else(|| format!("{:02x?}", name)),
            len: value.len(),
        })?;
    Ok(MicroAlgos(u64::from_be_bytes(head)))
}

pub fn parse_depositor(name: &[u8], value: &[u8]) -> Result<Option<DepositorRecord>, DecodeError> {
    let Some(address) = depositor_address(name) else {
        return Ok(None);
    };
    let balance = decode_balance(name, value)?;
    Ok(Some(DepositorRecord {
        address,
        balance: balance.to_algos_string(),
    }))
}
