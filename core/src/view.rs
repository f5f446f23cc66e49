//! The published ledger view: two snapshots rebuilt on refresh.
//!
//! Each refresh fetches through a [`LedgerSource`] and swaps the snapshot
//! wholesale on success. A failed refresh is logged, surfaced as a
//! [`Notice`] and leaves the previous snapshot in place. Statement and
//! depositor refreshes never touch each other's snapshot.
//!
//! Concurrent refreshes of the same snapshot are not coordinated; whichever
//! finishes last is what readers see.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::models::{BankTarget, DepositorRecord, LedgerSource, Statement};

const MAX_NOTICES: usize = 100;

/// A failed refresh, as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub message: String,
}

impl Notice {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Where user-facing notices go.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Keeps the most recent notices in memory.
#[derive(Default)]
pub struct NoticeLog {
    notices: Mutex<VecDeque<Notice>>,
}

impl NoticeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recent(&self) -> Vec<Notice> {
        match self.notices.lock() {
            Ok(notices) => notices.iter().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().iter().cloned().collect(),
        }
    }

    pub fn drain(&self) -> Vec<Notice> {
        match self.notices.lock() {
            Ok(mut notices) => notices.drain(..).collect(),
            Err(poisoned) => poisoned.into_inner().drain(..).collect(),
        }
    }
}

impl Notifier for NoticeLog {
    fn notify(&self, notice: Notice) {
        let mut notices = match self.notices.lock() {
            Ok(n) => n,
            Err(poisoned) => poisoned.into_inner(),
        };
        if notices.len() == MAX_NOTICES {
            notices.pop_front();
        }
        notices.push_back(notice);
    }
}

pub struct LedgerView<S> {
    source: S,
    notifier: Arc<dyn Notifier>,
    target: RwLock<BankTarget>,
    statements: RwLock<Arc<[Statement]>>,
    depositors: RwLock<Arc<[DepositorRecord]>>,
}

impl<S: LedgerSource> LedgerView<S> {
    pub fn new(source: S, target: BankTarget, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            source,
            notifier,
            target: RwLock::new(target),
            statements: RwLock::new(Arc::from(Vec::new())),
            depositors: RwLock::new(Arc::from(Vec::new())),
        }
    }

    pub async fn target(&self) -> BankTarget {
        self.target.read().await.clone()
    }

    pub async fn statements(&self) -> Arc<[Statement]> {
        self.statements.read().await.clone()
    }

    pub async fn depositors(&self) -> Arc<[DepositorRecord]> {
        self.depositors.read().await.clone()
    }

    /// Switches account and/or application. Both views refresh when anything changed.
    pub async fn set_target(&self, target: BankTarget) -> bool {
        let changed = self.store_target(target).await;
        if changed {
            self.refresh_all().await;
        }
        changed
    }

    /// Records the new target without fetching. Returns whether it differs from the current one.
    pub async fn store_target(&self, target: BankTarget) -> bool {
        let mut current = self.target.write().await;
        if *current == target {
            return false;
        }
        info!(account = ?target.account, app_id = ?target.app_id, "ledger target changed");
        *current = target;
        true
    }

    pub async fn refresh_all(&self) {
        tokio::join!(self.refresh_statements(), self.refresh_depositors());
    }

    pub async fn refresh_statements(&self) {
        if let Err(e) = self.try_refresh_statements().await {
            error!("Error in refresh_statements: {:#}", e);
            self.notifier
                .notify(Notice::new(format!("Error loading statements: {:#}", e)));
        }
    }

    pub async fn refresh_depositors(&self) {
        if let Err(e) = self.try_refresh_depositors().await {
            error!("Error in refresh_depositors: {:#}", e);
            self.notifier
                .notify(Notice::new(format!("Error loading depositors: {:#}", e)));
        }
    }

    /// Returns the number of published statements, or 0 when the target is incomplete.
    pub async fn try_refresh_statements(&self) -> anyhow::Result<usize> {
        let (account, app_id) = match self.target().await {
            BankTarget {
                account: Some(account),
                app_id: Some(app_id),
            } => (account, app_id),
            _ => {
                debug!("statement refresh skipped, no account or app id");
                return Ok(0);
            }
        };

        let mut statements = self
            .source
            .fetch_statements(&account, app_id)
            .await
            .with_context(|| format!("fetching statements of {} for app {}", account, app_id))?;

        // Stable: equal rounds keep decoder order.
        statements.sort_by(|a, b| b.round.cmp(&a.round));

        let count = statements.len();
        *self.statements.write().await = Arc::from(statements);
        info!(app_id, count, "statements refreshed");
        Ok(count)
    }

    pub async fn try_refresh_depositors(&self) -> anyhow::Result<usize> {
        let Some(app_id) = self.target().await.app_id else {
            debug!("depositor refresh skipped, no app id");
            return Ok(0);
        };

        let depositors = self
            .source
            .fetch_depositors(app_id)
            .await
            .with_context(|| format!("fetching depositors of app {}", app_id))?;

        let count = depositors.len();
        *self.depositors.write().await = Arc::from(depositors);
        info!(app_id, count, "depositors refreshed");
        Ok(count)
    }
}
