use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use algoledger_adapters::algorand::AlgorandAdapter;
use algoledger_core::address::is_valid_address;
use algoledger_core::config::{Config, Network};
use algoledger_core::explorer::{explorer_url, ExplorerKind};
use algoledger_core::models::{BankTarget, DepositorRecord, Statement};
use algoledger_core::view::{LedgerView, Notice, NoticeLog};

// Shared by every handler; the view is the only owner of the snapshots.
struct AppState {
    view: LedgerView<AlgorandAdapter>,
    notices: Arc<NoticeLog>,
    network: Network,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    let notices = Arc::new(NoticeLog::new());
    let target = BankTarget::new(config.account.clone(), config.app_id);
    let view = LedgerView::new(AlgorandAdapter::from_config(&config), target, notices.clone());

    let shared_state = Arc::new(AppState {
        view,
        notices,
        network: config.network,
    });

    // Initial load, like a fresh page.
    {
        let state = shared_state.clone();
        tokio::spawn(async move {
            tokio::join!(state.view.refresh_statements(), state.view.refresh_depositors());
        });
    }

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/v1/target", get(get_target).put(put_target))
        .route("/v1/statements", get(get_statements))
        .route("/v1/statements/refresh", post(refresh_statements))
        .route("/v1/depositors", get(get_depositors))
        .route("/v1/depositors/refresh", post(refresh_depositors))
        .route("/v1/notices", get(get_notices))
        .with_state(shared_state);

    info!(network = %config.network, addr = %config.bind, "listening");
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}

// Request/response models

#[derive(Deserialize)]
struct TargetRequest {
    account: Option<String>,
    app_id: Option<u64>,
}

#[derive(Serialize)]
struct StatementResponse {
    #[serde(flatten)]
    statement: Statement,
    explorer_url: String,
}

// Handlers

async fn get_target(State(state): State<Arc<AppState>>) -> Json<BankTarget> {
    Json(state.view.target().await)
}

async fn put_target(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TargetRequest>,
) -> Result<StatusCode, (StatusCode, String)> {
    let target = BankTarget::new(payload.account, payload.app_id);
    if let Some(account) = &target.account {
        if !is_valid_address(account) {
            return Err((StatusCode::BAD_REQUEST, format!("not an Algorand address: {}", account)));
        }
    }

    // Stored before responding so a following GET sees it; only the fetches run in the background.
    if !state.view.store_target(target).await {
        return Ok(StatusCode::OK);
    }
    tokio::spawn(async move {
        state.view.refresh_all().await;
    });
    Ok(StatusCode::ACCEPTED)
}

async fn get_statements(State(state): State<Arc<AppState>>) -> Json<Vec<StatementResponse>> {
    let statements = state.view.statements().await;
    let body = statements
        .iter()
        .map(|s| StatementResponse {
            explorer_url: explorer_url(state.network, ExplorerKind::Transaction, &s.id),
            statement: s.clone(),
        })
        .collect();
    Json(body)
}

async fn get_depositors(State(state): State<Arc<AppState>>) -> Json<Vec<DepositorRecord>> {
    Json(state.view.depositors().await.to_vec())
}

async fn refresh_statements(State(state): State<Arc<AppState>>) -> StatusCode {
    tokio::spawn(async move {
        state.view.refresh_statements().await;
    });
    StatusCode::ACCEPTED
}

async fn refresh_depositors(State(state): State<Arc<AppState>>) -> StatusCode {
    tokio::spawn(async move {
        state.view.refresh_depositors().await;
    });
    StatusCode::ACCEPTED
}

async fn get_notices(State(state): State<Arc<AppState>>) -> Json<Vec<Notice>> {
    Json(state.notices.recent())
}
