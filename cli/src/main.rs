use std::path::PathBuf;
use std::sync::Arc;

use algoledger_adapters::algorand::AlgorandAdapter;
use algoledger_core::address::{application_address, is_valid_address};
use algoledger_core::config::Config;
use algoledger_core::explorer::{explorer_url, ExplorerKind};
use algoledger_core::models::BankTarget;
use algoledger_core::view::{LedgerView, NoticeLog};
use anyhow::{anyhow, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "algoledger", version, about = "Bank contract statements and depositors on Algorand", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deposits and withdrawals of one account, newest first
    Statements {
        #[arg(short, long)]
        account: Option<String>,

        #[arg(long)]
        app_id: Option<u64>,

        /// Write CSV instead of printing a table
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Current balance of every depositor
    Depositors {
        #[arg(long)]
        app_id: Option<u64>,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Escrow address of an application
    AppAddress {
        #[arg(long)]
        app_id: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Commands::Statements {
            account,
            app_id,
            output,
        } => {
            let account = account
                .or_else(|| config.account.clone())
                .ok_or_else(|| anyhow!("--account or BANK_ACCOUNT required"))?;
            if !is_valid_address(&account) {
                bail!("not an Algorand address: {}", account);
            }
            let app_id = require_app_id(app_id, &config)?;

            let (view, notices) = build_view(&config, BankTarget::new(Some(account), Some(app_id)));
            view.refresh_statements().await;
            report_notices(&notices)?;

            let statements = view.statements().await;
            match output {
                Some(path) => {
                    let mut wtr = csv::Writer::from_path(&path)?;
                    for statement in statements.iter() {
                        wtr.serialize(statement)?;
                    }
                    wtr.flush()?;
                    println!("Wrote {} statements to {}", statements.len(), path.display());
                }
                None if statements.is_empty() => println!("No transactions found"),
                None => {
                    for s in statements.iter() {
                        println!(
                            "{:<10} round {:<10} {:>14} ALGO  {}",
                            s.kind.as_str(),
                            s.round,
                            s.amount.to_string(),
                            explorer_url(config.network, ExplorerKind::Transaction, &s.id)
                        );
                    }
                }
            }
        }
        Commands::Depositors { app_id, output } => {
            let app_id = require_app_id(app_id, &config)?;

            let (view, notices) = build_view(&config, BankTarget::new(config.account.clone(), Some(app_id)));
            view.refresh_depositors().await;
            report_notices(&notices)?;

            let depositors = view.depositors().await;
            match output {
                Some(path) => {
                    let mut wtr = csv::Writer::from_path(&path)?;
                    for depositor in depositors.iter() {
                        wtr.serialize(depositor)?;
                    }
                    wtr.flush()?;
                    println!("Wrote {} depositors to {}", depositors.len(), path.display());
                }
                None if depositors.is_empty() => println!("No depositors yet"),
                None => {
                    for d in depositors.iter() {
                        println!("{}  {:>14} ALGO", d.address, d.balance);
                    }
                }
            }
        }
        Commands::AppAddress { app_id } => {
            let address = application_address(app_id);
            println!("{}", address);
            println!("{}", explorer_url(config.network, ExplorerKind::Application, &app_id.to_string()));
        }
    }

    Ok(())
}

fn require_app_id(app_id: Option<u64>, config: &Config) -> anyhow::Result<u64> {
    app_id
        .or(config.app_id)
        .filter(|id| *id > 0)
        .ok_or_else(|| anyhow!("--app-id or BANK_APP_ID required"))
}

fn build_view(config: &Config, target: BankTarget) -> (LedgerView<AlgorandAdapter>, Arc<NoticeLog>) {
    let notices = Arc::new(NoticeLog::new());
    let view = LedgerView::new(AlgorandAdapter::from_config(config), target, notices.clone());
    (view, notices)
}

/// A one-shot run has no previous view to fall back on, so notices become the exit status.
fn report_notices(notices: &NoticeLog) -> anyhow::Result<()> {
    let drained = notices.drain();
    for notice in &drained {
        eprintln!("{}", notice.message);
    }
    if !drained.is_empty() {
        bail!("refresh failed");
    }
    Ok(())
}
