use crate::config::Network;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplorerKind {
    Transaction,
    Asset,
    Address,
    Application,
}

impl ExplorerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExplorerKind::Transaction => "transaction",
            ExplorerKind::Asset => "asset",
            ExplorerKind::Address => "address",
            ExplorerKind::Application => "application",
        }
    }
}

pub fn explorer_url(network: Network, kind: ExplorerKind, id: &str) -> String {
    match network {
        Network::Localnet => format!("http://localhost:8980/explorer/{}/{}", kind.as_str(), id),
        Network::Mainnet | Network::Testnet => format!(
            "https://lora.algokit.io/{}/{}/{}",
            network.as_str(),
            kind.as_str(),
            id
        ),
    }
}
