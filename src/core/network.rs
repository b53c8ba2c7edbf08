//! Target networks and the chain descriptor handed to `wallet_addEthereumChain`.

use super::types::{Address, ChainId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// EIP-3085 chain definition, serialised in the exact shape wallets expect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainDescriptor {
    pub chain_id: ChainId,
    pub chain_name: String,
    pub native_currency: NativeCurrency,
    pub rpc_urls: Vec<String>,
    pub block_explorer_urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown network: {0}")]
pub struct UnknownNetwork(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Network { Mainnet, #[default] Fuji }

/// Case-insensitive; accepts the common aliases for each network.
impl std::str::FromStr for Network {
    type Err = UnknownNetwork;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mainnet" | "avalanche" | "c-chain" => Ok(Network::Mainnet),
            "fuji" | "testnet" => Ok(Network::Fuji),
            _ => Err(UnknownNetwork(value.trim().to_string())),
        }
    }
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self { Network::Mainnet => "mainnet", Network::Fuji => "fuji" }
    }

    pub fn chain_id(&self) -> ChainId {
        match self { Network::Mainnet => ChainId(43114), Network::Fuji => ChainId(43113) }
    }

    pub fn from_chain_id(id: ChainId) -> Option<Self> {
        [Network::Mainnet, Network::Fuji].into_iter().find(|n| n.chain_id() == id)
    }

    fn explorer(&self) -> &'static str {
        match self { Network::Mainnet => "https://snowtrace.io", Network::Fuji => "https://testnet.snowtrace.io" }
    }

    pub fn descriptor(&self) -> ChainDescriptor {
        let (chain_name, rpc) = match self {
            Network::Mainnet => ("Avalanche C-Chain", "https://api.avax.network/ext/bc/C/rpc"),
            Network::Fuji => ("Avalanche Fuji Testnet", "https://api.avax-test.network/ext/bc/C/rpc"),
        };
        ChainDescriptor {
            chain_id: self.chain_id(),
            chain_name: chain_name.into(),
            native_currency: NativeCurrency { name: "Avalanche".into(), symbol: "AVAX".into(), decimals: 18 },
            rpc_urls: vec![rpc.into()],
            block_explorer_urls: vec![self.explorer().into()],
        }
    }

    pub fn explorer_address_url(&self, address: &Address) -> String {
        format!("{}/address/{}", self.explorer(), address)
    }
}
