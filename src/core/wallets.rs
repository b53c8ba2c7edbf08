//! Supported wallet extensions.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletKind { #[default] Core, MetaMask, Coinbase, WalletConnect }

impl WalletKind {
    pub const ALL: [WalletKind; 4] = [WalletKind::Core, WalletKind::MetaMask, WalletKind::Coinbase, WalletKind::WalletConnect];

    pub fn id(&self) -> &'static str {
        match self {
            WalletKind::Core => "core",
            WalletKind::MetaMask => "metamask",
            WalletKind::Coinbase => "coinbase",
            WalletKind::WalletConnect => "walletconnect",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            WalletKind::Core => "Core",
            WalletKind::MetaMask => "MetaMask",
            WalletKind::Coinbase => "Coinbase Wallet",
            WalletKind::WalletConnect => "WalletConnect",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            WalletKind::Core => "Connect to your Core wallet",
            WalletKind::MetaMask => "Connect to your MetaMask wallet",
            WalletKind::Coinbase => "Connect to your Coinbase wallet",
            WalletKind::WalletConnect => "Connect with WalletConnect",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        let id = id.trim();
        Self::ALL.into_iter().find(|k| k.id().eq_ignore_ascii_case(id))
    }

    /// Whether the wallet injects a provider object into the page.
    /// WalletConnect pairs over a relay instead, so it can never be detected.
    pub fn is_injected(&self) -> bool { !matches!(self, WalletKind::WalletConnect) }
}
