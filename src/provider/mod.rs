//! Provider - the wallet extension's capability surface
//!
//! Everything the session needs from an injected wallet, expressed as one
//! trait so the browser adapter and the scripted test provider are
//! interchangeable.
//!
//! # Capabilities
//!
//! | Method | EIP-1193 | Prompts the user |
//! |--------|----------|------------------|
//! | `request_accounts` | `eth_requestAccounts` | may |
//! | `authorized_accounts` | `eth_accounts` | never |
//! | `signer` | (local) | never |
//! | `chain_id` | `eth_chainId` | never |
//! | `switch_chain` | `wallet_switchEthereumChain` | may |
//! | `add_chain` | `wallet_addEthereumChain` | may |
//!
//! Events (`accountsChanged`, `chainChanged`, `disconnect`) arrive on the
//! receiver returned by `watch`, until `unwatch` tears the listeners down.

#[cfg(any(feature = "native", feature = "wasm"))]
pub mod mock;

use crate::core::keys::codes;
use crate::core::{Address, ChainDescriptor, ChainId};
use async_trait::async_trait;
use futures::channel::mpsc;

#[cfg(any(feature = "native", feature = "wasm"))]
pub use mock::{MockProvider, MockSigner};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("user rejected the request")]
    UserRejected,
    #[error("method or account not authorized")]
    Unauthorized,
    #[error("method not supported by the wallet: {0}")]
    UnsupportedMethod(String),
    #[error("wallet is disconnected")]
    Disconnected,
    #[error("chain {0} is not known to the wallet")]
    UnrecognizedChain(ChainId),
    #[error("a request of this kind is already pending")]
    RequestPending,
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("wallet unavailable: {0}")]
    Unavailable(String),
}

impl ProviderError {
    /// Map an EIP-1193 error object. `chain` is the chain the request was about,
    /// used to attribute 4902 errors.
    pub fn from_code(code: i64, message: impl Into<String>, chain: Option<ChainId>) -> Self {
        match code {
            codes::USER_REJECTED => ProviderError::UserRejected,
            codes::UNAUTHORIZED => ProviderError::Unauthorized,
            codes::UNSUPPORTED_METHOD => ProviderError::UnsupportedMethod(message.into()),
            codes::DISCONNECTED | codes::CHAIN_DISCONNECTED => ProviderError::Disconnected,
            codes::UNRECOGNIZED_CHAIN => ProviderError::UnrecognizedChain(chain.unwrap_or(ChainId(0))),
            codes::REQUEST_PENDING => ProviderError::RequestPending,
            _ => ProviderError::Rpc { code, message: message.into() },
        }
    }

    pub fn is_unrecognized_chain(&self) -> bool {
        matches!(self, ProviderError::UnrecognizedChain(_))
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Notifications the extension emits on its own schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    AccountsChanged(Vec<String>),
    ChainChanged(ChainId),
    Disconnected,
}

pub type EventReceiver = mpsc::UnboundedReceiver<ProviderEvent>;

/// Injected wallet capability. Single-threaded: browser handles are `!Send`.
#[async_trait(?Send)]
pub trait WalletProvider {
    /// Opaque signing capability derived for an account.
    type Signer: 'static;

    async fn request_accounts(&self) -> ProviderResult<Vec<String>>;
    async fn authorized_accounts(&self) -> ProviderResult<Vec<String>>;
    async fn signer(&self, account: &Address) -> ProviderResult<Self::Signer>;
    async fn chain_id(&self) -> ProviderResult<ChainId>;
    async fn switch_chain(&self, chain: ChainId) -> ProviderResult<()>;
    async fn add_chain(&self, chain: &ChainDescriptor) -> ProviderResult<()>;

    /// Subscribe to extension events.
    fn watch(&self) -> ProviderResult<EventReceiver>;
    /// Remove every listener installed by `watch`.
    fn unwatch(&self);
}
