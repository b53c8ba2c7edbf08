//! Avalaunch: wallet session for a crowdfunding dapp on Avalanche C-Chain.
//!
//! # Architecture
//!
//! ```text
//! WalletSession (entry point)
//!   │
//!   ├── WalletProvider (injected extension, or MockProvider in tests)
//!   │     ├── eth_requestAccounts / eth_accounts / eth_chainId
//!   │     ├── wallet_switchEthereumChain / wallet_addEthereumChain
//!   │     └── accountsChanged · chainChanged · disconnect
//!   │
//!   ├── FlagStore ("walletConnected": localStorage or JSON file)
//!   │
//!   └── WatchHandle (event listeners + 5s reconciliation poll)
//!
//! ProjectRegistry ── borrows session.signer() ── createProject(...)
//! ```
//!
//! # Operations
//!
//! | Operation | Method | Description |
//! |-----------|--------|-------------|
//! | restore | `session.restore()` | Silent re-attach to an authorized account |
//! | connect | `session.connect()` | Prompt the wallet; concurrent calls share one attempt |
//! | disconnect | `session.disconnect()` | Forget account, signer and persisted flag |
//! | events | `session.handle_event(e)` | Apply an extension notification |
//! | poll | `session.reconcile()` | One consistency check against `eth_accounts` |
//! | watch | `session.start()` | initialize + events + poll until the handle drops |
//!
//! # Features
//!
//! - `native` - tokio local tasks, file-backed flag, tracing-subscriber (default)
//! - `wasm` - browser bindings (`window.ethereum`, localStorage, wasm-bindgen)
//!
//! # Usage
//!
//! ```ignore
//! use avalaunch::{MemoryFlagStore, MockProvider, SessionConfig, WalletSession, ChainId};
//!
//! let wallet = MockProvider::new(&["0x71c7656ec7ab88b098defb751b7401b5f6d8976f"], ChainId(43113));
//! let session = WalletSession::new(SessionConfig::default(), MemoryFlagStore::new(), wallet.detector());
//!
//! let _watch = session.start().await;
//! let address = session.connect().await?;
//! println!("{}", session.snapshot().display_name());
//! ```

// =============================================================================
// Shared modules (compile everywhere)
// =============================================================================
pub mod core;
pub mod provider;
pub mod storage;

// =============================================================================
// Session runtime (needs a local executor: tokio or the browser)
// =============================================================================
#[cfg(any(feature = "native", feature = "wasm"))]
pub mod contract;
#[cfg(any(feature = "native", feature = "wasm"))]
pub mod runtime;
#[cfg(any(feature = "native", feature = "wasm"))]
pub mod session;

// =============================================================================
// Native-only modules
// =============================================================================
#[cfg(feature = "native")]
pub mod logging;

// =============================================================================
// WASM-only modules (browser, localStorage, wasm-bindgen)
// =============================================================================
#[cfg(feature = "wasm")]
pub mod wasm;

// =============================================================================
// Re-exports: Shared
// =============================================================================
pub use core::{Address, AddressError, ChainDescriptor, ChainId, ConnectionStatus, Network, UnknownNetwork, WalletKind};
pub use provider::{EventReceiver, ProviderError, ProviderEvent, ProviderResult, WalletProvider};
pub use storage::{FlagStore, MemoryFlagStore, StoreError, StoreResult};

#[cfg(any(feature = "native", feature = "wasm"))]
pub use contract::{ContractError, ProjectRegistry, ProjectSubmission, TransactionReceipt, TransactionSigner};
#[cfg(any(feature = "native", feature = "wasm"))]
pub use provider::{MockProvider, MockSigner};
#[cfg(any(feature = "native", feature = "wasm"))]
pub use session::{ConnectFuture, SessionConfig, SessionError, SessionSnapshot, WalletSession, WatchHandle};

// =============================================================================
// Re-exports: Native
// =============================================================================
#[cfg(feature = "native")]
pub use logging::{init_logging, init_logging_with, LogFormat};
#[cfg(feature = "native")]
pub use storage::FileFlagStore;

// =============================================================================
// Re-exports: WASM
// =============================================================================
#[cfg(feature = "wasm")]
pub use wasm::{InjectedProvider, InjectedSigner, LocalStorageFlagStore, WalletSessionHandle};
