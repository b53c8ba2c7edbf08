//! Core types shared by every target: accounts, chains, networks, wallet catalogue.

pub mod format;
pub mod keys;
pub mod network;
pub mod types;
pub mod wallets;

pub use network::{ChainDescriptor, NativeCurrency, Network, UnknownNetwork};
pub use types::{Address, AddressError, ChainId, ConnectionStatus, InvalidChainId};
pub use wallets::WalletKind;
