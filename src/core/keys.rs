//! Method, event and storage key constants
//!
//! Centralized registry for every string that crosses the wallet boundary.

/// Durable storage keys
pub mod storage {
    /// Boolean hint: the user's last action was "connected".
    pub const WALLET_CONNECTED: &str = "walletConnected";
}

/// EIP-1193 request methods
pub mod rpc {
    pub const REQUEST_ACCOUNTS: &str = "eth_requestAccounts";
    pub const ACCOUNTS: &str = "eth_accounts";
    pub const CHAIN_ID: &str = "eth_chainId";
    pub const SWITCH_CHAIN: &str = "wallet_switchEthereumChain";
    pub const ADD_CHAIN: &str = "wallet_addEthereumChain";
    pub const SEND_TRANSACTION: &str = "eth_sendTransaction";
    pub const TRANSACTION_RECEIPT: &str = "eth_getTransactionReceipt";
}

/// EIP-1193 provider events
pub mod events {
    pub const ACCOUNTS_CHANGED: &str = "accountsChanged";
    pub const CHAIN_CHANGED: &str = "chainChanged";
    pub const DISCONNECT: &str = "disconnect";

    pub const ALL: &[&str] = &[ACCOUNTS_CHANGED, CHAIN_CHANGED, DISCONNECT];
}

/// EIP-1193 / EIP-3085 / JSON-RPC error codes
pub mod codes {
    pub const USER_REJECTED: i64 = 4001;
    pub const UNAUTHORIZED: i64 = 4100;
    pub const UNSUPPORTED_METHOD: i64 = 4200;
    pub const DISCONNECTED: i64 = 4900;
    pub const CHAIN_DISCONNECTED: i64 = 4901;
    pub const UNRECOGNIZED_CHAIN: i64 = 4902;
    pub const REQUEST_PENDING: i64 = -32002;
}

/// Environment variables read by `SessionConfig::from_env` and the native store
pub mod env {
    pub const NETWORK: &str = "AVALAUNCH_NETWORK";
    pub const POLL_INTERVAL_MS: &str = "AVALAUNCH_POLL_INTERVAL_MS";
    pub const STORAGE_KEY: &str = "AVALAUNCH_STORAGE_KEY";
    pub const NEGOTIATE_NETWORK: &str = "AVALAUNCH_NEGOTIATE_NETWORK";
    pub const ROOT: &str = "AVALAUNCH_ROOT";
    pub const LOG_FORMAT: &str = "AVALAUNCH_LOG_FORMAT";
    pub const LOG_JSON: &str = "AVALAUNCH_LOG_JSON";
}
