//! Session failure taxonomy.
//!
//! `NoProviderFound`, `ConnectionRejected` and `DerivationFailed` surface from
//! `connect()`. `NetworkNegotiationFailed` and `RestorationFailed` come from
//! background work and are only ever logged.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("no wallet extension found; install a wallet to continue")]
    NoProviderFound,
    #[error("connection rejected: {reason}")]
    ConnectionRejected { reason: String },
    #[error("could not derive signer: {reason}")]
    DerivationFailed { reason: String },
    #[error("network negotiation failed: {reason}")]
    NetworkNegotiationFailed { reason: String },
    #[error("session restoration failed: {reason}")]
    RestorationFailed { reason: String },
}

impl SessionError {
    /// Stable name for UI code to branch on.
    pub fn kind(&self) -> &'static str {
        match self {
            SessionError::NoProviderFound => "NoProviderFound",
            SessionError::ConnectionRejected { .. } => "ConnectionRejected",
            SessionError::DerivationFailed { .. } => "DerivationFailed",
            SessionError::NetworkNegotiationFailed { .. } => "NetworkNegotiationFailed",
            SessionError::RestorationFailed { .. } => "RestorationFailed",
        }
    }

    pub(crate) fn rejected(reason: impl Into<String>) -> Self {
        SessionError::ConnectionRejected { reason: reason.into() }
    }
}
