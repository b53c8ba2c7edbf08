//! Project registry - the platform contract's `createProject` entry point
//!
//! ```text
//! WalletSession ──signer()──▶ Rc<Signer: TransactionSigner>
//!                                    │
//! ProjectRegistry.create_project ────┤ eth_sendTransaction (ABI calldata)
//!                                    │
//!                                    └ eth_getTransactionReceipt (polled)
//! ```
//!
//! The contract itself lives on chain; this module only encodes the call,
//! sends it through whatever signing handle the session lent out, and waits
//! for the receipt.

use crate::core::Address;
use crate::provider::{ProviderError, ProviderResult, WalletProvider};
use crate::session::WalletSession;
use alloy_primitives::address;
use alloy_sol_types::{sol, SolCall};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

pub use alloy_primitives::U256;

/// Deployed registry on the platform's network.
pub const PROJECT_REGISTRY: alloy_primitives::Address = address!("aD488Cd332034434240828F987d6E6B991D48125");
pub const CREATE_PROJECT_SIGNATURE: &str = "createProject(string,address,uint256,uint256,uint256)";

/// Default fundraising window used by the project wizard.
pub const DEFAULT_FUNDING_DAYS: u32 = 10;

sol! {
    function createProject(
        string metadataRef,
        address owner,
        uint256 fundingRequired,
        uint256 deadline,
        uint256 founderProfitPercent
    );
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContractError {
    #[error("wallet not connected")]
    NotConnected,
    #[error("invalid submission: {0}")]
    InvalidSubmission(String),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("transaction {transaction_hash} reverted")]
    Reverted { transaction_hash: String },
    #[error("no receipt for {transaction_hash} after {attempts} attempts")]
    ReceiptTimeout { transaction_hash: String, attempts: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub from: Address,
    pub to: Address,
    /// `0x`-prefixed calldata.
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: String,
    pub block_number: Option<u64>,
    pub success: bool,
}

impl TransactionReceipt {
    /// Parse an `eth_getTransactionReceipt` result object.
    pub fn from_rpc(value: &Value) -> ProviderResult<Self> {
        let transaction_hash = value["transactionHash"]
            .as_str()
            .ok_or_else(|| ProviderError::InvalidResponse("receipt without transactionHash".into()))?
            .to_string();
        let block_number = match value["blockNumber"].as_str() {
            Some(raw) => Some(parse_quantity(raw)?),
            None => None,
        };
        // Receipts from before status codes existed carry no status field.
        let success = match value["status"].as_str() {
            Some(raw) => parse_quantity(raw)? == 1,
            None => true,
        };
        Ok(Self { transaction_hash, block_number, success })
    }
}

fn parse_quantity(raw: &str) -> ProviderResult<u64> {
    let hex = raw.strip_prefix("0x").unwrap_or(raw);
    u64::from_str_radix(hex, 16).map_err(|e| ProviderError::InvalidResponse(format!("quantity {raw}: {e}")))
}

/// Signing capability able to submit transactions. Implemented by the
/// handles wallet providers derive for an account.
#[async_trait(?Send)]
pub trait TransactionSigner {
    fn address(&self) -> &Address;
    /// Returns the transaction hash.
    async fn send_transaction(&self, tx: &TransactionRequest) -> ProviderResult<String>;
    async fn transaction_receipt(&self, hash: &str) -> ProviderResult<Option<TransactionReceipt>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSubmission {
    /// Reference to the off-chain project document (e.g. an IPFS URI).
    pub metadata_ref: String,
    /// Smallest unit of the native token; the contract takes a full uint256.
    pub funding_required: U256,
    /// Unix seconds.
    pub deadline: u64,
    pub founder_profit_percent: u8,
}

impl ProjectSubmission {
    pub fn validate(&self, now: i64) -> Result<(), ContractError> {
        if self.founder_profit_percent > 100 {
            return Err(ContractError::InvalidSubmission(format!("founder share {}% exceeds 100%", self.founder_profit_percent)));
        }
        if self.funding_required.is_zero() {
            return Err(ContractError::InvalidSubmission("funding required must be positive".into()));
        }
        if i64::try_from(self.deadline).map_or(false, |d| d <= now) {
            return Err(ContractError::InvalidSubmission("deadline must be in the future".into()));
        }
        Ok(())
    }
}

pub struct FundingDeadline;

impl FundingDeadline {
    pub fn days_from(now: i64, days: u32) -> u64 {
        (now.max(0) as u64).saturating_add(u64::from(days) * 86_400)
    }

    pub fn days_from_now(days: u32) -> u64 { Self::days_from(chrono::Utc::now().timestamp(), days) }
}

#[derive(Debug, Clone)]
pub struct ProjectRegistry {
    address: Address,
    receipt_attempts: usize,
    receipt_interval: Duration,
}

impl Default for ProjectRegistry {
    fn default() -> Self { Self::new(Address::from(PROJECT_REGISTRY)) }
}

impl ProjectRegistry {
    pub fn new(address: Address) -> Self {
        Self { address, receipt_attempts: 60, receipt_interval: Duration::from_secs(2) }
    }

    pub fn with_receipt_polling(mut self, attempts: usize, interval: Duration) -> Self {
        self.receipt_attempts = attempts.max(1);
        self.receipt_interval = interval;
        self
    }

    pub fn address(&self) -> &Address { &self.address }

    pub fn selector() -> [u8; 4] { createProjectCall::SELECTOR }

    /// ABI calldata for `createProject`, owner first-class in the call.
    pub fn encode_create_project(owner: &Address, submission: &ProjectSubmission) -> Vec<u8> {
        createProjectCall {
            metadataRef: submission.metadata_ref.clone(),
            owner: owner.as_alloy(),
            fundingRequired: submission.funding_required,
            deadline: U256::from(submission.deadline),
            founderProfitPercent: U256::from(submission.founder_profit_percent),
        }
        .abi_encode()
    }

    /// Submit `createProject` with the signer's account as project owner.
    pub async fn create_project<S>(&self, signer: &S, submission: &ProjectSubmission) -> Result<TransactionReceipt, ContractError>
    where
        S: TransactionSigner + ?Sized,
    {
        submission.validate(chrono::Utc::now().timestamp())?;
        let owner = signer.address().clone();
        let tx = TransactionRequest {
            from: owner.clone(),
            to: self.address.clone(),
            data: format!("0x{}", hex::encode(Self::encode_create_project(&owner, submission))),
        };
        let hash = signer.send_transaction(&tx).await?;
        tracing::info!(tx = %hash, owner = %owner, "createProject submitted");

        for attempt in 0..self.receipt_attempts {
            if attempt > 0 {
                crate::runtime::sleep(self.receipt_interval).await;
            }
            if let Some(receipt) = signer.transaction_receipt(&hash).await? {
                if !receipt.success {
                    return Err(ContractError::Reverted { transaction_hash: hash });
                }
                return Ok(receipt);
            }
        }
        Err(ContractError::ReceiptTimeout { transaction_hash: hash, attempts: self.receipt_attempts })
    }

    /// Same as `create_project`, borrowing the signer from a connected session.
    pub async fn create_project_for<P>(&self, session: &WalletSession<P>, submission: &ProjectSubmission) -> Result<TransactionReceipt, ContractError>
    where
        P: WalletProvider + 'static,
        P::Signer: TransactionSigner,
    {
        let signer = session.signer().ok_or(ContractError::NotConnected)?;
        self.create_project(&*signer, submission).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::keccak256;
    use serde_json::json;

    fn owner() -> Address { Address::parse("0x71C7656EC7ab88b098defB751B7401B5f6d8976F").unwrap() }

    fn submission(metadata: &str) -> ProjectSubmission {
        ProjectSubmission { metadata_ref: metadata.into(), funding_required: U256::from(1000u64), deadline: 1_900_000_000, founder_profit_percent: 50 }
    }

    #[test]
    fn selector_matches_signature() {
        assert_eq!(createProjectCall::SIGNATURE, CREATE_PROJECT_SIGNATURE);
        assert_eq!(ProjectRegistry::selector(), keccak256(CREATE_PROJECT_SIGNATURE)[..4]);
    }

    #[test]
    fn calldata_layout() {
        let data = ProjectRegistry::encode_create_project(&owner(), &submission("ipfs://bafy"));
        assert_eq!(&data[..4], &ProjectRegistry::selector());
        assert_eq!(data.len(), 4 + 32 * 5 + 32 + 32);
        let word = |i: usize| &data[4 + i * 32..4 + (i + 1) * 32];
        assert_eq!(word(0)[31], 0xa0);
        assert_eq!(&word(1)[12..], &owner().to_bytes());
        assert_eq!(u16::from_be_bytes([word(2)[30], word(2)[31]]), 1000);
        assert_eq!(word(4)[31], 50);
        assert_eq!(word(5)[31], 11);
        assert_eq!(&word(6)[..11], b"ipfs://bafy");
        assert!(word(6)[11..].iter().all(|b| *b == 0));
    }

    #[test]
    fn empty_metadata_has_no_tail_data() {
        let data = ProjectRegistry::encode_create_project(&owner(), &submission(""));
        assert_eq!(data.len(), 4 + 32 * 6);
        assert!(data[4 + 32 * 5..].iter().all(|b| *b == 0));
    }

    #[test]
    fn funding_uses_the_full_word() {
        let mut s = submission("ipfs://bafy");
        s.funding_required = U256::MAX;
        let data = ProjectRegistry::encode_create_project(&owner(), &s);
        assert!(data[4 + 64..4 + 96].iter().all(|b| *b == 0xff));

        s.funding_required = U256::from(1u8) << 200;
        let data = ProjectRegistry::encode_create_project(&owner(), &s);
        let decoded = createProjectCall::abi_decode(&data, true).unwrap();
        assert_eq!(decoded.fundingRequired, U256::from(1u8) << 200);
        assert_eq!(decoded.owner, owner().as_alloy());
        assert_eq!(decoded.metadataRef, "ipfs://bafy");
    }

    #[test]
    fn validation() {
        let now = 1_800_000_000;
        assert!(submission("x").validate(now).is_ok());
        let mut s = submission("x");
        s.founder_profit_percent = 101;
        assert!(matches!(s.validate(now), Err(ContractError::InvalidSubmission(_))));
        let mut s = submission("x");
        s.funding_required = U256::ZERO;
        assert!(s.validate(now).is_err());
        let mut s = submission("x");
        s.deadline = now as u64;
        assert!(s.validate(now).is_err());
    }

    #[test]
    fn deadline_offset() {
        assert_eq!(FundingDeadline::days_from(1_000, DEFAULT_FUNDING_DAYS), 1_000 + 864_000);
    }

    #[test]
    fn parses_receipts() {
        let ok = TransactionReceipt::from_rpc(&json!({"transactionHash": "0xabc", "blockNumber": "0x10", "status": "0x1"})).unwrap();
        assert_eq!(ok, TransactionReceipt { transaction_hash: "0xabc".into(), block_number: Some(16), success: true });
        let failed = TransactionReceipt::from_rpc(&json!({"transactionHash": "0xabc", "blockNumber": null, "status": "0x0"})).unwrap();
        assert!(!failed.success);
        assert_eq!(failed.block_number, None);
        assert!(TransactionReceipt::from_rpc(&json!({"status": "0x1"})).is_err());
    }

    #[test]
    fn default_registry_address() {
        assert_eq!(ProjectRegistry::default().address().to_string(), "0xad488cd332034434240828f987d6e6b991d48125");
    }
}
