//! Best-effort switch to the platform's chain after a successful connect.

use crate::core::ChainDescriptor;
use crate::provider::WalletProvider;
use anyhow::{Context, Result};

/// Ask the wallet to switch; if it has never heard of the chain, add the
/// definition and switch again.
pub(crate) async fn negotiate_network<P: WalletProvider + ?Sized>(provider: &P, descriptor: &ChainDescriptor) -> Result<()> {
    match provider.switch_chain(descriptor.chain_id).await {
        Ok(()) => Ok(()),
        Err(e) if e.is_unrecognized_chain() => {
            tracing::info!(chain = %descriptor.chain_name, "chain unknown to wallet, adding it");
            provider.add_chain(descriptor).await.context("wallet_addEthereumChain")?;
            provider
                .switch_chain(descriptor.chain_id)
                .await
                .context("wallet_switchEthereumChain after add")?;
            Ok(())
        }
        Err(e) => Err(anyhow::Error::new(e).context("wallet_switchEthereumChain")),
    }
}
