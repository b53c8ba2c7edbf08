//! Scripted in-memory provider for tests and host-side demos.
//!
//! Models an extension holding some accounts, a current chain, a set of known
//! chains, and an authorization bit. Every capability can be made to fail,
//! `eth_requestAccounts` can be held open until released, `eth_accounts` and
//! signer derivation can be held in transit, and events can be pushed to
//! whoever is watching.

use super::{EventReceiver, ProviderError, ProviderEvent, ProviderResult, WalletProvider};
use crate::contract::{TransactionReceipt, TransactionRequest, TransactionSigner};
use crate::core::{Address, ChainDescriptor, ChainId};
use async_trait::async_trait;
use futures::channel::{mpsc, oneshot};
use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::rc::Rc;

/// What `request_accounts` does when called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestScript {
    /// Approve the prompt: authorize and return the wallet's accounts.
    Grant,
    /// Throw without touching authorization.
    Fail(ProviderError),
    /// Leave the prompt open until `release_requests` or `fail_held_requests`.
    Hold,
}

/// Holds answers that are already computed until the gate opens, the way a
/// wallet reply can still be in transit when the page moves on.
#[derive(Default)]
struct Gate {
    closed: Cell<bool>,
    waiting: RefCell<Vec<oneshot::Sender<()>>>,
}

impl Gate {
    async fn pass(&self) {
        if !self.closed.get() {
            return;
        }
        let (tx, rx) = oneshot::channel();
        self.waiting.borrow_mut().push(tx);
        let _ = rx.await;
    }

    fn open(&self) {
        self.closed.set(false);
        for tx in self.waiting.borrow_mut().drain(..) {
            let _ = tx.send(());
        }
    }

    fn waiting(&self) -> usize {
        self.waiting.borrow_mut().retain(|tx| !tx.is_canceled());
        self.waiting.borrow().len()
    }
}

pub struct MockProvider {
    installed: Cell<bool>,
    accounts: RefCell<Vec<String>>,
    authorized: Cell<bool>,
    chain: Cell<ChainId>,
    known_chains: RefCell<BTreeSet<ChainId>>,
    request_script: RefCell<RequestScript>,
    held: RefCell<Vec<oneshot::Sender<ProviderResult<Vec<String>>>>>,
    authorized_gate: Gate,
    signer_gate: Gate,
    signer_error: RefCell<Option<ProviderError>>,
    chain_id_error: RefCell<Option<ProviderError>>,
    authorized_error: RefCell<Option<ProviderError>>,
    switch_error: RefCell<Option<ProviderError>>,
    add_error: RefCell<Option<ProviderError>>,
    watchers: RefCell<Vec<mpsc::UnboundedSender<ProviderEvent>>>,
    added_chains: RefCell<Vec<ChainDescriptor>>,
    request_calls: Cell<usize>,
    authorized_calls: Cell<usize>,
    signer_calls: Cell<usize>,
    switch_calls: Cell<usize>,
}

impl MockProvider {
    pub fn new(accounts: &[&str], chain: ChainId) -> Rc<Self> {
        Rc::new(Self {
            installed: Cell::new(true),
            accounts: RefCell::new(accounts.iter().map(|a| a.to_string()).collect()),
            authorized: Cell::new(false),
            chain: Cell::new(chain),
            known_chains: RefCell::new(BTreeSet::from([chain])),
            request_script: RefCell::new(RequestScript::Grant),
            held: RefCell::new(Vec::new()),
            authorized_gate: Gate::default(),
            signer_gate: Gate::default(),
            signer_error: RefCell::new(None),
            chain_id_error: RefCell::new(None),
            authorized_error: RefCell::new(None),
            switch_error: RefCell::new(None),
            add_error: RefCell::new(None),
            watchers: RefCell::new(Vec::new()),
            added_chains: RefCell::new(Vec::new()),
            request_calls: Cell::new(0),
            authorized_calls: Cell::new(0),
            signer_calls: Cell::new(0),
            switch_calls: Cell::new(0),
        })
    }

    /// Detection function for `WalletSession::new`; yields nothing while uninstalled.
    pub fn detector(self: &Rc<Self>) -> impl Fn() -> Option<Rc<Self>> + 'static {
        let provider = self.clone();
        move || provider.installed.get().then(|| provider.clone())
    }

    pub fn install(&self) { self.installed.set(true); }
    pub fn uninstall(&self) { self.installed.set(false); }

    pub fn authorize(&self) { self.authorized.set(true); }
    pub fn revoke(&self) { self.authorized.set(false); }
    pub fn is_authorized(&self) -> bool { self.authorized.get() }
    pub fn set_accounts(&self, accounts: &[&str]) {
        *self.accounts.borrow_mut() = accounts.iter().map(|a| a.to_string()).collect();
    }

    pub fn current_chain(&self) -> ChainId { self.chain.get() }
    pub fn set_chain(&self, chain: ChainId) {
        self.known_chains.borrow_mut().insert(chain);
        self.chain.set(chain);
    }
    pub fn know_chain(&self, chain: ChainId) { self.known_chains.borrow_mut().insert(chain); }

    pub fn script_request(&self, script: RequestScript) { *self.request_script.borrow_mut() = script; }

    /// Resolve every held prompt as approved.
    pub fn release_requests(&self) {
        self.authorized.set(true);
        let accounts = self.accounts.borrow().clone();
        for tx in self.held.borrow_mut().drain(..) {
            let _ = tx.send(Ok(accounts.clone()));
        }
    }

    pub fn fail_held_requests(&self, error: ProviderError) {
        for tx in self.held.borrow_mut().drain(..) {
            let _ = tx.send(Err(error.clone()));
        }
    }

    /// `eth_accounts` answers as of the call, but only once released.
    pub fn hold_authorized(&self) { self.authorized_gate.closed.set(true); }
    pub fn release_authorized(&self) { self.authorized_gate.open(); }
    pub fn held_authorized(&self) -> usize { self.authorized_gate.waiting() }

    /// Signer derivation answers as of the call, but only once released.
    pub fn hold_signers(&self) { self.signer_gate.closed.set(true); }
    pub fn release_signers(&self) { self.signer_gate.open(); }
    pub fn held_signers(&self) -> usize { self.signer_gate.waiting() }

    pub fn fail_signer(&self, error: Option<ProviderError>) { *self.signer_error.borrow_mut() = error; }
    pub fn fail_chain_id(&self, error: Option<ProviderError>) { *self.chain_id_error.borrow_mut() = error; }
    pub fn fail_authorized(&self, error: Option<ProviderError>) { *self.authorized_error.borrow_mut() = error; }
    pub fn fail_switch(&self, error: Option<ProviderError>) { *self.switch_error.borrow_mut() = error; }
    pub fn fail_add(&self, error: Option<ProviderError>) { *self.add_error.borrow_mut() = error; }

    /// Push an event to every live watcher.
    pub fn emit(&self, event: ProviderEvent) {
        self.watchers.borrow_mut().retain(|tx| tx.unbounded_send(event.clone()).is_ok());
    }

    pub fn watcher_count(&self) -> usize {
        self.watchers.borrow_mut().retain(|tx| !tx.is_closed());
        self.watchers.borrow().len()
    }

    pub fn request_calls(&self) -> usize { self.request_calls.get() }
    pub fn authorized_calls(&self) -> usize { self.authorized_calls.get() }
    pub fn signer_calls(&self) -> usize { self.signer_calls.get() }
    pub fn switch_calls(&self) -> usize { self.switch_calls.get() }
    pub fn added_chains(&self) -> Vec<ChainDescriptor> { self.added_chains.borrow().clone() }

    fn granted(&self) -> Vec<String> {
        if self.authorized.get() { self.accounts.borrow().clone() } else { Vec::new() }
    }

    fn check(slot: &RefCell<Option<ProviderError>>) -> ProviderResult<()> {
        match slot.borrow().as_ref() {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait(?Send)]
impl WalletProvider for MockProvider {
    type Signer = MockSigner;

    async fn request_accounts(&self) -> ProviderResult<Vec<String>> {
        self.request_calls.set(self.request_calls.get() + 1);
        let script = self.request_script.borrow().clone();
        match script {
            RequestScript::Grant => {
                self.authorized.set(true);
                Ok(self.granted())
            }
            RequestScript::Fail(e) => Err(e),
            RequestScript::Hold => {
                let (tx, rx) = oneshot::channel();
                self.held.borrow_mut().push(tx);
                rx.await.map_err(|_| ProviderError::Unavailable("prompt dropped".into()))?
            }
        }
    }

    async fn authorized_accounts(&self) -> ProviderResult<Vec<String>> {
        self.authorized_calls.set(self.authorized_calls.get() + 1);
        let answer = Self::check(&self.authorized_error).map(|()| self.granted());
        self.authorized_gate.pass().await;
        answer
    }

    async fn signer(&self, account: &Address) -> ProviderResult<MockSigner> {
        self.signer_calls.set(self.signer_calls.get() + 1);
        let answer = Self::check(&self.signer_error).map(|()| MockSigner::new(account.clone(), self.chain.get()));
        self.signer_gate.pass().await;
        answer
    }

    async fn chain_id(&self) -> ProviderResult<ChainId> {
        Self::check(&self.chain_id_error)?;
        Ok(self.chain.get())
    }

    async fn switch_chain(&self, chain: ChainId) -> ProviderResult<()> {
        self.switch_calls.set(self.switch_calls.get() + 1);
        Self::check(&self.switch_error)?;
        if !self.known_chains.borrow().contains(&chain) {
            return Err(ProviderError::UnrecognizedChain(chain));
        }
        if self.chain.get() != chain {
            self.chain.set(chain);
            self.emit(ProviderEvent::ChainChanged(chain));
        }
        Ok(())
    }

    async fn add_chain(&self, chain: &ChainDescriptor) -> ProviderResult<()> {
        self.added_chains.borrow_mut().push(chain.clone());
        Self::check(&self.add_error)?;
        self.known_chains.borrow_mut().insert(chain.chain_id);
        Ok(())
    }

    fn watch(&self) -> ProviderResult<EventReceiver> {
        let (tx, rx) = mpsc::unbounded();
        self.watchers.borrow_mut().push(tx);
        Ok(rx)
    }

    fn unwatch(&self) {
        self.watchers.borrow_mut().clear();
    }
}

/// Signing handle handed out by `MockProvider`. Records what it was asked to send.
#[derive(Debug)]
pub struct MockSigner {
    address: Address,
    chain_id: ChainId,
    sent: RefCell<Vec<TransactionRequest>>,
    reverted: Cell<bool>,
    pending_polls: Cell<usize>,
    send_error: RefCell<Option<ProviderError>>,
}

impl MockSigner {
    pub fn new(address: Address, chain_id: ChainId) -> Self {
        Self {
            address,
            chain_id,
            sent: RefCell::new(Vec::new()),
            reverted: Cell::new(false),
            pending_polls: Cell::new(0),
            send_error: RefCell::new(None),
        }
    }

    pub fn chain_id(&self) -> ChainId { self.chain_id }
    pub fn sent(&self) -> Vec<TransactionRequest> { self.sent.borrow().clone() }
    /// Receipts report status `0x0`.
    pub fn revert_transactions(&self) { self.reverted.set(true); }
    /// Receipt lookups return nothing this many times before the receipt appears.
    pub fn delay_receipts(&self, polls: usize) { self.pending_polls.set(polls); }
    pub fn fail_send(&self, error: Option<ProviderError>) { *self.send_error.borrow_mut() = error; }
}

#[async_trait(?Send)]
impl TransactionSigner for MockSigner {
    fn address(&self) -> &Address { &self.address }

    async fn send_transaction(&self, tx: &TransactionRequest) -> ProviderResult<String> {
        MockProvider::check(&self.send_error)?;
        let mut sent = self.sent.borrow_mut();
        sent.push(tx.clone());
        Ok(format!("{:#066x}", sent.len()))
    }

    async fn transaction_receipt(&self, hash: &str) -> ProviderResult<Option<TransactionReceipt>> {
        let remaining = self.pending_polls.get();
        if remaining > 0 {
            self.pending_polls.set(remaining - 1);
            return Ok(None);
        }
        Ok(Some(TransactionReceipt {
            transaction_hash: hash.to_string(),
            block_number: Some(self.sent.borrow().len() as u64),
            success: !self.reverted.get(),
        }))
    }
}
