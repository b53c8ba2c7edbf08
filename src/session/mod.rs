//! WalletSession - single source of truth for "connected to a wallet, as whom, on which chain"
//!
//! # Lifecycle
//!
//! ```text
//!                 connect()                 accounts + signer + chain
//!  Disconnected ────────────▶ Connecting ─────────────────────────────▶ Connected
//!       ▲                         │                                        │
//!       │        Error ◀──────────┘ rejected / derivation failed           │
//!       └──────────┘                                                       │
//!       ▲                                                                  │
//!       └──── disconnect() · accountsChanged([]) · disconnect event ───────┘
//!             · poll finds no authorized accounts
//! ```
//!
//! `restore()` moves Disconnected → Connected silently at startup when the
//! persisted flag is set. Chain changes refresh the connection in place.
//!
//! # Linearization
//!
//! Every transition bumps an epoch. Work that suspends on the wallet
//! (restore, re-derivation after an event, reconciliation) records the epoch
//! first and drops its result if anything else moved the session meanwhile.
//! Handlers that see `Connecting` leave the state alone until the attempt
//! settles. An attempt nobody holds any more settles as `Disconnected`.

mod config;
mod error;
mod negotiate;
mod watch;

pub use config::{SessionConfig, DEFAULT_POLL_INTERVAL};
pub use error::SessionError;
pub use watch::WatchHandle;

use crate::core::{Address, ChainId, ConnectionStatus};
use crate::provider::{ProviderEvent, WalletProvider};
use crate::runtime;
use crate::storage::FlagStore;
use futures::channel::mpsc;
use futures::future::{self, FutureExt, LocalBoxFuture, Shared, WeakShared};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;
use std::task::{Context, Poll};
use tracing::{debug, info, warn};

pub type ConnectOutcome = Result<Address, SessionError>;

type Attempt = LocalBoxFuture<'static, ConnectOutcome>;

/// Result of `connect()`. Cloneable: concurrent callers share one attempt,
/// which keeps running as long as any of them still holds it.
pub type ConnectFuture = Shared<Attempt>;

/// What UI code reads. Never cache beyond a render pass.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub status: ConnectionStatus,
    pub address: Option<Address>,
    pub chain_id: Option<ChainId>,
}

impl SessionSnapshot {
    /// Wallet button label.
    pub fn display_name(&self) -> String {
        match (&self.status, &self.address) {
            (ConnectionStatus::Connected, Some(address)) => address.short(),
            (ConnectionStatus::Connecting, _) => "Connecting...".into(),
            _ => "Connect Wallet".into(),
        }
    }
}

struct Connection<S> {
    address: Address,
    chain_id: ChainId,
    signer: Rc<S>,
}

/// Address and signer only exist inside `Connected`, so they can never
/// disagree with the status or with each other.
enum Phase<S> {
    Disconnected,
    Connecting,
    Connected(Connection<S>),
}

impl<S> Phase<S> {
    fn status(&self) -> ConnectionStatus {
        match self {
            Phase::Disconnected => ConnectionStatus::Disconnected,
            Phase::Connecting => ConnectionStatus::Connecting,
            Phase::Connected(_) => ConnectionStatus::Connected,
        }
    }

    fn connection(&self) -> Option<&Connection<S>> {
        match self {
            Phase::Connected(c) => Some(c),
            _ => None,
        }
    }
}

struct SessionInner<S> {
    phase: Phase<S>,
    epoch: u64,
    initialized: bool,
    pending: Option<WeakShared<Attempt>>,
    last_error: Option<SessionError>,
    watchers: Vec<mpsc::UnboundedSender<SessionSnapshot>>,
}

impl<S> SessionInner<S> {
    fn snapshot(&self) -> SessionSnapshot {
        let connection = self.phase.connection();
        SessionSnapshot {
            status: self.phase.status(),
            address: connection.map(|c| c.address.clone()),
            chain_id: connection.map(|c| c.chain_id),
        }
    }

    fn transition(&mut self, phase: Phase<S>) {
        self.phase = phase;
        self.epoch += 1;
    }
}

type Detect<P> = Rc<dyn Fn() -> Option<Rc<P>>>;

/// Process-wide wallet session. Cheap to clone; clones share state.
pub struct WalletSession<P: WalletProvider> {
    config: Rc<SessionConfig>,
    inner: Rc<RefCell<SessionInner<P::Signer>>>,
    store: Rc<dyn FlagStore>,
    detect: Detect<P>,
}

impl<P: WalletProvider> Clone for WalletSession<P> {
    fn clone(&self) -> Self {
        Self { config: self.config.clone(), inner: self.inner.clone(), store: self.store.clone(), detect: self.detect.clone() }
    }
}

impl<P: WalletProvider + 'static> WalletSession<P> {
    /// `detect` is asked for the extension at every call site; it may come and go.
    pub fn new(config: SessionConfig, store: impl FlagStore + 'static, detect: impl Fn() -> Option<Rc<P>> + 'static) -> Self {
        Self {
            config: Rc::new(config),
            inner: Rc::new(RefCell::new(SessionInner {
                phase: Phase::Disconnected,
                epoch: 0,
                initialized: false,
                pending: None,
                last_error: None,
                watchers: Vec::new(),
            })),
            store: Rc::new(store),
            detect: Rc::new(detect),
        }
    }

    // =========================================================================
    // Read side
    // =========================================================================

    pub fn config(&self) -> &SessionConfig { &self.config }
    pub fn status(&self) -> ConnectionStatus { self.inner.borrow().phase.status() }
    pub fn is_connected(&self) -> bool { self.status().is_connected() }
    pub fn is_initialized(&self) -> bool { self.inner.borrow().initialized }
    pub fn snapshot(&self) -> SessionSnapshot { self.inner.borrow().snapshot() }
    pub fn last_error(&self) -> Option<SessionError> { self.inner.borrow().last_error.clone() }

    pub fn address(&self) -> Option<Address> {
        self.inner.borrow().phase.connection().map(|c| c.address.clone())
    }

    pub fn chain_id(&self) -> Option<ChainId> {
        self.inner.borrow().phase.connection().map(|c| c.chain_id)
    }

    /// Lend the signing handle. The session stays its owner; the handle is
    /// dropped from the session on disconnect.
    pub fn signer(&self) -> Option<Rc<P::Signer>> {
        self.inner.borrow().phase.connection().map(|c| c.signer.clone())
    }

    pub fn with_signer<R>(&self, f: impl FnOnce(&P::Signer) -> R) -> Option<R> {
        let inner = self.inner.borrow();
        inner.phase.connection().map(|c| f(&c.signer))
    }

    /// Snapshots of every subsequent transition, including the transient `Error`.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<SessionSnapshot> {
        let (tx, rx) = mpsc::unbounded();
        self.inner.borrow_mut().watchers.push(tx);
        rx
    }

    /// Whether the durable hint says the user was last connected.
    pub fn persisted(&self) -> bool {
        match self.store.load(&self.config.storage_key) {
            Ok(flag) => flag.unwrap_or(false),
            Err(e) => {
                warn!(error = %e, "could not read session flag");
                false
            }
        }
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Startup: restore silently if the flag is set, then mark initialized.
    pub async fn initialize(&self) {
        if self.is_initialized() {
            return;
        }
        if self.persisted() {
            self.restore().await;
        } else {
            debug!("no persisted wallet session");
        }
        self.inner.borrow_mut().initialized = true;
    }

    /// Re-attach to an already-authorized account without prompting.
    /// Never fails outward; returns whether the session is connected afterwards.
    pub async fn restore(&self) -> bool {
        let Some(provider) = (self.detect)() else {
            debug!("restore skipped: no wallet extension");
            return false;
        };
        let epoch = {
            let inner = self.inner.borrow();
            if !matches!(inner.phase, Phase::Disconnected) {
                return inner.phase.status().is_connected();
            }
            inner.epoch
        };

        let outcome = match provider.authorized_accounts().await {
            Ok(accounts) if accounts.is_empty() => Ok(None),
            Ok(accounts) => derive(&*provider, &accounts).await.map(Some),
            Err(e) => Err(e.to_string()),
        };

        let mut inner = self.inner.borrow_mut();
        if inner.epoch != epoch {
            debug!("restore result discarded: session moved on");
            return inner.phase.status().is_connected();
        }
        match outcome {
            Ok(Some(connection)) => {
                info!(address = %connection.address, chain = %connection.chain_id, "wallet session restored");
                inner.transition(Phase::Connected(connection));
                drop(inner);
                self.notify();
                true
            }
            Ok(None) => {
                drop(inner);
                info!("wallet reports no authorized accounts; forgetting session");
                self.persist(false);
                false
            }
            Err(reason) => {
                drop(inner);
                warn!(error = %SessionError::RestorationFailed { reason }, "silent restore failed");
                self.persist(false);
                false
            }
        }
    }

    /// Ask the wallet for an account. Starts immediately; a call made while an
    /// attempt is in flight joins that attempt instead of prompting again.
    /// Needs no background executor: the callers' polls drive the attempt, and
    /// if all of them drop it the session falls back to `Disconnected`.
    pub fn connect(&self) -> ConnectFuture {
        match self.begin_connect() {
            Ok(pending) => pending,
            Err(e) => future::ready(Err(e)).boxed_local().shared(),
        }
    }

    fn begin_connect(&self) -> Result<ConnectFuture, SessionError> {
        let mut inner = self.inner.borrow_mut();
        if let Some(pending) = inner.pending.as_ref().and_then(WeakShared::upgrade) {
            debug!("connect already in flight, joining it");
            return Ok(pending);
        }
        if let Some(connection) = inner.phase.connection() {
            return Ok(future::ready(Ok(connection.address.clone())).boxed_local().shared());
        }
        let Some(provider) = (self.detect)() else {
            inner.last_error = Some(SessionError::NoProviderFound);
            return Err(SessionError::NoProviderFound);
        };

        inner.transition(Phase::Connecting);
        inner.last_error = None;
        let mut guard = AttemptGuard { session: self.clone(), attempt: inner.epoch, settled: false };
        let pending = async move {
            let outcome = guard.session.run_connect(provider, guard.attempt).await;
            guard.settled = true;
            outcome
        }
        .boxed_local()
        .shared();
        inner.pending = pending.downgrade();
        drop(inner);
        self.notify();

        // The page's microtask queue is always there to finish the attempt.
        #[cfg(feature = "wasm")]
        runtime::spawn_local(pending.clone().map(drop));

        // Put the prompt in front of the user now, not at the caller's first poll.
        let waker = futures::task::noop_waker();
        if let Poll::Ready(outcome) = pending.clone().poll_unpin(&mut Context::from_waker(&waker)) {
            debug!(ok = outcome.is_ok(), "connect settled without suspending");
        }
        Ok(pending)
    }

    /// Every holder of the attempt dropped it before the wallet answered.
    fn abandon_attempt(&self, attempt: u64) {
        let Ok(mut inner) = self.inner.try_borrow_mut() else { return };
        if inner.epoch != attempt {
            return;
        }
        inner.pending = None;
        inner.transition(Phase::Disconnected);
        drop(inner);
        self.persist(false);
        info!("connect attempt abandoned before the wallet answered");
        self.notify();
    }

    async fn run_connect(&self, provider: Rc<P>, attempt: u64) -> ConnectOutcome {
        let result = authorize(&*provider).await;

        let mut inner = self.inner.borrow_mut();
        if inner.epoch != attempt {
            debug!("connect attempt superseded by disconnect");
            return Err(SessionError::rejected("disconnected while connecting"));
        }
        inner.pending = None;
        match result {
            Ok(connection) => {
                let address = connection.address.clone();
                let chain = connection.chain_id;
                inner.transition(Phase::Connected(connection));
                drop(inner);
                self.persist(true);
                self.notify();
                info!(address = %address, chain = %chain, "wallet connected");

                let target = self.config.network.chain_id();
                if self.config.negotiate_network && chain != target {
                    self.spawn_negotiation(provider);
                }
                Ok(address)
            }
            Err(error) => {
                inner.transition(Phase::Disconnected);
                inner.last_error = Some(error.clone());
                drop(inner);
                self.persist(false);
                self.notify_status(ConnectionStatus::Error);
                self.notify();
                info!(error = %error, "wallet connection failed");
                Err(error)
            }
        }
    }

    fn spawn_negotiation(&self, provider: Rc<P>) {
        let session = self.clone();
        let descriptor = self.config.network.descriptor();
        runtime::spawn_local(async move {
            match negotiate::negotiate_network(&*provider, &descriptor).await {
                Ok(()) => {
                    info!(chain = %descriptor.chain_name, "wallet on target network");
                    session.refresh_chain(None).await;
                }
                Err(e) => {
                    let error = SessionError::NetworkNegotiationFailed { reason: format!("{e:#}") };
                    warn!(error = %error, "network negotiation failed; staying connected");
                }
            }
        });
    }

    /// Idempotent; safe in any state. Forgets the account, signer, chain and flag.
    /// Always moves the epoch, so a restore still in flight cannot undo it.
    pub fn disconnect(&self) {
        let changed = {
            let mut inner = self.inner.borrow_mut();
            inner.pending = None;
            let changed = !matches!(inner.phase, Phase::Disconnected);
            inner.transition(Phase::Disconnected);
            changed
        };
        self.persist(false);
        if changed {
            info!("wallet disconnected");
            self.notify();
        }
    }

    // =========================================================================
    // Ambient: extension events and reconciliation
    // =========================================================================

    pub async fn handle_event(&self, event: ProviderEvent) {
        if self.status() == ConnectionStatus::Connecting {
            debug!(?event, "ignoring wallet event while connecting");
            return;
        }
        match event {
            ProviderEvent::AccountsChanged(accounts) => self.accounts_changed(accounts).await,
            ProviderEvent::ChainChanged(chain) => self.refresh_chain(Some(chain)).await,
            ProviderEvent::Disconnected => {
                info!("wallet extension reported disconnect");
                self.disconnect();
            }
        }
    }

    async fn accounts_changed(&self, accounts: Vec<String>) {
        if accounts.is_empty() {
            self.disconnect();
            return;
        }
        let (epoch, current) = {
            let inner = self.inner.borrow();
            match inner.phase.connection() {
                Some(c) => (inner.epoch, c.address.clone()),
                None => return,
            }
        };
        let address = match Address::parse(&accounts[0]) {
            Ok(a) => a,
            Err(e) => {
                warn!(error = %e, "wallet reported a malformed account; disconnecting");
                self.disconnect();
                return;
            }
        };
        if address == current {
            return;
        }
        let Some(provider) = (self.detect)() else { return };
        let signer = provider.signer(&address).await;

        let mut inner = self.inner.borrow_mut();
        if inner.epoch != epoch {
            debug!("account switch discarded: session moved on");
            return;
        }
        let chain_id = match inner.phase.connection() {
            Some(c) => c.chain_id,
            None => return,
        };
        match signer {
            Ok(signer) => {
                info!(from = %current, to = %address, "wallet account changed");
                inner.transition(Phase::Connected(Connection { address, chain_id, signer: Rc::new(signer) }));
                drop(inner);
                self.notify();
            }
            Err(e) => {
                drop(inner);
                warn!(error = %e, "could not derive signer for new account; disconnecting");
                self.disconnect();
            }
        }
    }

    /// Re-derive signer and chain id against the wallet's current network.
    /// Keeps the connection even if derivation fails, falling back to `hint`.
    async fn refresh_chain(&self, hint: Option<ChainId>) {
        let (epoch, address) = {
            let inner = self.inner.borrow();
            match inner.phase.connection() {
                Some(c) => (inner.epoch, c.address.clone()),
                None => return,
            }
        };
        let Some(provider) = (self.detect)() else { return };
        let derived = match provider.signer(&address).await {
            Ok(signer) => provider.chain_id().await.map(|chain| (signer, chain)),
            Err(e) => Err(e),
        };

        let mut inner = self.inner.borrow_mut();
        if inner.epoch != epoch {
            debug!("chain refresh discarded: session moved on");
            return;
        }
        let next = match derived {
            Ok((signer, chain_id)) => Connection { address, chain_id, signer: Rc::new(signer) },
            Err(e) => {
                warn!(error = %e, "could not refresh signer after chain change");
                let (Some(chain_id), Some(current)) = (hint, inner.phase.connection()) else { return };
                Connection { address, chain_id, signer: current.signer.clone() }
            }
        };
        if inner.phase.connection().map(|c| c.chain_id) != Some(next.chain_id) {
            info!(chain = %next.chain_id, "wallet network changed");
        }
        inner.transition(Phase::Connected(next));
        drop(inner);
        self.notify();
    }

    /// One consistency check against the wallet's authorized accounts, for
    /// hosts where change events are unreliable.
    pub async fn reconcile(&self) {
        let (epoch, status, current) = {
            let inner = self.inner.borrow();
            (inner.epoch, inner.phase.status(), inner.phase.connection().map(|c| c.address.clone()))
        };
        if status == ConnectionStatus::Connecting {
            return;
        }
        let Some(provider) = (self.detect)() else {
            if status.is_connected() {
                info!("wallet extension no longer present");
                self.disconnect();
            }
            return;
        };
        let accounts = match provider.authorized_accounts().await {
            Ok(accounts) => accounts,
            Err(e) => {
                debug!(error = %e, "reconcile: eth_accounts failed");
                return;
            }
        };
        if self.inner.borrow().epoch != epoch {
            return;
        }
        match (accounts.is_empty(), current) {
            (true, Some(_)) => {
                info!("wallet no longer authorizes any account");
                self.disconnect();
            }
            (false, None) if self.persisted() => {
                debug!("reconcile: authorized accounts present, restoring");
                self.restore().await;
            }
            (false, Some(current)) => {
                if Address::parse(&accounts[0]).map_or(true, |a| a != current) {
                    self.accounts_changed(accounts).await;
                }
            }
            _ => {}
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn persist(&self, connected: bool) {
        let key = &self.config.storage_key;
        let result = if connected { self.store.save(key, true) } else { self.store.remove(key) };
        if let Err(e) = result {
            warn!(error = %e, connected, "could not persist session flag");
        }
    }

    fn notify(&self) {
        let snapshot = self.snapshot();
        self.publish(snapshot);
    }

    fn notify_status(&self, status: ConnectionStatus) {
        let snapshot = SessionSnapshot { status, ..self.snapshot() };
        self.publish(snapshot);
    }

    fn publish(&self, snapshot: SessionSnapshot) {
        self.inner.borrow_mut().watchers.retain(|tx| tx.unbounded_send(snapshot.clone()).is_ok());
    }
}

/// Rolls the session back to `Disconnected` if the attempt future is dropped
/// before it settles.
struct AttemptGuard<P: WalletProvider + 'static> {
    session: WalletSession<P>,
    attempt: u64,
    settled: bool,
}

impl<P: WalletProvider + 'static> Drop for AttemptGuard<P> {
    fn drop(&mut self) {
        if !self.settled {
            self.session.abandon_attempt(self.attempt);
        }
    }
}

/// Prompt for accounts, falling back to the already-authorized list when the
/// prompt throws or comes back empty (some extensions throw on rapid repeat
/// requests even though access was granted earlier).
async fn authorize<P: WalletProvider + ?Sized>(provider: &P) -> Result<Connection<P::Signer>, SessionError> {
    let accounts = match provider.request_accounts().await {
        Ok(accounts) if !accounts.is_empty() => accounts,
        outcome => {
            let reason = match outcome {
                Ok(_) => "no accounts granted".to_string(),
                Err(e) => e.to_string(),
            };
            debug!(%reason, "eth_requestAccounts gave nothing, trying eth_accounts");
            match provider.authorized_accounts().await {
                Ok(accounts) if !accounts.is_empty() => accounts,
                _ => return Err(SessionError::ConnectionRejected { reason }),
            }
        }
    };
    derive(provider, &accounts).await.map_err(|reason| SessionError::DerivationFailed { reason })
}

/// Signer and chain id for the first account, both from the same provider.
async fn derive<P: WalletProvider + ?Sized>(provider: &P, accounts: &[String]) -> Result<Connection<P::Signer>, String> {
    let first = accounts.first().ok_or_else(|| "no accounts".to_string())?;
    let address = Address::parse(first).map_err(|e| e.to_string())?;
    let signer = provider.signer(&address).await.map_err(|e| e.to_string())?;
    let chain_id = provider.chain_id().await.map_err(|e| e.to_string())?;
    Ok(Connection { address, chain_id, signer: Rc::new(signer) })
}
