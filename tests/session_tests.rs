//! Session Test Suite: the state machine against a scripted wallet
//!
//! Covers the session invariants (address, signer and status move together),
//! idempotent disconnect, the connect reentrancy guard and its rollback when
//! abandoned, silent restoration, event handling, stale wallet answers,
//! best-effort network negotiation, and the cold start / warm start /
//! rejected prompt scenarios.

use avalaunch::provider::mock::RequestScript;
use avalaunch::{
    Address, ChainId, ConnectionStatus, FlagStore, MemoryFlagStore, MockProvider, Network, ProviderError, ProviderEvent,
    SessionConfig, SessionError, SessionSnapshot, WalletSession,
};
use std::future::Future;
use std::rc::Rc;

const ACCOUNT: &str = "0xABC0000000000000000000000000000000001234";
const OTHER: &str = "0x71C7656EC7ab88b098defB751B7401B5f6d8976F";
const FLAG: &str = "walletConnected";
const FUJI: ChainId = ChainId(43113);
const MAINNET: ChainId = ChainId(43114);

fn run<F: Future<Output = ()>>(test: F) {
    let rt = tokio::runtime::Builder::new_current_thread().enable_time().build().expect("runtime");
    tokio::task::LocalSet::new().block_on(&rt, test);
}

/// Let spawned local tasks (negotiation, racing handlers) run to completion.
async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

fn session(wallet: &Rc<MockProvider>, store: &MemoryFlagStore) -> WalletSession<MockProvider> {
    WalletSession::new(SessionConfig::new(Network::Fuji), store.clone(), wallet.detector())
}

fn addr(raw: &str) -> Address { Address::parse(raw).expect("address") }

/// Address, signer and status are either all present or all absent.
fn assert_consistent(session: &WalletSession<MockProvider>) {
    let connected = session.status() == ConnectionStatus::Connected;
    assert_eq!(session.address().is_some(), connected, "address vs status");
    assert_eq!(session.signer().is_some(), connected, "signer vs status");
    assert_eq!(session.chain_id().is_some(), connected, "chain vs status");
}

async fn connected(wallet: &Rc<MockProvider>, store: &MemoryFlagStore) -> WalletSession<MockProvider> {
    let session = session(wallet, store);
    session.connect().await.expect("connect");
    settle().await;
    assert_eq!(session.status(), ConnectionStatus::Connected);
    session
}

// =============================================================================
// connect()
// =============================================================================

#[test]
fn connect_grants_and_persists() {
    run(async {
        let wallet = MockProvider::new(&[ACCOUNT], FUJI);
        let store = MemoryFlagStore::new();
        let session = session(&wallet, &store);
        assert_consistent(&session);

        let address = session.connect().await.expect("connect");
        assert_eq!(address, addr(ACCOUNT));
        assert_eq!(address.to_string(), "0xabc0000000000000000000000000000000001234");
        assert_eq!(session.status(), ConnectionStatus::Connected);
        assert_eq!(session.chain_id(), Some(FUJI));
        assert_eq!(store.get(FLAG), Some(true));
        assert_eq!(session.signer().map(|s| s.chain_id()), Some(FUJI));
        assert_consistent(&session);

        // Already connected: no second prompt.
        assert_eq!(session.connect().await.expect("again"), address);
        assert_eq!(wallet.request_calls(), 1);
    });
}

#[test]
fn concurrent_connect_prompts_once() {
    run(async {
        let wallet = MockProvider::new(&[ACCOUNT], FUJI);
        wallet.script_request(RequestScript::Hold);
        let store = MemoryFlagStore::new();
        let session = session(&wallet, &store);

        let first = session.connect();
        let second = session.connect();
        settle().await;
        assert_eq!(session.status(), ConnectionStatus::Connecting);
        assert_eq!(wallet.request_calls(), 1);
        assert_consistent(&session);

        wallet.release_requests();
        let (a, b) = futures::join!(first, second);
        assert_eq!(a.expect("first"), addr(ACCOUNT));
        assert_eq!(b.expect("second"), addr(ACCOUNT));
        assert_eq!(wallet.request_calls(), 1);
        assert_eq!(session.status(), ConnectionStatus::Connected);
    });
}

#[test]
fn abandoned_connect_rolls_back() {
    run(async {
        let wallet = MockProvider::new(&[ACCOUNT], FUJI);
        wallet.script_request(RequestScript::Hold);
        let store = MemoryFlagStore::with_flag(FLAG, true);
        let session = session(&wallet, &store);
        let mut updates = session.subscribe();

        let attempt = session.connect();
        assert_eq!(wallet.request_calls(), 1);
        assert_eq!(session.status(), ConnectionStatus::Connecting);
        drop(attempt);

        assert_eq!(session.status(), ConnectionStatus::Disconnected);
        assert_eq!(store.get(FLAG), None);
        assert_consistent(&session);
        let seen: Vec<_> = std::iter::from_fn(|| updates.try_next().ok().flatten()).map(|s| s.status).collect();
        assert_eq!(seen, vec![ConnectionStatus::Connecting, ConnectionStatus::Disconnected]);

        // The late answer to the dropped prompt changes nothing.
        wallet.release_requests();
        settle().await;
        assert_eq!(session.status(), ConnectionStatus::Disconnected);

        wallet.script_request(RequestScript::Grant);
        assert_eq!(session.connect().await.expect("retry"), addr(ACCOUNT));
        assert_eq!(wallet.request_calls(), 2);
    });
}

#[test]
fn attempt_survives_while_any_caller_holds_it() {
    run(async {
        let wallet = MockProvider::new(&[ACCOUNT], FUJI);
        wallet.script_request(RequestScript::Hold);
        let store = MemoryFlagStore::new();
        let session = session(&wallet, &store);

        let first = session.connect();
        let second = session.connect();
        drop(first);
        assert_eq!(session.status(), ConnectionStatus::Connecting);

        wallet.release_requests();
        assert_eq!(second.await.expect("second"), addr(ACCOUNT));
        assert_eq!(session.status(), ConnectionStatus::Connected);
        assert_eq!(store.get(FLAG), Some(true));
    });
}

/// A plain `block_on` host with no `LocalSet` still gets a settled session.
#[test]
fn connect_settles_without_local_set() {
    let rt = tokio::runtime::Builder::new_current_thread().enable_time().build().expect("runtime");
    let wallet = MockProvider::new(&[ACCOUNT], FUJI);
    wallet.script_request(RequestScript::Hold);
    let store = MemoryFlagStore::new();
    let session = session(&wallet, &store);

    let attempt = session.connect();
    wallet.release_requests();
    assert_eq!(rt.block_on(attempt).expect("connect"), addr(ACCOUNT));
    assert_eq!(session.status(), ConnectionStatus::Connected);
    assert_eq!(store.get(FLAG), Some(true));
    assert_consistent(&session);

    session.disconnect();
    wallet.script_request(RequestScript::Fail(ProviderError::UserRejected));
    wallet.revoke();
    assert!(rt.block_on(session.connect()).is_err());
    assert_eq!(session.status(), ConnectionStatus::Disconnected);
}

#[test]
fn connect_falls_back_to_authorized_accounts() {
    run(async {
        let wallet = MockProvider::new(&[ACCOUNT], FUJI);
        wallet.authorize();
        wallet.script_request(RequestScript::Fail(ProviderError::RequestPending));
        let store = MemoryFlagStore::new();
        let session = session(&wallet, &store);

        assert_eq!(session.connect().await.expect("fallback"), addr(ACCOUNT));
        assert_eq!(wallet.authorized_calls(), 1);
        assert_consistent(&session);
    });
}

#[test]
fn connect_without_extension_fails_fast() {
    run(async {
        let wallet = MockProvider::new(&[ACCOUNT], FUJI);
        wallet.uninstall();
        let store = MemoryFlagStore::new();
        let session = session(&wallet, &store);

        let err = session.connect().await.expect_err("no provider");
        assert_eq!(err, SessionError::NoProviderFound);
        assert_eq!(session.status(), ConnectionStatus::Disconnected);
        assert_eq!(session.last_error(), Some(SessionError::NoProviderFound));
        assert_eq!(wallet.request_calls(), 0);
    });
}

#[test]
fn derivation_failure_rolls_back() {
    run(async {
        let wallet = MockProvider::new(&[ACCOUNT], FUJI);
        wallet.fail_signer(Some(ProviderError::Disconnected));
        let store = MemoryFlagStore::with_flag(FLAG, true);
        let session = session(&wallet, &store);

        let err = session.connect().await.expect_err("derivation");
        assert_eq!(err.kind(), "DerivationFailed");
        assert_eq!(session.status(), ConnectionStatus::Disconnected);
        assert_eq!(store.get(FLAG), None);
        assert_consistent(&session);
    });
}

#[test]
fn failed_connect_publishes_transient_error() {
    run(async {
        let wallet = MockProvider::new(&[ACCOUNT], FUJI);
        wallet.script_request(RequestScript::Fail(ProviderError::UserRejected));
        let store = MemoryFlagStore::new();
        let session = session(&wallet, &store);
        let mut updates = session.subscribe();

        assert!(session.connect().await.is_err());
        let mut seen = Vec::new();
        while let Ok(Some(snapshot)) = updates.try_next() {
            seen.push(snapshot.status);
        }
        assert_eq!(
            seen,
            vec![ConnectionStatus::Connecting, ConnectionStatus::Error, ConnectionStatus::Disconnected]
        );
    });
}

/// Scenario: user rejects the prompt and nothing was authorized before.
#[test]
fn rejected_prompt_surfaces_connection_rejected() {
    run(async {
        let wallet = MockProvider::new(&[ACCOUNT], FUJI);
        wallet.script_request(RequestScript::Fail(ProviderError::UserRejected));
        let store = MemoryFlagStore::new();
        let session = session(&wallet, &store);

        let err = session.connect().await.expect_err("rejected");
        assert!(matches!(err, SessionError::ConnectionRejected { .. }));
        assert_eq!(wallet.authorized_calls(), 1);
        assert_eq!(session.status(), ConnectionStatus::Disconnected);
        assert_eq!(session.address(), None);
        assert_eq!(store.get(FLAG), None);
        assert_eq!(session.last_error().map(|e| e.kind()), Some("ConnectionRejected"));
        assert_consistent(&session);
    });
}

#[test]
fn disconnect_during_connect_wins() {
    run(async {
        let wallet = MockProvider::new(&[ACCOUNT], FUJI);
        wallet.script_request(RequestScript::Hold);
        let store = MemoryFlagStore::new();
        let session = session(&wallet, &store);

        let attempt = session.connect();
        settle().await;
        session.disconnect();
        wallet.release_requests();

        assert!(attempt.await.is_err());
        settle().await;
        assert_eq!(session.status(), ConnectionStatus::Disconnected);
        assert_eq!(store.get(FLAG), None);
        assert_consistent(&session);
    });
}

// =============================================================================
// disconnect()
// =============================================================================

#[test]
fn disconnect_is_idempotent() {
    run(async {
        let wallet = MockProvider::new(&[ACCOUNT], FUJI);
        let store = MemoryFlagStore::new();
        let session = connected(&wallet, &store).await;
        let mut updates = session.subscribe();

        for _ in 0..3 {
            session.disconnect();
            assert_eq!(session.snapshot(), SessionSnapshot::default());
            assert_eq!(store.get(FLAG), None);
            assert_consistent(&session);
        }
        // Only the first call is a transition.
        assert!(matches!(updates.try_next(), Ok(Some(_))));
        assert!(updates.try_next().is_err());
    });
}

// =============================================================================
// restore() / initialize()
// =============================================================================

/// Scenario: cold start, nothing persisted.
#[test]
fn cold_start_does_not_restore() {
    run(async {
        let wallet = MockProvider::new(&[ACCOUNT], FUJI);
        wallet.authorize();
        let store = MemoryFlagStore::new();
        let session = session(&wallet, &store);

        session.initialize().await;
        assert!(session.is_initialized());
        assert_eq!(wallet.authorized_calls(), 0);
        assert_eq!(session.status(), ConnectionStatus::Disconnected);
    });
}

/// Scenario: warm start with a still-authorized account.
#[test]
fn warm_start_restores_lowercased() {
    run(async {
        let wallet = MockProvider::new(&[ACCOUNT], FUJI);
        wallet.authorize();
        let store = MemoryFlagStore::with_flag(FLAG, true);
        let session = session(&wallet, &store);

        session.initialize().await;
        assert_eq!(session.status(), ConnectionStatus::Connected);
        assert_eq!(session.address().map(|a| a.to_string()), Some(ACCOUNT.to_ascii_lowercase()));
        assert_eq!(wallet.request_calls(), 0);
        assert_consistent(&session);
    });
}

#[test]
fn restore_with_no_accounts_is_silent() {
    run(async {
        let wallet = MockProvider::new(&[ACCOUNT], FUJI);
        let store = MemoryFlagStore::with_flag(FLAG, true);
        let session = session(&wallet, &store);

        assert!(!session.restore().await);
        assert_eq!(session.status(), ConnectionStatus::Disconnected);
        assert_eq!(store.get(FLAG), None);
        assert_eq!(session.last_error(), None);
    });
}

#[test]
fn restore_failure_clears_flag() {
    run(async {
        let wallet = MockProvider::new(&[ACCOUNT], FUJI);
        wallet.authorize();
        wallet.fail_chain_id(Some(ProviderError::Disconnected));
        let store = MemoryFlagStore::with_flag(FLAG, true);
        let session = session(&wallet, &store);

        session.initialize().await;
        assert_eq!(session.status(), ConnectionStatus::Disconnected);
        assert_eq!(store.get(FLAG), None);
        assert_consistent(&session);
    });
}

#[test]
fn restore_without_extension_is_noop() {
    run(async {
        let wallet = MockProvider::new(&[ACCOUNT], FUJI);
        wallet.uninstall();
        let store = MemoryFlagStore::with_flag(FLAG, true);
        let session = session(&wallet, &store);

        session.initialize().await;
        assert!(session.is_initialized());
        assert_eq!(session.status(), ConnectionStatus::Disconnected);
        // The hint survives: the extension may just not be injected yet.
        assert_eq!(store.get(FLAG), Some(true));
    });
}

// =============================================================================
// Extension events
// =============================================================================

#[test]
fn empty_accounts_event_disconnects() {
    run(async {
        let wallet = MockProvider::new(&[ACCOUNT], FUJI);
        let store = MemoryFlagStore::new();
        let session = connected(&wallet, &store).await;

        session.handle_event(ProviderEvent::AccountsChanged(vec![])).await;
        assert_eq!(session.status(), ConnectionStatus::Disconnected);
        assert_eq!(session.address(), None);
        assert_eq!(store.get(FLAG), None);
        assert_consistent(&session);
    });
}

#[test]
fn accounts_event_switches_primary_without_flicker() {
    run(async {
        let wallet = MockProvider::new(&[ACCOUNT], FUJI);
        let store = MemoryFlagStore::new();
        let session = connected(&wallet, &store).await;
        let mut updates = session.subscribe();

        session.handle_event(ProviderEvent::AccountsChanged(vec![OTHER.into(), ACCOUNT.into()])).await;
        assert_eq!(session.address(), Some(addr(OTHER)));
        assert_eq!(session.signer().map(|s| avalaunch::TransactionSigner::address(&*s).clone()), Some(addr(OTHER)));

        let snapshot = updates.try_next().expect("update").expect("open");
        assert_eq!(snapshot.status, ConnectionStatus::Connected);
        assert!(updates.try_next().is_err());
    });
}

#[test]
fn same_account_event_is_noop() {
    run(async {
        let wallet = MockProvider::new(&[ACCOUNT], FUJI);
        let store = MemoryFlagStore::new();
        let session = connected(&wallet, &store).await;
        let calls = wallet.signer_calls();

        session.handle_event(ProviderEvent::AccountsChanged(vec![ACCOUNT.to_ascii_lowercase()])).await;
        assert_eq!(wallet.signer_calls(), calls);
        assert_eq!(session.address(), Some(addr(ACCOUNT)));
    });
}

#[test]
fn chain_event_keeps_connection() {
    run(async {
        let wallet = MockProvider::new(&[ACCOUNT], FUJI);
        let store = MemoryFlagStore::new();
        let session = connected(&wallet, &store).await;

        wallet.set_chain(MAINNET);
        session.handle_event(ProviderEvent::ChainChanged(MAINNET)).await;
        assert_eq!(session.status(), ConnectionStatus::Connected);
        assert_eq!(session.address(), Some(addr(ACCOUNT)));
        assert_eq!(session.chain_id(), Some(MAINNET));
        assert_eq!(session.signer().map(|s| s.chain_id()), Some(MAINNET));
    });
}

#[test]
fn chain_event_with_failing_derivation_uses_payload() {
    run(async {
        let wallet = MockProvider::new(&[ACCOUNT], FUJI);
        let store = MemoryFlagStore::new();
        let session = connected(&wallet, &store).await;

        wallet.fail_signer(Some(ProviderError::Disconnected));
        session.handle_event(ProviderEvent::ChainChanged(MAINNET)).await;
        assert_eq!(session.status(), ConnectionStatus::Connected);
        assert_eq!(session.chain_id(), Some(MAINNET));
        assert_consistent(&session);
    });
}

#[test]
fn disconnect_event_disconnects() {
    run(async {
        let wallet = MockProvider::new(&[ACCOUNT], FUJI);
        let store = MemoryFlagStore::new();
        let session = connected(&wallet, &store).await;

        session.handle_event(ProviderEvent::Disconnected).await;
        assert_eq!(session.status(), ConnectionStatus::Disconnected);
        assert_consistent(&session);
    });
}

#[test]
fn events_ignored_while_connecting() {
    run(async {
        let wallet = MockProvider::new(&[ACCOUNT], FUJI);
        wallet.script_request(RequestScript::Hold);
        let store = MemoryFlagStore::new();
        let session = session(&wallet, &store);

        let attempt = session.connect();
        settle().await;
        session.handle_event(ProviderEvent::AccountsChanged(vec![])).await;
        session.handle_event(ProviderEvent::Disconnected).await;
        assert_eq!(session.status(), ConnectionStatus::Connecting);

        wallet.release_requests();
        assert!(attempt.await.is_ok());
        assert_eq!(session.status(), ConnectionStatus::Connected);
    });
}

// =============================================================================
// Stale wallet answers
// =============================================================================

#[test]
fn stale_account_switch_after_disconnect_is_dropped() {
    run(async {
        let wallet = MockProvider::new(&[ACCOUNT], FUJI);
        let store = MemoryFlagStore::new();
        let session = connected(&wallet, &store).await;

        wallet.hold_signers();
        let switch = {
            let session = session.clone();
            tokio::task::spawn_local(async move {
                session.handle_event(ProviderEvent::AccountsChanged(vec![OTHER.into()])).await;
            })
        };
        settle().await;
        assert_eq!(wallet.held_signers(), 1);

        session.disconnect();
        wallet.release_signers();
        switch.await.expect("switch task");

        assert_eq!(session.status(), ConnectionStatus::Disconnected);
        assert_eq!(session.address(), None);
        assert_eq!(store.get(FLAG), None);
        assert_consistent(&session);
    });
}

#[test]
fn stale_chain_refresh_after_disconnect_is_dropped() {
    run(async {
        let wallet = MockProvider::new(&[ACCOUNT], FUJI);
        let store = MemoryFlagStore::new();
        let session = connected(&wallet, &store).await;

        wallet.set_chain(MAINNET);
        wallet.hold_signers();
        let refresh = {
            let session = session.clone();
            tokio::task::spawn_local(async move { session.handle_event(ProviderEvent::ChainChanged(MAINNET)).await })
        };
        settle().await;
        assert_eq!(wallet.held_signers(), 1);

        session.disconnect();
        wallet.release_signers();
        refresh.await.expect("refresh task");

        assert_eq!(session.status(), ConnectionStatus::Disconnected);
        assert_eq!(session.chain_id(), None);
        assert_consistent(&session);
    });
}

#[test]
fn restore_racing_connect_is_discarded() {
    run(async {
        let wallet = MockProvider::new(&[ACCOUNT], FUJI);
        wallet.authorize();
        let store = MemoryFlagStore::with_flag(FLAG, true);
        let session = session(&wallet, &store);

        wallet.hold_authorized();
        let restore = {
            let session = session.clone();
            tokio::task::spawn_local(async move { session.restore().await })
        };
        settle().await;
        assert_eq!(wallet.held_authorized(), 1);

        session.connect().await.expect("connect");
        let mut updates = session.subscribe();
        wallet.release_authorized();

        // Reports the live state, but did not transition on top of connect.
        assert!(restore.await.expect("restore task"));
        assert!(updates.try_next().is_err());
        assert_eq!(session.address(), Some(addr(ACCOUNT)));
        assert_eq!(wallet.request_calls(), 1);
    });
}

#[test]
fn restore_racing_disconnect_is_discarded() {
    run(async {
        let wallet = MockProvider::new(&[ACCOUNT], FUJI);
        wallet.authorize();
        let store = MemoryFlagStore::with_flag(FLAG, true);
        let session = session(&wallet, &store);

        wallet.hold_authorized();
        let restore = {
            let session = session.clone();
            tokio::task::spawn_local(async move { session.restore().await })
        };
        settle().await;

        session.disconnect();
        wallet.release_authorized();

        assert!(!restore.await.expect("restore task"));
        assert_eq!(session.status(), ConnectionStatus::Disconnected);
        assert_eq!(store.get(FLAG), None);
        assert_consistent(&session);
    });
}

#[test]
fn stale_reconcile_after_reconnect_is_dropped() {
    run(async {
        let wallet = MockProvider::new(&[ACCOUNT], FUJI);
        let store = MemoryFlagStore::new();
        let session = connected(&wallet, &store).await;

        // The poll reads "nothing authorized" while the user is reconnecting.
        wallet.revoke();
        wallet.hold_authorized();
        let poll = {
            let session = session.clone();
            tokio::task::spawn_local(async move { session.reconcile().await })
        };
        settle().await;
        assert_eq!(wallet.held_authorized(), 1);

        session.disconnect();
        session.connect().await.expect("reconnect");
        wallet.release_authorized();
        poll.await.expect("reconcile task");

        assert_eq!(session.status(), ConnectionStatus::Connected);
        assert_eq!(store.get(FLAG), Some(true));
        assert_consistent(&session);
    });
}

// =============================================================================
// Network negotiation
// =============================================================================

#[test]
fn negotiation_switches_to_target_chain() {
    run(async {
        let wallet = MockProvider::new(&[ACCOUNT], MAINNET);
        wallet.know_chain(FUJI);
        let store = MemoryFlagStore::new();
        let session = connected(&wallet, &store).await;

        assert_eq!(wallet.switch_calls(), 1);
        assert_eq!(wallet.current_chain(), FUJI);
        assert_eq!(session.chain_id(), Some(FUJI));
        assert!(wallet.added_chains().is_empty());
    });
}

#[test]
fn negotiation_adds_unknown_chain() {
    run(async {
        let wallet = MockProvider::new(&[ACCOUNT], MAINNET);
        let store = MemoryFlagStore::new();
        let session = connected(&wallet, &store).await;

        let added = wallet.added_chains();
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].chain_id, FUJI);
        assert_eq!(wallet.switch_calls(), 2);
        assert_eq!(session.chain_id(), Some(FUJI));
    });
}

#[test]
fn negotiation_skipped_on_target_chain() {
    run(async {
        let wallet = MockProvider::new(&[ACCOUNT], FUJI);
        let store = MemoryFlagStore::new();
        let _session = connected(&wallet, &store).await;
        assert_eq!(wallet.switch_calls(), 0);
    });
}

#[test]
fn negotiation_failure_keeps_connection() {
    run(async {
        let wallet = MockProvider::new(&[ACCOUNT], MAINNET);
        wallet.fail_add(Some(ProviderError::UserRejected));
        let store = MemoryFlagStore::new();
        let session = connected(&wallet, &store).await;

        assert_eq!(wallet.added_chains().len(), 1);
        assert_eq!(session.status(), ConnectionStatus::Connected);
        assert_eq!(session.chain_id(), Some(MAINNET));
        assert_eq!(session.last_error(), None);
        assert_eq!(store.get(FLAG), Some(true));
    });
}

#[test]
fn negotiation_can_be_disabled() {
    run(async {
        let wallet = MockProvider::new(&[ACCOUNT], MAINNET);
        let store = MemoryFlagStore::new();
        let session = WalletSession::new(
            SessionConfig::new(Network::Fuji).without_network_negotiation(),
            store.clone(),
            wallet.detector(),
        );
        session.connect().await.expect("connect");
        settle().await;
        assert_eq!(wallet.switch_calls(), 0);
        assert_eq!(session.chain_id(), Some(MAINNET));
    });
}

// =============================================================================
// Reconciliation
// =============================================================================

#[test]
fn reconcile_disconnects_when_authorization_revoked() {
    run(async {
        let wallet = MockProvider::new(&[ACCOUNT], FUJI);
        let store = MemoryFlagStore::new();
        let session = connected(&wallet, &store).await;

        wallet.revoke();
        session.reconcile().await;
        assert_eq!(session.status(), ConnectionStatus::Disconnected);
        assert_eq!(store.get(FLAG), None);
    });
}

#[test]
fn reconcile_disconnects_when_extension_removed() {
    run(async {
        let wallet = MockProvider::new(&[ACCOUNT], FUJI);
        let store = MemoryFlagStore::new();
        let session = connected(&wallet, &store).await;

        wallet.uninstall();
        session.reconcile().await;
        assert_eq!(session.status(), ConnectionStatus::Disconnected);
    });
}

#[test]
fn reconcile_restores_persisted_session() {
    run(async {
        let wallet = MockProvider::new(&[ACCOUNT], FUJI);
        let store = MemoryFlagStore::with_flag(FLAG, true);
        let session = session(&wallet, &store);
        session.initialize().await;
        assert_eq!(session.status(), ConnectionStatus::Disconnected);

        // Startup restore found nothing and cleared the hint; the user then
        // approves from the extension and the page persists the hint again.
        wallet.authorize();
        session.reconcile().await;
        assert_eq!(session.status(), ConnectionStatus::Disconnected);

        store.save(FLAG, true).expect("save");
        session.reconcile().await;
        assert_eq!(session.status(), ConnectionStatus::Connected);
    });
}

#[test]
fn reconcile_respects_explicit_disconnect() {
    run(async {
        let wallet = MockProvider::new(&[ACCOUNT], FUJI);
        let store = MemoryFlagStore::new();
        let session = connected(&wallet, &store).await;

        session.disconnect();
        assert!(wallet.is_authorized());
        session.reconcile().await;
        assert_eq!(session.status(), ConnectionStatus::Disconnected);
    });
}

#[test]
fn reconcile_picks_up_account_switch() {
    run(async {
        let wallet = MockProvider::new(&[ACCOUNT], FUJI);
        let store = MemoryFlagStore::new();
        let session = connected(&wallet, &store).await;

        wallet.set_accounts(&[OTHER]);
        session.reconcile().await;
        assert_eq!(session.address(), Some(addr(OTHER)));
        assert_eq!(session.status(), ConnectionStatus::Connected);
    });
}

#[test]
fn display_name_follows_status() {
    run(async {
        let wallet = MockProvider::new(&[ACCOUNT], FUJI);
        wallet.script_request(RequestScript::Hold);
        let store = MemoryFlagStore::new();
        let session = session(&wallet, &store);
        assert_eq!(session.snapshot().display_name(), "Connect Wallet");

        let attempt = session.connect();
        settle().await;
        assert_eq!(session.snapshot().display_name(), "Connecting...");

        wallet.release_requests();
        attempt.await.expect("connect");
        assert_eq!(session.snapshot().display_name(), "0xab...1234");
    });
}
