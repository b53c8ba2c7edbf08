//! Ambient loop: extension events plus the periodic consistency check.
//!
//! ```text
//! start() ── initialize() ── provider.watch() ──▶ loop {
//!                                                   event  → handle_event
//!                                                   tick   → resubscribe if needed, reconcile
//!                                                 }
//! drop(WatchHandle) ── abort loop ── provider.unwatch()
//! ```

use super::WalletSession;
use crate::provider::{EventReceiver, ProviderEvent, WalletProvider};
use crate::runtime;
use futures::future::{self, AbortHandle, FutureExt};
use futures::StreamExt;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, info};

type Subscribed<P> = Rc<RefCell<Option<Rc<P>>>>;

/// Keeps the listeners and the poll alive. Dropping it tears both down.
pub struct WatchHandle<P: WalletProvider> {
    abort: AbortHandle,
    subscribed: Subscribed<P>,
}

impl<P: WalletProvider> WatchHandle<P> {
    pub fn is_listening(&self) -> bool { self.subscribed.borrow().is_some() }

    pub fn stop(self) {}
}

impl<P: WalletProvider> Drop for WatchHandle<P> {
    fn drop(&mut self) {
        self.abort.abort();
        if let Some(provider) = self.subscribed.borrow_mut().take() {
            provider.unwatch();
        }
        debug!("wallet watchers removed");
    }
}

enum Wake {
    Event(Option<ProviderEvent>),
    Tick,
}

impl<P: WalletProvider + 'static> WalletSession<P> {
    /// Run startup restoration, then keep the session in sync with the
    /// extension until the returned handle is dropped.
    pub async fn start(&self) -> WatchHandle<P> {
        self.initialize().await;

        let subscribed: Subscribed<P> = Rc::new(RefCell::new(None));
        let events = self.subscribe_provider(&subscribed);

        let session = self.clone();
        let slot = subscribed.clone();
        let (task, abort) = future::abortable(async move { session.watch_loop(events, slot).await });
        runtime::spawn_local(async move {
            let _ = task.await;
        });
        info!(poll_ms = self.config.poll_interval.as_millis() as u64, "wallet session watching");
        WatchHandle { abort, subscribed }
    }

    fn subscribe_provider(&self, slot: &Subscribed<P>) -> Option<EventReceiver> {
        let provider = (self.detect)()?;
        match provider.watch() {
            Ok(events) => {
                *slot.borrow_mut() = Some(provider);
                Some(events)
            }
            Err(e) => {
                debug!(error = %e, "could not subscribe to wallet events");
                None
            }
        }
    }

    async fn watch_loop(&self, mut events: Option<EventReceiver>, slot: Subscribed<P>) {
        let mut ticks = runtime::interval(self.config.poll_interval).fuse();
        loop {
            let wake = {
                let event = match events.as_mut() {
                    Some(rx) => rx.next().left_future(),
                    None => future::pending::<Option<ProviderEvent>>().right_future(),
                }
                .fuse();
                futures::pin_mut!(event);
                futures::select! {
                    ev = event => Wake::Event(ev),
                    _ = ticks.next() => Wake::Tick,
                }
            };

            match wake {
                Wake::Event(Some(event)) => self.handle_event(event).await,
                Wake::Event(None) => {
                    debug!("wallet event stream closed");
                    events = None;
                    if let Some(provider) = slot.borrow_mut().take() {
                        provider.unwatch();
                    }
                }
                Wake::Tick => {
                    if events.is_none() {
                        events = self.subscribe_provider(&slot);
                    }
                    self.reconcile().await;
                }
            }
        }
    }
}
