//! WalletSessionHandle: the session as seen from JavaScript
//!
//! One handle per page. `start()` restores and begins watching; the wallet
//! button reads `status` / `displayName`, or subscribes with `onChange`.

use super::injected::InjectedProvider;
use super::log;
use super::storage::LocalStorageFlagStore;
use crate::contract::{FundingDeadline, ProjectRegistry, ProjectSubmission, DEFAULT_FUNDING_DAYS, U256};
use crate::core::{Network, WalletKind};
use crate::session::{SessionConfig, SessionError, WalletSession, WatchHandle};
use serde::Serialize;
use std::cell::RefCell;
use wasm_bindgen::prelude::*;

fn to_js<T: Serialize>(value: &T) -> JsValue {
    let serializer = serde_wasm_bindgen::Serializer::new().serialize_maps_as_objects(true);
    value.serialize(&serializer).unwrap_or(JsValue::NULL)
}

#[derive(Serialize)]
struct JsSessionError<'a> {
    kind: &'a str,
    message: String,
}

fn session_error(e: &SessionError) -> JsValue {
    to_js(&JsSessionError { kind: e.kind(), message: e.to_string() })
}

#[wasm_bindgen]
pub struct WalletSessionHandle {
    kind: WalletKind,
    session: WalletSession<InjectedProvider>,
    watch: RefCell<Option<WatchHandle<InjectedProvider>>>,
    registry: ProjectRegistry,
}

#[wasm_bindgen]
impl WalletSessionHandle {
    /// `walletId`: core | metamask | coinbase | walletconnect (default core).
    /// `network`: mainnet | fuji (default fuji).
    #[wasm_bindgen(constructor)]
    pub fn new(wallet_id: Option<String>, network: Option<String>) -> Result<WalletSessionHandle, JsValue> {
        let kind = match wallet_id.as_deref() {
            Some(id) => WalletKind::from_id(id).ok_or_else(|| JsValue::from_str(&format!("unknown wallet: {id}")))?,
            None => WalletKind::default(),
        };
        let network = match network.as_deref() {
            Some(raw) => raw.parse::<Network>().map_err(|e| JsValue::from_str(&e.to_string()))?,
            None => Network::default(),
        };
        log!("[wallet] session for {} on {}", kind.name(), network.as_str());
        let session = WalletSession::new(SessionConfig::new(network), LocalStorageFlagStore::new(), InjectedProvider::detector(kind));
        Ok(Self { kind, session, watch: RefCell::new(None), registry: ProjectRegistry::default() })
    }

    #[wasm_bindgen(getter, js_name = "walletName")]
    pub fn wallet_name(&self) -> String { self.kind.name().to_string() }

    /// Whether the selected wallet's extension is on the page right now.
    #[wasm_bindgen(getter, js_name = "isInstalled")]
    pub fn is_installed(&self) -> bool { super::injected::detect(self.kind).is_some() }

    /// Restore a previous session and begin listening/polling. Idempotent.
    #[wasm_bindgen]
    pub async fn start(&self) {
        if self.watch.borrow().is_some() {
            return;
        }
        let handle = self.session.start().await;
        *self.watch.borrow_mut() = Some(handle);
    }

    /// Tear down listeners and polling. The session state is kept.
    #[wasm_bindgen]
    pub fn stop(&self) {
        if self.watch.borrow_mut().take().is_some() {
            log!("[wallet] stopped watching");
        }
    }

    /// Resolves with the connected address; rejects with `{ kind, message }`.
    #[wasm_bindgen]
    pub async fn connect(&self) -> Result<String, JsValue> {
        self.session.connect().await.map(|a| a.to_string()).map_err(|e| session_error(&e))
    }

    #[wasm_bindgen]
    pub fn disconnect(&self) { self.session.disconnect() }

    #[wasm_bindgen(getter)]
    pub fn status(&self) -> String { self.session.status().as_str().to_string() }

    #[wasm_bindgen(getter)]
    pub fn address(&self) -> Option<String> { self.session.address().map(|a| a.to_string()) }

    #[wasm_bindgen(getter, js_name = "chainId")]
    pub fn chain_id(&self) -> Option<u32> { self.session.chain_id().and_then(|c| u32::try_from(c.0).ok()) }

    #[wasm_bindgen(getter, js_name = "displayName")]
    pub fn display_name(&self) -> String { self.session.snapshot().display_name() }

    #[wasm_bindgen(getter, js_name = "isInitialized")]
    pub fn is_initialized(&self) -> bool { self.session.is_initialized() }

    #[wasm_bindgen(getter, js_name = "lastError")]
    pub fn last_error(&self) -> JsValue {
        self.session.last_error().map(|e| session_error(&e)).unwrap_or(JsValue::NULL)
    }

    /// `{ status, address, chainId }`
    #[wasm_bindgen]
    pub fn snapshot(&self) -> JsValue { to_js(&self.session.snapshot()) }

    /// Call `callback(snapshot)` on every transition.
    #[wasm_bindgen(js_name = "onChange")]
    pub fn on_change(&self, callback: js_sys::Function) {
        let rx = self.session.subscribe();
        wasm_bindgen_futures::spawn_local(async move {
            use futures::StreamExt;
            let mut rx = rx;
            while let Some(snapshot) = rx.next().await {
                let _ = callback.call1(&JsValue::NULL, &to_js(&snapshot));
            }
        });
    }

    /// Block explorer page for the connected account.
    #[wasm_bindgen(js_name = "explorerUrl")]
    pub fn explorer_url(&self) -> Option<String> {
        let address = self.session.address()?;
        Some(self.session.config().network.explorer_address_url(&address))
    }

    /// Submit `createProject` from the connected account. `fundingRequired` is
    /// a decimal or `0x` hex string covering the full uint256 range.
    #[wasm_bindgen(js_name = "createProject")]
    pub async fn create_project(
        &self,
        metadata_ref: String,
        funding_required: String,
        founder_profit_percent: u8,
        funding_days: Option<u32>,
    ) -> Result<JsValue, JsValue> {
        let funding_required = funding_required
            .trim()
            .parse::<U256>()
            .map_err(|e| JsValue::from_str(&format!("invalid funding amount: {e}")))?;
        let submission = ProjectSubmission {
            metadata_ref,
            funding_required,
            deadline: FundingDeadline::days_from_now(funding_days.unwrap_or(DEFAULT_FUNDING_DAYS)),
            founder_profit_percent,
        };
        let receipt = self
            .registry
            .create_project_for(&self.session, &submission)
            .await
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(to_js(&receipt))
    }
}
