//! EIP-1193 bindings for wallet extensions injected into the page.
//!
//! Everything goes through the provider object's `request({ method, params })`
//! and its `on` / `removeListener` pair. Results are converted to
//! `serde_json::Value` at the boundary so the rest of the crate never touches
//! `JsValue`.

use super::log;
use crate::contract::{TransactionReceipt, TransactionRequest, TransactionSigner};
use crate::core::keys::{events, rpc};
use crate::core::{Address, ChainDescriptor, ChainId, WalletKind};
use crate::provider::{EventReceiver, ProviderError, ProviderEvent, ProviderResult, WalletProvider};
use async_trait::async_trait;
use futures::channel::mpsc;
use js_sys::{Array, Function, Object, Promise, Reflect};
use serde::Serialize;
use serde_json::{json, Value};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

fn get(target: &JsValue, key: &str) -> JsValue {
    Reflect::get(target, &JsValue::from_str(key)).unwrap_or(JsValue::UNDEFINED)
}

fn flag(target: &JsValue, key: &str) -> bool { get(target, key).as_bool().unwrap_or(false) }

fn present(value: JsValue) -> Option<JsValue> {
    if value.is_undefined() || value.is_null() { None } else { Some(value) }
}

/// Find the injected object a given wallet exposes.
pub fn detect(kind: WalletKind) -> Option<JsValue> {
    let window: JsValue = web_sys::window()?.into();
    let ethereum = present(get(&window, "ethereum"));
    match kind {
        WalletKind::Core => present(get(&window, "avalanche")),
        WalletKind::MetaMask => ethereum.filter(|eth| flag(eth, "isMetaMask")),
        WalletKind::Coinbase => present(get(&window, "coinbaseWalletExtension"))
            .or_else(|| ethereum.filter(|eth| flag(eth, "isCoinbaseWallet"))),
        WalletKind::WalletConnect => None,
    }
}

/// Map a thrown EIP-1193 error object. Some extensions wrap the real code in
/// `data.originalError`.
fn to_provider_error(error: &JsValue, chain: Option<ChainId>) -> ProviderError {
    let message = get(error, "message").as_string().or_else(|| error.as_string()).unwrap_or_else(|| "unknown wallet error".into());
    let code = get(error, "code")
        .as_f64()
        .or_else(|| get(&get(&get(error, "data"), "originalError"), "code").as_f64());
    match code {
        Some(code) => ProviderError::from_code(code as i64, message, chain),
        None => ProviderError::Unavailable(message),
    }
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> ProviderResult<JsValue> {
    let serializer = serde_wasm_bindgen::Serializer::new().serialize_maps_as_objects(true);
    value.serialize(&serializer).map_err(|e| ProviderError::InvalidResponse(e.to_string()))
}

/// Thin `request()` caller shared by the provider and the signers it hands out.
#[derive(Clone)]
struct Eip1193 {
    target: JsValue,
}

impl Eip1193 {
    async fn request(&self, method: &str, params: Value, chain: Option<ChainId>) -> ProviderResult<Value> {
        let args = Object::new();
        let set = |key: &str, value: &JsValue| {
            Reflect::set(&args, &JsValue::from_str(key), value).map_err(|e| to_provider_error(&e, chain))
        };
        set("method", &JsValue::from_str(method))?;
        if !params.is_null() {
            set("params", &to_js(&params)?)?;
        }

        let request = get(&self.target, "request")
            .dyn_into::<Function>()
            .map_err(|_| ProviderError::Unavailable("provider has no request()".into()))?;
        let promise: Promise = request
            .call1(&self.target, &args)
            .map_err(|e| to_provider_error(&e, chain))?
            .dyn_into()
            .map_err(|_| ProviderError::InvalidResponse(format!("{method} did not return a promise")))?;
        let result = JsFuture::from(promise).await.map_err(|e| to_provider_error(&e, chain))?;
        if result.is_undefined() || result.is_null() {
            return Ok(Value::Null);
        }
        serde_wasm_bindgen::from_value(result).map_err(|e| ProviderError::InvalidResponse(format!("{method}: {e}")))
    }

    async fn accounts(&self, method: &str) -> ProviderResult<Vec<String>> {
        match self.request(method, Value::Null, None).await? {
            Value::Null => Ok(Vec::new()),
            value => serde_json::from_value(value).map_err(|e| ProviderError::InvalidResponse(format!("{method}: {e}"))),
        }
    }
}

type Listener = Closure<dyn FnMut(JsValue)>;

pub struct InjectedProvider {
    kind: WalletKind,
    eip1193: Eip1193,
    listeners: RefCell<Vec<(&'static str, Listener)>>,
}

impl InjectedProvider {
    pub fn detect(kind: WalletKind) -> Option<Self> {
        detect(kind).map(|target| Self { kind, eip1193: Eip1193 { target }, listeners: RefCell::new(Vec::new()) })
    }

    /// Detector for the session: hands back the same instance while the page
    /// keeps exposing the same object, a fresh one if the extension was replaced.
    pub fn detector(kind: WalletKind) -> impl Fn() -> Option<Rc<Self>> {
        let cached: RefCell<Option<Rc<Self>>> = RefCell::new(None);
        move || {
            let target = detect(kind)?;
            let mut cached = cached.borrow_mut();
            if let Some(provider) = cached.as_ref() {
                if Object::is(&provider.eip1193.target, &target) {
                    return Some(provider.clone());
                }
            }
            let provider = Rc::new(Self { kind, eip1193: Eip1193 { target }, listeners: RefCell::new(Vec::new()) });
            *cached = Some(provider.clone());
            Some(provider)
        }
    }

    pub fn kind(&self) -> WalletKind { self.kind }

    fn listen(&self, event: &'static str, listener: Listener) -> ProviderResult<()> {
        let target = &self.eip1193.target;
        let on = get(target, "on")
            .dyn_into::<Function>()
            .map_err(|_| ProviderError::UnsupportedMethod("on".into()))?;
        on.call2(target, &JsValue::from_str(event), listener.as_ref().unchecked_ref())
            .map_err(|e| to_provider_error(&e, None))?;
        self.listeners.borrow_mut().push((event, listener));
        Ok(())
    }
}

fn event_listener(event: &'static str, tx: mpsc::UnboundedSender<ProviderEvent>) -> Listener {
    Closure::wrap(Box::new(move |payload: JsValue| {
        let parsed = match event {
            events::ACCOUNTS_CHANGED => {
                let accounts = Array::from(&payload).iter().filter_map(|a| a.as_string()).collect();
                Some(ProviderEvent::AccountsChanged(accounts))
            }
            events::CHAIN_CHANGED => {
                let raw = payload.as_string().or_else(|| payload.as_f64().map(|n| (n as u64).to_string()));
                raw.as_deref().and_then(ChainId::parse).map(ProviderEvent::ChainChanged)
            }
            _ => Some(ProviderEvent::Disconnected),
        };
        match parsed {
            Some(event) => {
                let _ = tx.unbounded_send(event);
            }
            None => log!("[wallet] ignoring malformed {} payload", event),
        }
    }) as Box<dyn FnMut(JsValue)>)
}

#[async_trait(?Send)]
impl WalletProvider for InjectedProvider {
    type Signer = InjectedSigner;

    async fn request_accounts(&self) -> ProviderResult<Vec<String>> { self.eip1193.accounts(rpc::REQUEST_ACCOUNTS).await }

    async fn authorized_accounts(&self) -> ProviderResult<Vec<String>> { self.eip1193.accounts(rpc::ACCOUNTS).await }

    async fn signer(&self, account: &Address) -> ProviderResult<InjectedSigner> {
        Ok(InjectedSigner { eip1193: self.eip1193.clone(), address: account.clone() })
    }

    async fn chain_id(&self) -> ProviderResult<ChainId> {
        let value = self.eip1193.request(rpc::CHAIN_ID, Value::Null, None).await?;
        value
            .as_str()
            .and_then(ChainId::parse)
            .ok_or_else(|| ProviderError::InvalidResponse(format!("eth_chainId returned {value}")))
    }

    async fn switch_chain(&self, chain: ChainId) -> ProviderResult<()> {
        self.eip1193.request(rpc::SWITCH_CHAIN, json!([{ "chainId": chain.to_hex() }]), Some(chain)).await?;
        Ok(())
    }

    async fn add_chain(&self, chain: &ChainDescriptor) -> ProviderResult<()> {
        let descriptor = serde_json::to_value(chain).map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        self.eip1193.request(rpc::ADD_CHAIN, json!([descriptor]), Some(chain.chain_id)).await?;
        Ok(())
    }

    fn watch(&self) -> ProviderResult<EventReceiver> {
        self.unwatch();
        let (tx, rx) = mpsc::unbounded();
        for &event in events::ALL {
            if let Err(e) = self.listen(event, event_listener(event, tx.clone())) {
                self.unwatch();
                return Err(e);
            }
        }
        log!("[wallet] listening to {} events", self.kind.name());
        Ok(rx)
    }

    fn unwatch(&self) {
        let listeners = std::mem::take(&mut *self.listeners.borrow_mut());
        if listeners.is_empty() {
            return;
        }
        let target = &self.eip1193.target;
        let remove = get(target, "removeListener").dyn_into::<Function>().ok();
        for (event, listener) in listeners {
            if let Some(remove) = &remove {
                let _ = remove.call2(target, &JsValue::from_str(event), listener.as_ref().unchecked_ref());
            }
        }
    }
}

/// Signing handle for one account of an injected wallet.
pub struct InjectedSigner {
    eip1193: Eip1193,
    address: Address,
}

#[async_trait(?Send)]
impl TransactionSigner for InjectedSigner {
    fn address(&self) -> &Address { &self.address }

    async fn send_transaction(&self, tx: &TransactionRequest) -> ProviderResult<String> {
        let params = json!([{ "from": tx.from, "to": tx.to, "data": tx.data }]);
        let value = self.eip1193.request(rpc::SEND_TRANSACTION, params, None).await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::InvalidResponse(format!("eth_sendTransaction returned {value}")))
    }

    async fn transaction_receipt(&self, hash: &str) -> ProviderResult<Option<TransactionReceipt>> {
        match self.eip1193.request(rpc::TRANSACTION_RECEIPT, json!([hash]), None).await? {
            Value::Null => Ok(None),
            receipt => TransactionReceipt::from_rpc(&receipt).map(Some),
        }
    }
}
