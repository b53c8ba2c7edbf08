//! WASM module: the wallet session inside the browser
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │      WalletSessionHandle (JS API)       │
//! │  start, connect, disconnect, onChange   │
//! │  status, address, chainId, createProject│
//! └─────────────────┬───────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────┐
//! │    WalletSession<InjectedProvider>      │
//! │  state machine, events, 5s poll         │
//! └───────┬─────────────────────────┬───────┘
//!         │                         │
//! ┌───────▼─────────────┐ ┌─────────▼───────┐
//! │  InjectedProvider   │ │ LocalStorage    │
//! │  window.ethereum /  │ │ FlagStore       │
//! │  window.avalanche   │ │                 │
//! └─────────────────────┘ └─────────────────┘
//! ```

mod injected;
mod session;
mod storage;

pub use injected::{detect, InjectedProvider, InjectedSigner};
pub use session::WalletSessionHandle;
pub use storage::LocalStorageFlagStore;

use wasm_bindgen::prelude::*;

/// Initialize WASM module (called automatically on load)
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Log to browser console
pub fn console_log(s: &str) {
    web_sys::console::log_1(&JsValue::from_str(s));
}

macro_rules! log {
    ($($t:tt)*) => {
        crate::wasm::console_log(&format!($($t)*))
    }
}

pub(crate) use log;
