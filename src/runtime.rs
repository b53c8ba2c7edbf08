//! Runtime - local task spawning and timers for the current target
//!
//! The session is single-threaded: browser handles are `!Send`, so background
//! work (network negotiation, the watch loop) runs as local tasks. In the
//! browser that is the microtask queue via `wasm-bindgen-futures`; natively it
//! is a tokio `LocalSet`, which the host must be running inside. `connect()`
//! itself never spawns.

use futures::stream::{LocalBoxStream, StreamExt};
use std::future::Future;
use std::time::Duration;

/// Run `task` in the background on the current thread.
pub fn spawn_local<F>(task: F)
where
    F: Future<Output = ()> + 'static,
{
    #[cfg(feature = "wasm")]
    wasm_bindgen_futures::spawn_local(task);

    #[cfg(all(feature = "native", not(feature = "wasm")))]
    match tokio::runtime::Handle::try_current() {
        Ok(_) => drop(tokio::task::spawn_local(task)),
        Err(e) => tracing::warn!(error = %e, "no tokio runtime; background task dropped"),
    };
}

#[cfg(all(feature = "native", not(feature = "wasm")))]
pub async fn sleep(duration: Duration) {
    tokio::time::sleep(duration).await;
}

#[cfg(feature = "wasm")]
pub async fn sleep(duration: Duration) {
    let millis = u32::try_from(duration.as_millis()).unwrap_or(u32::MAX);
    gloo_timers::future::TimeoutFuture::new(millis).await;
}

/// Endless stream yielding once per `period`, first tick after one period.
/// Ticks missed while the consumer was busy are not replayed.
#[cfg(all(feature = "native", not(feature = "wasm")))]
pub fn interval(period: Duration) -> LocalBoxStream<'static, ()> {
    use tokio::time::{interval_at, Instant, MissedTickBehavior};

    let period = period.max(Duration::from_millis(1));
    let mut ticks = interval_at(Instant::now() + period, period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
    futures::stream::unfold(ticks, |mut ticks| async move {
        ticks.tick().await;
        Some(((), ticks))
    })
    .boxed_local()
}

#[cfg(feature = "wasm")]
pub fn interval(period: Duration) -> LocalBoxStream<'static, ()> {
    let millis = u32::try_from(period.as_millis()).unwrap_or(u32::MAX).max(1);
    gloo_timers::future::IntervalStream::new(millis).boxed_local()
}
