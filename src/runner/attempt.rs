//! Bounded execution of a single provider call.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::events::{Heartbeat, ProgressReporter};
use crate::error::ProviderError;

/// How a bounded provider call ended.
pub(crate) enum Attempt<T> {
    Done(Result<T, ProviderError>),
    Cancelled,
}

/// Limits applied to one provider call.
pub(crate) struct Bounds<'a> {
    pub deadline: Duration,
    pub grace: Duration,
    pub cancellation: &'a CancellationToken,
    pub heartbeat: Option<(ProgressReporter, Duration)>,
}

/// Drive `call` to completion under a deadline, a cancellation token and
/// panic isolation.
///
/// When the token fires, the call keeps being polled for at most `grace` so
/// it can release what it holds, then the attempt reports `Cancelled`.
pub(crate) async fn run<T, F>(call: F, bounds: Bounds<'_>) -> Attempt<T>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    let _heartbeat = bounds
        .heartbeat
        .map(|(reporter, interval)| Heartbeat::start(reporter, interval));

    let deadline = bounds.deadline;
    let guarded = async move {
        match tokio::time::timeout(deadline, AssertUnwindSafe(call).catch_unwind()).await {
            Ok(Ok(result)) => result,
            Ok(Err(panic)) => Err(ProviderError::Fault(anyhow::anyhow!(
                "provider panicked: {}",
                panic_message(panic.as_ref())
            ))),
            Err(_) => Err(ProviderError::deadline(deadline)),
        }
    };
    tokio::pin!(guarded);

    tokio::select! {
        result = &mut guarded => Attempt::Done(result),
        () = bounds.cancellation.cancelled() => {
            if tokio::time::timeout(bounds.grace, &mut guarded).await.is_err() {
                debug!(grace_ms = bounds.grace.as_millis(), "attempt did not unwind within grace period");
            }
            Attempt::Cancelled
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
