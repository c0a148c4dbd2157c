//! The boundary between the engine and connector code.
//!
//! Connector calls are bounded by a timeout and may not unwind into the
//! engine. Whatever goes wrong comes back as a [`CallFailure`] for the
//! caller to downgrade.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use thiserror::Error;

use connectors::ConnectorError;

#[derive(Debug, Error)]
pub enum CallFailure {
    #[error(transparent)]
    Connector(#[from] ConnectorError),

    #[error("connector call timed out after {0:?}")]
    TimedOut(Duration),

    #[error("connector panicked: {0}")]
    Panicked(String),
}

/// Await a connector call under `timeout`, catching panics.
pub async fn guarded<T, F>(timeout: Duration, call: F) -> Result<T, CallFailure>
where
    F: Future<Output = Result<T, ConnectorError>>,
{
    match tokio::time::timeout(timeout, AssertUnwindSafe(call).catch_unwind()).await {
        Err(_) => Err(CallFailure::TimedOut(timeout)),
        Ok(Err(panic)) => Err(CallFailure::Panicked(panic_message(panic.as_ref()))),
        Ok(Ok(result)) => result.map_err(CallFailure::from),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
