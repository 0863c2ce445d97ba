mod worker_handle;

use std::{future::Future, time::Duration};

pub(crate) use self::worker_handle::{WorkerHandle, WorkerHandleListener};
use crate::error::{Error, Result};

/// Spawn a task in the background to run a future.
///
/// Note: this must only be called from an async block or function running on a runtime.
pub(crate) fn spawn<F, O>(fut: F) -> tokio::task::JoinHandle<O>
where
    F: Future<Output = O> + Send + 'static,
    O: Send + 'static,
{
    tokio::runtime::Handle::current().spawn(fut)
}

/// Await on a future for a maximum amount of time before returning a
/// [`Timeout`](crate::error::ErrorKind::Timeout) error.
pub(crate) async fn timeout<F: Future>(timeout: Duration, future: F) -> Result<F::Output> {
    tokio::time::timeout(timeout, future)
        .await
        .map_err(|_| Error::timeout(timeout))
}
