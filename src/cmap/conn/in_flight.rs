use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use tokio::sync::oneshot;

use crate::{
    bson::Document,
    error::{Error, Result},
};

type ReplySender = oneshot::Sender<Result<Document>>;

/// The requests on a connection that are still waiting for a reply, keyed by request id.
///
/// Once the connection fails, every waiter is handed the failure and no further requests are
/// accepted.
#[derive(Debug, Default)]
pub(super) struct InFlightRequests {
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    waiters: HashMap<i32, ReplySender>,
    failure: Option<Error>,
}

impl InFlightRequests {
    fn lock(&self) -> MutexGuard<'_, State> {
        // The state is left consistent between statements, so a panic elsewhere while holding the
        // lock does not invalidate it.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a waiter for the reply to `request_id`. The returned guard deregisters it when
    /// dropped, so a caller that stops waiting does not leave an entry behind.
    pub(super) fn register(&self, request_id: i32) -> Result<InFlightRequest<'_>> {
        let mut state = self.lock();
        if let Some(ref failure) = state.failure {
            return Err(Error::connection_closed(format!(
                "connection previously failed: {}",
                failure
            )));
        }

        let (sender, receiver) = oneshot::channel();
        state.waiters.insert(request_id, sender);
        Ok(InFlightRequest {
            requests: self,
            request_id,
            receiver: Some(receiver),
        })
    }

    /// Hands `reply` to the waiter for `request_id`. Returns false if nobody is waiting for it.
    pub(super) fn complete(&self, request_id: i32, reply: Result<Document>) -> bool {
        let sender = self.lock().waiters.remove(&request_id);
        match sender {
            // The waiter may have given up between removal and delivery.
            Some(sender) => sender.send(reply).is_ok(),
            None => false,
        }
    }

    /// Fails every outstanding request with `error` and refuses new ones. Only the first failure
    /// is recorded.
    pub(super) fn fail_all(&self, error: Error) {
        let waiters = {
            let mut state = self.lock();
            if state.failure.is_none() {
                state.failure = Some(error.clone());
            }
            std::mem::take(&mut state.waiters)
        };

        for (_, sender) in waiters {
            let _: std::result::Result<_, _> = sender.send(Err(error.clone()));
        }
    }

    /// The number of requests still waiting for a reply.
    pub(super) fn len(&self) -> usize {
        self.lock().waiters.len()
    }

    fn deregister(&self, request_id: i32) {
        self.lock().waiters.remove(&request_id);
    }
}

/// A registered request awaiting its reply.
#[derive(Debug)]
pub(super) struct InFlightRequest<'a> {
    requests: &'a InFlightRequests,
    request_id: i32,
    receiver: Option<oneshot::Receiver<Result<Document>>>,
}

impl InFlightRequest<'_> {
    /// Waits until the reply arrives or the connection fails.
    pub(super) async fn reply(&mut self) -> Result<Document> {
        let receiver = match self.receiver.take() {
            Some(receiver) => receiver,
            None => {
                return Err(Error::connection_closed(
                    "reply was already awaited for this request",
                ))
            }
        };

        match receiver.await {
            Ok(reply) => reply,
            Err(_) => Err(Error::connection_closed(
                "connection dropped before a reply arrived",
            )),
        }
    }
}

impl Drop for InFlightRequest<'_> {
    fn drop(&mut self) {
        self.requests.deregister(self.request_id);
    }
}
