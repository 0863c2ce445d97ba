use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

use futures_util::{future::BoxFuture, FutureExt};
use tokio::io::DuplexStream;

use crate::{
    bson::Document,
    cmap::{wire::Message, Channel, Connection},
    error::Result,
    event::{command::CommandEvent, EventHandler},
};

/// A request observed by a [`SpyChannel`].
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct RecordedSend {
    pub(crate) document: Document,
    pub(crate) target_db: String,
    pub(crate) timeout: Option<Duration>,
}

/// A [`Channel`] that records every request and answers with scripted replies, in order.
#[derive(Clone, Debug, Default)]
pub(crate) struct SpyChannel {
    sends: Arc<Mutex<Vec<RecordedSend>>>,
    replies: Arc<Mutex<VecDeque<Result<Document>>>>,
}

impl SpyChannel {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queues the result for the next request.
    pub(crate) fn reply_with(self, reply: Result<Document>) -> Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    pub(crate) fn sends(&self) -> Vec<RecordedSend> {
        self.sends.lock().unwrap().clone()
    }
}

impl Channel for SpyChannel {
    fn send<'a>(
        &'a self,
        document: Document,
        target_db: &'a str,
        timeout: Option<Duration>,
    ) -> BoxFuture<'a, Result<Document>> {
        self.sends.lock().unwrap().push(RecordedSend {
            document,
            target_db: target_db.to_string(),
            timeout,
        });
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("no scripted reply left for request");
        async move { reply }.boxed()
    }
}

/// Collects the command events delivered to the handler it hands out.
#[derive(Clone, Debug, Default)]
pub(crate) struct EventBuffer {
    events: Arc<Mutex<Vec<CommandEvent>>>,
}

impl EventBuffer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn handler(&self) -> EventHandler<CommandEvent> {
        let events = self.events.clone();
        EventHandler::callback(move |event| events.lock().unwrap().push(event))
    }

    pub(crate) fn all(&self) -> Vec<CommandEvent> {
        self.events.lock().unwrap().clone()
    }
}

/// A [`Connection`] attached to the client end of an in-memory stream. The server end is returned
/// for the test to drive.
pub(crate) fn connection_pair() -> (Connection, DuplexStream) {
    let (client, server) = tokio::io::duplex(64 * 1024);
    (Connection::new(client, None), server)
}

/// Reads `count` requests from `server`, then answers them in reverse order with
/// `{ ok: 1, echo: <request's "ping" value> }`.
pub(crate) async fn answer_in_reverse(server: &mut DuplexStream, count: usize) {
    let mut requests = Vec::with_capacity(count);
    for _ in 0..count {
        requests.push(Message::read_from(server, None).await.unwrap());
    }

    for request in requests.into_iter().rev() {
        let ping = request
            .document_payload
            .get("ping")
            .cloned()
            .unwrap_or(crate::bson::Bson::Null);
        Message::reply_to(
            request.request_id.unwrap_or_default(),
            crate::bson::doc! { "ok": 1, "echo": ping },
        )
        .write_to(server)
        .await
        .unwrap();
    }
}
