mod command;
mod in_flight;
mod response;
pub(crate) mod wire;

use std::{
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
    time::Duration,
};

use futures_util::{future::BoxFuture, FutureExt};
use serde::Deserialize;
use tokio::{
    io::{AsyncRead, AsyncWrite, AsyncWriteExt},
    net::TcpStream,
    sync::{mpsc, oneshot},
};
use typed_builder::TypedBuilder;

use self::{in_flight::InFlightRequests, wire::Message};
use crate::{
    bson::Document,
    error::{Error, Result},
    runtime::{self, WorkerHandle, WorkerHandleListener},
    serde_util,
    trace::CONNECTION_TRACING_EVENT_TARGET,
};
pub use command::Command;
pub use response::{interpret, Reply};

static CONNECTION_ID: AtomicU32 = AtomicU32::new(1);

/// A live link to a server over which command documents are sent and replies received.
///
/// Implementations must correlate each reply with the request it answers, allow concurrent
/// callers to share the channel, and honor `timeout` by failing with
/// [`Timeout`](crate::error::ErrorKind::Timeout) once it elapses.
pub trait Channel: Send + Sync {
    /// Sends `document` to `target_db` and waits for the correlated reply document.
    fn send<'a>(
        &'a self,
        document: Document,
        target_db: &'a str,
        timeout: Option<Duration>,
    ) -> BoxFuture<'a, Result<Document>>;
}

impl<C: Channel + ?Sized> Channel for Arc<C> {
    fn send<'a>(
        &'a self,
        document: Document,
        target_db: &'a str,
        timeout: Option<Duration>,
    ) -> BoxFuture<'a, Result<Document>> {
        self.as_ref().send(document, target_db, timeout)
    }
}

/// Options used to establish and drive a [`Connection`].
#[derive(Clone, Debug, Default, Deserialize, TypedBuilder, PartialEq)]
#[builder(field_defaults(default, setter(into)))]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct ConnectionOptions {
    /// The time to wait for a TCP connection to be established. Unbounded if unset.
    #[serde(
        rename = "connectTimeoutMS",
        default,
        deserialize_with = "serde_util::deserialize_duration_option_from_u64_millis"
    )]
    pub connect_timeout: Option<Duration>,

    /// The largest reply, in bytes, the connection will accept. Defaults to 48 MiB, which is also
    /// used when the value is zero or negative.
    pub max_message_size_bytes: Option<i32>,
}

/// User-facing information about a connection to the database.
#[derive(Clone, Debug, PartialEq)]
pub struct ConnectionInfo {
    /// A driver-generated identifier that uniquely identifies the connection.
    pub id: u32,

    /// The address of the server the connection is connected to, if known.
    pub address: Option<String>,
}

/// A message queued for the writer task.
#[derive(Debug)]
struct OutgoingMessage {
    bytes: Vec<u8>,
    written: oneshot::Sender<Result<()>>,
}

/// A [`Channel`] that multiplexes any number of concurrent requests over one byte stream.
///
/// Requests are written whole, one after another, by a background writer task; a background
/// reader task routes each reply to the request whose id matches the reply's `responseTo`. Both
/// tasks stop once the `Connection` is dropped. A write failure or an undecodable reply fails
/// every outstanding request and the connection refuses further requests.
#[derive(Debug)]
pub struct Connection {
    info: ConnectionInfo,
    in_flight: Arc<InFlightRequests>,
    outgoing: mpsc::UnboundedSender<OutgoingMessage>,
    _worker: WorkerHandle,
}

impl Connection {
    /// Wraps an established stream. Must be called from within a tokio runtime.
    pub fn new<S>(stream: S, options: impl Into<Option<ConnectionOptions>>) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        Self::with_address(stream, None, options.into().unwrap_or_default())
    }

    /// Opens a TCP connection to `address` (e.g. "localhost:27017").
    pub async fn connect(
        address: &str,
        options: impl Into<Option<ConnectionOptions>>,
    ) -> Result<Self> {
        let options = options.into().unwrap_or_default();
        let stream = match options.connect_timeout {
            Some(timeout) => runtime::timeout(timeout, TcpStream::connect(address)).await??,
            None => TcpStream::connect(address).await?,
        };
        stream.set_nodelay(true)?;

        Ok(Self::with_address(
            stream,
            Some(address.to_string()),
            options,
        ))
    }

    fn with_address<S>(stream: S, address: Option<String>, options: ConnectionOptions) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let info = ConnectionInfo {
            id: CONNECTION_ID.fetch_add(1, Ordering::SeqCst),
            address,
        };
        let (reader, writer) = tokio::io::split(stream);
        let in_flight = Arc::new(InFlightRequests::default());
        let (outgoing, outgoing_receiver) = mpsc::unbounded_channel();
        let (worker, listener) = WorkerHandleListener::channel();

        runtime::spawn(read_replies(
            reader,
            in_flight.clone(),
            listener,
            options.max_message_size_bytes.filter(|max| *max > 0),
            info.id,
        ));
        runtime::spawn(write_requests(
            writer,
            outgoing_receiver,
            in_flight.clone(),
            info.id,
        ));

        Self {
            info,
            in_flight,
            outgoing,
            _worker: worker,
        }
    }

    /// Information about this connection.
    pub fn info(&self) -> &ConnectionInfo {
        &self.info
    }

    /// The number of requests still awaiting a reply.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Sends a command body to `target_db` and waits for the reply correlated with it.
    ///
    /// Dropping the returned future abandons only this request. The request may already have been
    /// written, so whether the server applied it is unknown.
    pub async fn send_command(
        &self,
        body: Document,
        target_db: &str,
        timeout: Option<Duration>,
    ) -> Result<Document> {
        let request_id = wire::next_request_id();
        let bytes = Message::from_command(body, target_db, request_id).to_bytes()?;
        let mut request = self.in_flight.register(request_id)?;

        let exchange = async {
            let (written, written_receiver) = oneshot::channel();
            self.outgoing
                .send(OutgoingMessage { bytes, written })
                .map_err(|_| Error::connection_closed("connection writer has stopped"))?;
            match written_receiver.await {
                Ok(result) => result?,
                Err(_) => return Err(Error::connection_closed("connection writer has stopped")),
            }

            request.reply().await
        };

        match timeout {
            Some(timeout) => runtime::timeout(timeout, exchange).await?,
            None => exchange.await,
        }
    }
}

impl Channel for Connection {
    fn send<'a>(
        &'a self,
        document: Document,
        target_db: &'a str,
        timeout: Option<Duration>,
    ) -> BoxFuture<'a, Result<Document>> {
        self.send_command(document, target_db, timeout).boxed()
    }
}

async fn write_requests<W: AsyncWrite + Unpin>(
    mut writer: W,
    mut outgoing: mpsc::UnboundedReceiver<OutgoingMessage>,
    in_flight: Arc<InFlightRequests>,
    connection_id: u32,
) {
    while let Some(message) = outgoing.recv().await {
        let written: std::io::Result<()> = async {
            writer.write_all(&message.bytes).await?;
            writer.flush().await
        }
        .await;
        let result = written
            .map_err(|e| Error::connection_closed(format!("failed to write request: {}", e)));

        if let Err(ref error) = result {
            tracing::debug!(
                target: CONNECTION_TRACING_EVENT_TARGET,
                driverConnectionId = connection_id,
                error = %error,
                "Connection write failed"
            );
            in_flight.fail_all(error.clone());
        }

        let failed = result.is_err();
        let _: std::result::Result<_, _> = message.written.send(result);
        if failed {
            return;
        }
    }
}

async fn read_replies<R: AsyncRead + Unpin>(
    mut reader: R,
    in_flight: Arc<InFlightRequests>,
    mut listener: WorkerHandleListener,
    max_message_size_bytes: Option<i32>,
    connection_id: u32,
) {
    loop {
        tokio::select! {
            result = Message::read_from(&mut reader, max_message_size_bytes) => match result {
                Ok(message) => {
                    let response_to = message.response_to;
                    if !in_flight.complete(response_to, Ok(message.into_document())) {
                        tracing::debug!(
                            target: CONNECTION_TRACING_EVENT_TARGET,
                            driverConnectionId = connection_id,
                            responseTo = response_to,
                            "Discarding reply with no waiting request"
                        );
                    }
                }
                Err(error) => {
                    tracing::debug!(
                        target: CONNECTION_TRACING_EVENT_TARGET,
                        driverConnectionId = connection_id,
                        error = %error,
                        "Connection read failed"
                    );
                    in_flight.fail_all(error);
                    return;
                }
            },
            _ = listener.wait_for_all_handle_drops() => return,
        }
    }
}
