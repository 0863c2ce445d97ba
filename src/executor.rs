#[cfg(test)]
mod test;

use std::{fmt, sync::Arc, time::Instant};

use derive_where::derive_where;
use tokio_util::sync::CancellationToken;

use crate::{
    bson::Document,
    cmap::{interpret, Channel, Command},
    error::{Error, ErrorKind, Result},
    event::command::{
        CommandEvent,
        CommandFailedEvent,
        CommandStartedEvent,
        CommandSucceededEvent,
    },
    operation::Operation,
    options::ExecutorOptions,
    trace::{command::CommandTracingEventEmitter, COMMAND_TRACING_EVENT_TARGET},
};

/// Runs commands over a [`Channel`]: encodes each [`Command`], sends it exactly once and interprets
/// the reply.
///
/// `Executor` holds its channel behind an `Arc`, so it is cheap to clone, and any number of
/// commands may run through it concurrently.
///
/// ```rust,no_run
/// # use mongodb_command::{error::Result, Command, Connection, Executor};
/// # async fn run() -> Result<()> {
/// let connection = Connection::connect("localhost:27017", None).await?;
/// let executor = Executor::new(connection, None);
///
/// let reply = executor.execute(Command::new("dropDatabase", "test_db", 1)).await?;
/// println!("{}", reply);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
#[derive_where(Debug)]
pub struct Executor {
    #[derive_where(skip)]
    channel: Arc<dyn Channel>,
    options: ExecutorOptions,
}

impl Executor {
    /// Creates an executor over `channel`. Pass an `Arc` to keep using the channel elsewhere.
    pub fn new<C: Channel + 'static>(
        channel: C,
        options: impl Into<Option<ExecutorOptions>>,
    ) -> Self {
        Self {
            channel: Arc::new(channel),
            options: options.into().unwrap_or_default(),
        }
    }

    /// The options this executor was created with.
    pub fn options(&self) -> &ExecutorOptions {
        &self.options
    }

    /// Runs `command` and returns the full reply document if the server reported success.
    ///
    /// The command is sent at most once. An encoding failure is reported as
    /// [`InvalidCommand`](ErrorKind::InvalidCommand) without touching the channel. Every error
    /// records the name of the command it came from.
    ///
    /// Dropping the returned future abandons the request without disturbing other requests on the
    /// same channel. The server may or may not have applied the command.
    pub async fn execute(&self, command: Command) -> Result<Document> {
        let command_name = command.name().to_string();
        self.execute_command(command, None)
            .await
            .map_err(|error| error.with_command_name(command_name))
    }

    /// Like [`execute`](Executor::execute), but gives up with [`ErrorKind::Cancelled`] once
    /// `token` is cancelled. A token that is already cancelled prevents the command from being
    /// sent at all. A command cancelled after it was started is reported to the event handler
    /// with a [`CommandFailedEvent`](crate::event::command::CommandFailedEvent) carrying the
    /// cancellation.
    pub async fn execute_cancellable(
        &self,
        command: Command,
        token: &CancellationToken,
    ) -> Result<Document> {
        let command_name = command.name().to_string();
        if token.is_cancelled() {
            return Err(Error::new(ErrorKind::Cancelled).with_command_name(command_name));
        }
        self.execute_command(command, Some(token))
            .await
            .map_err(|error| error.with_command_name(command_name))
    }

    /// Builds `op`'s command, runs it and hands the outcome to the operation for interpretation.
    pub async fn execute_operation<T: Operation>(&self, mut op: T) -> Result<T::O> {
        let command = op.build().map_err(|error| error.with_command_name(T::NAME))?;
        let command_name = command.name().to_string();

        match self.execute(command).await {
            Ok(reply) => op.handle_response(reply),
            Err(error) => op.handle_error(error),
        }
        .map_err(|error| error.with_command_name(command_name))
    }

    async fn execute_command(
        &self,
        command: Command,
        token: Option<&CancellationToken>,
    ) -> Result<Document> {
        let mut execution = Execution::new();

        let command_name = command.name().to_string();
        let target_db = command.target_db().to_string();
        let body = match command.into_document() {
            Ok(body) => body,
            Err(error) => {
                execution.advance(ExecutionState::Failed)?;
                return Err(error);
            }
        };

        self.emit_command_event(|| {
            CommandStartedEvent {
                command: body.clone(),
                db: target_db.clone(),
                command_name: command_name.clone(),
            }
            .into()
        });

        let start_time = Instant::now();
        execution.advance(ExecutionState::Sent)?;
        let reply = self.channel.send(body, &target_db, self.options.timeout);
        execution.advance(ExecutionState::AwaitingReply)?;
        let result = match token {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => Err(Error::new(ErrorKind::Cancelled)),
                reply = reply => reply.and_then(interpret),
            },
            None => reply.await.and_then(interpret),
        };
        let duration = start_time.elapsed();

        match result {
            Ok(reply) => {
                execution.advance(ExecutionState::Succeeded)?;
                self.emit_command_event(|| {
                    CommandSucceededEvent {
                        duration,
                        reply: reply.clone(),
                        command_name: command_name.clone(),
                    }
                    .into()
                });
                Ok(reply)
            }
            Err(error) => {
                execution.advance(ExecutionState::Failed)?;
                self.emit_command_event(|| {
                    CommandFailedEvent {
                        duration,
                        command_name: command_name.clone(),
                        failure: error.clone(),
                    }
                    .into()
                });
                Err(error)
            }
        }
    }

    fn emit_command_event(&self, generate_event: impl FnOnce() -> CommandEvent) {
        let tracing_emitter =
            if tracing::enabled!(target: COMMAND_TRACING_EVENT_TARGET, tracing::Level::DEBUG) {
                Some(CommandTracingEventEmitter::new(
                    self.options.max_document_length,
                ))
            } else {
                None
            };
        let event_handler = self.options.command_event_handler.as_ref();
        if tracing_emitter.is_none() && event_handler.is_none() {
            return;
        }

        let event = generate_event();
        match (event_handler, tracing_emitter) {
            (Some(event_handler), Some(tracing_emitter)) => {
                event_handler.handle(event.clone());
                tracing_emitter.handle(event);
            }
            (Some(event_handler), None) => event_handler.handle(event),
            (None, Some(tracing_emitter)) => tracing_emitter.handle(event),
            (None, None) => {}
        }
    }
}

/// The stages a single command passes through.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ExecutionState {
    Building,
    Sent,
    AwaitingReply,
    Succeeded,
    Failed,
}

impl ExecutionState {
    fn can_advance_to(self, next: ExecutionState) -> bool {
        use ExecutionState::*;

        matches!(
            (self, next),
            (Building, Sent)
                | (Building, Failed)
                | (Sent, AwaitingReply)
                | (Sent, Failed)
                | (AwaitingReply, Succeeded)
                | (AwaitingReply, Failed)
        )
    }

    fn is_terminal(self) -> bool {
        matches!(self, ExecutionState::Succeeded | ExecutionState::Failed)
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Tracks the state of one command execution, rejecting out-of-order transitions.
#[derive(Debug)]
pub(crate) struct Execution {
    state: ExecutionState,
}

impl Execution {
    pub(crate) fn new() -> Self {
        Self {
            state: ExecutionState::Building,
        }
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> ExecutionState {
        self.state
    }

    pub(crate) fn advance(&mut self, next: ExecutionState) -> Result<()> {
        if self.state.is_terminal() || !self.state.can_advance_to(next) {
            return Err(Error::internal(format!(
                "invalid command execution transition from {} to {}",
                self.state, next
            )));
        }
        self.state = next;
        Ok(())
    }
}
