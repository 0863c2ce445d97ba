use std::time::Duration;

use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

use super::{Execution, ExecutionState};
use crate::{
    bson::doc,
    error::{CommandError, Error, ErrorKind},
    event::command::CommandEvent,
    operation::{DropCollection, DropDatabase, RunCommand},
    options::ExecutorOptions,
    test::util::{EventBuffer, RecordedSend, SpyChannel},
    Command,
    Executor,
};

#[tokio::test]
async fn ok_reply_is_returned_unchanged() {
    let reply = doc! { "ok": 1, "dropped": "test_db", "note": { "n": 1 } };
    let channel = SpyChannel::new().reply_with(Ok(reply.clone()));
    let executor = Executor::new(channel.clone(), None);

    let result = executor
        .execute(Command::new("dropDatabase", "test_db", 1))
        .await
        .unwrap();

    assert_eq!(result, reply);
    assert_eq!(
        channel.sends(),
        vec![RecordedSend {
            document: doc! { "dropDatabase": 1 },
            target_db: "test_db".to_string(),
            timeout: None,
        }]
    );
}

#[tokio::test]
async fn failed_reply_becomes_command_failed() {
    let channel = SpyChannel::new().reply_with(Ok(doc! {
        "ok": 0,
        "errmsg": "ns not found",
        "code": 26,
    }));
    let executor = Executor::new(channel.clone(), None);

    let err = executor
        .execute(Command::new("drop", "test_db", "missing"))
        .await
        .unwrap_err();

    match *err.kind {
        ErrorKind::CommandFailed(CommandError {
            code, ref message, ..
        }) => {
            assert_eq!(code, Some(26));
            assert_eq!(message, "ns not found");
        }
        ref other => panic!("expected command failure, got {:?}", other),
    }
    assert_eq!(err.command_name(), Some("drop"));
    assert_eq!(channel.sends().len(), 1);
}

#[tokio::test]
async fn reply_without_ok_is_malformed() {
    let channel = SpyChannel::new().reply_with(Ok(doc! { "n": 1 }));
    let executor = Executor::new(channel, None);

    let err = executor
        .execute(Command::new("ping", "admin", 1))
        .await
        .unwrap_err();
    assert!(matches!(*err.kind, ErrorKind::MalformedReply { .. }));
}

#[tokio::test]
async fn invalid_command_is_never_sent() {
    let channel = SpyChannel::new();
    let executor = Executor::new(channel.clone(), None);

    for command in [
        Command::new("", "test_db", 1),
        Command::new("dropDatabase", "", 1),
        Command::new("dropDatabase", "test_db", 1).with_option("dropDatabase", 2),
    ] {
        let err = executor.execute(command).await.unwrap_err();
        assert!(
            matches!(*err.kind, ErrorKind::InvalidCommand { .. }),
            "expected invalid command, got {:?}",
            err
        );
    }

    assert!(channel.sends().is_empty());
}

#[tokio::test]
async fn channel_errors_keep_their_kind() {
    let channel = SpyChannel::new()
        .reply_with(Err(Error::timeout(Duration::from_millis(10))))
        .reply_with(Err(Error::connection_closed("reset by peer")));
    let options = ExecutorOptions::builder()
        .timeout(Duration::from_millis(10))
        .build();
    let executor = Executor::new(channel.clone(), options);

    let err = executor
        .execute(Command::new("ping", "admin", 1))
        .await
        .unwrap_err();
    assert!(err.is_timeout());
    assert_eq!(err.command_name(), Some("ping"));

    let err = executor
        .execute(Command::new("ping", "admin", 1))
        .await
        .unwrap_err();
    assert!(matches!(*err.kind, ErrorKind::ConnectionClosed { .. }));

    let sends = channel.sends();
    assert_eq!(sends.len(), 2);
    assert!(sends
        .iter()
        .all(|send| send.timeout == Some(Duration::from_millis(10))));
}

#[tokio::test]
async fn operations_build_and_interpret() {
    let channel = SpyChannel::new()
        .reply_with(Ok(doc! { "ok": 1 }))
        .reply_with(Ok(doc! { "ok": 0, "errmsg": "ns not found", "code": 26 }))
        .reply_with(Ok(doc! { "ok": 1.0, "n": 3 }))
        .reply_with(Ok(doc! {
            "ok": 1,
            "writeConcernError": { "code": 64, "codeName": "WriteConcernFailed", "errmsg": "waiting" },
        }));
    let executor = Executor::new(channel.clone(), None);

    executor
        .execute_operation(DropDatabase::new("test_db", None))
        .await
        .unwrap();
    executor
        .execute_operation(DropCollection::new("test_db", "missing", None))
        .await
        .unwrap();
    let reply = executor
        .execute_operation(RunCommand::new("test_db", doc! { "count": "coll" }))
        .await
        .unwrap();
    assert_eq!(reply, doc! { "ok": 1.0, "n": 3 });

    let err = executor
        .execute_operation(DropDatabase::new("test_db", None))
        .await
        .unwrap_err();
    assert!(matches!(*err.kind, ErrorKind::WriteConcern(_)));
    assert_eq!(err.code(), Some(64));
    assert_eq!(err.command_name(), Some("dropDatabase"));

    let bodies: Vec<_> = channel.sends().into_iter().map(|s| s.document).collect();
    assert_eq!(
        bodies,
        vec![
            doc! { "dropDatabase": 1 },
            doc! { "drop": "missing" },
            doc! { "count": "coll" },
            doc! { "dropDatabase": 1 },
        ]
    );
}

#[tokio::test]
async fn build_failure_names_the_operation() {
    let channel = SpyChannel::new();
    let executor = Executor::new(channel.clone(), None);

    let err = executor
        .execute_operation(RunCommand::new("admin", doc! {}))
        .await
        .unwrap_err();
    assert!(matches!(*err.kind, ErrorKind::InvalidCommand { .. }));
    assert_eq!(err.command_name(), Some("runCommand"));
    assert!(channel.sends().is_empty());
}

#[tokio::test]
async fn already_cancelled_token_prevents_send() {
    let channel = SpyChannel::new();
    let executor = Executor::new(channel.clone(), None);
    let token = CancellationToken::new();
    token.cancel();

    let err = executor
        .execute_cancellable(Command::new("dropDatabase", "test_db", 1), &token)
        .await
        .unwrap_err();
    assert!(matches!(*err.kind, ErrorKind::Cancelled));
    assert!(channel.sends().is_empty());
}

#[tokio::test]
async fn command_events() {
    let buffer = EventBuffer::new();
    let channel = SpyChannel::new()
        .reply_with(Ok(doc! { "ok": 1 }))
        .reply_with(Ok(doc! { "ok": 0, "errmsg": "unauthorized", "code": 13 }));
    let options = ExecutorOptions::builder()
        .command_event_handler(buffer.handler())
        .build();
    let executor = Executor::new(channel, options);

    executor
        .execute(Command::new("dropDatabase", "test_db", 1))
        .await
        .unwrap();
    executor
        .execute(Command::new("dropDatabase", "other_db", 1))
        .await
        .unwrap_err();
    // Encoding failures happen before anything is started.
    executor
        .execute(Command::new("", "test_db", 1))
        .await
        .unwrap_err();

    let events = buffer.all();
    assert_eq!(events.len(), 4);
    match (&events[0], &events[1], &events[2], &events[3]) {
        (
            CommandEvent::Started(started),
            CommandEvent::Succeeded(succeeded),
            CommandEvent::Started(second_started),
            CommandEvent::Failed(failed),
        ) => {
            assert_eq!(started.command, doc! { "dropDatabase": 1 });
            assert_eq!(started.db, "test_db");
            assert_eq!(started.command_name, "dropDatabase");
            assert_eq!(succeeded.reply, doc! { "ok": 1 });
            assert_eq!(second_started.db, "other_db");
            assert_eq!(failed.failure.code(), Some(13));
        }
        other => panic!("unexpected events: {:?}", other),
    }
}

#[tokio::test]
async fn channel_sender_receives_command_events() {
    let (sender, mut receiver) = tokio::sync::mpsc::channel(10);
    let options = ExecutorOptions::builder()
        .command_event_handler(sender)
        .build();
    let channel = SpyChannel::new().reply_with(Ok(doc! { "ok": 1 }));
    let executor = Executor::new(channel, options);

    executor
        .execute(Command::new("dropDatabase", "test_db", 1))
        .await
        .unwrap();

    let mut names = Vec::new();
    for _ in 0..2 {
        match receiver.recv().await.unwrap() {
            CommandEvent::Started(event) => names.push(("started", event.command_name)),
            CommandEvent::Succeeded(event) => names.push(("succeeded", event.command_name)),
            CommandEvent::Failed(event) => panic!("unexpected failure: {:?}", event),
        }
    }
    names.sort();
    assert_eq!(
        names,
        vec![
            ("started", "dropDatabase".to_string()),
            ("succeeded", "dropDatabase".to_string()),
        ]
    );
}

#[test]
fn execution_follows_the_happy_path() {
    let mut execution = Execution::new();
    assert_eq!(execution.state(), ExecutionState::Building);

    for next in [
        ExecutionState::Sent,
        ExecutionState::AwaitingReply,
        ExecutionState::Succeeded,
    ] {
        execution.advance(next).unwrap();
        assert_eq!(execution.state(), next);
    }
}

#[test]
fn execution_rejects_invalid_transitions() {
    let mut execution = Execution::new();
    assert!(execution.advance(ExecutionState::AwaitingReply).is_err());
    assert!(execution.advance(ExecutionState::Succeeded).is_err());
    assert_eq!(execution.state(), ExecutionState::Building);

    execution.advance(ExecutionState::Sent).unwrap();
    execution.advance(ExecutionState::Failed).unwrap();

    // Terminal states have no exits.
    for next in [
        ExecutionState::Building,
        ExecutionState::Sent,
        ExecutionState::AwaitingReply,
        ExecutionState::Succeeded,
        ExecutionState::Failed,
    ] {
        let err = execution.advance(next).unwrap_err();
        assert!(matches!(*err.kind, ErrorKind::Internal { .. }));
    }
    assert_eq!(execution.state(), ExecutionState::Failed);
}
