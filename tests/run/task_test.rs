//! Integration tests for `TaskRun` against real `/bin/sh` children.

use std::time::Duration;

use tokio::sync::mpsc::Receiver;
use tokio::time::timeout;
use tokio_test::assert_ok;

use spork::run::{RunCommand, RunState, StreamOrigin, TaskNotification, TaskRun, TaskRunError};

const TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Drain the channel until the `Stopped` notification arrives.
async fn collect_until_stopped(rx: &mut Receiver<TaskNotification>) -> Vec<TaskNotification> {
    let mut notifications = Vec::new();
    loop {
        let notification = timeout(TEST_TIMEOUT, rx.recv())
            .await
            .expect("timed out waiting for notification")
            .expect("channel closed before Stopped");
        let stopped = notification == TaskNotification::Stopped;
        notifications.push(notification);
        if stopped {
            return notifications;
        }
    }
}

fn lines_from(notifications: &[TaskNotification], origin: StreamOrigin) -> Vec<&str> {
    notifications
        .iter()
        .filter_map(|notification| match notification {
            TaskNotification::Line {
                text,
                origin: line_origin,
            } if *line_origin == origin => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn started_lines_stopped_in_order() {
    let command = RunCommand::new("printf 'one\\ntwo\\nthree\\n'");
    let (mut task, mut rx) = TaskRun::new(command);

    assert_ok!(task.start().await);
    assert_eq!(task.state(), RunState::Running);

    let notifications = collect_until_stopped(&mut rx).await;

    assert_eq!(notifications.first(), Some(&TaskNotification::Started));
    assert_eq!(notifications.last(), Some(&TaskNotification::Stopped));
    assert_eq!(
        lines_from(&notifications, StreamOrigin::Stdout),
        vec!["one", "two", "three"]
    );
    assert_eq!(task.state(), RunState::Stopped);
}

#[tokio::test]
async fn stopped_is_sent_exactly_once_and_last() {
    let command = RunCommand::new("echo done");
    let (mut task, mut rx) = TaskRun::new(command);
    task.start().await.unwrap();

    let notifications = collect_until_stopped(&mut rx).await;
    let stopped_count = notifications
        .iter()
        .filter(|n| **n == TaskNotification::Stopped)
        .count();
    assert_eq!(stopped_count, 1);

    // Dropping the run releases the last sender; nothing follows Stopped.
    drop(task);
    assert_eq!(rx.recv().await, None);
}

#[tokio::test]
async fn stderr_lines_carry_their_origin() {
    let command = RunCommand::new("echo out; echo err 1>&2; echo out2");
    let (mut task, mut rx) = TaskRun::new(command);
    task.start().await.unwrap();

    let notifications = collect_until_stopped(&mut rx).await;

    assert_eq!(
        lines_from(&notifications, StreamOrigin::Stdout),
        vec!["out", "out2"]
    );
    assert_eq!(
        lines_from(&notifications, StreamOrigin::Stderr),
        vec!["err"]
    );
}

#[tokio::test]
async fn unterminated_final_line_is_delivered() {
    let command = RunCommand::new("printf 'partial text'");
    let (mut task, mut rx) = TaskRun::new(command);
    task.start().await.unwrap();

    let notifications = collect_until_stopped(&mut rx).await;
    assert_eq!(
        lines_from(&notifications, StreamOrigin::Stdout),
        vec!["partial text"]
    );
}

#[tokio::test]
async fn environment_overrides_reach_the_child() {
    let command =
        RunCommand::new("printf '%s\\n' \"$SPORK_FLAVOR\"").env("SPORK_FLAVOR", "banana");
    let (mut task, mut rx) = TaskRun::new(command);
    task.start().await.unwrap();

    let notifications = collect_until_stopped(&mut rx).await;
    assert_eq!(
        lines_from(&notifications, StreamOrigin::Stdout),
        vec!["banana"]
    );
}

#[tokio::test]
async fn invalid_bytes_are_replaced_not_fatal() {
    use std::io::Write;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"bad \xff byte\n").unwrap();
    file.flush().unwrap();

    let command = RunCommand::new(format!("cat '{}'", file.path().display()));
    let (mut task, mut rx) = TaskRun::new(command);
    task.start().await.unwrap();

    let notifications = collect_until_stopped(&mut rx).await;
    let lines = lines_from(&notifications, StreamOrigin::Stdout);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains('\u{FFFD}'));
}

#[tokio::test]
async fn bounded_channel_applies_backpressure_without_loss() {
    let script = "i=0; while [ $i -lt 200 ]; do echo line-$i; i=$((i+1)); done";
    let (mut task, mut rx) = TaskRun::with_capacity(RunCommand::new(script), 2);
    task.start().await.unwrap();

    let notifications = collect_until_stopped(&mut rx).await;
    let lines = lines_from(&notifications, StreamOrigin::Stdout);
    assert_eq!(lines.len(), 200);
    for (i, line) in lines.iter().enumerate() {
        assert_eq!(*line, format!("line-{i}"));
    }
}

#[tokio::test]
async fn stop_terminates_a_long_running_child() {
    let (mut task, mut rx) = TaskRun::new(RunCommand::new("sleep 30"));
    task.start().await.unwrap();

    assert_eq!(
        timeout(TEST_TIMEOUT, rx.recv()).await.unwrap(),
        Some(TaskNotification::Started)
    );

    task.stop().unwrap();
    let notifications = collect_until_stopped(&mut rx).await;
    assert_eq!(notifications.last(), Some(&TaskNotification::Stopped));
    assert_eq!(task.state(), RunState::Stopped);
}

#[tokio::test]
async fn stop_while_idle_is_invalid_and_has_no_side_effects() {
    let (task, mut rx) = TaskRun::new(RunCommand::new("true"));

    assert!(matches!(
        task.stop(),
        Err(TaskRunError::InvalidState(RunState::Idle))
    ));
    assert_eq!(task.state(), RunState::Idle);

    drop(task);
    assert_eq!(rx.recv().await, None);
}

#[tokio::test]
async fn start_while_running_is_already_running() {
    let (mut task, mut rx) = TaskRun::new(RunCommand::new("sleep 5"));
    task.start().await.unwrap();

    assert!(matches!(
        task.start().await,
        Err(TaskRunError::AlreadyRunning)
    ));

    task.stop().unwrap();
    collect_until_stopped(&mut rx).await;
}

#[tokio::test]
async fn a_run_is_single_use() {
    let (mut task, mut rx) = TaskRun::new(RunCommand::new("true"));
    task.start().await.unwrap();
    collect_until_stopped(&mut rx).await;

    assert!(matches!(
        task.start().await,
        Err(TaskRunError::InvalidState(RunState::Stopped))
    ));
    assert!(matches!(
        task.stop(),
        Err(TaskRunError::InvalidState(RunState::Stopped))
    ));
}

#[tokio::test]
async fn spawn_failure_stays_idle_and_may_be_retried() {
    let (mut task, mut rx) = TaskRun::new(RunCommand::new("echo retried"));

    let err = task
        .start_with_shell("/nonexistent/shell")
        .await
        .unwrap_err();
    assert!(matches!(err, TaskRunError::Spawn(_)));
    assert_eq!(task.state(), RunState::Idle);

    task.start().await.unwrap();
    let notifications = collect_until_stopped(&mut rx).await;
    assert_eq!(
        lines_from(&notifications, StreamOrigin::Stdout),
        vec!["retried"]
    );
}

#[tokio::test]
async fn state_updates_observe_the_full_lifecycle() {
    let (mut task, mut rx) = TaskRun::new(RunCommand::new("true"));
    let mut states = task.state_updates();
    assert_eq!(*states.borrow_and_update(), RunState::Idle);

    task.start().await.unwrap();
    collect_until_stopped(&mut rx).await;

    // The watch coalesces intermediate values; the settled state is Stopped.
    assert!(states.changed().await.is_ok());
    assert_eq!(*states.borrow_and_update(), RunState::Stopped);
}
