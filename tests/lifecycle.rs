use std::{sync::Arc, thread, time::Duration};

use crossbeam_channel::{unbounded, Receiver};
use taskcore::{from_fn, EventKind, Status, Task, TaskError};

const TIMEOUT: Duration = Duration::from_secs(5);

fn events_of(task: &dyn Task) -> Receiver<EventKind> {
    let (sender, receiver) = unbounded();
    task.events().subscribe_all(move |event| {
        let _ = sender.send(event.kind);
    });
    receiver
}

/// Receives until `kind` has been seen, keeping everything received in `seen`.
fn wait_for(receiver: &Receiver<EventKind>, kind: EventKind, seen: &mut Vec<EventKind>) {
    while !seen.contains(&kind) {
        let next = receiver
            .recv_timeout(TIMEOUT)
            .unwrap_or_else(|_| panic!("no {} event, got {:?}", kind, seen));
        seen.push(next);
    }
}

fn looping_task() -> Arc<dyn Task> {
    from_fn(|task, _| {
        while task.checkpoint() {
            thread::sleep(Duration::from_millis(2));
        }
        Ok(())
    })
}

#[test]
fn run_async_finalizes_in_the_background() {
    let task = from_fn(|_, _| {
        thread::sleep(Duration::from_millis(20));
        Ok(())
    });
    let (sender, receiver) = unbounded();
    task.events().on_finalized(move |finished| {
        let _ = sender.send(finished.id());
    });

    Arc::clone(&task).run_async(None);

    assert_eq!(receiver.recv_timeout(TIMEOUT), Ok(task.id()));
    assert_eq!(task.status(), Status::Finalized);
    assert!(task.time() >= Duration::from_millis(20));
}

#[test]
fn pause_resume_and_stop_a_running_task() {
    let task = looping_task();
    let events = events_of(task.as_ref());
    let mut seen = Vec::new();

    Arc::clone(&task).run_async(None);
    wait_for(&events, EventKind::Running, &mut seen);

    task.pause();
    wait_for(&events, EventKind::Paused, &mut seen);
    wait_for(&events, EventKind::Pausing, &mut seen);
    assert_eq!(task.status(), Status::Paused);

    task.resume();
    assert_eq!(task.status(), Status::Running);
    wait_for(&events, EventKind::Resumed, &mut seen);

    task.stop();
    wait_for(&events, EventKind::Stopping, &mut seen);
    wait_for(&events, EventKind::Stopped, &mut seen);
    assert_eq!(task.status(), Status::Stopped);
    assert_eq!(seen[0], EventKind::Running);
    assert!(!seen.contains(&EventKind::Finalized));
}

#[test]
fn stop_wakes_a_paused_task() {
    let task = looping_task();
    let events = events_of(task.as_ref());
    let mut seen = Vec::new();

    Arc::clone(&task).run_async(None);
    wait_for(&events, EventKind::Running, &mut seen);
    task.pause();
    wait_for(&events, EventKind::Paused, &mut seen);

    task.stop();
    wait_for(&events, EventKind::Stopped, &mut seen);
    assert_eq!(task.status(), Status::Stopped);
}

#[test]
fn failure_is_reported_once_and_ends_in_error() {
    let task = from_fn(|_, _| Err(TaskError::failed("disk full")));
    let (sender, receiver) = unbounded();
    task.events().on_error(move |message| {
        let _ = sender.send(message.to_string());
    });

    task.run(None);

    assert_eq!(task.status(), Status::Error);
    assert_eq!(receiver.try_iter().collect::<Vec<_>>(), vec!["disk full".to_string()]);
    assert_eq!(task.last_error().as_deref(), Some("disk full"));
}

#[test]
fn reset_makes_a_finished_task_runnable() {
    let task = from_fn(|_, _| Ok(()));
    let first = events_of(task.as_ref());
    task.run(None);
    assert_eq!(first.try_iter().count(), 2);

    task.reset();
    assert_eq!(task.status(), Status::Start);
    assert!(task.events().is_empty());

    let second = events_of(task.as_ref());
    task.run(None);
    assert_eq!(task.status(), Status::Finalized);
    assert_eq!(first.try_iter().count(), 0);
    assert_eq!(
        second.try_iter().collect::<Vec<_>>(),
        vec![EventKind::Running, EventKind::Finalized]
    );
}

#[test]
fn panicking_handler_does_not_break_the_task() {
    let task = from_fn(|_, _| Ok(()));
    task.events().on_running(|_| panic!("bad handler"));
    let events = events_of(task.as_ref());

    task.run(None);

    assert_eq!(task.status(), Status::Finalized);
    assert_eq!(
        events.try_iter().collect::<Vec<_>>(),
        vec![EventKind::Running, EventKind::Finalized]
    );
}
