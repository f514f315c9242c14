use std::time::Duration;

use pretty_assertions::assert_eq;
use tokio::time::sleep;

use typist::controller::{SessionController, StartOptions};
use typist::error::TypistError;
use typist::events::{EventReceiver, SessionEvent, Status};
use typist::settings::{Settings, SettingsPatch};
use typist::sink::BufferSink;

fn steady(wpm: u32) -> Settings {
    Settings {
        wpm,
        variance: 0,
        mistake_rate: 0,
        thinking_pause: false,
        self_correction: true,
        paragraph_breaks: 0,
    }
}

async fn drain(mut events: EventReceiver) -> Vec<SessionEvent> {
    let mut collected = Vec::new();
    while let Some(event) = events.recv().await {
        collected.push(event);
    }
    collected
}

#[tokio::test(start_paused = true)]
async fn types_the_whole_text_and_completes() {
    let sink = BufferSink::new();
    let typed = sink.clone();

    let (mut controller, events) = SessionController::new();
    let handle = controller
        .start("Hi", steady(60), Box::new(sink), StartOptions::default())
        .expect("start must succeed");
    assert_eq!(handle.status(), Status::Typing);

    let report = controller
        .wait()
        .await
        .expect("session must end cleanly")
        .expect("a session was started");
    drop(controller);

    assert_eq!(report.final_snapshot.status, Status::Completed);
    assert_eq!(report.final_snapshot.cursor_position, 2);
    assert_eq!(report.final_snapshot.percentage, 100);
    assert_eq!(report.elapsed, Duration::from_millis(400));
    assert_eq!(typed.contents(), "Hi");

    let events = drain(events).await;
    assert_eq!(events.len(), 2);
    assert!(matches!(
        &events[0],
        SessionEvent::Progress { snapshot } if snapshot.cursor_position == 1
    ));
    assert!(matches!(
        &events[1],
        SessionEvent::Completed { snapshot } if snapshot.percentage == 100
    ));
}

#[tokio::test(start_paused = true)]
async fn stop_keeps_the_cursor_where_it_landed() {
    let sink = BufferSink::new();
    let typed = sink.clone();

    let (mut controller, _events) = SessionController::new();
    let handle = controller
        .start("abcdefghij", steady(60), Box::new(sink), StartOptions::default())
        .expect("start must succeed");

    sleep(Duration::from_millis(900)).await;
    handle.stop();

    let report = controller
        .wait()
        .await
        .expect("session must end cleanly")
        .expect("a session was started");

    assert_eq!(report.final_snapshot.status, Status::Stopped);
    assert_eq!(report.final_snapshot.cursor_position, 5);
    assert_eq!(report.final_snapshot.percentage, 50);
    assert_eq!(typed.contents(), "abcde");
}

#[tokio::test(start_paused = true)]
async fn pause_holds_and_resume_continues_at_the_exact_position() {
    let sink = BufferSink::new();
    let typed = sink.clone();

    let (mut controller, _events) = SessionController::new();
    let handle = controller
        .start("abcdef", steady(60), Box::new(sink), StartOptions::default())
        .expect("start must succeed");

    sleep(Duration::from_millis(500)).await;
    handle.pause();
    assert_eq!(handle.status(), Status::Paused);

    // A minute of wall time passes without a single new character.
    sleep(Duration::from_secs(60)).await;
    assert_eq!(typed.contents(), "abc");
    assert_eq!(handle.snapshot().cursor_position, 3);

    handle.resume();
    let report = controller
        .wait()
        .await
        .expect("session must end cleanly")
        .expect("a session was started");

    assert_eq!(report.final_snapshot.status, Status::Completed);
    assert_eq!(typed.contents(), "abcdef");
}

#[tokio::test(start_paused = true)]
async fn restart_retypes_from_the_top_with_a_cleared_sink() {
    let sink = BufferSink::new();
    let typed = sink.clone();

    let (mut controller, _events) = SessionController::new();
    let handle = controller
        .start("abc", steady(60), Box::new(sink), StartOptions::default())
        .expect("start must succeed");

    sleep(Duration::from_millis(300)).await;
    assert_eq!(typed.contents(), "ab");
    handle.restart();

    let report = controller
        .wait()
        .await
        .expect("session must end cleanly")
        .expect("a session was started");

    assert_eq!(report.final_snapshot.status, Status::Completed);
    assert_eq!(report.final_snapshot.cursor_position, 3);
    assert_eq!(report.final_snapshot.typed_tail, "abc");
    assert_eq!(typed.contents(), "abc");
    assert_eq!(handle.settings().wpm, 60);
}

#[tokio::test(start_paused = true)]
async fn restart_while_paused_waits_for_resume() {
    let sink = BufferSink::new();
    let typed = sink.clone();

    let (mut controller, _events) = SessionController::new();
    let handle = controller
        .start("abcd", steady(60), Box::new(sink), StartOptions::default())
        .expect("start must succeed");

    sleep(Duration::from_millis(500)).await;
    handle.pause();
    handle.restart();

    // Rewound but still paused: the sink is cleared only once the loop runs.
    sleep(Duration::from_secs(60)).await;
    assert_eq!(handle.status(), Status::Paused);
    assert_eq!(handle.snapshot().cursor_position, 0);
    assert_eq!(typed.contents(), "abc");

    handle.resume();
    let report = controller
        .wait()
        .await
        .expect("session must end cleanly")
        .expect("a session was started");

    assert_eq!(report.final_snapshot.status, Status::Completed);
    assert_eq!(typed.contents(), "abcd");
}

#[tokio::test(start_paused = true)]
async fn a_second_start_is_rejected_while_active() {
    let (mut controller, _events) = SessionController::new();
    let handle = controller
        .start(
            "a longer text that keeps the session busy",
            steady(60),
            Box::new(BufferSink::new()),
            StartOptions::default(),
        )
        .expect("start must succeed");

    let err = controller
        .start(
            "another text",
            steady(60),
            Box::new(BufferSink::new()),
            StartOptions::default(),
        )
        .expect_err("a busy controller must refuse a second start");
    assert!(matches!(err, TypistError::SessionActive));

    handle.stop();
    controller
        .wait()
        .await
        .expect("session must end cleanly");
}

#[tokio::test(start_paused = true)]
async fn a_read_only_target_is_refused() {
    let (mut controller, _events) = SessionController::new();
    let err = controller
        .start(
            "Hi",
            steady(60),
            Box::new(BufferSink::read_only()),
            StartOptions::default(),
        )
        .expect_err("a read-only target must be refused");
    assert!(matches!(err, TypistError::Untypable(_)));
}

#[tokio::test(start_paused = true)]
async fn out_of_range_settings_are_rejected_at_start() {
    let (mut controller, _events) = SessionController::new();
    let err = controller
        .start(
            "Hi",
            Settings {
                wpm: 0,
                ..Default::default()
            },
            Box::new(BufferSink::new()),
            StartOptions::default(),
        )
        .expect_err("wpm 0 must be refused");
    assert!(matches!(err, TypistError::Settings(_)));
}

#[tokio::test(start_paused = true)]
async fn settings_updates_apply_to_later_characters_only() {
    let sink = BufferSink::new();

    let (mut controller, _events) = SessionController::new();
    let handle = controller
        .start("ab", steady(60), Box::new(sink), StartOptions::default())
        .expect("start must succeed");

    sleep(Duration::from_millis(50)).await;
    handle
        .update_settings(&SettingsPatch {
            wpm: Some(120),
            ..Default::default()
        })
        .expect("a valid update must be accepted");
    assert_eq!(handle.settings().wpm, 120);
    assert_eq!(handle.settings().mistake_rate, 0);

    let report = controller
        .wait()
        .await
        .expect("session must end cleanly")
        .expect("a session was started");

    // The first delay was drawn at 60 WPM (200 ms), the second at 120 (100 ms).
    assert_eq!(report.elapsed, Duration::from_millis(300));
}

#[tokio::test(start_paused = true)]
async fn invalid_updates_are_rejected_wholesale() {
    let (mut controller, _events) = SessionController::new();
    let handle = controller
        .start(
            "abcdef",
            steady(60),
            Box::new(BufferSink::new()),
            StartOptions::default(),
        )
        .expect("start must succeed");

    let err = handle
        .update_settings(&SettingsPatch {
            wpm: Some(0),
            mistake_rate: Some(10),
            ..Default::default()
        })
        .expect_err("wpm 0 must be refused");
    assert!(matches!(err, TypistError::Settings(_)));
    assert_eq!(handle.settings().wpm, 60);
    assert_eq!(handle.settings().mistake_rate, 0);

    handle.stop();
    controller
        .wait()
        .await
        .expect("session must end cleanly");
}

#[tokio::test(start_paused = true)]
async fn empty_text_completes_immediately() {
    let (mut controller, events) = SessionController::new();
    controller
        .start("", steady(60), Box::new(BufferSink::new()), StartOptions::default())
        .expect("start must succeed");

    let report = controller
        .wait()
        .await
        .expect("session must end cleanly")
        .expect("a session was started");
    drop(controller);

    assert_eq!(report.final_snapshot.status, Status::Completed);
    assert_eq!(report.final_snapshot.cursor_position, 0);
    assert_eq!(report.final_snapshot.total_length, 0);
    assert_eq!(report.final_snapshot.percentage, 0);
    assert_eq!(report.elapsed, Duration::ZERO);

    let events = drain(events).await;
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], SessionEvent::Completed { .. }));
}

#[tokio::test(start_paused = true)]
async fn full_mistake_rate_corrects_every_character() {
    let sink = BufferSink::new();
    let typed = sink.clone();

    let (mut controller, events) = SessionController::new();
    controller
        .start(
            "abc",
            Settings {
                mistake_rate: 100,
                ..steady(600)
            },
            Box::new(sink),
            StartOptions {
                seed: Some(5),
                ..Default::default()
            },
        )
        .expect("start must succeed");

    let report = controller
        .wait()
        .await
        .expect("session must end cleanly")
        .expect("a session was started");
    drop(controller);

    assert_eq!(report.final_snapshot.status, Status::Completed);
    assert_eq!(report.mistakes_injected, 3);
    assert_eq!(typed.contents(), "abc");

    let corrections: Vec<usize> = drain(events)
        .await
        .iter()
        .filter_map(|event| match event {
            SessionEvent::CorrectionNotice { position } => Some(*position),
            _ => None,
        })
        .collect();
    assert_eq!(corrections, vec![0, 1, 2]);
}

#[tokio::test(start_paused = true)]
async fn progress_fires_on_every_fifth_character() {
    let (mut controller, events) = SessionController::new();
    controller
        .start(
            "abcdefghijkl",
            steady(600),
            Box::new(BufferSink::new()),
            StartOptions::default(),
        )
        .expect("start must succeed");

    controller
        .wait()
        .await
        .expect("session must end cleanly");
    drop(controller);

    let progress_cursors: Vec<usize> = drain(events)
        .await
        .iter()
        .filter_map(|event| match event {
            SessionEvent::Progress { snapshot } => Some(snapshot.cursor_position),
            _ => None,
        })
        .collect();
    assert_eq!(progress_cursors, vec![1, 6, 11]);
}

#[tokio::test(start_paused = true)]
async fn snapshot_windows_are_capped_at_one_hundred_chars() {
    let (mut controller, _events) = SessionController::new();
    let handle = controller
        .start(
            "x".repeat(300),
            steady(6000),
            Box::new(BufferSink::new()),
            StartOptions::default(),
        )
        .expect("start must succeed");

    sleep(Duration::from_millis(241)).await;
    let snapshot = handle.snapshot();
    assert_eq!(snapshot.cursor_position, 121);
    assert_eq!(snapshot.percentage, 40);
    assert_eq!(snapshot.typed_tail.chars().count(), 100);
    assert_eq!(snapshot.pending_head.chars().count(), 100);

    handle.stop();
    controller
        .wait()
        .await
        .expect("session must end cleanly");
}
