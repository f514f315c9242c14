use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::analysis::PauseHints;
use crate::error::{Result, TypistError};
use crate::events::{event_channel, EventReceiver, EventSender, Status, StatusSnapshot};
use crate::paragraph::BreakSender;
use crate::recovery::{spawn_focus_watch, FocusReceiver};
use crate::session::{RunReport, Session, SessionHandle};
use crate::settings::{Settings, SettingsPatch};
use crate::sink::TextSink;

fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// External collaborators wired into a session at start.
#[derive(Default)]
pub struct StartOptions {
    /// Seed for the session's random source; entropy when absent.
    pub seed: Option<u64>,
    /// Decision source for paragraph-break continuation approval. Absent
    /// means every configured break is declined.
    pub break_requests: Option<BreakSender>,
    /// Focus signal for the typing target; drives the recovery watch.
    pub focus_signals: Option<FocusReceiver>,
    /// Positions that receive an extra hesitation, from the analysis
    /// collaborator. Empty means rule-based delays only.
    pub pause_hints: PauseHints,
}

struct ActiveSession {
    handle: SessionHandle,
    task: JoinHandle<Result<RunReport>>,
    focus_watch: Option<JoinHandle<()>>,
}

/// Owns at most one typing session at a time and proxies commands to it.
/// A second `start` while a session is typing or paused is rejected, which
/// makes sink exclusivity an enforced invariant rather than a convention.
pub struct SessionController {
    events: EventSender,
    active: Option<ActiveSession>,
}

impl SessionController {
    /// Returns the controller and the stream of session events.
    pub fn new() -> (Self, EventReceiver) {
        let (events, rx) = event_channel();
        (
            Self {
                events,
                active: None,
            },
            rx,
        )
    }

    fn active_handle(&self) -> Option<&SessionHandle> {
        self.active.as_ref().map(|active| &active.handle)
    }

    /// True while a session is typing or paused.
    pub fn is_busy(&self) -> bool {
        self.active_handle()
            .map(|handle| handle.status().is_active())
            .unwrap_or(false)
    }

    /// Starts a session against `sink`, taking ownership of it for the
    /// session's lifetime, and spawns the typing loop. Fails if settings
    /// are out of range, the sink refuses text, or a session is active.
    pub fn start(
        &mut self,
        text: impl Into<String>,
        settings: Settings,
        sink: Box<dyn TextSink>,
        options: StartOptions,
    ) -> Result<SessionHandle> {
        if self.is_busy() {
            return Err(TypistError::SessionActive);
        }
        settings.validate()?;
        if !sink.accepts_text() {
            return Err(TypistError::untypable(format!(
                "{} target refuses text input",
                sink.describe()
            )));
        }

        if let Some(previous) = self.active.take() {
            if let Some(watch) = previous.focus_watch {
                watch.abort();
            }
        }

        let text = text.into();
        let rng = rng_from_seed(options.seed);
        let (session, handle) = Session::new(
            &text,
            settings,
            sink,
            rng,
            self.events.clone(),
            options.break_requests,
            options.pause_hints,
        );
        let focus_watch = options
            .focus_signals
            .map(|signals| spawn_focus_watch(handle.clone(), signals, self.events.clone()));
        let task = tokio::spawn(session.run());
        self.active = Some(ActiveSession {
            handle: handle.clone(),
            task,
            focus_watch,
        });
        Ok(handle)
    }

    pub fn pause(&self) {
        if let Some(handle) = self.active_handle() {
            handle.pause();
        }
    }

    pub fn resume(&self) {
        if let Some(handle) = self.active_handle() {
            handle.resume();
        }
    }

    pub fn stop(&self) {
        if let Some(handle) = self.active_handle() {
            handle.stop();
        }
    }

    pub fn restart(&self) {
        if let Some(handle) = self.active_handle() {
            handle.restart();
        }
    }

    pub fn update_settings(&self, patch: &SettingsPatch) -> Result<()> {
        match self.active_handle() {
            Some(handle) => handle.update_settings(patch),
            None => {
                debug!("settings update with no active session, ignored");
                Ok(())
            }
        }
    }

    /// Current snapshot; an idle placeholder when no session exists.
    pub fn status(&self) -> StatusSnapshot {
        match self.active_handle() {
            Some(handle) => handle.snapshot(),
            None => StatusSnapshot {
                status: Status::Idle,
                cursor_position: 0,
                total_length: 0,
                percentage: 0,
                typed_tail: String::new(),
                pending_head: String::new(),
                current_paragraph: 0,
                total_paragraphs: 0,
            },
        }
    }

    /// Waits for the active session to finish and returns its report;
    /// `None` when no session was started.
    pub async fn wait(&mut self) -> Result<Option<RunReport>> {
        let Some(active) = self.active.take() else {
            return Ok(None);
        };
        let joined = active.task.await;
        if let Some(watch) = active.focus_watch {
            watch.abort();
        }
        match joined {
            Ok(outcome) => outcome.map(Some),
            Err(e) => Err(TypistError::Task(e.to_string())),
        }
    }
}
