use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rand::rngs::StdRng;
use serde::Serialize;
use tokio::sync::Notify;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::analysis::PauseHints;
use crate::delay;
use crate::error::Result;
use crate::events::{completion_percentage, EventSender, SessionEvent, Status, StatusSnapshot};
use crate::mistake;
use crate::paragraph::{self, BreakRequest, BreakSender};
use crate::settings::{Settings, SettingsPatch};
use crate::sink::TextSink;

#[derive(Debug)]
struct Inner {
    status: Status,
    cursor: usize,
    typed: String,
    settings: Settings,
    current_paragraph: usize,
    mistakes_injected: usize,
    clear_requested: bool,
}

#[derive(Debug)]
struct Shared {
    chars: Vec<char>,
    total_paragraphs: usize,
    inner: Mutex<Inner>,
    wake: Notify,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn status(&self) -> Status {
        self.lock().status
    }

    fn settings(&self) -> Settings {
        self.lock().settings.clone()
    }

    fn snapshot(&self) -> StatusSnapshot {
        self.snapshot_of(&self.lock())
    }

    fn snapshot_of(&self, inner: &Inner) -> StatusSnapshot {
        let cursor = inner.cursor;
        let total = self.chars.len();
        StatusSnapshot {
            status: inner.status,
            cursor_position: cursor,
            total_length: total,
            percentage: completion_percentage(cursor, total),
            typed_tail: tail_chars(&inner.typed, 100),
            pending_head: self.chars.iter().skip(cursor).take(100).collect(),
            current_paragraph: inner.current_paragraph,
            total_paragraphs: self.total_paragraphs,
        }
    }

    /// Typing -> Paused. Returns the snapshot when the transition happened.
    fn pause(&self) -> Option<StatusSnapshot> {
        let mut inner = self.lock();
        if inner.status != Status::Typing {
            return None;
        }
        inner.status = Status::Paused;
        Some(self.snapshot_of(&inner))
    }

    /// Paused -> Typing, waking the parked loop.
    fn resume(&self) -> bool {
        let resumed = {
            let mut inner = self.lock();
            if inner.status != Status::Paused {
                false
            } else {
                inner.status = Status::Typing;
                true
            }
        };
        if resumed {
            self.wake.notify_one();
        }
        resumed
    }

    /// Any active state -> Stopped, waking the parked loop.
    fn stop(&self) -> bool {
        let stopped = {
            let mut inner = self.lock();
            if !inner.status.is_active() {
                false
            } else {
                inner.status = Status::Stopped;
                true
            }
        };
        if stopped {
            self.wake.notify_one();
        }
        stopped
    }
}

fn tail_chars(s: &str, n: usize) -> String {
    let count = s.chars().count();
    s.chars().skip(count.saturating_sub(n)).collect()
}

/// Cloneable command surface for a running session. All methods are plain
/// calls that mutate shared state; the loop observes them at its next
/// suspension point.
#[derive(Clone, Debug)]
pub struct SessionHandle {
    shared: Arc<Shared>,
}

impl SessionHandle {
    pub fn status(&self) -> Status {
        self.shared.status()
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        self.shared.snapshot()
    }

    pub fn settings(&self) -> Settings {
        self.shared.settings()
    }

    pub fn pause(&self) {
        if self.shared.pause().is_some() {
            debug!("session paused");
        }
    }

    /// Pause forced by a focus loss. Returns the snapshot taken at the
    /// moment of the transition; `None` if the session was not typing.
    pub(crate) fn interrupt(&self) -> Option<StatusSnapshot> {
        self.shared.pause()
    }

    pub fn resume(&self) {
        if self.shared.resume() {
            debug!("session resumed");
        }
    }

    pub fn stop(&self) {
        if self.shared.stop() {
            debug!("session stop requested");
        }
    }

    /// Rewinds the cursor to the start and forgets emitted history. The
    /// status is left unchanged; the loop clears the sink on its next
    /// iteration since it alone owns the sink.
    pub fn restart(&self) {
        let mut inner = self.shared.lock();
        inner.cursor = 0;
        inner.typed.clear();
        inner.current_paragraph = 0;
        inner.clear_requested = true;
        debug!("session restarted from position 0");
    }

    /// Merges a partial update onto the current settings. The merged result
    /// is validated and rejected wholesale if out of range; it applies to
    /// characters emitted after this call only.
    pub fn update_settings(&self, patch: &SettingsPatch) -> Result<()> {
        let mut inner = self.shared.lock();
        let merged = patch.merged(&inner.settings);
        merged.validate()?;
        debug!(?merged, "settings updated");
        inner.settings = merged;
        Ok(())
    }
}

/// Summary of a finished run, whether it completed or was stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub final_snapshot: StatusSnapshot,
    pub mistakes_injected: usize,
    pub elapsed: Duration,
}

enum Gate {
    Proceed,
    Halted,
}

/// A typing session driving one sink. Constructed by the controller; `run`
/// consumes the session and is the only place the sink is touched.
pub struct Session {
    shared: Arc<Shared>,
    sink: Box<dyn TextSink>,
    rng: StdRng,
    events: EventSender,
    break_requests: Option<BreakSender>,
    pause_hints: PauseHints,
}

impl Session {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        text: &str,
        settings: Settings,
        sink: Box<dyn TextSink>,
        rng: StdRng,
        events: EventSender,
        break_requests: Option<BreakSender>,
        pause_hints: PauseHints,
    ) -> (Self, SessionHandle) {
        let chars: Vec<char> = text.chars().collect();
        let total_paragraphs = paragraph::count_paragraphs(text);
        let shared = Arc::new(Shared {
            chars,
            total_paragraphs,
            inner: Mutex::new(Inner {
                status: Status::Typing,
                cursor: 0,
                typed: String::new(),
                settings,
                current_paragraph: 0,
                mistakes_injected: 0,
                clear_requested: false,
            }),
            wake: Notify::new(),
        });
        let handle = SessionHandle {
            shared: Arc::clone(&shared),
        };
        let session = Self {
            shared,
            sink,
            rng,
            events,
            break_requests,
            pause_hints,
        };
        (session, handle)
    }

    /// Drives the session to a terminal state. Returns the run report; a
    /// sink failure stops the session and surfaces as the error.
    pub async fn run(mut self) -> Result<RunReport> {
        let started = Instant::now();
        info!(
            target = self.sink.describe(),
            chars = self.shared.chars.len(),
            paragraphs = self.shared.total_paragraphs,
            "starting typing session"
        );

        if let Err(e) = self.drive().await {
            {
                let mut inner = self.shared.lock();
                if !inner.status.is_terminal() {
                    inner.status = Status::Stopped;
                }
            }
            warn!(error = %e, "typing session aborted by sink failure");
            return Err(e);
        }

        let (final_snapshot, mistakes_injected) = {
            let inner = self.shared.lock();
            (self.shared.snapshot_of(&inner), inner.mistakes_injected)
        };
        info!(
            status = %final_snapshot.status,
            cursor = final_snapshot.cursor_position,
            mistakes = mistakes_injected,
            "typing session finished"
        );
        Ok(RunReport {
            final_snapshot,
            mistakes_injected,
            elapsed: started.elapsed(),
        })
    }

    async fn drive(&mut self) -> Result<()> {
        self.sink.clear()?;

        loop {
            match self.await_typing().await {
                Gate::Proceed => {}
                Gate::Halted => return Ok(()),
            }

            if self.take_clear_request() {
                self.sink.clear()?;
            }

            let i = {
                let inner = self.shared.lock();
                inner.cursor
            };
            let Some(&c) = self.shared.chars.get(i) else {
                break;
            };
            let settings = self.shared.settings();

            if paragraph::is_boundary(&self.shared.chars, i) {
                let (current, ask) = self.enter_paragraph(settings.paragraph_breaks);
                if ask {
                    info!(
                        paragraph = current,
                        total = self.shared.total_paragraphs,
                        "paragraph boundary, awaiting continuation approval"
                    );
                    if !self.request_continuation(current).await {
                        info!("continuation declined, stopping");
                        self.shared.stop();
                        return Ok(());
                    }
                }
            }

            let injected =
                mistake::emit_char(c, &settings, self.sink.as_mut(), &mut self.rng).await?;
            if injected.is_some() {
                let mut inner = self.shared.lock();
                inner.mistakes_injected += 1;
                drop(inner);
                let _ = self
                    .events
                    .send(SessionEvent::CorrectionNotice { position: i });
            }

            let progress = {
                let mut inner = self.shared.lock();
                // A restart during the waits above rewinds the cursor; in
                // that case the emitted character is stale and must not
                // advance it.
                if inner.cursor != i {
                    None
                } else {
                    inner.cursor = i + 1;
                    inner.typed.push(c);
                    (i % 5 == 0).then(|| self.shared.snapshot_of(&inner))
                }
            };
            if let Some(snapshot) = progress {
                let _ = self.events.send(SessionEvent::Progress { snapshot });
            }

            let mut wait_ms = delay::char_delay_ms(c, &settings, &mut self.rng);
            if self.pause_hints.contains(i) {
                wait_ms += delay::thinking_pause_ms(&mut self.rng);
            }
            sleep(Duration::from_millis(wait_ms)).await;
        }

        let completed = {
            let mut inner = self.shared.lock();
            if inner.status == Status::Typing {
                inner.status = Status::Completed;
                Some(self.shared.snapshot_of(&inner))
            } else {
                None
            }
        };
        if let Some(snapshot) = completed {
            let _ = self.events.send(SessionEvent::Completed { snapshot });
        }
        Ok(())
    }

    /// Parks until the session is typing again. Event-driven: `resume` and
    /// `stop` signal the wake, so there is no polling interval.
    async fn await_typing(&self) -> Gate {
        loop {
            match self.shared.status() {
                Status::Typing => return Gate::Proceed,
                Status::Stopped | Status::Completed => return Gate::Halted,
                Status::Idle | Status::Paused => {}
            }
            self.shared.wake.notified().await;
        }
    }

    fn take_clear_request(&self) -> bool {
        let mut inner = self.shared.lock();
        std::mem::take(&mut inner.clear_requested)
    }

    fn enter_paragraph(&self, breaks: usize) -> (usize, bool) {
        let mut inner = self.shared.lock();
        inner.current_paragraph += 1;
        let current = inner.current_paragraph;
        let ask = breaks > 0
            && current % breaks == 0
            && current < self.shared.total_paragraphs;
        (current, ask)
    }

    async fn request_continuation(&mut self, current: usize) -> bool {
        let Some(tx) = self.break_requests.clone() else {
            return false;
        };
        let percentage = {
            let inner = self.shared.lock();
            completion_percentage(inner.cursor, self.shared.chars.len())
        };
        let (request, reply) =
            BreakRequest::new(current, self.shared.total_paragraphs, percentage);
        if tx.send(request).await.is_err() {
            return false;
        }
        reply.await.unwrap_or(false)
    }
}
