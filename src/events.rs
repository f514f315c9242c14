use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Session lifecycle states. `Stopped` and `Completed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Idle,
    Typing,
    Paused,
    Stopped,
    Completed,
}

impl Status {
    pub fn is_active(self) -> bool {
        matches!(self, Status::Typing | Status::Paused)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Stopped | Status::Completed)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Idle => "idle",
            Status::Typing => "typing",
            Status::Paused => "paused",
            Status::Stopped => "stopped",
            Status::Completed => "completed",
        };
        f.write_str(name)
    }
}

/// Read-only projection of session state. The emitted/pending windows carry
/// at most 100 characters each.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub status: Status,
    pub cursor_position: usize,
    pub total_length: usize,
    pub percentage: u8,
    pub typed_tail: String,
    pub pending_head: String,
    pub current_paragraph: usize,
    pub total_paragraphs: usize,
}

pub fn completion_percentage(cursor_position: usize, total_length: usize) -> u8 {
    if total_length == 0 {
        return 0;
    }
    (cursor_position as f64 / total_length as f64 * 100.0).round() as u8
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    Progress { snapshot: StatusSnapshot },
    Completed { snapshot: StatusSnapshot },
    RecoveryRequired { snapshot: StatusSnapshot },
    CorrectionNotice { position: usize },
}

pub type EventSender = mpsc::UnboundedSender<SessionEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<SessionEvent>;

pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
