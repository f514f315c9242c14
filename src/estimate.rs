use std::time::Duration;

use rand::Rng;
use serde::Serialize;

use crate::delay;
use crate::error::Result;
use crate::mistake;
use crate::paragraph;
use crate::settings::Settings;
use crate::sink::{BufferSink, TextSink};

/// Outcome of a dry run: how a session with these settings would unfold,
/// without sleeping or touching a real target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rehearsal {
    pub chars: usize,
    pub paragraphs: usize,
    pub mistakes: usize,
    pub estimated_ms: u64,
    /// What the sink holds at the end; callers can check it against the
    /// source text to catch internal drift.
    pub typed: String,
}

impl Rehearsal {
    pub fn estimated(&self) -> Duration {
        Duration::from_millis(self.estimated_ms)
    }
}

/// Walks the text with the real decision logic, drawing every delay and
/// mistake from `rng`, and accumulates the expected duration. Paragraph
/// approvals are assumed granted; their wait time is external and not
/// estimated.
pub fn rehearse(text: &str, settings: &Settings, rng: &mut impl Rng) -> Result<Rehearsal> {
    settings.validate()?;

    let mut sink = BufferSink::new();
    let mut mistakes = 0usize;
    let mut estimated_ms = 0u64;

    for c in text.chars() {
        if let Some(plan) = mistake::plan_mistake(c, settings, rng) {
            sink.emit_char(plan.wrong_char)?;
            sink.delete_last_char()?;
            mistakes += 1;
            estimated_ms += plan.hold_ms + plan.recovery_ms;
        }
        sink.emit_char(c)?;
        estimated_ms += delay::char_delay_ms(c, settings, rng);
    }

    Ok(Rehearsal {
        chars: text.chars().count(),
        paragraphs: paragraph::count_paragraphs(text),
        mistakes,
        estimated_ms,
        typed: sink.contents(),
    })
}
