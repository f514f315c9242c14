use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;

use crate::error::Result;
use crate::keyboard::adjacent_typo_char;
use crate::settings::Settings;
use crate::sink::TextSink;

/// A typo decided ahead of execution: the wrong character, how long it stays
/// visible, and the recovery pause after its deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MistakePlan {
    pub wrong_char: char,
    pub hold_ms: u64,
    pub recovery_ms: u64,
}

/// Draws the typo decision for one character. Decisions are independent;
/// nothing carries across characters. Line breaks are never mistyped.
pub fn plan_mistake(c: char, settings: &Settings, rng: &mut impl Rng) -> Option<MistakePlan> {
    if !settings.self_correction || c == '\n' {
        return None;
    }
    if !rng.gen_bool(settings.mistake_probability()) {
        return None;
    }
    Some(MistakePlan {
        wrong_char: adjacent_typo_char(c, rng),
        hold_ms: rng.gen_range(100..=300),
        recovery_ms: rng.gen_range(50..=150),
    })
}

/// Emits `c` into the sink, optionally preceded by a visible typo that is
/// held, deleted, and then replaced by the correct character. Returns the
/// executed plan, if any.
pub async fn emit_char(
    c: char,
    settings: &Settings,
    sink: &mut dyn TextSink,
    rng: &mut impl Rng,
) -> Result<Option<MistakePlan>> {
    let plan = plan_mistake(c, settings, rng);
    if let Some(plan) = &plan {
        sink.emit_char(plan.wrong_char)?;
        sleep(Duration::from_millis(plan.hold_ms)).await;
        sink.delete_last_char()?;
        sleep(Duration::from_millis(plan.recovery_ms)).await;
    }
    sink.emit_char(c)?;
    Ok(plan)
}
