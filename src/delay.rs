use rand::Rng;

use crate::settings::Settings;

/// Punctuation that triggers a thinking pause when `thinking_pause` is on.
pub fn is_thinking_punctuation(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | ',' | ':' | ';')
}

/// Mean inter-character delay for a given speed, assuming 5 chars per word.
pub fn base_delay_ms(wpm: u32) -> f64 {
    60_000.0 / (f64::from(wpm) * 5.0)
}

/// Extra hesitation after punctuation, also used for analysis pause hints.
pub fn thinking_pause_ms(rng: &mut impl Rng) -> u64 {
    rng.gen_range(500..=2000)
}

/// Extra settling time after a line break.
pub fn line_break_pause_ms(rng: &mut impl Rng) -> u64 {
    rng.gen_range(500..=1500)
}

/// Delay to wait after emitting `c`. Uniform jitter of `variance` percent
/// around the base speed, plus punctuation and line-break pauses.
pub fn char_delay_ms(c: char, settings: &Settings, rng: &mut impl Rng) -> u64 {
    let base = base_delay_ms(settings.wpm);
    let spread = base * f64::from(settings.variance) / 100.0;
    let lower = base - spread;
    let upper = base + spread;

    let mut delay = rng.gen_range(lower..=upper);

    if settings.thinking_pause && is_thinking_punctuation(c) {
        delay += thinking_pause_ms(rng) as f64;
    }
    if c == '\n' {
        delay += line_break_pause_ms(rng) as f64;
    }

    delay.max(0.0).round() as u64
}
