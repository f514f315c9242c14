use serde::{Deserialize, Serialize};

use crate::error::{Result, TypistError};

/// Typing behavior configuration. Mutable mid-session; changes apply to
/// characters emitted after the update only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub wpm: u32,
    pub variance: u8,
    pub mistake_rate: u8,
    pub thinking_pause: bool,
    pub self_correction: bool,
    pub paragraph_breaks: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            wpm: 60,
            variance: 20,
            mistake_rate: 5,
            thinking_pause: true,
            self_correction: true,
            paragraph_breaks: 2,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.wpm == 0 {
            return Err(TypistError::settings("wpm must be at least 1"));
        }
        if self.variance > 100 {
            return Err(TypistError::settings("variance must be between 0 and 100"));
        }
        if self.mistake_rate > 100 {
            return Err(TypistError::settings(
                "mistake_rate must be between 0 and 100",
            ));
        }
        Ok(())
    }

    /// Per-character typo probability in `[0, 1]`.
    pub fn mistake_probability(&self) -> f64 {
        f64::from(self.mistake_rate) / 100.0
    }
}

/// Partial settings update. Unset fields keep their current value; the
/// merged result is validated as a whole before it is adopted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsPatch {
    pub wpm: Option<u32>,
    pub variance: Option<u8>,
    pub mistake_rate: Option<u8>,
    pub thinking_pause: Option<bool>,
    pub self_correction: Option<bool>,
    pub paragraph_breaks: Option<usize>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        self.wpm.is_none()
            && self.variance.is_none()
            && self.mistake_rate.is_none()
            && self.thinking_pause.is_none()
            && self.self_correction.is_none()
            && self.paragraph_breaks.is_none()
    }

    pub fn merged(&self, base: &Settings) -> Settings {
        Settings {
            wpm: self.wpm.unwrap_or(base.wpm),
            variance: self.variance.unwrap_or(base.variance),
            mistake_rate: self.mistake_rate.unwrap_or(base.mistake_rate),
            thinking_pause: self.thinking_pause.unwrap_or(base.thinking_pause),
            self_correction: self.self_correction.unwrap_or(base.self_correction),
            paragraph_breaks: self.paragraph_breaks.unwrap_or(base.paragraph_breaks),
        }
    }
}
