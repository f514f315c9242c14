pub mod buffer;
pub mod console;

pub use buffer::BufferSink;
pub use console::ConsoleSink;

use std::io::IsTerminal;

use crate::error::{Result, TypistError};

/// Where typed characters land. A session takes exclusive ownership of its
/// sink for its whole lifetime; every call is side-effecting and a failure
/// of any call is fatal to the session.
pub trait TextSink: Send + Sync {
    /// Human-readable target description for logs and errors.
    fn describe(&self) -> &'static str;

    /// Whether the target accepts text at all. Checked once at start.
    fn accepts_text(&self) -> bool {
        true
    }

    fn emit_char(&mut self, c: char) -> Result<()>;

    fn delete_last_char(&mut self) -> Result<()>;

    fn clear(&mut self) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkTarget {
    Auto,
    Console,
    Buffer,
}

fn output_environment_message() -> String {
    let mut parts = Vec::new();
    if std::io::stdout().is_terminal() {
        parts.push("stdout is a terminal");
    } else {
        parts.push("stdout is redirected");
    }
    if std::io::stderr().is_terminal() {
        parts.push("stderr is a terminal");
    }
    format!("Detected output: {}", parts.join(", "))
}

/// Resolves a target into a live sink. `Auto` requires a terminal on stdout;
/// an explicit target is honored as requested.
pub fn resolve_sink(target: SinkTarget) -> Result<Box<dyn TextSink>> {
    match target {
        SinkTarget::Auto => {
            if std::io::stdout().is_terminal() {
                Ok(Box::new(ConsoleSink::new()))
            } else {
                Err(TypistError::no_target(format!(
                    "no terminal detected for typing output. {} \
                     Pass --target console to type into the redirected stream anyway, \
                     or --target buffer for a silent run.",
                    output_environment_message()
                )))
            }
        }
        SinkTarget::Console => Ok(Box::new(ConsoleSink::new())),
        SinkTarget::Buffer => Ok(Box::new(BufferSink::new())),
    }
}
