use std::io::{self, Write};

use crate::error::{Result, TypistError};
use crate::sink::TextSink;

/// Types into the terminal on stdout, flushing after every keystroke so the
/// pacing is visible. Deletions erase in place; they never have to cross a
/// line boundary because line breaks are never the target of a correction.
pub struct ConsoleSink {
    out: io::Stdout,
    lines_emitted: usize,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self {
            out: io::stdout(),
            lines_emitted: 0,
        }
    }

    fn write_all(&mut self, op: &'static str, bytes: &[u8]) -> Result<()> {
        self.out
            .write_all(bytes)
            .and_then(|()| self.out.flush())
            .map_err(|e| TypistError::sink_operation(op, e))
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl TextSink for ConsoleSink {
    fn describe(&self) -> &'static str {
        "console"
    }

    fn emit_char(&mut self, c: char) -> Result<()> {
        if c == '\n' {
            self.lines_emitted += 1;
        }
        let mut buf = [0u8; 4];
        let encoded = c.encode_utf8(&mut buf).as_bytes();
        self.write_all("emit_char", encoded)
    }

    fn delete_last_char(&mut self) -> Result<()> {
        self.write_all("delete_last_char", b"\x08 \x08")
    }

    fn clear(&mut self) -> Result<()> {
        // Erase the current line, then every line emitted since the last
        // clear, leaving the cursor at the start of the cleared region.
        let mut seq = String::from("\r\x1b[2K");
        for _ in 0..self.lines_emitted {
            seq.push_str("\x1b[1A\x1b[2K");
        }
        seq.push('\r');
        self.lines_emitted = 0;
        let bytes = seq.into_bytes();
        self.write_all("clear", &bytes)
    }
}
