use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::Result;
use crate::sink::TextSink;

/// In-memory sink over a shared character buffer. Clones observe the same
/// storage, so a caller can keep one clone for inspection after moving the
/// other into a session.
#[derive(Debug, Clone)]
pub struct BufferSink {
    shared: Arc<Mutex<Vec<char>>>,
    typable: bool,
}

impl BufferSink {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(Vec::new())),
            typable: true,
        }
    }

    /// A buffer that refuses text, for exercising start-time rejection.
    pub fn read_only() -> Self {
        Self {
            typable: false,
            ..Self::new()
        }
    }

    fn buf(&self) -> MutexGuard<'_, Vec<char>> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn contents(&self) -> String {
        self.buf().iter().collect()
    }

    pub fn len(&self) -> usize {
        self.buf().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf().is_empty()
    }
}

impl Default for BufferSink {
    fn default() -> Self {
        Self::new()
    }
}

impl TextSink for BufferSink {
    fn describe(&self) -> &'static str {
        "buffer"
    }

    fn accepts_text(&self) -> bool {
        self.typable
    }

    fn emit_char(&mut self, c: char) -> Result<()> {
        self.buf().push(c);
        Ok(())
    }

    fn delete_last_char(&mut self) -> Result<()> {
        self.buf().pop();
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.buf().clear();
        Ok(())
    }
}
