use tokio::sync::{mpsc, oneshot};

/// Splits on blank-line boundaries, dropping paragraphs that are empty
/// after trimming.
pub fn split_paragraphs(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let len = bytes.len();
    let mut paragraphs = Vec::new();
    let mut idx = 0usize;

    while idx < len {
        while idx < len && bytes[idx] == b'\n' {
            idx += 1;
        }
        if idx >= len {
            break;
        }

        let start = idx;
        while idx < len {
            if bytes[idx] == b'\n' && idx + 1 < len && bytes[idx + 1] == b'\n' {
                break;
            }
            idx += 1;
        }
        let end = idx;
        let paragraph = &text[start..end];
        if !paragraph.trim().is_empty() {
            paragraphs.push(paragraph);
        }

        while idx < len && bytes[idx] == b'\n' {
            idx += 1;
        }
    }

    paragraphs
}

pub fn count_paragraphs(text: &str) -> usize {
    split_paragraphs(text).len()
}

/// True when the character at `i` starts a two-line-break paragraph boundary.
pub fn is_boundary(chars: &[char], i: usize) -> bool {
    chars.get(i) == Some(&'\n') && chars.get(i + 1) == Some(&'\n')
}

/// A continuation-approval request raised at a configured paragraph boundary.
/// The session blocks until `respond` is called; dropping the request without
/// responding counts as a decline.
#[derive(Debug)]
pub struct BreakRequest {
    pub current_paragraph: usize,
    pub total_paragraphs: usize,
    pub percentage: u8,
    reply: oneshot::Sender<bool>,
}

impl BreakRequest {
    pub(crate) fn new(
        current_paragraph: usize,
        total_paragraphs: usize,
        percentage: u8,
    ) -> (Self, oneshot::Receiver<bool>) {
        let (reply, rx) = oneshot::channel();
        (
            Self {
                current_paragraph,
                total_paragraphs,
                percentage,
                reply,
            },
            rx,
        )
    }

    pub fn respond(self, continue_typing: bool) {
        let _ = self.reply.send(continue_typing);
    }

    pub fn approve(self) {
        self.respond(true);
    }

    pub fn decline(self) {
        self.respond(false);
    }
}

pub type BreakSender = mpsc::Sender<BreakRequest>;
pub type BreakReceiver = mpsc::Receiver<BreakRequest>;

/// One-slot channel: at most one break request is outstanding at a time.
pub fn break_channel() -> (BreakSender, BreakReceiver) {
    mpsc::channel(1)
}
