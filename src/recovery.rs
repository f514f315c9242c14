use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::events::{EventSender, SessionEvent};
use crate::session::SessionHandle;

/// Focus state of the typing target, fed by an external observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusSignal {
    Focused,
    Lost,
}

pub type FocusSender = watch::Sender<FocusSignal>;
pub type FocusReceiver = watch::Receiver<FocusSignal>;

/// New focus channel, initially focused.
pub fn focus_channel() -> (FocusSender, FocusReceiver) {
    watch::channel(FocusSignal::Focused)
}

/// Watches the focus signal for the active session. A focus loss while
/// typing forces a pause and publishes a recovery event; a loss while
/// already paused is ignored. The watch never resumes the session on its
/// own. Ends when the signal source closes or the session terminates.
pub(crate) fn spawn_focus_watch(
    handle: SessionHandle,
    mut signals: FocusReceiver,
    events: EventSender,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while signals.changed().await.is_ok() {
            let signal = *signals.borrow_and_update();
            if signal == FocusSignal::Lost {
                if let Some(snapshot) = handle.interrupt() {
                    warn!(
                        cursor = snapshot.cursor_position,
                        "focus lost, pausing until an explicit resume"
                    );
                    let _ = events.send(SessionEvent::RecoveryRequired { snapshot });
                } else {
                    debug!("focus lost while not typing, ignored");
                }
            }
            if handle.status().is_terminal() {
                break;
            }
        }
    })
}
