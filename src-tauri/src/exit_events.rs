use std::sync::atomic::{AtomicBool, Ordering};

use tauri::ExitRequestApi;
use tokio::sync::mpsc::UnboundedSender;

use crate::{append_shutdown_log, LifecycleEvent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ExitRequestAction {
    Allow,
    Forward(LifecycleEvent),
}

/// Exit requests the controller did not issue are turned back into
/// lifecycle events; a `None` code means the last window went away.
pub(crate) fn decide_exit_request(exit_allowed: bool, code: Option<i32>) -> ExitRequestAction {
    if exit_allowed {
        return ExitRequestAction::Allow;
    }
    match code {
        None => ExitRequestAction::Forward(LifecycleEvent::AllWindowsClosed),
        Some(_) => ExitRequestAction::Forward(LifecycleEvent::QuitRequested),
    }
}

pub(crate) fn handle_exit_requested(
    api: &ExitRequestApi,
    code: Option<i32>,
    exit_allowed: &AtomicBool,
    events: &UnboundedSender<LifecycleEvent>,
) {
    match decide_exit_request(exit_allowed.load(Ordering::SeqCst), code) {
        ExitRequestAction::Allow => {
            append_shutdown_log(&format!("exit allowed (code {code:?})"));
        }
        ExitRequestAction::Forward(event) => {
            api.prevent_exit();
            append_shutdown_log(&format!(
                "exit requested (code {code:?}); deferring to lifecycle shutdown"
            ));
            if events.send(event).is_err() {
                append_shutdown_log("lifecycle controller is gone; nothing will stop the backend");
            }
        }
    }
}
