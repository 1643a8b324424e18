use std::{
    backtrace::Backtrace,
    panic::PanicHookInfo,
    sync::{Mutex, OnceLock},
    time::Duration,
};

use tokio::sync::mpsc::UnboundedSender;

use crate::{append_desktop_log, LifecycleEvent, DEFAULT_SHUTDOWN_TIMEOUT_MS};

static PANIC_EVENTS: OnceLock<Mutex<Option<UnboundedSender<LifecycleEvent>>>> = OnceLock::new();

pub(crate) fn describe_panic(info: &PanicHookInfo<'_>) -> String {
    let payload = info.payload();
    let message = payload
        .downcast_ref::<&str>()
        .map(|text| (*text).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());
    match info.location() {
        Some(location) => format!(
            "{message} at {}:{}:{}",
            location.file(),
            location.line(),
            location.column()
        ),
        None => message,
    }
}

/// Chains onto the previous hook. Installing again only swaps the target
/// channel.
pub(crate) fn install_panic_hook(events: UnboundedSender<LifecycleEvent>) {
    let slot = PANIC_EVENTS.get_or_init(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let description = describe_panic(info);
            append_desktop_log(&format!(
                "uncaught panic: {description}\n{}",
                Backtrace::force_capture()
            ));
            if let Some(slot) = PANIC_EVENTS.get() {
                if let Ok(guard) = slot.lock() {
                    if let Some(sender) = guard.as_ref() {
                        let _ = sender.send(LifecycleEvent::UncaughtFault(description));
                    }
                }
            }
            previous(info);
        }));
        Mutex::new(None)
    });
    if let Ok(mut guard) = slot.lock() {
        *guard = Some(events);
    }
}

pub(crate) fn spawn_signal_listener(events: UnboundedSender<LifecycleEvent>) {
    tokio::spawn(async move {
        loop {
            if let Err(error) = wait_for_interrupt().await {
                append_desktop_log(&format!("failed to listen for interrupt signals: {error}"));
                return;
            }
            append_desktop_log("interrupt signal received");
            if events.send(LifecycleEvent::Interrupt).is_err() {
                return;
            }
        }
    });
}

#[cfg(unix)]
async fn wait_for_interrupt() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result,
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn wait_for_interrupt() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

pub(crate) fn resolve_shutdown_timeout(raw: Option<&str>) -> Duration {
    let millis = raw
        .and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT_MS);
    Duration::from_millis(millis)
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;

    #[test]
    fn resolve_shutdown_timeout_falls_back_to_default() {
        let default = Duration::from_millis(DEFAULT_SHUTDOWN_TIMEOUT_MS);
        assert_eq!(resolve_shutdown_timeout(None), default);
        assert_eq!(resolve_shutdown_timeout(Some("-5")), default);
        assert_eq!(resolve_shutdown_timeout(Some("0")), default);
        assert_eq!(resolve_shutdown_timeout(Some("1200")), Duration::from_millis(1200));
    }

    #[test]
    fn panic_in_any_thread_becomes_an_uncaught_fault_event() {
        let (sender, mut receiver) = mpsc::unbounded_channel();
        install_panic_hook(sender);

        let joined = std::thread::spawn(|| panic!("renderer bridge exploded")).join();
        assert!(joined.is_err());

        // Panics from tests running in parallel may land on the same channel.
        let mut faults = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            if let LifecycleEvent::UncaughtFault(description) = event {
                faults.push(description);
            }
        }
        let description = faults
            .iter()
            .find(|description| description.contains("renderer bridge exploded"))
            .unwrap_or_else(|| panic!("no matching fault in {faults:?}"));
        assert!(description.contains("fault_watch.rs"), "{description}");
    }
}
