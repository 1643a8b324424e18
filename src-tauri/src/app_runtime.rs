use std::{env, time::Duration};

use tokio::{sync::mpsc, task::JoinHandle};

use crate::{
    append_desktop_log, append_lifecycle_log, append_startup_log,
    backend_runtime::ProcessBackend,
    console_surfaces::{ConsoleExit, ConsoleSurfaces},
    exit_state::EXIT_CODE_FAULT,
    fault_watch,
    lifecycle::LifecycleController,
    logging, runtime_paths, DesktopError, StartupConfig, HEADLESS_ENV, OPEN_BROWSER_ENV,
    SHUTDOWN_TIMEOUT_ENV,
};

pub(crate) fn flag_enabled(raw: Option<&str>) -> bool {
    matches!(
        raw.map(|value| value.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}

fn env_flag(name: &str) -> bool {
    flag_enabled(env::var(name).ok().as_deref())
}

pub(crate) fn shutdown_timeout_from_env() -> Duration {
    fault_watch::resolve_shutdown_timeout(env::var(SHUTDOWN_TIMEOUT_ENV).ok().as_deref())
}

pub(crate) async fn await_controller(handle: JoinHandle<i32>) -> i32 {
    match handle.await {
        Ok(code) => code,
        Err(error) => {
            let fault =
                DesktopError::ProcessFault(format!("lifecycle controller aborted: {error}"));
            append_desktop_log(&format!("{}: {fault}", fault.dialog_title()));
            EXIT_CODE_FAULT
        }
    }
}

pub(crate) fn run(config: StartupConfig) -> i32 {
    let user_dir = runtime_paths::resolve_user_dir(config.user_data_dir.as_ref());
    let log_path = logging::init_desktop_logging(user_dir.as_deref(), config.verbose);
    append_startup_log("desktop process starting");
    append_startup_log(&format!("desktop log path: {}", log_path.display()));

    let headless = !cfg!(feature = "desktop") || env_flag(HEADLESS_ENV);
    if !headless {
        #[cfg(feature = "desktop")]
        return crate::desktop_surfaces::run_desktop(config);
    }

    append_startup_log("no window toolkit in use; running console shell");
    run_console(config)
}

fn run_console(config: StartupConfig) -> i32 {
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(error) => {
            let fault = DesktopError::io("building the async runtime", error);
            append_desktop_log(&format!("{}: {fault}", fault.dialog_title()));
            eprintln!("{fault}");
            return EXIT_CODE_FAULT;
        }
    };

    runtime.block_on(async move {
        let (sender, receiver) = mpsc::unbounded_channel();
        fault_watch::install_panic_hook(sender.clone());
        fault_watch::spawn_signal_listener(sender.clone());

        let controller = LifecycleController::new(
            ProcessBackend::from_env(),
            ConsoleSurfaces::new(sender, env_flag(OPEN_BROWSER_ENV)),
            ConsoleExit,
            shutdown_timeout_from_env(),
            append_lifecycle_log,
        );
        await_controller(tokio::spawn(controller.run(config, receiver))).await
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_enabled_accepts_common_truthy_values() {
        assert!(flag_enabled(Some("1")));
        assert!(flag_enabled(Some(" TRUE ")));
        assert!(flag_enabled(Some("on")));
        assert!(!flag_enabled(Some("0")));
        assert!(!flag_enabled(Some("")));
        assert!(!flag_enabled(None));
    }

    #[tokio::test]
    async fn await_controller_passes_the_exit_code_through() {
        assert_eq!(await_controller(tokio::spawn(async { 0 })).await, 0);
    }

    #[tokio::test]
    async fn await_controller_maps_a_panicked_task_to_fault() {
        let handle = tokio::spawn(async {
            if flag_enabled(Some("1")) {
                panic!("controller blew up");
            }
            0
        });
        assert_eq!(await_controller(handle).await, EXIT_CODE_FAULT);
    }
}
