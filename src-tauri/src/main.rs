#![cfg_attr(
    all(feature = "desktop", not(debug_assertions)),
    windows_subsystem = "windows"
)]

mod app_constants;
mod app_runtime;
mod app_types;
mod backend_launch;
mod backend_readiness;
mod backend_runtime;
mod backend_settings;
mod console_surfaces;
#[cfg(feature = "desktop")]
mod desktop_surfaces;
mod errors;
#[cfg(feature = "desktop")]
mod exit_events;
mod exit_state;
mod fault_watch;
mod lifecycle;
mod logging;
mod runtime_paths;
mod startup_args;
mod surfaces;
mod system_browser;

pub(crate) use app_constants::*;
pub(crate) use app_types::{Endpoint, LifecycleEvent, StartupConfig};
pub(crate) use errors::DesktopError;
pub(crate) use exit_state::{ExitReason, LifecycleState};
pub(crate) use logging::{
    append_backend_log, append_desktop_log, append_lifecycle_log, append_shutdown_log,
    append_startup_log,
};

fn main() {
    let config = startup_args::parse_startup_config();
    let code = app_runtime::run(config);
    std::process::exit(code);
}
