pub(crate) const APP_DISPLAY_NAME: &str = "Node-RED";
pub(crate) const WINDOWS_USER_DIR_NAME: &str = "Node-RED Desktop";
pub(crate) const XDG_USER_DIR_NAME: &str = "node-red-desktop";

pub(crate) const DESKTOP_LOG_FILE: &str = "desktop.log";
pub(crate) const BACKEND_LOG_FILE: &str = "backend.log";
pub(crate) const LOG_DIR_NAME: &str = "logs";
pub(crate) const DESKTOP_LOG_MAX_BYTES: u64 = 5 * 1024 * 1024;

pub(crate) const USER_SETTINGS_FILE: &str = "settings.json";
pub(crate) const EFFECTIVE_SETTINGS_FILE: &str = ".desktop-settings.json";
pub(crate) const DEFAULT_UI_HOST: &str = "127.0.0.1";

pub(crate) const DEFAULT_BACKEND_CMD: &str = "node-red";
pub(crate) const WINDOWS_BACKEND_SHIM: &str = "node-red.cmd";
pub(crate) const BACKEND_CMD_ENV: &str = "NODE_RED_DESKTOP_BACKEND_CMD";
pub(crate) const BACKEND_CWD_ENV: &str = "NODE_RED_DESKTOP_BACKEND_CWD";
pub(crate) const STARTUP_TIMEOUT_ENV: &str = "NODE_RED_DESKTOP_STARTUP_TIMEOUT_MS";
pub(crate) const SHUTDOWN_TIMEOUT_ENV: &str = "NODE_RED_DESKTOP_SHUTDOWN_TIMEOUT_MS";
pub(crate) const HEADLESS_ENV: &str = "NODE_RED_DESKTOP_HEADLESS";
pub(crate) const OPEN_BROWSER_ENV: &str = "NODE_RED_DESKTOP_OPEN_BROWSER";

pub(crate) const DEFAULT_STARTUP_TIMEOUT_MS: u64 = 60_000;
pub(crate) const DEFAULT_SHUTDOWN_TIMEOUT_MS: u64 = 5_000;
pub(crate) const BACKEND_PING_TIMEOUT_MS: u64 = 800;
pub(crate) const BACKEND_POLL_INTERVAL_MS: u64 = 600;

pub(crate) const STATUS_LOADING: &str = "Loading...";
pub(crate) const STATUS_INITIALIZING: &str = "Initializing Node-RED...";
pub(crate) const STATUS_CREATING_MAIN: &str = "Creating main window...";
pub(crate) const STATUS_STARTING_ENGINE: &str = "Starting Node-RED engine...";

#[cfg(feature = "desktop")]
pub(crate) const SPLASH_WINDOW_LABEL: &str = "splash";
#[cfg(feature = "desktop")]
pub(crate) const MAIN_WINDOW_LABEL: &str = "main";
