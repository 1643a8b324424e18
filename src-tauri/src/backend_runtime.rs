use std::{
    env,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::{
    append_backend_log,
    backend_launch::{self, LaunchPlan},
    backend_readiness::{self, SharedChild},
    backend_settings::{self, ResolvedSettings},
    errors::BackendStartError,
    runtime_paths, DesktopError, Endpoint, StartupConfig, BACKEND_CMD_ENV, BACKEND_CWD_ENV,
    DEFAULT_STARTUP_TIMEOUT_MS, STARTUP_TIMEOUT_ENV,
};

pub(crate) type BackendStart = oneshot::Receiver<Result<Endpoint, DesktopError>>;

#[async_trait]
pub(crate) trait BackendService: Send {
    fn init(&mut self, config: &StartupConfig) -> Result<(), DesktopError>;

    /// Begins listening. The returned handle resolves at most once.
    fn start(&mut self) -> BackendStart;

    fn is_live(&self) -> bool;

    async fn stop(&mut self) -> Result<(), DesktopError>;
}

#[derive(Debug, Clone)]
struct PreparedBackend {
    settings: ResolvedSettings,
    plan: LaunchPlan,
}

#[derive(Debug)]
pub(crate) struct ProcessBackend {
    custom_cmd: Option<String>,
    custom_cwd: Option<PathBuf>,
    startup_timeout: Duration,
    prepared: Option<PreparedBackend>,
    child: SharedChild,
    stopping: Arc<AtomicBool>,
    started: bool,
}

pub(crate) fn resolve_startup_timeout(raw: Option<&str>) -> Duration {
    let millis = raw
        .and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_STARTUP_TIMEOUT_MS);
    Duration::from_millis(millis)
}

impl ProcessBackend {
    pub(crate) fn new(
        custom_cmd: Option<String>,
        custom_cwd: Option<PathBuf>,
        startup_timeout: Duration,
    ) -> Self {
        Self {
            custom_cmd,
            custom_cwd,
            startup_timeout,
            prepared: None,
            child: Arc::new(Mutex::new(None)),
            stopping: Arc::new(AtomicBool::new(false)),
            started: false,
        }
    }

    pub(crate) fn from_env() -> Self {
        let custom_cmd = env::var(BACKEND_CMD_ENV)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        let custom_cwd = env::var(BACKEND_CWD_ENV)
            .ok()
            .map(|value| PathBuf::from(value.trim()))
            .filter(|path| !path.as_os_str().is_empty());
        let startup_timeout = resolve_startup_timeout(env::var(STARTUP_TIMEOUT_ENV).ok().as_deref());
        Self::new(custom_cmd, custom_cwd, startup_timeout)
    }

    fn has_child(&self) -> bool {
        self.child.lock().map(|guard| guard.is_some()).unwrap_or(true)
    }
}

async fn launch_and_wait(
    prepared: PreparedBackend,
    child: SharedChild,
    stopping: Arc<AtomicBool>,
    startup_timeout: Duration,
) -> Result<Endpoint, DesktopError> {
    let settings = &prepared.settings;
    let port = backend_readiness::reserve_listen_port(&settings.ui_host, settings.ui_port, |port| {
        settings.listen_path(port)
    })?;
    let plan = prepared.plan.with_port(port);

    append_backend_log(&format!(
        "spawning backend: {:?} (cwd {})",
        backend_launch::build_debug_command(&plan),
        plan.cwd.display()
    ));
    let process = backend_launch::spawn_backend_process(&plan).map_err(BackendStartError::Other)?;
    {
        let mut guard = child
            .lock()
            .map_err(|_| BackendStartError::Other("Backend process lock poisoned.".to_string()))?;
        if stopping.load(Ordering::SeqCst) {
            // Dropped with kill_on_drop; stop() already ran and found no child.
            drop(process);
            return Err(BackendStartError::Abandoned.into());
        }
        *guard = Some(process);
    }

    backend_readiness::wait_for_backend(&child, &settings.ui_host, port, startup_timeout).await?;

    let listen_path = settings.listen_path(port);
    append_backend_log(&format!("backend now running at {listen_path}"));
    Endpoint::parse(&listen_path).map_err(|error| BackendStartError::Other(error).into())
}

#[async_trait]
impl BackendService for ProcessBackend {
    fn init(&mut self, config: &StartupConfig) -> Result<(), DesktopError> {
        let user_dir = runtime_paths::resolve_user_dir(config.user_data_dir.as_ref())
            .ok_or_else(|| {
                DesktopError::BackendInit(
                    "Cannot resolve a user directory; pass --userDir.".to_string(),
                )
            })?;
        append_backend_log(&format!("using user directory {}", user_dir.display()));

        let settings = backend_settings::prepare_backend_settings(config, &user_dir)?;
        append_backend_log(&format!(
            "settings file {} (effective {})",
            settings.settings_file.display(),
            settings.effective_file.display()
        ));

        let plan = backend_launch::build_launch_plan(
            self.custom_cmd.as_deref(),
            self.custom_cwd.clone(),
            config,
            &settings,
            &user_dir,
        )
        .map_err(DesktopError::BackendInit)?;

        self.prepared = Some(PreparedBackend { settings, plan });
        Ok(())
    }

    fn start(&mut self) -> BackendStart {
        let (sender, receiver) = oneshot::channel();

        let prepared = match (&self.prepared, self.started) {
            (_, true) => {
                let _ = sender.send(Err(BackendStartError::Other(
                    "Backend was already started.".to_string(),
                )
                .into()));
                return receiver;
            }
            (None, false) => {
                let _ = sender.send(Err(DesktopError::BackendInit(
                    "Backend must be initialized before it is started.".to_string(),
                )));
                return receiver;
            }
            (Some(prepared), false) => prepared.clone(),
        };
        self.started = true;

        let child = Arc::clone(&self.child);
        let stopping = Arc::clone(&self.stopping);
        let startup_timeout = self.startup_timeout;
        tokio::spawn(async move {
            let result = launch_and_wait(prepared, child, stopping, startup_timeout).await;
            if let Err(error) = &result {
                append_backend_log(&format!("backend failed to start: {error}"));
            }
            let _ = sender.send(result);
        });
        receiver
    }

    fn is_live(&self) -> bool {
        self.started || self.has_child()
    }

    async fn stop(&mut self) -> Result<(), DesktopError> {
        self.stopping.store(true, Ordering::SeqCst);
        let child = match self.child.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        };
        let Some(mut process) = child else {
            append_backend_log("stop requested with no backend process running");
            return Ok(());
        };

        append_backend_log("stopping backend process");
        backend_launch::stop_child_process(&mut process)
            .await
            .map_err(DesktopError::BackendStop)?;
        append_backend_log("backend process stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> ProcessBackend {
        ProcessBackend::new(None, None, Duration::from_secs(10))
    }

    #[test]
    fn resolve_startup_timeout_ignores_invalid_values() {
        assert_eq!(
            resolve_startup_timeout(None),
            Duration::from_millis(DEFAULT_STARTUP_TIMEOUT_MS)
        );
        assert_eq!(
            resolve_startup_timeout(Some("0")),
            Duration::from_millis(DEFAULT_STARTUP_TIMEOUT_MS)
        );
        assert_eq!(
            resolve_startup_timeout(Some("abc")),
            Duration::from_millis(DEFAULT_STARTUP_TIMEOUT_MS)
        );
        assert_eq!(resolve_startup_timeout(Some(" 2500 ")), Duration::from_millis(2500));
    }

    #[test]
    fn init_prepares_settings_without_starting_anything() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut backend = backend();
        let config = StartupConfig {
            user_data_dir: Some(dir.path().to_path_buf()),
            ..StartupConfig::default()
        };

        backend.init(&config).expect("init");
        assert!(dir.path().join("settings.json").is_file());
        assert!(dir.path().join(".desktop-settings.json").is_file());
        assert!(!backend.is_live());
    }

    #[test]
    fn init_reports_broken_settings_as_config_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = dir.path().join("broken.json");
        std::fs::write(&settings, "module.exports = {}").expect("write");
        let config = StartupConfig {
            user_data_dir: Some(dir.path().to_path_buf()),
            settings_path: Some(settings),
            ..StartupConfig::default()
        };

        let error = backend().init(&config).expect_err("broken settings");
        assert!(matches!(error, DesktopError::Config { .. }));
    }

    #[test]
    fn init_rejects_invalid_custom_command() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut backend = ProcessBackend::new(
            Some("node-red 'unterminated".to_string()),
            None,
            Duration::from_secs(1),
        );
        let config = StartupConfig {
            user_data_dir: Some(dir.path().to_path_buf()),
            ..StartupConfig::default()
        };

        assert!(matches!(
            backend.init(&config),
            Err(DesktopError::BackendInit(_))
        ));
    }

    #[tokio::test]
    async fn start_before_init_resolves_with_an_error() {
        let mut backend = backend();
        let result = backend.start().await.expect("resolved");
        assert!(matches!(result, Err(DesktopError::BackendInit(_))));
        assert!(!backend.is_live());
    }

    #[tokio::test]
    async fn stop_without_a_process_settles_immediately() {
        let mut backend = backend();
        backend.stop().await.expect("stop");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn start_reports_a_runtime_that_exits_early() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut backend = ProcessBackend::new(
            Some("sh -c 'exit 3'".to_string()),
            None,
            Duration::from_secs(10),
        );
        std::fs::write(dir.path().join("settings.json"), "{\"uiPort\": 0}").expect("write");
        let config = StartupConfig {
            user_data_dir: Some(dir.path().to_path_buf()),
            ..StartupConfig::default()
        };
        backend.init(&config).expect("init");

        let result = backend.start().await.expect("resolved");
        match result {
            Err(DesktopError::BackendStart(BackendStartError::ExitedEarly { status })) => {
                assert!(status.contains('3'), "{status}");
            }
            other => panic!("unexpected start result: {other:?}"),
        }
        assert!(backend.is_live());

        let second = backend.start().await.expect("resolved");
        assert!(second.is_err());
        backend.stop().await.expect("stop");
    }
}
