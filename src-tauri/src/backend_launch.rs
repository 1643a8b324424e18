use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
    process::Stdio,
};

use tokio::process::{Child, Command};

use crate::{
    backend_settings::ResolvedSettings, StartupConfig, BACKEND_CMD_ENV, BACKEND_LOG_FILE,
    DEFAULT_BACKEND_CMD, LOG_DIR_NAME, WINDOWS_BACKEND_SHIM,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LaunchPlan {
    pub(crate) cmd: String,
    pub(crate) args: Vec<String>,
    pub(crate) cwd: PathBuf,
    pub(crate) log_path: PathBuf,
}

impl LaunchPlan {
    pub(crate) fn with_port(&self, port: u16) -> LaunchPlan {
        let mut plan = self.clone();
        let mut args = plan.args.iter();
        let mut rewritten = Vec::with_capacity(plan.args.len());
        while let Some(arg) = args.next() {
            rewritten.push(arg.clone());
            if arg == "--port" {
                args.next();
                rewritten.push(port.to_string());
            }
        }
        plan.args = rewritten;
        plan
    }
}

pub(crate) fn split_backend_command(raw: &str) -> Result<(String, Vec<String>), String> {
    let mut pieces =
        shlex::split(raw).ok_or_else(|| format!("Invalid {BACKEND_CMD_ENV}: {raw}"))?;
    if pieces.is_empty() {
        return Err(format!("{BACKEND_CMD_ENV} is empty."));
    }
    let cmd = pieces.remove(0);
    Ok((cmd, pieces))
}

fn default_backend_command(windows: bool) -> (String, Vec<String>) {
    if windows {
        // npm installs a .cmd shim there; CreateProcess only resolves .exe.
        return (
            "cmd".to_string(),
            vec!["/C".to_string(), WINDOWS_BACKEND_SHIM.to_string()],
        );
    }
    (DEFAULT_BACKEND_CMD.to_string(), Vec::new())
}

pub(crate) fn build_launch_plan(
    custom_cmd: Option<&str>,
    custom_cwd: Option<PathBuf>,
    config: &StartupConfig,
    settings: &ResolvedSettings,
    user_dir: &Path,
) -> Result<LaunchPlan, String> {
    build_launch_plan_for(
        cfg!(target_os = "windows"),
        custom_cmd,
        custom_cwd,
        config,
        settings,
        user_dir,
    )
}

fn build_launch_plan_for(
    windows: bool,
    custom_cmd: Option<&str>,
    custom_cwd: Option<PathBuf>,
    config: &StartupConfig,
    settings: &ResolvedSettings,
    user_dir: &Path,
) -> Result<LaunchPlan, String> {
    let (cmd, mut args) = match custom_cmd {
        Some(raw) => split_backend_command(raw)?,
        None => default_backend_command(windows),
    };

    args.push("--settings".to_string());
    args.push(settings.effective_file.to_string_lossy().to_string());
    args.push("--userDir".to_string());
    args.push(user_dir.to_string_lossy().to_string());
    args.push("--port".to_string());
    args.push(settings.ui_port.to_string());
    if config.verbose {
        args.push("--verbose".to_string());
    }
    if let Some(flow_file) = &config.initial_flow_file {
        args.push(flow_file.to_string_lossy().to_string());
    }

    Ok(LaunchPlan {
        cmd,
        args,
        cwd: custom_cwd.unwrap_or_else(|| user_dir.to_path_buf()),
        log_path: user_dir.join(LOG_DIR_NAME).join(BACKEND_LOG_FILE),
    })
}

pub(crate) fn build_debug_command(plan: &LaunchPlan) -> Vec<String> {
    let mut parts = vec![plan.cmd.clone()];
    parts.extend(plan.args.clone());
    parts
}

pub(crate) fn spawn_backend_process(plan: &LaunchPlan) -> Result<Child, String> {
    if !plan.cwd.exists() {
        fs::create_dir_all(&plan.cwd).map_err(|error| {
            format!(
                "Failed to create backend cwd {}: {}",
                plan.cwd.display(),
                error
            )
        })?;
    }

    let mut command = Command::new(&plan.cmd);
    command
        .args(&plan.args)
        .current_dir(&plan.cwd)
        .stdin(Stdio::null())
        .kill_on_drop(true);

    if let Some(log_parent) = plan.log_path.parent() {
        fs::create_dir_all(log_parent).map_err(|error| {
            format!(
                "Failed to create backend log directory {}: {}",
                log_parent.display(),
                error
            )
        })?;
    }
    let stdout_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&plan.log_path)
        .map_err(|error| {
            format!(
                "Failed to open backend log {}: {}",
                plan.log_path.display(),
                error
            )
        })?;
    let stderr_file = stdout_file
        .try_clone()
        .map_err(|error| format!("Failed to clone backend log handle: {error}"))?;
    command.stdout(Stdio::from(stdout_file));
    command.stderr(Stdio::from(stderr_file));

    command.spawn().map_err(|error| {
        format!(
            "Failed to spawn backend process with command {:?}: {}",
            build_debug_command(plan),
            error
        )
    })
}

pub(crate) async fn stop_child_process(child: &mut Child) -> Result<(), String> {
    #[cfg(target_os = "windows")]
    {
        if let Some(pid) = child.id() {
            let _ = Command::new("taskkill")
                .args(["/pid", &pid.to_string(), "/t", "/f"])
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .stdin(Stdio::null())
                .status()
                .await;
        }
    }

    if let Err(error) = child.start_kill() {
        // Already reaped children report InvalidInput; nothing left to kill.
        if error.kind() != std::io::ErrorKind::InvalidInput {
            return Err(format!("Failed to kill backend process: {error}"));
        }
    }
    child
        .wait()
        .await
        .map(|_| ())
        .map_err(|error| format!("Failed to wait for backend process: {error}"))
}
