use std::{
    fs,
    path::{Path, PathBuf},
};

use serde_json::{Map, Value};

use crate::{
    DesktopError, StartupConfig, DEFAULT_UI_HOST, EFFECTIVE_SETTINGS_FILE, USER_SETTINGS_FILE,
};

const DEFAULT_SETTINGS: &str = include_str!("../resources/default-settings.json");

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResolvedSettings {
    pub(crate) settings_file: PathBuf,
    pub(crate) effective_file: PathBuf,
    pub(crate) ui_host: String,
    pub(crate) ui_port: u16,
    pub(crate) admin_root: String,
}

impl ResolvedSettings {
    pub(crate) fn listen_path(&self, port: u16) -> String {
        listen_path(&self.ui_host, port, &self.admin_root)
    }
}

pub(crate) fn format_root(root: &str) -> String {
    let mut formatted = String::with_capacity(root.len() + 2);
    if !root.starts_with('/') {
        formatted.push('/');
    }
    formatted.push_str(root);
    if !formatted.ends_with('/') {
        formatted.push('/');
    }
    formatted
}

pub(crate) fn listen_path(host: &str, port: u16, admin_root: &str) -> String {
    let host = if host == "0.0.0.0" { "127.0.0.1" } else { host };
    format!("http://{host}:{port}{}", format_root(admin_root))
}

pub(crate) fn resolve_settings_file(
    config: &StartupConfig,
    user_dir: &Path,
) -> Result<PathBuf, DesktopError> {
    if let Some(path) = &config.settings_path {
        return Ok(path.clone());
    }

    let user_settings_file = user_dir.join(USER_SETTINGS_FILE);
    if !user_settings_file.exists() {
        fs::create_dir_all(user_dir).map_err(|error| {
            DesktopError::io(
                format!("creating user directory {}", user_dir.display()),
                error,
            )
        })?;
        fs::write(&user_settings_file, DEFAULT_SETTINGS).map_err(|error| {
            DesktopError::io(
                format!(
                    "copying default settings to {}",
                    user_settings_file.display()
                ),
                error,
            )
        })?;
        crate::append_startup_log(&format!(
            "copied default settings to {}",
            user_settings_file.display()
        ));
    }
    Ok(user_settings_file)
}

pub(crate) fn load_settings(path: &Path) -> Result<Map<String, Value>, DesktopError> {
    let config_error = |details: String| DesktopError::Config {
        path: path.to_path_buf(),
        details,
    };

    let raw = fs::read_to_string(path).map_err(|error| config_error(error.to_string()))?;
    match serde_json::from_str::<Value>(&raw).map_err(|error| config_error(error.to_string()))? {
        Value::Object(map) => Ok(map),
        other => Err(config_error(format!(
            "expected a JSON object at the root, found {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn non_empty_str<'a>(settings: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    settings
        .get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(number)) => number.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(text)) => !text.is_empty(),
        Some(_) => true,
    }
}

fn configured_port(settings: &Map<String, Value>) -> Option<u16> {
    match settings.get("uiPort")? {
        Value::Number(number) => number.as_u64().and_then(|port| u16::try_from(port).ok()),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn apply_desktop_overrides(
    settings: &mut Map<String, Value>,
    config: &StartupConfig,
    user_dir: &Path,
) {
    if config.verbose {
        settings.insert("verbose".to_string(), Value::Bool(true));
    }

    settings.insert("httpAdminRoot".to_string(), Value::String("/".to_string()));
    settings.insert("disableEditor".to_string(), Value::Bool(false));
    settings.remove("httpAdminAuth");

    if settings.get("httpNodeRoot") != Some(&Value::Bool(false)) {
        let node_root = non_empty_str(settings, "httpNodeRoot")
            .or_else(|| non_empty_str(settings, "httpRoot"))
            .unwrap_or("/");
        let node_root = format_root(node_root);
        settings.insert("httpNodeRoot".to_string(), Value::String(node_root));

        if !is_truthy(settings.get("httpNodeAuth")) {
            if let Some(auth) = settings.get("httpAuth").cloned() {
                settings.insert("httpNodeAuth".to_string(), auth);
            }
        }
    }

    let port = if config.port != 0 {
        config.port
    } else {
        configured_port(settings).unwrap_or(0)
    };
    settings.insert("uiPort".to_string(), Value::from(port));

    if non_empty_str(settings, "uiHost").is_none() {
        settings.insert(
            "uiHost".to_string(),
            Value::String(DEFAULT_UI_HOST.to_string()),
        );
    }

    if let Some(flow_file) = &config.initial_flow_file {
        settings.insert(
            "flowFile".to_string(),
            Value::String(flow_file.to_string_lossy().to_string()),
        );
    }
    settings.insert(
        "userDir".to_string(),
        Value::String(user_dir.to_string_lossy().to_string()),
    );
}

pub(crate) fn write_effective_settings(
    settings: &Map<String, Value>,
    user_dir: &Path,
) -> Result<PathBuf, DesktopError> {
    let path = user_dir.join(EFFECTIVE_SETTINGS_FILE);
    let serialized = serde_json::to_string_pretty(settings).map_err(|error| {
        DesktopError::BackendInit(format!("Failed to serialize settings: {error}"))
    })?;
    fs::write(&path, serialized).map_err(|error| {
        DesktopError::io(format!("writing settings {}", path.display()), error)
    })?;
    Ok(path)
}

pub(crate) fn prepare_backend_settings(
    config: &StartupConfig,
    user_dir: &Path,
) -> Result<ResolvedSettings, DesktopError> {
    let settings_file = resolve_settings_file(config, user_dir)?;
    let mut settings = load_settings(&settings_file)?;
    settings.insert(
        "settingsFile".to_string(),
        Value::String(settings_file.to_string_lossy().to_string()),
    );
    apply_desktop_overrides(&mut settings, config, user_dir);

    let ui_host = non_empty_str(&settings, "uiHost")
        .unwrap_or(DEFAULT_UI_HOST)
        .to_string();
    let ui_port = configured_port(&settings).unwrap_or(0);
    let admin_root = non_empty_str(&settings, "httpAdminRoot")
        .unwrap_or("/")
        .to_string();
    let effective_file = write_effective_settings(&settings, user_dir)?;

    Ok(ResolvedSettings {
        settings_file,
        effective_file,
        ui_host,
        ui_port,
        admin_root,
    })
}
