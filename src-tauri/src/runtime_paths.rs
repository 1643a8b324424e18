use std::{env, path::PathBuf};

use crate::{WINDOWS_USER_DIR_NAME, XDG_USER_DIR_NAME};

fn non_empty(value: Option<String>) -> Option<PathBuf> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
        .map(PathBuf::from)
}

pub(crate) fn resolve_default_user_dir_with<F>(
    windows: bool,
    lookup: F,
    home_dir: Option<PathBuf>,
) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    if windows {
        let base = non_empty(lookup("LOCALAPPDATA"))
            .or_else(|| non_empty(lookup("APPDATA")))
            .or_else(|| {
                let drive = lookup("HOMEDRIVE").unwrap_or_default();
                let path = lookup("HOMEPATH").unwrap_or_default();
                non_empty(Some(format!("{drive}{path}")))
            })
            .or(home_dir)?;
        return Some(base.join(WINDOWS_USER_DIR_NAME));
    }

    let base = non_empty(lookup("XDG_CONFIG_HOME"))
        .or_else(|| home_dir.map(|home| home.join(".config")))?;
    Some(base.join(XDG_USER_DIR_NAME))
}

pub(crate) fn default_user_dir() -> Option<PathBuf> {
    resolve_default_user_dir_with(
        cfg!(target_os = "windows"),
        |key| env::var(key).ok(),
        home::home_dir(),
    )
}

pub(crate) fn resolve_user_dir(explicit: Option<&PathBuf>) -> Option<PathBuf> {
    explicit.cloned().or_else(default_user_dir)
}
