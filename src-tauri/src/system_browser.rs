use std::process::{Command, Stdio};

use crate::Endpoint;

fn browser_command(url: &str) -> Option<(&'static str, Vec<String>)> {
    if cfg!(target_os = "macos") {
        Some(("open", vec![url.to_string()]))
    } else if cfg!(target_os = "windows") {
        Some((
            "rundll32",
            vec!["url.dll,FileProtocolHandler".to_string(), url.to_string()],
        ))
    } else if cfg!(unix) {
        Some(("xdg-open", vec![url.to_string()]))
    } else {
        None
    }
}

pub(crate) fn open_endpoint(endpoint: &Endpoint) -> Result<(), String> {
    let (program, args) = browser_command(endpoint.as_str())
        .ok_or_else(|| "No system browser launcher on this platform.".to_string())?;
    Command::new(program)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(|_| ())
        .map_err(|error| format!("Failed to run '{program}' for {endpoint}: {error}"))
}
