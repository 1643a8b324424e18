use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub(crate) enum DesktopError {
    #[error("Error loading settings file {path}: {details}")]
    Config { path: PathBuf, details: String },

    #[error("Error while initializing Node-RED: {0}")]
    BackendInit(String),

    #[error("Error while starting Node-RED: {0}")]
    BackendStart(#[from] BackendStartError),

    #[error("Error while stopping Node-RED: {0}")]
    BackendStop(String),

    #[error("Surface fault: {0}")]
    SurfaceFault(String),

    #[error("Uncaught fault: {0}")]
    ProcessFault(String),

    #[error("IO error while {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub(crate) enum BackendStartError {
    #[error("unable to listen on {listen_path}: port already in use")]
    PortInUse { listen_path: String },

    #[error("backend process exited before becoming reachable: {status}")]
    ExitedEarly { status: String },

    #[error("timed out after {timeout_ms}ms waiting for backend startup")]
    Timeout { timeout_ms: u128 },

    #[error("backend start was abandoned before reporting a result")]
    Abandoned,

    #[error("{0}")]
    Other(String),
}

impl DesktopError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        DesktopError::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn dialog_title(&self) -> &'static str {
        match self {
            DesktopError::Config { .. } => "Error loading settings",
            DesktopError::BackendInit(_) | DesktopError::Io { .. } => "Failed to initialize",
            DesktopError::BackendStart(_) => "Failed to start",
            DesktopError::BackendStop(_) => "Failed to stop",
            DesktopError::SurfaceFault(_) | DesktopError::ProcessFault(_) => "Unexpected error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_errors_convert_and_keep_their_detail() {
        let error: DesktopError = BackendStartError::PortInUse {
            listen_path: "http://127.0.0.1:1880/".to_string(),
        }
        .into();
        assert_eq!(
            error.to_string(),
            "Error while starting Node-RED: unable to listen on http://127.0.0.1:1880/: port already in use"
        );
        assert_eq!(error.dialog_title(), "Failed to start");
    }

    #[test]
    fn config_errors_name_the_settings_file() {
        let error = DesktopError::Config {
            path: PathBuf::from("/tmp/settings.json"),
            details: "expected value".to_string(),
        };
        assert!(error.to_string().contains("/tmp/settings.json"));
        assert_eq!(error.dialog_title(), "Error loading settings");
    }
}
