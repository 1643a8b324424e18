use std::{fmt, path::PathBuf};

use url::Url;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct StartupConfig {
    pub(crate) port: u16,
    pub(crate) settings_path: Option<PathBuf>,
    pub(crate) user_data_dir: Option<PathBuf>,
    pub(crate) verbose: bool,
    pub(crate) initial_flow_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Endpoint(Url);

impl Endpoint {
    pub(crate) fn parse(raw: &str) -> Result<Self, String> {
        let parsed = Url::parse(raw.trim()).map_err(|error| format!("Invalid endpoint: {error}"))?;
        match parsed.scheme() {
            "http" | "https" => Ok(Self(parsed)),
            scheme => Err(format!(
                "Unsupported endpoint scheme '{scheme}', only http/https are allowed."
            )),
        }
    }

    pub(crate) fn as_str(&self) -> &str {
        self.0.as_str()
    }

    #[cfg(any(feature = "desktop", test))]
    pub(crate) fn url(&self) -> &Url {
        &self.0
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LifecycleEvent {
    FirstRenderReady,
    // Neither the console nor the Tauri 2 webview reports hangs or
    // renderer/GPU crashes; the controller still maps them.
    #[cfg_attr(not(test), allow(dead_code))]
    Unresponsive,
    #[cfg_attr(not(test), allow(dead_code))]
    Responsive,
    #[cfg_attr(not(test), allow(dead_code))]
    ContentFault { killed: bool },
    #[cfg_attr(not(test), allow(dead_code))]
    GpuFault { killed: bool },
    #[cfg_attr(not(any(test, feature = "desktop")), allow(dead_code))]
    MainClosed,
    #[cfg_attr(not(any(test, feature = "desktop")), allow(dead_code))]
    AllWindowsClosed,
    #[cfg_attr(not(any(test, feature = "desktop")), allow(dead_code))]
    QuitRequested,
    UncaughtFault(String),
    Interrupt,
}
