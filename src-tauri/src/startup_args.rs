use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::StartupConfig;

#[derive(Parser, Debug)]
#[command(name = "node-red-desktop")]
#[command(about = "Node-RED desktop shell")]
#[command(version, disable_help_flag = true)]
struct Cli {
    /// Print this help and exit
    #[arg(short = '?', short_alias = 't', long = "help", action = ArgAction::Help)]
    help: Option<bool>,

    /// Port to listen on (0 picks a free port)
    #[arg(short = 'p', long = "port", default_value_t = 0)]
    port: u16,

    /// Settings file to use instead of <userDir>/settings.json
    #[arg(short = 's', long = "settings", value_name = "FILE")]
    settings: Option<PathBuf>,

    /// User data directory
    #[arg(short = 'u', long = "userDir", value_name = "DIR")]
    user_dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Flow file to open
    #[arg(value_name = "FLOW_FILE")]
    flow_file: Option<PathBuf>,
}

impl From<Cli> for StartupConfig {
    fn from(cli: Cli) -> Self {
        StartupConfig {
            port: cli.port,
            settings_path: cli.settings,
            user_data_dir: cli.user_dir,
            verbose: cli.verbose,
            initial_flow_file: cli.flow_file,
        }
    }
}

pub(crate) fn try_parse_startup_config<I, T>(args: I) -> Result<StartupConfig, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(args).map(StartupConfig::from)
}

pub(crate) fn parse_startup_config() -> StartupConfig {
    try_parse_startup_config(std::env::args_os()).unwrap_or_else(|error| error.exit())
}

#[cfg(test)]
mod tests {
    use clap::error::ErrorKind;

    use super::*;

    #[test]
    fn defaults_leave_everything_to_the_backend() {
        let config = try_parse_startup_config(["node-red-desktop"]).expect("parse");
        assert_eq!(config, StartupConfig::default());
    }

    #[test]
    fn short_flags_map_to_startup_config() {
        let config = try_parse_startup_config([
            "node-red-desktop",
            "-p",
            "1880",
            "-s",
            "/etc/red/settings.json",
            "-u",
            "/srv/red",
            "-v",
            "flows.json",
        ])
        .expect("parse");

        assert_eq!(config.port, 1880);
        assert_eq!(
            config.settings_path,
            Some(PathBuf::from("/etc/red/settings.json"))
        );
        assert_eq!(config.user_data_dir, Some(PathBuf::from("/srv/red")));
        assert!(config.verbose);
        assert_eq!(config.initial_flow_file, Some(PathBuf::from("flows.json")));
    }

    #[test]
    fn long_flags_use_node_red_spelling() {
        let config = try_parse_startup_config([
            "node-red-desktop",
            "--port=0",
            "--settings",
            "custom.json",
            "--userDir",
            "/tmp/red",
            "--verbose",
        ])
        .expect("parse");

        assert_eq!(config.port, 0);
        assert_eq!(config.settings_path, Some(PathBuf::from("custom.json")));
        assert_eq!(config.user_data_dir, Some(PathBuf::from("/tmp/red")));
        assert!(config.verbose);
        assert_eq!(config.initial_flow_file, None);
    }

    #[test]
    fn every_help_spelling_requests_help_with_exit_code_zero() {
        for flag in ["-?", "-t", "--help"] {
            let error = try_parse_startup_config(["node-red-desktop", flag])
                .expect_err("help short-circuits parsing");
            assert_eq!(error.kind(), ErrorKind::DisplayHelp, "{flag}");
            assert_eq!(error.exit_code(), 0, "{flag}");
        }
    }

    #[test]
    fn invalid_port_is_a_usage_error() {
        let error = try_parse_startup_config(["node-red-desktop", "-p", "not-a-port"])
            .expect_err("invalid port");
        assert_eq!(error.kind(), ErrorKind::ValueValidation);
        assert_ne!(error.exit_code(), 0);
    }
}
