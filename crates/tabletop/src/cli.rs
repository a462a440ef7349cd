//! Command-line interface for the tabletop server.
//!
//! Every option here overrides the matching value from the configuration
//! file.

use clap::{Arg, ArgMatches, Command};
use std::path::PathBuf;

/// Command line arguments parsed from user input.
#[derive(Debug, Clone, PartialEq)]
pub struct CliArgs {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Optional override for the card data directory
    pub data_dir: Option<PathBuf>,
    /// Optional override for bind address
    pub bind_address: Option<String>,
    /// Optional override for log level
    pub log_level: Option<String>,
    /// Whether to force JSON log output
    pub json_logs: bool,
}

fn command() -> Command {
    Command::new("Tabletop Server")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Realtime card-table server with lobbies, shared boards and booster drafts")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("tabletop.toml"),
        )
        .arg(
            Arg::new("data-dir")
                .short('d')
                .long("data-dir")
                .value_name("DIR")
                .help("Directory holding cards.json, sets/ and decks/"),
        )
        .arg(
            Arg::new("bind")
                .short('b')
                .long("bind")
                .value_name("ADDRESS")
                .help("Bind address (e.g., 127.0.0.1:8080)"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level (trace, debug, info, warn, error)"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .help("Output logs in JSON format")
                .action(clap::ArgAction::SetTrue),
        )
}

impl CliArgs {
    /// Parses the process arguments, exiting with usage on error.
    pub fn parse() -> Self {
        Self::from_matches(&command().get_matches())
    }

    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Ok(Self::from_matches(&command().try_get_matches_from(args)?))
    }

    fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            config_path: matches
                .get_one::<String>("config")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("tabletop.toml")),
            data_dir: matches.get_one::<String>("data-dir").map(PathBuf::from),
            bind_address: matches.get_one::<String>("bind").cloned(),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = CliArgs::try_parse_from(["tabletop"]).unwrap();
        assert_eq!(args.config_path, PathBuf::from("tabletop.toml"));
        assert!(args.data_dir.is_none());
        assert!(args.bind_address.is_none());
        assert!(!args.json_logs);
    }

    #[test]
    fn test_overrides() {
        let args = CliArgs::try_parse_from([
            "tabletop",
            "--config",
            "alt.toml",
            "-d",
            "/srv/cards",
            "--bind",
            "0.0.0.0:9000",
            "-l",
            "debug",
            "--json-logs",
        ])
        .unwrap();
        assert_eq!(args.config_path, PathBuf::from("alt.toml"));
        assert_eq!(args.data_dir, Some(PathBuf::from("/srv/cards")));
        assert_eq!(args.bind_address.as_deref(), Some("0.0.0.0:9000"));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert!(args.json_logs);
    }

    #[test]
    fn test_unknown_flag_is_rejected() {
        assert!(CliArgs::try_parse_from(["tabletop", "--seats", "4"]).is_err());
    }
}
