use std::{fmt, path::PathBuf};

use crate::cli::Cli;

/// Settings resolved from flags, environment and `.env`.
#[derive(Clone)]
pub struct Config {
    pub store_path: PathBuf,
    pub offline: bool,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub chat_model: String,
    pub embedding_model: String,
}

impl Config {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            store_path: cli.store.clone(),
            offline: cli.offline,
            api_key: non_blank(cli.api_key.as_deref()),
            base_url: non_blank(cli.base_url.as_deref()),
            chat_model: cli.chat_model.clone(),
            embedding_model: cli.embedding_model.clone(),
        }
    }

    /// Offline configuration for `store_path`; used by tests and local experiments.
    pub fn offline(store_path: impl Into<PathBuf>) -> Self {
        Self {
            store_path: store_path.into(),
            offline: true,
            api_key: None,
            base_url: None,
            chat_model: truthforge_extensions::gemini::DEFAULT_CHAT_MODEL.to_string(),
            embedding_model: truthforge_extensions::gemini::DEFAULT_EMBEDDING_MODEL.to_string(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("store_path", &self.store_path)
            .field("offline", &self.offline)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("chat_model", &self.chat_model)
            .field("embedding_model", &self.embedding_model)
            .finish()
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Default log filter when `RUST_LOG` is not set.
pub fn log_filter(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(log_filter(0, false), "warn");
        assert_eq!(log_filter(1, false), "info");
        assert_eq!(log_filter(2, false), "debug");
        assert_eq!(log_filter(7, false), "trace");
        assert_eq!(log_filter(3, true), "error");
    }

    #[test]
    fn blank_key_counts_as_missing() {
        let cli = Cli::try_parse_from(["truthforge", "stats", "--api-key", "  ", "--store", "s.json"]).unwrap();
        let config = Config::from_cli(&cli);
        assert!(config.api_key.is_none());
        assert_eq!(config.store_path, PathBuf::from("s.json"));
    }

    #[test]
    fn debug_hides_api_key() {
        let mut config = Config::offline("s.json");
        config.api_key = Some("very-secret".to_string());
        let printed = format!("{:?}", config);
        assert!(!printed.contains("very-secret"));
        assert!(printed.contains("<redacted>"));
    }
}
