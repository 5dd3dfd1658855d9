//! Settings module for subcollector
//!
//! Run settings are read from a TOML file; every key is optional.
//!
//! ```toml
//! [common]
//! sources_file = "sources.list"
//! proxy = "SYSTEM"
//!
//! [fetch]
//! wait_increment = 5
//! max_wait_increments = 6
//! ```

pub mod sources;

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fetch::{SchedulerConfig, SourceOptions};
use crate::merge::DEFAULT_MAX_NAME_LEN;

pub use sources::{parse_source_lines, SourceEntry};

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings: {0}")]
    Toml(#[from] toml::de::Error),
}

fn default_true() -> bool {
    true
}

fn default_sources_file() -> String {
    "sources.list".to_string()
}

fn default_output_dir() -> String {
    ".".to_string()
}

fn default_user_agent() -> String {
    concat!("subcollector/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_request_timeout() -> u64 {
    15
}

fn default_wait_increment() -> u64 {
    5
}

fn default_max_wait_increments() -> u32 {
    6
}

fn default_retry_depth() -> u32 {
    2
}

fn default_max_name_len() -> usize {
    DEFAULT_MAX_NAME_LEN
}

/// Common settings section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CommonSettings {
    #[serde(default = "default_sources_file")]
    pub sources_file: String,
    /// Running from a workstation rather than CI.
    pub local: bool,
    /// Outbound proxy for fetching: a URL, `SYSTEM` or `NONE`.
    pub proxy: String,
    #[serde(default = "default_true")]
    pub mirror_raw_github: bool,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

impl Default for CommonSettings {
    fn default() -> Self {
        CommonSettings {
            sources_file: default_sources_file(),
            local: false,
            proxy: String::new(),
            mirror_raw_github: true,
            output_dir: default_output_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FetchSettings {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
    /// Seconds.
    #[serde(default = "default_wait_increment")]
    pub wait_increment: u64,
    #[serde(default = "default_max_wait_increments")]
    pub max_wait_increments: u32,
    #[serde(default = "default_retry_depth")]
    pub retry_depth: u32,
}

impl Default for FetchSettings {
    fn default() -> Self {
        FetchSettings {
            user_agent: default_user_agent(),
            request_timeout: default_request_timeout(),
            wait_increment: default_wait_increment(),
            max_wait_increments: default_max_wait_increments(),
            retry_depth: default_retry_depth(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MergeSettings {
    #[serde(default = "default_max_name_len")]
    pub max_name_len: usize,
}

impl Default for MergeSettings {
    fn default() -> Self {
        MergeSettings {
            max_name_len: default_max_name_len(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub common: CommonSettings,
    pub fetch: FetchSettings,
    pub merge: MergeSettings,
}

impl Settings {
    pub fn load_from_content(content: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loaded settings from {}", path.display());
        Self::load_from_content(&content)
    }

    /// The configured outbound proxy, with `NONE` and empty mapped to `None`.
    pub fn proxy(&self) -> Option<&str> {
        match self.common.proxy.trim() {
            "" => None,
            p if p.eq_ignore_ascii_case("NONE") => None,
            p => Some(p),
        }
    }

    /// A local run without a proxy skips `!` sources and fetches GitHub
    /// raw files through the mirror.
    pub fn local_mode(&self) -> bool {
        self.common.local && self.proxy().is_none()
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            wait_increment: Duration::from_secs(self.fetch.wait_increment),
            max_wait_increments: self.fetch.max_wait_increments,
        }
    }

    pub fn source_options(&self) -> SourceOptions {
        SourceOptions {
            retry_depth: self.fetch.retry_depth,
            mirror_raw_github: self.local_mode() && self.common.mirror_raw_github,
            ..Default::default()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch.request_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_content_gives_defaults() {
        let settings = Settings::load_from_content("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.common.sources_file, "sources.list");
        assert_eq!(settings.fetch.retry_depth, 2);
        assert!(!settings.local_mode());
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let settings = Settings::load_from_content(
            r#"
[common]
local = true
proxy = "socks5://127.0.0.1:1080"

[fetch]
wait_increment = 1
"#,
        )
        .unwrap();
        assert_eq!(settings.proxy(), Some("socks5://127.0.0.1:1080"));
        assert!(!settings.local_mode());
        assert!(!settings.source_options().mirror_raw_github);
        assert_eq!(settings.scheduler_config().wait_increment, Duration::from_secs(1));
        assert_eq!(settings.fetch.max_wait_increments, 6);
        assert_eq!(settings.merge.max_name_len, 30);
    }

    #[test]
    fn test_local_without_proxy_mirrors() {
        let settings =
            Settings::load_from_content("[common]\nlocal = true\nproxy = \"NONE\"\n").unwrap();
        assert_eq!(settings.proxy(), None);
        assert!(settings.local_mode());
        assert!(settings.source_options().mirror_raw_github);
    }

    #[test]
    fn test_ci_run_is_not_local() {
        let settings = Settings::load_from_content("[common]\nproxy = \"NONE\"\n").unwrap();
        assert!(!settings.local_mode());
        assert!(!settings.source_options().mirror_raw_github);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            Settings::load_from_content("[fetch]\nwait_increment = \"soon\""),
            Err(SettingsError::Toml(_))
        ));
    }
}
