use crate::extractor::PairingMode;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CSV_PATH: &str = "players.csv";
const DEFAULT_MIRROR_TIMEOUT_SECS: u64 = 30;
const DEFAULT_COMMAND_PREFIX: &str = "!";

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { key: &'static str, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{} must be set", key),
            ConfigError::Invalid { key, reason } => write!(f, "{} is invalid: {}", key, reason),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Clone)]
pub struct Config {
    /// Discord bot token
    pub token: String,
    pub github_token: String,
    /// `owner/repo`
    pub repo_name: String,
    pub csv_path: PathBuf,
    pub channel_name: String,
    /// Path of the mirrored file inside the repository
    pub mirror_path: String,
    /// Branch to commit to; repository default when unset
    pub mirror_branch: Option<String>,
    pub mirror_timeout: Duration,
    /// API root for GitHub Enterprise; public GitHub when unset
    pub github_api_url: Option<String>,
    pub pairing: PairingMode,
    pub command_prefix: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("token", &"<redacted>")
            .field("github_token", &"<redacted>")
            .field("repo_name", &self.repo_name)
            .field("csv_path", &self.csv_path)
            .field("channel_name", &self.channel_name)
            .field("mirror_path", &self.mirror_path)
            .field("mirror_branch", &self.mirror_branch)
            .field("mirror_timeout", &self.mirror_timeout)
            .field("github_api_url", &self.github_api_url)
            .field("pairing", &self.pairing)
            .field("command_prefix", &self.command_prefix)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let token = require("TOKEN")?;
        let github_token = require("GITHUB_TOKEN")?;
        let channel_name = require("CHANNEL_NAME")?;

        let repo_name = require("REPO_NAME")?;
        if !is_owner_repo(&repo_name) {
            return Err(ConfigError::Invalid {
                key: "REPO_NAME",
                reason: format!("expected owner/repo, got '{}'", repo_name),
            });
        }

        let csv_path = PathBuf::from(get("CSV_PATH").unwrap_or_else(|| DEFAULT_CSV_PATH.to_string()));

        let mirror_path = match get("MIRROR_PATH") {
            Some(p) => p.trim_start_matches('/').to_string(),
            None => default_mirror_path(&csv_path).ok_or_else(|| ConfigError::Invalid {
                key: "CSV_PATH",
                reason: "has no file name to mirror; set MIRROR_PATH".to_string(),
            })?,
        };

        let mirror_timeout = match get("MIRROR_TIMEOUT_SECS") {
            Some(v) => match v.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "MIRROR_TIMEOUT_SECS",
                        reason: format!("expected a positive number of seconds, got '{}'", v),
                    });
                }
            },
            None => Duration::from_secs(DEFAULT_MIRROR_TIMEOUT_SECS),
        };

        let pairing = match get("PAIRING_MODE") {
            Some(v) => PairingMode::parse(&v).ok_or_else(|| ConfigError::Invalid {
                key: "PAIRING_MODE",
                reason: format!("expected positional, adjacent or adjacent:N, got '{}'", v),
            })?,
            None => PairingMode::default(),
        };

        Ok(Self {
            token,
            github_token,
            repo_name,
            csv_path,
            channel_name,
            mirror_path,
            mirror_branch: get("MIRROR_BRANCH"),
            mirror_timeout,
            github_api_url: get("GITHUB_API_URL"),
            pairing,
            command_prefix: get("COMMAND_PREFIX").unwrap_or_else(|| DEFAULT_COMMAND_PREFIX.to_string()),
        })
    }
}

fn is_owner_repo(name: &str) -> bool {
    match name.split_once('/') {
        Some((owner, repo)) => !owner.is_empty() && !repo.is_empty() && !repo.contains('/'),
        None => false,
    }
}

fn default_mirror_path(csv_path: &Path) -> Option<String> {
    csv_path
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
}
