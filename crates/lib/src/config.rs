//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.courier/config.json`) and environment.
//! Every value can be overridden by an env var; the merged values are validated into
//! [`RelaySettings`] before any connection is attempted.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Command prefix used when neither the config file nor COMMAND_PREFIX sets one.
pub const DEFAULT_COMMAND_PREFIX: &str = "/post";

const SESSION_FILE_NAME: &str = "courier.session";

/// Top-level application config (raw, as written in the file).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Telegram user-account credentials.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Source group, target channel and command prefix.
    #[serde(default)]
    pub relay: RelayConfig,
}

/// A scalar written either as a JSON number or as a string. Template placeholders
/// (`"YOUR_API_ID"`) are strings, real ids are usually numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Number(i64),
    Text(String),
}

impl ConfigValue {
    fn to_text(&self) -> String {
        match self {
            ConfigValue::Number(n) => n.to_string(),
            ConfigValue::Text(s) => s.clone(),
        }
    }
}

/// Telegram user-account config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelegramConfig {
    /// API id from my.telegram.org. Overridden by TELEGRAM_API_ID env when set.
    pub api_id: Option<ConfigValue>,
    /// API hash from my.telegram.org. Overridden by TELEGRAM_API_HASH env when set.
    pub api_hash: Option<String>,
    /// Phone number of the account, international format. Overridden by TELEGRAM_PHONE_NUMBER.
    pub phone_number: Option<String>,
    /// Where the authorized session is persisted. Relative paths are resolved against the config file's parent. Default: `courier.session` next to the config file.
    pub session_file: Option<PathBuf>,
}

/// Relay route config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayConfig {
    /// Group watched for commands. Overridden by TELEGRAM_SOURCE_GROUP_ID.
    pub source_group_id: Option<ConfigValue>,
    /// Channel that receives the forwarded content. Overridden by TELEGRAM_TARGET_CHANNEL_ID.
    pub target_channel_id: Option<ConfigValue>,
    /// Literal, case-sensitive prefix marking a message as a command. Overridden by COMMAND_PREFIX.
    pub command_prefix: Option<String>,
}

/// A config key together with its env override and template placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub key: &'static str,
    pub env: &'static str,
    pub placeholder: &'static str,
}

pub const API_ID: Field = Field {
    key: "telegram.apiId",
    env: "TELEGRAM_API_ID",
    placeholder: "YOUR_API_ID",
};
pub const API_HASH: Field = Field {
    key: "telegram.apiHash",
    env: "TELEGRAM_API_HASH",
    placeholder: "YOUR_API_HASH",
};
pub const PHONE_NUMBER: Field = Field {
    key: "telegram.phoneNumber",
    env: "TELEGRAM_PHONE_NUMBER",
    placeholder: "YOUR_PHONE_NUMBER",
};
pub const SOURCE_GROUP_ID: Field = Field {
    key: "relay.sourceGroupId",
    env: "TELEGRAM_SOURCE_GROUP_ID",
    placeholder: "YOUR_SOURCE_GROUP_ID",
};
pub const TARGET_CHANNEL_ID: Field = Field {
    key: "relay.targetChannelId",
    env: "TELEGRAM_TARGET_CHANNEL_ID",
    placeholder: "YOUR_TARGET_CHANNEL_ID",
};
pub const COMMAND_PREFIX_ENV: &str = "COMMAND_PREFIX";

/// Why the resolved configuration was refused. Always fatal, raised before any connection attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{} is not set; add it to the config file or set {}", .0.key, .0.env)]
    Missing(Field),
    #[error("please replace {} in the config file or {} with a real value", .0.placeholder, .0.env)]
    Placeholder(Field),
    #[error("{} must be an integer, got {value:?}", .field.key)]
    InvalidNumber { field: Field, value: String },
    #[error("{} must be a valid non-zero id", .0.key)]
    ZeroId(Field),
    #[error("relay.commandPrefix must not be empty")]
    EmptyPrefix,
}

/// Account credentials. Immutable after load.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_id: i32,
    pub api_hash: String,
    pub phone_number: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_id", &self.api_id)
            .field("api_hash", &"<redacted>")
            .field("phone_number", &self.phone_number)
            .finish()
    }
}

/// Source → target route. Both ids are non-zero and the prefix is non-blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteConfig {
    source_conversation_id: i64,
    target_channel_id: i64,
    command_prefix: String,
}

impl RouteConfig {
    pub fn new(
        source_conversation_id: i64,
        target_channel_id: i64,
        command_prefix: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        if source_conversation_id == 0 {
            return Err(ConfigError::ZeroId(SOURCE_GROUP_ID));
        }
        if target_channel_id == 0 {
            return Err(ConfigError::ZeroId(TARGET_CHANNEL_ID));
        }
        let command_prefix = command_prefix.into();
        if command_prefix.trim().is_empty() {
            return Err(ConfigError::EmptyPrefix);
        }
        Ok(Self {
            source_conversation_id,
            target_channel_id,
            command_prefix,
        })
    }

    pub fn source_conversation_id(&self) -> i64 {
        self.source_conversation_id
    }

    pub fn target_channel_id(&self) -> i64 {
        self.target_channel_id
    }

    pub fn command_prefix(&self) -> &str {
        &self.command_prefix
    }
}

/// Fully resolved and validated settings the relay starts from.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub credentials: Credentials,
    pub route: RouteConfig,
    pub session_file: PathBuf,
}

/// Resolve settings from the config file merged with the process environment.
pub fn resolve_settings(config: &Config, config_path: &Path) -> Result<RelaySettings, ConfigError> {
    resolve_settings_with(config, config_path, |key| std::env::var(key).ok())
}

/// Same as [`resolve_settings`] with an explicit env lookup (tests pass a map).
///
/// Env values are trimmed and ignored when empty. Checks run in a fixed order (api id,
/// api hash, phone, source, target, prefix) and the first failure is returned.
pub fn resolve_settings_with<F>(
    config: &Config,
    config_path: &Path,
    env: F,
) -> Result<RelaySettings, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let lookup = |field: Field, file_value: Option<String>| -> Option<String> {
        non_blank(env(field.env)).or_else(|| non_blank(file_value))
    };

    let api_id = require(
        API_ID,
        lookup(API_ID, config.telegram.api_id.as_ref().map(ConfigValue::to_text)),
    )?;
    let api_hash = require(API_HASH, lookup(API_HASH, config.telegram.api_hash.clone()))?;
    let api_id = parse_int(API_ID, &api_id)?;
    let api_id = i32::try_from(api_id).map_err(|_| ConfigError::InvalidNumber {
        field: API_ID,
        value: api_id.to_string(),
    })?;
    let phone_number = require(
        PHONE_NUMBER,
        lookup(PHONE_NUMBER, config.telegram.phone_number.clone()),
    )?;

    let source = require(
        SOURCE_GROUP_ID,
        lookup(
            SOURCE_GROUP_ID,
            config.relay.source_group_id.as_ref().map(ConfigValue::to_text),
        ),
    )?;
    let source = parse_id(SOURCE_GROUP_ID, &source)?;
    let target = require(
        TARGET_CHANNEL_ID,
        lookup(
            TARGET_CHANNEL_ID,
            config.relay.target_channel_id.as_ref().map(ConfigValue::to_text),
        ),
    )?;
    let target = parse_id(TARGET_CHANNEL_ID, &target)?;

    // The prefix is a literal: only emptiness is checked on the env value, never trimmed.
    let prefix = env(COMMAND_PREFIX_ENV)
        .filter(|s| !s.is_empty())
        .or_else(|| config.relay.command_prefix.clone())
        .unwrap_or_else(|| DEFAULT_COMMAND_PREFIX.to_string());
    let route = RouteConfig::new(source, target, prefix)?;

    Ok(RelaySettings {
        credentials: Credentials {
            api_id,
            api_hash,
            phone_number,
        },
        route,
        session_file: resolve_session_file(config, config_path),
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn require(field: Field, value: Option<String>) -> Result<String, ConfigError> {
    let value = value.ok_or(ConfigError::Missing(field))?;
    if value.contains(field.placeholder) {
        return Err(ConfigError::Placeholder(field));
    }
    Ok(value)
}

fn parse_int(field: Field, value: &str) -> Result<i64, ConfigError> {
    value.parse::<i64>().map_err(|_| ConfigError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}

fn parse_id(field: Field, value: &str) -> Result<i64, ConfigError> {
    match parse_int(field, value)? {
        0 => Err(ConfigError::ZeroId(field)),
        id => Ok(id),
    }
}

fn config_dir(config_path: &Path) -> &Path {
    config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

/// Session file path: `telegram.sessionFile` (relative paths resolved against the config file's parent), otherwise `courier.session` next to the config file.
pub fn resolve_session_file(config: &Config, config_path: &Path) -> PathBuf {
    let dir = config_dir(config_path);
    match &config.telegram.session_file {
        Some(p) if !p.as_os_str().is_empty() => {
            if p.is_absolute() {
                p.clone()
            } else {
                dir.join(p)
            }
        }
        _ => dir.join(SESSION_FILE_NAME),
    }
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("COURIER_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".courier").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

/// Load config from the given path, or the default path (or COURIER_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used (for resolving the session file).
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}
