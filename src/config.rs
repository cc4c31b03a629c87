//! Configuration resolution.
//!
//! Priority per field: flag/env > config.toml > default. The config file
//! lives at `$XDG_CONFIG_HOME/todoboard/config.toml` unless `--config` names
//! another one.
//!
//! ```toml
//! endpoint = "http://127.0.0.1:8787"
//! limit = 100
//! timeout_secs = 15
//!
//! [serve]
//! listen = "127.0.0.1:8787"
//! upstream = "https://example.microcms.io/api/v1"
//! api_key = "..."
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Args;
use serde::Deserialize;

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8787";
pub const DEFAULT_LISTEN: &str = "127.0.0.1:8787";
pub const DEFAULT_LIMIT: u32 = 100;
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Connection flags shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Task API base URL (the proxy, or the content store itself)
    #[arg(long, env = "TODOBOARD_ENDPOINT", global = true)]
    pub endpoint: Option<String>,

    /// Content store API key, sent as X-MICROCMS-API-KEY
    #[arg(long, env = "TODOBOARD_API_KEY", global = true, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Max tasks fetched per list request
    #[arg(long, env = "TODOBOARD_LIMIT", global = true)]
    pub limit: Option<u32>,

    /// Per-request timeout in seconds
    #[arg(long, env = "TODOBOARD_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Config file (default: ~/.config/todoboard/config.toml)
    #[arg(long, env = "TODOBOARD_CONFIG", global = true)]
    pub config: Option<PathBuf>,
}

/// Contents of config.toml. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub limit: Option<u32>,
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub serve: ServeFileConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServeFileConfig {
    pub listen: Option<String>,
    pub upstream: Option<String>,
    pub api_key: Option<String>,
}

impl FileConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("todoboard").join("config.toml"))
    }

    /// Load `explicit`, or the default path if it exists. A missing default file is not an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) if path.exists() => path,
                _ => return Ok(Self::default()),
            },
        };

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: FileConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        tracing::debug!(path = %path.display(), "config file loaded");
        Ok(config)
    }
}

/// Resolved client settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub limit: u32,
    pub timeout: Duration,
}

impl Config {
    pub fn resolve(args: &ConnectionArgs, file: &FileConfig) -> Result<Self> {
        let limit = args.limit.or(file.limit).unwrap_or(DEFAULT_LIMIT);
        if limit == 0 {
            return Err(anyhow!("limit must be at least 1"));
        }
        let timeout_secs = args
            .timeout
            .or(file.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(anyhow!("timeout must be at least 1 second"));
        }

        Ok(Self {
            endpoint: args
                .endpoint
                .clone()
                .or_else(|| file.endpoint.clone())
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            api_key: args.api_key.clone().or_else(|| file.api_key.clone()),
            limit,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Load the config file named by `args` (or the default one) and resolve.
    pub fn load(args: &ConnectionArgs) -> Result<Self> {
        let file = FileConfig::load(args.config.as_deref())?;
        Self::resolve(args, &file)
    }
}

/// Resolved proxy settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServeConfig {
    pub listen: SocketAddr,
    /// Content store the proxy forwards to; `None` serves from memory.
    pub upstream: Option<Config>,
}

impl ServeConfig {
    pub fn resolve(
        listen: Option<&str>,
        upstream: Option<&str>,
        in_memory: bool,
        args: &ConnectionArgs,
        file: &FileConfig,
    ) -> Result<Self> {
        let listen = listen
            .map(str::to_string)
            .or_else(|| file.serve.listen.clone())
            .unwrap_or_else(|| DEFAULT_LISTEN.to_string());
        let listen: SocketAddr = listen
            .parse()
            .with_context(|| format!("Invalid listen address: {listen}"))?;

        if in_memory {
            return Ok(Self {
                listen,
                upstream: None,
            });
        }

        let endpoint = upstream
            .map(str::to_string)
            .or_else(|| file.serve.upstream.clone())
            .ok_or_else(|| {
                anyhow!(
                    "Upstream required. Use --upstream, TODOBOARD_UPSTREAM, \
                     set [serve].upstream in config.toml, or pass --in-memory"
                )
            })?;
        let mut client = Config::resolve(args, file)?;
        client.endpoint = endpoint;
        client.api_key = args
            .api_key
            .clone()
            .or_else(|| file.serve.api_key.clone())
            .or_else(|| file.api_key.clone());

        Ok(Self {
            listen,
            upstream: Some(client),
        })
    }
}
