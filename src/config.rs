use anyhow::{Context, Result, anyhow};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use crate::fetcher::{DEFAULT_FETCH_DEADLINE, DEFAULT_MAX_PAGES};
use crate::youtube::DEFAULT_API_BASE;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/listtube-env";
pub const DEFAULT_LISTTUBE_PORT: u16 = 8080;
pub const DEFAULT_LISTTUBE_HOST: &str = "127.0.0.1";
pub const DEFAULT_LISTS_DB: &str = "/var/lib/listtube/lists.db";
pub const DEFAULT_CACHE_TTL_HOURS: u64 = 24;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub youtube_api_key: Option<String>,
    pub youtube_api_base: Option<String>,
    pub cache_db: Option<PathBuf>,
    pub lists_db: Option<PathBuf>,
    pub listtube_host: Option<String>,
    pub listtube_port: Option<u16>,
    pub cache_ttl_hours: Option<u64>,
    pub max_pages: Option<usize>,
    pub fetch_deadline_secs: Option<u64>,
    pub http_timeout_secs: Option<u64>,
    pub log_filter: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub youtube_api_key: String,
    pub youtube_api_base: String,
    /// `None` keeps the video cache in process memory.
    pub cache_db: Option<PathBuf>,
    pub lists_db: PathBuf,
    pub listtube_host: String,
    pub listtube_port: u16,
    pub cache_ttl: Duration,
    pub max_pages: usize,
    pub fetch_deadline: Duration,
    pub http_timeout: Duration,
    pub log_filter: String,
}

impl EnvConfig {
    /// Layers `KEY=value` pairs (usually the process environment) over the
    /// file values. Unknown keys are ignored.
    pub fn apply_overrides<I, K, V>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            self.set(key.as_ref(), value.as_ref(), "environment")?;
        }
        Ok(())
    }

    fn set(&mut self, key: &str, value: &str, origin: &str) -> Result<()> {
        let non_empty = || (!value.is_empty()).then(|| value.to_string());
        match key {
            "YOUTUBE_API_KEY" => self.youtube_api_key = non_empty(),
            "YOUTUBE_API_BASE" => self.youtube_api_base = non_empty(),
            "CACHE_DB" => self.cache_db = non_empty().map(PathBuf::from),
            "LISTS_DB" => self.lists_db = non_empty().map(PathBuf::from),
            "LISTTUBE_HOST" => {
                if !value.is_empty() {
                    self.listtube_host = Some(value.to_string());
                }
            }
            "LISTTUBE_PORT" => self.listtube_port = Some(parse_number(key, value, origin)?),
            "CACHE_TTL_HOURS" => self.cache_ttl_hours = Some(parse_number(key, value, origin)?),
            "MAX_PAGES" => self.max_pages = Some(parse_number(key, value, origin)?),
            "FETCH_DEADLINE_SECS" => {
                self.fetch_deadline_secs = Some(parse_number(key, value, origin)?)
            }
            "HTTP_TIMEOUT_SECS" => {
                self.http_timeout_secs = Some(parse_number(key, value, origin)?)
            }
            "LOG_FILTER" => {
                if !value.is_empty() {
                    self.log_filter = Some(value.to_string());
                }
            }
            _ => {}
        }
        Ok(())
    }
}

fn parse_number<T>(key: &str, value: &str, origin: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse()
        .with_context(|| format!("Parsing {key} from {origin}"))
}

pub fn read_env_config(path: &Path) -> Result<Option<EnvConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
    let origin = path.display().to_string();
    let mut cfg = EnvConfig::default();
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if let Some((key, value_raw)) = trimmed.split_once('=') {
            let value = value_raw.trim().trim_matches('"');
            cfg.set(key.trim(), value, &origin)?;
        }
    }
    Ok(Some(cfg))
}

pub fn load_runtime_config() -> Result<RuntimeConfig> {
    load_runtime_config_from(Path::new(DEFAULT_CONFIG_PATH))
}

/// Reads the file (which may be absent when everything comes from the
/// environment), applies process environment overrides and fills defaults.
pub fn load_runtime_config_from(path: impl AsRef<Path>) -> Result<RuntimeConfig> {
    let path = path.as_ref();
    let mut cfg = read_env_config(path)?.unwrap_or_default();
    cfg.apply_overrides(std::env::vars())?;
    resolve(cfg, path)
}

pub(crate) fn resolve(cfg: EnvConfig, path: &Path) -> Result<RuntimeConfig> {
    let youtube_api_key = cfg.youtube_api_key.ok_or_else(|| {
        anyhow!(
            "YOUTUBE_API_KEY not set in {} or the environment",
            path.display()
        )
    })?;
    Ok(RuntimeConfig {
        youtube_api_key,
        youtube_api_base: cfg
            .youtube_api_base
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
        cache_db: cfg.cache_db,
        lists_db: cfg
            .lists_db
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LISTS_DB)),
        listtube_host: cfg
            .listtube_host
            .unwrap_or_else(|| DEFAULT_LISTTUBE_HOST.to_string()),
        listtube_port: cfg.listtube_port.unwrap_or(DEFAULT_LISTTUBE_PORT),
        cache_ttl: Duration::from_secs(
            cfg.cache_ttl_hours.unwrap_or(DEFAULT_CACHE_TTL_HOURS) * 60 * 60,
        ),
        max_pages: cfg.max_pages.unwrap_or(DEFAULT_MAX_PAGES),
        fetch_deadline: cfg
            .fetch_deadline_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_FETCH_DEADLINE),
        http_timeout: Duration::from_secs(
            cfg.http_timeout_secs.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
        ),
        log_filter: cfg
            .log_filter
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
    })
}
