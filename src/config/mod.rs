// src/config/mod.rs
//! Application configuration, loaded once at startup and passed by reference.
//!
//! Lookup order for the file:
//! 1) `$MYFEEDS_CONFIG_PATH`
//! 2) `config/myfeeds.toml`
//! 3) `config/myfeeds.json`
//!
//! After parsing, `MYFEEDS_ENV` selects the active env, the matching
//! `[profiles.<env>]` table is overlaid, then `MYFEEDS_DEBUG` wins over both.

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Deserializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ingest::http::DEFAULT_USER_AGENT;
use crate::ingest::types::SourceKind;

pub const ENV_CONFIG_PATH: &str = "MYFEEDS_CONFIG_PATH";
pub const ENV_ENV: &str = "MYFEEDS_ENV";
pub const ENV_DEBUG: &str = "MYFEEDS_DEBUG";

const ENV_SERVERCHAN_KEY: &str = "SERVERCHAN_SEND_KEY";
const ENV_DISCORD_WEBHOOK: &str = "DISCORD_WEBHOOK_URL";
const ENV_SLACK_WEBHOOK: &str = "SLACK_WEBHOOK_URL";
const ENV_SENTRY_DSN: &str = "SENTRY_DSN";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub env: String,
    pub debug: bool,
    pub log_level: String,
    pub log_dir: PathBuf,
    pub templates_dir: Option<PathBuf>,
    /// Error reporting; only used outside debug mode.
    pub sentry_dsn: Option<String>,
    pub schedule: ScheduleConfig,
    /// Source → identities to track.
    #[serde(deserialize_with = "deserialize_sources")]
    pub sources: BTreeMap<SourceKind, Vec<String>>,
    pub notify: NotifyConfig,
    pub http: HttpConfig,
    pub metrics: MetricsConfig,
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            env: "dev".to_string(),
            debug: true,
            log_level: "info".to_string(),
            log_dir: PathBuf::from(".logs"),
            templates_dir: None,
            sentry_dsn: None,
            schedule: ScheduleConfig::default(),
            sources: BTreeMap::new(),
            notify: NotifyConfig::default(),
            http: HttpConfig::default(),
            metrics: MetricsConfig::default(),
            profiles: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub interval_secs: u64,
    pub heartbeat_secs: u64,
    /// Consecutive failed cycles before a loop starts warning.
    pub failure_warn_after: u32,
    pub shutdown_grace_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_secs: 10 * 60,
            heartbeat_secs: 60,
            failure_warn_after: 6,
            shutdown_grace_secs: 10,
        }
    }
}

impl ScheduleConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn heartbeat(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs)
    }
}

/// `"ENV"` as a value means: read it from the channel's env var.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    pub serverchan_send_key: Option<String>,
    pub discord_webhook: Option<String>,
    pub slack_webhook: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout for source fetches and ServerChan pushes; 0 disables it.
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Serve Prometheus text on `GET /metrics` at this address.
    pub listen: Option<SocketAddr>,
}

/// Per-env overrides.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub debug: Option<bool>,
    pub log_level: Option<String>,
    pub interval_secs: Option<u64>,
    pub serverchan_send_key: Option<String>,
    pub sentry_dsn: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IdToken {
    Text(String),
    Number(i64),
}

fn deserialize_sources<'de, D>(de: D) -> Result<BTreeMap<SourceKind, Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: BTreeMap<SourceKind, Vec<IdToken>> = BTreeMap::deserialize(de)?;
    Ok(raw
        .into_iter()
        .map(|(kind, ids)| {
            let ids = ids.into_iter().map(|t| match t {
                IdToken::Text(s) => s,
                IdToken::Number(n) => n.to_string(),
            });
            (kind, clean_list(ids))
        })
        .collect())
}

/// Trim, drop empties, drop duplicates, keep first-seen order.
fn clean_list(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for it in items {
        let t = it.trim();
        if !t.is_empty() && seen.insert(t.to_string()) {
            out.push(t.to_string());
        }
    }
    out
}

fn parse_flag(v: &str) -> bool {
    matches!(v.trim().to_ascii_lowercase().as_str(), "on" | "true" | "1" | "yes")
}

impl AppConfig {
    /// Load from an explicit path. TOML or JSON, by extension.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let mut cfg = Self::parse(&content, &ext)
            .with_context(|| format!("parsing config {}", path.display()))?;
        cfg.finish(|k| std::env::var(k).ok())?;
        Ok(cfg)
    }

    /// Load using env var + fallbacks (see module docs).
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                bail!("{ENV_CONFIG_PATH} points to non-existent path {}", pb.display());
            }
            return Self::load_from(&pb);
        }
        for candidate in ["config/myfeeds.toml", "config/myfeeds.json"] {
            let p = PathBuf::from(candidate);
            if p.exists() {
                return Self::load_from(&p);
            }
        }
        Err(anyhow!(
            "no configuration found: set {ENV_CONFIG_PATH} or create config/myfeeds.toml"
        ))
    }

    pub fn parse(s: &str, hint_ext: &str) -> Result<Self> {
        match hint_ext {
            "json" => Ok(serde_json::from_str(s)?),
            _ => Ok(toml::from_str(s)?),
        }
    }

    /// Apply env overrides and profile, resolve secrets, sanitize.
    pub fn finish<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(env) = lookup(ENV_ENV).filter(|v| !v.trim().is_empty()) {
            self.env = env.trim().to_string();
        }

        if let Some(p) = self.profiles.get(&self.env).cloned() {
            if let Some(d) = p.debug {
                self.debug = d;
            }
            if let Some(l) = p.log_level {
                self.log_level = l;
            }
            if let Some(i) = p.interval_secs {
                self.schedule.interval_secs = i;
            }
            if p.serverchan_send_key.is_some() {
                self.notify.serverchan_send_key = p.serverchan_send_key;
            }
            if p.sentry_dsn.is_some() {
                self.sentry_dsn = p.sentry_dsn;
            }
        }

        if let Some(d) = lookup(ENV_DEBUG) {
            self.debug = parse_flag(&d);
        }

        self.notify.serverchan_send_key =
            resolve_secret(self.notify.serverchan_send_key.take(), ENV_SERVERCHAN_KEY, &lookup)?;
        self.notify.discord_webhook =
            resolve_secret(self.notify.discord_webhook.take(), ENV_DISCORD_WEBHOOK, &lookup)?;
        self.notify.slack_webhook =
            resolve_secret(self.notify.slack_webhook.take(), ENV_SLACK_WEBHOOK, &lookup)?;
        self.sentry_dsn = resolve_secret(self.sentry_dsn.take(), ENV_SENTRY_DSN, &lookup)?;

        // Zero would turn a loop into a busy spin
        self.schedule.interval_secs = self.schedule.interval_secs.max(1);
        self.schedule.heartbeat_secs = self.schedule.heartbeat_secs.max(1);

        self.sources.retain(|kind, ids| {
            if ids.is_empty() {
                tracing::warn!(source = %kind, "source configured without identities, skipped");
            }
            !ids.is_empty()
        });
        Ok(())
    }

    /// Total number of poll loops this config produces.
    pub fn loop_count(&self) -> usize {
        self.sources.values().map(Vec::len).sum()
    }
}

fn resolve_secret<F>(value: Option<String>, env_key: &str, lookup: &F) -> Result<Option<String>>
where
    F: Fn(&str) -> Option<String>,
{
    match value.map(|v| v.trim().to_string()) {
        None => Ok(None),
        Some(v) if v.is_empty() => Ok(None),
        Some(v) if v.eq_ignore_ascii_case("env") => lookup(env_key)
            .filter(|s| !s.trim().is_empty())
            .map(|s| Some(s.trim().to_string()))
            .ok_or_else(|| anyhow!("Missing {env_key} env var")),
        Some(v) => Ok(Some(v)),
    }
}
