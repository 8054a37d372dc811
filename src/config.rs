use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::auth::credential_store;
use crate::mail::Retriever;
use crate::mail::filter::Blacklist;

const CONFIG_ENV: &str = "MAIL_DIGEST_CONFIG";
const PASSWORD_ENV: &str = "MAIL_DIGEST_PASSWORD";
const API_KEY_ENV: &str = "MAIL_DIGEST_AI_API_KEY";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub imap_server: String,
    #[serde(default = "default_imap_port")]
    pub imap_port: u16,
    pub user_email: String,
    #[serde(default = "default_max_scan")]
    pub max_emails_to_scan: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub blacklist: BlacklistSetting,
    #[serde(default)]
    pub summarizer: Option<SummarizerConfig>,
    #[serde(default)]
    pub push: PushConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

/// Either `"a.com, b@"` or `["a.com", "b@"]`.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum BlacklistSetting {
    Csv(String),
    List(Vec<String>),
}

impl Default for BlacklistSetting {
    fn default() -> Self {
        BlacklistSetting::List(Vec::new())
    }
}

impl BlacklistSetting {
    pub fn to_blacklist(&self) -> Blacklist {
        match self {
            BlacklistSetting::Csv(s) => Blacklist::from_csv(s),
            BlacklistSetting::List(v) => Blacklist::new(v),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SummarizerConfig {
    pub base_url: String,
    pub model: String,
    #[serde(default = "default_summarizer_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PushSinkKind {
    #[default]
    Stdout,
    Desktop,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct PushConfig {
    #[serde(default)]
    pub sink: PushSinkKind,
    #[serde(default)]
    pub recipient: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ScheduleConfig {
    /// Local wall-clock time of the daily run, "HH:MM".
    #[serde(default = "default_run_at")]
    pub run_at: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            run_at: default_run_at(),
        }
    }
}

fn default_imap_port() -> u16 {
    993
}

fn default_max_scan() -> usize {
    200
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_summarizer_timeout() -> u64 {
    120
}

fn default_run_at() -> String {
    "08:00".to_string()
}

impl Config {
    /// Build a retriever, resolving the IMAP password from the keyring or
    /// the environment.
    pub fn retriever(&self) -> Result<Retriever> {
        let password = credential_store::load_password(&self.user_email)?
            .or_else(|| std::env::var(PASSWORD_ENV).ok())
            .ok_or_else(|| {
                anyhow!(
                    "no IMAP password for {}; run `mail_digest set-password` or set {PASSWORD_ENV}",
                    self.user_email
                )
            })?;
        Ok(self.retriever_with_password(password))
    }

    pub fn retriever_with_password(&self, password: String) -> Retriever {
        Retriever {
            server: self.imap_server.clone(),
            port: self.imap_port,
            user: self.user_email.clone(),
            password,
            max_scan: self.max_emails_to_scan,
            timeout: Duration::from_secs(self.timeout_secs),
            blacklist: self.blacklist.to_blacklist(),
        }
    }

    pub fn summarizer_api_key(&self) -> Result<Option<String>> {
        Ok(credential_store::load_api_key()?.or_else(|| std::env::var(API_KEY_ENV).ok()))
    }
}

fn config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or_else(|| anyhow!("no config dir available"))?
        .join("mail_digest"))
}

pub fn config_path() -> Result<PathBuf> {
    if let Ok(p) = std::env::var(CONFIG_ENV) {
        return Ok(PathBuf::from(p));
    }
    let mut p = config_dir()?;
    fs::create_dir_all(&p)?;
    p.push("config.toml");
    Ok(p)
}

pub fn load_config() -> Result<Config> {
    load_config_from(&config_path()?)
}

pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        // create a template config for users to edit
        let sample = Config {
            imap_server: "imap.example.com".to_string(),
            imap_port: default_imap_port(),
            user_email: "you@example.com".to_string(),
            max_emails_to_scan: default_max_scan(),
            timeout_secs: default_timeout_secs(),
            blacklist: BlacklistSetting::Csv("noreply@, newsletter".to_string()),
            summarizer: Some(SummarizerConfig {
                base_url: "https://api.openai.com/v1".to_string(),
                model: "gpt-4o-mini".to_string(),
                timeout_secs: default_summarizer_timeout(),
            }),
            push: PushConfig::default(),
            schedule: ScheduleConfig::default(),
        };
        let tom = toml::to_string_pretty(&sample)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, tom)?;
        return Err(anyhow!(
            "Created template config at {}; edit it and run again",
            path.display()
        ));
    }
    let s = fs::read_to_string(path)?;
    let cfg: Config = toml::from_str(&s)?;
    Ok(cfg)
}
