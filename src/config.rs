use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::allocator::DrawPolicy;
use crate::error::{Error, Result};

/// Which remote blob holds the link history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    JsonBin { bin_id: String, api_key: String },
    Dropbox { token: String, path: String },
    File { path: PathBuf },
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub discord_public_key: String,
    pub discord_bot_token: String,
    pub discord_application_id: u64,
    pub log_webhook_url: Option<String>,
    pub link_emoji: Option<String>,
    pub links_path: PathBuf,
    pub max_links: u32,
    pub cooldown: Duration,
    pub persist_timeout: Duration,
    pub storage: StorageConfig,
    pub host: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let discord_application_id = required("DISCORD_APPLICATION_ID")?
            .parse::<u64>()
            .ok()
            .filter(|id| *id != 0)
            .ok_or_else(|| {
                Error::InvalidConfig("DISCORD_APPLICATION_ID must be a non-zero u64".into())
            })?;

        let max_links = parsed_or("MAX_LINKS", 4u32)?;
        if max_links == 0 {
            return Err(Error::InvalidConfig("MAX_LINKS must be at least 1".into()));
        }
        let cooldown_secs = parsed_or("LINK_COOLDOWN_MINUTES", 120u64)?
            .checked_mul(60)
            .ok_or_else(|| Error::InvalidConfig("LINK_COOLDOWN_MINUTES is too large".into()))?;

        Ok(Self {
            discord_public_key: required("DISCORD_PUBLIC_KEY")?,
            discord_bot_token: required("DISCORD_BOT_TOKEN")?,
            discord_application_id,
            log_webhook_url: optional("LOG_WEBHOOK_URL"),
            link_emoji: optional("LINK_EMOJI"),
            links_path: optional("LINKS_PATH")
                .unwrap_or_else(|| "./links.txt".into())
                .into(),
            max_links,
            cooldown: Duration::from_secs(cooldown_secs),
            persist_timeout: Duration::from_secs(parsed_or("PERSIST_TIMEOUT_SECS", 5u64)?),
            storage: StorageConfig::from_env()?,
            host: optional("HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parsed_or("PORT", 3000u16)?,
        })
    }

    pub fn policy(&self) -> DrawPolicy {
        DrawPolicy {
            max_links: self.max_links,
            cooldown: self.cooldown,
        }
    }
}

impl StorageConfig {
    pub fn from_env() -> Result<Self> {
        let backend = optional("STORAGE_BACKEND").unwrap_or_else(|| "jsonbin".into());
        match backend.to_ascii_lowercase().as_str() {
            "jsonbin" => Ok(Self::JsonBin {
                bin_id: required("JSONBIN_ID")?,
                api_key: required("JSONBIN_API_KEY")?,
            }),
            "dropbox" => Ok(Self::Dropbox {
                token: required("DROPBOX_TOKEN")?,
                path: optional("DROPBOX_PATH").unwrap_or_else(|| "/link-history.json".into()),
            }),
            "file" => Ok(Self::File {
                path: optional("STATE_FILE")
                    .unwrap_or_else(|| "./link-history.json".into())
                    .into(),
            }),
            "memory" => Ok(Self::Memory),
            other => Err(Error::InvalidConfig(format!(
                "unknown STORAGE_BACKEND `{}`",
                other
            ))),
        }
    }
}

fn required(name: &'static str) -> Result<String> {
    optional(name).ok_or(Error::MissingConfig(name))
}

// Empty values count as unset so a blank line in .env doesn't satisfy a requirement
fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_or<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match optional(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::InvalidConfig(format!("{} has an invalid value `{}`", name, raw))),
        None => Ok(default),
    }
}
