use anyhow::{Context, Result};
use nota_core::{Classifier, KeywordRule, KeywordTable};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::state::ensure_nota_home;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub remote: RemoteSection,
    #[serde(default)]
    pub classifier: ClassifierSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSection {
    /// CORS proxy that fetches receipt pages: `GET {proxy_url}?url=...`
    pub proxy_url: String,
    /// Base URL of the price store API (`/produtos`)
    pub api_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Ordered keyword rules; first matching category wins.
/// Empty means the built-in table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassifierSection {
    #[serde(default)]
    pub rules: Vec<KeywordRule>,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            remote: RemoteSection {
                proxy_url: "https://api-mercado-4p8h.onrender.com/proxy".to_string(),
                api_url: "https://api-mercado-4p8h.onrender.com".to_string(),
                timeout_secs: default_timeout_secs(),
            },
            classifier: ClassifierSection {
                rules: KeywordTable::default().rules().to_vec(),
            },
        }
    }
}

impl RemoteSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl ClassifierSection {
    pub fn classifier(&self) -> Classifier {
        if self.rules.is_empty() {
            Classifier::default()
        } else {
            Classifier::new(KeywordTable::new(self.rules.clone()))
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_nota_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    load_config_from(&config_path()?)
}

pub fn load_config_from(p: &Path) -> Result<Config> {
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn save_config_to(cfg: &Config, p: &Path) -> Result<()> {
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config_to(&Config::default(), &p)?;
    println!("Wrote {}", p.display());
    Ok(())
}
