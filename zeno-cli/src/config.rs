use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use zeno_core::{EngineConfig, TimeWindow};

use crate::state::ensure_zeno_home;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub llm: LlmSection,
    #[serde(default)]
    pub engine: EngineSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmSection {
    /// "gemini", "openai", or "offline" (local scheduler only)
    pub provider: String,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    /// Day window, in fractional hours.
    pub open: f64,
    pub close: f64,
    pub mana_threshold: i32,
    pub timeout_secs: u64,
    pub default_rule: String,
}

impl Default for EngineSection {
    fn default() -> Self {
        let e = EngineConfig::default();
        Self {
            open: e.window.open,
            close: e.window.close,
            mana_threshold: e.mana_threshold,
            timeout_secs: e.remote_timeout.as_secs(),
            default_rule: e.default_rule,
        }
    }
}

impl EngineSection {
    pub fn to_engine_config(&self) -> Result<EngineConfig> {
        if !(self.open.is_finite() && self.close.is_finite()) || self.close - self.open < 1.0 {
            bail!(
                "engine window must span at least one hour (open = {}, close = {})",
                self.open,
                self.close
            );
        }
        if self.timeout_secs == 0 {
            bail!("engine.timeout_secs must be > 0");
        }
        Ok(EngineConfig {
            window: TimeWindow::new(self.open, self.close),
            mana_threshold: self.mana_threshold,
            remote_timeout: Duration::from_secs(self.timeout_secs),
            default_rule: self.default_rule.clone(),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm: LlmSection {
                provider: "gemini".to_string(),
                model: "gemini-2.0-flash".to_string(),
                base_url: "https://generativelanguage.googleapis.com".to_string(),
                temperature: 0.2,
            },
            engine: EngineSection::default(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_zeno_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    let p = config_path()?;
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).context("parse config.toml")
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}

pub fn show_config() -> Result<()> {
    let cfg = load_config()?;
    println!("# {}", config_path()?.display());
    print!("{}", toml::to_string_pretty(&cfg).context("serialize config")?);
    Ok(())
}
