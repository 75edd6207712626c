use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};

use crate::state::ensure_zeno_home;

pub const GEMINI_KEY_ENV: &str = "GEMINI_API_KEY";
pub const OPENAI_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AuthState {
    pub gemini_api_key: Option<String>,
    pub openai_api_key: Option<String>,
}

impl AuthState {
    /// Environment wins over the stored key.
    pub fn gemini_key(&self) -> Option<String> {
        env_key(GEMINI_KEY_ENV).or_else(|| self.gemini_api_key.clone())
    }

    pub fn openai_key(&self) -> Option<String> {
        env_key(OPENAI_KEY_ENV).or_else(|| self.openai_api_key.clone())
    }
}

fn env_key(var: &str) -> Option<String> {
    std::env::var(var).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn auth_path() -> Result<std::path::PathBuf> {
    Ok(ensure_zeno_home()?.join("auth.json"))
}

pub fn load_auth() -> Result<AuthState> {
    let p = auth_path()?;
    if !p.exists() {
        return Ok(AuthState::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    serde_json::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn save_auth(auth: &AuthState) -> Result<()> {
    let p = auth_path()?;
    let s = serde_json::to_string_pretty(auth)?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

fn prompt_secret(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush().ok();
    let mut s = String::new();
    io::stdin().read_line(&mut s)?;
    Ok(s.trim().to_string())
}

pub fn gemini_paste_api_key() -> Result<()> {
    let mut auth = load_auth()?;
    let key = prompt_secret("Paste Gemini API key (starts with AIza)")?;
    check_gemini_key(&key)?;
    auth.gemini_api_key = Some(key);
    save_auth(&auth)?;
    println!("Saved Gemini API key to ~/.zeno/auth.json");
    Ok(())
}

pub fn openai_paste_api_key() -> Result<()> {
    let mut auth = load_auth()?;
    let key = prompt_secret("Paste OpenAI API key (starts with sk-)")?;
    check_openai_key(&key)?;
    auth.openai_api_key = Some(key);
    save_auth(&auth)?;
    println!("Saved OpenAI API key to ~/.zeno/auth.json");
    Ok(())
}

fn check_gemini_key(key: &str) -> Result<()> {
    if !key.starts_with("AIza") {
        bail!("key didn't look like a Gemini API key (expected prefix AIza)");
    }
    Ok(())
}

fn check_openai_key(key: &str) -> Result<()> {
    if !key.starts_with("sk-") {
        bail!("key didn't look like an OpenAI API key (expected prefix sk-)");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_prefix_checks() {
        assert!(check_gemini_key("AIzaSyExample").is_ok());
        assert!(check_gemini_key("sk-nope").is_err());
        assert!(check_openai_key("sk-proj-123").is_ok());
        assert!(check_openai_key("").is_err());
    }

    #[test]
    fn missing_fields_parse_as_none() {
        let a: AuthState = serde_json::from_str(r#"{"gemini_api_key":"AIzaX"}"#).unwrap();
        assert_eq!(a.gemini_api_key.as_deref(), Some("AIzaX"));
        assert_eq!(a.openai_api_key, None);
    }
}
