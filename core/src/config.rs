use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const ENV_SUPABASE_URL: &str = "GUARDIAN_SUPABASE_URL";
const ENV_SUPABASE_KEY: &str = "GUARDIAN_SUPABASE_KEY";
const ENV_AI_ENDPOINT: &str = "GUARDIAN_AI_ENDPOINT";
const ENV_AI_API_KEY: &str = "GUARDIAN_AI_API_KEY";

fn default_ai_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_bucket() -> String {
    "proofs".to_string()
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Settings {
    /// Stable id of the local user; generated on first run and reused so
    /// offline data stays attached to one profile.
    #[serde(default = "Uuid::new_v4")]
    pub local_user_id: Uuid,

    #[serde(default)]
    pub supabase_url: String,
    #[serde(default)]
    pub supabase_key: String,

    #[serde(default)]
    pub ai_endpoint: String,
    #[serde(default)]
    pub ai_api_key: String,
    #[serde(default = "default_ai_model")]
    pub ai_model: String,

    #[serde(default = "default_bucket")]
    pub storage_bucket: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            local_user_id: Uuid::new_v4(),
            supabase_url: String::new(),
            supabase_key: String::new(),
            ai_endpoint: String::new(),
            ai_api_key: String::new(),
            ai_model: default_ai_model(),
            storage_bucket: default_bucket(),
        }
    }
}

impl Settings {
    /// Remote persistence is configured; otherwise the local file store is
    /// used.
    pub fn has_remote_store(&self) -> bool {
        !self.supabase_url.trim().is_empty() && !self.supabase_key.trim().is_empty()
    }

    /// Remote proof review is configured; otherwise the offline verifier
    /// accepts submissions unreviewed.
    pub fn has_ai(&self) -> bool {
        !self.ai_endpoint.trim().is_empty() && !self.ai_api_key.trim().is_empty()
    }
}

pub fn config_dir() -> Result<PathBuf> {
    let home_dir = dirs::home_dir().ok_or_else(|| anyhow!("Could not determine home directory"))?;
    Ok(home_dir.join(".goalguardian"))
}

pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
}

/// Load `~/.goalguardian/config.json`, creating it with defaults on first
/// run, then let environment variables override the stored values.
pub fn load_settings() -> Result<Settings> {
    let dir = config_dir()?;
    fs::create_dir_all(&dir)?;
    let path = dir.join("config.json");

    let mut settings: Settings = if path.exists() {
        let data = fs::read_to_string(&path)?;
        serde_json::from_str(&data)?
    } else {
        let settings = Settings::default();
        fs::write(&path, serde_json::to_string_pretty(&settings)?)?;
        settings
    };

    apply_env_overrides(&mut settings);
    Ok(settings)
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn apply_env_overrides(settings: &mut Settings) {
    if let Some(url) = env_var(ENV_SUPABASE_URL) {
        settings.supabase_url = url;
    }
    if let Some(key) = env_var(ENV_SUPABASE_KEY) {
        settings.supabase_key = key;
    }
    if let Some(endpoint) = env_var(ENV_AI_ENDPOINT) {
        settings.ai_endpoint = endpoint;
    }
    if let Some(key) = env_var(ENV_AI_API_KEY) {
        settings.ai_api_key = key;
    }
}
