//! Application configuration

pub mod articles;
pub mod profiles;
pub mod prompts;

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use profiles::{Profiles, RequestProfile};
pub use prompts::builtin as prompts_builtin;

const DEFAULT_SESSION_IDLE_SECS: u64 = 30 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub completion: CompletionConfig,
    pub data_dir: PathBuf,
    pub profiles: Profiles,
    /// Chat and plan sessions unused this long are dropped
    pub session_idle_secs: u64,
}

/// Where and how to reach the completion service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Base URL, e.g. `https://api.deepseek.com/v1`
    pub base_url: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub model: String,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.deepseek.com/v1".into(),
            api_key: None,
            model: "deepseek-chat".into(),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = CompletionConfig::default();

        let profiles = match env::var("LITTLE_SPOON_PROFILES") {
            Ok(path) => Profiles::from_file(&PathBuf::from(path))?,
            Err(_) => Profiles::default(),
        };

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".into()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            completion: CompletionConfig {
                base_url: env::var("COMPLETION_BASE_URL").unwrap_or(defaults.base_url),
                api_key: env::var("COMPLETION_API_KEY").ok(),
                model: env::var("COMPLETION_MODEL").unwrap_or(defaults.model),
            },
            data_dir: env::var("LITTLE_SPOON_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data")),
            profiles,
            session_idle_secs: env::var("LITTLE_SPOON_SESSION_IDLE_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_SESSION_IDLE_SECS),
        })
    }
}
