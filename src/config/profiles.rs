//! Request profiles for the two completion flows
//!
//! Chat and plan generation talk to the same service with different sampling
//! settings and deadlines. Both have built-in defaults; a TOML file can
//! override any field.
//!
//! # Example
//!
//! ```toml
//! [chat]
//! timeout_secs = 25
//!
//! [plan]
//! temperature = 0.2
//! max_tokens = 2000
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Sampling parameters and deadline for one kind of request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestProfile {
    /// Model override; falls back to the service default when unset
    #[serde(default)]
    pub model: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    #[serde(default = "default_penalty")]
    pub presence_penalty: f32,
    #[serde(default = "default_penalty")]
    pub frequency_penalty: f32,
    pub timeout_secs: u64,
}

fn default_penalty() -> f32 {
    0.1
}

impl RequestProfile {
    /// Conversational settings: short answers, some variety
    pub fn chat() -> Self {
        Self {
            model: None,
            temperature: 0.7,
            max_tokens: 500,
            presence_penalty: default_penalty(),
            frequency_penalty: default_penalty(),
            timeout_secs: 20,
        }
    }

    /// Plan generation: long structured output, low temperature
    pub fn plan() -> Self {
        Self {
            model: None,
            temperature: 0.3,
            max_tokens: 1500,
            presence_penalty: default_penalty(),
            frequency_penalty: default_penalty(),
            timeout_secs: 30,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profiles {
    pub chat: RequestProfile,
    pub plan: RequestProfile,
}

impl Default for Profiles {
    fn default() -> Self {
        Self {
            chat: RequestProfile::chat(),
            plan: RequestProfile::plan(),
        }
    }
}

/// Partial profile as written in a TOML file
#[derive(Debug, Default, Deserialize)]
struct ProfileOverride {
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    presence_penalty: Option<f32>,
    frequency_penalty: Option<f32>,
    timeout_secs: Option<u64>,
}

impl ProfileOverride {
    fn apply(self, base: RequestProfile) -> RequestProfile {
        RequestProfile {
            model: self.model.or(base.model),
            temperature: self.temperature.unwrap_or(base.temperature),
            max_tokens: self.max_tokens.unwrap_or(base.max_tokens),
            presence_penalty: self.presence_penalty.unwrap_or(base.presence_penalty),
            frequency_penalty: self.frequency_penalty.unwrap_or(base.frequency_penalty),
            timeout_secs: self.timeout_secs.unwrap_or(base.timeout_secs),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ProfilesFile {
    #[serde(default)]
    chat: ProfileOverride,
    #[serde(default)]
    plan: ProfileOverride,
}

impl Profiles {
    /// Load overrides from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse overrides from a TOML string, filling gaps with defaults
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let file: ProfilesFile = toml::from_str(content)?;
        let defaults = Self::default();
        let profiles = Self {
            chat: file.chat.apply(defaults.chat),
            plan: file.plan.apply(defaults.plan),
        };
        profiles.check()?;
        Ok(profiles)
    }

    fn check(&self) -> Result<(), ConfigError> {
        for (name, profile) in [("chat", &self.chat), ("plan", &self.plan)] {
            if profile.timeout_secs == 0 {
                return Err(ConfigError::Invalid(format!("{name}.timeout_secs must be > 0")));
            }
            if profile.max_tokens == 0 {
                return Err(ConfigError::Invalid(format!("{name}.max_tokens must be > 0")));
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid profile: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let profiles = Profiles::default();
        assert_eq!(profiles.chat.max_tokens, 500);
        assert_eq!(profiles.plan.max_tokens, 1500);
        assert!(profiles.plan.temperature < profiles.chat.temperature);
        assert!(profiles.plan.timeout() > profiles.chat.timeout());
    }

    #[test]
    fn test_partial_override() {
        let toml_content = r#"
[chat]
timeout_secs = 25

[plan]
temperature = 0.2
model = "deepseek-reasoner"
"#;

        let profiles = Profiles::from_toml(toml_content).unwrap();
        assert_eq!(profiles.chat.timeout_secs, 25);
        assert_eq!(profiles.chat.max_tokens, 500);
        assert_eq!(profiles.plan.temperature, 0.2);
        assert_eq!(profiles.plan.model.as_deref(), Some("deepseek-reasoner"));
        assert_eq!(profiles.plan.max_tokens, 1500);
    }

    #[test]
    fn test_empty_file_is_defaults() {
        assert_eq!(Profiles::from_toml("").unwrap(), Profiles::default());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = Profiles::from_toml("[chat]\ntimeout_secs = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
