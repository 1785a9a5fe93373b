//! Process configuration.
//!
//! A single immutable [`AppConfig`] is built from environment variables at
//! process start and passed explicitly into the correlator, chunker, and
//! orchestrator constructors; core logic performs no ambient env lookups.
//! Validation runs before any scraping or correlation begins, so a missing
//! credential or an unparseable value fails the run up front.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Errors raised while building or validating configuration. Always fatal.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} has invalid value {value:?}")]
    InvalidValue { var: String, value: String },

    #[error("unknown LLM provider {0:?} (expected \"local\" or \"gemini\")")]
    UnknownProvider(String),

    #[error("GOOGLE_API_KEY is required when LLM_PROVIDER=gemini")]
    MissingGeminiKey,

    #[error("invalid filter rule on field {field:?} with pattern {pattern:?}: {reason}")]
    InvalidFilterRule {
        field: String,
        pattern: String,
        reason: String,
    },

    #[error("cannot read {what} file {path}: {reason}")]
    UnreadableFile {
        what: &'static str,
        path: String,
        reason: String,
    },

    #[error("prompt template is missing placeholder {{{0}}}")]
    MissingPlaceholder(String),
}

/// Which summarization backend to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    Local,
    Gemini,
}

impl FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(LlmProvider::Local),
            "gemini" => Ok(LlmProvider::Gemini),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }
}

/// Immutable run configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub provider: LlmProvider,
    /// Full generate endpoint of the local backend.
    pub llm_api_url: String,
    pub llm_model: String,
    pub google_api_key: Option<String>,
    pub gemini_model: String,
    /// Backend context-window budget in tokens.
    pub max_input_tokens: usize,
    /// Target chunk size in tokens.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in tokens.
    pub chunk_overlap: usize,
    /// Delay between successive backend calls; zero disables pacing.
    pub pacing: Duration,
    pub max_retries: u32,
    pub call_timeout: Duration,
    pub data_dir: PathBuf,
    pub filter_on: bool,
    /// Map-reduce combine recursion depth cap.
    pub recursion_cap: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Local,
            llm_api_url: "http://localhost:11434/api/generate".to_string(),
            llm_model: "mistral".to_string(),
            google_api_key: None,
            gemini_model: "gemini-1.5-flash".to_string(),
            max_input_tokens: 50_000,
            chunk_size: 40_000,
            chunk_overlap: 1_000,
            pacing: Duration::ZERO,
            max_retries: 3,
            call_timeout: Duration::from_secs(120),
            data_dir: PathBuf::from("data"),
            filter_on: true,
            recursion_cap: 3,
        }
    }
}

impl AppConfig {
    /// Build configuration from the environment, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut cfg = Self::default();

        if let Some(provider) = env_string("LLM_PROVIDER") {
            cfg.provider = provider.parse()?;
        }
        // Gemini is rate limited by default; local backends are not.
        if cfg.provider == LlmProvider::Gemini {
            cfg.pacing = Duration::from_secs(2);
        }

        if let Some(url) = env_string("LLM_API_URL") {
            cfg.llm_api_url = url;
        }
        if let Some(model) = env_string("LLM_MODEL") {
            cfg.llm_model = model;
        }
        cfg.google_api_key = env_string("GOOGLE_API_KEY");
        if let Some(model) = env_string("GEMINI_MODEL") {
            cfg.gemini_model = model;
        }

        if let Some(v) = env_parse::<usize>("MAX_INPUT_TOKENS")? {
            cfg.max_input_tokens = v;
        }
        if let Some(v) = env_parse::<usize>("CHUNK_SIZE")? {
            cfg.chunk_size = v;
        }
        if let Some(v) = env_parse::<usize>("CHUNK_OVERLAP")? {
            cfg.chunk_overlap = v;
        }
        if let Some(v) = env_parse::<u64>("LLM_PACING_SECS")? {
            cfg.pacing = Duration::from_secs(v);
        }
        if let Some(v) = env_parse::<u32>("LLM_MAX_RETRIES")? {
            cfg.max_retries = v;
        }
        if let Some(v) = env_parse::<u64>("LLM_TIMEOUT_SECS")? {
            cfg.call_timeout = Duration::from_secs(v);
        }
        if let Some(v) = env_parse::<usize>("SUMMARIZE_RECURSION_CAP")? {
            cfg.recursion_cap = v;
        }
        if let Some(dir) = env_string("DATA_DIR") {
            cfg.data_dir = PathBuf::from(dir);
        }
        if let Some(v) = env_parse::<bool>("FILTER_ON")? {
            cfg.filter_on = v;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    /// Check cross-field invariants. Called by [`AppConfig::from_env`];
    /// callers constructing a config by hand should call it too.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider == LlmProvider::Gemini
            && self.google_api_key.as_deref().unwrap_or("").is_empty()
        {
            return Err(ConfigError::MissingGeminiKey);
        }
        if self.max_input_tokens == 0 {
            return Err(ConfigError::InvalidValue {
                var: "MAX_INPUT_TOKENS".to_string(),
                value: "0".to_string(),
            });
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidValue {
                var: "CHUNK_SIZE".to_string(),
                value: "0".to_string(),
            });
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(ConfigError::InvalidValue {
                var: "CHUNK_OVERLAP".to_string(),
                value: format!("{} (must be below CHUNK_SIZE)", self.chunk_overlap),
            });
        }
        Ok(())
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match env_string(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                var: key.to_string(),
                value: raw,
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        AppConfig::default().validate().expect("defaults are valid");
    }

    #[test]
    fn gemini_without_key_is_fatal() {
        let cfg = AppConfig {
            provider: LlmProvider::Gemini,
            google_api_key: None,
            ..AppConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::MissingGeminiKey)
        ));
    }

    #[test]
    fn gemini_with_key_validates() {
        let cfg = AppConfig {
            provider: LlmProvider::Gemini,
            google_api_key: Some("key".to_string()),
            ..AppConfig::default()
        };
        cfg.validate().expect("key present");
    }

    #[test]
    fn overlap_must_stay_below_chunk_size() {
        let cfg = AppConfig {
            chunk_size: 100,
            chunk_overlap: 100,
            ..AppConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidValue { var, .. }) if var == "CHUNK_OVERLAP"
        ));
    }

    #[test]
    fn provider_parses_case_insensitively() {
        assert_eq!("LOCAL".parse::<LlmProvider>().unwrap(), LlmProvider::Local);
        assert_eq!("gemini".parse::<LlmProvider>().unwrap(), LlmProvider::Gemini);
        assert!("openai".parse::<LlmProvider>().is_err());
    }
}
