// src/config.rs
use crate::errors::SkinsightError;

/// Env var names tried in order for the Gemini key. The EXPO_ fallback keeps
/// deployments that reuse the mobile app's environment working unchanged.
const GEMINI_KEY_VARS: [&str; 3] = [
    "GEMINI_API_KEY",
    "GOOGLE_AI_KEY",
    "EXPO_PUBLIC_GOOGLE_AI_KEY",
];

const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const OPENROUTER_BASE_URL: &str = "https://openrouter.ai";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Gemini,
    OpenRouter,
}

impl Provider {
    pub fn parse(value: &str) -> Result<Self, SkinsightError> {
        match value.to_ascii_lowercase().as_str() {
            "gemini" => Ok(Provider::Gemini),
            "openrouter" => Ok(Provider::OpenRouter),
            other => Err(SkinsightError::Config(format!(
                "unknown provider '{}', expected 'gemini' or 'openrouter'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: String,
    pub redis_url: String,
    pub provider: Provider,
    pub model: String,
    pub gemini_api_key: Option<String>,
    pub openrouter_api_key: Option<String>,
    pub gemini_base_url: String,
    pub openrouter_base_url: String,
}

impl Config {
    /// Loads configuration from the environment. A `.env` file is honoured
    /// for local development.
    pub fn from_env() -> Result<Self, SkinsightError> {
        dotenvy::dotenv().ok();

        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
        let model =
            std::env::var("SKINSIGHT_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let provider = match std::env::var("SKINSIGHT_PROVIDER") {
            Ok(value) => Provider::parse(&value)?,
            Err(_) => Provider::Gemini,
        };

        let gemini_api_key = lookup_any(&GEMINI_KEY_VARS);
        let openrouter_api_key = std::env::var("OPENROUTER_API_KEY")
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());

        match provider {
            Provider::Gemini => {
                let key = gemini_api_key.as_deref().ok_or_else(|| {
                    SkinsightError::Config(
                        "Gemini API key is missing; set GEMINI_API_KEY".to_string(),
                    )
                })?;
                validate_gemini_key(key)?;
            }
            Provider::OpenRouter => {
                if openrouter_api_key.is_none() {
                    return Err(SkinsightError::Config(
                        "OpenRouter API key is missing; set OPENROUTER_API_KEY".to_string(),
                    ));
                }
            }
        }

        Ok(Self {
            bind_address,
            redis_url,
            provider,
            model,
            gemini_api_key,
            openrouter_api_key,
            gemini_base_url: std::env::var("GEMINI_API_URL")
                .unwrap_or_else(|_| GEMINI_BASE_URL.to_string()),
            openrouter_base_url: std::env::var("OPENROUTER_API_URL")
                .unwrap_or_else(|_| OPENROUTER_BASE_URL.to_string()),
        })
    }
}

fn lookup_any(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

/// Rejects unset placeholders and keys that cannot be a Google AI key.
pub fn validate_gemini_key(key: &str) -> Result<(), SkinsightError> {
    if key.is_empty() || key == "your_google_ai_key_here" {
        return Err(SkinsightError::Config(
            "Gemini API key is missing; set GEMINI_API_KEY".to_string(),
        ));
    }
    if !key.starts_with("AIza") {
        return Err(SkinsightError::Config(
            "Gemini API key format is invalid (expected it to start with 'AIza')".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_parse_is_case_insensitive() {
        assert_eq!(Provider::parse("Gemini").unwrap(), Provider::Gemini);
        assert_eq!(Provider::parse("OPENROUTER").unwrap(), Provider::OpenRouter);
        assert!(Provider::parse("claude").is_err());
    }

    #[test]
    fn gemini_key_validation() {
        assert!(validate_gemini_key("AIzaSyExample123").is_ok());
        assert!(validate_gemini_key("").is_err());
        assert!(validate_gemini_key("your_google_ai_key_here").is_err());
        assert!(validate_gemini_key("sk-not-a-google-key").is_err());
    }
}
