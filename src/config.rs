use std::env;

use crate::errors::AppError;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_daily_quota: u32,
    pub google_api_key: String,
    pub google_cse_id: String,
    pub web_daily_quota: u32,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "bookings.db".to_string()),
            gemini_api_key: env::var("GEMINI_API_KEY").unwrap_or_default(),
            gemini_model: env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| "gemini-1.5-flash".to_string()),
            gemini_daily_quota: env::var("GEMINI_DAILY_QUOTA")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(500),
            google_api_key: env::var("GOOGLE_API_KEY").unwrap_or_default(),
            google_cse_id: env::var("GOOGLE_CSE_ID").unwrap_or_default(),
            web_daily_quota: env::var("WEB_DAILY_QUOTA")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(100),
        }
    }

    pub fn require_llm(&self) -> Result<(), AppError> {
        if self.gemini_api_key.is_empty() {
            return Err(AppError::Config(
                "GEMINI_API_KEY must be set to answer document questions".to_string(),
            ));
        }
        Ok(())
    }

    pub fn require_web_search(&self) -> Result<(), AppError> {
        if self.google_api_key.is_empty() || self.google_cse_id.is_empty() {
            return Err(AppError::Config(
                "GOOGLE_API_KEY and GOOGLE_CSE_ID must be set for web search".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank_config() -> AppConfig {
        AppConfig {
            database_url: ":memory:".to_string(),
            gemini_api_key: String::new(),
            gemini_model: "gemini-1.5-flash".to_string(),
            gemini_daily_quota: 500,
            google_api_key: String::new(),
            google_cse_id: String::new(),
            web_daily_quota: 100,
        }
    }

    #[test]
    fn test_missing_credentials_are_config_errors() {
        let config = blank_config();
        assert!(matches!(config.require_llm(), Err(AppError::Config(_))));
        assert!(matches!(config.require_web_search(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_web_search_needs_both_keys() {
        let mut config = blank_config();
        config.google_api_key = "key".to_string();
        assert!(config.require_web_search().is_err());
        config.google_cse_id = "cse".to_string();
        assert!(config.require_web_search().is_ok());
    }
}
