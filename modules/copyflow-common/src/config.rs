use anyhow::{Context, Result};

use crate::text::truncate_to_char_boundary;

/// Secrets and endpoint settings loaded from environment variables.
/// Personas, retry budgets, and output locations live in the TOML FileConfig.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub dify_base_url: String,
    pub dify_user: String,

    // One Dify application per stage
    pub scenario_generator_key: Option<String>,
    pub scenario_validator_key: Option<String>,
    pub content_generator_key: Option<String>,
    pub content_validator_key: Option<String>,
    pub product_recommender_key: Option<String>,
    pub content_rewriter_key: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            dify_base_url: std::env::var("DIFY_BASE_URL")
                .context("DIFY_BASE_URL environment variable is required")?,
            dify_user: std::env::var("DIFY_USER").unwrap_or_else(|_| "copyflow".to_string()),
            scenario_generator_key: optional_env("DIFY_SCENARIO_GENERATOR_KEY"),
            scenario_validator_key: optional_env("DIFY_SCENARIO_VALIDATOR_KEY"),
            content_generator_key: optional_env("DIFY_CONTENT_GENERATOR_KEY"),
            content_validator_key: optional_env("DIFY_CONTENT_VALIDATOR_KEY"),
            product_recommender_key: optional_env("DIFY_PRODUCT_RECOMMENDER_KEY"),
            content_rewriter_key: optional_env("DIFY_CONTENT_REWRITER_KEY"),
        };

        config.log_keys();
        Ok(config)
    }

    fn log_keys(&self) {
        fn preview(val: &Option<String>) -> String {
            match val {
                Some(v) => format!("{}...({} chars)", truncate_to_char_boundary(v, 5), v.len()),
                None => "<not set>".to_string(),
            }
        }

        tracing::info!("Config loaded:");
        tracing::info!("  DIFY_BASE_URL: {}", self.dify_base_url);
        tracing::info!("  DIFY_USER: {}", self.dify_user);
        tracing::info!("  DIFY_SCENARIO_GENERATOR_KEY: {}", preview(&self.scenario_generator_key));
        tracing::info!("  DIFY_SCENARIO_VALIDATOR_KEY: {}", preview(&self.scenario_validator_key));
        tracing::info!("  DIFY_CONTENT_GENERATOR_KEY: {}", preview(&self.content_generator_key));
        tracing::info!("  DIFY_CONTENT_VALIDATOR_KEY: {}", preview(&self.content_validator_key));
        tracing::info!("  DIFY_PRODUCT_RECOMMENDER_KEY: {}", preview(&self.product_recommender_key));
        tracing::info!("  DIFY_CONTENT_REWRITER_KEY: {}", preview(&self.content_rewriter_key));
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
