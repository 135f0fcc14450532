use crate::config::types::{AccountConfig, Config, CrawlerConfig, OutputConfig};
use crate::ConfigError;
use url::Url;

/// Maximum page size accepted by the follower listing endpoint
const MAX_PAGE_SIZE: u32 = 100;

/// Upper bound on the inter-page delay (milliseconds)
const MAX_RATE_LIMIT_DELAY: u64 = 60_000;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_account_config(&config.account)?;
    validate_crawler_config(&config.crawler)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates account configuration
fn validate_account_config(config: &AccountConfig) -> Result<(), ConfigError> {
    validate_handle(&config.root_handle)?;

    let url = Url::parse(&config.service_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid service_url: {}", e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "service_url must use http or https, got '{}'",
            url.scheme()
        )));
    }

    if config.password_env.is_empty() {
        return Err(ConfigError::Validation(
            "password_env cannot be empty".to_string(),
        ));
    }

    if config.keyring_service.is_empty() {
        return Err(ConfigError::Validation(
            "keyring_service cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.page_size < 1 || config.page_size > MAX_PAGE_SIZE {
        return Err(ConfigError::Validation(format!(
            "page_size must be between 1 and {}, got {}",
            MAX_PAGE_SIZE, config.page_size
        )));
    }

    if config.checkpoint_interval < 1 {
        return Err(ConfigError::Validation(format!(
            "checkpoint_interval must be >= 1, got {}",
            config.checkpoint_interval
        )));
    }

    if config.rate_limit_delay > MAX_RATE_LIMIT_DELAY {
        return Err(ConfigError::Validation(format!(
            "rate_limit_delay must be <= {}ms, got {}ms",
            MAX_RATE_LIMIT_DELAY, config.rate_limit_delay
        )));
    }

    for handle in &config.exemptions {
        if handle.trim().is_empty() {
            return Err(ConfigError::Validation(
                "exemptions cannot contain empty handles".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.master_path.is_empty() {
        return Err(ConfigError::Validation(
            "master_path cannot be empty".to_string(),
        ));
    }

    if config.log_path.is_empty() {
        return Err(ConfigError::Validation(
            "log_path cannot be empty".to_string(),
        ));
    }

    if config.master_path == config.log_path {
        return Err(ConfigError::Validation(format!(
            "master_path and log_path must differ, both are '{}'",
            config.master_path
        )));
    }

    Ok(())
}

/// Validates a handle (domain-like, e.g. "alice.bsky.social")
fn validate_handle(handle: &str) -> Result<(), ConfigError> {
    if handle.is_empty() {
        return Err(ConfigError::Validation(
            "root_handle cannot be empty".to_string(),
        ));
    }

    if !handle
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "Handle '{}' contains invalid characters",
            handle
        )));
    }

    if handle.starts_with('.') || handle.ends_with('.') || handle.contains("..") {
        return Err(ConfigError::Validation(format!(
            "Handle '{}' has a misplaced dot",
            handle
        )));
    }

    if !handle.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Handle '{}' must contain at least one dot (e.g., 'alice.bsky.social')",
            handle
        )));
    }

    Ok(())
}
