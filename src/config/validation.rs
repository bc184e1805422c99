use crate::config::types::{Config, FetchConfig, StorageConfig, UserAgentConfig, WorkerConfig};
use crate::ConfigError;
use url::Url;

const MAX_REDIRECT_CAP: usize = 50;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_worker_config(&config.worker)?;
    validate_fetch_config(&config.fetch)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_storage_config(&config.storage)?;
    Ok(())
}

/// Validates worker pacing
fn validate_worker_config(config: &WorkerConfig) -> Result<(), ConfigError> {
    if config.poll_interval_ms == 0 {
        return Err(ConfigError::Validation(
            "poll_interval_ms must be greater than 0".to_string(),
        ));
    }

    if config.throttle_ms == 0 {
        return Err(ConfigError::Validation(
            "throttle_ms must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

/// Validates HTTP limits
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.page_timeout_ms == 0 || config.probe_timeout_ms == 0 {
        return Err(ConfigError::Validation(format!(
            "timeouts must be greater than 0, got page={}ms probe={}ms",
            config.page_timeout_ms, config.probe_timeout_ms
        )));
    }

    for (name, cap) in [
        ("page_max_redirects", config.page_max_redirects),
        ("probe_max_redirects", config.probe_max_redirects),
    ] {
        if !(1..=MAX_REDIRECT_CAP).contains(&cap) {
            return Err(ConfigError::Validation(format!(
                "{} must be between 1 and {}, got {}",
                name, MAX_REDIRECT_CAP, cap
            )));
        }
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
