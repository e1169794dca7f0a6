use crate::config::types::{Config, CrawlerConfig, ExtractionConfig, OutputConfig, SearchConfig};
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_extraction_config(&config.extraction)?;
    validate_search_config(&config.search)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.worker_count < 1 || config.worker_count > 500 {
        return Err(ConfigError::Validation(format!(
            "worker_count must be between 1 and 500, got {}",
            config.worker_count
        )));
    }

    if config.batch_size < 1 {
        return Err(ConfigError::Validation(format!(
            "batch_size must be >= 1, got {}",
            config.batch_size
        )));
    }

    if config.request_timeout < 1 {
        return Err(ConfigError::Validation(format!(
            "request_timeout must be >= 1s, got {}s",
            config.request_timeout
        )));
    }

    if config.probe_port == 0 {
        return Err(ConfigError::Validation(
            "probe_port cannot be 0".to_string(),
        ));
    }

    if config.max_body_size == 0 {
        return Err(ConfigError::Validation(
            "max_body_size must be >= 1 byte".to_string(),
        ));
    }

    if config.event_capacity < 1 {
        return Err(ConfigError::Validation(format!(
            "event_capacity must be >= 1, got {}",
            config.event_capacity
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates keyword extraction configuration
fn validate_extraction_config(config: &ExtractionConfig) -> Result<(), ConfigError> {
    if config.max_keywords_per_page < 1 {
        return Err(ConfigError::Validation(format!(
            "max_keywords_per_page must be >= 1, got {}",
            config.max_keywords_per_page
        )));
    }

    if config.min_keyword_length < 1 {
        return Err(ConfigError::Validation(format!(
            "min_keyword_length must be >= 1, got {}",
            config.min_keyword_length
        )));
    }

    Ok(())
}

/// Validates search configuration
fn validate_search_config(config: &SearchConfig) -> Result<(), ConfigError> {
    if config.max_results < 1 {
        return Err(ConfigError::Validation(format!(
            "max_results must be >= 1, got {}",
            config.max_results
        )));
    }

    if config.default_limit < 1 || config.default_limit > config.max_results {
        return Err(ConfigError::Validation(format!(
            "default_limit must be between 1 and max_results ({}), got {}",
            config.max_results, config.default_limit
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_worker_count_bounds() {
        let mut config = Config::default();
        config.crawler.worker_count = 0;
        assert!(validate(&config).is_err());

        config.crawler.worker_count = 501;
        assert!(validate(&config).is_err());

        config.crawler.worker_count = 500;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let mut config = Config::default();
        config.crawler.batch_size = 0;
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_zero_event_capacity_rejected() {
        let mut config = Config::default();
        config.crawler.event_capacity = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_blank_user_agent_rejected() {
        let mut config = Config::default();
        config.crawler.user_agent = "   ".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_default_limit_above_max_rejected() {
        let mut config = Config::default();
        config.search.default_limit = 200;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_empty_database_path_rejected() {
        let mut config = Config::default();
        config.output.database_path = String::new();
        assert!(validate(&config).is_err());
    }
}
