use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Intake envelope is non-empty
/// - Ticker interval/step are non-zero and the cap leaves room for completion
/// - Service URL is http(s)
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.intake.accepted_types.is_empty() {
        return Err(ConfigError::ValidationError(
            "intake.accepted_types cannot be empty".to_string(),
        ));
    }
    if config.intake.max_size_bytes == 0 {
        return Err(ConfigError::ValidationError(
            "intake.max_size_bytes cannot be 0".to_string(),
        ));
    }

    let conversion = &config.conversion;
    if conversion.tick_interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "conversion.tick_interval_ms cannot be 0".to_string(),
        ));
    }
    if conversion.tick_step == 0 {
        return Err(ConfigError::ValidationError(
            "conversion.tick_step cannot be 0".to_string(),
        ));
    }
    if !(1..=99).contains(&conversion.progress_cap) {
        return Err(ConfigError::ValidationError(format!(
            "conversion.progress_cap must be between 1 and 99, got {}",
            conversion.progress_cap
        )));
    }
    if !(conversion.service_url.starts_with("http://")
        || conversion.service_url.starts_with("https://"))
    {
        return Err(ConfigError::ValidationError(format!(
            "conversion.service_url must be an http(s) URL: {}",
            conversion.service_url
        )));
    }

    Ok(())
}
