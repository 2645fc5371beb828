use super::{types::ConverterConfig, ConfigError};

/// Validate configuration
/// Currently validates:
/// - At least one external process may run
/// - Process timeout is not 0
pub fn validate_config(config: &ConverterConfig) -> Result<(), ConfigError> {
    if config.concurrent_processes == 0 {
        return Err(ConfigError::ValidationError(
            "concurrent_processes must be at least 1".to_string(),
        ));
    }

    if config.process_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "process_timeout_secs cannot be 0".to_string(),
        ));
    }

    Ok(())
}
