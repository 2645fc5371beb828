use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::ConverterConfig, ConfigError};

/// Unprefixed environment variables read as overrides.
const RAW_ENV_KEYS: &[&str] = &[
    "FFMPEG_PATH",
    "FFPROBE_PATH",
    "CONCURRENT_PROCESSES",
    "PROCESS_TIMEOUT_SECS",
];

/// Prefix accepted for every configuration key.
const ENV_PREFIX: &str = "STICKERIFY_";

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<ConverterConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    extract(Figment::new().merge(Toml::file(path)))
}

/// Load configuration from defaults and environment variables only
pub fn load_config_from_env() -> Result<ConverterConfig, ConfigError> {
    extract(Figment::new())
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<ConverterConfig, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

fn extract(figment: Figment) -> Result<ConverterConfig, ConfigError> {
    figment
        .merge(Env::raw().only(RAW_ENV_KEYS))
        .merge(Env::prefixed(ENV_PREFIX))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
concurrent_processes = 2
process_timeout_secs = 30
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.concurrent_processes, 2);
        assert_eq!(config.process_timeout_secs, 30);
        assert_eq!(config.ffmpeg_path, None);
    }

    #[test]
    fn test_load_config_from_str_wrong_type() {
        let result = load_config_from_str("concurrent_processes = \"many\"");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/stickerify.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_config_from_file() {
        Jail::expect_with(|_jail| {
            let mut temp_file = NamedTempFile::new().unwrap();
            writeln!(
                temp_file,
                r#"
ffmpeg_path = "/opt/ffmpeg/bin/ffmpeg"
concurrent_processes = 3
"#
            )
            .unwrap();

            let config = load_config(temp_file.path()).unwrap();
            assert_eq!(
                config.ffmpeg_path,
                Some(PathBuf::from("/opt/ffmpeg/bin/ffmpeg"))
            );
            assert_eq!(config.concurrent_processes, 3);
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides() {
        Jail::expect_with(|jail| {
            jail.set_env("FFMPEG_PATH", "/custom/ffmpeg");
            jail.set_env("CONCURRENT_PROCESSES", "2");
            jail.set_env("STICKERIFY_PROCESS_TIMEOUT_SECS", "15");

            let config = load_config_from_env().unwrap();
            assert_eq!(config.ffmpeg_path, Some(PathBuf::from("/custom/ffmpeg")));
            assert_eq!(config.concurrent_processes, 2);
            assert_eq!(config.process_timeout_secs, 15);
            Ok(())
        });
    }

    #[test]
    fn test_env_file_precedence() {
        Jail::expect_with(|jail| {
            jail.create_file("stickerify.toml", "concurrent_processes = 6")?;
            jail.set_env("CONCURRENT_PROCESSES", "1");

            let config = load_config(Path::new("stickerify.toml")).unwrap();
            assert_eq!(config.concurrent_processes, 1);
            Ok(())
        });
    }

    #[test]
    fn test_negative_concurrency_is_parse_error() {
        Jail::expect_with(|jail| {
            jail.set_env("CONCURRENT_PROCESSES", "-1");

            let result = load_config_from_env();
            assert!(matches!(result, Err(ConfigError::ParseError(_))));
            Ok(())
        });
    }

    #[test]
    fn test_non_numeric_concurrency_is_parse_error() {
        Jail::expect_with(|jail| {
            jail.set_env("CONCURRENT_PROCESSES", "lots");

            let result = load_config_from_env();
            assert!(matches!(result, Err(ConfigError::ParseError(_))));
            Ok(())
        });
    }
}
