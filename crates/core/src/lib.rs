pub mod config;
pub mod media;
pub mod process;
pub mod testing;

pub use config::{
    load_config, load_config_from_env, load_config_from_str, validate_config, ConfigError,
    ConverterConfig,
};
pub use media::{
    Conversion, ConversionResult, DetectedMedia, MediaCategory, MediaConverter, MediaError,
};
pub use process::{
    CommandRunner, EncoderCapabilities, EncoderPath, ProcessError, ProcessExecutor, Toolchain,
};
