//! Conversion dispatcher.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, field, info, instrument, warn, Span};

use super::animation;
use super::compliance::{image_compliant, video_compliant};
use super::error::MediaError;
use super::image::ImageConverter;
use super::mime;
use super::probe::{MediaProbe, MediaProber};
use super::types::{Conversion, ConversionResult, MediaCategory};
use super::video::VideoConverter;
use crate::config::{validate_config, ConfigError, ConverterConfig};
use crate::process::{CommandRunner, EncoderCapabilities, ProcessExecutor, Toolchain};

/// Turns arbitrary input files into Telegram stickers.
///
/// Cheap to clone; clones share the runner, and with it the process limit.
pub struct MediaConverter<R: CommandRunner + ?Sized = ProcessExecutor> {
    runner: Arc<R>,
    toolchain: Arc<Toolchain>,
    temp_dir: PathBuf,
}

impl<R: CommandRunner + ?Sized> Clone for MediaConverter<R> {
    fn clone(&self) -> Self {
        Self {
            runner: Arc::clone(&self.runner),
            toolchain: Arc::clone(&self.toolchain),
            temp_dir: self.temp_dir.clone(),
        }
    }
}

impl MediaConverter<ProcessExecutor> {
    /// Builds a converter backed by real processes.
    ///
    /// Binary locations are resolved here, once. A binary that cannot be
    /// found is logged and does not fail construction.
    pub async fn from_config(config: &ConverterConfig) -> Result<Self, ConfigError> {
        validate_config(config)?;

        let executor = ProcessExecutor::from_config(config);
        let toolchain = Toolchain::locate(&executor, config).await;

        let capabilities = EncoderCapabilities::detect(&executor, &toolchain.ffmpeg).await;
        if !capabilities.supports_stickers() {
            warn!(
                ffmpeg = %toolchain.ffmpeg.program(),
                libvpx_vp9 = capabilities.libvpx_vp9,
                libwebp = capabilities.libwebp,
                "ffmpeg lacks encoders needed for stickers"
            );
        }

        Ok(Self::new(Arc::new(executor), toolchain, config))
    }

    /// Number of external processes currently running.
    pub fn active_processes(&self) -> usize {
        self.runner.active_processes()
    }

    pub fn max_concurrent(&self) -> usize {
        self.runner.max_concurrent()
    }
}

impl<R: CommandRunner + ?Sized> MediaConverter<R> {
    pub fn new(runner: Arc<R>, toolchain: Toolchain, config: &ConverterConfig) -> Self {
        Self {
            runner,
            toolchain: Arc::new(toolchain),
            temp_dir: config.temp_dir.clone(),
        }
    }

    pub fn toolchain(&self) -> &Toolchain {
        &self.toolchain
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// Converts `input` into a sticker.
    ///
    /// A converted file belongs to the caller, who must delete it once done.
    /// Dropping the returned future kills any running encoder and removes
    /// partial outputs.
    #[instrument(skip(self, input), fields(input = %input.display(), mime_type = field::Empty))]
    pub async fn convert(&self, input: &Path) -> ConversionResult {
        let result = self.dispatch(input).await;

        match &result {
            Ok(Conversion::NoConversionNeeded) => debug!("The file doesn't need conversion"),
            Ok(Conversion::Converted(path)) => {
                info!(output = %path.display(), "Conversion completed")
            }
            Err(e) => warn!(kind = e.kind(), error = %e, "Conversion failed"),
        }

        result
    }

    // Videos are checked before images so GIFs take the video path.
    async fn dispatch(&self, input: &Path) -> ConversionResult {
        let detected = mime::detect(input).await?;
        Span::current().record("mime_type", detected.mime_type);
        debug!(category = ?detected.category, "Detected media type");

        match detected.category {
            MediaCategory::Video => {
                let (probe, size) = self.inspect(input).await?;
                if video_compliant(&probe, size) {
                    return Ok(Conversion::NoConversionNeeded);
                }

                VideoConverter::new(&*self.runner, &self.toolchain.ffmpeg, &self.temp_dir)
                    .convert(input, &probe)
                    .await
            }
            MediaCategory::Animation => animation::validate(input, detected.mime_type).await,
            MediaCategory::Image => {
                let (probe, size) = self.inspect(input).await?;
                if image_compliant(&probe, detected.mime_type, size) {
                    return Ok(Conversion::NoConversionNeeded);
                }

                ImageConverter::new(&*self.runner, &self.toolchain.ffmpeg, &self.temp_dir)
                    .convert(input)
                    .await
            }
            MediaCategory::Unsupported => Err(MediaError::unsupported(detected.mime_type)),
        }
    }

    async fn inspect(&self, input: &Path) -> Result<(MediaProbe, u64), MediaError> {
        let probe = MediaProber::new(&*self.runner, &self.toolchain.ffprobe)
            .probe(input)
            .await?;
        let size = tokio::fs::metadata(input)
            .await
            .map_err(|e| MediaError::file_operation("inspect", input, e))?
            .len();

        debug!(
            width = probe.width(),
            height = probe.height(),
            codec = %probe.video.codec,
            format = %probe.format_name,
            size,
            "Probed media"
        );
        Ok((probe, size))
    }
}
