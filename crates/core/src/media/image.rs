//! Static sticker conversion to lossless WebP.

use std::path::Path;
use tracing::debug;

use super::constraints::{MAX_IMAGE_FILE_SIZE, MAX_SIDE_LENGTH};
use super::error::{path_argument, MediaError};
use super::temp;
use super::types::ConversionResult;
use crate::process::{CommandRunner, EncoderPath};

/// Converts images through ffmpeg's libwebp encoder.
pub struct ImageConverter<'a, R: CommandRunner + ?Sized> {
    runner: &'a R,
    ffmpeg: &'a EncoderPath,
    temp_dir: &'a Path,
}

impl<'a, R: CommandRunner + ?Sized> ImageConverter<'a, R> {
    pub fn new(runner: &'a R, ffmpeg: &'a EncoderPath, temp_dir: &'a Path) -> Self {
        Self {
            runner,
            ffmpeg,
            temp_dir,
        }
    }

    /// Scales `input` so its longer side is 512 px and writes it as WebP.
    ///
    /// The result is deleted again if it does not fit the size limit.
    pub async fn convert(&self, input: &Path) -> ConversionResult {
        let input = path_argument(input)?;
        let output = temp::output_file(self.temp_dir, "webp")?;

        let command = match path_argument(&output) {
            Ok(destination) => webp_command(self.ffmpeg, input, destination),
            Err(e) => {
                temp::discard(output);
                return Err(e);
            }
        };
        debug!(command = ?command, "Converting image");
        if let Err(e) = self.runner.execute(&command).await {
            temp::discard(output);
            return Err(MediaError::from(e));
        }

        temp::finish(output, MAX_IMAGE_FILE_SIZE).await
    }
}

/// Scale filter fitting the longer side to the sticker size, keeping the aspect ratio.
fn scale_filter() -> String {
    format!(
        "scale='if(gte(iw,ih),{side},-1)':'if(gte(iw,ih),-1,{side})'",
        side = MAX_SIDE_LENGTH
    )
}

fn webp_command(ffmpeg: &EncoderPath, input: &str, output: &str) -> Vec<String> {
    let program = ffmpeg.program();
    let filter = scale_filter();

    [
        program.as_str(),
        "-v",
        "error",
        "-y",
        "-i",
        input,
        "-vf",
        filter.as_str(),
        "-c:v",
        "libwebp",
        "-lossless",
        "1",
        "-compression_level",
        "6",
        "-frames:v",
        "1",
        output,
    ]
    .iter()
    .map(|arg| arg.to_string())
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::Conversion;
    use crate::process::ProcessError;
    use crate::testing::{MockResponse, MockRunner};

    #[test]
    fn test_webp_command() {
        let ffmpeg = EncoderPath::resolved("ffmpeg", "/usr/bin/ffmpeg");
        let command = webp_command(&ffmpeg, "in.jpg", "/tmp/out.webp");

        assert_eq!(command[0], "/usr/bin/ffmpeg");
        assert!(command.contains(&"libwebp".to_string()));
        assert!(command.contains(&"scale='if(gte(iw,ih),512,-1)':'if(gte(iw,ih),-1,512)'".to_string()));
        let input = command.iter().position(|arg| arg == "-i").unwrap();
        assert_eq!(command[input + 1], "in.jpg");
        assert_eq!(command.last().map(String::as_str), Some("/tmp/out.webp"));
    }

    #[tokio::test]
    async fn test_convert_returns_output() {
        let dir = tempfile::tempdir().unwrap();
        let runner = MockRunner::new();
        runner
            .push_response("ffmpeg", MockResponse::write_output(vec![0u8; 2048]))
            .await;
        let ffmpeg = EncoderPath::unresolved("ffmpeg");

        let result = ImageConverter::new(&runner, &ffmpeg, dir.path())
            .convert(Path::new("input.png"))
            .await
            .unwrap();

        let Conversion::Converted(path) = result else {
            panic!("expected a converted file");
        };
        assert_eq!(path.extension().unwrap(), "webp");
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 2048);
    }

    #[tokio::test]
    async fn test_oversized_output_is_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let runner = MockRunner::new();
        runner
            .push_response(
                "ffmpeg",
                MockResponse::write_output(vec![0u8; MAX_IMAGE_FILE_SIZE as usize + 1]),
            )
            .await;
        let ffmpeg = EncoderPath::unresolved("ffmpeg");

        let err = ImageConverter::new(&runner, &ffmpeg, dir.path())
            .convert(Path::new("input.png"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            MediaError::OptimizationLimit { size: 512_001, limit: 512_000 }
        ));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_encoder_failure_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let runner = MockRunner::new();
        runner
            .push_response("ffmpeg", MockResponse::exit(1, ["Invalid data found"]))
            .await;
        let ffmpeg = EncoderPath::unresolved("ffmpeg");

        let err = ImageConverter::new(&runner, &ffmpeg, dir.path())
            .convert(Path::new("input.png"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            MediaError::ProcessExecution(ProcessError::NonZeroExit { .. })
        ));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_utf8_input_is_rejected_before_encoding() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        let runner = MockRunner::new();
        let ffmpeg = EncoderPath::unresolved("ffmpeg");
        let input = Path::new(OsStr::from_bytes(b"photo-\xff.png"));

        let err = ImageConverter::new(&runner, &ffmpeg, dir.path())
            .convert(input)
            .await
            .unwrap_err();

        assert!(matches!(err, MediaError::FileOperation { .. }));
        assert_eq!(runner.command_count().await, 0);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
