//! External process execution.
//!
//! Every external program (ffmpeg, ffprobe, the PATH lookup) runs through a
//! [`CommandRunner`]. The production [`ProcessExecutor`] bounds how many
//! processes run at once with a counting semaphore, drains output on
//! dedicated reader tasks and kills processes that exceed their timeout.

mod capabilities;
mod error;
mod executor;
mod locator;
mod platform;

pub use capabilities::EncoderCapabilities;
pub use error::ProcessError;
pub use executor::{CommandRunner, ProcessExecutor};
pub use locator::{EncoderLocator, EncoderPath, Toolchain};
pub use platform::{FIND_EXECUTABLE, NULL_DEVICE};
