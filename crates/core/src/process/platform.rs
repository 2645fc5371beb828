//! Platform dependent command names and paths.

/// Command used to locate an executable on PATH.
#[cfg(windows)]
pub const FIND_EXECUTABLE: &str = "where";
#[cfg(not(windows))]
pub const FIND_EXECUTABLE: &str = "which";

/// Null device used as the output of a first encoding pass.
#[cfg(windows)]
pub const NULL_DEVICE: &str = "NUL";
#[cfg(not(windows))]
pub const NULL_DEVICE: &str = "/dev/null";
