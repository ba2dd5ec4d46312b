//! Default configuration values

/// Source root relative to the working directory
pub const PARENT_SRC_DIR: &str = "src/tp";

/// Install root name under the source root
pub const INSTALL_DIR_NAME: &str = "install";

/// CMake executable when neither `--cmake` nor `CMAKE` is set
pub const CMAKE_COMMAND: &str = "cmake";

/// Environment variable naming the CMake executable
pub const CMAKE_ENV: &str = "CMAKE";

/// Tools whose absence is worth a warning before a run
pub const PREFLIGHT_TOOLS: &[&str] = &["git"];
