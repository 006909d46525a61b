//! Constants shared by the runtime services.
//!
//! Centralizes escape sequences, environment variable names, and the
//! observable failure-message formats so downstream log scraping has one
//! place to look.

// ============================================================================
// Terminal Styles
// ============================================================================

/// Dim, used for trace output.
pub const DIM: &str = "\x1b[2m";

/// Cyan, used for debug output.
pub const CYAN: &str = "\x1b[36m";

/// Bright green, used for info output.
pub const GREEN_BOLD: &str = "\x1b[1;32m";

/// Yellow/gold, used for warnings.
pub const YELLOW_BOLD: &str = "\x1b[1;33m";

/// Bright red, used for errors.
pub const RED_BOLD: &str = "\x1b[1;31m";

/// Magenta, used for fatal diagnostics.
pub const MAGENTA_BOLD: &str = "\x1b[1;35m";

/// Reset all attributes.
pub const RESET: &str = "\x1b[0m";

// ============================================================================
// Environment Variables
// ============================================================================

/// Initial log threshold for the user-facing logger.
pub const LOG_LEVEL_ENV: &str = "SKIT_LOG_LEVEL";

/// Colour mode override (`auto`, `always`, `never`).
pub const COLOR_ENV: &str = "SKIT_COLOR";

/// Conventional opt-out for ANSI colours.
pub const NO_COLOR_ENV: &str = "NO_COLOR";

/// Filter for crate-internal tracing output.
pub const TRACE_ENV: &str = "SKIT_TRACE";

/// Default tracing filter when `SKIT_TRACE` is unset.
pub const DEFAULT_TRACE_FILTER: &str = "warn";

// ============================================================================
// Privilege Elevation
// ============================================================================

/// Program used to evaluate probes in the elevated execution context.
pub const ELEVATION_PROGRAM: &str = "sudo";

/// Non-interactive flag so an elevated probe never blocks on a password prompt.
pub const ELEVATION_NON_INTERACTIVE_FLAG: &str = "-n";

/// Program used for filesystem probes under elevation.
pub const TEST_PROGRAM: &str = "test";

// ============================================================================
// Invocation Context
// ============================================================================

/// Prompt shown before terminating an interactive session.
pub const ACKNOWLEDGE_PROMPT: &str = "Press Enter to continue...";

// ============================================================================
// Failure Messages
// ============================================================================

/// Recorded when a check subject has no value.
pub const UNDEFINED_MSG: &str = "variable is undefined";

/// Recorded when a regular file is missing.
pub const FILE_MISSING_MSG: &str = "file does not exist";

/// Recorded when a directory is missing.
pub const DIR_MISSING_MSG: &str = "directory does not exist";

/// Recorded when a path is missing or lacks execute permission.
pub const NOT_EXECUTABLE_MSG: &str = "file is not executable";

/// Recorded when a user account cannot be resolved.
pub const USER_MISSING_MSG: &str = "user does not exist";

/// Recorded when a group cannot be resolved.
pub const GROUP_MISSING_MSG: &str = "group does not exist";

/// Recorded when a command is not found on `PATH`.
pub const COMMAND_MISSING_MSG: &str = "command not found";

/// Recorded when the service manager does not know a unit.
pub const SERVICE_MISSING_MSG: &str = "service does not exist";

/// Recorded when a range check subject is not numeric.
pub const NOT_A_NUMBER_MSG: &str = "not a number";

/// Recorded for malformed IPv4 literals.
pub const INVALID_IPV4_MSG: &str = "invalid IPv4 address";

/// Recorded for malformed boolean literals.
pub const INVALID_BOOLEAN_MSG: &str = "invalid boolean";

/// Recorded for malformed positive integer literals.
pub const INVALID_POSITIVE_INT_MSG: &str = "invalid positive integer";
