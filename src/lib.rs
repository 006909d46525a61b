//! Scriptkit is a small runtime support library for shell-driven automation.
//! It provides leveled diagnostic logging, a deferred validation-check
//! accumulator, detection of how the current script was brought into
//! execution, and a terminal menu for single-choice selection. The `skit`
//! binary exposes each service to shell scripts.

/// Deferred validation checks.
pub mod check;

/// CLI interface.
pub mod cli;

/// Settings resolution.
pub mod config;

/// Shared escape sequences, environment names and message formats.
pub mod constants;

/// Error handling.
pub mod error;

/// Invocation-context detection.
pub mod invocation;

/// Leveled diagnostic logging.
pub mod logger;

/// Terminal menu selection.
pub mod menu;
