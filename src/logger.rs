//! Leveled diagnostic logging for scripts.
//!
//! A [`Logger`] owns its minimum-severity threshold and its sink. Filtered
//! calls ([`Logger::log`], [`Logger::log_at`]) emit `"{LEVEL} {message}"` only
//! when the message severity ranks at or above the threshold. The print
//! functions ([`Logger::info`] and friends) bypass the threshold and are meant
//! for direct user-facing status output.
use std::{
    fmt::Display,
    io::{self, IsTerminal, Write},
    str::FromStr,
};

use strum_macros::{AsRefStr, Display as StrumDisplay, EnumIter, EnumString};

use crate::constants::{CYAN, DIM, GREEN_BOLD, MAGENTA_BOLD, RED_BOLD, RESET, YELLOW_BOLD};
use crate::error::{Result, ScriptKitError};

/// Ordered diagnostic severity. Declaration order is rank order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    EnumString,
    AsRefStr,
    EnumIter,
    StrumDisplay,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Severity {
    /// Finest-grained tracing.
    Trace,
    /// Developer diagnostics.
    Debug,
    /// Normal progress messages.
    #[default]
    Info,
    /// Something looks wrong but execution continues.
    Warn,
    /// An operation failed.
    Error,
    /// The script cannot continue.
    Fatal,
}

impl Severity {
    /// Numeric rank, strictly increasing with severity.
    pub const fn rank(&self) -> u8 {
        *self as u8
    }

    /// Upper-case label used as the line prefix.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Fatal => "FATAL",
        }
    }

    /// ANSI style applied when colour output is enabled.
    pub const fn style(&self) -> &'static str {
        match self {
            Self::Trace => DIM,
            Self::Debug => CYAN,
            Self::Info => GREEN_BOLD,
            Self::Warn => YELLOW_BOLD,
            Self::Error => RED_BOLD,
            Self::Fatal => MAGENTA_BOLD,
        }
    }

    /// Parses a severity name case-insensitively.
    pub fn parse(name: &str) -> Result<Self> {
        Self::from_str(name.trim())
            .map_err(|_| ScriptKitError::InvalidLevel(name.to_string()))
    }
}

/// Whether styled output is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, AsRefStr, StrumDisplay)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ColorMode {
    /// Colour only when the sink is a terminal.
    #[default]
    Auto,
    /// Always emit ANSI styles.
    Always,
    /// Never emit ANSI styles.
    Never,
}

impl ColorMode {
    /// Resolves the mode against whether the sink is a terminal.
    pub fn enabled(&self, is_terminal: bool) -> bool {
        match self {
            Self::Auto => is_terminal,
            Self::Always => true,
            Self::Never => false,
        }
    }
}

/// Line termination for the unconditional print functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnd {
    /// Terminate the message with `\n`.
    #[default]
    Newline,
    /// Leave the cursor on the same line (e.g. before reading input).
    None,
}

/// Severity-filtered diagnostic writer.
#[derive(Debug)]
pub struct Logger<W: Write = io::Stderr> {
    threshold: Severity,
    color: bool,
    writer: W,
}

impl Logger<io::Stderr> {
    /// Creates a logger writing to the process's diagnostic stream.
    pub fn stderr(threshold: Severity, color: ColorMode) -> Self {
        let stderr = io::stderr();
        let color = color.enabled(stderr.is_terminal());
        Self {
            threshold,
            color,
            writer: stderr,
        }
    }
}

impl<W: Write> Logger<W> {
    /// Creates a logger over an arbitrary sink with the default `info` threshold.
    pub fn with_writer(writer: W, color: bool) -> Self {
        Self {
            threshold: Severity::default(),
            color,
            writer,
        }
    }

    /// Current minimum severity for filtered calls.
    pub fn threshold(&self) -> Severity {
        self.threshold
    }

    /// Sets the threshold from a typed severity.
    pub fn set_threshold(&mut self, severity: Severity) {
        self.threshold = severity;
    }

    /// Sets the threshold by name. On failure the prior threshold is kept.
    pub fn set_level(&mut self, name: &str) -> Result<()> {
        self.threshold = Severity::parse(name)?;
        Ok(())
    }

    /// Whether a filtered message at `severity` would be emitted.
    pub fn enabled(&self, severity: Severity) -> bool {
        severity.rank() >= self.threshold.rank()
    }

    /// Emits `message` at the named level if it passes the threshold.
    pub fn log(&mut self, level: &str, message: impl Display) -> Result<()> {
        let severity = Severity::parse(level)?;
        self.log_at(severity, message)?;
        Ok(())
    }

    /// Typed variant of [`Logger::log`].
    pub fn log_at(&mut self, severity: Severity, message: impl Display) -> io::Result<()> {
        if !self.enabled(severity) {
            return Ok(());
        }

        if self.color {
            writeln!(
                self.writer,
                "{}{} {}{}",
                severity.style(),
                severity.label(),
                message,
                RESET
            )
        } else {
            writeln!(self.writer, "{} {}", severity.label(), message)
        }
    }

    /// Emits a styled message regardless of the threshold.
    pub fn print(
        &mut self,
        severity: Severity,
        message: impl Display,
        end: LineEnd,
    ) -> io::Result<()> {
        if self.color {
            write!(self.writer, "{}{}{}", severity.style(), message, RESET)?;
        } else {
            write!(self.writer, "{message}")?;
        }

        match end {
            LineEnd::Newline => writeln!(self.writer),
            LineEnd::None => self.writer.flush(),
        }
    }

    /// Unconditional trace-styled output.
    pub fn trace(&mut self, message: impl Display, end: LineEnd) -> io::Result<()> {
        self.print(Severity::Trace, message, end)
    }

    /// Unconditional debug-styled output.
    pub fn debug(&mut self, message: impl Display, end: LineEnd) -> io::Result<()> {
        self.print(Severity::Debug, message, end)
    }

    /// Unconditional info-styled output.
    pub fn info(&mut self, message: impl Display, end: LineEnd) -> io::Result<()> {
        self.print(Severity::Info, message, end)
    }

    /// Unconditional warn-styled output.
    pub fn warn(&mut self, message: impl Display, end: LineEnd) -> io::Result<()> {
        self.print(Severity::Warn, message, end)
    }

    /// Unconditional error-styled output.
    pub fn error(&mut self, message: impl Display, end: LineEnd) -> io::Result<()> {
        self.print(Severity::Error, message, end)
    }

    /// Flushes the underlying sink.
    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    /// Borrows the sink.
    pub fn writer(&self) -> &W {
        &self.writer
    }

    /// Consumes the logger and returns the sink.
    pub fn into_inner(self) -> W {
        self.writer
    }
}
