//! Command-line interface for skit.
use std::{ops::RangeInclusive, path::PathBuf, str::FromStr};

use clap::{Parser, Subcommand};

use crate::check::{CheckAccumulator, ExecutionContext, ReportMode, Subject};
use crate::invocation::Expectation;
use crate::logger::{ColorMode, Severity};

fn parse_severity(value: &str) -> Result<Severity, String> {
    Severity::parse(value).map_err(|err| err.to_string())
}

fn parse_color(value: &str) -> Result<ColorMode, String> {
    ColorMode::from_str(value.trim())
        .map_err(|_| format!("invalid colour mode '{value}' (expected auto, always or never)"))
}

fn parse_report(value: &str) -> Result<ReportMode, String> {
    ReportMode::from_str(value.trim())
        .map_err(|_| format!("invalid report mode '{value}' (expected warn or error)"))
}

fn parse_expectation(value: &str) -> Result<Expectation, String> {
    Expectation::from_str(value.trim()).map_err(|_| {
        format!("invalid requirement '{value}' (expected included or independent)")
    })
}

/// Runtime support for shell-driven automation.
#[derive(Parser)]
#[command(name = "skit", version, author)]
#[command(about = "Logging, deferred checks, invocation detection and menus for shell scripts", long_about = None)]
pub struct Cli {
    /// Override the logger threshold for this invocation only.
    #[arg(long, value_name = "LEVEL", global = true, value_parser = parse_severity)]
    pub log_level: Option<Severity>,

    /// Colour mode for diagnostics: auto, always or never.
    #[arg(long, value_name = "MODE", global = true, value_parser = parse_color)]
    pub color: Option<ColorMode>,

    /// The command to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for skit.
#[derive(Subcommand)]
pub enum Commands {
    /// Emit a message if LEVEL passes the threshold.
    Log {
        /// One of trace, debug, info, warn, error, fatal.
        level: String,

        /// Message words, joined by single spaces.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        message: Vec<String>,
    },

    /// Emit a styled message regardless of the threshold.
    Print {
        /// Style to print with.
        #[arg(value_parser = parse_severity)]
        level: Severity,

        /// Do not append a trailing newline.
        #[arg(short = 'n', long)]
        no_newline: bool,

        /// Message words, joined by single spaces.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        message: Vec<String>,
    },

    /// Run checks in order and report every failure together.
    Check {
        /// Evaluate filesystem probes through sudo.
        #[arg(long)]
        sudo: bool,

        /// Severity used to report failures: warn or error.
        #[arg(long, default_value = "error", value_parser = parse_report)]
        report: ReportMode,

        /// Checks written as KIND[@NAME]:VALUE, e.g. `ipv4@HOST_IP:10.0.0.1`,
        /// `range@PORT:8080:1:65535`, `contains@BRANCH:release-1:release`.
        /// Without a value, `KIND@NAME` reads `$NAME`.
        #[arg(required = true)]
        checks: Vec<CheckSpec>,
    },

    /// Classify how a script was brought into execution.
    Context {
        /// Inclusion frames, root first unless --current-first is given.
        #[arg(required = true)]
        frames: Vec<String>,

        /// Frames were given current first, as a shell reports its source stack.
        #[arg(long)]
        current_first: bool,

        /// Number of helper frames to drop from the current end.
        #[arg(long, default_value_t = 0)]
        self_offset: usize,

        /// Interactive-root signal: compare against the interpreter path, or
        /// test whether stdin is a terminal.
        #[arg(long, default_value = "interpreter", value_parser = ["interpreter", "terminal"])]
        probe: String,

        /// Interpreter binary to compare the root frame against (defaults to
        /// the parent process executable).
        #[arg(long, value_name = "PATH")]
        interpreter: Option<PathBuf>,

        /// Fail unless the unit was included or launched independently.
        #[arg(long, value_parser = parse_expectation, conflicts_with = "query")]
        require: Option<Expectation>,

        /// Answer one question through the exit status only.
        #[arg(long, value_parser = ["included", "interactive"])]
        query: Option<String>,

        /// Emit the classification as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Let the user pick one option with the arrow keys.
    Menu {
        /// Prompt printed above the options.
        prompt: String,

        /// Options to choose from.
        #[arg(required = true)]
        options: Vec<String>,
    },
}

/// Parses command-line arguments and returns a `Cli` struct.
pub fn parse_args() -> Cli {
    Cli::parse()
}

/// Check kind named in a [`CheckSpec`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckKind {
    /// Value is non-empty.
    Defined,
    /// Regular file exists.
    File,
    /// Directory exists.
    Dir,
    /// Path is executable.
    Executable,
    /// User exists.
    User,
    /// Group exists.
    Group,
    /// Command resolves on `PATH`.
    Command,
    /// Service unit exists.
    Service,
    /// Integer within an inclusive range.
    Range(RangeInclusive<i64>),
    /// IPv4 literal.
    Ipv4,
    /// Boolean literal.
    Bool,
    /// Positive integer literal.
    PositiveInt,
    /// Contains a substring.
    Contains(String),
    /// Working directory identity.
    Cwd,
}

/// One check given on the command line as `KIND[@NAME]:VALUE`.
///
/// Leaving out the value (`ipv4@HOST_IP`, `range@PORT:1:65535`,
/// `contains@BRANCH:release`) reads it from the environment variable `NAME`
/// when the check runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckSpec {
    kind: CheckKind,
    subject: Subject,
}

impl CheckSpec {
    /// Runs the check, recording any failure. Returns whether it passed.
    pub fn run(
        &self,
        checks: &mut CheckAccumulator,
        context: ExecutionContext,
    ) -> crate::error::Result<bool> {
        let subject = &self.subject;
        let passed = match &self.kind {
            CheckKind::Defined => checks.defined(subject),
            CheckKind::File => checks.file_exists(subject, context),
            CheckKind::Dir => checks.dir_exists(subject, context),
            CheckKind::Executable => checks.executable_exists(subject, context),
            CheckKind::User => checks.user_exists(subject),
            CheckKind::Group => checks.group_exists(subject),
            CheckKind::Command => checks.command_exists(subject),
            CheckKind::Service => checks.service_exists(subject),
            CheckKind::Range(range) => checks.in_range(subject, range.clone())?,
            CheckKind::Ipv4 => checks.ipv4(subject),
            CheckKind::Bool => checks.boolean(subject),
            CheckKind::PositiveInt => checks.positive_integer(subject),
            CheckKind::Contains(needle) => checks.contains(subject, needle),
            CheckKind::Cwd => checks.current_dir_is(subject),
        };
        Ok(passed)
    }
}

impl FromStr for CheckSpec {
    type Err = String;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let (head, rest) = match spec.split_once(':') {
            Some((head, rest)) => (head, Some(rest)),
            None => (spec, None),
        };
        let (kind_name, name) = match head.split_once('@') {
            Some((kind, name)) if !name.is_empty() => (kind, Some(name)),
            Some(_) => return Err(format!("check '{spec}' has an empty subject name")),
            None => (head, None),
        };

        let (kind, value) = match kind_name.to_ascii_lowercase().as_str() {
            "defined" => (CheckKind::Defined, rest),
            "file" => (CheckKind::File, rest),
            "dir" => (CheckKind::Dir, rest),
            "exec" => (CheckKind::Executable, rest),
            "user" => (CheckKind::User, rest),
            "group" => (CheckKind::Group, rest),
            "command" => (CheckKind::Command, rest),
            "service" => (CheckKind::Service, rest),
            "ipv4" => (CheckKind::Ipv4, rest),
            "bool" => (CheckKind::Bool, rest),
            "posint" => (CheckKind::PositiveInt, rest),
            "cwd" => (CheckKind::Cwd, rest),
            "range" => {
                let malformed = || format!("range check '{spec}' must end in :MIN:MAX");
                let parts: Vec<&str> = rest.ok_or_else(malformed)?.rsplitn(3, ':').collect();
                let (value, min, max) = match parts.as_slice() {
                    [max, min, value] => (Some(*value), *min, *max),
                    [max, min] => (None, *min, *max),
                    _ => return Err(malformed()),
                };
                let bound = |text: &str| {
                    text.trim()
                        .parse::<i64>()
                        .map_err(|_| format!("invalid range bound '{text}' in '{spec}'"))
                };
                let (min, max) = (bound(min)?, bound(max)?);
                if min > max {
                    return Err(format!(
                        "range check '{spec}' has MIN {min} greater than MAX {max}"
                    ));
                }
                (CheckKind::Range(min..=max), value)
            }
            "contains" => {
                let rest =
                    rest.ok_or_else(|| format!("contains check '{spec}' must end in :NEEDLE"))?;
                match rest.rsplit_once(':') {
                    Some((value, needle)) => (CheckKind::Contains(needle.to_string()), Some(value)),
                    None => (CheckKind::Contains(rest.to_string()), None),
                }
            }
            other => return Err(format!("unknown check kind '{other}'")),
        };

        let subject = match (value, name) {
            (Some(value), name) => Subject::named(name.unwrap_or(kind_name), value),
            (None, Some(name)) => Subject::env(name),
            (None, None) => {
                return Err(format!(
                    "check '{spec}' must look like KIND[@NAME]:VALUE, or KIND@NAME to read $NAME"
                ));
            }
        };

        Ok(Self { kind, subject })
    }
}
