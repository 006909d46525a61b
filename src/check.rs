//! Deferred validation checks.
//!
//! A [`CheckAccumulator`] collects failure messages from many independent
//! predicates without halting, so a script can run its whole validation phase
//! and report every problem at once with [`CheckAccumulator::report_and_clear`].
//!
//! Every predicate first requires its [`Subject`] to carry a non-empty value.
//! An undefined subject records `variable is undefined: <name>` and the
//! underlying test is skipped.
use std::{
    env,
    io::Write,
    net::Ipv4Addr,
    ops::RangeInclusive,
    path::{Path, PathBuf},
    process::{Command, Stdio},
    str::FromStr,
};

use nix::unistd::{AccessFlags, Group, User, access};
use strum_macros::{AsRefStr, Display, EnumString};
use tracing::{debug, warn};

use crate::constants::{
    COMMAND_MISSING_MSG, DIR_MISSING_MSG, ELEVATION_NON_INTERACTIVE_FLAG,
    ELEVATION_PROGRAM, FILE_MISSING_MSG, GROUP_MISSING_MSG, INVALID_BOOLEAN_MSG,
    INVALID_IPV4_MSG, INVALID_POSITIVE_INT_MSG, NOT_A_NUMBER_MSG, NOT_EXECUTABLE_MSG,
    SERVICE_MISSING_MSG, TEST_PROGRAM, UNDEFINED_MSG, USER_MISSING_MSG,
};
use crate::error::{Result, ScriptKitError};
use crate::logger::{Logger, Severity};

/// The named value a check is evaluated against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    name: String,
    value: Option<String>,
}

impl Subject {
    /// A subject with an optional value.
    pub fn new(name: impl Into<String>, value: Option<String>) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    /// A subject with a known value.
    pub fn named(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, Some(value.into()))
    }

    /// A subject read from the environment variable `name`.
    pub fn env(name: impl Into<String>) -> Self {
        let name = name.into();
        let value = env::var(&name).ok();
        Self { name, value }
    }

    /// Name reported when the subject is undefined.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The value, or `None` when unset or empty.
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref().filter(|value| !value.is_empty())
    }
}

/// Privilege context in which filesystem probes are evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionContext {
    /// Probe as the current user.
    #[default]
    Normal,
    /// Probe through `sudo -n test`, for paths the current user cannot see.
    Elevated,
}

/// Filesystem property a probe asserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathProbe {
    /// Regular file.
    File,
    /// Directory.
    Directory,
    /// Executable by the probing user.
    Executable,
}

impl PathProbe {
    /// Flag passed to `test(1)` for this probe.
    pub const fn test_flag(&self) -> &'static str {
        match self {
            Self::File => "-f",
            Self::Directory => "-d",
            Self::Executable => "-x",
        }
    }

    fn holds(&self, path: &Path) -> bool {
        match self {
            Self::File => path.is_file(),
            Self::Directory => path.is_dir(),
            Self::Executable => access(path, AccessFlags::X_OK).is_ok(),
        }
    }
}

impl ExecutionContext {
    /// Evaluates `probe` against `path` in this context.
    pub fn probe(&self, probe: PathProbe, path: &Path) -> bool {
        match self {
            Self::Normal => probe.holds(path),
            Self::Elevated => {
                let status = Command::new(ELEVATION_PROGRAM)
                    .arg(ELEVATION_NON_INTERACTIVE_FLAG)
                    .arg(TEST_PROGRAM)
                    .arg(probe.test_flag())
                    .arg(path)
                    .stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .status();
                match status {
                    Ok(status) => status.success(),
                    Err(err) => {
                        warn!("Failed to run elevated probe for {}: {err}", path.display());
                        false
                    }
                }
            }
        }
    }
}

/// Severity used when reporting accumulated failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, AsRefStr, Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ReportMode {
    /// Report as warnings.
    Warn,
    /// Report as errors.
    #[default]
    Error,
}

impl ReportMode {
    /// Logger severity for this mode.
    pub const fn severity(&self) -> Severity {
        match self {
            Self::Warn => Severity::Warn,
            Self::Error => Severity::Error,
        }
    }
}

/// Ordered set of unreported check failures.
#[derive(Debug, Default, Clone)]
pub struct CheckAccumulator {
    failures: Vec<String>,
}

impl CheckAccumulator {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empties the set unconditionally.
    pub fn reset(&mut self) {
        self.failures.clear();
    }

    /// True iff at least one failure is pending.
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Number of pending failures.
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// True when nothing has failed since the last reset.
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Pending failures in the order they were recorded.
    pub fn failures(&self) -> &[String] {
        &self.failures
    }

    /// Appends one failure. Duplicates are kept.
    pub fn record(&mut self, message: impl Into<String>) {
        let message = message.into();
        debug!("check failed: {message}");
        self.failures.push(message);
    }

    /// Logs every pending failure at the mode's severity, in insertion order,
    /// then clears the set. Returns [`ScriptKitError::ValidationFailed`] iff
    /// the set was non-empty.
    pub fn report_and_clear<W: Write>(
        &mut self,
        logger: &mut Logger<W>,
        mode: ReportMode,
    ) -> Result<()> {
        let failures = std::mem::take(&mut self.failures);
        let count = failures.len();
        for failure in failures {
            logger.log_at(mode.severity(), failure)?;
        }

        if count > 0 {
            Err(ScriptKitError::ValidationFailed { count })
        } else {
            Ok(())
        }
    }

    /// Runs `test` against a defined subject and records the message it
    /// returns. Returns whether the check passed.
    fn evaluate<F>(&mut self, subject: &Subject, test: F) -> bool
    where
        F: FnOnce(&str) -> Option<String>,
    {
        let Some(value) = subject.value() else {
            self.record(format!("{UNDEFINED_MSG}: {}", subject.name()));
            return false;
        };

        match test(value) {
            Some(message) => {
                self.record(message);
                false
            }
            None => true,
        }
    }

    fn probe_path(
        &mut self,
        subject: &Subject,
        probe: PathProbe,
        context: ExecutionContext,
        message: &str,
    ) -> bool {
        self.evaluate(subject, |path| {
            (!context.probe(probe, Path::new(path))).then(|| format!("{message}: {path}"))
        })
    }

    /// Only verifies the subject is defined.
    pub fn defined(&mut self, subject: &Subject) -> bool {
        self.evaluate(subject, |_| None)
    }

    /// Subject names an existing regular file.
    pub fn file_exists(&mut self, subject: &Subject, context: ExecutionContext) -> bool {
        self.probe_path(subject, PathProbe::File, context, FILE_MISSING_MSG)
    }

    /// Subject names an existing directory.
    pub fn dir_exists(&mut self, subject: &Subject, context: ExecutionContext) -> bool {
        self.probe_path(subject, PathProbe::Directory, context, DIR_MISSING_MSG)
    }

    /// Subject names a path executable by the probing user.
    pub fn executable_exists(&mut self, subject: &Subject, context: ExecutionContext) -> bool {
        self.probe_path(subject, PathProbe::Executable, context, NOT_EXECUTABLE_MSG)
    }

    /// Subject names a known user account.
    pub fn user_exists(&mut self, subject: &Subject) -> bool {
        self.evaluate(subject, |name| {
            let found = User::from_name(name).ok().flatten().is_some();
            (!found).then(|| format!("{USER_MISSING_MSG}: {name}"))
        })
    }

    /// Subject names a known group.
    pub fn group_exists(&mut self, subject: &Subject) -> bool {
        self.evaluate(subject, |name| {
            let found = Group::from_name(name).ok().flatten().is_some();
            (!found).then(|| format!("{GROUP_MISSING_MSG}: {name}"))
        })
    }

    /// Subject names a command resolvable through `PATH`.
    pub fn command_exists(&mut self, subject: &Subject) -> bool {
        self.evaluate(subject, |name| {
            find_command(name)
                .is_none()
                .then(|| format!("{COMMAND_MISSING_MSG}: {name}"))
        })
    }

    /// Subject names a unit the service manager knows about.
    pub fn service_exists(&mut self, subject: &Subject) -> bool {
        self.evaluate(subject, |name| {
            let known = Command::new("systemctl")
                .args(["cat", "--"])
                .arg(name)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .map(|status| status.success())
                .unwrap_or_else(|err| {
                    warn!("Failed to query service manager for '{name}': {err}");
                    false
                });
            (!known).then(|| format!("{SERVICE_MISSING_MSG}: {name}"))
        })
    }

    /// Subject is an integer within `range` (inclusive).
    ///
    /// An inverted range is a caller error: it fails with
    /// [`ScriptKitError::InvalidArgument`] and nothing is recorded.
    pub fn in_range(&mut self, subject: &Subject, range: RangeInclusive<i64>) -> Result<bool> {
        if range.start() > range.end() {
            return Err(ScriptKitError::InvalidArgument(format!(
                "range [{}, {}] for {} has its bounds inverted",
                range.start(),
                range.end(),
                subject.name()
            )));
        }

        Ok(self.evaluate(subject, |value| match value.trim().parse::<i64>() {
            Ok(number) if range.contains(&number) => None,
            Ok(_) => Some(format!(
                "value out of range [{}, {}]: {value}",
                range.start(),
                range.end()
            )),
            Err(_) => Some(format!("{NOT_A_NUMBER_MSG}: {value}")),
        }))
    }

    /// Subject is a dotted-quad IPv4 literal.
    ///
    /// Octets with leading zeros (`010.1.1.1`) are rejected rather than read
    /// as decimal or octal.
    pub fn ipv4(&mut self, subject: &Subject) -> bool {
        self.evaluate(subject, |value| {
            Ipv4Addr::from_str(value)
                .is_err()
                .then(|| format!("{INVALID_IPV4_MSG}: {value}"))
        })
    }

    /// Subject is `true` or `false`.
    pub fn boolean(&mut self, subject: &Subject) -> bool {
        self.evaluate(subject, |value| {
            (!matches!(value, "true" | "false"))
                .then(|| format!("{INVALID_BOOLEAN_MSG}: {value}"))
        })
    }

    /// Subject is a decimal integer of at least one.
    pub fn positive_integer(&mut self, subject: &Subject) -> bool {
        self.evaluate(subject, |value| {
            let valid = value.bytes().all(|b| b.is_ascii_digit())
                && value.parse::<u64>().is_ok_and(|number| number > 0);
            (!valid).then(|| format!("{INVALID_POSITIVE_INT_MSG}: {value}"))
        })
    }

    /// Subject contains `needle` as a substring.
    pub fn contains(&mut self, subject: &Subject, needle: &str) -> bool {
        self.evaluate(subject, |value| {
            (!value.contains(needle))
                .then(|| format!("'{value}' does not contain '{needle}'"))
        })
    }

    /// The working directory is the path named by the subject.
    pub fn current_dir_is(&mut self, subject: &Subject) -> bool {
        self.evaluate(subject, |expected| {
            let actual = match env::current_dir() {
                Ok(dir) => dir,
                Err(err) => {
                    return Some(format!(
                        "current directory is not {expected}: unavailable ({err})"
                    ));
                }
            };
            let matches = canonical(Path::new(expected)) == canonical(&actual);
            (!matches).then(|| {
                format!("current directory is not {expected}: {}", actual.display())
            })
        })
    }
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Resolves `name` the way a shell would: paths are taken as-is, bare names
/// are searched through `PATH`.
pub fn find_command(name: &str) -> Option<PathBuf> {
    let executable = |path: &Path| path.is_file() && access(path, AccessFlags::X_OK).is_ok();

    if name.contains('/') {
        let path = PathBuf::from(name);
        return executable(&path).then_some(path);
    }

    let search = env::var_os("PATH")?;
    env::split_paths(&search)
        .map(|dir| dir.join(name))
        .find(|candidate| executable(candidate.as_path()))
}
