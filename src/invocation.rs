//! Invocation-context detection.
//!
//! Decides, from the chain of inclusion frames that led to the current unit,
//! whether the unit was included into an existing shell environment or
//! launched as an independent process, and whether the root of that chain is
//! an interactive shell.
//!
//! The chain is always handled root first, current unit last. Helpers that
//! sit between the detector and the unit being judged are removed by passing
//! an explicit `self_frame_offset`: that many frames are dropped from the
//! current end before classification.
use std::{
    env,
    io::{self, BufRead, IsTerminal, Write},
    path::{Path, PathBuf},
};

use nix::unistd::getppid;
use serde::Serialize;
use strum_macros::{AsRefStr, Display, EnumString};
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};
use tracing::debug;

use crate::constants::ACKNOWLEDGE_PROMPT;
use crate::error::{Result, ScriptKitError};
use crate::logger::{LineEnd, Logger, Severity};

/// Ordered source identifiers, root first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InclusionChain {
    frames: Vec<String>,
}

impl InclusionChain {
    /// Builds a chain from frames listed root first.
    pub fn from_root_first<I, S>(frames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            frames: frames.into_iter().map(Into::into).collect(),
        }
    }

    /// Builds a chain from frames listed current first, the order shells
    /// report their source stack in.
    pub fn from_current_first<I, S>(frames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut chain = Self::from_root_first(frames);
        chain.frames.reverse();
        chain
    }

    /// All frames, root first.
    pub fn frames(&self) -> &[String] {
        &self.frames
    }

    /// The frames visible to the caller once `self_frame_offset` helper
    /// frames are removed from the current end.
    pub fn caller_view(&self, self_frame_offset: usize) -> Result<&[String]> {
        let keep = self.frames.len().saturating_sub(self_frame_offset);
        if keep == 0 {
            return Err(ScriptKitError::InvalidArgument(format!(
                "inclusion chain of {} frame(s) has nothing left after dropping {} caller frame(s)",
                self.frames.len(),
                self_frame_offset
            )));
        }
        Ok(&self.frames[..keep])
    }
}

/// Resolved path of the interpreter binary running the unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessIdentity {
    path: PathBuf,
}

impl ProcessIdentity {
    /// Identity for an explicit path, resolved through symlinks when possible.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: resolve(path.as_ref()),
        }
    }

    /// Identity of the current process image.
    pub fn current() -> Result<Self> {
        Ok(Self::new(env::current_exe()?))
    }

    /// Identity of the parent process, i.e. the shell that launched us.
    pub fn parent() -> Result<Self> {
        let ppid = getppid();
        let pid = Pid::from_u32(ppid.as_raw() as u32);
        let mut system = System::new();
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::everything(),
        );

        let exe = system
            .process(pid)
            .and_then(|process| process.exe())
            .map(Path::to_path_buf)
            .ok_or_else(|| {
                ScriptKitError::InvalidArgument(format!(
                    "cannot resolve the executable of parent process {ppid}"
                ))
            })?;
        debug!("parent process {ppid} runs {}", exe.display());
        Ok(Self::new(exe))
    }

    /// The resolved path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether `frame` names this binary.
    pub fn matches(&self, frame: &str) -> bool {
        resolve(Path::new(frame)) == self.path
    }
}

fn resolve(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Decides whether the root of an inclusion chain is an interactive shell.
pub trait RootProbe {
    /// `root` is the first frame of the caller's view of the chain.
    fn is_interactive_root(&self, root: &str) -> bool;
}

impl<F> RootProbe for F
where
    F: Fn(&str) -> bool,
{
    fn is_interactive_root(&self, root: &str) -> bool {
        self(root)
    }
}

/// Treats a root frame that names the running interpreter as an interactive
/// shell: that is how a shell records a file sourced at its prompt.
#[derive(Debug, Clone)]
pub struct InterpreterPathProbe {
    interpreter: ProcessIdentity,
}

impl InterpreterPathProbe {
    /// Compares root frames against `interpreter`.
    pub fn new(interpreter: ProcessIdentity) -> Self {
        Self { interpreter }
    }
}

impl RootProbe for InterpreterPathProbe {
    fn is_interactive_root(&self, root: &str) -> bool {
        self.interpreter.matches(root)
    }
}

/// Treats the session as interactive whenever stdin is a terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalProbe;

impl RootProbe for TerminalProbe {
    fn is_interactive_root(&self, _root: &str) -> bool {
        io::stdin().is_terminal()
    }
}

/// The four ways a unit can have been brought into execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, AsRefStr, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum InvocationKind {
    /// Included by another script.
    SourcedByScript,
    /// Launched as its own process from a script or batch context.
    ExecutedAsScript,
    /// Included directly at an interactive prompt.
    SourcedByInteractiveShell,
    /// Launched as its own process from an interactive session.
    ExecutedByInteractiveShell,
}

impl InvocationKind {
    fn from_flags(included: bool, interactive_root: bool) -> Self {
        match (included, interactive_root) {
            (true, true) => Self::SourcedByInteractiveShell,
            (true, false) => Self::SourcedByScript,
            (false, true) => Self::ExecutedByInteractiveShell,
            (false, false) => Self::ExecutedAsScript,
        }
    }
}

/// Classification result for one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvocationContext {
    /// Source identifier of the unit being judged.
    pub source_id: String,
    /// Included into an existing environment rather than launched fresh.
    pub included: bool,
    /// The root of the chain is an interactive shell.
    pub interactive_root: bool,
    /// Combined classification.
    pub kind: InvocationKind,
}

/// Pure inclusion predicate over the caller's view of the chain: more than
/// one frame, or a root frame that names the running interpreter.
pub fn is_included(frames: &[String], interpreter: &ProcessIdentity) -> bool {
    frames.len() > 1
        || frames
            .first()
            .is_some_and(|root| interpreter.matches(root))
}

/// Classifies `chain` after dropping `self_frame_offset` helper frames.
///
/// Inclusion is decided against `interpreter`; `probe` only answers whether
/// the root is interactive, so the two flags vary independently.
pub fn classify<P: RootProbe + ?Sized>(
    chain: &InclusionChain,
    self_frame_offset: usize,
    interpreter: &ProcessIdentity,
    probe: &P,
) -> Result<InvocationContext> {
    let frames = chain.caller_view(self_frame_offset)?;
    let included = is_included(frames, interpreter);
    let interactive_root = probe.is_interactive_root(&frames[0]);
    let source_id = frames[frames.len() - 1].clone();

    Ok(InvocationContext {
        source_id,
        included,
        interactive_root,
        kind: InvocationKind::from_flags(included, interactive_root),
    })
}

/// Invocation style a unit requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr, Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Expectation {
    /// The unit must be sourced into an existing environment.
    Included,
    /// The unit must run as its own process.
    Independent,
}

impl Expectation {
    /// Message fragment describing a violation.
    pub const fn violation(&self) -> &'static str {
        match self {
            Self::Included => "must be sourced, not executed",
            Self::Independent => "must be executed, not sourced",
        }
    }

    fn satisfied_by(&self, context: &InvocationContext) -> bool {
        match self {
            Self::Included => context.included,
            Self::Independent => !context.included,
        }
    }
}

/// Detector bound to an interpreter identity, a root probe and a helper-frame
/// offset.
#[derive(Debug, Clone)]
pub struct InvocationDetector<P> {
    interpreter: ProcessIdentity,
    probe: P,
    self_frame_offset: usize,
}

impl InvocationDetector<InterpreterPathProbe> {
    /// Detector that also uses `interpreter` as the interactive-root signal.
    pub fn for_interpreter(interpreter: ProcessIdentity) -> Self {
        let probe = InterpreterPathProbe::new(interpreter.clone());
        Self::new(interpreter, probe)
    }
}

impl<P: RootProbe> InvocationDetector<P> {
    /// Creates a detector that judges the last frame of the chain.
    pub fn new(interpreter: ProcessIdentity, probe: P) -> Self {
        Self {
            interpreter,
            probe,
            self_frame_offset: 0,
        }
    }

    /// Drops `offset` helper frames from the current end before judging.
    pub fn with_self_frame_offset(mut self, offset: usize) -> Self {
        self.self_frame_offset = offset;
        self
    }

    /// Full classification of `chain`.
    pub fn classify(&self, chain: &InclusionChain) -> Result<InvocationContext> {
        classify(chain, self.self_frame_offset, &self.interpreter, &self.probe)
    }

    /// Whether the judged unit shares an existing environment.
    pub fn is_included(&self, chain: &InclusionChain) -> Result<bool> {
        Ok(is_included(
            chain.caller_view(self.self_frame_offset)?,
            &self.interpreter,
        ))
    }

    /// Whether the root of the chain is an interactive shell.
    pub fn is_interactive_root(&self, chain: &InclusionChain) -> Result<bool> {
        let frames = chain.caller_view(self.self_frame_offset)?;
        Ok(self.probe.is_interactive_root(&frames[0]))
    }

    /// Fails with [`ScriptKitError::FatalPrecondition`] unless the unit was
    /// included. The violation is logged at error severity first.
    pub fn require_included<W: Write>(
        &self,
        chain: &InclusionChain,
        logger: &mut Logger<W>,
    ) -> Result<()> {
        self.require(Expectation::Included, chain, logger)
    }

    /// Fails with [`ScriptKitError::FatalPrecondition`] unless the unit was
    /// launched independently.
    pub fn require_independent<W: Write>(
        &self,
        chain: &InclusionChain,
        logger: &mut Logger<W>,
    ) -> Result<()> {
        self.require(Expectation::Independent, chain, logger)
    }

    /// Shared body of the two assertions.
    pub fn require<W: Write>(
        &self,
        expected: Expectation,
        chain: &InclusionChain,
        logger: &mut Logger<W>,
    ) -> Result<()> {
        let context = self.classify(chain)?;
        if expected.satisfied_by(&context) {
            return Ok(());
        }

        let err = ScriptKitError::FatalPrecondition {
            source_id: context.source_id,
            expected,
            interactive: context.interactive_root,
        };
        logger.log_at(Severity::Error, &err)?;
        Err(err)
    }
}

/// Pauses for acknowledgement when `err` is a fatal precondition raised under
/// an interactive root, so the user sees the message before the session ends.
pub fn acknowledge<W: Write, R: BufRead>(
    err: &ScriptKitError,
    logger: &mut Logger<W>,
    input: &mut R,
) -> io::Result<()> {
    if let ScriptKitError::FatalPrecondition {
        interactive: true, ..
    } = err
    {
        logger.warn(ACKNOWLEDGE_PROMPT, LineEnd::None)?;
        let mut line = String::new();
        input.read_line(&mut line)?;
    }
    Ok(())
}

/// Acknowledges (if interactive) and exits with the error's status.
pub fn terminate<W: Write, R: BufRead>(
    err: &ScriptKitError,
    logger: &mut Logger<W>,
    input: &mut R,
) -> ! {
    if let Err(io_err) = acknowledge(err, logger, input) {
        debug!("acknowledgement prompt failed: {io_err}");
    }
    let _ = logger.flush();
    std::process::exit(err.exit_code())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const BASH: &str = "/usr/bin/bash";

    fn never(_: &str) -> bool {
        false
    }

    fn always(_: &str) -> bool {
        true
    }

    fn bash() -> ProcessIdentity {
        ProcessIdentity::new(BASH)
    }

    fn logger() -> Logger<Vec<u8>> {
        Logger::with_writer(Vec::new(), false)
    }

    #[test]
    fn single_frame_not_matching_interpreter_is_independent() {
        let chain = InclusionChain::from_root_first(["/opt/deploy.sh"]);
        let context = classify(&chain, 0, &bash(), &never).unwrap();
        assert!(!context.included);
        assert!(!context.interactive_root);
        assert_eq!(context.kind, InvocationKind::ExecutedAsScript);
        assert_eq!(context.source_id, "/opt/deploy.sh");
    }

    #[test]
    fn multiple_frames_are_always_included() {
        for probe in [never as fn(&str) -> bool, always] {
            let chain = InclusionChain::from_root_first(["/opt/main.sh", "/opt/lib.sh"]);
            let context = classify(&chain, 0, &bash(), &probe).unwrap();
            assert!(context.included);
            assert_eq!(context.source_id, "/opt/lib.sh");
        }
    }

    #[test]
    fn root_matching_interpreter_is_interactive_inclusion() {
        let chain = InclusionChain::from_root_first([BASH]);
        let context = InvocationDetector::for_interpreter(bash())
            .classify(&chain)
            .unwrap();
        assert!(context.included);
        assert!(context.interactive_root);
        assert_eq!(context.kind, InvocationKind::SourcedByInteractiveShell);
    }

    #[test]
    fn interactive_root_does_not_imply_inclusion() {
        let chain = InclusionChain::from_root_first(["/opt/deploy.sh"]);
        let detector = InvocationDetector::new(bash(), always);

        let context = detector.classify(&chain).unwrap();
        assert!(!context.included);
        assert!(context.interactive_root);
        assert_eq!(context.kind, InvocationKind::ExecutedByInteractiveShell);

        let mut logger = logger();
        let err = detector.require_included(&chain, &mut logger).unwrap_err();
        assert!(matches!(
            err,
            ScriptKitError::FatalPrecondition { interactive: true, .. }
        ));
        assert!(detector.require_independent(&chain, &mut logger).is_ok());
    }

    #[test]
    fn script_sourced_from_batch_root_is_sourced_by_script() {
        let chain = InclusionChain::from_root_first(["/opt/main.sh", "/opt/lib.sh"]);
        let context = InvocationDetector::for_interpreter(bash())
            .classify(&chain)
            .unwrap();
        assert!(context.included);
        assert!(!context.interactive_root);
        assert_eq!(context.kind, InvocationKind::SourcedByScript);
    }

    #[test]
    fn self_frames_are_removed_before_classifying() {
        let chain = InclusionChain::from_root_first(["/opt/deploy.sh", "/opt/helpers.sh"]);
        assert!(is_included(chain.frames(), &bash()));

        let context = classify(&chain, 1, &bash(), &never).unwrap();
        assert!(!context.included);
        assert_eq!(context.source_id, "/opt/deploy.sh");
    }

    #[test]
    fn current_first_chains_are_reversed() {
        let chain = InclusionChain::from_current_first(["lib.sh", "main.sh"]);
        assert_eq!(chain.frames(), ["main.sh", "lib.sh"]);
    }

    #[test]
    fn empty_view_is_invalid_argument() {
        let chain = InclusionChain::from_root_first(["only.sh"]);
        assert!(matches!(
            classify(&chain, 1, &bash(), &never),
            Err(ScriptKitError::InvalidArgument(_))
        ));
        assert!(matches!(
            InclusionChain::default().caller_view(0),
            Err(ScriptKitError::InvalidArgument(_))
        ));
    }

    #[test]
    fn kind_covers_every_flag_combination() {
        assert_eq!(InvocationKind::from_flags(true, false), InvocationKind::SourcedByScript);
        assert_eq!(InvocationKind::from_flags(false, false), InvocationKind::ExecutedAsScript);
        assert_eq!(
            InvocationKind::from_flags(true, true),
            InvocationKind::SourcedByInteractiveShell
        );
        assert_eq!(
            InvocationKind::from_flags(false, true),
            InvocationKind::ExecutedByInteractiveShell
        );
    }

    #[test]
    fn interpreter_probe_resolves_symlinks() {
        let temp = tempfile::tempdir().expect("tempdir");
        let real = temp.path().join("bash-5.2");
        let link = temp.path().join("bash");
        std::fs::write(&real, "").unwrap();
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let probe = InterpreterPathProbe::new(ProcessIdentity::new(&link));
        assert!(probe.is_interactive_root(&real.display().to_string()));
        assert!(probe.is_interactive_root(&link.display().to_string()));
        assert!(!probe.is_interactive_root("/opt/deploy.sh"));
    }

    #[test]
    fn require_included_logs_and_fails_for_independent_unit() {
        let detector = InvocationDetector::new(bash(), never);
        let chain = InclusionChain::from_root_first(["/opt/env.sh"]);
        let mut logger = logger();

        let err = detector.require_included(&chain, &mut logger).unwrap_err();
        assert!(matches!(
            &err,
            ScriptKitError::FatalPrecondition { source_id, expected: Expectation::Included, interactive: false }
                if source_id == "/opt/env.sh"
        ));
        assert_eq!(
            String::from_utf8(logger.into_inner()).unwrap(),
            "ERROR /opt/env.sh must be sourced, not executed\n"
        );
    }

    #[test]
    fn require_independent_fails_when_sourced() {
        let detector = InvocationDetector::for_interpreter(bash()).with_self_frame_offset(1);
        let chain = InclusionChain::from_root_first([BASH, "/opt/run.sh", "/opt/guard.sh"]);
        let mut logger = logger();

        let err = detector.require_independent(&chain, &mut logger).unwrap_err();
        assert!(matches!(
            err,
            ScriptKitError::FatalPrecondition { interactive: true, .. }
        ));
        assert!(detector.require_included(&chain, &mut logger).is_ok());
    }

    #[test]
    fn satisfied_requirements_log_nothing() {
        let detector = InvocationDetector::new(bash(), never);
        let chain = InclusionChain::from_root_first(["/opt/run.sh"]);
        let mut logger = logger();
        detector.require_independent(&chain, &mut logger).unwrap();
        assert!(logger.writer().is_empty());
    }

    #[test]
    fn acknowledgement_only_prompts_when_interactive() {
        let interactive = ScriptKitError::FatalPrecondition {
            source_id: "x.sh".into(),
            expected: Expectation::Independent,
            interactive: true,
        };
        let batch = ScriptKitError::FatalPrecondition {
            source_id: "x.sh".into(),
            expected: Expectation::Independent,
            interactive: false,
        };

        let mut logger = logger();
        let mut input = Cursor::new(b"\n".to_vec());
        acknowledge(&batch, &mut logger, &mut input).unwrap();
        assert!(logger.writer().is_empty());

        acknowledge(&interactive, &mut logger, &mut input).unwrap();
        assert_eq!(
            String::from_utf8(logger.into_inner()).unwrap(),
            ACKNOWLEDGE_PROMPT
        );
        assert_eq!(input.position(), 1);
    }

    #[test]
    fn context_serializes_kind_in_kebab_case() {
        let chain = InclusionChain::from_root_first(["a.sh", "b.sh"]);
        let context = classify(&chain, 0, &bash(), &never).unwrap();
        let json = serde_json::to_value(&context).unwrap();
        assert_eq!(json["kind"], "sourced-by-script");
        assert_eq!(json["source_id"], "b.sh");
    }
}
