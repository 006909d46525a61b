use std::{
    io::{self, Write},
    process::ExitCode,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use scriptkit::{
    check::{CheckAccumulator, ExecutionContext},
    cli::{Commands, parse_args},
    config::Settings,
    constants::{DEFAULT_TRACE_FILTER, TRACE_ENV},
    error::{Result, ScriptKitError},
    invocation::{
        self, InclusionChain, InvocationDetector, ProcessIdentity, RootProbe, TerminalProbe,
    },
    logger::{LineEnd, Logger, Severity},
    menu,
};

fn main() -> ExitCode {
    let args = parse_args();
    init_logging();

    let settings = match Settings::from_env() {
        Ok(settings) => settings.with_overrides(args.log_level, args.color),
        Err(err) => {
            let mut logger = Logger::stderr(Severity::Info, args.color.unwrap_or_default());
            return report(err, &mut logger);
        }
    };
    let mut logger = settings.logger();

    match run(args.command, &mut logger) {
        Ok(code) => code,
        Err(err) => report(err, &mut logger),
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(TRACE_ENV)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_TRACE_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn report(err: ScriptKitError, logger: &mut Logger) -> ExitCode {
    match &err {
        // already written by the accumulator
        ScriptKitError::ValidationFailed { count } => {
            debug!("{count} check failure(s) reported");
        }
        ScriptKitError::FatalPrecondition { .. } => {
            invocation::terminate(&err, logger, &mut io::stdin().lock());
        }
        _ => {
            let _ = logger.log_at(Severity::Error, &err);
        }
    }
    ExitCode::from(err.exit_code() as u8)
}

fn run(command: Commands, logger: &mut Logger) -> Result<ExitCode> {
    match command {
        Commands::Log { level, message } => {
            logger.log(&level, message.join(" "))?;
        }
        Commands::Print {
            level,
            no_newline,
            message,
        } => {
            let end = if no_newline {
                LineEnd::None
            } else {
                LineEnd::Newline
            };
            logger.print(level, message.join(" "), end)?;
        }
        Commands::Check {
            sudo,
            report,
            checks,
        } => {
            let context = if sudo {
                ExecutionContext::Elevated
            } else {
                ExecutionContext::Normal
            };
            let mut accumulator = CheckAccumulator::new();
            for check in &checks {
                check.run(&mut accumulator, context)?;
            }
            accumulator.report_and_clear(logger, report)?;
        }
        Commands::Context {
            frames,
            current_first,
            self_offset,
            probe,
            interpreter,
            require,
            query,
            json,
        } => {
            let chain = if current_first {
                InclusionChain::from_current_first(frames)
            } else {
                InclusionChain::from_root_first(frames)
            };
            let request = ContextRequest {
                chain,
                self_offset,
                require,
                query,
                json,
            };

            let identity = match interpreter {
                Some(path) => ProcessIdentity::new(path),
                None => ProcessIdentity::parent()?,
            };
            debug!("interpreter identity {}", identity.path().display());

            let code = if probe == "terminal" {
                request.run(InvocationDetector::new(identity, TerminalProbe), logger)?
            } else {
                request.run(InvocationDetector::for_interpreter(identity), logger)?
            };
            return Ok(code);
        }
        Commands::Menu { prompt, options } => {
            let choice = menu::select_to(&prompt, &options, io::stderr())?;
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{choice}")?;
        }
    }

    logger.flush()?;
    Ok(ExitCode::SUCCESS)
}

struct ContextRequest {
    chain: InclusionChain,
    self_offset: usize,
    require: Option<invocation::Expectation>,
    query: Option<String>,
    json: bool,
}

impl ContextRequest {
    fn run<P: RootProbe>(
        self,
        detector: InvocationDetector<P>,
        logger: &mut Logger,
    ) -> Result<ExitCode> {
        let detector = detector.with_self_frame_offset(self.self_offset);

        if let Some(expected) = self.require {
            detector.require(expected, &self.chain, logger)?;
            return Ok(ExitCode::SUCCESS);
        }

        if let Some(question) = self.query {
            let answer = match question.as_str() {
                "included" => detector.is_included(&self.chain)?,
                _ => detector.is_interactive_root(&self.chain)?,
            };
            return Ok(if answer {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            });
        }

        let context = detector.classify(&self.chain)?;
        let mut stdout = io::stdout().lock();
        if self.json {
            let rendered = serde_json::to_string(&context)
                .map_err(|err| ScriptKitError::Io(io::Error::other(err)))?;
            writeln!(stdout, "{rendered}")?;
        } else {
            writeln!(stdout, "{}", context.kind)?;
        }
        Ok(ExitCode::SUCCESS)
    }
}
