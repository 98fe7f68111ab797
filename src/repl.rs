//! The read-eval-print loop.
use crate::command::{invoke, Context, ContextSettings, ParseMode};
use crate::completion::{Completer, CompleterConfig};
use crate::error::{Error, Result, UsageError};
use crate::internals::{Flow, InternalCommandSystem};
use crate::resolver::{next_context, StateResolver};
use crate::session::ReplSession;
use crate::status;
use crate::styles::StyledText;
use crate::tokenizer::split_arg_string;
use crate::validator::Validator;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

/// Set to enable developer diagnostics (backtraces of failed commands).
pub const DEV_ENV: &str = "CMDREPL_DEV";

#[derive(Debug, Clone)]
pub struct ReplConfig {
    pub prompt: String,
    pub internal_command_prefix: Option<String>,
    pub system_command_prefix: Option<String>,
    /// Run system commands through `sh -c`.
    pub shell: bool,
    pub history_file: Option<PathBuf>,
    pub completer: CompleterConfig,
    pub dev: bool,
}

impl Default for ReplConfig {
    fn default() -> ReplConfig {
        ReplConfig {
            prompt: "> ".to_owned(),
            internal_command_prefix: Some(":".to_owned()),
            system_command_prefix: Some("!".to_owned()),
            shell: true,
            history_file: None,
            completer: CompleterConfig::default(),
            dev: std::env::var_os(DEV_ENV).is_some(),
        }
    }
}

/// Where the loop gets its lines from. A line editor implements this to
/// plug its own prompt, completion menu and status bar in.
pub trait LineReader {
    /// Returns `Ok(None)` at the end of input. An `Interrupted` error
    /// discards the line and prompts again.
    fn read_line(&mut self, session: &ReplSession) -> io::Result<Option<String>>;
}

/// Reads plain lines from the standard input.
pub struct StdinReader;

impl LineReader for StdinReader {
    fn read_line(&mut self, session: &ReplSession) -> io::Result<Option<String>> {
        let mut stdout = io::stdout();
        write!(stdout, "{}", session.prompt())?;
        stdout.flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            return Ok(None);
        }

        Ok(Some(line.trim_end_matches(|ch: char| ch == '\n' || ch == '\r').to_owned()))
    }
}

pub struct Repl {
    session: Arc<ReplSession>,
    resolver: Arc<StateResolver>,
    completer: Completer,
    validator: Validator,
    config: ReplConfig,
}

impl Repl {
    /// Starts a REPL for the group `ctx` belongs to.
    pub fn new(ctx: Arc<Context>, config: ReplConfig) -> Result<Repl> {
        Repl::build(None, ctx, config)
    }

    /// Starts a REPL from within a command run by `parent`.
    pub fn nested(parent: Arc<ReplSession>, ctx: Arc<Context>, config: ReplConfig) -> Result<Repl> {
        Repl::build(Some(parent), ctx, config)
    }

    fn build(parent: Option<Arc<ReplSession>>, ctx: Arc<Context>, config: ReplConfig) -> Result<Repl> {
        let root = group_context(&ctx);
        let internals = Arc::new(InternalCommandSystem::new(
            config.internal_command_prefix.as_deref(),
            config.system_command_prefix.as_deref(),
            config.shell,
        )?);

        let mut session = ReplSession::new(
            root.clone(),
            internals.clone(),
            config.history_file.as_deref(),
            &config.prompt,
        );
        if let Some(parent) = parent {
            session = session.with_parent(parent);
        }

        let resolver = Arc::new(StateResolver::new());
        let completer = Completer::new(root.clone(), config.completer)
            .with_internals(internals.clone())
            .with_resolver(resolver.clone());
        let validator = Validator::new(root)
            .with_internals(internals)
            .with_resolver(resolver.clone());

        debug!(
            "repl: {} (depth {})",
            session.root().command_path(),
            session.depth()
        );
        Ok(Repl {
            session: Arc::new(session),
            resolver,
            completer,
            validator,
            config,
        })
    }

    pub fn session(&self) -> &Arc<ReplSession> {
        &self.session
    }

    pub fn completer(&self) -> &Completer {
        &self.completer
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    pub fn config(&self) -> &ReplConfig {
        &self.config
    }

    /// Drops cached resolutions, e.g. after the command tree changed.
    pub fn invalidate_caches(&self) {
        self.resolver.invalidate();
    }

    /// The status line for `line`, the text before the cursor. Records the
    /// parsing state in the session.
    pub fn status(&self, line: &str) -> StyledText {
        if self.session.internals().prefix_of(line).is_some() {
            return StyledText::new();
        }

        match self.resolver.resolve_line(self.session.root(), line) {
            Ok(resolved) => {
                self.session.update_state(resolved.state.clone());
                status::render(&resolved.state, self.config.completer.show_hidden_params)
            }
            Err(err) => status::render_error(&err.summary()),
        }
    }

    /// Runs one line: a prefixed line goes to the internal command system,
    /// anything else to the command tree.
    pub fn execute(&self, line: &str) -> std::result::Result<Flow, failure::Error> {
        let internals = self.session.internals();
        if internals.prefix_of(line).is_some() {
            return internals.execute(&self.session, line);
        }

        let mut args = split_arg_string(line);
        if args.is_empty() {
            return Ok(Flow::Continue);
        }

        // Commands find the session through their context.
        let root = self.session.root();
        let exec_root = Arc::new((**root).clone().with_obj(self.session.clone()));
        let chain = root.command.is_chain();
        let settings = if chain {
            ContextSettings::chained()
        } else {
            ContextSettings::default()
        };

        let mut contexts = Vec::new();
        while !args.is_empty() {
            match next_context(&exec_root, &args, settings, ParseMode::Strict)? {
                Some(ctx) => {
                    args = ctx.args.clone();
                    contexts.push(ctx);
                }
                None => break,
            }

            if !chain {
                break;
            }
        }

        for ctx in &contexts {
            trace!("execute: {}", ctx.command_path());
            invoke(ctx)?;
        }

        Ok(Flow::Continue)
    }

    /// Reads and executes lines until the input ends or an internal command
    /// asks to exit. Failed commands are reported and the loop goes on.
    pub fn run<R: LineReader>(&self, reader: &mut R) -> Result<()> {
        loop {
            let line = match reader.read_line(&self.session) {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(ref err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            };

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            self.session.history().append(line);
            match self.execute(line) {
                Ok(Flow::Continue) => (),
                Ok(Flow::Exit) => break,
                Err(err) => {
                    warn!("{:?}: {}", line, err);
                    print_err!("{}", describe_error(&err));
                    if self.config.dev {
                        print_err!("{}", err.backtrace());
                    }
                }
            }
        }

        debug!("repl: exit (depth {})", self.session.depth());
        Ok(())
    }
}

/// The context the REPL runs in: the group itself, or the parent of a leaf
/// command's context. Arguments reserved for subcommands are dropped.
fn group_context(ctx: &Arc<Context>) -> Arc<Context> {
    let group = match &ctx.parent {
        Some(parent) if !ctx.command.is_group() => parent,
        _ => ctx,
    };

    let mut root = (**group).clone();
    root.protected_args.clear();
    Arc::new(root)
}

fn describe_usage_error(err: &UsageError) -> String {
    match &err.command {
        Some(command) => format!("{}: {}", command, err),
        None => err.to_string(),
    }
}

/// How a failed line is reported: usage errors are prefixed with the
/// command they were raised in and structural errors with their kind.
pub fn describe_error(err: &failure::Error) -> String {
    if let Some(err) = err.downcast_ref::<Error>() {
        return match err {
            Error::Usage(usage) => describe_usage_error(usage),
            other => other.summary(),
        };
    }

    if let Some(usage) = err.downcast_ref::<UsageError>() {
        return describe_usage_error(usage);
    }

    err.to_string()
}
