//! Prefixed REPL commands: internal commands (`:help`) handled by the REPL
//! itself and system commands (`!ls`) passed to the operating system.
use crate::cache::lock;
use crate::error::{InternalCommandError, Result};
use crate::session::ReplSession;
use crate::tokenizer::split_arg_string;
use std::fmt::Write;
use std::process::Command as Process;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixKind {
    Internal,
    System,
}

impl PrefixKind {
    fn name(self) -> &'static str {
        match self {
            PrefixKind::Internal => "internal",
            PrefixKind::System => "system",
        }
    }
}

/// What the loop does after a line has been handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub type InternalFn = Arc<dyn Fn(&ReplSession) -> std::result::Result<Flow, failure::Error> + Send + Sync>;

#[derive(Clone)]
struct InternalCommand {
    names: Vec<String>,
    description: String,
    f: InternalFn,
}

pub struct InternalCommandSystem {
    internal_prefix: Option<String>,
    system_prefix: Option<String>,
    /// Runs system commands through `sh -c` instead of spawning them
    /// directly.
    shell: bool,
    commands: Mutex<Vec<InternalCommand>>,
}

fn check_prefix(prefix: Option<&str>, kind: PrefixKind) -> Result<Option<String>> {
    match prefix {
        Some(prefix) if prefix.trim().is_empty() => Err(InternalCommandError::EmptyPrefix(kind.name()).into()),
        Some(prefix) => Ok(Some(prefix.to_owned())),
        None => Ok(None),
    }
}

impl InternalCommandSystem {
    /// Creates the dispatcher with the default commands registered. Either
    /// prefix may be disabled with `None`.
    pub fn new(internal_prefix: Option<&str>, system_prefix: Option<&str>, shell: bool) -> Result<InternalCommandSystem> {
        if let (Some(internal), Some(system)) = (internal_prefix, system_prefix) {
            if internal == system {
                return Err(InternalCommandError::SamePrefix(internal.to_owned()).into());
            }
        }

        let system = InternalCommandSystem {
            internal_prefix: check_prefix(internal_prefix, PrefixKind::Internal)?,
            system_prefix: check_prefix(system_prefix, PrefixKind::System)?,
            shell,
            commands: Mutex::new(Vec::new()),
        };

        system.register(&["cls", "clear"], "Clears screen.", clear_screen)?;
        system.register(&["?", "h", "help"], "Displays general help information.", |session| {
            println!("{}", session.internals().help_text());
            Ok(Flow::Continue)
        })?;
        system.register(&["q", "quit", "exit"], "Exits the REPL.", |_| Ok(Flow::Exit))?;
        Ok(system)
    }

    pub fn internal_prefix(&self) -> Option<&str> {
        self.internal_prefix.as_deref()
    }

    pub fn system_prefix(&self) -> Option<&str> {
        self.system_prefix.as_deref()
    }

    /// Registers a command under `names`. Names are case-insensitive and
    /// must not be taken yet.
    pub fn register<F>(&self, names: &[&str], description: &str, f: F) -> Result<()>
    where
        F: Fn(&ReplSession) -> std::result::Result<Flow, failure::Error> + Send + Sync + 'static,
    {
        let mut commands = lock(&self.commands);
        let mut new_names: Vec<String> = Vec::new();
        for name in names {
            let name = name.to_lowercase();
            if commands.iter().any(|command| command.names.contains(&name)) {
                return Err(InternalCommandError::DuplicateName(name).into());
            }

            if !new_names.contains(&name) {
                new_names.push(name);
            }
        }

        commands.push(InternalCommand {
            names: new_names,
            description: description.to_owned(),
            f: Arc::new(f),
        });
        Ok(())
    }

    /// Removes `name`, or the whole command `name` belongs to when
    /// `all_aliases` is set.
    pub fn remove(&self, name: &str, all_aliases: bool) -> Result<()> {
        let name = name.to_lowercase();
        let mut commands = lock(&self.commands);
        let index = match commands.iter().position(|command| command.names.contains(&name)) {
            Some(index) => index,
            None => return Err(InternalCommandError::NotFound(name).into()),
        };

        if all_aliases {
            commands.remove(index);
        } else {
            commands[index].names.retain(|alias| *alias != name);
            if commands[index].names.is_empty() {
                commands.remove(index);
            }
        }

        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<InternalFn> {
        let name = name.to_lowercase();
        lock(&self.commands)
            .iter()
            .find(|command| command.names.contains(&name))
            .map(|command| command.f.clone())
    }

    /// Every command's aliases together with its description, in
    /// registration order.
    pub fn list_commands(&self) -> Vec<(Vec<String>, String)> {
        lock(&self.commands)
            .iter()
            .map(|command| (command.names.clone(), command.description.clone()))
            .collect()
    }

    /// The kind and the text of the prefix `line` starts with.
    pub fn prefix_of(&self, line: &str) -> Option<(PrefixKind, &str)> {
        let line = line.trim_start();
        let prefixes = [
            (PrefixKind::Internal, self.internal_prefix.as_deref()),
            (PrefixKind::System, self.system_prefix.as_deref()),
        ];

        prefixes.iter().find_map(|(kind, prefix)| match prefix {
            Some(prefix) if line.starts_with(prefix) => Some((*kind, *prefix)),
            _ => None,
        })
    }

    /// Runs a prefixed line.
    pub fn execute(&self, session: &ReplSession, line: &str) -> std::result::Result<Flow, failure::Error> {
        let (kind, prefix) = match self.prefix_of(line) {
            Some(found) => found,
            None => return Err(crate::Error::from(InternalCommandError::PrefixNotFound).into()),
        };

        let command = line.trim()[prefix.len()..].trim();
        if command.is_empty() {
            return Err(crate::Error::from(InternalCommandError::EmptyCommand(kind.name())).into());
        }

        match kind {
            PrefixKind::Internal => {
                let name = command.to_lowercase();
                let f = match self.get(&name) {
                    Some(f) => f,
                    None => return Err(crate::Error::from(InternalCommandError::NotFound(name)).into()),
                };

                trace!("internal command: {}", name);
                f(session)
            }
            PrefixKind::System => {
                self.run_system_command(command);
                Ok(Flow::Continue)
            }
        }
    }

    fn run_system_command(&self, command: &str) {
        let mut process = if self.shell {
            let mut process = Process::new("sh");
            process.arg("-c").arg(command);
            process
        } else {
            let argv = split_arg_string(command);
            let (program, args) = match argv.split_first() {
                Some(split) => split,
                None => return,
            };

            let mut process = Process::new(program);
            process.args(args);
            process
        };

        trace!("system command: {:?}", process);
        match process.status() {
            Ok(status) if !status.success() => debug!("system command exited with {}", status),
            Ok(_) => (),
            Err(err) => print_err!("{}: {}", command, err),
        }
    }

    /// The text shown by the help command.
    pub fn help_text(&self) -> String {
        let mut text = String::from("REPL help:\n");
        if self.internal_prefix.is_none() && self.system_prefix.is_none() {
            text.push_str("  No Internal commands are registered with this REPL.\n");
        }

        if let Some(prefix) = &self.system_prefix {
            writeln!(text, "\n  External/System Commands:").ok();
            writeln!(text, "    Prefix External/System commands with \"{}\".", prefix).ok();
        }

        if let Some(prefix) = &self.internal_prefix {
            writeln!(text, "\n  Internal Commands:").ok();
            writeln!(text, "    Prefix Internal commands with \"{}\".\n", prefix).ok();

            let rows: Vec<(String, String)> = self
                .list_commands()
                .into_iter()
                .map(|(mut aliases, description)| {
                    aliases.sort();
                    let names: Vec<String> = aliases.iter().map(|alias| format!("{}{}", prefix, alias)).collect();
                    (names.join(", "), description)
                })
                .collect();

            let width = rows.iter().map(|(names, _)| names.chars().count()).max().unwrap_or(0);
            for (names, description) in rows {
                writeln!(text, "    {:width$}  {}", names, description, width = width).ok();
            }
        }

        text
    }
}

fn clear_screen(_session: &ReplSession) -> std::result::Result<Flow, failure::Error> {
    use crossterm::cursor::MoveTo;
    use crossterm::terminal::{Clear, ClearType};

    crossterm::execute!(std::io::stdout(), Clear(ClearType::All), MoveTo(0, 0))?;
    Ok(Flow::Continue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::testing::root_context;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn system() -> InternalCommandSystem {
        InternalCommandSystem::new(Some(":"), Some("!"), true).unwrap()
    }

    fn internal_error(err: failure::Error) -> InternalCommandError {
        match err.downcast::<Error>() {
            Ok(Error::Internal(err)) => err,
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_prefix_validation() {
        match InternalCommandSystem::new(Some("!"), Some("!"), true) {
            Err(Error::Internal(err)) => assert_eq!(err, InternalCommandError::SamePrefix("!".to_owned())),
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }

        match InternalCommandSystem::new(Some(" "), None, true) {
            Err(Error::Internal(err)) => assert_eq!(err, InternalCommandError::EmptyPrefix("internal")),
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }

        let system = InternalCommandSystem::new(None, Some("$"), false).unwrap();
        assert_eq!(system.internal_prefix(), None);
        assert_eq!(system.prefix_of("$ ls"), Some((PrefixKind::System, "$")));
        assert_eq!(system.prefix_of(":help"), None);
    }

    #[test]
    fn test_prefix_of() {
        let system = system();
        assert_eq!(system.prefix_of(":help"), Some((PrefixKind::Internal, ":")));
        assert_eq!(system.prefix_of("  !ls -l"), Some((PrefixKind::System, "!")));
        assert_eq!(system.prefix_of("args a b"), None);
    }

    #[test]
    fn test_default_commands() {
        let system = system();
        assert_eq!(
            system.list_commands(),
            vec![
                (vec!["cls".to_owned(), "clear".to_owned()], "Clears screen.".to_owned()),
                (
                    vec!["?".to_owned(), "h".to_owned(), "help".to_owned()],
                    "Displays general help information.".to_owned()
                ),
                (
                    vec!["q".to_owned(), "quit".to_owned(), "exit".to_owned()],
                    "Exits the REPL.".to_owned()
                ),
            ]
        );
        assert!(system.get("QUIT").is_some());
        assert!(system.get("nope").is_none());
    }

    #[test]
    fn test_register_and_remove() {
        let system = system();
        system.register(&["Hello", "hi", "hello"], "Greets.", |_| Ok(Flow::Continue)).unwrap();
        assert_eq!(
            system.list_commands().last().unwrap().0,
            vec!["hello".to_owned(), "hi".to_owned()]
        );

        match system.register(&["HI"], "", |_| Ok(Flow::Continue)) {
            Err(Error::Internal(err)) => assert_eq!(err, InternalCommandError::DuplicateName("hi".to_owned())),
            other => panic!("unexpected: {:?}", other),
        }

        system.remove("hi", false).unwrap();
        assert!(system.get("hi").is_none());
        assert!(system.get("hello").is_some());

        system.remove("q", true).unwrap();
        assert!(system.get("exit").is_none());

        match system.remove("nope", true) {
            Err(Error::Internal(err)) => assert_eq!(err, InternalCommandError::NotFound("nope".to_owned())),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_execute() {
        let system = Arc::new(system());
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        system
            .register(&["count"], "Counts.", move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Flow::Continue)
            })
            .unwrap();
        let session = ReplSession::new(root_context(), system.clone(), None, "> ");

        assert_eq!(system.execute(&session, ":count").unwrap(), Flow::Continue);
        assert_eq!(system.execute(&session, "  :  COUNT  ").unwrap(), Flow::Continue);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(system.execute(&session, ":exit").unwrap(), Flow::Exit);

        let err = internal_error(system.execute(&session, ":").unwrap_err());
        assert_eq!(err.to_string(), "Enter a proper internal command.");
        let err = internal_error(system.execute(&session, ":nope").unwrap_err());
        assert_eq!(err.to_string(), "nope: command not found");
        let err = internal_error(system.execute(&session, "!  ").unwrap_err());
        assert_eq!(err, InternalCommandError::EmptyCommand("system"));
        let err = internal_error(system.execute(&session, "args").unwrap_err());
        assert_eq!(err, InternalCommandError::PrefixNotFound);
    }

    #[test]
    fn test_system_command_failures_are_not_fatal() {
        let system = InternalCommandSystem::new(Some(":"), Some("!"), false).unwrap();
        let session = ReplSession::new(root_context(), Arc::new(system), None, "> ");
        let flow = session
            .internals()
            .execute(&session, "!cmdrepl-no-such-program --flag")
            .unwrap();
        assert_eq!(flow, Flow::Continue);
    }

    #[test]
    fn test_help_text() {
        let text = system().help_text();
        assert!(text.starts_with("REPL help:\n"));
        assert!(text.contains("Prefix External/System commands with \"!\"."));
        assert!(text.contains("Prefix Internal commands with \":\"."));
        assert!(text.contains(":?, :h, :help"));
        assert!(text.contains(":exit, :q, :quit"));

        let text = InternalCommandSystem::new(None, None, true).unwrap().help_text();
        assert!(text.contains("No Internal commands are registered with this REPL."));
    }
}
