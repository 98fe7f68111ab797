//! The command tree: groups, commands and their parameters.
//!
//! The tree is built once with the builder methods below and is read-only
//! afterwards; every node is shared through `Arc` so that contexts built
//! while the user types can point back into it cheaply.
use crate::error::{Error, UsageError, UsageErrorKind};
use crate::resolver::next_context;
use std::fmt;
use std::sync::Arc;

pub mod context;
pub mod param;
pub mod parser;
pub mod types;

pub use context::{Context, ContextSettings};
pub use param::{OptionAction, ParamKind, Parameter};
pub use parser::{split_opt, OptionParser, ParseMode, RawValue};
pub use types::{Bounds, ChoiceSpec, CustomType, NumberRange, PathSpec, Value, ValueType};

/// A completion callback: receives the context being completed, the
/// parameter and the incomplete text.
pub type CompleteFn = Arc<
    dyn Fn(&Context, &Parameter, &str) -> Result<Vec<CompletionItem>, failure::Error> + Send + Sync,
>;

/// What a completion callback returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionItem {
    pub value: String,
    pub help: Option<String>,
}

impl From<&str> for CompletionItem {
    fn from(value: &str) -> CompletionItem {
        CompletionItem {
            value: value.to_owned(),
            help: None,
        }
    }
}

impl From<String> for CompletionItem {
    fn from(value: String) -> CompletionItem {
        CompletionItem { value, help: None }
    }
}

impl From<(&str, &str)> for CompletionItem {
    fn from((value, help): (&str, &str)) -> CompletionItem {
        CompletionItem {
            value: value.to_owned(),
            help: Some(help.to_owned()),
        }
    }
}

/// The function run when a command is invoked.
#[derive(Clone)]
pub struct Callback(Arc<dyn Fn(&Context) -> Result<(), failure::Error> + Send + Sync>);

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Callback")
    }
}

#[derive(Debug, Clone, Default)]
pub struct GroupSpec {
    pub commands: Vec<Arc<Command>>,
    /// Several subcommands may follow each other on one line.
    pub chain: bool,
    /// Subcommand names are matched case-insensitively.
    pub ignore_case: bool,
    /// Runs the group's callback even without a subcommand.
    pub invoke_without_command: bool,
}

#[derive(Debug, Clone)]
pub struct Command {
    pub name: String,
    pub help: Option<String>,
    pub short_help: Option<String>,
    pub hidden: bool,
    pub aliases: Vec<String>,
    pub params: Vec<Parameter>,
    pub allow_extra_args: bool,
    pub allow_interspersed_args: bool,
    pub ignore_unknown_options: bool,
    callback: Option<Callback>,
    group: Option<GroupSpec>,
}

impl Command {
    /// A leaf command.
    pub fn new(name: &str) -> Command {
        Command {
            name: name.to_owned(),
            help: None,
            short_help: None,
            hidden: false,
            aliases: Vec::new(),
            params: Vec::new(),
            allow_extra_args: false,
            allow_interspersed_args: true,
            ignore_unknown_options: false,
            callback: None,
            group: None,
        }
    }

    /// A command that dispatches to subcommands.
    pub fn group(name: &str) -> Command {
        Command {
            allow_extra_args: true,
            allow_interspersed_args: false,
            group: Some(GroupSpec::default()),
            ..Command::new(name)
        }
    }

    fn group_mut(&mut self) -> &mut GroupSpec {
        self.group.get_or_insert_with(GroupSpec::default)
    }

    pub fn chain(mut self, chain: bool) -> Command {
        self.group_mut().chain = chain;
        self
    }

    pub fn ignore_case(mut self) -> Command {
        self.group_mut().ignore_case = true;
        self
    }

    pub fn invoke_without_command(mut self) -> Command {
        self.group_mut().invoke_without_command = true;
        self
    }

    pub fn subcommand(mut self, command: Command) -> Command {
        self.group_mut().commands.push(Arc::new(command));
        self
    }

    pub fn param(mut self, param: Parameter) -> Command {
        self.params.push(param);
        self
    }

    pub fn help(mut self, help: &str) -> Command {
        self.help = Some(help.to_owned());
        self
    }

    pub fn short_help(mut self, short_help: &str) -> Command {
        self.short_help = Some(short_help.to_owned());
        self
    }

    pub fn hidden(mut self) -> Command {
        self.hidden = true;
        self
    }

    pub fn alias(mut self, alias: &str) -> Command {
        self.aliases.push(alias.to_owned());
        self
    }

    pub fn ignore_unknown_options(mut self) -> Command {
        self.ignore_unknown_options = true;
        self
    }

    pub fn callback<F>(mut self, f: F) -> Command
    where
        F: Fn(&Context) -> Result<(), failure::Error> + Send + Sync + 'static,
    {
        self.callback = Some(Callback(Arc::new(f)));
        self
    }

    pub fn is_group(&self) -> bool {
        self.group.is_some()
    }

    pub fn is_chain(&self) -> bool {
        self.group.as_ref().map(|g| g.chain).unwrap_or(false)
    }

    pub fn group_spec(&self) -> Option<&GroupSpec> {
        self.group.as_ref()
    }

    pub fn subcommands(&self) -> &[Arc<Command>] {
        match &self.group {
            Some(group) => &group.commands,
            None => &[],
        }
    }

    /// Subcommand names, sorted.
    pub fn list_commands(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.subcommands().iter().map(|c| c.name.as_str()).collect();
        names.sort();
        names
    }

    /// Looks a subcommand up by name, then by alias, then (for groups that
    /// ignore case) case-insensitively.
    pub fn get_command(&self, name: &str) -> Option<&Arc<Command>> {
        let group = self.group.as_ref()?;
        group
            .commands
            .iter()
            .find(|c| c.name == name)
            .or_else(|| group.commands.iter().find(|c| c.aliases.iter().any(|a| a == name)))
            .or_else(|| {
                if !group.ignore_case {
                    return None;
                }

                let lower = name.to_lowercase();
                group.commands.iter().find(|c| {
                    c.name.to_lowercase() == lower
                        || c.aliases.iter().any(|a| a.to_lowercase() == lower)
                })
            })
    }

    pub fn arguments(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter().filter(|p| p.is_argument())
    }

    pub fn options(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter().filter(|p| p.is_option())
    }

    /// The one-line help shown next to the command's name.
    pub fn short_help_text(&self) -> Option<String> {
        const LIMIT: usize = 45;

        if let Some(short_help) = &self.short_help {
            return Some(short_help.clone());
        }

        let first = self.help.as_ref()?.lines().find(|l| !l.trim().is_empty())?.trim();
        let sentence = match first.find(". ") {
            Some(end) => &first[..end + 1],
            None => first,
        };

        if sentence.chars().count() <= LIMIT {
            Some(sentence.to_owned())
        } else {
            let truncated: String = sentence.chars().take(LIMIT - 3).collect();
            Some(format!("{}...", truncated.trim_end()))
        }
    }

    /// Parameters with their indices, the variadic argument moved to the
    /// end. A variadic argument followed by another argument is a
    /// definition error.
    pub fn params_in_completion_order(&self) -> Result<Vec<(usize, &Parameter)>, Error> {
        let mut ordered = Vec::with_capacity(self.params.len());
        let mut variadic: Option<(usize, &Parameter)> = None;
        for (i, param) in self.params.iter().enumerate() {
            if param.is_argument() {
                if let Some((position, catch_all)) = variadic {
                    return Err(crate::error::StructureError::ArgumentPosition {
                        command: self.name.clone(),
                        argument: catch_all.name.clone(),
                        position,
                    }
                    .into());
                }

                if param.nargs == -1 {
                    variadic = Some((i, param));
                    continue;
                }
            }

            ordered.push((i, param));
        }

        ordered.extend(variadic);
        Ok(ordered)
    }

    pub fn check_argument_order(&self) -> Result<(), Error> {
        self.params_in_completion_order().map(|_| ())
    }
}

/// Runs the callbacks of a strictly parsed context: a group runs its own
/// callback and then its subcommand's, a chained group resolves every
/// subcommand first and then runs them in order.
pub fn invoke(ctx: &Arc<Context>) -> Result<(), failure::Error> {
    let command = &ctx.command;
    let group = match command.group_spec() {
        Some(group) => group,
        None => return run_callback(ctx),
    };

    let mut args: Vec<String> = ctx.protected_args.iter().chain(ctx.args.iter()).cloned().collect();
    if args.is_empty() {
        if group.invoke_without_command {
            return run_callback(ctx);
        }

        let err = UsageError::new(UsageErrorKind::MissingCommand).in_command(&ctx.command_path());
        return Err(Error::from(err).into());
    }

    run_callback(ctx)?;
    if !group.chain {
        if let Some(sub_ctx) = next_context(ctx, &args, ContextSettings::default(), ParseMode::Strict)? {
            trace!("invoke: {}", sub_ctx.command_path());
            invoke(&sub_ctx)?;
        }
        return Ok(());
    }

    let mut contexts = Vec::new();
    while !args.is_empty() {
        match next_context(ctx, &args, ContextSettings::chained(), ParseMode::Strict)? {
            Some(sub_ctx) => {
                args = sub_ctx.args.clone();
                contexts.push(sub_ctx);
            }
            None => break,
        }
    }

    for sub_ctx in contexts {
        trace!("invoke: {}", sub_ctx.command_path());
        invoke(&sub_ctx)?;
    }

    Ok(())
}

fn run_callback(ctx: &Context) -> Result<(), failure::Error> {
    match &ctx.command.callback {
        Some(Callback(f)) => f(ctx),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::argv;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    #[test]
    fn test_get_command() {
        let group = Command::group("main")
            .ignore_case()
            .subcommand(Command::new("Build").alias("b"))
            .subcommand(Command::new("test"));
        assert_eq!(group.get_command("Build").map(|c| c.name.as_str()), Some("Build"));
        assert_eq!(group.get_command("b").map(|c| c.name.as_str()), Some("Build"));
        assert_eq!(group.get_command("BUILD").map(|c| c.name.as_str()), Some("Build"));
        assert!(group.get_command("nope").is_none());
        assert_eq!(group.list_commands(), vec!["Build", "test"]);

        let strict = Command::group("main").subcommand(Command::new("build"));
        assert!(strict.get_command("BUILD").is_none());
    }

    #[test]
    fn test_short_help_text() {
        let cmd = Command::new("x").help("Builds the project. Then does more.");
        assert_eq!(cmd.short_help_text().as_deref(), Some("Builds the project."));

        let cmd = Command::new("x").help("An extremely long description that cannot fit in the column");
        assert_eq!(
            cmd.short_help_text().as_deref(),
            Some("An extremely long description that cannot...")
        );
        assert_eq!(Command::new("x").short_help_text(), None);
    }

    #[test]
    fn test_variadic_argument_position() {
        let cmd = Command::new("cmd")
            .param(Parameter::argument("files").nargs(-1))
            .param(Parameter::option(&["--x"]))
            .param(Parameter::argument("dest"));
        match cmd.params_in_completion_order() {
            Err(Error::Structure(err)) => assert_eq!(
                err.to_string(),
                "The argument 'files' with nargs=-1, in command 'cmd' must be defined at the end of the parameter list, but found at position 0"
            ),
            other => panic!("unexpected: {:?}", other.map(|p| p.len())),
        }

        let cmd = Command::new("cmd")
            .param(Parameter::argument("files").nargs(-1))
            .param(Parameter::option(&["--x"]));
        let order: Vec<usize> = cmd
            .params_in_completion_order()
            .unwrap()
            .into_iter()
            .map(|(i, _)| i)
            .collect();
        assert_eq!(order, vec![1, 0]);
    }

    #[test]
    fn test_invoke_group_and_chain() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let record = |name: &'static str| {
            let calls = calls.clone();
            move |ctx: &Context| {
                let value = ctx.value("value").map(|v| v.to_string()).unwrap_or_default();
                calls.lock().unwrap().push(format!("{}:{}", name, value));
                Ok::<(), failure::Error>(())
            }
        };

        let root = Command::group("main")
            .callback(record("main"))
            .subcommand(
                Command::group("chain")
                    .chain(true)
                    .callback(record("chain"))
                    .subcommand(
                        Command::new("a")
                            .param(Parameter::argument("value"))
                            .callback(record("a")),
                    )
                    .subcommand(Command::new("b").callback(record("b"))),
            );
        let root_ctx = Arc::new(Context::new(Arc::new(root)));

        let ctx = next_context(
            &root_ctx,
            &argv(&["chain", "a", "1", "b", "a", "2"]),
            ContextSettings::default(),
            ParseMode::Strict,
        )
        .unwrap()
        .unwrap();
        invoke(&ctx).unwrap();
        assert_eq!(
            *calls.lock().unwrap(),
            vec!["chain:", "a:1", "b:", "a:2"]
        );
    }

    #[test]
    fn test_invoke_missing_command() {
        let root = Command::group("main").subcommand(Command::group("sub").subcommand(Command::new("x")));
        let root_ctx = Arc::new(Context::new(Arc::new(root)));
        let ctx = next_context(&root_ctx, &argv(&["sub"]), ContextSettings::default(), ParseMode::Strict)
            .unwrap()
            .unwrap();
        let err = invoke(&ctx).unwrap_err();
        match err.downcast_ref::<Error>() {
            Some(Error::Usage(usage)) => {
                assert_eq!(usage.to_string(), "Missing command.");
                assert_eq!(usage.command.as_deref(), Some("main sub"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
