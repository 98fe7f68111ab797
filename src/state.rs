//! Classifies where the cursor is: which group and command the line
//! addresses and which parameter the next word belongs to.
use crate::command::{Command, Context, OptionAction, ParamKind, Parameter};
use crate::error::{Result, StructureError};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// The structural identity of a parameter. Built from its definition only,
/// never from the values typed for it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParamKey {
    name: String,
    argument: bool,
    opts: Vec<String>,
    secondary_opts: Vec<String>,
    action: Option<OptionAction>,
    value_type: String,
    nargs: i32,
    multiple: bool,
    required: bool,
    hidden: bool,
}

impl ParamKey {
    pub fn new(param: &Parameter) -> ParamKey {
        ParamKey {
            name: param.name.clone(),
            argument: param.kind == ParamKind::Argument,
            opts: param.opts().to_vec(),
            secondary_opts: param.secondary_opts().to_vec(),
            action: param.action(),
            value_type: param.value_type.descriptor(),
            nargs: param.nargs,
            multiple: param.multiple,
            required: param.required,
            hidden: param.hidden,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommandKey {
    name: String,
    group: bool,
    chain: bool,
    hidden: bool,
    params: Vec<ParamKey>,
}

impl CommandKey {
    pub fn new(command: &Command) -> CommandKey {
        CommandKey {
            name: command.name.clone(),
            group: command.is_group(),
            chain: command.is_chain(),
            hidden: command.hidden,
            params: command.params.iter().map(ParamKey::new).collect(),
        }
    }
}

/// What two parsing states are compared by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StateKey {
    group: CommandKey,
    command: Option<CommandKey>,
    param: Option<ParamKey>,
    remaining: Vec<ParamKey>,
}

#[derive(Debug, Clone)]
pub struct ParsingState {
    /// The context the REPL runs in.
    pub cli_ctx: Arc<Context>,
    /// The context the complete words resolved to.
    pub current_ctx: Arc<Context>,
    pub args: Vec<String>,
    pub current_group: Arc<Command>,
    /// `None` while a subcommand of `current_group` is being chosen.
    pub current_command: Option<Arc<Command>>,
    /// The index of the parameter of `current_command` the next word is
    /// for.
    pub current_param: Option<usize>,
    /// The indices of the parameters of `current_command` still waiting
    /// for values.
    pub remaining_params: Vec<usize>,
    pub double_dash_found: bool,
}

impl ParsingState {
    pub fn classify(cli_ctx: &Arc<Context>, current_ctx: &Arc<Context>, args: &[String]) -> Result<ParsingState> {
        check_fillable(cli_ctx)?;
        let mut ancestor = current_ctx.parent.as_deref();
        while let Some(ctx) = ancestor {
            check_fillable(ctx)?;
            ancestor = ctx.parent.as_deref();
        }

        let (current_group, current_command) = current_group_and_command(cli_ctx, current_ctx);
        let mut state = ParsingState {
            cli_ctx: cli_ctx.clone(),
            current_ctx: current_ctx.clone(),
            args: args.to_vec(),
            current_group,
            current_command: current_command.clone(),
            current_param: None,
            remaining_params: Vec::new(),
            double_dash_found: current_ctx.double_dash_found,
        };

        if let Some(command) = current_command {
            state.remaining_params = command
                .params
                .iter()
                .enumerate()
                .filter(|(_, param)| current_ctx.is_param_incomplete(param, true))
                .map(|(i, _)| i)
                .collect();

            // An option waiting for its values wins over a positional
            // argument.
            state.current_param = match current_option(&command, args) {
                Some(i) => Some(i),
                None => current_argument(&command, current_ctx)?,
            };
        }

        trace!("state: {}", state);
        Ok(state)
    }

    pub fn param(&self) -> Option<&Parameter> {
        let command = self.current_command.as_ref()?;
        command.params.get(self.current_param?)
    }

    pub fn remaining(&self) -> Vec<&Parameter> {
        match &self.current_command {
            Some(command) => self
                .remaining_params
                .iter()
                .filter_map(|i| command.params.get(*i))
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn key(&self) -> StateKey {
        StateKey {
            group: CommandKey::new(&self.current_group),
            command: self.current_command.as_deref().map(CommandKey::new),
            param: self.param().map(ParamKey::new),
            remaining: self.remaining().into_iter().map(ParamKey::new).collect(),
        }
    }
}

/// A group argument that is required, has no default and got no value can
/// never be filled from inside the REPL.
fn check_fillable(ctx: &Context) -> Result<()> {
    if !ctx.command.is_group() {
        return Ok(());
    }

    for param in ctx.command.arguments() {
        let missing = match ctx.value(&param.name) {
            Some(value) => param.value_is_missing(value),
            None => true,
        };

        if param.required && param.default.is_none() && missing {
            return Err(StructureError::UnfillableGroupArgument {
                group: ctx.command.name.clone(),
                argument: param.name.clone(),
            }
            .into());
        }
    }

    Ok(())
}

fn current_group_and_command(cli_ctx: &Context, current_ctx: &Context) -> (Arc<Command>, Option<Arc<Command>>) {
    let command = &current_ctx.command;
    if Arc::ptr_eq(command, &cli_ctx.command) {
        return (command.clone(), None);
    }

    let group = match &current_ctx.parent {
        Some(parent) => parent.command.clone(),
        None => command.clone(),
    };

    let arguments: Vec<&Parameter> = command.arguments().collect();
    let arguments_filled = arguments
        .iter()
        .all(|param| !current_ctx.is_param_incomplete(param, true));
    let has_incomplete_arguments = arguments.is_empty() || !arguments_filled;

    if command.is_group() && arguments_filled {
        (command.clone(), None)
    } else if !group.is_chain() || (!command.params.is_empty() && has_incomplete_arguments) {
        (group, Some(command.clone()))
    } else {
        // Choosing the next subcommand of a chain.
        (group, None)
    }
}

/// The option whose flag is among the last `nargs` words, unless `--` ended
/// option parsing. Flags and counters never take values.
fn current_option(command: &Command, args: &[String]) -> Option<usize> {
    if args.iter().any(|arg| arg == "--") {
        return None;
    }

    command.params.iter().position(|param| {
        if !param.takes_value() {
            return false;
        }

        let nargs = param.nargs.max(1) as usize;
        let tail = &args[args.len().saturating_sub(nargs)..];
        param.all_opts().any(|opt| tail.contains(opt))
    })
}

/// The first argument still waiting for values; the variadic argument is
/// considered last.
fn current_argument(command: &Command, ctx: &Context) -> Result<Option<usize>> {
    Ok(command
        .params_in_completion_order()?
        .into_iter()
        .find(|(_, param)| param.is_argument() && ctx.is_param_incomplete(param, true))
        .map(|(i, _)| i))
}

impl PartialEq for ParsingState {
    fn eq(&self, other: &ParsingState) -> bool {
        self.key() == other.key()
    }
}

impl Eq for ParsingState {}

impl Hash for ParsingState {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Display for ParsingState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.current_group.name)?;
        if let Some(command) = &self.current_command {
            write!(f, " > {}", command.name)?;
        }

        if let Some(param) = self.param() {
            write!(f, " > {}", param.name)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ParseMode;
    use crate::error::Error;
    use crate::resolver::resolve_context;
    use crate::testing::root_context;
    use crate::tokenizer::tokenize;
    use pretty_assertions::assert_eq;

    fn classify_line(root: &Arc<Context>, line: &str) -> ParsingState {
        let args = tokenize(line).args;
        let ctx = resolve_context(root, &args, ParseMode::Lenient).unwrap();
        ParsingState::classify(root, &ctx, &args).unwrap()
    }

    fn describe(line: &str) -> String {
        classify_line(&root_context(), line).to_string()
    }

    fn remaining(line: &str) -> Vec<String> {
        classify_line(&root_context(), line)
            .remaining()
            .into_iter()
            .map(|p| p.name.clone())
            .collect()
    }

    #[test]
    fn test_group_selection() {
        assert_eq!(describe(""), "cli");
        assert_eq!(describe("a"), "cli");
        assert_eq!(describe("nope "), "cli");
        assert_eq!(describe("sub "), "sub");
        assert_eq!(describe("sub leaf "), "sub > leaf");
    }

    #[test]
    fn test_arguments() {
        let state = classify_line(&root_context(), "args hi ");
        assert_eq!(state.to_string(), "cli > args > str_arg");
        assert_eq!(remaining("args hi "), vec!["str_arg", "last"]);

        assert_eq!(describe("args hi there "), "cli > args > last");
        assert_eq!(describe("args hi there you "), "cli > args");
        assert_eq!(remaining("args hi there you "), Vec::<String>::new());
    }

    #[test]
    fn test_options_before_arguments() {
        assert_eq!(describe("opts --n "), "cli > opts > n");
        assert_eq!(describe("opts --n 3 "), "cli > opts > name");
        assert_eq!(describe("opts --pair x "), "cli > opts > pair");
        assert_eq!(describe("opts --pair x y "), "cli > opts > name");
        assert_eq!(describe("opts --shout "), "cli > opts > name");
        assert_eq!(describe("opts -c "), "cli > opts > name");
        assert_eq!(describe("opts -- --n "), "cli > opts");
        assert_eq!(describe("opts -- "), "cli > opts > name");

        // Multiple options always have room for more.
        assert_eq!(remaining("opts -c --shout --n 4 bob "), vec!["tag", "pair"]);
        assert_eq!(remaining("opts bob "), vec!["n", "count", "shout", "tag", "pair"]);
    }

    #[test]
    fn test_variadic_argument() {
        assert_eq!(describe("files "), "cli > files > files");
        assert_eq!(describe("files a b "), "cli > files > files");
    }

    #[test]
    fn test_chain() {
        assert_eq!(describe("chain "), "chain");
        assert_eq!(describe("chain one "), "chain > one > value");
        assert_eq!(describe("chain one 1 "), "chain");
        assert_eq!(describe("chain one 1 two "), "chain > two");
    }

    #[test]
    fn test_equality_ignores_values() {
        let root = root_context();
        assert_eq!(classify_line(&root, "args hi "), classify_line(&root, "args hi "));
        assert_eq!(classify_line(&root, "args hi "), classify_line(&root, "args ho "));
        assert_eq!(
            classify_line(&root, "opts --n 3 "),
            classify_line(&root, "opts --n 7 ")
        );
        assert!(classify_line(&root, "args hi ") != classify_line(&root, "args hi there "));
        assert!(classify_line(&root, "a ") != classify_line(&root, "b "));
    }

    #[test]
    fn test_unfillable_group_argument() {
        let cli = Arc::new(
            Command::group("cli")
                .param(Parameter::argument("target"))
                .subcommand(Command::new("a")),
        );
        let root = Arc::new(Context::new(cli));
        match ParsingState::classify(&root, &root, &[]) {
            Err(Error::Structure(err)) => {
                assert_eq!(err.name(), "UnfillableGroupArgumentError");
                assert_eq!(
                    err,
                    StructureError::UnfillableGroupArgument {
                        group: "cli".to_owned(),
                        argument: "target".to_owned(),
                    }
                );
            }
            other => panic!("unexpected: {:?}", other.map(|s| s.to_string())),
        }
    }
}
