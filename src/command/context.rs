use crate::command::parser::{OptionParser, ParseMode};
use crate::command::types::Value;
use crate::command::{Command, Parameter};
use crate::error::{Result, UsageError, UsageErrorKind};
use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// Overrides of the command's own parse settings, used for the
/// subcommands of chained groups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContextSettings {
    pub allow_extra_args: Option<bool>,
    pub allow_interspersed_args: Option<bool>,
}

impl ContextSettings {
    pub fn chained() -> ContextSettings {
        ContextSettings {
            allow_extra_args: Some(true),
            allow_interspersed_args: Some(false),
        }
    }
}

/// The result of parsing one command's share of a line. Contexts form a
/// chain through `parent` from the addressed command up to the root.
#[derive(Clone)]
pub struct Context {
    pub command: Arc<Command>,
    /// The name the command was invoked with.
    pub info_name: String,
    pub parent: Option<Arc<Context>>,
    pub params: BTreeMap<String, Value>,
    /// Leftover tokens.
    pub args: Vec<String>,
    /// Tokens reserved for the group's subcommand(s).
    pub protected_args: Vec<String>,
    pub allow_extra_args: bool,
    pub allow_interspersed_args: bool,
    pub ignore_unknown_options: bool,
    /// Option prefixes known to the parser (`-`, `--`, ...).
    pub opt_prefixes: BTreeSet<String>,
    pub double_dash_found: bool,
    pub mode: ParseMode,
    objs: Vec<Arc<dyn Any + Send + Sync>>,
}

impl Context {
    /// A root context for `command` with nothing parsed.
    pub fn new(command: Arc<Command>) -> Context {
        Context {
            info_name: command.name.clone(),
            allow_extra_args: command.allow_extra_args,
            allow_interspersed_args: command.allow_interspersed_args,
            ignore_unknown_options: command.ignore_unknown_options,
            command,
            parent: None,
            params: BTreeMap::new(),
            args: Vec::new(),
            protected_args: Vec::new(),
            opt_prefixes: ["-", "--"].iter().map(|s| s.to_string()).collect(),
            double_dash_found: false,
            mode: ParseMode::Strict,
            objs: Vec::new(),
        }
    }

    /// Builds the context of `command` by parsing `args`.
    pub fn make(
        command: &Arc<Command>,
        info_name: &str,
        args: Vec<String>,
        parent: Option<Arc<Context>>,
        settings: ContextSettings,
        mode: ParseMode,
    ) -> Result<Context> {
        command.check_argument_order()?;

        let mut ctx = Context::new(command.clone());
        ctx.info_name = info_name.to_owned();
        ctx.ignore_unknown_options = command.ignore_unknown_options
            || parent.as_ref().map(|p| p.ignore_unknown_options).unwrap_or(false);
        ctx.parent = parent;
        ctx.mode = mode;
        if let Some(allow) = settings.allow_extra_args {
            ctx.allow_extra_args = allow;
        }
        if let Some(allow) = settings.allow_interspersed_args {
            ctx.allow_interspersed_args = allow;
        }

        ctx.parse_args(args)
            .map_err(|err| err.in_command(&ctx.command_path()))?;
        Ok(ctx)
    }

    fn parse_args(&mut self, args: Vec<String>) -> std::result::Result<(), UsageError> {
        let command = self.command.clone();
        let parser = OptionParser::new(
            &command,
            self.mode,
            self.allow_interspersed_args,
            self.ignore_unknown_options,
        );
        let mut parsed = parser.parse_args(args)?;
        self.opt_prefixes = parsed.opt_prefixes;
        self.double_dash_found = parsed.double_dash_found;

        for param in &command.params {
            let raw = parsed.opts.remove(&param.name);
            let value = match (&raw, self.mode) {
                (Some(raw), _) => param.convert(raw).map_err(|message| UsageErrorKind::BadParameter {
                    hint: param.hint(),
                    message,
                })?,
                (None, ParseMode::Lenient) => Value::Missing,
                (None, ParseMode::Strict) => param.default_value(),
            };

            if self.mode == ParseMode::Strict && param.required && param.value_is_missing(&value) {
                return Err(UsageErrorKind::MissingParameter {
                    kind: if param.is_argument() { "argument" } else { "option" },
                    hint: param.hint(),
                }
                .into());
            }

            self.params.insert(param.name.clone(), value);
        }

        let rest = parsed.largs;
        if !rest.is_empty() && !self.allow_extra_args {
            return Err(UsageErrorKind::ExtraArguments { args: rest }.into());
        }

        match command.group_spec() {
            Some(group) if group.chain => {
                self.protected_args = rest;
                self.args = Vec::new();
            }
            Some(_) => {
                let mut rest = rest.into_iter();
                self.protected_args = rest.next().into_iter().collect();
                self.args = rest.collect();
            }
            None => self.args = rest,
        }

        Ok(())
    }

    /// Attaches a shared object that callbacks can look up with
    /// [`Context::find_object`]. A context may carry objects of several
    /// types.
    pub fn with_obj(mut self, obj: Arc<dyn Any + Send + Sync>) -> Context {
        self.objs.push(obj);
        self
    }

    /// Finds the nearest object of type `T` in this context or its parents.
    pub fn find_object<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        let mut ctx = Some(self);
        while let Some(current) = ctx {
            for obj in current.objs.iter().rev() {
                if let Ok(obj) = obj.clone().downcast::<T>() {
                    return Some(obj);
                }
            }
            ctx = current.parent.as_deref();
        }

        None
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn depth(&self) -> usize {
        let mut depth = 1;
        let mut ctx = self.parent.as_deref();
        while let Some(parent) = ctx {
            depth += 1;
            ctx = parent.parent.as_deref();
        }
        depth
    }

    /// The invocation names from the root down to this context.
    pub fn command_path(&self) -> String {
        match &self.parent {
            Some(parent) => format!("{} {}", parent.command_path(), self.info_name),
            None => self.info_name.clone(),
        }
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    /// Whether `param` can still take values. Variadic arguments and
    /// `multiple` options always can; otherwise the value must be missing,
    /// empty, or (with `check_holes`) a tuple with a hole.
    pub fn is_param_incomplete(&self, param: &Parameter, check_holes: bool) -> bool {
        if param.nargs == -1 || param.multiple {
            return true;
        }

        let value = match self.params.get(&param.name) {
            Some(value) => value,
            None => return true,
        };

        if value.is_empty() {
            return true;
        }

        check_holes && param.nargs != 1 && value.has_holes()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Context")
            .field("command", &self.command.name)
            .field("info_name", &self.info_name)
            .field("parent", &self.parent.as_ref().map(|p| p.command.name.clone()))
            .field("params", &self.params)
            .field("args", &self.args)
            .field("protected_args", &self.protected_args)
            .field("double_dash_found", &self.double_dash_found)
            .field("mode", &self.mode)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ValueType;
    use crate::error::Error;
    use crate::testing::argv;
    use pretty_assertions::assert_eq;

    fn command() -> Arc<Command> {
        Arc::new(
            Command::new("copy")
                .param(Parameter::argument("src"))
                .param(Parameter::argument("dest").nargs(2))
                .param(Parameter::option(&["-n", "--count"]).value_type(ValueType::int_range(1, 10)))
                .param(Parameter::option(&["--force"]).flag()),
        )
    }

    #[test]
    fn test_lenient_context() {
        let ctx = Context::make(
            &command(),
            "copy",
            argv(&["a", "b"]),
            None,
            ContextSettings::default(),
            ParseMode::Lenient,
        )
        .unwrap();

        assert_eq!(ctx.value("src"), Some(&Value::Str("a".to_owned())));
        assert_eq!(
            ctx.value("dest"),
            Some(&Value::Tuple(vec![Value::Str("b".to_owned()), Value::Missing]))
        );
        assert_eq!(ctx.value("count"), Some(&Value::Missing));
        assert_eq!(ctx.value("force"), Some(&Value::Missing));

        let cmd = command();
        assert!(!ctx.is_param_incomplete(&cmd.params[0], true));
        assert!(ctx.is_param_incomplete(&cmd.params[1], true));
        assert!(!ctx.is_param_incomplete(&cmd.params[1], false));
        assert!(ctx.is_param_incomplete(&cmd.params[2], true));
    }

    #[test]
    fn test_strict_context() {
        let ctx = Context::make(
            &command(),
            "copy",
            argv(&["a", "b", "c", "-n", "3"]),
            None,
            ContextSettings::default(),
            ParseMode::Strict,
        )
        .unwrap();
        assert_eq!(ctx.value("count"), Some(&Value::Int(3)));
        assert_eq!(ctx.value("force"), Some(&Value::Bool(false)));

        let err = Context::make(
            &command(),
            "copy",
            argv(&["a"]),
            None,
            ContextSettings::default(),
            ParseMode::Strict,
        )
        .unwrap_err();
        match err {
            Error::Usage(usage) => {
                assert_eq!(usage.to_string(), "Missing argument 'DEST'.");
                assert_eq!(usage.command.as_deref(), Some("copy"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_bad_parameter_in_both_modes() {
        for mode in &[ParseMode::Strict, ParseMode::Lenient] {
            let err = Context::make(
                &command(),
                "copy",
                argv(&["a", "b", "c", "-n", "42"]),
                None,
                ContextSettings::default(),
                *mode,
            )
            .unwrap_err();
            assert_eq!(
                err.to_string(),
                "Invalid value for '-n' / '--count': 42 is not in the range 1<=x<=10."
            );
        }
    }

    #[test]
    fn test_extra_arguments() {
        let err = Context::make(
            &command(),
            "copy",
            argv(&["a", "b", "c", "d"]),
            None,
            ContextSettings::default(),
            ParseMode::Lenient,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Got unexpected extra argument (d)");
    }

    #[test]
    fn test_group_protected_args_and_objects() {
        let group = Arc::new(Command::group("main").param(Parameter::option(&["--debug"]).flag()));
        let root = Arc::new(Context::new(group.clone()).with_obj(Arc::new(42usize)));
        let ctx = Context::make(
            &group,
            "main",
            argv(&["--debug", "sub", "x", "y"]),
            Some(root),
            ContextSettings::default(),
            ParseMode::Lenient,
        )
        .unwrap();

        assert_eq!(ctx.protected_args, argv(&["sub"]));
        assert_eq!(ctx.args, argv(&["x", "y"]));
        assert_eq!(ctx.value("debug"), Some(&Value::Bool(true)));
        assert_eq!(ctx.depth(), 2);
        assert_eq!(ctx.command_path(), "main main");
        assert_eq!(ctx.find_object::<usize>().as_deref(), Some(&42));
        assert!(ctx.find_object::<String>().is_none());
    }
}
