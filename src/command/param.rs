use crate::command::parser::{split_opt, RawValue};
use crate::command::types::{Value, ValueType};
use crate::command::CompleteFn;
use std::fmt;

/// What an option does when its flag is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionAction {
    /// Takes `nargs` values.
    Store,
    /// A boolean flag (`--shout`, or `--shout/--no-shout`).
    Flag,
    /// Counts occurrences (`-vvv`).
    Count,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParamKind {
    Argument,
    Option {
        opts: Vec<String>,
        /// The flags that store the opposite of `flag_value`.
        secondary_opts: Vec<String>,
        action: OptionAction,
    },
}

/// A positional argument or an option of a command.
#[derive(Clone)]
pub struct Parameter {
    pub name: String,
    pub kind: ParamKind,
    pub value_type: ValueType,
    /// The number of values; `-1` takes everything that remains.
    pub nargs: i32,
    pub multiple: bool,
    pub required: bool,
    pub default: Option<Value>,
    pub hidden: bool,
    pub help: Option<String>,
    pub metavar: Option<String>,
    /// The value a boolean flag stores when a primary flag is given.
    pub flag_value: bool,
    complete: Option<CompleteFn>,
}

impl Parameter {
    /// A positional argument, required by default.
    pub fn argument(name: &str) -> Parameter {
        Parameter {
            name: name.replace('-', "_"),
            kind: ParamKind::Argument,
            value_type: ValueType::String,
            nargs: 1,
            multiple: false,
            required: true,
            default: None,
            hidden: false,
            help: None,
            metavar: None,
            flag_value: true,
            complete: None,
        }
    }

    /// An option declared by its flags, e.g. `&["-n", "--name"]`. A
    /// declaration containing `/` (`"--shout/--no-shout"`) makes a boolean
    /// flag with secondary flags, and a declaration without a prefix names
    /// the option explicitly.
    pub fn option(decls: &[&str]) -> Parameter {
        let mut name = None;
        let mut opts = Vec::new();
        let mut secondary_opts = Vec::new();
        for decl in decls {
            let decl = decl.trim();
            if let Some(slash) = decl.find('/').filter(|i| *i > 0) {
                let (first, second) = decl.split_at(slash);
                opts.push(first.trim_end().to_owned());
                secondary_opts.push(second[1..].trim_start().to_owned());
            } else if split_opt(decl).0.is_empty() {
                name = Some(decl.to_owned());
            } else {
                opts.push(decl.to_owned());
            }
        }

        let name = name.unwrap_or_else(|| {
            // Named after the flag with the longest prefix; `--dry-run`
            // becomes `dry_run`.
            let mut possible: Vec<(&str, &str)> = opts.iter().map(|o| split_opt(o)).collect();
            possible.sort_by_key(|(prefix, _)| std::cmp::Reverse(prefix.len()));
            possible
                .first()
                .map(|(_, name)| name.replace('-', "_").to_lowercase())
                .unwrap_or_default()
        });

        let action = if secondary_opts.is_empty() {
            OptionAction::Store
        } else {
            OptionAction::Flag
        };

        Parameter {
            name,
            kind: ParamKind::Option {
                opts,
                secondary_opts,
                action,
            },
            value_type: if action == OptionAction::Flag {
                ValueType::Bool
            } else {
                ValueType::String
            },
            nargs: 1,
            multiple: false,
            required: false,
            default: None,
            hidden: false,
            help: None,
            metavar: None,
            flag_value: true,
            complete: None,
        }
    }

    fn set_action(mut self, new_action: OptionAction) -> Parameter {
        if let ParamKind::Option { action, .. } = &mut self.kind {
            *action = new_action;
        }
        self
    }

    /// Makes an option a boolean flag.
    pub fn flag(mut self) -> Parameter {
        self.value_type = ValueType::Bool;
        self.set_action(OptionAction::Flag)
    }

    /// Makes an option count its occurrences.
    pub fn count(mut self) -> Parameter {
        self.value_type = ValueType::Int;
        self.set_action(OptionAction::Count)
    }

    pub fn value_type(mut self, value_type: ValueType) -> Parameter {
        if let Some(arity) = value_type.arity() {
            self.nargs = arity as i32;
        }
        self.value_type = value_type;
        self
    }

    pub fn nargs(mut self, nargs: i32) -> Parameter {
        self.nargs = nargs;
        if nargs == -1 && self.is_argument() {
            self.required = false;
        }
        self
    }

    pub fn multiple(mut self) -> Parameter {
        self.multiple = true;
        self
    }

    pub fn required(mut self, required: bool) -> Parameter {
        self.required = required;
        self
    }

    pub fn default(mut self, value: Value) -> Parameter {
        self.default = Some(value);
        self.required = false;
        self
    }

    pub fn hidden(mut self) -> Parameter {
        self.hidden = true;
        self
    }

    pub fn help(mut self, help: &str) -> Parameter {
        self.help = Some(help.to_owned());
        self
    }

    pub fn metavar(mut self, metavar: &str) -> Parameter {
        self.metavar = Some(metavar.to_owned());
        self
    }

    pub fn flag_value(mut self, flag_value: bool) -> Parameter {
        self.flag_value = flag_value;
        self
    }

    /// Completes this parameter's values with `f` instead of its type.
    pub fn complete_with(mut self, f: CompleteFn) -> Parameter {
        self.complete = Some(f);
        self
    }

    pub fn custom_complete(&self) -> Option<&CompleteFn> {
        self.complete.as_ref()
    }

    pub fn is_argument(&self) -> bool {
        self.kind == ParamKind::Argument
    }

    pub fn is_option(&self) -> bool {
        !self.is_argument()
    }

    pub fn action(&self) -> Option<OptionAction> {
        match &self.kind {
            ParamKind::Option { action, .. } => Some(*action),
            ParamKind::Argument => None,
        }
    }

    pub fn is_flag(&self) -> bool {
        self.action() == Some(OptionAction::Flag)
    }

    pub fn is_count(&self) -> bool {
        self.action() == Some(OptionAction::Count)
    }

    pub fn is_bool_flag(&self) -> bool {
        self.is_flag() && self.value_type == ValueType::Bool
    }

    pub fn takes_value(&self) -> bool {
        self.action() == Some(OptionAction::Store)
    }

    pub fn opts(&self) -> &[String] {
        match &self.kind {
            ParamKind::Option { opts, .. } => opts,
            ParamKind::Argument => &[],
        }
    }

    pub fn secondary_opts(&self) -> &[String] {
        match &self.kind {
            ParamKind::Option { secondary_opts, .. } => secondary_opts,
            ParamKind::Argument => &[],
        }
    }

    /// Primary then secondary flags.
    pub fn all_opts(&self) -> impl Iterator<Item = &String> {
        self.opts().iter().chain(self.secondary_opts().iter())
    }

    /// How the parameter is referred to in messages: `'NAME'` for
    /// arguments, `'-n' / '--name'` for options.
    pub fn hint(&self) -> String {
        match &self.kind {
            ParamKind::Argument => format!(
                "'{}'",
                self.metavar
                    .clone()
                    .unwrap_or_else(|| self.name.to_uppercase())
            ),
            ParamKind::Option { opts, .. } => {
                let quoted: Vec<String> = opts.iter().map(|o| format!("'{}'", o)).collect();
                quoted.join(" / ")
            }
        }
    }

    /// The value used when nothing was given on the command line.
    pub fn default_value(&self) -> Value {
        if let Some(default) = &self.default {
            return default.clone();
        }

        match self.action() {
            Some(OptionAction::Flag) => Value::Bool(!self.flag_value),
            Some(OptionAction::Count) => Value::Int(0),
            _ if self.multiple || self.nargs == -1 => Value::List(Vec::new()),
            _ => Value::Missing,
        }
    }

    /// Whether a value counts as "not given" for required checks.
    pub fn value_is_missing(&self, value: &Value) -> bool {
        match value {
            Value::Missing => true,
            Value::Tuple(_) | Value::List(_) if self.nargs != 1 || self.multiple => value.is_empty(),
            _ => false,
        }
    }

    fn convert_one(&self, raw: Option<&str>, slot: usize) -> Result<Value, String> {
        match raw {
            Some(raw) => self.value_type.slot(slot).convert(raw),
            None => Ok(Value::Missing),
        }
    }

    /// Converts what the parser collected. `None` slots become `Missing`.
    pub fn convert(&self, raw: &RawValue) -> Result<Value, String> {
        match raw {
            RawValue::Single(value) => self.convert_one(value.as_deref(), 0),
            RawValue::Tuple(values) => values
                .iter()
                .enumerate()
                .map(|(i, value)| self.convert_one(value.as_deref(), i))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Tuple),
            RawValue::Rest(values) => values
                .iter()
                .map(|value| self.value_type.convert(value))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            RawValue::Flag(b) => Ok(Value::Bool(*b)),
            RawValue::Count(n) => Ok(Value::Int(*n as i64)),
            RawValue::Multiple(values) => values
                .iter()
                .map(|value| self.convert(value))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
        }
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Parameter")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("value_type", &self.value_type)
            .field("nargs", &self.nargs)
            .field("multiple", &self.multiple)
            .field("required", &self.required)
            .field("hidden", &self.hidden)
            .finish()
    }
}
