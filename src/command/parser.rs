//! The option parser. One algorithm serves both execution (`Strict`) and
//! completion (`Lenient`): the lenient mode fills missing values with holes
//! instead of failing, so a half-typed line still maps to parameters.
use crate::command::param::{OptionAction, Parameter};
use crate::command::Command;
use crate::error::UsageErrorKind;
use crate::fuzzy::close_matches;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

type Result<I> = std::result::Result<I, UsageErrorKind>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseMode {
    /// Arity shortfalls are errors; defaults and required checks apply.
    Strict,
    /// Missing values become holes; only what was typed is bound.
    Lenient,
}

/// What the parser collected for one parameter, before type conversion.
/// `None` marks a value that has not been typed yet.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Single(Option<String>),
    Tuple(Vec<Option<String>>),
    Rest(Vec<String>),
    Flag(bool),
    Count(u32),
    Multiple(Vec<RawValue>),
}

/// Splits an option into its prefix and name: `--foo` into `("--", "foo")`,
/// `-f` into `("-", "f")` and `foo` into `("", "foo")`.
pub fn split_opt(opt: &str) -> (&str, &str) {
    let mut chars = opt.chars();
    let first = match chars.next() {
        Some(first) => first,
        None => return ("", opt),
    };

    if first.is_alphanumeric() {
        return ("", opt);
    }

    let len = first.len_utf8();
    if chars.next() == Some(first) {
        (&opt[..len * 2], &opt[len * 2..])
    } else {
        (&opt[..len], &opt[len..])
    }
}

#[derive(Debug, Default)]
pub struct ParseOutput {
    pub opts: BTreeMap<String, RawValue>,
    /// Tokens that were not consumed by any parameter.
    pub largs: Vec<String>,
    pub double_dash_found: bool,
    pub opt_prefixes: BTreeSet<String>,
}

struct ParsingState {
    opts: BTreeMap<String, RawValue>,
    largs: Vec<String>,
    rargs: VecDeque<String>,
    double_dash_found: bool,
}

#[derive(Clone, Copy)]
struct OptionEntry<'a> {
    param: &'a Parameter,
    secondary: bool,
}

pub struct OptionParser<'a> {
    mode: ParseMode,
    allow_interspersed_args: bool,
    ignore_unknown_options: bool,
    short_opts: BTreeMap<&'a str, OptionEntry<'a>>,
    long_opts: BTreeMap<&'a str, OptionEntry<'a>>,
    opt_prefixes: BTreeSet<String>,
    arguments: Vec<&'a Parameter>,
}

impl<'a> OptionParser<'a> {
    pub fn new(
        command: &'a Command,
        mode: ParseMode,
        allow_interspersed_args: bool,
        ignore_unknown_options: bool,
    ) -> OptionParser<'a> {
        let mut parser = OptionParser {
            mode,
            allow_interspersed_args,
            ignore_unknown_options,
            short_opts: BTreeMap::new(),
            long_opts: BTreeMap::new(),
            opt_prefixes: ["-", "--"].iter().map(|s| s.to_string()).collect(),
            arguments: Vec::new(),
        };

        for param in &command.params {
            if param.is_argument() {
                parser.arguments.push(param);
                continue;
            }

            let entries = param
                .opts()
                .iter()
                .map(|opt| (opt, false))
                .chain(param.secondary_opts().iter().map(|opt| (opt, true)));
            for (opt, secondary) in entries {
                let (prefix, name) = split_opt(opt);
                if prefix.is_empty() {
                    warn!("option {:?} of {} has no prefix", opt, command.name);
                    continue;
                }

                let entry = OptionEntry { param, secondary };
                let first = prefix.chars().next().map(String::from).unwrap_or_default();
                parser.opt_prefixes.insert(first);
                if prefix.chars().count() == 1 && name.chars().count() == 1 {
                    parser.short_opts.insert(opt.as_str(), entry);
                } else {
                    parser.opt_prefixes.insert(prefix.to_owned());
                    parser.long_opts.insert(opt.as_str(), entry);
                }
            }
        }

        parser
    }

    pub fn parse_args(&self, args: Vec<String>) -> Result<ParseOutput> {
        let mut state = ParsingState {
            opts: BTreeMap::new(),
            largs: Vec::new(),
            rargs: args.into_iter().collect(),
            double_dash_found: false,
        };

        self.process_args_for_options(&mut state)?;
        self.process_args_for_args(&mut state)?;
        Ok(ParseOutput {
            opts: state.opts,
            largs: state.largs,
            double_dash_found: state.double_dash_found,
            opt_prefixes: self.opt_prefixes.clone(),
        })
    }

    fn looks_like_opt(&self, arg: &str) -> bool {
        match arg.chars().next() {
            Some(first) => arg.chars().count() > 1 && self.opt_prefixes.contains(&first.to_string()),
            None => false,
        }
    }

    fn process_args_for_options(&self, state: &mut ParsingState) -> Result<()> {
        while let Some(arg) = state.rargs.pop_front() {
            if arg == "--" {
                state.double_dash_found = true;
                return Ok(());
            } else if self.looks_like_opt(&arg) {
                self.process_opts(arg, state)?;
            } else if self.allow_interspersed_args {
                state.largs.push(arg);
            } else {
                state.rargs.push_front(arg);
                return Ok(());
            }
        }

        Ok(())
    }

    fn process_opts(&self, arg: String, state: &mut ParsingState) -> Result<()> {
        let (long_opt, explicit_value) = match arg.find('=') {
            Some(eq) => (&arg[..eq], Some(arg[eq + 1..].to_owned())),
            None => (arg.as_str(), None),
        };

        match self.match_long_opt(long_opt, explicit_value, state) {
            Ok(()) => Ok(()),
            Err(UsageErrorKind::NoSuchOption { .. })
                if !self.opt_prefixes.contains(&arg.chars().take(2).collect::<String>()) =>
            {
                self.match_short_opt(&arg, state)
            }
            Err(UsageErrorKind::NoSuchOption { .. }) if self.ignore_unknown_options => {
                state.largs.push(arg);
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    fn match_long_opt(
        &self,
        opt: &str,
        explicit_value: Option<String>,
        state: &mut ParsingState,
    ) -> Result<()> {
        let entry = match self.long_opts.get(opt) {
            Some(entry) => *entry,
            None => {
                return Err(UsageErrorKind::NoSuchOption {
                    name: opt.to_owned(),
                    possibilities: close_matches(opt, self.long_opts.keys().cloned(), 3, 0.6),
                })
            }
        };

        let value = if entry.param.takes_value() {
            if let Some(explicit_value) = explicit_value {
                state.rargs.push_front(explicit_value);
            }
            Some(self.value_from_state(opt, entry.param, state)?)
        } else if explicit_value.is_some() {
            return Err(UsageErrorKind::BadOptionUsage {
                option: opt.to_owned(),
                message: format!("Option '{}' does not take a value.", opt),
            });
        } else {
            None
        };

        self.process_option(entry, value, state);
        Ok(())
    }

    fn match_short_opt(&self, arg: &str, state: &mut ParsingState) -> Result<()> {
        let mut chars = arg.char_indices();
        let prefix = match chars.next() {
            Some((_, prefix)) => prefix,
            None => return Ok(()),
        };

        let mut unknown = Vec::new();
        for (i, ch) in chars {
            let opt = format!("{}{}", prefix, ch);
            let entry = match self.short_opts.get(opt.as_str()) {
                Some(entry) => *entry,
                None if self.ignore_unknown_options => {
                    unknown.push(ch);
                    continue;
                }
                None => {
                    return Err(UsageErrorKind::NoSuchOption {
                        name: opt,
                        possibilities: Vec::new(),
                    })
                }
            };

            if entry.param.takes_value() {
                // The rest of the cluster is the value: `-n5`.
                let rest = &arg[i + ch.len_utf8()..];
                if !rest.is_empty() {
                    state.rargs.push_front(rest.to_owned());
                }
                let value = self.value_from_state(&opt, entry.param, state)?;
                self.process_option(entry, Some(value), state);
                break;
            }

            self.process_option(entry, None, state);
        }

        if !unknown.is_empty() {
            state
                .largs
                .push(format!("{}{}", prefix, unknown.into_iter().collect::<String>()));
        }

        Ok(())
    }

    fn value_from_state(
        &self,
        opt: &str,
        param: &Parameter,
        state: &mut ParsingState,
    ) -> Result<RawValue> {
        let nargs = param.nargs.max(1) as usize;
        if state.rargs.len() < nargs {
            if self.mode == ParseMode::Strict {
                let message = if nargs == 1 {
                    format!("Option '{}' requires an argument.", opt)
                } else {
                    format!("Option '{}' requires {} arguments.", opt, nargs)
                };
                return Err(UsageErrorKind::BadOptionUsage {
                    option: opt.to_owned(),
                    message,
                });
            }

            if nargs == 1 {
                return Ok(RawValue::Single(None));
            }

            let mut values: Vec<Option<String>> = state.rargs.drain(..).map(Some).collect();
            values.resize(nargs, None);
            return Ok(RawValue::Tuple(values));
        }

        if nargs == 1 {
            Ok(RawValue::Single(state.rargs.pop_front()))
        } else {
            Ok(RawValue::Tuple(state.rargs.drain(..nargs).map(Some).collect()))
        }
    }

    fn process_option(&self, entry: OptionEntry, value: Option<RawValue>, state: &mut ParsingState) {
        let param = entry.param;
        match param.action() {
            Some(OptionAction::Flag) => {
                let value = if entry.secondary {
                    !param.flag_value
                } else {
                    param.flag_value
                };
                state.opts.insert(param.name.clone(), RawValue::Flag(value));
            }
            Some(OptionAction::Count) => {
                let count = match state.opts.get(&param.name) {
                    Some(RawValue::Count(n)) => *n,
                    _ => 0,
                };
                state.opts.insert(param.name.clone(), RawValue::Count(count + 1));
            }
            _ => {
                let value = value.unwrap_or(RawValue::Single(None));
                if param.multiple {
                    let entry = state
                        .opts
                        .entry(param.name.clone())
                        .or_insert_with(|| RawValue::Multiple(Vec::new()));
                    if let RawValue::Multiple(values) = entry {
                        values.push(value);
                    }
                } else {
                    state.opts.insert(param.name.clone(), value);
                }
            }
        }
    }

    /// Assigns positional tokens to arguments in declaration order. The
    /// variadic argument, if any, is the last one.
    fn process_args_for_args(&self, state: &mut ParsingState) -> Result<()> {
        let mut args: VecDeque<String> = state.largs.drain(..).collect();
        args.extend(state.rargs.drain(..));

        for param in &self.arguments {
            let value = match param.nargs {
                -1 => RawValue::Rest(args.drain(..).collect()),
                n if n <= 1 => RawValue::Single(args.pop_front()),
                n => {
                    let values: Vec<Option<String>> =
                        (0..n).map(|_| args.pop_front()).collect();
                    let holes = values.iter().filter(|v| v.is_none()).count();
                    if holes == values.len() {
                        RawValue::Single(None)
                    } else if holes > 0 && self.mode == ParseMode::Strict {
                        return Err(UsageErrorKind::BadArgumentUsage {
                            message: format!("Argument '{}' takes {} values.", param.name, n),
                        });
                    } else {
                        RawValue::Tuple(values)
                    }
                }
            };

            state.opts.insert(param.name.clone(), value);
        }

        state.largs = args.into_iter().collect();
        Ok(())
    }
}
