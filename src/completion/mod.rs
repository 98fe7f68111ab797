//! Completion candidates for the word under the cursor.
//!
//! [`Completer::complete`] resolves the line, decides which sources apply
//! (internal command names, option flags, parameter values, subcommand
//! names) and returns a lazy iterator that expands them one at a time.
use crate::cache::lock;
use crate::command::types::{FALSE_ALIASES, TRUE_ALIASES};
use crate::command::{split_opt, Command, CompleteFn, Context, Parameter, Value, ValueType};
use crate::fuzzy::FuzzyVec;
use crate::internals::{InternalCommandSystem, PrefixKind};
use crate::resolver::StateResolver;
use crate::state::ParsingState;
use crate::styles::{self, join_tokens, StyledText};
use crate::tokenizer::Incomplete;
use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

pub mod path;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompleterConfig {
    /// With nothing typed yet, offer one entry per option (its shortest
    /// flag) instead of one per flag.
    pub shortest_option_names_only: bool,
    /// Hide options that already got a value, except `multiple` and
    /// counting options.
    pub show_only_unused_options: bool,
    pub show_hidden_commands: bool,
    pub show_hidden_params: bool,
    /// Match subcommand names fuzzily instead of by prefix.
    pub fuzzy_subcommands: bool,
}

/// A completion for the word under the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// What replaces the word.
    pub text: String,
    /// Where the replacement starts, relative to the cursor.
    pub start_position: isize,
    /// What the menu shows.
    pub display: StyledText,
    pub description: Option<String>,
    pub style: String,
}

impl Candidate {
    /// Text containing spaces is wrapped in double quotes unless it is
    /// already quoted.
    pub fn new(text: &str, start_position: isize) -> Candidate {
        let quoted = text.starts_with('"') || text.ends_with('"');
        let text = if text.contains(' ') && !quoted {
            format!("\"{}\"", text.replace('"', "\\\""))
        } else {
            text.to_owned()
        };

        Candidate {
            display: StyledText::plain("", &text),
            text,
            start_position,
            description: None,
            style: String::new(),
        }
    }

    pub fn display(mut self, display: StyledText) -> Candidate {
        self.display = display;
        self
    }

    pub fn description(mut self, description: &str) -> Candidate {
        if !description.is_empty() {
            self.description = Some(description.to_owned());
        }
        self
    }

    pub fn style(mut self, style: &str) -> Candidate {
        self.style = style.to_owned();
        self
    }
}

enum Source {
    InternalCommands { query: String },
    OptionFlags,
    ParamValue,
    Subcommands(Arc<Command>),
}

struct Request {
    context: Arc<Context>,
    state: Arc<ParsingState>,
    incomplete: Incomplete,
}

/// Candidates in order: option flags, then values of the current
/// parameter, then subcommand names. Each source is only consulted once the
/// previous one is exhausted.
pub struct Completions<'a> {
    completer: &'a Completer,
    request: Option<Request>,
    sources: VecDeque<Source>,
    current: std::vec::IntoIter<Candidate>,
}

impl<'a> Completions<'a> {
    fn new(completer: &'a Completer, request: Option<Request>, sources: VecDeque<Source>) -> Completions<'a> {
        Completions {
            completer,
            request,
            sources,
            current: Vec::new().into_iter(),
        }
    }

    fn empty(completer: &'a Completer) -> Completions<'a> {
        Completions::new(completer, None, VecDeque::new())
    }

    fn expand(&self, source: Source) -> Vec<Candidate> {
        if let Source::InternalCommands { query } = &source {
            return self.completer.internal_commands(query);
        }

        let request = match &self.request {
            Some(request) => request,
            None => return Vec::new(),
        };

        match source {
            Source::OptionFlags => self.completer.option_flags(&request.context, &request.incomplete),
            Source::ParamValue => match request.state.param() {
                Some(param) => self.completer.param_values(&request.context, param, &request.incomplete),
                None => Vec::new(),
            },
            Source::Subcommands(group) => self.completer.subcommands(&group, &request.incomplete),
            Source::InternalCommands { .. } => Vec::new(),
        }
    }
}

impl<'a> Iterator for Completions<'a> {
    type Item = Candidate;

    fn next(&mut self) -> Option<Candidate> {
        loop {
            if let Some(candidate) = self.current.next() {
                return Some(candidate);
            }

            let source = self.sources.pop_front()?;
            self.current = self.expand(source).into_iter();
        }
    }
}

pub struct Completer {
    root: Arc<Context>,
    internals: Option<Arc<InternalCommandSystem>>,
    resolver: Arc<StateResolver>,
    config: CompleterConfig,
    diagnostic: Mutex<Option<String>>,
}

impl Completer {
    pub fn new(root: Arc<Context>, config: CompleterConfig) -> Completer {
        Completer {
            root,
            internals: None,
            resolver: Arc::new(StateResolver::new()),
            config,
            diagnostic: Mutex::new(None),
        }
    }

    /// Completes internal command names after the internal command prefix.
    pub fn with_internals(mut self, internals: Arc<InternalCommandSystem>) -> Completer {
        self.internals = Some(internals);
        self
    }

    /// Shares a resolver (and its caches) with a validator or status line.
    pub fn with_resolver(mut self, resolver: Arc<StateResolver>) -> Completer {
        self.resolver = resolver;
        self
    }

    pub fn config(&self) -> &CompleterConfig {
        &self.config
    }

    /// The error that cut the last completion short, if any.
    pub fn last_diagnostic(&self) -> Option<String> {
        lock(&self.diagnostic).clone()
    }

    fn set_diagnostic(&self, message: String) {
        *lock(&self.diagnostic) = Some(message);
    }

    /// Completes `line`, the text before the cursor.
    pub fn complete(&self, line: &str) -> Completions {
        *lock(&self.diagnostic) = None;

        if let Some(internals) = &self.internals {
            if let Some((kind, prefix)) = internals.prefix_of(line) {
                let mut sources = VecDeque::new();
                if kind == PrefixKind::Internal {
                    let query = line.trim()[prefix.len()..].trim_start().to_lowercase();
                    sources.push_back(Source::InternalCommands { query });
                }
                return Completions::new(self, None, sources);
            }
        }

        let resolved = match self.resolver.resolve_line(&self.root, line) {
            Ok(resolved) => resolved,
            Err(err) => {
                debug!("completion: {:?}: {}", line, err);
                self.set_diagnostic(err.summary());
                return Completions::empty(self);
            }
        };

        if resolved.context.command.hidden && !self.config.show_hidden_commands {
            return Completions::empty(self);
        }

        self.complete_state(resolved.context, resolved.state, resolved.incomplete)
    }

    /// Completes an already classified line.
    pub fn complete_state(
        &self,
        context: Arc<Context>,
        state: Arc<ParsingState>,
        incomplete: Incomplete,
    ) -> Completions {
        let mut sources = VecDeque::new();
        if is_command_arguments_request(&context, &state) {
            if wants_option_flags(&context, &state, &incomplete) {
                sources.push_back(Source::OptionFlags);
            }

            if let Some(param) = state.param() {
                if !param.hidden || self.config.show_hidden_params {
                    sources.push_back(Source::ParamValue);
                }
            }
        }

        if let Some(group) = subcommand_group(&context, &state) {
            sources.push_back(Source::Subcommands(group));
        }

        let request = Request {
            context,
            state,
            incomplete,
        };
        Completions::new(self, Some(request), sources)
    }

    fn internal_commands(&self, query: &str) -> Vec<Candidate> {
        let internals = match &self.internals {
            Some(internals) => internals,
            None => return Vec::new(),
        };

        let start = -(query.chars().count() as isize);
        let mut candidates = Vec::new();
        for (aliases, description) in internals.list_commands() {
            let first = aliases
                .iter()
                .find(|alias| alias.starts_with(query) && alias.as_str() != query);
            if let Some(alias) = first {
                let display = join_tokens(&aliases, styles::INTERNAL_COMMAND, styles::SYMBOL, "/");
                candidates.push(
                    Candidate::new(alias, start)
                        .display(display)
                        .description(&description)
                        .style(styles::INTERNAL_COMMAND),
                );
            }
        }

        candidates
    }

    fn option_flags(&self, ctx: &Context, incomplete: &Incomplete) -> Vec<Candidate> {
        let query = incomplete.parsed.as_str();
        let start = incomplete.start_position();
        let shortest_only = self.config.shortest_option_names_only && query.is_empty();

        let mut candidates = Vec::new();
        for option in ctx.command.options() {
            if option.hidden && !self.config.show_hidden_params {
                continue;
            }

            let used = !ctx.is_param_incomplete(option, true);
            if option.is_flag() && used {
                continue;
            }

            if self.config.show_only_unused_options && used && !(option.multiple || option.is_count()) {
                continue;
            }

            let help = option.help.as_deref().unwrap_or("");
            if shortest_only && option.is_bool_flag() && !option.secondary_opts().is_empty() {
                // One entry for each direction of the toggle.
                for (flags, tag) in &[
                    (option.opts(), styles::BOOL_TRUE),
                    (option.secondary_opts(), styles::BOOL_FALSE),
                ] {
                    let (flags, tag) = (*flags, *tag);
                    let display = join_tokens(flags, tag, &separator_tag(tag), flags_separator(flags));
                    candidates.push(
                        Candidate::new(shortest(flags), start)
                            .display(display)
                            .description(help)
                            .style(tag),
                    );
                }
                continue;
            }

            let matching: Vec<&str> = option
                .all_opts()
                .map(String::as_str)
                .filter(|flag| flag.starts_with(query))
                .collect();
            if matching.is_empty() {
                continue;
            }

            if shortest_only {
                let text = shortest(&matching);
                let tag = flag_tag(option, text);
                let ordered = order_by_prefix(&matching);
                let display = join_tokens(&ordered, tag, &separator_tag(tag), flags_separator(&ordered));
                candidates.push(
                    Candidate::new(text, start)
                        .display(display)
                        .description(help)
                        .style(tag),
                );
            } else {
                for flag in matching {
                    let tag = flag_tag(option, flag);
                    candidates.push(
                        Candidate::new(flag, start)
                            .display(StyledText::plain(tag, flag))
                            .description(help)
                            .style(tag),
                    );
                }
            }
        }

        candidates
    }

    fn param_values(&self, ctx: &Context, param: &Parameter, incomplete: &Incomplete) -> Vec<Candidate> {
        match param.custom_complete() {
            Some(f) => self.run_callback(f, ctx, param, incomplete),
            None => self.type_values(ctx, param, &param.value_type, incomplete),
        }
    }

    fn type_values(
        &self,
        ctx: &Context,
        param: &Parameter,
        value_type: &ValueType,
        incomplete: &Incomplete,
    ) -> Vec<Candidate> {
        let start = incomplete.start_position();
        match value_type {
            ValueType::Bool => {
                let query = incomplete.expanded();
                let mut candidates = Vec::new();
                for (value, aliases, tag) in &[
                    ("true", TRUE_ALIASES, styles::BOOL_TRUE),
                    ("false", FALSE_ALIASES, styles::BOOL_FALSE),
                ] {
                    if aliases.iter().any(|alias| alias.starts_with(query.as_str())) {
                        candidates.push(
                            Candidate::new(value, start)
                                .display(StyledText::plain(tag, value))
                                .description(&aliases.join("/"))
                                .style(tag),
                        );
                    }
                }
                candidates
            }
            ValueType::Choice(spec) => {
                let query = incomplete.expanded();
                spec.choices
                    .iter()
                    .filter(|choice| spec.matches_prefix(choice, &query))
                    .map(|choice| {
                        Candidate::new(choice, start)
                            .display(StyledText::plain(styles::CHOICE, choice))
                            .style(styles::CHOICE)
                    })
                    .collect()
            }
            ValueType::Path(spec) => path::complete(spec, incomplete),
            ValueType::Tuple(types) => match next_tuple_slot(ctx.value(&param.name)).and_then(|i| types.get(i)) {
                Some(slot_type) => self.type_values(ctx, param, slot_type, incomplete),
                None => Vec::new(),
            },
            ValueType::Custom(custom) => match custom.complete_fn() {
                Some(f) => self.run_callback(f, ctx, param, incomplete),
                None => Vec::new(),
            },
            ValueType::String
            | ValueType::Int
            | ValueType::Float
            | ValueType::Range(_)
            | ValueType::Unprocessed => Vec::new(),
        }
    }

    fn run_callback(&self, f: &CompleteFn, ctx: &Context, param: &Parameter, incomplete: &Incomplete) -> Vec<Candidate> {
        let start = incomplete.start_position();
        let result = match panic::catch_unwind(AssertUnwindSafe(|| f(ctx, param, &incomplete.parsed))) {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!("completion callback of '{}' panicked: {}", param.name, message);
                self.set_diagnostic(format!("{}: {}", param.name, message));
                return Vec::new();
            }
        };

        match result {
            Ok(items) => items
                .into_iter()
                .map(|item| {
                    let candidate = Candidate::new(&item.value, start)
                        .display(StyledText::plain(styles::CUSTOM_VALUE, &item.value))
                        .style(styles::CUSTOM_VALUE);
                    match &item.help {
                        Some(help) => candidate.description(help),
                        None => candidate,
                    }
                })
                .collect(),
            Err(err) => {
                warn!("completion callback of '{}' failed: {}", param.name, err);
                self.set_diagnostic(format!("{}: {}", param.name, err));
                Vec::new()
            }
        }
    }

    fn subcommands(&self, group: &Command, incomplete: &Incomplete) -> Vec<Candidate> {
        let query = incomplete.parsed.as_str();
        let start = incomplete.start_position();
        let names = group.list_commands();
        let fuzzy: FuzzyVec;
        let matched: Vec<&str> = if self.config.fuzzy_subcommands {
            fuzzy = names.iter().cloned().collect();
            fuzzy.search(query)
        } else {
            names.into_iter().filter(|name| name.starts_with(query)).collect()
        };

        let mut candidates = Vec::new();
        for name in matched {
            let command = match group.get_command(name) {
                Some(command) => command,
                None => continue,
            };

            if command.hidden && !self.config.show_hidden_commands {
                continue;
            }

            let tag = if command.is_group() {
                styles::GROUP_NAME
            } else {
                styles::COMMAND_NAME
            };
            let description = command.short_help_text().unwrap_or_default();
            candidates.push(
                Candidate::new(name, start)
                    .display(StyledText::plain(tag, name))
                    .description(&description)
                    .style(tag),
            );
        }

        candidates
    }
}

/// Whether the word under the cursor belongs to the resolved command's own
/// parameters rather than to a subcommand name.
fn is_command_arguments_request(ctx: &Context, state: &ParsingState) -> bool {
    let command = &ctx.command;
    if Arc::ptr_eq(command, &state.cli_ctx.command) {
        return false;
    }

    let arguments: Vec<&Parameter> = command.arguments().collect();
    let incomplete_arguments =
        arguments.is_empty() || arguments.iter().any(|param| ctx.is_param_incomplete(param, true));
    let chained = state.current_group.is_chain() || command.is_chain();
    let group_or_none = state
        .current_command
        .as_ref()
        .map(|command| command.is_group())
        .unwrap_or(true);

    incomplete_arguments || !(chained || group_or_none)
}

fn wants_option_flags(ctx: &Context, state: &ParsingState, incomplete: &Incomplete) -> bool {
    if state.double_dash_found {
        return false;
    }

    let param = match state.param() {
        Some(param) => param,
        None => return true,
    };

    if !param.is_argument() {
        return false;
    }

    if ctx.is_param_incomplete(param, false) {
        return true;
    }

    // An argument is half filled but options may still come in between.
    let query = incomplete.expanded();
    ctx.allow_interspersed_args
        && !state.current_group.is_chain()
        && ctx.opt_prefixes.iter().any(|prefix| query.starts_with(prefix.as_str()))
}

/// The group whose subcommands complete the word, if any.
fn subcommand_group(ctx: &Context, state: &ParsingState) -> Option<Arc<Command>> {
    if state.current_param.is_some() {
        return None;
    }

    if ctx
        .command
        .arguments()
        .any(|param| ctx.is_param_incomplete(param, true))
    {
        return None;
    }

    if ctx.command.is_group() {
        Some(ctx.command.clone())
    } else if state.current_group.is_chain() {
        Some(state.current_group.clone())
    } else {
        None
    }
}

/// The index of the tuple slot the next word fills.
fn next_tuple_slot(value: Option<&Value>) -> Option<usize> {
    match value {
        None | Some(Value::Missing) => Some(0),
        Some(Value::Tuple(values)) => values.iter().position(Value::is_missing),
        // A `multiple` tuple option: finish the last tuple or start another.
        Some(Value::List(items)) => match items.last() {
            Some(last) => next_tuple_slot(Some(last)).or(Some(0)),
            None => Some(0),
        },
        Some(_) => None,
    }
}

fn flag_tag(option: &Parameter, flag: &str) -> &'static str {
    if !option.is_bool_flag() {
        return styles::OPTION_NAME;
    }

    let value = if option.secondary_opts().is_empty() {
        option.flag_value
    } else {
        option.opts().iter().any(|opt| opt == flag)
    };

    if value {
        styles::BOOL_TRUE
    } else {
        styles::BOOL_FALSE
    }
}

fn separator_tag(tag: &str) -> String {
    if tag == styles::OPTION_NAME {
        styles::OPTION_SEPARATOR.to_owned()
    } else {
        format!("{},{}", styles::OPTION_SEPARATOR, tag)
    }
}

/// `;` when a flag uses `/` as its prefix, `/` otherwise.
pub fn flags_separator<S: AsRef<str>>(flags: &[S]) -> &'static str {
    if flags.iter().any(|flag| split_opt(flag.as_ref()).0 == "/") {
        ";"
    } else {
        "/"
    }
}

/// Flags ordered by the length of their prefix, short flags first.
pub fn order_by_prefix<'a>(flags: &[&'a str]) -> Vec<&'a str> {
    let mut ordered = flags.to_vec();
    ordered.sort_by_key(|flag| split_opt(flag).0.len());
    ordered
}

fn shortest<'a, S: AsRef<str>>(flags: &'a [S]) -> &'a str {
    flags
        .iter()
        .map(AsRef::as_ref)
        .min_by_key(|flag| flag.len())
        .unwrap_or("")
}

/// The text a `panic!` was raised with, if it was a string.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panicked".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CompletionItem, CustomType};
    use crate::internals::{Flow, InternalCommandSystem};
    use crate::testing::root_context;
    use pretty_assertions::assert_eq;

    fn completer(config: CompleterConfig) -> Completer {
        Completer::new(root_context(), config)
    }

    fn texts(completer: &Completer, line: &str) -> Vec<String> {
        completer.complete(line).map(|c| c.text).collect()
    }

    fn complete(line: &str) -> Vec<String> {
        texts(&completer(CompleterConfig::default()), line)
    }

    #[test]
    fn test_candidate_quoting() {
        assert_eq!(Candidate::new("plain", 0).text, "plain");
        assert_eq!(Candidate::new("a b", 0).text, "\"a b\"");
        assert_eq!(Candidate::new("say \"hi\" now", -1).text, r#""say \"hi\" now""#);
        assert_eq!(Candidate::new("\"a b\"", 0).text, "\"a b\"");
    }

    #[test]
    fn test_subcommands() {
        assert_eq!(
            complete(""),
            vec!["a", "args", "b", "bool", "chain", "choice", "files", "opts", "sub"]
        );
        assert_eq!(complete("a"), vec!["a", "args"]);
        assert_eq!(complete("sub "), vec!["leaf"]);

        let candidates: Vec<Candidate> = completer(CompleterConfig::default()).complete("a").collect();
        assert_eq!(candidates[0].description.as_deref(), Some("Runs a."));
        assert_eq!(candidates[0].start_position, -1);
        assert_eq!(candidates[0].style, styles::COMMAND_NAME);

        let config = CompleterConfig {
            show_hidden_commands: true,
            ..CompleterConfig::default()
        };
        assert!(texts(&completer(config), "").contains(&"secret".to_owned()));
    }

    #[test]
    fn test_fuzzy_subcommands() {
        let config = CompleterConfig {
            fuzzy_subcommands: true,
            ..CompleterConfig::default()
        };
        assert_eq!(texts(&completer(config), "sb"), vec!["sub"]);
    }

    #[test]
    fn test_hidden_command() {
        assert!(complete("secret ").is_empty());
    }

    #[test]
    fn test_bool_values() {
        assert_eq!(complete("bool "), vec!["true", "false"]);
        assert_eq!(complete("bool t"), vec!["true"]);
        assert_eq!(complete("bool o"), vec!["true", "false"]);
        assert!(complete("bool x").is_empty());

        let candidates: Vec<Candidate> = completer(CompleterConfig::default()).complete("bool ").collect();
        assert_eq!(candidates[0].description.as_deref(), Some("1/true/t/yes/y/on"));
    }

    #[test]
    fn test_choice_values() {
        assert_eq!(complete("choice a"), vec!["Apple"]);
        assert_eq!(complete("choice B"), vec!["banana"]);
        assert_eq!(complete("choice "), vec!["Apple", "banana"]);
    }

    #[test]
    fn test_option_flags() {
        assert_eq!(
            complete("opts "),
            vec!["--n", "-c", "--count", "--shout", "--no-shout", "-t", "--tag", "--pair"]
        );
        assert_eq!(
            complete("opts --"),
            vec!["--n", "--count", "--shout", "--no-shout", "--tag", "--pair"]
        );
        // A given flag is not offered again; counters are.
        assert_eq!(
            complete("opts --shout -c "),
            vec!["--n", "-c", "--count", "-t", "--tag", "--pair"]
        );
        // Nothing is suggested for numbers.
        assert!(complete("opts --n ").is_empty());
        assert_eq!(complete("opts --pair "), vec!["x", "y"]);
        assert_eq!(complete("opts --pair x "), vec!["true", "false"]);
        assert!(complete("opts -- ").is_empty());
    }

    #[test]
    fn test_option_flag_styles() {
        let candidates: Vec<Candidate> = completer(CompleterConfig::default()).complete("opts --s").collect();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].style, styles::BOOL_TRUE);
        assert_eq!(candidates[0].description.as_deref(), Some("Shout it."));

        let candidates: Vec<Candidate> = completer(CompleterConfig::default()).complete("opts --no").collect();
        assert_eq!(candidates[0].style, styles::BOOL_FALSE);
    }

    #[test]
    fn test_shortest_option_names_only() {
        let config = CompleterConfig {
            shortest_option_names_only: true,
            ..CompleterConfig::default()
        };
        let completer = completer(config);
        assert_eq!(
            texts(&completer, "opts "),
            vec!["--n", "-c", "--shout", "--no-shout", "-t", "--pair"]
        );

        let candidates: Vec<Candidate> = completer.complete("opts ").collect();
        assert_eq!(candidates[1].display.text(), "-c/--count");
        // A typed prefix lists every matching flag again.
        assert_eq!(texts(&completer, "opts --c"), vec!["--count"]);
    }

    #[test]
    fn test_show_only_unused_options() {
        let config = CompleterConfig {
            show_only_unused_options: true,
            ..CompleterConfig::default()
        };
        let completer = completer(config);
        let flags = texts(&completer, "opts --n 3 -t a ");
        assert!(!flags.contains(&"--n".to_owned()));
        assert!(flags.contains(&"--tag".to_owned()));
    }

    #[test]
    fn test_arguments_and_interspersed_options() {
        // The first value of a two-value argument is in: no flags until an
        // option prefix is typed.
        assert!(complete("args hi ").is_empty());
        assert!(complete("args hi -").is_empty());
        assert_eq!(complete("opts --n 3 --sh"), vec!["--shout"]);
    }

    #[test]
    fn test_chain() {
        assert_eq!(complete("chain "), vec!["one", "two"]);
        assert!(complete("chain one ").is_empty());
        assert_eq!(complete("chain one 1 "), vec!["one", "two"]);
        assert_eq!(complete("chain one 1 two "), vec!["--x", "one", "two"]);
    }

    #[test]
    fn test_custom_callbacks() {
        type Items = Result<Vec<CompletionItem>, failure::Error>;
        let colors: CompleteFn = Arc::new(|_ctx: &Context, _param: &Parameter, incomplete: &str| -> Items {
            Ok(["red", "green", "royal blue"]
                .iter()
                .filter(|color| color.starts_with(incomplete))
                .map(|color| CompletionItem::from(*color))
                .collect())
        });
        let failing: CompleteFn = Arc::new(|_ctx: &Context, _param: &Parameter, _incomplete: &str| -> Items {
            Err(format_err!("backend unavailable"))
        });

        let root = Arc::new(Context::new(Arc::new(
            Command::group("cli")
                .subcommand(
                    Command::new("paint")
                        .param(Parameter::argument("color").value_type(ValueType::Custom(
                            CustomType::new("color").completer(colors),
                        ))),
                )
                .subcommand(Command::new("fetch").param(Parameter::argument("url").complete_with(failing))),
        )));
        let completer = Completer::new(root, CompleterConfig::default());

        assert_eq!(texts(&completer, "paint r"), vec!["red", "\"royal blue\""]);
        assert_eq!(completer.last_diagnostic(), None);

        assert!(texts(&completer, "fetch ").is_empty());
        assert_eq!(
            completer.last_diagnostic().as_deref(),
            Some("url: backend unavailable")
        );

        // The next completion starts with a clean slate.
        texts(&completer, "paint ");
        assert_eq!(completer.last_diagnostic(), None);
    }

    #[test]
    fn test_panicking_callback() {
        type Items = Result<Vec<CompletionItem>, failure::Error>;
        let broken: CompleteFn = Arc::new(|_ctx: &Context, _param: &Parameter, _incomplete: &str| -> Items {
            let colors: Vec<CompletionItem> = Vec::new();
            Ok(vec![colors[3].clone()])
        });
        let root = Arc::new(Context::new(Arc::new(
            Command::group("cli")
                .subcommand(Command::new("paint").param(Parameter::argument("color").complete_with(broken))),
        )));
        let completer = Completer::new(root, CompleterConfig::default());

        assert_eq!(completer.complete("paint ").count(), 0);
        assert!(completer.last_diagnostic().unwrap().starts_with("color: index out of bounds"));

        // The completer keeps working afterwards.
        assert_eq!(texts(&completer, "pa"), vec!["paint"]);
    }

    #[test]
    fn test_resolution_errors() {
        let root = Arc::new(Context::new(Arc::new(
            Command::group("cli").subcommand(
                Command::new("bad")
                    .param(Parameter::argument("files").nargs(-1))
                    .param(Parameter::argument("dest")),
            ),
        )));
        let completer = Completer::new(root, CompleterConfig::default());
        assert!(texts(&completer, "bad ").is_empty());
        assert!(completer
            .last_diagnostic()
            .unwrap()
            .starts_with("ArgumentPositionError: "));
    }

    #[test]
    fn test_path_values() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("test file.txt"), "").unwrap();
        std::fs::create_dir(tmp.path().join("test directory")).unwrap();

        let line = format!("files {}/test", tmp.path().display());
        let candidates: Vec<Candidate> = completer(CompleterConfig::default()).complete(&line).collect();
        let names: Vec<String> = candidates.iter().map(|c| c.display.text()).collect();
        assert_eq!(names, vec!["test directory", "test file.txt"]);
        assert_eq!(
            candidates[0].text,
            format!("\"{}/test directory\"", tmp.path().display())
        );
    }

    #[test]
    fn test_quoted_path_values() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("test file.txt"), "").unwrap();
        std::fs::create_dir(tmp.path().join("test directory")).unwrap();

        let word = format!("\"{}/test \"", tmp.path().display());
        let candidates: Vec<Candidate> = completer(CompleterConfig::default())
            .complete(&format!("files {}", word))
            .collect();
        let names: Vec<String> = candidates.iter().map(|c| c.display.text()).collect();
        assert_eq!(names, vec!["test directory", "test file.txt"]);

        let start = -(word.chars().count() as isize);
        let starts: Vec<isize> = candidates.iter().map(|c| c.start_position).collect();
        assert_eq!(starts, vec![start, start]);
    }

    #[test]
    fn test_internal_commands() {
        let internals = Arc::new(InternalCommandSystem::new(Some(":"), Some("!"), true).unwrap());
        internals
            .register(&["reload"], "Reloads the configuration.", |_| Ok(Flow::Continue))
            .unwrap();
        let completer = completer(CompleterConfig::default()).with_internals(internals);

        assert_eq!(texts(&completer, ":"), vec!["cls", "?", "q", "reload"]);
        assert_eq!(texts(&completer, ":HE"), vec!["help"]);
        assert!(texts(&completer, ":help").is_empty());
        assert!(texts(&completer, "!ls ").is_empty());

        let candidates: Vec<Candidate> = completer.complete(":re").collect();
        assert_eq!(candidates[0].start_position, -2);
        assert_eq!(candidates[0].description.as_deref(), Some("Reloads the configuration."));

        let candidates: Vec<Candidate> = completer.complete(":q").collect();
        assert_eq!(candidates[0].text, "quit");
        assert_eq!(candidates[0].display.text(), "q/quit/exit");
    }

    #[test]
    fn test_iteration_restarts() {
        let completer = completer(CompleterConfig::default());
        let first: Vec<String> = texts(&completer, "bool ");
        let second: Vec<String> = texts(&completer, "bool ");
        assert_eq!(first, second);
        assert_eq!(completer.complete("").next().map(|c| c.text).as_deref(), Some("a"));
    }
}
