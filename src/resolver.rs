//! Finds the context a line addresses by replaying the command tree's own
//! group and subcommand resolution.
use crate::cache::{lock, LruCache};
use crate::command::{Command, Context, ContextSettings, ParseMode};
use crate::error::{Result, UsageError, UsageErrorKind};
use crate::expand::expand_args;
use crate::fuzzy::close_matches;
use crate::state::ParsingState;
use crate::tokenizer::{tokenize, Incomplete};
use std::sync::{Arc, Mutex};

/// The number of recent inputs each cache of [`StateResolver`] keeps.
pub const CACHE_SIZE: usize = 3;

/// Looks up the subcommand named by the first token. Returns the name it
/// was invoked with, the command and the remaining tokens.
pub fn resolve_command(group: &Command, args: &[String]) -> Option<(String, Arc<Command>, Vec<String>)> {
    let (name, rest) = args.split_first()?;
    let command = group.get_command(name)?;
    Some((name.clone(), command.clone(), rest.to_vec()))
}

/// Builds the context of the subcommand `args` names under `parent`.
///
/// Returns `None` when there is nothing to resolve, or when no subcommand
/// matches in lenient mode. Strict mode reports an unknown subcommand.
pub fn next_context(
    parent: &Arc<Context>,
    args: &[String],
    settings: ContextSettings,
    mode: ParseMode,
) -> Result<Option<Arc<Context>>> {
    if args.is_empty() {
        return Ok(None);
    }

    let args = expand_args(args);
    let (name, command, rest) = match resolve_command(&parent.command, &args) {
        Some(resolved) => resolved,
        None if mode == ParseMode::Lenient => return Ok(None),
        None => {
            let name = args[0].clone();
            let possibilities = close_matches(&name, parent.command.list_commands(), 3, 0.6);
            let err = UsageError::new(UsageErrorKind::NoSuchCommand {
                name,
                possibilities,
            });
            return Err(err.in_command(&parent.command_path()).into());
        }
    };

    trace!("resolve: {} -> {} {:?}", parent.command_path(), name, rest);
    let ctx = Context::make(&command, &name, rest, Some(parent.clone()), settings, mode)?;
    Ok(Some(Arc::new(ctx)))
}

/// Walks from `root` down the groups `args` name and returns the deepest
/// context reached. In a chained group every subcommand gets its own
/// context parented to the group; the last one is returned.
pub fn resolve_context(root: &Arc<Context>, args: &[String], mode: ParseMode) -> Result<Arc<Context>> {
    let mut ctx = root.clone();
    let mut args = args.to_vec();
    while !args.is_empty() {
        let chain = match ctx.command.group_spec() {
            Some(group) => group.chain,
            None => break,
        };

        if !chain {
            match next_context(&ctx, &args, ContextSettings::default(), mode)? {
                Some(sub_ctx) => ctx = sub_ctx,
                None => return Ok(ctx),
            }
        } else {
            let mut last = None;
            while !args.is_empty() {
                match next_context(&ctx, &args, ContextSettings::chained(), mode)? {
                    Some(sub_ctx) => {
                        args = sub_ctx.args.clone();
                        last = Some(sub_ctx);
                    }
                    None => return Ok(ctx),
                }
            }

            if let Some(last) = last {
                ctx = last;
            }
        }

        args = ctx
            .protected_args
            .iter()
            .chain(ctx.args.iter())
            .cloned()
            .collect();
    }

    Ok(ctx)
}

/// Everything completion needs to know about a line.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub context: Arc<Context>,
    pub state: Arc<ParsingState>,
    pub incomplete: Incomplete,
}

fn root_key(root: &Arc<Context>) -> usize {
    Arc::as_ptr(root) as usize
}

/// Lenient resolution with memoisation. Completion, validation and the
/// status line all resolve the same line on every keystroke.
///
/// Entries are keyed by the identity of the root context, so call
/// [`StateResolver::invalidate`] after replacing the command tree.
pub struct StateResolver {
    contexts: Mutex<LruCache<(usize, Vec<String>), Arc<Context>>>,
    lines: Mutex<LruCache<(usize, String), Resolved>>,
}

impl StateResolver {
    pub fn new() -> StateResolver {
        StateResolver {
            contexts: Mutex::new(LruCache::new(CACHE_SIZE)),
            lines: Mutex::new(LruCache::new(CACHE_SIZE)),
        }
    }

    pub fn resolve_context(&self, root: &Arc<Context>, args: &[String]) -> Result<Arc<Context>> {
        let key = (root_key(root), args.to_vec());
        if let Some(ctx) = lock(&self.contexts).get(&key) {
            debug!("context cache hit: {:?}", args);
            return Ok(ctx);
        }

        let ctx = resolve_context(root, args, ParseMode::Lenient)?;
        lock(&self.contexts).insert(key, ctx.clone());
        Ok(ctx)
    }

    /// Tokenizes `line` (the text before the cursor), resolves its complete
    /// words and classifies the result.
    pub fn resolve_line(&self, root: &Arc<Context>, line: &str) -> Result<Resolved> {
        let key = (root_key(root), line.to_owned());
        if let Some(resolved) = lock(&self.lines).get(&key) {
            debug!("state cache hit: {:?}", line);
            return Ok(resolved);
        }

        let tokens = tokenize(line);
        let context = self.resolve_context(root, &tokens.args)?;
        let state = ParsingState::classify(root, &context, &tokens.args)?;
        let resolved = Resolved {
            context,
            state: Arc::new(state),
            incomplete: tokens.incomplete,
        };

        lock(&self.lines).insert(key, resolved.clone());
        Ok(resolved)
    }

    /// Forgets every cached resolution.
    pub fn invalidate(&self) {
        lock(&self.contexts).clear();
        lock(&self.lines).clear();
    }
}

impl Default for StateResolver {
    fn default() -> StateResolver {
        StateResolver::new()
    }
}
