//! The state of one running REPL. Nested REPLs link to the session they
//! were started from instead of sharing a global stack.
use crate::cache::lock;
use crate::command::Context;
use crate::history::History;
use crate::internals::InternalCommandSystem;
use crate::state::ParsingState;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

pub struct ReplSession {
    root: Arc<Context>,
    internals: Arc<InternalCommandSystem>,
    history: Mutex<History>,
    parent: Option<Arc<ReplSession>>,
    /// The parsing state of the line being typed.
    state: Mutex<Option<Arc<ParsingState>>>,
    prompt: String,
}

impl ReplSession {
    pub fn new(
        root: Arc<Context>,
        internals: Arc<InternalCommandSystem>,
        history_file: Option<&Path>,
        prompt: &str,
    ) -> ReplSession {
        ReplSession {
            root,
            internals,
            history: Mutex::new(History::new(history_file)),
            parent: None,
            state: Mutex::new(None),
            prompt: prompt.to_owned(),
        }
    }

    pub fn with_parent(mut self, parent: Arc<ReplSession>) -> ReplSession {
        self.parent = Some(parent);
        self
    }

    /// The session running the command `ctx` belongs to.
    pub fn current(ctx: &Context) -> Option<Arc<ReplSession>> {
        ctx.find_object::<ReplSession>()
    }

    pub fn root(&self) -> &Arc<Context> {
        &self.root
    }

    pub fn internals(&self) -> &Arc<InternalCommandSystem> {
        &self.internals
    }

    pub fn history(&self) -> MutexGuard<History> {
        lock(&self.history)
    }

    pub fn parent(&self) -> Option<&Arc<ReplSession>> {
        self.parent.as_ref()
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// 1 for a top-level session.
    pub fn depth(&self) -> usize {
        1 + self.parent.as_ref().map(|parent| parent.depth()).unwrap_or(0)
    }

    /// The enclosing sessions, innermost first.
    pub fn ancestors(&self) -> Vec<Arc<ReplSession>> {
        let mut ancestors = Vec::new();
        let mut parent = self.parent.clone();
        while let Some(session) = parent {
            parent = session.parent.clone();
            ancestors.push(session);
        }
        ancestors
    }

    pub fn state(&self) -> Option<Arc<ParsingState>> {
        lock(&self.state).clone()
    }

    /// Stores the state of the line being typed. Returns whether it differs
    /// from the previous one.
    pub fn update_state(&self, state: Arc<ParsingState>) -> bool {
        let mut current = lock(&self.state);
        let changed = current.as_ref().map(|old| **old != *state).unwrap_or(true);
        *current = Some(state);
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::StateResolver;
    use crate::testing::root_context;
    use pretty_assertions::assert_eq;

    fn session() -> ReplSession {
        let internals = InternalCommandSystem::new(Some(":"), Some("!"), true).unwrap();
        ReplSession::new(root_context(), Arc::new(internals), None, "> ")
    }

    #[test]
    fn test_parent_links() {
        let outer = Arc::new(session());
        let middle = Arc::new(session().with_parent(outer.clone()));
        let inner = session().with_parent(middle.clone());

        assert_eq!(outer.depth(), 1);
        assert_eq!(inner.depth(), 3);
        let ancestors = inner.ancestors();
        assert_eq!(ancestors.len(), 2);
        assert!(Arc::ptr_eq(&ancestors[0], &middle));
        assert!(Arc::ptr_eq(&ancestors[1], &outer));
        assert!(Arc::ptr_eq(inner.parent().unwrap(), &middle));
    }

    #[test]
    fn test_current() {
        let session = Arc::new(session());
        let ctx = Context::new(session.root().command.clone()).with_obj(session.clone());
        assert!(Arc::ptr_eq(&ReplSession::current(&ctx).unwrap(), &session));
        assert!(ReplSession::current(&Context::new(session.root().command.clone())).is_none());
    }

    #[test]
    fn test_update_state() {
        let session = session();
        let resolver = StateResolver::new();
        let root = session.root().clone();
        let state = |line: &str| resolver.resolve_line(&root, line).unwrap().state;

        assert!(session.update_state(state("args ")));
        assert!(!session.update_state(state("args a")));
        // Only the structure counts, not the values typed.
        assert!(!session.update_state(state("args a ")));
        assert!(session.update_state(state("args a b ")));
        assert!(!session.update_state(state("args c d ")));
        assert_eq!(session.state().unwrap().to_string(), "cli > args > last");
    }
}
