//! Checks the line being typed and reports the first problem found.
use crate::command::Context;
use crate::internals::InternalCommandSystem;
use crate::resolver::StateResolver;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Fail)]
#[fail(display = "{}", message)]
pub struct ValidationError {
    pub message: String,
}

pub struct Validator {
    root: Arc<Context>,
    internals: Option<Arc<InternalCommandSystem>>,
    resolver: Arc<StateResolver>,
}

impl Validator {
    pub fn new(root: Arc<Context>) -> Validator {
        Validator {
            root,
            internals: None,
            resolver: Arc::new(StateResolver::new()),
        }
    }

    /// Lines starting with one of its prefixes are accepted as they are.
    pub fn with_internals(mut self, internals: Arc<InternalCommandSystem>) -> Validator {
        self.internals = Some(internals);
        self
    }

    /// Shares the resolution caches with a completer.
    pub fn with_resolver(mut self, resolver: Arc<StateResolver>) -> Validator {
        self.resolver = resolver;
        self
    }

    /// `line` is the text before the cursor.
    pub fn validate(&self, line: &str) -> Result<(), ValidationError> {
        if let Some(internals) = &self.internals {
            if internals.prefix_of(line).is_some() {
                return Ok(());
            }
        }

        match self.resolver.resolve_line(&self.root, line) {
            Ok(_) => Ok(()),
            Err(err) => {
                debug!("validate: {:?}: {}", line, err);
                Err(ValidationError {
                    message: err.summary(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Command, Parameter};
    use crate::testing::root_context;
    use pretty_assertions::assert_eq;

    fn validator() -> Validator {
        let internals = InternalCommandSystem::new(Some(":"), Some("!"), true).unwrap();
        Validator::new(root_context()).with_internals(Arc::new(internals))
    }

    #[test]
    fn test_valid_lines() {
        let validator = validator();
        assert_eq!(validator.validate(""), Ok(()));
        assert_eq!(validator.validate("args a "), Ok(()));
        assert_eq!(validator.validate("opts --n 3 -cc"), Ok(()));
        // Unknown subcommands are still being typed.
        assert_eq!(validator.validate("unknown "), Ok(()));
    }

    #[test]
    fn test_prefixed_lines_are_always_valid() {
        let validator = validator();
        assert_eq!(validator.validate(":no-such-command"), Ok(()));
        assert_eq!(validator.validate("!false"), Ok(()));
    }

    #[test]
    fn test_usage_errors() {
        let validator = validator();
        assert_eq!(
            validator.validate("opts --n 11 ").unwrap_err().message,
            "Invalid value for '--n': 11 is not in the range 1<=x<=10."
        );
        assert_eq!(
            validator.validate("opts --zzzz ").unwrap_err().message,
            "No such option: --zzzz"
        );
    }

    #[test]
    fn test_structure_errors() {
        let root = Arc::new(Context::new(Arc::new(
            Command::group("bad").subcommand(
                Command::new("cmd")
                    .param(Parameter::argument("rest").nargs(-1))
                    .param(Parameter::argument("last")),
            ),
        )));
        let validator = Validator::new(root);
        assert_eq!(
            validator.validate("cmd ").unwrap_err().message,
            "ArgumentPositionError: The argument 'rest' with nargs=-1, in command 'cmd' must be defined at the end of the parameter list, but found at position 0"
        );
    }
}
