use std::fmt;

pub type Result<I> = std::result::Result<I, Error>;

#[derive(Debug, Fail)]
pub enum Error {
    #[fail(display = "{}", _0)]
    Usage(#[cause] UsageError),
    #[fail(display = "{}", _0)]
    Structure(#[cause] StructureError),
    #[fail(display = "{}", _0)]
    Internal(#[cause] InternalCommandError),
    #[fail(display = "{}", _0)]
    Io(#[cause] std::io::Error),
}

impl Error {
    /// A one-line description for status lines and diagnostics. Structural
    /// errors are prefixed with their kind.
    pub fn summary(&self) -> String {
        match self {
            Error::Structure(err) => format!("{}: {}", err.name(), err),
            other => other.to_string(),
        }
    }
}

impl From<UsageError> for Error {
    fn from(err: UsageError) -> Error {
        Error::Usage(err)
    }
}

impl From<StructureError> for Error {
    fn from(err: StructureError) -> Error {
        Error::Structure(err)
    }
}

impl From<InternalCommandError> for Error {
    fn from(err: InternalCommandError) -> Error {
        Error::Internal(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

/// A mistake in what the user typed. `command` is the command path the
/// error was raised in, if known.
#[derive(Debug, Fail)]
#[fail(display = "{}", kind)]
pub struct UsageError {
    pub kind: UsageErrorKind,
    pub command: Option<String>,
}

impl UsageError {
    pub fn new(kind: UsageErrorKind) -> UsageError {
        UsageError {
            kind,
            command: None,
        }
    }

    /// Attaches the command path unless one is already set.
    pub fn in_command(mut self, command: &str) -> UsageError {
        if self.command.is_none() {
            self.command = Some(command.to_owned());
        }
        self
    }
}

impl From<UsageErrorKind> for UsageError {
    fn from(kind: UsageErrorKind) -> UsageError {
        UsageError::new(kind)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UsageErrorKind {
    NoSuchOption {
        name: String,
        possibilities: Vec<String>,
    },
    BadOptionUsage {
        option: String,
        message: String,
    },
    BadArgumentUsage {
        message: String,
    },
    BadParameter {
        hint: String,
        message: String,
    },
    MissingParameter {
        /// `"argument"` or `"option"`.
        kind: &'static str,
        hint: String,
    },
    NoSuchCommand {
        name: String,
        possibilities: Vec<String>,
    },
    MissingCommand,
    ExtraArguments {
        args: Vec<String>,
    },
}

fn fmt_possibilities(f: &mut fmt::Formatter, possibilities: &[String]) -> fmt::Result {
    match possibilities {
        [] => Ok(()),
        [one] => write!(f, " Did you mean {}?", one),
        many => write!(f, " (Possible options: {})", many.join(", ")),
    }
}

impl fmt::Display for UsageErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            UsageErrorKind::NoSuchOption {
                name,
                possibilities,
            } => {
                write!(f, "No such option: {}", name)?;
                fmt_possibilities(f, possibilities)
            }
            UsageErrorKind::BadOptionUsage { message, .. } => write!(f, "{}", message),
            UsageErrorKind::BadArgumentUsage { message } => write!(f, "{}", message),
            UsageErrorKind::BadParameter { hint, message } => {
                write!(f, "Invalid value for {}: {}", hint, message)
            }
            UsageErrorKind::MissingParameter { kind, hint } => {
                write!(f, "Missing {} {}.", kind, hint)
            }
            UsageErrorKind::NoSuchCommand {
                name,
                possibilities,
            } => {
                write!(f, "No such command '{}'.", name)?;
                fmt_possibilities(f, possibilities)
            }
            UsageErrorKind::MissingCommand => write!(f, "Missing command."),
            UsageErrorKind::ExtraArguments { args } => write!(
                f,
                "Got unexpected extra argument{} ({})",
                if args.len() == 1 { "" } else { "s" },
                args.join(" ")
            ),
        }
    }
}

/// A command tree that can never be completed or executed as defined.
#[derive(Debug, Clone, PartialEq, Fail)]
pub enum StructureError {
    #[fail(
        display = "The argument '{}' with nargs=-1, in command '{}' must be defined at the end of the parameter list, but found at position {}",
        argument, command, position
    )]
    ArgumentPosition {
        command: String,
        argument: String,
        position: usize,
    },
    #[fail(
        display = "The group '{}' requires the argument '{}' which cannot be given from the REPL and has no default",
        group, argument
    )]
    UnfillableGroupArgument { group: String, argument: String },
}

impl StructureError {
    pub fn name(&self) -> &'static str {
        match self {
            StructureError::ArgumentPosition { .. } => "ArgumentPositionError",
            StructureError::UnfillableGroupArgument { .. } => "UnfillableGroupArgumentError",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Fail)]
pub enum InternalCommandError {
    #[fail(display = "internal and system command prefixes must differ, both are '{}'", _0)]
    SamePrefix(String),
    #[fail(display = "the {} command prefix must not be empty", _0)]
    EmptyPrefix(&'static str),
    #[fail(display = "the line does not start with a command prefix")]
    PrefixNotFound,
    #[fail(display = "Enter a proper {} command.", _0)]
    EmptyCommand(&'static str),
    #[fail(display = "{}: command not found", _0)]
    NotFound(String),
    #[fail(display = "'{}' is already registered as an internal command", _0)]
    DuplicateName(String),
}
