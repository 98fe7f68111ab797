//! An interactive read-eval-print loop for nested command trees.
//!
//! Users type subcommands at a prompt instead of relaunching the program.
//! While a line is being typed, [`resolver`] replays the command tree's own
//! resolution and option-parsing rules in a lenient mode, [`state`]
//! classifies where the cursor is (which group, command and parameter), and
//! [`completion`] turns that into candidates. [`repl`] owns the loop that
//! executes finished lines strictly.
#[macro_use]
extern crate log;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate failure;

#[macro_use]
pub mod macros;

pub mod cache;
pub mod command;
pub mod completion;
pub mod error;
pub mod expand;
pub mod fuzzy;
pub mod history;
pub mod internals;
pub mod logger;
pub mod repl;
pub mod resolver;
pub mod session;
pub mod state;
pub mod status;
pub mod styles;
pub mod tokenizer;
pub mod validator;

#[cfg(test)]
mod testing;

pub use crate::command::{Command, Context, Parameter, ParseMode, Value, ValueType};
pub use crate::completion::{Candidate, Completer, CompleterConfig};
pub use crate::error::{Error, Result};
pub use crate::internals::{Flow, InternalCommandSystem};
pub use crate::repl::{LineReader, Repl, ReplConfig, StdinReader};
pub use crate::session::ReplSession;
pub use crate::state::ParsingState;
