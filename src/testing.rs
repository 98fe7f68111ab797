//! Command trees shared by the unit tests.
use crate::command::{Command, Context, Parameter, ValueType};
use std::sync::Arc;

pub fn argv(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

/// A group exercising every kind of parameter:
///
/// ```text
/// cli [--verbose]
///   a | b | secret (hidden)
///   args STR_ARG(nargs=2) LAST
///   bool FLAG
///   opts [--n 1..10] [-c...] [--shout/--no-shout] [-t TAG]... [--pair CHOICE BOOL] NAME
///   choice FRUIT
///   files FILES...
///   chain (chained): one VALUE | two [--x]
///   sub (group): leaf
/// ```
pub fn cli() -> Arc<Command> {
    Arc::new(
        Command::group("cli")
            .param(Parameter::option(&["-v", "--verbose"]).flag().help("Talk more."))
            .subcommand(Command::new("a").help("Runs a."))
            .subcommand(Command::new("b").help("Runs b."))
            .subcommand(Command::new("secret").hidden())
            .subcommand(
                Command::new("args")
                    .param(Parameter::argument("str-arg").nargs(2))
                    .param(Parameter::argument("last")),
            )
            .subcommand(Command::new("bool").param(Parameter::argument("flag").value_type(ValueType::Bool)))
            .subcommand(
                Command::new("opts")
                    .param(Parameter::option(&["--n"]).value_type(ValueType::int_range(1, 10)))
                    .param(Parameter::option(&["-c", "--count"]).count())
                    .param(Parameter::option(&["--shout/--no-shout"]).help("Shout it."))
                    .param(Parameter::option(&["-t", "--tag"]).multiple())
                    .param(Parameter::option(&["--pair"]).value_type(ValueType::Tuple(vec![
                        ValueType::choice(vec!["x", "y"]),
                        ValueType::Bool,
                    ])))
                    .param(Parameter::argument("name")),
            )
            .subcommand(
                Command::new("choice")
                    .param(Parameter::argument("fruit").value_type(ValueType::choice_ignore_case(vec!["Apple", "banana"]))),
            )
            .subcommand(Command::new("files").param(Parameter::argument("files").nargs(-1).value_type(ValueType::path())))
            .subcommand(
                Command::group("chain")
                    .chain(true)
                    .subcommand(Command::new("one").param(Parameter::argument("value")))
                    .subcommand(Command::new("two").param(Parameter::option(&["--x"]).flag())),
            )
            .subcommand(Command::group("sub").subcommand(Command::new("leaf"))),
    )
}

pub fn root_context() -> Arc<Context> {
    Arc::new(Context::new(cli()))
}
