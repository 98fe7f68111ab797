#[macro_use]
extern crate cmdrepl;
#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

use cmdrepl::command::PathSpec;
use cmdrepl::logger::install_logger;
use cmdrepl::styles::render_ansi;
use cmdrepl::{
    Command, CompleterConfig, Context, Flow, Parameter, Repl, ReplConfig, ReplSession, StdinReader, Value, ValueType,
};
use std::path::PathBuf;
use std::sync::Arc;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "cmdrepl", about = "An interactive shell for a sample command tree.")]
struct Opt {
    /// Prints the completions of LINE and exits.
    #[structopt(long, value_name = "LINE")]
    complete: Option<String>,
    /// Checks LINE and exits.
    #[structopt(long, value_name = "LINE")]
    validate: Option<String>,
    #[structopt(long, default_value = "> ")]
    prompt: String,
    /// An empty prefix disables internal commands.
    #[structopt(long, default_value = ":")]
    internal_prefix: String,
    /// An empty prefix disables system commands.
    #[structopt(long, default_value = "!")]
    system_prefix: String,
    /// Spawns system commands directly instead of through `sh -c`.
    #[structopt(long)]
    no_shell: bool,
    #[structopt(long, parse(from_os_str))]
    history: Option<PathBuf>,
    /// Matches subcommand names fuzzily.
    #[structopt(long)]
    fuzzy: bool,
    /// Writes logs into the data directory.
    #[structopt(long)]
    log: bool,
}

fn greet(ctx: &Context) -> Result<(), failure::Error> {
    let name = ctx.value("name").map(|name| name.to_string()).unwrap_or_default();
    let times = ctx.value("times").and_then(Value::as_int).unwrap_or(1);
    let shout = ctx.value("shout").and_then(Value::as_bool).unwrap_or(false);

    let mut greeting = format!("Hello, {}!", name);
    if shout {
        greeting = greeting.to_uppercase();
    }

    for _ in 0..times {
        println!("{}", greeting);
    }
    Ok(())
}

fn cat(ctx: &Context) -> Result<(), failure::Error> {
    let files = ctx.value("files").and_then(Value::as_slice).unwrap_or(&[]);
    for file in files {
        if let Value::Path(path) = file {
            let contents = std::fs::read_to_string(path)
                .map_err(|err| format_err!("{}: {}", path.display(), err))?;
            print!("{}", contents);
        }
    }
    Ok(())
}

/// Starts a REPL inside the current one. `:q` returns to the outer one.
fn nested_shell(ctx: &Context) -> Result<(), failure::Error> {
    let parent = ReplSession::current(ctx).ok_or_else(|| format_err!("not running inside a REPL"))?;
    let config = ReplConfig {
        prompt: format!("{} ", ">".repeat(parent.depth() + 1)),
        ..ReplConfig::default()
    };

    let repl = Repl::nested(parent.clone(), parent.root().clone(), config)?;
    repl.run(&mut StdinReader)?;
    Ok(())
}

fn sample_tree() -> Arc<Command> {
    Arc::new(
        Command::group("demo")
            .help("A sample command tree.")
            .param(Parameter::option(&["-v", "--verbose"]).count().help("Log more."))
            .subcommand(
                Command::new("greet")
                    .help("Greets someone.")
                    .param(Parameter::option(&["--shout/--no-shout"]).help("Greet loudly."))
                    .param(
                        Parameter::option(&["-n", "--times"])
                            .value_type(ValueType::int_range(1, 5))
                            .default(Value::Int(1))
                            .help("How many times."),
                    )
                    .param(Parameter::argument("name"))
                    .callback(greet),
            )
            .subcommand(
                Command::group("config")
                    .help("Reads and writes settings.")
                    .subcommand(
                        Command::new("set")
                            .help("Changes a setting.")
                            .param(
                                Parameter::argument("key")
                                    .value_type(ValueType::choice(vec!["color", "editor", "pager"])),
                            )
                            .param(Parameter::argument("value"))
                            .callback(|ctx| {
                                let key = ctx.value("key").map(|v| v.to_string()).unwrap_or_default();
                                let value = ctx.value("value").map(|v| v.to_string()).unwrap_or_default();
                                println!("{} = {}", key, value);
                                Ok(())
                            }),
                    )
                    .subcommand(Command::new("show").help("Prints the settings.").callback(|_| {
                        println!("color = auto");
                        Ok(())
                    })),
            )
            .subcommand(
                Command::new("cat")
                    .help("Prints files.")
                    .param(
                        Parameter::argument("files")
                            .nargs(-1)
                            .value_type(ValueType::Path(PathSpec::file().exists())),
                    )
                    .callback(cat),
            )
            .subcommand(
                Command::group("pipe")
                    .chain(true)
                    .help("Runs text commands one after another.")
                    .subcommand(Command::new("echo").param(Parameter::argument("text")).callback(|ctx| {
                        println!("{}", ctx.value("text").map(|v| v.to_string()).unwrap_or_default());
                        Ok(())
                    }))
                    .subcommand(Command::new("rev").param(Parameter::argument("text")).callback(|ctx| {
                        let text = ctx.value("text").map(|v| v.to_string()).unwrap_or_default();
                        println!("{}", text.chars().rev().collect::<String>());
                        Ok(())
                    })),
            )
            .subcommand(Command::new("shell").help("Starts a nested REPL.").callback(nested_shell)),
    )
}

fn prefix(prefix: String) -> Option<String> {
    Some(prefix).filter(|prefix| !prefix.is_empty())
}

fn main() {
    let opt = Opt::from_args();
    if opt.log {
        if let Err(err) = install_logger("cmdrepl") {
            print_err!("cmdrepl: failed to set up logging: {}", err);
        }
    }

    let config = ReplConfig {
        prompt: opt.prompt,
        internal_command_prefix: prefix(opt.internal_prefix),
        system_command_prefix: prefix(opt.system_prefix),
        shell: !opt.no_shell,
        history_file: opt.history,
        completer: CompleterConfig {
            fuzzy_subcommands: opt.fuzzy,
            ..CompleterConfig::default()
        },
        ..ReplConfig::default()
    };

    let repl = match Repl::new(Arc::new(Context::new(sample_tree())), config) {
        Ok(repl) => repl,
        Err(err) => {
            print_err!("cmdrepl: {}", err);
            std::process::exit(1);
        }
    };

    let registered = repl
        .session()
        .internals()
        .register(&["history"], "Shows the line history.", |session| {
            for line in session.history().iter() {
                println!("{}", line);
            }
            Ok(Flow::Continue)
        });
    if let Err(err) = registered {
        warn!("{}", err);
    }

    if let Some(line) = opt.complete {
        for candidate in repl.completer().complete(&line) {
            match &candidate.description {
                Some(description) => println!("{}\t{}", candidate.text, description),
                None => println!("{}", candidate.text),
            }
        }

        if let Some(diagnostic) = repl.completer().last_diagnostic() {
            print_err!("{}", diagnostic);
        }
        eprintln!("{}", render_ansi(&repl.status(&line)));
        return;
    }

    if let Some(line) = opt.validate {
        match repl.validator().validate(&line) {
            Ok(()) => println!("ok"),
            Err(err) => {
                println!("{}", err);
                std::process::exit(1);
            }
        }
        return;
    }

    if let Err(err) = repl.run(&mut StdinReader) {
        print_err!("cmdrepl: {}", err);
        std::process::exit(1);
    }
}
