use backtrace::Backtrace;
use log::Level;
use std::fs::create_dir_all;
use std::path::PathBuf;

/// Returns the directory for per-user state files, creating it if needed.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let base = dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(std::env::temp_dir);
    let dir = base.join("cmdrepl");
    create_dir_all(&dir)?;
    Ok(dir)
}

pub fn log_file_path(name: &str) -> std::io::Result<PathBuf> {
    let log_dir = data_dir()?.join("log");
    create_dir_all(&log_dir)?;
    Ok(log_dir.join(&format!("{}.log", name)))
}

/// Sends `log` records to `<data dir>/cmdrepl/log/<name>.log` and logs
/// panics with a trimmed backtrace.
pub fn install_logger(name: &str) -> Result<(), failure::Error> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}:{}] {}{}\x1b[0m",
                match record.level() {
                    Level::Error => "\x1b[1;31m",
                    Level::Warn => "\x1b[1;33m",
                    _ => "\x1b[34m",
                },
                record.file().unwrap_or_else(|| record.target()),
                record.line().unwrap_or(0),
                match record.level() {
                    Level::Error => "\x1b[1;31m",
                    Level::Warn => "\x1b[1;33m",
                    _ => "\x1b[0m",
                },
                message
            ))
        })
        .level(if cfg!(debug_assertions) {
            log::LevelFilter::Trace
        } else {
            log::LevelFilter::Info
        })
        .chain(fern::log_file(log_file_path(name)?)?)
        .apply()?;

    std::panic::set_hook(Box::new(|info| {
        error!("{}", info);
        prettify_backtrace(Backtrace::new());
    }));

    Ok(())
}

pub fn prettify_backtrace(backtrace: Backtrace) {
    for (i, frame) in backtrace.frames().iter().enumerate() {
        for symbol in frame.symbols() {
            if let Some(path) = symbol.filename() {
                let filename = path.to_str().unwrap_or("(non-utf8 path)");
                if filename.contains("/.rustup/")
                    || filename.contains("/.cargo/")
                    || filename.starts_with("/rustc/")
                {
                    continue;
                }

                error!(
                    "    #{} {}:{}, col {}",
                    i,
                    filename,
                    symbol.lineno().unwrap_or(0),
                    symbol.colno().unwrap_or(0),
                );
            }
        }
    }
}
