lazy_static! {
    pub static ref COLORS_ENABLED: bool = {
        use crossterm::tty::IsTty;
        std::io::stderr().is_tty()
    };
}

/// Prints a message to stderr, highlighted when stderr is a terminal.
#[macro_export]
macro_rules! print_err {
    () => { eprintln!(""); };
    ($fmt:expr) => {
        if *$crate::macros::COLORS_ENABLED {
            eprintln!(concat!("{}{}", $fmt, "{}"),
                ::crossterm::style::SetAttribute(::crossterm::style::Attribute::Bold),
                ::crossterm::style::SetForegroundColor(::crossterm::style::Color::Yellow),
                ::crossterm::style::SetAttribute(::crossterm::style::Attribute::Reset));
        } else {
            eprintln!($fmt);
        }
    };
    ($fmt:expr, $($arg:tt)*) => {
        if *$crate::macros::COLORS_ENABLED {
            eprintln!(concat!("{}{}", $fmt, "{}"),
                ::crossterm::style::SetAttribute(::crossterm::style::Attribute::Bold),
                ::crossterm::style::SetForegroundColor(::crossterm::style::Color::Yellow),
                $($arg)*,
                ::crossterm::style::SetAttribute(::crossterm::style::Attribute::Reset));
        } else {
            eprintln!($fmt, $($arg)*);
        }
    };
}
