//! Style tags attached to completion candidates and status line fragments.
//!
//! A tag is a comma-separated list of dotted classes such as
//! `parameter.option.name,parameter.usage.inuse`. Line editors map tags to
//! their own styles; [`render_ansi`] uses the built-in table.
use crossterm::style::{Attribute, Color, SetAttribute, SetForegroundColor};
use std::collections::BTreeMap;
use std::fmt::Write;

pub const COMMAND_NAME: &str = "command.name";
pub const GROUP_NAME: &str = "group.name";
pub const MULTICOMMAND_NAME: &str = "multicommand.name";
pub const MULTICOMMAND_TYPE: &str = "multicommand.type";
pub const MULTICOMMAND_METAVAR: &str = "multicommand.metavar";
pub const COMMAND_TYPE: &str = "command.type";
pub const INTERNAL_COMMAND: &str = "internal-command.name";
pub const OPTION_NAME: &str = "parameter.option.name";
pub const OPTION_SEPARATOR: &str = "parameter.option.name.separator";
pub const ARGUMENT_NAME: &str = "parameter.argument.name";
pub const BOOL_TRUE: &str = "parameter.type.bool.totrue";
pub const BOOL_FALSE: &str = "parameter.type.bool.tofalse";
pub const CHOICE: &str = "parameter.type.choice";
pub const PATH_DIRECTORY: &str = "parameter.type.path.directory";
pub const PATH_FILE: &str = "parameter.type.path.file";
pub const CUSTOM_VALUE: &str = "parameter.type.custom";
pub const USAGE_INUSE: &str = "parameter.usage.inuse";
pub const USAGE_USED: &str = "parameter.usage.used";
pub const USAGE_UNUSED: &str = "parameter.usage.unused";
pub const TYPE_DESCRIPTOR: &str = "parameter.type.name";
pub const NARGS: &str = "parameter.nargs";
pub const SPACE: &str = "space";
pub const SYMBOL: &str = "symbol";
pub const BRACKET: &str = "symbol.bracket";
pub const ELLIPSIS: &str = "symbol.ellipsis";
pub const ERROR: &str = "error";

/// How a tag is drawn on a terminal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Style {
    pub fg: Option<Color>,
    pub bold: bool,
    pub underline: bool,
    pub dim: bool,
}

impl Style {
    fn fg(color: Color) -> Style {
        Style {
            fg: Some(color),
            bold: false,
            underline: false,
            dim: false,
        }
    }

    fn bold(mut self) -> Style {
        self.bold = true;
        self
    }

    fn underline(mut self) -> Style {
        self.underline = true;
        self
    }

    fn dim(mut self) -> Style {
        self.dim = true;
        self
    }
}

lazy_static! {
    pub static ref DEFAULT_STYLES: BTreeMap<&'static str, Style> = {
        let mut styles = BTreeMap::new();
        styles.insert("command", Style::fg(Color::Blue));
        styles.insert("group", Style::fg(Color::Cyan));
        styles.insert("multicommand", Style::fg(Color::Cyan));
        styles.insert("internal-command", Style::fg(Color::Magenta));
        styles.insert("parameter.option", Style::fg(Color::Green));
        styles.insert("parameter.argument", Style::fg(Color::Yellow));
        styles.insert(BOOL_TRUE, Style::fg(Color::Green));
        styles.insert(BOOL_FALSE, Style::fg(Color::Red));
        styles.insert(PATH_DIRECTORY, Style::fg(Color::Blue).bold());
        styles.insert(PATH_FILE, Style::fg(Color::Reset));
        styles.insert(USAGE_INUSE, Style::fg(Color::White).bold().underline());
        styles.insert(USAGE_USED, Style::fg(Color::DarkGrey).dim());
        styles.insert(TYPE_DESCRIPTOR, Style::fg(Color::DarkCyan));
        styles.insert(NARGS, Style::fg(Color::DarkYellow));
        styles.insert(SYMBOL, Style::fg(Color::DarkGrey));
        styles.insert(ERROR, Style::fg(Color::Red).bold());
        styles
    };
}

/// Looks up the style for a tag. The most specific known class wins: each
/// class is tried as is, then with trailing components stripped.
pub fn lookup(tag: &str) -> Option<Style> {
    let mut best: Option<(usize, Style)> = None;
    for class in tag.split(',').map(str::trim) {
        let mut candidate = class;
        loop {
            if let Some(style) = DEFAULT_STYLES.get(candidate) {
                let depth = candidate.matches('.').count() + 1;
                if best.map(|(d, _)| depth >= d).unwrap_or(true) {
                    best = Some((depth, *style));
                }
                break;
            }

            match candidate.rfind('.') {
                Some(dot) => candidate = &candidate[..dot],
                None => break,
            }
        }
    }

    best.map(|(_, style)| style)
}

/// A sequence of `(tag, text)` fragments.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StyledText(pub Vec<(String, String)>);

impl StyledText {
    pub fn new() -> StyledText {
        StyledText(Vec::new())
    }

    pub fn plain(tag: &str, text: &str) -> StyledText {
        StyledText(vec![(tag.to_owned(), text.to_owned())])
    }

    pub fn push(&mut self, tag: &str, text: &str) {
        self.0.push((tag.to_owned(), text.to_owned()));
    }

    pub fn extend(&mut self, other: StyledText) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|(_, text)| text.is_empty())
    }

    pub fn fragments(&self) -> &[(String, String)] {
        &self.0
    }

    /// The text without styles.
    pub fn text(&self) -> String {
        self.0.iter().map(|(_, text)| text.as_str()).collect()
    }
}

/// Joins `items` with `sep`. Items and separators get their own tags.
pub fn join_tokens<S: AsRef<str>>(items: &[S], item_tag: &str, sep_tag: &str, sep: &str) -> StyledText {
    let mut text = StyledText::new();
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            text.push(sep_tag, sep);
        }
        text.push(item_tag, item.as_ref());
    }

    text
}

/// Renders `text` with ANSI escape sequences.
pub fn render_ansi(text: &StyledText) -> String {
    let mut out = String::new();
    for (tag, fragment) in text.fragments() {
        match lookup(tag) {
            Some(style) => {
                if let Some(color) = style.fg {
                    write!(out, "{}", SetForegroundColor(color)).ok();
                }
                if style.bold {
                    write!(out, "{}", SetAttribute(Attribute::Bold)).ok();
                }
                if style.underline {
                    write!(out, "{}", SetAttribute(Attribute::Underlined)).ok();
                }
                if style.dim {
                    write!(out, "{}", SetAttribute(Attribute::Dim)).ok();
                }
                out.push_str(fragment);
                write!(out, "{}", SetAttribute(Attribute::Reset)).ok();
            }
            None => out.push_str(fragment),
        }
    }

    out
}
