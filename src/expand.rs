//! `~`, environment variable and glob expansion of typed tokens.
use glob::glob;

#[derive(Debug, Fail)]
#[fail(display = "no matches")]
pub struct NoMatchesError;

/// Replaces a leading `~` (alone or followed by `/`) with the home directory.
/// `~user` forms are left as they are.
pub fn expand_user(s: &str) -> String {
    if s == "~" || s.starts_with("~/") {
        if let Some(home_dir) = dirs::home_dir() {
            return format!("{}{}", home_dir.to_string_lossy(), &s[1..]);
        }
    }

    s.to_owned()
}

fn is_varname_char(ch: char) -> bool {
    ch == '_' || ch.is_ascii_alphanumeric()
}

/// Expands `$NAME` and `${NAME}`. Unset variables and malformed references
/// are kept verbatim.
pub fn expand_vars(s: &str) -> String {
    let mut expanded = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(dollar) = rest.find('$') {
        expanded.push_str(&rest[..dollar]);
        let after = &rest[dollar + 1..];
        let (name, consumed) = if after.starts_with('{') {
            match after.find('}') {
                Some(end) => (&after[1..end], end + 1),
                None => ("", 0),
            }
        } else {
            let len = after
                .char_indices()
                .find(|(_, ch)| !is_varname_char(*ch))
                .map(|(i, _)| i)
                .unwrap_or_else(|| after.len());
            (&after[..len], len)
        };

        match std::env::var(name) {
            Ok(value) if !name.is_empty() && name.chars().all(is_varname_char) => {
                expanded.push_str(&value);
            }
            _ => {
                expanded.push('$');
                expanded.push_str(&after[..consumed]);
            }
        }

        rest = &after[consumed..];
    }

    expanded.push_str(rest);
    expanded
}

pub fn expand_user_and_vars(s: &str) -> String {
    expand_vars(&expand_user(s))
}

fn includes_glob(s: &str) -> bool {
    s.contains(|ch| ch == '*' || ch == '?' || ch == '[')
}

/// Expands a path pattern (`**` matches directories recursively).
pub fn expand_glob(pattern: &str) -> Result<Vec<String>, NoMatchesError> {
    let mut paths = Vec::new();
    match glob(pattern) {
        Ok(entries) => {
            for entry in entries {
                match entry {
                    Ok(path) => paths.push(path.to_string_lossy().into_owned()),
                    Err(err) => debug!("glob error: {:?}", err),
                }
            }
        }
        Err(err) => debug!("invalid glob pattern {:?}: {}", pattern, err),
    }

    if paths.is_empty() {
        return Err(NoMatchesError);
    }

    Ok(paths)
}

/// Expands every token the way the command tree sees it at resolution time:
/// `~` and variables first, then globs. A pattern that matches nothing is
/// passed through unchanged.
pub fn expand_args(args: &[String]) -> Vec<String> {
    let mut expanded = Vec::with_capacity(args.len());
    for arg in args {
        let arg = expand_user_and_vars(arg);
        if includes_glob(&arg) {
            match expand_glob(&arg) {
                Ok(paths) => expanded.extend(paths),
                Err(NoMatchesError) => expanded.push(arg),
            }
        } else {
            expanded.push(arg);
        }
    }

    expanded
}
