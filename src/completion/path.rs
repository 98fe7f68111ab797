//! Filesystem candidates for path parameters.
use crate::command::PathSpec;
use crate::completion::Candidate;
use crate::styles::{StyledText, PATH_DIRECTORY, PATH_FILE};
use crate::tokenizer::Incomplete;
use glob::{glob, Pattern};

/// A directory listing is cut off after this many entries.
pub const MAX_ENTRIES: usize = 1000;

/// Lists the entries of the directory the incomplete word points into
/// whose names start with its last component.
pub fn complete(spec: &PathSpec, incomplete: &Incomplete) -> Vec<Candidate> {
    let expanded = incomplete.expanded();
    if expanded.contains('*') {
        return Vec::new();
    }

    let query = expanded.trim_matches(|ch: char| ch == '"' || ch == '\'');
    let (dir, prefix) = match query.rfind('/') {
        Some(slash) => query.split_at(slash + 1),
        None => ("", query),
    };

    let pattern = format!("{}{}*", Pattern::escape(dir), Pattern::escape(prefix));
    let paths = match glob(&pattern) {
        Ok(paths) => paths,
        Err(err) => {
            debug!("path completion: {}: {}", pattern, err);
            return Vec::new();
        }
    };

    let start = incomplete.start_position();
    let mut candidates = Vec::new();
    for path in paths.filter_map(Result::ok).take(MAX_ENTRIES) {
        let is_dir = path.is_dir();
        if spec.dir_only() && !is_dir {
            continue;
        }

        let tag = if is_dir { PATH_DIRECTORY } else { PATH_FILE };
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        candidates.push(
            Candidate::new(&path.to_string_lossy(), start)
                .display(StyledText::plain(tag, &name))
                .style(tag),
        );
    }

    candidates
}
