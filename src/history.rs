//! History management.
use crate::fuzzy::FuzzyVec;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Line history. Entries are kept in memory and, when a file is given,
/// appended to it as `<unix time>\t<cwd>\t<line>`.
pub struct History {
    path: Option<PathBuf>,
    history: FuzzyVec,
}

impl History {
    pub fn new(history_file: Option<&Path>) -> History {
        let mut history = FuzzyVec::new();
        if let Some(file) = history_file.and_then(|path| File::open(path).ok()) {
            let mut warned = false;
            for (i, line) in BufReader::new(file).lines().enumerate() {
                let line = match line {
                    Ok(line) => line,
                    Err(_) => continue,
                };

                match (line.splitn(3, '\t').nth(2), warned) {
                    (Some(cmd), _) => history.append(cmd.to_owned()),
                    (None, false) => {
                        print_err!("cmdrepl: warning: failed to parse the history file: at line {}", i + 1);
                        warned = true;
                    }
                    (None, true) => (),
                }
            }
        }

        History {
            path: history_file.map(Path::to_owned),
            history,
        }
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// The `nth` most recent entry.
    pub fn nth_last(&self, nth: usize) -> Option<&str> {
        self.history.nth_last(nth)
    }

    /// Entries matching `query` fuzzily, most similar first.
    pub fn search(&self, query: &str) -> Vec<&str> {
        self.history.search(query)
    }

    /// Entries from the most recent one.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.history.iter().rev().map(String::as_str)
    }

    /// Records `cmd` unless it is empty or repeats the last entry.
    pub fn append(&mut self, cmd: &str) {
        if cmd.trim().is_empty() {
            return;
        }

        if self.history.nth_last(0) == Some(cmd) {
            return;
        }

        if let Some(path) = &self.path {
            let written = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .and_then(|mut file| {
                    let dir = std::env::current_dir()
                        .map(|dir| dir.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    let time = std::time::SystemTime::now()
                        .duration_since(std::time::UNIX_EPOCH)
                        .map(|elapsed| elapsed.as_secs())
                        .unwrap_or(0);
                    writeln!(file, "{}\t{}\t{}", time, dir, cmd)
                });

            if let Err(err) = written {
                warn!("failed to write the history file {}: {}", path.display(), err);
            }
        }

        self.history.append(cmd.to_owned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_consecutive_duplicates_are_ignored() {
        let mut history = History::new(None);
        history.append("args a b c");
        history.append("args a b c");
        history.append("  ");
        history.append("bool true");
        history.append("args a b c");

        assert_eq!(history.len(), 3);
        assert_eq!(history.nth_last(0), Some("args a b c"));
        assert_eq!(history.nth_last(1), Some("bool true"));
        assert_eq!(history.nth_last(3), None);
        assert_eq!(
            history.iter().collect::<Vec<_>>(),
            vec!["args a b c", "bool true", "args a b c"]
        );
    }

    #[test]
    fn test_search() {
        let history = History {
            path: None,
            history: vec!["opts --count", "chain one 1", "choice apple"].into_iter().collect(),
        };
        assert_eq!(history.search("cho"), vec!["choice apple", "chain one 1"]);
        assert_eq!(history.search("choice apple"), vec!["choice apple"]);
    }

    #[test]
    fn test_file_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("history");

        let mut history = History::new(Some(path.as_path()));
        assert!(history.is_empty());
        history.append("sub leaf");
        history.append("a\twith tab");

        let history = History::new(Some(path.as_path()));
        assert_eq!(history.len(), 2);
        assert_eq!(history.nth_last(0), Some("a\twith tab"));
        assert_eq!(history.nth_last(1), Some("sub leaf"));
    }
}
