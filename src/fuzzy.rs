//! Fuzzy matching for history lines, subcommand names and "did you mean"
//! hints.
use std::cmp::Ordering;

/// An append-only list of entries searchable by fuzzy matching.
#[derive(Clone, Default)]
pub struct FuzzyVec {
    /// Entries in insertion order.
    entries: Vec<String>,
}

impl FuzzyVec {
    pub fn new() -> FuzzyVec {
        FuzzyVec {
            entries: Vec::new(),
        }
    }

    pub fn iter(&self) -> std::slice::Iter<String> {
        self.entries.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The `nth` entry counting back from the last one appended.
    pub fn nth_last(&self, nth: usize) -> Option<&str> {
        if nth >= self.entries.len() {
            return None;
        }

        self.entries
            .get(self.entries.len() - nth - 1)
            .map(|s| s.as_str())
    }

    pub fn append(&mut self, entry: String) {
        self.entries.push(entry);
    }

    /// Entries containing the characters of `query` in order, best first.
    /// An empty query matches everything in insertion order.
    ///
    /// Entries are ranked by how `query` matches (see [`MatchKind`]), then
    /// by [`similarity`]. Equal entries keep their insertion order.
    pub fn search(&self, query: &str) -> Vec<&str> {
        if query.is_empty() {
            return self.entries.iter().map(String::as_str).collect();
        }

        let mut matched: Vec<(MatchKind, f64, &str)> = self
            .entries
            .iter()
            .filter_map(|entry| {
                match_kind(entry, query).map(|kind| (kind, similarity(entry, query), entry.as_str()))
            })
            .collect();
        matched.sort_by(|(kind_a, score_a, _), (kind_b, score_b, _)| {
            kind_a
                .cmp(kind_b)
                .then_with(|| score_b.partial_cmp(score_a).unwrap_or(Ordering::Equal))
        });
        matched.into_iter().map(|(_, _, entry)| entry).collect()
    }
}

impl<S: Into<String>> std::iter::FromIterator<S> for FuzzyVec {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> FuzzyVec {
        FuzzyVec {
            entries: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// How an entry contains a query, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchKind {
    Exact,
    Prefix,
    /// The query starts one of the words, e.g. `apple` in `choice apple`
    /// or `run` in `dry-run`.
    WordPrefix,
    Substring,
    /// The query's characters appear in order, e.g. `sb` in `sub`.
    Subsequence,
}

pub fn match_kind(entry: &str, query: &str) -> Option<MatchKind> {
    if entry == query {
        Some(MatchKind::Exact)
    } else if entry.starts_with(query) {
        Some(MatchKind::Prefix)
    } else if word_starts(entry).any(|i| entry[i..].starts_with(query)) {
        Some(MatchKind::WordPrefix)
    } else if entry.contains(query) {
        Some(MatchKind::Substring)
    } else if is_subsequence(entry, query) {
        Some(MatchKind::Subsequence)
    } else {
        None
    }
}

/// Byte offsets of the words after the first one. Words are separated by
/// whitespace, `-`, `_` and `/`.
fn word_starts(entry: &str) -> impl Iterator<Item = usize> + '_ {
    let is_separator = |ch: char| ch.is_whitespace() || ch == '-' || ch == '_' || ch == '/';
    entry
        .char_indices()
        .zip(entry.chars().skip(1))
        .filter(move |((_, ch), next)| is_separator(*ch) && !is_separator(*next))
        .map(|((i, ch), _)| i + ch.len_utf8())
}

fn is_subsequence(entry: &str, query: &str) -> bool {
    let mut chars = entry.chars();
    query.chars().all(|q| chars.any(|c| c == q))
}

/// Returns how similar two strings are, from `0.0` to `1.0`: twice the
/// length of their longest common subsequence over the total length.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }

    let mut prev = vec![0usize; b.len() + 1];
    let mut row = vec![0usize; b.len() + 1];
    for ca in &a {
        for (j, cb) in b.iter().enumerate() {
            row[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                row[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut row);
    }

    (2 * prev[b.len()]) as f64 / (a.len() + b.len()) as f64
}

/// Returns up to `n` candidates whose similarity to `word` is at least
/// `cutoff`, the most similar first. Used for "did you mean" hints.
pub fn close_matches<'a, I>(word: &str, candidates: I, n: usize, cutoff: f64) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut scored: Vec<(f64, &str)> = candidates
        .into_iter()
        .map(|candidate| (similarity(word, candidate), candidate))
        .filter(|(score, _)| *score >= cutoff)
        .collect();
    scored.sort_by(|(a, x), (b, y)| {
        b.partial_cmp(a)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| x.cmp(y))
    });
    scored
        .into_iter()
        .take(n)
        .map(|(_, candidate)| candidate.to_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_search_order() {
        let entries: FuzzyVec = vec!["run --dry-run", "dry-run", "return", "rerun", "dry"]
            .into_iter()
            .collect();
        assert_eq!(
            entries.search("run"),
            vec!["run --dry-run", "dry-run", "rerun", "return"]
        );
        assert_eq!(entries.search("dry"), vec!["dry", "dry-run", "run --dry-run"]);
        assert!(entries.search("xyz").is_empty());
        assert_eq!(entries.search("").len(), 5);
    }

    #[test]
    fn test_match_kind() {
        assert_eq!(match_kind("sub", "sub"), Some(MatchKind::Exact));
        assert_eq!(match_kind("subtract", "sub"), Some(MatchKind::Prefix));
        assert_eq!(match_kind("choice apple", "app"), Some(MatchKind::WordPrefix));
        assert_eq!(match_kind("config/show", "show"), Some(MatchKind::WordPrefix));
        assert_eq!(match_kind("pineapple", "app"), Some(MatchKind::Substring));
        assert_eq!(match_kind("sub", "sb"), Some(MatchKind::Subsequence));
        assert_eq!(match_kind("bus", "sb"), None);
    }

    #[test]
    fn test_nth_last() {
        let entries: FuzzyVec = vec!["a", "b"].into_iter().collect();
        assert_eq!(entries.nth_last(0), Some("b"));
        assert_eq!(entries.nth_last(1), Some("a"));
        assert_eq!(entries.nth_last(2), None);
    }

    #[test]
    fn test_close_matches() {
        let opts = vec!["--hello", "--verbose", "--help"];
        assert_eq!(
            close_matches("--helo", opts.iter().cloned(), 3, 0.6),
            vec!["--hello".to_owned(), "--help".to_owned()]
        );
        assert!(close_matches("-x", opts.iter().cloned(), 3, 0.6).is_empty());
        assert_eq!(similarity("abc", "abc"), 1.0);
    }
}
