//! Splits a prompt line into shell-like words. Unlike a real shell this
//! never fails: an unterminated quote or a trailing backslash leaves the
//! partial word as is, because the user is most likely still typing it.
use crate::expand::expand_user_and_vars;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum QuoteType {
    Double,
    Single,
}

#[derive(Debug)]
struct Word {
    text: String,
    /// The byte offset in the line where the word starts.
    start: usize,
}

struct Lexer<'a> {
    input: &'a str,
    words: Vec<Word>,
    current: Option<Word>,
    in_quote: Option<QuoteType>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Lexer<'a> {
        Lexer {
            input,
            words: Vec::new(),
            current: None,
            in_quote: None,
        }
    }

    fn word_at(&mut self, start: usize) -> &mut String {
        &mut self
            .current
            .get_or_insert_with(|| Word {
                text: String::new(),
                start,
            })
            .text
    }

    fn finish_word(&mut self) {
        if let Some(word) = self.current.take() {
            self.words.push(word);
        }
    }

    /// Returns the words and whether the input ended inside the last one.
    fn lex(mut self) -> (Vec<Word>, bool) {
        let mut chars = self.input.char_indices().peekable();
        while let Some((i, ch)) = chars.next() {
            match self.in_quote {
                Some(QuoteType::Single) => {
                    if ch == '\'' {
                        self.in_quote = None;
                    } else {
                        self.word_at(i).push(ch);
                    }
                }
                Some(QuoteType::Double) => match ch {
                    '"' => self.in_quote = None,
                    '\\' => match chars.peek() {
                        Some(&(_, next)) if next == '"' || next == '\\' => {
                            chars.next();
                            self.word_at(i).push(next);
                        }
                        _ => self.word_at(i).push('\\'),
                    },
                    _ => self.word_at(i).push(ch),
                },
                None => match ch {
                    ch if ch.is_whitespace() => self.finish_word(),
                    '\'' => {
                        self.word_at(i);
                        self.in_quote = Some(QuoteType::Single);
                    }
                    '"' => {
                        self.word_at(i);
                        self.in_quote = Some(QuoteType::Double);
                    }
                    '\\' => match chars.next() {
                        Some((_, next)) => self.word_at(i).push(next),
                        // A trailing backslash is kept literally.
                        None => self.word_at(i).push('\\'),
                    },
                    _ => self.word_at(i).push(ch),
                },
            }
        }

        let inside_word = self.current.is_some();
        self.finish_word();
        (self.words, inside_word)
    }
}

/// Splits `line` into words with POSIX shell quoting rules.
pub fn split_arg_string(line: &str) -> Vec<String> {
    let (words, _) = Lexer::new(line).lex();
    words.into_iter().map(|w| w.text).collect()
}

/// Splits `--flag=value` into its flag and its value. The flag is a prefix
/// character (optionally doubled), a letter and then word characters.
fn split_flag_value(word: &str) -> Option<(&str, &str)> {
    let mut chars = word.char_indices().peekable();
    let (_, prefix) = chars.next()?;
    if prefix.is_alphanumeric() || prefix.is_whitespace() {
        return None;
    }

    if let Some(&(_, ch)) = chars.peek() {
        if ch == prefix {
            chars.next();
        }
    }

    match chars.next() {
        Some((_, ch)) if ch.is_ascii_alphabetic() => (),
        _ => return None,
    }

    for (i, ch) in chars {
        if ch == '=' {
            return Some((&word[..i], &word[i + 1..]));
        }

        if !(ch.is_alphanumeric() || ch == '_' || ch == '-') {
            return None;
        }
    }

    None
}

/// The word under the cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Incomplete {
    /// The source text of the word, quotes included. Completions replace
    /// this many characters.
    pub raw: String,
    /// The word with its quoting removed.
    pub parsed: String,
}

impl Incomplete {
    pub fn new(raw: &str, parsed: &str) -> Incomplete {
        Incomplete {
            raw: raw.to_owned(),
            parsed: parsed.to_owned(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// The word with `~` and environment variables expanded.
    pub fn expanded(&self) -> String {
        expand_user_and_vars(&self.parsed).trim().to_owned()
    }

    /// The (negative) cursor offset where a completion starts.
    pub fn start_position(&self) -> isize {
        -(self.raw.chars().count() as isize)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenizedLine {
    /// The words before the cursor that are complete.
    pub args: Vec<String>,
    pub incomplete: Incomplete,
}

/// Splits `line` (the text before the cursor) into the complete words and
/// the incomplete word the cursor is in. The last word is incomplete unless
/// the line ends with a separating whitespace.
pub fn tokenize(line: &str) -> TokenizedLine {
    let (mut words, inside_word) = Lexer::new(line).lex();
    let last = if inside_word { words.pop() } else { None };
    let mut args: Vec<String> = words.into_iter().map(|w| w.text).collect();

    let last = match last {
        Some(last) => last,
        None => {
            return TokenizedLine {
                args,
                incomplete: Incomplete::default(),
            }
        }
    };

    let raw = &line[last.start..];
    let incomplete = match split_flag_value(&last.text) {
        Some((flag, value)) => {
            args.push(flag.to_owned());
            let raw_value = match raw.find('=') {
                Some(eq) => &raw[eq + 1..],
                None => raw,
            };
            Incomplete::new(raw_value, value)
        }
        None => Incomplete::new(raw, &last.text),
    };

    trace!("tokenize: {:?} -> {:?} {:?}", line, args, incomplete);
    TokenizedLine { args, incomplete }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::argv;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_split_arg_string() {
        assert_eq!(split_arg_string("a b  c"), argv(&["a", "b", "c"]));
        assert_eq!(
            split_arg_string(r#"'a b' "c \"d\" \\" e\ f"#),
            argv(&["a b", r#"c "d" \"#, "e f"])
        );
        assert_eq!(split_arg_string(r#"x"y"'z'"#), argv(&["xyz"]));
        assert_eq!(split_arg_string(r#"a "" b"#), argv(&["a", "", "b"]));
        assert_eq!(split_arg_string(r#"'\n'"#), argv(&[r"\n"]));
        assert_eq!(split_arg_string(""), Vec::<String>::new());
    }

    #[test]
    fn test_unterminated_input() {
        assert_eq!(split_arg_string("a 'b c"), argv(&["a", "b c"]));
        assert_eq!(split_arg_string(r#"a "b"#), argv(&["a", "b"]));
        assert_eq!(split_arg_string(r"a b\"), argv(&["a", r"b\"]));
    }

    #[test]
    fn test_tokenize() {
        let line = tokenize("cmd hi ");
        assert_eq!(line.args, argv(&["cmd", "hi"]));
        assert!(line.incomplete.is_empty());

        let line = tokenize("cmd hi");
        assert_eq!(line.args, argv(&["cmd"]));
        assert_eq!(line.incomplete, Incomplete::new("hi", "hi"));
        assert_eq!(line.incomplete.start_position(), -2);

        let line = tokenize(r#"cmd "dir/test "#);
        assert_eq!(line.args, argv(&["cmd"]));
        assert_eq!(line.incomplete, Incomplete::new(r#""dir/test "#, "dir/test "));

        let line = tokenize("");
        assert_eq!(line, TokenizedLine::default());
    }

    #[test]
    fn test_tokenize_is_idempotent() {
        for input in &["a 'b", "x --y=z", "", "  ", r#"a "b\"c"#] {
            assert_eq!(tokenize(input), tokenize(input));
        }
    }

    #[test]
    fn test_flag_with_value() {
        let line = tokenize("cmd --name=bo");
        assert_eq!(line.args, argv(&["cmd", "--name"]));
        assert_eq!(line.incomplete, Incomplete::new("bo", "bo"));

        let line = tokenize("cmd -n=");
        assert_eq!(line.args, argv(&["cmd", "-n"]));
        assert_eq!(line.incomplete, Incomplete::new("", ""));

        let line = tokenize("cmd --dry-run=\"a b");
        assert_eq!(line.args, argv(&["cmd", "--dry-run"]));
        assert_eq!(line.incomplete, Incomplete::new("\"a b", "a b"));

        // Not a flag.
        let line = tokenize("cmd a=b");
        assert_eq!(line.args, argv(&["cmd"]));
        assert_eq!(line.incomplete.parsed, "a=b");
        let line = tokenize("cmd --1=b");
        assert_eq!(line.incomplete.parsed, "--1=b");
        // Complete words are left alone.
        assert_eq!(tokenize("cmd --n=b ").args, argv(&["cmd", "--n=b"]));
    }

    #[test]
    fn test_expanded() {
        std::env::set_var("CMDREPL_TOKENIZER_TEST", "/tmp/x");
        let incomplete = Incomplete::new("$CMDREPL_TOKENIZER_TEST/a", "$CMDREPL_TOKENIZER_TEST/a ");
        assert_eq!(incomplete.expanded(), "/tmp/x/a");
    }
}
