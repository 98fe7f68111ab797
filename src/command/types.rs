//! Value types: how a raw token becomes a [`Value`], and how a type is
//! described to the user.
use crate::command::CompleteFn;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

/// Strings accepted as booleans (compared in lower case).
pub static BOOL_STRINGS: phf::Map<&'static str, bool> = phf::phf_map! {
    "1" => true,
    "true" => true,
    "t" => true,
    "yes" => true,
    "y" => true,
    "on" => true,
    "0" => false,
    "false" => false,
    "f" => false,
    "no" => false,
    "n" => false,
    "off" => false,
};

/// The boolean spellings in display order.
pub const TRUE_ALIASES: &[&str] = &["1", "true", "t", "yes", "y", "on"];
pub const FALSE_ALIASES: &[&str] = &["0", "false", "f", "no", "n", "off"];

/// A parsed parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Nothing was given yet. Only produced by lenient parsing, or by strict
    /// parsing for optional parameters without a default.
    Missing,
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Path(PathBuf),
    /// A fixed number of values (`nargs > 1` or a tuple type). May contain
    /// `Missing` holes while being typed.
    Tuple(Vec<Value>),
    /// Values of a `multiple` option or a variadic argument.
    List(Vec<Value>),
}

impl Value {
    pub fn is_missing(&self) -> bool {
        match self {
            Value::Missing => true,
            _ => false,
        }
    }

    /// `Missing`, or an empty tuple/list.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Missing => true,
            Value::Tuple(values) | Value::List(values) => values.is_empty(),
            _ => false,
        }
    }

    /// Whether a tuple/list has a `Missing` element.
    pub fn has_holes(&self) -> bool {
        match self {
            Value::Tuple(values) | Value::List(values) => values.iter().any(Value::is_missing),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_slice(&self) -> Option<&[Value]> {
        match self {
            Value::Tuple(values) | Value::List(values) => Some(values),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Missing => write!(f, ""),
            Value::Str(s) => write!(f, "{}", s),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Path(path) => write!(f, "{}", path.display()),
            Value::Tuple(values) | Value::List(values) => {
                let values: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "{}", values.join(" "))
            }
        }
    }
}

/// The limits of a range, in the domain of its values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bounds {
    Int(Option<i64>, Option<i64>),
    Float(Option<f64>, Option<f64>),
}

/// A numeric type restricted to an interval.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberRange {
    pub bounds: Bounds,
    pub min_open: bool,
    pub max_open: bool,
    /// Out-of-range values are moved to the nearest bound instead of
    /// being rejected.
    pub clamp: bool,
}

impl NumberRange {
    pub fn int(min: Option<i64>, max: Option<i64>) -> NumberRange {
        NumberRange::with_bounds(Bounds::Int(min, max))
    }

    pub fn float(min: Option<f64>, max: Option<f64>) -> NumberRange {
        NumberRange::with_bounds(Bounds::Float(min, max))
    }

    fn with_bounds(bounds: Bounds) -> NumberRange {
        NumberRange {
            bounds,
            min_open: false,
            max_open: false,
            clamp: false,
        }
    }

    pub fn open(mut self, min_open: bool, max_open: bool) -> NumberRange {
        self.min_open = min_open;
        self.max_open = max_open;
        self
    }

    pub fn clamped(mut self) -> NumberRange {
        self.clamp = true;
        self
    }

    pub fn name(&self) -> &'static str {
        match self.bounds {
            Bounds::Int(..) => "integer range",
            Bounds::Float(..) => "float range",
        }
    }

    /// Describes the interval, e.g. `1<=x<=10`, `x<5` or `0<=x clamped`.
    pub fn describe(&self) -> String {
        let (min, max) = match self.bounds {
            Bounds::Int(min, max) => (min.map(|n| n.to_string()), max.map(|n| n.to_string())),
            Bounds::Float(min, max) => (min.map(|n| format!("{:?}", n)), max.map(|n| format!("{:?}", n))),
        };

        let lop = if self.min_open { "<" } else { "<=" };
        let rop = if self.max_open { "<" } else { "<=" };
        let range = match (min, max) {
            (None, None) => "x".to_owned(),
            (None, Some(max)) => format!("x{}{}", rop, max),
            (Some(min), None) => format!("x{}{}", if self.min_open { ">" } else { ">=" }, min),
            (Some(min), Some(max)) => format!("{}{}x{}{}", min, lop, rop, max),
        };

        if self.clamp {
            format!("{} clamped", range)
        } else {
            range
        }
    }

    fn convert(&self, raw: &str) -> Result<Value, String> {
        let trimmed = raw.trim();
        match self.bounds {
            Bounds::Int(min, max) => {
                let n = trimmed
                    .parse::<i64>()
                    .map_err(|_| format!("'{}' is not a valid integer.", raw))?;
                // Open bounds clamp to the nearest integer inside the range.
                self.check(trimmed, n, min, max, |bound, up| {
                    if up {
                        bound.saturating_add(1)
                    } else {
                        bound.saturating_sub(1)
                    }
                })
                .map(Value::Int)
            }
            Bounds::Float(min, max) => {
                let n = trimmed
                    .parse::<f64>()
                    .map_err(|_| format!("'{}' is not a valid float.", raw))?;
                self.check(trimmed, n, min, max, |bound, _| bound).map(Value::Float)
            }
        }
    }

    /// Rejects or clamps `n`. `step(bound, up)` gives the value just inside
    /// an open bound.
    fn check<T, F>(&self, raw: &str, n: T, min: Option<T>, max: Option<T>, step: F) -> Result<T, String>
    where
        T: PartialOrd + Copy,
        F: Fn(T, bool) -> T,
    {
        let below = min
            .map(|min| if self.min_open { n <= min } else { n < min })
            .unwrap_or(false);
        let above = max
            .map(|max| if self.max_open { n >= max } else { n > max })
            .unwrap_or(false);

        if !below && !above {
            return Ok(n);
        }

        if !self.clamp {
            return Err(format!("{} is not in the range {}.", raw, self.describe()));
        }

        match (below, min, max) {
            (true, Some(min), _) => Ok(if self.min_open { step(min, true) } else { min }),
            (_, _, Some(max)) => Ok(if self.max_open { step(max, false) } else { max }),
            _ => Ok(n),
        }
    }
}

/// A path type's constraints, checked at conversion time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathSpec {
    pub exists: bool,
    pub file_okay: bool,
    pub dir_okay: bool,
    pub readable: bool,
    pub writable: bool,
    /// Accepts `-` (stdin/stdout) as is.
    pub allow_dash: bool,
}

impl Default for PathSpec {
    fn default() -> PathSpec {
        PathSpec {
            exists: false,
            file_okay: true,
            dir_okay: true,
            readable: true,
            writable: false,
            allow_dash: false,
        }
    }
}

impl PathSpec {
    pub fn file() -> PathSpec {
        PathSpec {
            dir_okay: false,
            ..PathSpec::default()
        }
    }

    pub fn directory() -> PathSpec {
        PathSpec {
            file_okay: false,
            ..PathSpec::default()
        }
    }

    pub fn exists(mut self) -> PathSpec {
        self.exists = true;
        self
    }

    pub fn writable(mut self) -> PathSpec {
        self.writable = true;
        self
    }

    pub fn allow_dash(mut self) -> PathSpec {
        self.allow_dash = true;
        self
    }

    /// Whether only directories are accepted.
    pub fn dir_only(&self) -> bool {
        self.dir_okay && !self.file_okay
    }

    pub fn name(&self) -> &'static str {
        match (self.file_okay, self.dir_okay) {
            (true, false) => "file",
            (false, true) => "directory",
            _ => "path",
        }
    }

    fn convert(&self, raw: &str) -> Result<Value, String> {
        if self.allow_dash && raw == "-" {
            return Ok(Value::Path(PathBuf::from(raw)));
        }

        let mut kind = self.name().to_owned();
        if let Some(first) = kind.get_mut(0..1) {
            first.make_ascii_uppercase();
        }

        let metadata = match fs::metadata(raw) {
            Ok(metadata) => metadata,
            Err(_) if self.exists => {
                return Err(format!("{} '{}' does not exist.", kind, raw));
            }
            Err(_) => return Ok(Value::Path(PathBuf::from(raw))),
        };

        if metadata.is_file() && !self.file_okay {
            return Err(format!("{} '{}' is a file.", kind, raw));
        }
        if metadata.is_dir() && !self.dir_okay {
            return Err(format!("{} '{}' is a directory.", kind, raw));
        }
        if self.writable && metadata.permissions().readonly() {
            return Err(format!("{} '{}' is not writable.", kind, raw));
        }
        if self.readable && metadata.is_file() && fs::File::open(raw).is_err() {
            return Err(format!("{} '{}' is not readable.", kind, raw));
        }

        Ok(Value::Path(PathBuf::from(raw)))
    }
}

/// A fixed set of accepted strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChoiceSpec {
    pub choices: Vec<String>,
    pub case_sensitive: bool,
}

impl ChoiceSpec {
    /// Whether `choice` starts with `prefix`, honoring case sensitivity.
    pub fn matches_prefix(&self, choice: &str, prefix: &str) -> bool {
        if self.case_sensitive {
            choice.starts_with(prefix)
        } else {
            choice.to_lowercase().starts_with(&prefix.to_lowercase())
        }
    }

    fn convert(&self, raw: &str) -> Result<Value, String> {
        let found = self.choices.iter().find(|choice| {
            if self.case_sensitive {
                choice.as_str() == raw
            } else {
                choice.to_lowercase() == raw.to_lowercase()
            }
        });

        match found {
            Some(choice) => Ok(Value::Str(choice.clone())),
            None => {
                let quoted: Vec<String> = self.choices.iter().map(|c| format!("'{}'", c)).collect();
                match quoted.len() {
                    1 => Err(format!("'{}' is not {}.", raw, quoted[0])),
                    _ => Err(format!("'{}' is not one of {}.", raw, quoted.join(", "))),
                }
            }
        }
    }
}

pub type ConvertFn = Arc<dyn Fn(&str) -> Result<Value, String> + Send + Sync>;

/// A user-defined type: an optional converter (strings pass through
/// without one) and an optional completion callback.
#[derive(Clone)]
pub struct CustomType {
    pub name: String,
    convert: Option<ConvertFn>,
    complete: Option<CompleteFn>,
}

impl CustomType {
    pub fn new(name: &str) -> CustomType {
        CustomType {
            name: name.to_owned(),
            convert: None,
            complete: None,
        }
    }

    pub fn converter<F>(mut self, f: F) -> CustomType
    where
        F: Fn(&str) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.convert = Some(Arc::new(f));
        self
    }

    pub fn completer(mut self, f: CompleteFn) -> CustomType {
        self.complete = Some(f);
        self
    }

    pub fn complete_fn(&self) -> Option<&CompleteFn> {
        self.complete.as_ref()
    }
}

impl fmt::Debug for CustomType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("CustomType")
            .field("name", &self.name)
            .field("convert", &self.convert.is_some())
            .field("complete", &self.complete.is_some())
            .finish()
    }
}

impl PartialEq for CustomType {
    fn eq(&self, other: &CustomType) -> bool {
        self.name == other.name
    }
}

/// The type of a parameter's value.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueType {
    String,
    Int,
    Float,
    Bool,
    Range(NumberRange),
    Choice(ChoiceSpec),
    Path(PathSpec),
    /// One value per slot; fixes the parameter's `nargs` to its length.
    Tuple(Vec<ValueType>),
    /// Passed through without any processing.
    Unprocessed,
    Custom(CustomType),
}

impl ValueType {
    pub fn choice<I, S>(choices: I) -> ValueType
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ValueType::Choice(ChoiceSpec {
            choices: choices.into_iter().map(Into::into).collect(),
            case_sensitive: true,
        })
    }

    pub fn choice_ignore_case<I, S>(choices: I) -> ValueType
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ValueType::Choice(ChoiceSpec {
            choices: choices.into_iter().map(Into::into).collect(),
            case_sensitive: false,
        })
    }

    pub fn int_range(min: i64, max: i64) -> ValueType {
        ValueType::Range(NumberRange::int(Some(min), Some(max)))
    }

    pub fn path() -> ValueType {
        ValueType::Path(PathSpec::default())
    }

    pub fn name(&self) -> String {
        match self {
            ValueType::String | ValueType::Unprocessed => "text".to_owned(),
            ValueType::Int => "integer".to_owned(),
            ValueType::Float => "float".to_owned(),
            ValueType::Bool => "boolean".to_owned(),
            ValueType::Range(range) => range.name().to_owned(),
            ValueType::Choice(_) => "choice".to_owned(),
            ValueType::Path(spec) => spec.name().to_owned(),
            ValueType::Tuple(types) => {
                let names: Vec<String> = types.iter().map(ValueType::name).collect();
                format!("<{}>", names.join(" "))
            }
            ValueType::Custom(custom) => custom.name.clone(),
        }
    }

    /// A stable, structural description of the type. Two types with the
    /// same description behave identically for completion.
    pub fn descriptor(&self) -> String {
        match self {
            ValueType::Range(range) => format!("{} {}", range.name(), range.describe()),
            ValueType::Choice(spec) => format!(
                "choice[{}]{}",
                spec.choices.join("|"),
                if spec.case_sensitive { "" } else { "/i" }
            ),
            ValueType::Path(spec) => format!(
                "{}[{}{}{}{}]",
                spec.name(),
                if spec.exists { "e" } else { "" },
                if spec.readable { "r" } else { "" },
                if spec.writable { "w" } else { "" },
                if spec.allow_dash { "-" } else { "" }
            ),
            ValueType::Tuple(types) => {
                let names: Vec<String> = types.iter().map(ValueType::descriptor).collect();
                format!("tuple({})", names.join(", "))
            }
            ValueType::Unprocessed => "unprocessed".to_owned(),
            other => other.name(),
        }
    }

    /// What the status line shows for the type, e.g. `integer range 1<=x<=10`
    /// or `choice [a|b]`.
    pub fn metavar(&self) -> String {
        match self {
            ValueType::Range(range) => format!("{} {}", range.name(), range.describe()),
            ValueType::Choice(spec) => format!("choice [{}]", spec.choices.join("|")),
            other => other.name(),
        }
    }

    /// The number of values a tuple type takes.
    pub fn arity(&self) -> Option<usize> {
        match self {
            ValueType::Tuple(types) => Some(types.len()),
            _ => None,
        }
    }

    /// The type of the `index`th value: the slot type for tuples and the
    /// type itself otherwise.
    pub fn slot(&self, index: usize) -> &ValueType {
        match self {
            ValueType::Tuple(types) => types.get(index).unwrap_or(self),
            _ => self,
        }
    }

    pub fn convert(&self, raw: &str) -> Result<Value, String> {
        match self {
            ValueType::String | ValueType::Unprocessed => Ok(Value::Str(raw.to_owned())),
            ValueType::Int => raw
                .trim()
                .parse()
                .map(Value::Int)
                .map_err(|_| format!("'{}' is not a valid integer.", raw)),
            ValueType::Float => raw
                .trim()
                .parse()
                .map(Value::Float)
                .map_err(|_| format!("'{}' is not a valid float.", raw)),
            ValueType::Bool => BOOL_STRINGS
                .get(raw.trim().to_lowercase().as_str())
                .map(|b| Value::Bool(*b))
                .ok_or_else(|| format!("'{}' is not a valid boolean.", raw)),
            ValueType::Range(range) => range.convert(raw),
            ValueType::Choice(spec) => spec.convert(raw),
            ValueType::Path(spec) => spec.convert(raw),
            ValueType::Tuple(types) => match types.first() {
                Some(first) => first.convert(raw),
                None => Ok(Value::Str(raw.to_owned())),
            },
            ValueType::Custom(custom) => match &custom.convert {
                Some(convert) => convert(raw),
                None => Ok(Value::Str(raw.to_owned())),
            },
        }
    }
}
