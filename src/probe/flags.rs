//! Preprocessor defines from build flags

use indexmap::IndexMap;

/// A `-D` define
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Define {
    pub name: String,
    pub value: Option<String>,
}

impl Define {
    pub fn new(name: impl Into<String>, value: Option<&str>) -> Self {
        Self {
            name: name.into(),
            value: value.map(String::from),
        }
    }

    /// Parse `NAME` or `NAME=VALUE`
    pub fn parse(text: &str) -> Option<Self> {
        let (name, value) = match text.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (text, None),
        };
        let name = name.trim();
        (!name.is_empty()).then(|| Self::new(name, value))
    }

    /// Render as a compiler argument
    pub fn to_arg(&self) -> String {
        match &self.value {
            Some(value) => format!("-D{}={}", self.name, value),
            None => format!("-D{}", self.name),
        }
    }
}

/// Split a flags string into arguments.
///
/// Whitespace separates arguments except inside single or double quotes;
/// the quotes themselves are removed.
pub fn split_flags(flags: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_arg = false;
    let mut quote: Option<char> = None;

    for c in flags.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                in_arg = true;
            }
            None if c.is_whitespace() => {
                if in_arg {
                    args.push(std::mem::take(&mut current));
                    in_arg = false;
                }
            }
            None => {
                current.push(c);
                in_arg = true;
            }
        }
    }
    if in_arg {
        args.push(current);
    }
    args
}

/// Collect the defines set by a list of flags strings.
///
/// Accepts `-DNAME`, `-DNAME=VALUE` and `-D NAME[=VALUE]`. A later define
/// of the same name replaces the earlier value.
pub fn parse_defines<S: AsRef<str>>(build_flags: &[S]) -> Vec<Define> {
    let mut defines: IndexMap<String, Option<String>> = IndexMap::new();

    for flags in build_flags {
        let mut args = split_flags(flags.as_ref()).into_iter();
        while let Some(arg) = args.next() {
            let body = match arg.strip_prefix("-D") {
                Some("") => match args.next() {
                    Some(next) => next,
                    None => break,
                },
                Some(body) => body.to_string(),
                None => continue,
            };
            if let Some(define) = Define::parse(&body) {
                defines.insert(define.name, define.value);
            }
        }
    }

    defines
        .into_iter()
        .map(|(name, value)| Define { name, value })
        .collect()
}
