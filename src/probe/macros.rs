//! Macro table parsed from `-dM -E` output

use std::collections::BTreeMap;

use serde::Serialize;

use super::ProbeError;

/// Macro name → raw value, as seen by the preprocessor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MacroTable {
    macros: BTreeMap<String, String>,
}

impl MacroTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.macros.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.macros.insert(name.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.macros.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MacroTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (name, value) in iter {
            table.insert(name, value);
        }
        table
    }
}

/// Parse `#define NAME VALUE` lines.
///
/// The value is everything after the first space following the name and
/// may be empty. Blank lines are skipped; any other line is an error.
pub fn parse_macro_output(output: &str) -> Result<MacroTable, ProbeError> {
    let mut table = MacroTable::new();

    for line in output.lines() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        let definition = line
            .strip_prefix("#define ")
            .ok_or_else(|| ProbeError::Unparsable {
                line: line.to_string(),
            })?;

        let (name, value) = definition.split_once(' ').unwrap_or((definition, ""));
        if name.is_empty() {
            return Err(ProbeError::Unparsable {
                line: line.to_string(),
            });
        }
        table.insert(name, value);
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_values() {
        let table = parse_macro_output(
            "#define __STDC__ 1\n#define HAS_TMC 1\n#define SDSUPPORT \n#define BLTOUCH\n#define STR \"a b  c\"\n",
        )
        .unwrap();

        assert_eq!(table.len(), 5);
        assert_eq!(table.get("__STDC__"), Some("1"));
        assert_eq!(table.get("SDSUPPORT"), Some(""));
        assert_eq!(table.get("BLTOUCH"), Some(""));
        assert_eq!(table.get("STR"), Some("\"a b  c\""));
    }

    #[test]
    fn test_function_like_macro_keeps_parameter_list_in_name() {
        let table = parse_macro_output("#define MAX(a,b) ((a)>(b)?(a):(b))\n").unwrap();
        assert_eq!(table.get("MAX(a,b)"), Some("((a)>(b)?(a):(b))"));
    }

    #[test]
    fn test_blank_lines_and_crlf() {
        let table = parse_macro_output("\r\n#define A 1\r\n\n").unwrap();
        assert_eq!(table.get("A"), Some("1"));
    }

    #[test]
    fn test_garbage_is_error() {
        let err = parse_macro_output("#define A 1\nerror: no such file\n").unwrap_err();
        match err {
            ProbeError::Unparsable { line } => assert_eq!(line, "error: no such file"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_define_without_name_is_error() {
        assert!(parse_macro_output("#define  1").is_err());
    }

    #[test]
    fn test_from_iter() {
        let table: MacroTable = [("A", "B"), ("B", "1")].into_iter().collect();
        assert!(table.contains("A"));
        assert_eq!(table.iter().count(), 2);
    }
}
