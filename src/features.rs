//! Feature enabled/disabled evaluation
//!
//! A feature is enabled when a macro of exactly that name exists and its
//! value is empty, `1` or `true`. A value naming another macro is an alias
//! and is evaluated in turn. Anything else, including `0` and `false`,
//! means disabled.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::probe::{MacroSource, MacroTable, ProbeError};

/// Macro values that switch a feature on
const ENABLED_VALUES: &[&str] = &["", "1", "true"];

/// Evaluation errors
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error("Macro alias cycle: {chain}")]
    AliasCycle { chain: String },
}

/// Answers "is feature X enabled" against a macro source.
///
/// The macro table does not change during a run, so answers are memoized.
pub struct FeatureEvaluator<S> {
    source: S,
    memo: RefCell<HashMap<String, bool>>,
}

impl<S: MacroSource> FeatureEvaluator<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            memo: RefCell::new(HashMap::new()),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// The full macro table, probing on first use
    pub fn macro_table(&self) -> Result<&MacroTable, ProbeError> {
        self.source.macro_table()
    }

    /// Raw value of a macro
    pub fn macro_value(&self, name: &str) -> Result<Option<&str>, ProbeError> {
        Ok(self.source.macro_table()?.get(name))
    }

    /// Whether the named feature is enabled
    pub fn is_enabled(&self, name: &str) -> Result<bool, EvalError> {
        if let Some(&enabled) = self.memo.borrow().get(name) {
            return Ok(enabled);
        }

        let enabled = self.evaluate(name, &mut Vec::new())?;
        self.memo.borrow_mut().insert(name.to_string(), enabled);
        Ok(enabled)
    }

    fn evaluate(&self, name: &str, chain: &mut Vec<String>) -> Result<bool, EvalError> {
        if chain.iter().any(|seen| seen == name) {
            chain.push(name.to_string());
            return Err(EvalError::AliasCycle {
                chain: chain.join(" -> "),
            });
        }

        let table = self.source.macro_table()?;
        let Some(value) = table.get(name) else {
            return Ok(false);
        };

        if ENABLED_VALUES.contains(&value) {
            return Ok(true);
        }

        if table.contains(value) {
            chain.push(name.to_string());
            return self.evaluate(value, chain);
        }

        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluator(pairs: &[(&str, &str)]) -> FeatureEvaluator<MacroTable> {
        FeatureEvaluator::new(pairs.iter().copied().collect())
    }

    #[test]
    fn test_enabled_values() {
        let eval = evaluator(&[("EMPTY", ""), ("ONE", "1"), ("TRUE", "true")]);
        assert!(eval.is_enabled("EMPTY").unwrap());
        assert!(eval.is_enabled("ONE").unwrap());
        assert!(eval.is_enabled("TRUE").unwrap());
    }

    #[test]
    fn test_disabled_values() {
        let eval = evaluator(&[("ZERO", "0"), ("FALSE", "false"), ("NUM", "350"), ("UPPER", "TRUE")]);
        assert!(!eval.is_enabled("ZERO").unwrap());
        assert!(!eval.is_enabled("FALSE").unwrap());
        assert!(!eval.is_enabled("NUM").unwrap());
        assert!(!eval.is_enabled("UPPER").unwrap());
    }

    #[test]
    fn test_missing_macro_is_disabled() {
        let eval = evaluator(&[("A", "1")]);
        assert!(!eval.is_enabled("B").unwrap());
    }

    #[test]
    fn test_exact_name_match_only() {
        let eval = evaluator(&[("SDSUPPORT", "1"), ("HAS_TMC", "1")]);
        assert!(!eval.is_enabled("sdsupport").unwrap());
        assert!(!eval.is_enabled("SDSUPPOR").unwrap());
        assert!(!eval.is_enabled("HAS_.*").unwrap());
    }

    #[test]
    fn test_alias_resolution() {
        let eval = evaluator(&[("A", "B"), ("B", "1")]);
        assert!(eval.is_enabled("A").unwrap());

        let eval = evaluator(&[("A", "B"), ("B", "0")]);
        assert!(!eval.is_enabled("A").unwrap());

        let eval = evaluator(&[("A", "B"), ("B", "C"), ("C", "")]);
        assert!(eval.is_enabled("A").unwrap());
    }

    #[test]
    fn test_value_naming_absent_macro_is_disabled() {
        let eval = evaluator(&[("A", "NOT_DEFINED")]);
        assert!(!eval.is_enabled("A").unwrap());
    }

    #[test]
    fn test_alias_cycle_fails_fast() {
        let eval = evaluator(&[("A", "B"), ("B", "A")]);
        match eval.is_enabled("A") {
            Err(EvalError::AliasCycle { chain }) => assert_eq!(chain, "A -> B -> A"),
            other => panic!("expected cycle error, got {:?}", other),
        }

        let eval = evaluator(&[("SELF", "SELF")]);
        assert!(matches!(eval.is_enabled("SELF"), Err(EvalError::AliasCycle { .. })));
    }

    #[test]
    fn test_macro_value() {
        let eval = evaluator(&[("RX_BUFFER_SIZE", "128")]);
        assert_eq!(eval.macro_value("RX_BUFFER_SIZE").unwrap(), Some("128"));
        assert_eq!(eval.macro_value("TX_BUFFER_SIZE").unwrap(), None);
    }
}
