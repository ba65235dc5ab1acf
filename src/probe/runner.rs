//! Preprocessor invocation
//!
//! Abstracts the compiler subprocess for testability:
//! - PreprocessorRunner trait: runs one invocation, returns the macro table
//! - CommandRunner: spawns the real compiler
//! - MockRunner: fixed table, counts invocations

use std::cell::{Cell, RefCell};
use std::path::PathBuf;
use std::process::Command;

use super::flags::Define;
use super::macros::{parse_macro_output, MacroTable};
use super::ProbeError;

/// One preprocessor-only compiler run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub compiler: PathBuf,
    pub defines: Vec<Define>,
    /// Header pulling in the feature-defining headers
    pub header: PathBuf,
    /// Define set only while probing
    pub marker: String,
    pub working_dir: Option<PathBuf>,
}

impl Invocation {
    /// Compiler arguments: every define, the marker, then a macro dump of
    /// the header with warnings off.
    pub fn args(&self) -> Vec<String> {
        let mut args: Vec<String> = self.defines.iter().map(Define::to_arg).collect();
        args.push(format!("-D{}", self.marker));
        args.extend(["-w", "-dM", "-E", "-x", "c++"].map(String::from));
        args.push(self.header.to_string_lossy().to_string());
        args
    }

    /// Printable command line
    pub fn command_line(&self) -> String {
        let mut line = format!("\"{}\"", self.compiler.display());
        for arg in self.args() {
            line.push(' ');
            line.push_str(&arg);
        }
        line
    }
}

/// Runs the preprocessor and returns its macro table
pub trait PreprocessorRunner {
    fn preprocess(&self, invocation: &Invocation) -> Result<MacroTable, ProbeError>;
}

/// Spawns the compiler directly (no shell)
#[derive(Debug, Clone, Default)]
pub struct CommandRunner;

impl CommandRunner {
    pub fn new() -> Self {
        Self
    }
}

impl PreprocessorRunner for CommandRunner {
    fn preprocess(&self, invocation: &Invocation) -> Result<MacroTable, ProbeError> {
        log::trace!("{}", invocation.command_line());

        let mut command = Command::new(&invocation.compiler);
        command.args(invocation.args());
        if let Some(dir) = &invocation.working_dir {
            command.current_dir(dir);
        }

        let output = command.output().map_err(|source| ProbeError::Spawn {
            compiler: invocation.compiler.clone(),
            source,
        })?;

        if !output.status.success() {
            return Err(ProbeError::Failed {
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8(output.stdout)?;
        parse_macro_output(&stdout)
    }
}

/// Returns a fixed table and records how often it was asked
#[derive(Debug, Default)]
pub struct MockRunner {
    table: MacroTable,
    calls: Cell<usize>,
    last: RefCell<Option<Invocation>>,
}

impl MockRunner {
    pub fn new(table: MacroTable) -> Self {
        Self {
            table,
            ..Self::default()
        }
    }

    /// Number of invocations so far
    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    /// Most recent invocation
    pub fn last_invocation(&self) -> Option<Invocation> {
        self.last.borrow().clone()
    }
}

impl PreprocessorRunner for MockRunner {
    fn preprocess(&self, invocation: &Invocation) -> Result<MacroTable, ProbeError> {
        self.calls.set(self.calls.get() + 1);
        *self.last.borrow_mut() = Some(invocation.clone());
        Ok(self.table.clone())
    }
}

impl<R: PreprocessorRunner + ?Sized> PreprocessorRunner for &R {
    fn preprocess(&self, invocation: &Invocation) -> Result<MacroTable, ProbeError> {
        (**self).preprocess(invocation)
    }
}
