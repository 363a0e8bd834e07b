//! Error and control-flow signal types shared across the evaluation core.
//!
//! Spec §7 groups errors into seven kinds. Four of them (`TokenError`,
//! `ParseError`) live next to the layer that raises them
//! (`parser::lexer`, `parser`); the rest are collected here alongside
//! the control-flow signals (`break`/`continue`/`return`/`exit`) that
//! the executor threads up the call stack as `Result::Err` values,
//! following the teacher's `ControlFlowError` shape but without the
//! captured-stdout/stderr fields a sandboxed interpreter needs — here
//! output already went to the real file descriptors by the time the
//! signal is raised.

use std::fmt;

/// `break N` — unwinds up to `levels` enclosing loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakSignal {
    pub levels: u32,
}

/// `continue N` — restarts up to `levels` enclosing loops at the next iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContinueSignal {
    pub levels: u32,
}

/// `return N` inside a function (or sourced script) frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReturnSignal {
    pub exit_code: i32,
}

/// `exit N` — unwinds the whole process, running EXIT traps on the way out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitSignal {
    pub exit_code: i32,
}

/// Expansion-layer failures (spec §7 kind 3).
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ExpansionError {
    #[error("{0}: unbound variable")]
    UnboundVariable(String),
    #[error("{0}: bad substitution")]
    BadSubstitution(String),
    #[error("{0}")]
    AssertionFailed(String),
    #[error("command substitution failed with status {0}")]
    CommandSubstitutionFailed(i32),
}

/// Redirection failures (spec §7 kind 4).
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum RedirectionError {
    #[error("{0}: No such file or directory")]
    CannotOpen(String),
    #[error("{0}: ambiguous redirect")]
    Ambiguous(String),
    #[error("{0}: invalid file descriptor")]
    BadFd(String),
}

/// Runtime failures (spec §7 kind 7).
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("{0}: readonly variable")]
    ReadonlyViolation(String),
    #[error("{0}: nameref chain too deep")]
    NamerefOverflow(String),
    #[error("{0}: alias expansion exceeded depth limit")]
    AliasOverflow(String),
    #[error("shift count out of range")]
    ShiftOutOfRange,
    #[error("{0}")]
    JobControl(String),
}

/// The unifying error type the executor propagates. A `ShellError` is
/// either a genuine failure (kinds 3-7 from spec §7) or one of the
/// four control-flow signals; the executor inspects which before
/// deciding whether to keep unwinding or to stop at a loop/function
/// boundary.
#[derive(Debug, Clone)]
pub enum ShellError {
    Expansion(ExpansionError),
    Redirection(RedirectionError),
    Runtime(RuntimeError),
    CommandNotFound(String),
    PermissionDenied(String),
    Break(BreakSignal),
    Continue(ContinueSignal),
    Return(ReturnSignal),
    Exit(ExitSignal),
}

impl fmt::Display for ShellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expansion(e) => write!(f, "{e}"),
            Self::Redirection(e) => write!(f, "{e}"),
            Self::Runtime(e) => write!(f, "{e}"),
            Self::CommandNotFound(name) => write!(f, "{name}: command not found"),
            Self::PermissionDenied(name) => write!(f, "{name}: permission denied"),
            Self::Break(_) => write!(f, "break"),
            Self::Continue(_) => write!(f, "continue"),
            Self::Return(_) => write!(f, "return"),
            Self::Exit(_) => write!(f, "exit"),
        }
    }
}

impl std::error::Error for ShellError {}

impl From<ExpansionError> for ShellError {
    fn from(e: ExpansionError) -> Self {
        Self::Expansion(e)
    }
}
impl From<RedirectionError> for ShellError {
    fn from(e: RedirectionError) -> Self {
        Self::Redirection(e)
    }
}
impl From<RuntimeError> for ShellError {
    fn from(e: RuntimeError) -> Self {
        Self::Runtime(e)
    }
}
impl From<BreakSignal> for ShellError {
    fn from(e: BreakSignal) -> Self {
        Self::Break(e)
    }
}
impl From<ContinueSignal> for ShellError {
    fn from(e: ContinueSignal) -> Self {
        Self::Continue(e)
    }
}
impl From<ReturnSignal> for ShellError {
    fn from(e: ReturnSignal) -> Self {
        Self::Return(e)
    }
}
impl From<ExitSignal> for ShellError {
    fn from(e: ExitSignal) -> Self {
        Self::Exit(e)
    }
}

impl ShellError {
    /// Is this a loop/function unwind rather than an actual failure?
    pub fn is_control_flow(&self) -> bool {
        matches!(self, Self::Break(_) | Self::Continue(_) | Self::Return(_) | Self::Exit(_))
    }

    /// Exit code this error should leave in `$?` when it surfaces at
    /// the top of a command (spec §6 "Exit codes").
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Expansion(_) => 1,
            Self::Redirection(_) => 1,
            Self::Runtime(_) => 1,
            Self::CommandNotFound(_) => 127,
            Self::PermissionDenied(_) => 126,
            Self::Break(_) | Self::Continue(_) => 0,
            Self::Return(r) => r.exit_code,
            Self::Exit(e) => e.exit_code,
        }
    }
}

/// `den: <context>: message` prefix required by spec §7.
pub fn report(context: &str, message: impl fmt::Display) {
    eprintln!("den: {context}: {message}");
}

pub type ShellResult<T> = Result<T, ShellError>;
