//! Fast path for trivial single-line input (spec §4.H "Fast path").
//!
//! A pure optimization: recognizes a narrow, unambiguous subset of
//! input (bare `:`/`true`/`false`/`exit [N]` with nothing else on the
//! line) and runs it without invoking the tokenizer/parser. Anything
//! that isn't an exact match for one of these falls through to the
//! normal parse-and-execute path, so this must never change behavior,
//! only skip redundant work for the common case.

use crate::errors::ShellResult;
use crate::executor::Executor;

/// Returns `Some(exit_code)` if `line` was handled entirely by the
/// fast path, `None` if the caller should fall back to the full
/// tokenizer/parser/executor pipeline.
pub fn try_run(exec: &mut Executor, line: &str) -> Option<ShellResult<i32>> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Some(Ok(exec.state.last_exit_code));
    }
    // Any of these characters means the line needs real parsing
    // (quoting, substitution, pipes, redirection, control flow, etc).
    if trimmed.bytes().any(|b| b"\"'`$|&;()<>{}[]#\\\n".contains(&b)) {
        return None;
    }

    let mut words = trimmed.split_whitespace();
    let first = words.next()?;
    match first {
        ":" | "true" if words.next().is_none() => Some(Ok(0)),
        "false" if words.next().is_none() => Some(Ok(1)),
        "exit" => {
            let code = match words.next() {
                None => Some(exec.state.last_exit_code),
                Some(n) if words.next().is_none() => n.parse::<i32>().ok(),
                _ => None,
            };
            code.map(|c| Err(crate::errors::ShellError::Exit(crate::errors::ExitSignal { exit_code: c })))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::JobManager;
    use crate::state::ShellState;

    fn with_exec<R>(f: impl FnOnce(&mut Executor) -> R) -> R {
        let mut state = ShellState::new();
        let mut jobs = JobManager::new();
        let mut exec = Executor::new(&mut state, &mut jobs);
        f(&mut exec)
    }

    #[test]
    fn recognizes_bare_true_false_colon() {
        with_exec(|e| {
            assert!(matches!(try_run(e, "true"), Some(Ok(0))));
            assert!(matches!(try_run(e, "false"), Some(Ok(1))));
            assert!(matches!(try_run(e, ":"), Some(Ok(0))));
        });
    }

    #[test]
    fn defers_anything_with_special_characters() {
        with_exec(|e| {
            assert!(try_run(e, "echo $HOME").is_none());
            assert!(try_run(e, "true; false").is_none());
            assert!(try_run(e, "true | cat").is_none());
        });
    }

    #[test]
    fn exit_with_code_returns_exit_signal() {
        with_exec(|e| {
            let result = try_run(e, "exit 3");
            assert!(matches!(result, Some(Err(crate::errors::ShellError::Exit(sig))) if sig.exit_code == 3));
        });
    }
}
