//! Trap and signal handling (spec §5 "Cancellation", spec §4.G `trap`).
//!
//! Trap bodies are plain shell source stored in `ShellState::signal_handlers`,
//! keyed by condition name (`EXIT`, `ERR`, `DEBUG`, `RETURN`, or a POSIX
//! signal name like `INT`/`TERM`/`USR1`). Running one re-enters the
//! `Executor` the same way `source` does; a depth guard stops an `ERR`
//! trap whose own body fails from re-triggering itself forever.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::errors::{ShellError, ShellResult};
use crate::executor::Executor;

const MAX_TRAP_DEPTH: u32 = 8;

static TRAP_DEPTH: AtomicU32 = AtomicU32::new(0);

/// Set by the real `SIGINT` handler; the interactive read loop and
/// long-running builtins poll `take_sigint` between units of work
/// since signal handlers themselves must stay async-signal-safe.
static SIGINT_RECEIVED: AtomicBool = AtomicBool::new(false);

/// Every signal name `trap` accepts, spelled the way bash prints them
/// (without the `SIG` prefix) — spec §4.G `trap -l`.
pub const SIGNAL_NAMES: &[&str] = &[
    "HUP", "INT", "QUIT", "ILL", "TRAP", "ABRT", "BUS", "FPE", "KILL",
    "USR1", "SEGV", "USR2", "PIPE", "ALRM", "TERM", "CHLD", "CONT",
    "STOP", "TSTP", "TTIN", "TTOU", "WINCH",
];

/// Pseudo-conditions that aren't POSIX signals but are valid `trap`
/// targets (spec §4.G).
pub const PSEUDO_CONDITIONS: &[&str] = &["EXIT", "ERR", "DEBUG", "RETURN"];

fn signal_number(name: &str) -> Option<i32> {
    Some(match name {
        "HUP" => libc::SIGHUP,
        "INT" => libc::SIGINT,
        "QUIT" => libc::SIGQUIT,
        "ILL" => libc::SIGILL,
        "TRAP" => libc::SIGTRAP,
        "ABRT" => libc::SIGABRT,
        "BUS" => libc::SIGBUS,
        "FPE" => libc::SIGFPE,
        "KILL" => libc::SIGKILL,
        "USR1" => libc::SIGUSR1,
        "SEGV" => libc::SIGSEGV,
        "USR2" => libc::SIGUSR2,
        "PIPE" => libc::SIGPIPE,
        "ALRM" => libc::SIGALRM,
        "TERM" => libc::SIGTERM,
        "CHLD" => libc::SIGCHLD,
        "CONT" => libc::SIGCONT,
        "STOP" => libc::SIGSTOP,
        "TSTP" => libc::SIGTSTP,
        "TTIN" => libc::SIGTTIN,
        "TTOU" => libc::SIGTTOU,
        "WINCH" => libc::SIGWINCH,
        _ => return None,
    })
}

/// Normalize `trap`'s condition argument: bare numbers (`trap ... 2`),
/// `SIGINT`, and `int` all resolve to the same canonical name.
pub fn normalize_condition(raw: &str) -> Option<String> {
    if PSEUDO_CONDITIONS.contains(&raw.to_uppercase().as_str()) {
        return Some(raw.to_uppercase());
    }
    let stripped = raw.strip_prefix("SIG").unwrap_or(raw).to_uppercase();
    if SIGNAL_NAMES.contains(&stripped.as_str()) {
        return Some(stripped);
    }
    if let Ok(n) = raw.parse::<i32>() {
        return SIGNAL_NAMES.iter().find(|s| signal_number(s) == Some(n)).map(|s| s.to_string());
    }
    None
}

extern "C" fn handle_sigint(_: libc::c_int) {
    SIGINT_RECEIVED.store(true, Ordering::SeqCst);
}

/// Install Den's own `SIGINT` handler so an interactive read loop can
/// observe an interrupt instead of being killed by it (spec §5). Real
/// POSIX signals a trap is registered for are re-routed through this
/// same flag-and-poll mechanism rather than running arbitrary shell
/// code inside a signal handler.
pub fn install_default_handlers() {
    unsafe {
        libc::signal(libc::SIGINT, handle_sigint as usize);
        libc::signal(libc::SIGQUIT, libc::SIG_IGN);
        libc::signal(libc::SIGTTOU, libc::SIG_IGN);
        libc::signal(libc::SIGTTIN, libc::SIG_IGN);
    }
}

pub fn take_sigint() -> bool {
    SIGINT_RECEIVED.swap(false, Ordering::SeqCst)
}

/// Register (or clear, for an empty body) a trap for `condition`.
/// `"-"` restores the default action; spec §4.G.
pub fn set_trap(exec: &mut Executor, condition: &str, body: Option<&str>) -> ShellResult<()> {
    match body {
        Some(text) if !text.is_empty() => {
            exec.state.signal_handlers.insert(condition.to_string(), text.to_string());
            if let Some(sig) = signal_number(condition) {
                unsafe { libc::signal(sig, handle_sigint as usize) };
            }
        }
        _ => {
            exec.state.signal_handlers.remove(condition);
            if let Some(sig) = signal_number(condition) {
                unsafe { libc::signal(sig, libc::SIG_DFL) };
            }
        }
    }
    Ok(())
}

/// Run the trap registered for `condition`, if any, as a nested script
/// in the current shell state (traps share the caller's variables and
/// exit code per bash semantics). A no-op, not an error, when no trap
/// is registered — callers fire this unconditionally after every
/// command/loop/function boundary relevant to `condition`.
pub fn run_trap(exec: &mut Executor, condition: &str) -> ShellResult<()> {
    let Some(body) = exec.state.signal_handlers.get(condition).cloned() else { return Ok(()) };
    if body.is_empty() {
        return Ok(());
    }
    if TRAP_DEPTH.load(Ordering::SeqCst) >= MAX_TRAP_DEPTH {
        return Ok(());
    }
    TRAP_DEPTH.fetch_add(1, Ordering::SeqCst);
    let saved_exit_code = exec.state.last_exit_code;

    let script = crate::parser::parse_script(&body);
    let result = match script {
        Ok(script) => exec.execute_script(&script).map(|_| ()),
        Err(_) => Ok(()),
    };

    exec.state.last_exit_code = saved_exit_code;
    TRAP_DEPTH.fetch_sub(1, Ordering::SeqCst);

    match result {
        Err(ShellError::Exit(e)) => Err(ShellError::Exit(e)),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_sig_prefixed_and_bare_names() {
        assert_eq!(normalize_condition("SIGINT").as_deref(), Some("INT"));
        assert_eq!(normalize_condition("int").as_deref(), Some("INT"));
        assert_eq!(normalize_condition("EXIT").as_deref(), Some("EXIT"));
        assert_eq!(normalize_condition("nonsense"), None);
    }

    #[test]
    fn sigint_flag_round_trips() {
        assert!(!take_sigint());
        SIGINT_RECEIVED.store(true, Ordering::SeqCst);
        assert!(take_sigint());
        assert!(!take_sigint());
    }
}
