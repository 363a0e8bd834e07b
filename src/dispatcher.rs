//! Dispatcher (spec §4.F, component F).
//!
//! Given a command name, decides whether it runs as a special
//! builtin, a user function, a regular builtin, or an external
//! program — in exactly that order (spec §4.F). External lookups are
//! cached in `ShellState::hash_table`, invalidated by `hash -r` and by
//! any write to `PATH` (`ShellState::run_env_hook`), the same split
//! the teacher's `command_resolution` module documents for its own
//! (purely virtual) PATH search.

use std::path::{Path, PathBuf};

use crate::errors::ShellError;
use crate::state::ShellState;

pub const DEFAULT_PATH: &str = "/usr/bin:/bin";

/// Builtins that win over same-named functions and aliases — spec
/// §4.F "special builtins" are consulted before user functions.
pub const SPECIAL_BUILTINS: &[&str] = &[
    "break", "continue", "eval", "exec", "exit", "export", "readonly",
    "return", "set", "shift", "trap", "unset", ":", ".", "source",
];

/// The ~60-entry regular builtin set (spec §4.G). Anything not in
/// this list or `SPECIAL_BUILTINS` falls through to PATH search.
pub const REGULAR_BUILTINS: &[&str] = &[
    "alias", "unalias", "bg", "fg", "jobs", "wait", "kill", "disown",
    "cd", "pwd", "pushd", "popd", "dirs", "declare", "typeset", "local",
    "let", "test", "[", "[[", "read", "printf", "echo", "true", "false",
    "command", "builtin", "hash", "type", "trap", "history", "mapfile",
    "readarray", "shopt", "getopts", "complete", "compgen", "compopt",
    "umask", "ulimit", "times", "ttyc", "enable", "help", "logout",
    "suspend", "caller",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Matched a special builtin name; the builtin library still
    /// implements the behavior, this only affects resolution order.
    SpecialBuiltin(String),
    Function(String),
    Builtin(String),
    External(PathBuf),
}

/// Resolve `name` per spec §4.F's exact order: special builtins →
/// functions → (aliases already applied upstream) → regular builtins
/// → PATH search.
pub fn resolve(state: &mut ShellState, name: &str) -> Result<Resolution, ShellError> {
    if name.contains('/') {
        let path = PathBuf::from(name);
        return if is_executable(&path) {
            Ok(Resolution::External(path))
        } else if path.exists() {
            Err(ShellError::PermissionDenied(name.to_string()))
        } else {
            Err(ShellError::CommandNotFound(name.to_string()))
        };
    }

    if SPECIAL_BUILTINS.contains(&name) {
        return Ok(Resolution::SpecialBuiltin(name.to_string()));
    }
    if state.functions.contains_key(name) {
        return Ok(Resolution::Function(name.to_string()));
    }
    if REGULAR_BUILTINS.contains(&name) {
        return Ok(Resolution::Builtin(name.to_string()));
    }
    search_path(state, name)
}

/// Same order as `resolve` but skips the function table — what the
/// `command` builtin needs (spec §4.G "bypass functions").
pub fn resolve_bypassing_functions(state: &mut ShellState, name: &str) -> Result<Resolution, ShellError> {
    if name.contains('/') {
        return resolve(state, name);
    }
    if SPECIAL_BUILTINS.contains(&name) {
        return Ok(Resolution::SpecialBuiltin(name.to_string()));
    }
    if REGULAR_BUILTINS.contains(&name) {
        return Ok(Resolution::Builtin(name.to_string()));
    }
    search_path(state, name)
}

fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    match std::fs::metadata(path) {
        Ok(meta) => meta.is_file() && meta.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}

/// Search `PATH`, consulting/populating `state.hash_table` (spec §4.F
/// "A cache maps command name → absolute path").
fn search_path(state: &mut ShellState, name: &str) -> Result<Resolution, ShellError> {
    if state.options.hashall {
        if let Some(cached) = state.hash_table.get(name) {
            let path = PathBuf::from(cached);
            if is_executable(&path) {
                return Ok(Resolution::External(path));
            }
            state.hash_table.remove(name);
        }
    }

    let path_var = state.get("PATH").unwrap_or_else(|| DEFAULT_PATH.to_string());
    let mut seen_any = false;
    for dir in path_var.split(':') {
        let dir = if dir.is_empty() { "." } else { dir };
        let candidate = Path::new(dir).join(name);
        if candidate.exists() {
            seen_any = true;
            if is_executable(&candidate) {
                if state.options.hashall {
                    state.hash_table.insert(name.to_string(), candidate.to_string_lossy().into_owned());
                }
                return Ok(Resolution::External(candidate));
            }
        }
    }

    if seen_any {
        Err(ShellError::PermissionDenied(name.to_string()))
    } else {
        Err(ShellError::CommandNotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_special_builtin_before_function() {
        let mut state = ShellState::new();
        assert_eq!(resolve(&mut state, "exit").unwrap(), Resolution::SpecialBuiltin("exit".to_string()));
    }

    #[test]
    fn resolves_external_via_path() {
        let mut state = ShellState::new();
        state.set("PATH", "/bin:/usr/bin").unwrap();
        let resolved = resolve(&mut state, "ls");
        assert!(matches!(resolved, Ok(Resolution::External(_)) | Err(ShellError::CommandNotFound(_))));
    }

    #[test]
    fn unknown_command_not_found() {
        let mut state = ShellState::new();
        state.set("PATH", "/nonexistent_dir_xyz").unwrap();
        assert!(matches!(resolve(&mut state, "definitely_not_a_command_xyz"), Err(ShellError::CommandNotFound(_))));
    }
}
