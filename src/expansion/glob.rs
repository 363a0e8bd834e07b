//! Pathname (glob) expansion, spec §4.C E5.

use glob::{glob_with, MatchOptions};

use crate::state::ShellState;

const GLOB_META: &[char] = &['*', '?', '['];

pub fn has_glob_metachars(field: &str) -> bool {
    field.chars().any(|c| GLOB_META.contains(&c))
}

pub enum GlobOutcome {
    /// Pattern had no metacharacters, or glob found no match and the
    /// default (non-nullglob, non-failglob) behavior applies.
    Literal(String),
    Expanded(Vec<String>),
    /// `failglob` with zero matches — caller aborts the command.
    Failed(String),
}

/// Expand one field against the filesystem. `noglob`/`[[`/`-v` suppression
/// is the caller's responsibility (spec §4.C E5 last paragraph).
pub fn expand_pathname(state: &ShellState, field: &str) -> GlobOutcome {
    if !has_glob_metachars(field) {
        return GlobOutcome::Literal(field.to_string());
    }

    let options = MatchOptions {
        case_sensitive: !state.shopt.nocaseglob,
        require_literal_separator: !state.shopt.globstar,
        require_literal_leading_dot: !state.shopt.dotglob,
    };

    let mut matches: Vec<String> = match glob_with(field, options) {
        Ok(paths) => paths.filter_map(Result::ok).map(|p| p.to_string_lossy().into_owned()).collect(),
        Err(_) => Vec::new(),
    };
    matches.sort();

    if matches.is_empty() {
        if state.shopt.failglob {
            return GlobOutcome::Failed(field.to_string());
        }
        if state.shopt.nullglob {
            return GlobOutcome::Expanded(Vec::new());
        }
        return GlobOutcome::Literal(field.to_string());
    }

    GlobOutcome::Expanded(matches)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_metachars_is_literal() {
        assert!(matches!(expand_pathname(&ShellState::new(), "plain.txt"), GlobOutcome::Literal(s) if s == "plain.txt"));
    }

    #[test]
    fn detects_metachars() {
        assert!(has_glob_metachars("*.rs"));
        assert!(has_glob_metachars("file?.txt"));
        assert!(has_glob_metachars("[abc]"));
        assert!(!has_glob_metachars("plain"));
    }
}
