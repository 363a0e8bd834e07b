//! `test` / `[` (spec §4.G). `[[ ... ]]` is ordinarily parsed straight
//! into a `ConditionalCommandNode` and never reaches here, but the
//! dispatcher still lists it as a regular builtin name (e.g. for
//! `type`), so this also accepts plain test syntax for it as a fallback.

use crate::executor::Executor;

/// Returns the POSIX exit code: 0 true, 1 false, 2 on a malformed
/// expression.
pub fn test(exec: &mut Executor, args: &[String], strip_closing_bracket: bool) -> i32 {
    let mut args = args;
    if strip_closing_bracket {
        match args.last() {
            Some(last) if last == "]" => args = &args[..args.len() - 1],
            _ => {
                super::report("[", "missing `]'");
                return 2;
            }
        }
    }
    match eval_expr(exec, args) {
        Some(true) => 0,
        Some(false) => 1,
        None => {
            super::report("test", "malformed expression");
            2
        }
    }
}

fn eval_expr(exec: &mut Executor, args: &[String]) -> Option<bool> {
    match args.len() {
        0 => Some(false),
        1 => Some(!args[0].is_empty()),
        2 => eval_unary(exec, &args[0], &args[1]),
        3 => eval_triple(exec, args),
        4 if args[0] == "!" => eval_expr(exec, &args[1..]).map(|b| !b),
        _ => eval_fallback(exec, args),
    }
}

fn eval_fallback(exec: &mut Executor, args: &[String]) -> Option<bool> {
    // `-a`/`-o` conjunctions over longer argument lists; scanned left
    // to right at the lowest precedence the classic test(1) grammar
    // supports (no parenthesization here, matching the simplified
    // subset most scripts rely on).
    if let Some(pos) = args.iter().position(|a| a == "-o") {
        let left = eval_expr(exec, &args[..pos])?;
        let right = eval_expr(exec, &args[pos + 1..])?;
        return Some(left || right);
    }
    if let Some(pos) = args.iter().position(|a| a == "-a") {
        let left = eval_expr(exec, &args[..pos])?;
        let right = eval_expr(exec, &args[pos + 1..])?;
        return Some(left && right);
    }
    None
}

fn eval_unary(exec: &mut Executor, op: &str, operand: &str) -> Option<bool> {
    if op == "!" {
        return Some(operand.is_empty());
    }
    Some(match op {
        "-z" => operand.is_empty(),
        "-n" => !operand.is_empty(),
        "-e" => std::path::Path::new(operand).exists(),
        "-f" => std::path::Path::new(operand).is_file(),
        "-d" => std::path::Path::new(operand).is_dir(),
        "-L" | "-h" => std::fs::symlink_metadata(operand).map(|m| m.file_type().is_symlink()).unwrap_or(false),
        "-s" => std::fs::metadata(operand).map(|m| m.len() > 0).unwrap_or(false),
        "-r" => access(operand, libc::R_OK),
        "-w" => access(operand, libc::W_OK),
        "-x" => access(operand, libc::X_OK),
        "-p" => file_type_is(operand, libc::S_IFIFO),
        "-S" => file_type_is(operand, libc::S_IFSOCK),
        "-b" => file_type_is(operand, libc::S_IFBLK),
        "-c" => file_type_is(operand, libc::S_IFCHR),
        "-u" => mode_has(operand, libc::S_ISUID),
        "-g" => mode_has(operand, libc::S_ISGID),
        "-k" => mode_has(operand, libc::S_ISVTX),
        "-t" => operand.parse::<i32>().map(|fd| unsafe { libc::isatty(fd) == 1 }).unwrap_or(false),
        "-o" => exec.state.options.get_by_name(operand).unwrap_or(false),
        "-v" => exec.state.is_set(operand),
        _ => return None,
    })
}

fn eval_triple(exec: &mut Executor, args: &[String]) -> Option<bool> {
    if args[0] == "!" {
        return eval_expr(exec, &args[1..]).map(|b| !b);
    }
    let (left, op, right) = (&args[0], args[1].as_str(), &args[2]);
    Some(match op {
        "=" | "==" => left == right,
        "!=" => left != right,
        "<" => left < right,
        ">" => left > right,
        "-eq" => parse_int(left) == parse_int(right),
        "-ne" => parse_int(left) != parse_int(right),
        "-lt" => parse_int(left) < parse_int(right),
        "-le" => parse_int(left) <= parse_int(right),
        "-gt" => parse_int(left) > parse_int(right),
        "-ge" => parse_int(left) >= parse_int(right),
        "-nt" => mtime(left) > mtime(right),
        "-ot" => mtime(left) < mtime(right),
        "-ef" => same_file(left, right),
        _ => {
            let _ = exec;
            return None;
        }
    })
}

fn parse_int(s: &str) -> i64 {
    crate::arithmetic::parse_integer_literal(s.trim()).unwrap_or(0)
}

fn access(path: &str, mode: i32) -> bool {
    let Ok(c_path) = std::ffi::CString::new(path) else { return false };
    unsafe { libc::access(c_path.as_ptr(), mode) == 0 }
}

fn mode(path: &str) -> Option<libc::mode_t> {
    use std::os::unix::fs::MetadataExt;
    std::fs::metadata(path).ok().map(|m| m.mode() as libc::mode_t)
}

fn file_type_is(path: &str, expected: libc::mode_t) -> bool {
    mode(path).map(|m| m & libc::S_IFMT == expected).unwrap_or(false)
}

fn mode_has(path: &str, bit: libc::mode_t) -> bool {
    mode(path).map(|m| m & bit != 0).unwrap_or(false)
}

fn mtime(path: &str) -> std::time::SystemTime {
    std::fs::metadata(path).and_then(|m| m.modified()).unwrap_or(std::time::UNIX_EPOCH)
}

fn same_file(a: &str, b: &str) -> bool {
    use std::os::unix::fs::MetadataExt;
    match (std::fs::metadata(a), std::fs::metadata(b)) {
        (Ok(ma), Ok(mb)) => ma.dev() == mb.dev() && ma.ino() == mb.ino(),
        _ => false,
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
    fn string_equality() {
        let args = vec!["abc".to_string(), "=".to_string(), "abc".to_string()];
        assert_eq!(with_exec(|e| test(e, &args, false)), 0);
    }

    #[test]
    fn numeric_comparison() {
        let args = vec!["3".to_string(), "-lt".to_string(), "5".to_string()];
        assert_eq!(with_exec(|e| test(e, &args, false)), 0);
        let args = vec!["5".to_string(), "-lt".to_string(), "3".to_string()];
        assert_eq!(with_exec(|e| test(e, &args, false)), 1);
    }

    #[test]
    fn negation_and_string_empty() {
        let args = vec!["-z".to_string(), "".to_string()];
        assert_eq!(with_exec(|e| test(e, &args, false)), 0);
    }
}
