//! `declare`/`typeset`/`local`, `readonly`, `export`, `unset`, `let`,
//! `shift` (spec §4.G).

use crate::errors::ShellResult;
use crate::executor::Executor;
use crate::state::variables::Variable;

/// `declare`/`typeset [-aAilurxnfp] [name[=value]...]`; `local` reuses
/// this with `is_local` set so assignment goes through
/// `ShellState::declare_local` instead of the global/current scope.
pub fn declare(exec: &mut Executor, args: &[String], is_local: bool) -> i32 {
    let mut print_only = false;
    let mut make_array = false;
    let mut make_assoc = false;
    let mut make_integer = false;
    let mut make_readonly = false;
    let mut make_exported = false;
    let mut unset_flags = false;
    let mut case: Option<bool> = None;
    let mut rest = args;

    while let Some(first) = rest.first() {
        if !first.starts_with('-') && !first.starts_with('+') || first == "-" || first == "--" {
            break;
        }
        let negate = first.starts_with('+');
        for ch in first[1..].chars() {
            match ch {
                'a' => make_array = true,
                'A' => make_assoc = true,
                'i' => make_integer = true,
                'r' => make_readonly = true,
                'x' => make_exported = true,
                'u' => case = Some(true),
                'l' => case = Some(false),
                'n' => {}
                'p' => print_only = true,
                'f' => {}
                _ => {}
            }
        }
        if negate {
            unset_flags = true;
        }
        rest = &rest[1..];
    }

    if print_only || rest.is_empty() {
        for name in exec.state.all_variable_names() {
            if rest.is_empty() || rest.iter().any(|n| n == &name) {
                if let Some(value) = exec.state.get(&name) {
                    println!("declare -- {name}=\"{value}\"");
                }
            }
        }
        return 0;
    }

    for arg in rest {
        let (name, value) = super::split_name_value(arg);
        if make_array {
            let arr = crate::state::arrays::IndexedArray::from_values(
                value.map(|v| v.split(' ').map(str::to_string).collect::<Vec<_>>()).unwrap_or_default(),
            );
            if declare_var(exec, name, is_local, Variable::indexed(arr)).is_err() {
                return 1;
            }
            continue;
        }
        if make_assoc {
            let assoc = crate::state::arrays::AssocArray::new();
            if declare_var(exec, name, is_local, Variable::assoc(assoc)).is_err() {
                return 1;
            }
            continue;
        }
        if let Some(v) = value {
            if declare_var(exec, name, is_local, Variable::scalar(v)).is_err() {
                return 1;
            }
        } else if is_local {
            if declare_var(exec, name, true, Variable::scalar("")).is_err() {
                return 1;
            }
        } else if !exec.state.is_set(name) {
            let _ = exec.state.set(name, "");
        }

        if make_integer {
            exec.state.set_integer_attr(name, !unset_flags);
        }
        if make_readonly {
            exec.state.set_readonly(name);
        }
        if make_exported {
            exec.state.set_exported(name, !unset_flags);
        }
        if let Some(upper) = case {
            exec.state.set_case_attr(name, upper);
        }
    }
    0
}

fn declare_var(exec: &mut Executor, name: &str, is_local: bool, var: Variable) -> Result<(), ()> {
    let result = if is_local { exec.state.declare_local(name, var) } else { exec.state.set(name, var.value.as_scalar()) };
    result.map_err(|e| {
        super::report("declare", e);
    })
}

pub fn readonly(exec: &mut Executor, args: &[String]) -> i32 {
    if args.is_empty() || args == ["-p"] {
        for name in exec.state.all_variable_names() {
            if exec.state.is_readonly(&name) {
                println!("readonly {name}");
            }
        }
        return 0;
    }
    for arg in args {
        if arg == "-p" {
            continue;
        }
        let (name, value) = super::split_name_value(arg);
        if let Some(v) = value {
            if let Err(e) = exec.state.set(name, v) {
                super::report("readonly", e);
                return 1;
            }
        }
        exec.state.set_readonly(name);
    }
    0
}

pub fn export(exec: &mut Executor, args: &[String]) -> i32 {
    if args.is_empty() || args == ["-p"] {
        for name in exec.state.all_variable_names() {
            if exec.state.is_exported(&name) {
                println!("declare -x {name}");
            }
        }
        return 0;
    }
    let mut mark = true;
    for arg in args {
        if arg == "-n" {
            mark = false;
            continue;
        }
        if arg == "-p" {
            continue;
        }
        let (name, value) = super::split_name_value(arg);
        if let Some(v) = value {
            if let Err(e) = exec.state.set(name, v) {
                super::report("export", e);
                return 1;
            }
        }
        exec.state.set_exported(name, mark);
    }
    0
}

pub fn unset(exec: &mut Executor, args: &[String]) -> i32 {
    let mut function_only = false;
    let mut rest = args;
    while let Some(first) = rest.first() {
        match first.as_str() {
            "-v" => rest = &rest[1..],
            "-f" => {
                function_only = true;
                rest = &rest[1..];
            }
            _ => break,
        }
    }
    let mut rc = 0;
    for name in rest {
        if function_only {
            exec.state.functions.remove(name);
            continue;
        }
        if let Err(e) = exec.state.unset(name) {
            super::report("unset", e);
            rc = 1;
        }
    }
    rc
}

/// `let expr...` — the teacher's `let_cmd.rs` joins comma/space
/// separated arguments back into balanced expressions before
/// evaluating; kept here since shell arithmetic already tokenizes on
/// whitespace and would otherwise split `a + b` across argv entries.
pub fn let_cmd(exec: &mut Executor, args: &[String]) -> i32 {
    if args.is_empty() {
        super::report("let", "expression expected");
        return 2;
    }
    let mut last = 0i64;
    for raw in args {
        for expr in split_balanced_commas(raw) {
            let parsed = match crate::arithmetic::parse(&expr) {
                Ok(p) => p,
                Err(e) => {
                    super::report("let", e);
                    return 2;
                }
            };
            match exec.eval_arith(&parsed) {
                Ok(v) => last = v,
                Err(e) => {
                    super::report("let", e);
                    return 2;
                }
            }
        }
    }
    if last == 0 {
        1
    } else {
        0
    }
}

fn split_balanced_commas(expr: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for ch in expr.chars() {
        match ch {
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth -= 1;
                current.push(ch);
            }
            ',' if depth == 0 => {
                out.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

pub fn shift(exec: &mut Executor, args: &[String]) -> ShellResult<i32> {
    let n: usize = args.first().and_then(|s| s.parse().ok()).unwrap_or(1);
    match exec.state.shift_positional(n) {
        Ok(()) => Ok(0),
        Err(_) => Ok(1),
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
    fn declare_sets_scalar() {
        with_exec(|e| {
            assert_eq!(declare(e, &["FOO=bar".to_string()], false), 0);
            assert_eq!(e.state.get("FOO").unwrap(), "bar");
        });
    }

    #[test]
    fn readonly_blocks_further_writes() {
        with_exec(|e| {
            assert_eq!(readonly(e, &["FOO=bar".to_string()]), 0);
            assert!(e.state.set("FOO", "baz").is_err());
        });
    }

    #[test]
    fn let_returns_false_for_zero() {
        with_exec(|e| {
            assert_eq!(let_cmd(e, &["0".to_string()]), 1);
            assert_eq!(let_cmd(e, &["1".to_string()]), 0);
        });
    }

    #[test]
    fn split_balanced_commas_respects_parens() {
        let parts = split_balanced_commas("a=(1,2), b=3");
        assert_eq!(parts, vec!["a=(1,2)", " b=3"]);
    }
}
