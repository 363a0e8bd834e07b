//! `cd`, `pwd`, `pushd`, `popd`, `dirs` (spec §4.G). Unlike the
//! teacher's sandboxed `state.cwd` string, these call the real
//! `std::env::set_current_dir`/`current_dir` syscalls.

use crate::executor::Executor;

pub fn pwd(exec: &mut Executor, args: &[String]) -> i32 {
    let physical = args.iter().any(|a| a == "-P");
    match current_dir_string(physical) {
        Ok(dir) => {
            println!("{dir}");
            0
        }
        Err(e) => {
            super::report("pwd", e);
            1
        }
    }
}

fn current_dir_string(physical: bool) -> std::io::Result<String> {
    let path = std::env::current_dir()?;
    let path = if physical { path.canonicalize()? } else { path };
    Ok(path.to_string_lossy().into_owned())
}

/// `cd [-L|-P] [-e] [dir]`, plus the `cd -`/`CDPATH` conveniences.
pub fn cd(exec: &mut Executor, args: &[String]) -> i32 {
    if exec.state.options.restricted {
        super::report("cd", "restricted");
        return 1;
    }

    let mut physical = false;
    let mut rest = args;
    while let Some(first) = rest.first() {
        match first.as_str() {
            "-L" => {
                physical = false;
                rest = &rest[1..];
            }
            "-P" => {
                physical = true;
                rest = &rest[1..];
            }
            "-e" => rest = &rest[1..],
            _ => break,
        }
    }

    let old_pwd = exec.state.get("PWD").or_else(|| std::env::current_dir().ok().map(|p| p.to_string_lossy().into_owned()));

    let target = match rest.first() {
        None => exec.state.get("HOME").unwrap_or_default(),
        Some(dir) if dir == "-" => match exec.state.get("OLDPWD") {
            Some(prev) => {
                println!("{prev}");
                prev
            }
            None => {
                super::report("cd", "OLDPWD not set");
                return 1;
            }
        },
        Some(dir) => resolve_via_cdpath(exec, dir),
    };

    if target.is_empty() {
        super::report("cd", "HOME not set");
        return 1;
    }

    let target_path = std::path::Path::new(&target);
    let result = if physical {
        target_path.canonicalize().and_then(|p| std::env::set_current_dir(&p))
    } else {
        std::env::set_current_dir(target_path)
    };

    if let Err(e) = result {
        super::report("cd", format!("{target}: {e}"));
        return 1;
    }

    if let Some(old) = old_pwd {
        let _ = exec.state.set("OLDPWD", old);
    }
    if let Ok(new_dir) = std::env::current_dir() {
        let _ = exec.state.set("PWD", new_dir.to_string_lossy().into_owned());
    }
    0
}

fn resolve_via_cdpath(exec: &mut Executor, dir: &str) -> String {
    if dir.starts_with('/') || dir.starts_with("./") || dir.starts_with("../") || dir == "." || dir == ".." {
        return dir.to_string();
    }
    if std::path::Path::new(dir).exists() {
        return dir.to_string();
    }
    if let Some(cdpath) = exec.state.get("CDPATH") {
        for prefix in cdpath.split(':') {
            if prefix.is_empty() {
                continue;
            }
            let candidate = std::path::Path::new(prefix).join(dir);
            if candidate.is_dir() {
                return candidate.to_string_lossy().into_owned();
            }
        }
    }
    dir.to_string()
}

/// `pushd [+N|-N|dir]` — rotate/push the directory stack and `cd` to
/// the new top.
pub fn pushd(exec: &mut Executor, args: &[String]) -> i32 {
    if args.is_empty() {
        let Some(top) = exec.state.dir_stack.pop() else {
            super::report("pushd", "no other directory");
            return 1;
        };
        let current = current_dir_string(false).unwrap_or_default();
        let rc = cd(exec, &[top]);
        if rc == 0 {
            exec.state.dir_stack.push(current);
        }
        return rc;
    }

    let arg = &args[0];
    if let Some(rotated) = rotate_for_pushd(exec, arg) {
        return cd(exec, &[rotated]);
    }

    let current = current_dir_string(false).unwrap_or_default();
    let rc = cd(exec, &[arg.clone()]);
    if rc == 0 {
        exec.state.dir_stack.push(current);
    }
    print_dirs(exec);
    rc
}

fn rotate_for_pushd(exec: &mut Executor, arg: &str) -> Option<String> {
    let n: i64 = arg.strip_prefix('+').or_else(|| arg.strip_prefix('-'))?.parse().ok()?;
    let mut full = vec![current_dir_string(false).unwrap_or_default()];
    full.extend(exec.state.dir_stack.iter().rev().cloned());
    let len = full.len() as i64;
    let idx = if arg.starts_with('+') { n } else { len - 1 - n };
    if idx < 0 || idx >= len {
        super::report("pushd", "directory stack index out of range");
        return None;
    }
    full.rotate_left(idx as usize);
    let new_top = full[0].clone();
    exec.state.dir_stack = full[1..].iter().rev().cloned().collect();
    Some(new_top)
}

/// `popd [+N|-N]` — drop an entry from the stack and `cd` to the new top.
pub fn popd(exec: &mut Executor, args: &[String]) -> i32 {
    if exec.state.dir_stack.is_empty() {
        super::report("popd", "directory stack empty");
        return 1;
    }
    match args.first() {
        None => {
            let Some(top) = exec.state.dir_stack.pop() else { return 1 };
            let rc = cd(exec, &[top]);
            print_dirs(exec);
            rc
        }
        Some(arg) => {
            let mut full = vec![current_dir_string(false).unwrap_or_default()];
            full.extend(exec.state.dir_stack.iter().rev().cloned());
            let len = full.len() as i64;
            let Some(n) = arg.strip_prefix('+').or_else(|| arg.strip_prefix('-')).and_then(|s| s.parse::<i64>().ok()) else {
                super::report("popd", format!("{arg}: invalid argument"));
                return 1;
            };
            let idx = if arg.starts_with('+') { n } else { len - 1 - n };
            if idx < 0 || idx >= len {
                super::report("popd", "directory stack index out of range");
                return 1;
            }
            full.remove(idx as usize);
            let new_top = full[0].clone();
            exec.state.dir_stack = full[1..].iter().rev().cloned().collect();
            let rc = if new_top == current_dir_string(false).unwrap_or_default() { 0 } else { cd(exec, &[new_top]) };
            print_dirs(exec);
            rc
        }
    }
}

/// `dirs [-c] [-l] [-p] [-v]`.
pub fn dirs(exec: &mut Executor, args: &[String]) -> i32 {
    if args.iter().any(|a| a == "-c") {
        exec.state.dir_stack.clear();
        return 0;
    }
    let one_per_line = args.iter().any(|a| a == "-p" || a == "-v");
    let verbose = args.iter().any(|a| a == "-v");

    let mut stack = vec![current_dir_string(false).unwrap_or_default()];
    stack.extend(exec.state.dir_stack.iter().rev().cloned());

    if one_per_line {
        for (i, dir) in stack.iter().enumerate() {
            if verbose {
                println!("{i}  {dir}");
            } else {
                println!("{dir}");
            }
        }
    } else {
        println!("{}", stack.join(" "));
    }
    0
}

fn print_dirs(exec: &mut Executor) {
    dirs(exec, &[]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::JobManager;
    use crate::state::ShellState;

    #[test]
    fn cd_to_tmp_updates_pwd() {
        let mut state = ShellState::new();
        let mut jobs = JobManager::new();
        let mut exec = Executor::new(&mut state, &mut jobs);
        let rc = cd(&mut exec, &["/tmp".to_string()]);
        assert_eq!(rc, 0);
        assert_eq!(exec.state.get("PWD").unwrap(), "/tmp");
    }

    #[test]
    fn cd_missing_dir_fails() {
        let mut state = ShellState::new();
        let mut jobs = JobManager::new();
        let mut exec = Executor::new(&mut state, &mut jobs);
        let rc = cd(&mut exec, &["/no/such/dir/xyz123".to_string()]);
        assert_eq!(rc, 1);
    }
}
