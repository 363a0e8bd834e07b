//! Control-flow and command-resolution builtins: `break`, `continue`,
//! `return`, `exit`, `eval`, `exec`, `command`, `builtin`, `.`/`source`.

use crate::dispatcher::{self, Resolution};
use crate::errors::{BreakSignal, ContinueSignal, ExitSignal, ReturnSignal, ShellError, ShellResult};
use crate::executor::Executor;

fn level_arg(args: &[String]) -> u32 {
    args.first().and_then(|s| s.parse::<u32>().ok()).filter(|&n| n > 0).unwrap_or(1)
}

pub fn break_cmd(args: &[String]) -> ShellResult<i32> {
    Err(ShellError::Break(BreakSignal { levels: level_arg(args) }))
}

pub fn continue_cmd(args: &[String]) -> ShellResult<i32> {
    Err(ShellError::Continue(ContinueSignal { levels: level_arg(args) }))
}

pub fn return_cmd(exec: &mut Executor, args: &[String]) -> ShellResult<i32> {
    let code = args.first().and_then(|s| s.parse::<i32>().ok()).unwrap_or(exec.state.last_exit_code);
    Err(ShellError::Return(ReturnSignal { exit_code: code }))
}

pub fn exit(exec: &mut Executor, args: &[String]) -> ShellResult<i32> {
    let code = args.first().and_then(|s| s.parse::<i32>().ok()).unwrap_or(exec.state.last_exit_code);
    Err(ShellError::Exit(ExitSignal { exit_code: code }))
}

/// `eval arg...` — join, reparse, and run in the current frame.
pub fn eval(exec: &mut Executor, args: &[String]) -> ShellResult<i32> {
    if args.is_empty() {
        return Ok(0);
    }
    let joined = args.join(" ");
    match crate::parser::parse_script(&joined) {
        Ok(script) => exec.execute_script(&script),
        Err(e) => {
            super::report("eval", e);
            Ok(1)
        }
    }
}

/// `exec [cmd args...]` — replace the process image; with no argument
/// it's a no-op other than the redirections the executor already
/// applied before dispatch (and which, for `exec`, stay in effect).
pub fn exec(exec: &mut Executor, args: &[String]) -> ShellResult<i32> {
    let Some(name) = args.first() else { return Ok(0) };
    match dispatcher::resolve(exec.state, name) {
        Ok(Resolution::External(path)) => exec.exec_replace(&path, &args[1..]),
        Ok(_) => {
            super::report("exec", format!("{name}: exec only replaces the process with an external program"));
            Ok(126)
        }
        Err(e) => {
            super::report("exec", &e);
            Ok(e.exit_code())
        }
    }
}

/// `command [-v|-V] name args...` — bypass function resolution; `-p`
/// (use the default PATH) is accepted but not separately modeled.
pub fn command(exec: &mut Executor, args: &[String]) -> ShellResult<i32> {
    let mut rest = args;
    let mut verbose = false;
    while let Some(first) = rest.first() {
        match first.as_str() {
            "-v" | "-V" => {
                verbose = true;
                rest = &rest[1..];
            }
            "-p" => rest = &rest[1..],
            _ => break,
        }
    }
    let Some(name) = rest.first() else { return Ok(0) };
    if verbose {
        match dispatcher::resolve_bypassing_functions(exec.state, name) {
            Ok(Resolution::External(p)) => println!("{}", p.display()),
            Ok(_) => println!("{name}"),
            Err(_) => return Ok(1),
        }
        return Ok(0);
    }
    match dispatcher::resolve_bypassing_functions(exec.state, name) {
        Ok(Resolution::SpecialBuiltin(n)) | Ok(Resolution::Builtin(n)) => super::dispatch(exec, &n, &rest[1..]),
        Ok(Resolution::External(path)) => run_external(exec, &path, &rest[1..]),
        Ok(Resolution::Function(_)) => unreachable!("bypassed above"),
        Err(e) => {
            super::report("command", &e);
            Ok(e.exit_code())
        }
    }
}

/// `builtin name args...` — run only if `name` is a builtin, ignoring
/// any same-named function.
pub fn builtin(exec: &mut Executor, args: &[String]) -> ShellResult<i32> {
    let Some(name) = args.first() else { return Ok(0) };
    if dispatcher::SPECIAL_BUILTINS.contains(&name.as_str()) || dispatcher::REGULAR_BUILTINS.contains(&name.as_str()) {
        super::dispatch(exec, name, &args[1..])
    } else {
        super::report("builtin", format!("{name}: not a shell builtin"));
        Ok(1)
    }
}

fn run_external(exec: &mut Executor, path: &std::path::Path, args: &[String]) -> ShellResult<i32> {
    // `command`'s external branch needs the same fork/exec/wait shape
    // as a normal dispatched simple command; reuse it through a
    // one-off pipeline-free command node would duplicate the executor,
    // so shell out to the same primitive it uses internally.
    exec.run_external_for_command(path, args)
}

/// `source`/`.` — read a file, parse it as a script, and execute it in
/// the current frame; extra args become temporary positional params
/// for the duration of the sourced file.
pub fn source(exec: &mut Executor, args: &[String]) -> ShellResult<i32> {
    let Some(path) = args.first() else {
        super::report("source", "filename argument required");
        return Ok(1);
    };
    let resolved = resolve_sourced_path(exec, path);
    let text = match std::fs::read_to_string(&resolved) {
        Ok(t) => t,
        Err(e) => {
            super::report("source", format!("{path}: {e}"));
            return Ok(1);
        }
    };
    let script = match crate::parser::parse_script(&text) {
        Ok(s) => s,
        Err(e) => {
            super::report("source", format!("{path}: {e}"));
            return Ok(1);
        }
    };

    let saved = exec.state.positional_params().to_vec();
    if args.len() > 1 {
        exec.state.set_positional_params(args[1..].to_vec());
    }
    let result = exec.execute_script(&script);
    exec.state.set_positional_params(saved);

    match result {
        Ok(code) => Ok(code),
        Err(ShellError::Return(r)) => Ok(r.exit_code),
        Err(e) => Err(e),
    }
}

fn resolve_sourced_path(exec: &mut Executor, name: &str) -> String {
    if name.contains('/') || std::path::Path::new(name).exists() {
        return name.to_string();
    }
    if exec.state.shopt.sourcepath {
        if let Some(path_var) = exec.state.get("PATH") {
            for dir in path_var.split(':') {
                let candidate = std::path::Path::new(dir).join(name);
                if candidate.exists() {
                    return candidate.to_string_lossy().into_owned();
                }
            }
        }
    }
    name.to_string()
}
