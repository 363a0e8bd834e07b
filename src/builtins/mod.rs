//! Builtin library (spec §4.G, component G).
//!
//! Every builtin is a function of `(Executor, &[String]) -> exit
//! code`, operating on arguments already expanded by
//! `Executor::expand_simple_command`. This mirrors the teacher's
//! `builtin_dispatch` table shape, minus the captured-stdout/stderr
//! plumbing a sandboxed interpreter needs — builtins here write
//! straight to the real fds the executor already wired up.

mod array_cmd;
mod control;
mod dir_stack;
mod io;
mod jobs_cmd;
mod misc;
mod shopt_cmd;
mod test_cmd;
mod trap_cmd;
mod vars;

use crate::errors::{ShellError, ShellResult};
use crate::executor::Executor;

/// Route an already-resolved builtin name to its handler (spec §4.F
/// dispatcher hands both special and regular builtins here; this is
/// the one place that needs to recognize both sets by name).
pub fn dispatch(exec: &mut Executor, name: &str, args: &[String]) -> ShellResult<i32> {
    match name {
        ":" => Ok(0),
        "true" => Ok(0),
        "false" => Ok(1),
        "echo" => Ok(io::echo(exec, args)),
        "printf" => io::printf(exec, args),
        "read" => io::read(exec, args),
        "pwd" => Ok(dir_stack::pwd(exec, args)),
        "cd" => Ok(dir_stack::cd(exec, args)),
        "pushd" => Ok(dir_stack::pushd(exec, args)),
        "popd" => Ok(dir_stack::popd(exec, args)),
        "dirs" => Ok(dir_stack::dirs(exec, args)),
        "declare" | "typeset" => Ok(vars::declare(exec, args, false)),
        "local" => Ok(vars::declare(exec, args, true)),
        "readonly" => Ok(vars::readonly(exec, args)),
        "export" => Ok(vars::export(exec, args)),
        "unset" => Ok(vars::unset(exec, args)),
        "let" => Ok(vars::let_cmd(exec, args)),
        "shift" => vars::shift(exec, args),
        "test" | "[" | "[[" => Ok(test_cmd::test(exec, args, name == "[")),
        "trap" => Ok(trap_cmd::trap(exec, args)),
        "jobs" => Ok(jobs_cmd::jobs(exec, args)),
        "fg" => jobs_cmd::fg(exec, args),
        "bg" => Ok(jobs_cmd::bg(exec, args)),
        "wait" => Ok(jobs_cmd::wait(exec, args)),
        "kill" => Ok(jobs_cmd::kill(exec, args)),
        "disown" => Ok(jobs_cmd::disown(exec, args)),
        "mapfile" | "readarray" => Ok(array_cmd::mapfile(exec, args)),
        "shopt" => Ok(shopt_cmd::shopt(exec, args)),
        "set" => Ok(shopt_cmd::set(exec, args)),
        "alias" => Ok(misc::alias(exec, args)),
        "unalias" => Ok(misc::unalias(exec, args)),
        "hash" => Ok(misc::hash(exec, args)),
        "type" => Ok(misc::type_cmd(exec, args)),
        "history" => Ok(misc::history(exec, args)),
        "getopts" => Ok(misc::getopts(exec, args)),
        "complete" | "compgen" | "compopt" => Ok(misc::completion_stub(exec, name, args)),
        "umask" => Ok(misc::umask(exec, args)),
        "ulimit" => Ok(misc::ulimit(exec, args)),
        "times" => Ok(misc::times(exec, args)),
        "ttyc" => Ok(0),
        "enable" => Ok(misc::enable(exec, args)),
        "help" => Ok(misc::help(exec, args)),
        "logout" | "exit" => control::exit(exec, args),
        "suspend" => Ok(misc::suspend(exec, args)),
        "caller" => Ok(misc::caller(exec, args)),
        "break" => control::break_cmd(args),
        "continue" => control::continue_cmd(args),
        "return" => control::return_cmd(exec, args),
        "eval" => control::eval(exec, args),
        "exec" => control::exec(exec, args),
        "command" => control::command(exec, args),
        "builtin" => control::builtin(exec, args),
        "." | "source" => control::source(exec, args),
        _ => Err(ShellError::CommandNotFound(name.to_string())),
    }
}

/// `den: name: message` — the per-builtin error prefix spec §7 expects.
pub(crate) fn report(builtin: &str, message: impl std::fmt::Display) {
    eprintln!("den: {builtin}: {message}");
}

/// Pull a single leading `NAME=value` out of an arg, used by
/// `declare`/`export`/`readonly`/`local` which accept either a bare
/// name or a name with an attached assignment.
pub(crate) fn split_name_value(arg: &str) -> (&str, Option<&str>) {
    match arg.split_once('=') {
        Some((name, value)) => (name, Some(value)),
        None => (arg, None),
    }
}
