//! Executor (spec §4.H, component H).
//!
//! Walks a `ScriptNode`, dispatching each command through the
//! Dispatcher and applying the sequencing/pipeline/redirection rules
//! of spec §4.H. Unlike the teacher (`just-bash`), which captures
//! stdout/stderr into `String` buffers over a virtual filesystem, Den
//! talks to the real OS: pipelines fork real children wired together
//! with real pipes, subshells and command/process substitution get
//! their isolation for free from `fork`'s copy-on-write semantics
//! instead of a hand-rolled state snapshot, and external commands are
//! `execve`'d for real (spec §1 Non-goals: no sandboxing).

pub mod compound;
pub mod redirect;

use std::ffi::CString;

use crate::ast::*;
use crate::dispatcher::{self, Resolution};
use crate::errors::{ExpansionError, ShellError, ShellResult};
use crate::expansion::{self, CommandSubstitutionRunner};
use crate::jobs::{exit_code_from_status, JobManager};
use crate::state::functions::CallFrame;
use crate::state::ShellState;
use crate::{builtins, signals};

/// A simple command after E1-E5 expansion: a bare name/argv pair plus
/// the redirections it still needs applied (spec §3 `ParsedCommand`).
pub struct ExpandedCommand {
    pub name: String,
    pub args: Vec<String>,
    pub redirections: Vec<RedirectionNode>,
}

/// Ties state + job table together for one evaluation pass. Built
/// fresh per top-level input by `Shell`, and recursively for command
/// substitution/subshells/function bodies within the same process (or
/// a forked copy of it).
pub struct Executor<'a> {
    pub state: &'a mut ShellState,
    pub jobs: &'a mut JobManager,
}

/// Implements `CommandSubstitutionRunner` over just the job table, not
/// `ShellState` — `expand_word_fields`/`apply_redirections` take state
/// and runner as two separate arguments, and `Executor` would have to
/// lend the same `self` out twice (once as `self.state`, once as the
/// runner trait object) to satisfy that signature directly. Borrowing
/// `self.state` and `self.jobs` as disjoint fields instead lets both
/// borrows coexist.
struct SubstitutionRunner<'a> {
    jobs: &'a mut JobManager,
}

impl<'a> CommandSubstitutionRunner for SubstitutionRunner<'a> {
    fn capture_output(&mut self, state: &mut ShellState, body: &ScriptNode) -> ShellResult<String> {
        run_capture(state, body)
    }

    fn start_process_substitution(
        &mut self,
        state: &mut ShellState,
        body: &ScriptNode,
        direction: ProcessDirection,
    ) -> ShellResult<String> {
        run_process_substitution(self.jobs, state, body, direction)
    }
}

/// Where a loop/statement currently is relative to `errexit`: some
/// contexts (the condition of `if`/`while`/`until`, the left side of
/// `&&`/`||`) suppress `errexit` for their own nonzero status (spec
/// §7 "if `errexit` is on and the error is not inside a conditional
/// context").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrexitContext {
    Normal,
    Suppressed,
}

impl<'a> Executor<'a> {
    pub fn new(state: &'a mut ShellState, jobs: &'a mut JobManager) -> Self {
        Self { state, jobs }
    }

    // ------------------------------------------------------------------
    // Script / statement level
    // ------------------------------------------------------------------

    /// Execute every statement in `script`, honoring `errexit`/signals,
    /// returning the last exit code. `ExitSignal` always propagates to
    /// the caller (it means the process, or the sourced file, is
    /// unwinding); stray `break`/`continue`/`return` outside a
    /// loop/function are reported and swallowed, matching bash.
    pub fn execute_script(&mut self, script: &ScriptNode) -> ShellResult<i32> {
        let mut code = self.state.last_exit_code;
        for stmt in &script.statements {
            match self.execute_statement(stmt, ErrexitContext::Normal) {
                Ok(c) => code = c,
                Err(ShellError::Break(_)) => {
                    crate::errors::report("break", "only meaningful in a `for', `while', or `until' loop");
                    code = 1;
                }
                Err(ShellError::Continue(_)) => {
                    crate::errors::report("continue", "only meaningful in a `for', `while', or `until' loop");
                    code = 1;
                }
                Err(e @ ShellError::Return(_)) | Err(e @ ShellError::Exit(_)) => return Err(e),
                Err(e) => {
                    self.report_and_maybe_errexit(&e)?;
                    code = e.exit_code();
                }
            }
            self.state.last_exit_code = code;
            self.jobs.check_completed();
        }
        Ok(code)
    }

    fn report_and_maybe_errexit(&mut self, err: &ShellError) -> ShellResult<()> {
        crate::errors::report("", err);
        if self.state.options.errtrace && err.exit_code() != 0 {
            let _ = signals::run_trap(self, "ERR");
        }
        if self.state.options.errexit {
            return Err(ShellError::Exit(crate::errors::ExitSignal { exit_code: err.exit_code() }));
        }
        Ok(())
    }

    /// Execute one `a && b || c ; d`-shaped statement list joined by
    /// `&&`/`||` (spec §4.H step 1), optionally backgrounding the
    /// whole chain.
    pub fn execute_statement(&mut self, stmt: &StatementNode, ctx: ErrexitContext) -> ShellResult<i32> {
        if stmt.background {
            return self.run_in_background(stmt);
        }

        let mut last = 0;
        for (i, pipeline) in stmt.pipelines.iter().enumerate() {
            if i > 0 {
                let skip = match stmt.operators[i - 1] {
                    StatementOperator::And => last != 0,
                    StatementOperator::Or => last == 0,
                };
                if skip {
                    continue;
                }
            }
            let sub_ctx = if stmt.pipelines.len() > 1 { ErrexitContext::Suppressed } else { ctx };
            last = self.execute_pipeline(pipeline, sub_ctx)?;
        }
        self.state.last_exit_code = last;
        Ok(last)
    }

    fn run_in_background(&mut self, stmt: &StatementNode) -> ShellResult<i32> {
        let command_text = describe_statement(stmt);
        match unsafe { libc::fork() } {
            0 => {
                unsafe {
                    libc::setpgid(0, 0);
                }
                let mut child_stmt = stmt.clone();
                child_stmt.background = false;
                let code = match self.execute_statement(&child_stmt, ErrexitContext::Normal) {
                    Ok(c) => c,
                    Err(e) => e.exit_code(),
                };
                unsafe { libc::_exit(code) };
            }
            pid if pid > 0 => {
                unsafe {
                    libc::setpgid(pid, pid);
                }
                self.jobs.add(vec![pid], pid, command_text);
                self.state.last_exit_code = 0;
                Ok(0)
            }
            _ => Err(ShellError::Runtime(crate::errors::RuntimeError::JobControl(
                "fork failed".to_string(),
            ))),
        }
    }

    // ------------------------------------------------------------------
    // Pipelines
    // ------------------------------------------------------------------

    /// A maximal `|` run (spec §4.H step 2). Single-command pipelines
    /// whose command is a builtin/function/compound run in-process
    /// (no fork); everything else forks.
    pub fn execute_pipeline(&mut self, pipeline: &PipelineNode, ctx: ErrexitContext) -> ShellResult<i32> {
        let raw = if pipeline.commands.len() == 1 && !self.pipeline_stage_needs_fork(&pipeline.commands[0])? {
            self.execute_command_inprocess(&pipeline.commands[0], ctx)?
        } else {
            self.execute_forked_pipeline(pipeline)?
        };
        let code = if pipeline.negated { i32::from(raw == 0) } else { raw };
        self.state.last_exit_code = code;
        Ok(code)
    }

    /// True when `cmd` must run in a forked child even as a
    /// single-stage pipeline — i.e. it resolves to an external program.
    fn pipeline_stage_needs_fork(&mut self, cmd: &CommandNode) -> ShellResult<bool> {
        match cmd {
            CommandNode::Simple(simple) => {
                let Some(name_word) = &simple.name else { return Ok(false) };
                let Some(literal) = plain_literal(name_word) else { return Ok(false) };
                Ok(matches!(dispatcher::resolve(self.state, &literal), Ok(Resolution::External(_))))
            }
            CommandNode::Compound(_) | CommandNode::FunctionDef(_) => Ok(false),
        }
    }

    fn execute_forked_pipeline(&mut self, pipeline: &PipelineNode) -> ShellResult<i32> {
        let n = pipeline.commands.len();
        let mut pipe_fds: Vec<(i32, i32)> = Vec::with_capacity(n.saturating_sub(1));
        for _ in 0..n.saturating_sub(1) {
            let mut fds = [0i32; 2];
            if unsafe { libc::pipe(fds.as_mut_ptr()) } < 0 {
                return Err(ShellError::Runtime(crate::errors::RuntimeError::JobControl("pipe failed".to_string())));
            }
            pipe_fds.push((fds[0], fds[1]));
        }

        let mut pids = Vec::with_capacity(n);
        let mut pgid = 0i32;

        for (i, cmd) in pipeline.commands.iter().enumerate() {
            match unsafe { libc::fork() } {
                0 => {
                    let my_pgid = if i == 0 { 0 } else { pgid };
                    unsafe {
                        libc::setpgid(0, my_pgid);
                    }
                    if i > 0 {
                        unsafe { libc::dup2(pipe_fds[i - 1].0, 0) };
                    }
                    let merge_stderr = pipeline.pipe_stderr.get(i).copied().unwrap_or(false);
                    if i < n - 1 {
                        unsafe { libc::dup2(pipe_fds[i].1, 1) };
                        if merge_stderr {
                            unsafe { libc::dup2(pipe_fds[i].1, 2) };
                        }
                    }
                    for &(r, w) in &pipe_fds {
                        unsafe {
                            libc::close(r);
                            libc::close(w);
                        }
                    }
                    let code = self.execute_command_in_child(cmd);
                    unsafe { libc::_exit(code) };
                }
                pid if pid > 0 => {
                    if i == 0 {
                        pgid = pid;
                    }
                    unsafe {
                        libc::setpgid(pid, pgid);
                    }
                    pids.push(pid);
                }
                _ => {
                    return Err(ShellError::Runtime(crate::errors::RuntimeError::JobControl("fork failed".to_string())))
                }
            }
        }

        for &(r, w) in &pipe_fds {
            unsafe {
                libc::close(r);
                libc::close(w);
            }
        }

        let mut pipestatus = Vec::with_capacity(n);
        for pid in &pids {
            let mut status = 0;
            unsafe {
                libc::waitpid(*pid, &mut status, 0);
            }
            pipestatus.push(exit_code_from_status(status));
        }

        self.store_pipestatus(&pipestatus);

        let final_code = if self.state.options.pipefail {
            pipestatus.iter().rev().find(|&&c| c != 0).copied().unwrap_or(0)
        } else {
            pipestatus.last().copied().unwrap_or(0)
        };
        Ok(final_code)
    }

    fn store_pipestatus(&mut self, codes: &[i32]) {
        let array = crate::state::arrays::IndexedArray::from_values(codes.iter().map(|c| c.to_string()));
        let _ = self.state.set_array("PIPESTATUS", array);
    }

    /// Run one pipeline stage to completion inside a freshly forked
    /// child and return the exit code to hand `_exit`. Never returns
    /// to the caller in the real child (the caller immediately
    /// `_exit`s with the result), but is written as an ordinary
    /// function so it shares code with the in-process path.
    fn execute_command_in_child(&mut self, cmd: &CommandNode) -> i32 {
        match cmd {
            CommandNode::Simple(simple) => match self.execute_command_inprocess_simple(simple, ErrexitContext::Normal) {
                Ok(code) => code,
                Err(ShellError::Exit(e)) => e.exit_code,
                Err(e) => e.exit_code(),
            },
            CommandNode::Compound(c) => match self.execute_compound(c) {
                Ok(code) => code,
                Err(ShellError::Exit(e)) => e.exit_code,
                Err(e) => e.exit_code(),
            },
            CommandNode::FunctionDef(f) => {
                self.register_function(f);
                0
            }
        }
    }

    // ------------------------------------------------------------------
    // In-process single-command execution
    // ------------------------------------------------------------------

    fn execute_command_inprocess(&mut self, cmd: &CommandNode, ctx: ErrexitContext) -> ShellResult<i32> {
        match cmd {
            CommandNode::Simple(simple) => self.execute_command_inprocess_simple(simple, ctx),
            CommandNode::Compound(c) => self.execute_compound(c),
            CommandNode::FunctionDef(f) => {
                self.register_function(f);
                Ok(0)
            }
        }
    }

    pub fn register_function(&mut self, def: &FunctionDefNode) {
        self.state.functions.insert(def.name.clone(), crate::state::functions::FunctionRecord::from_def(def.clone()));
    }

    fn execute_command_inprocess_simple(&mut self, cmd: &SimpleCommandNode, ctx: ErrexitContext) -> ShellResult<i32> {
        let expanded_alias = expansion::expand_alias(self.state, cmd)?;
        let cmd_ref = expanded_alias.as_ref().unwrap_or(cmd);

        if self.state.options.xtrace {
            eprintln!("+ {}", describe_simple(cmd_ref));
        }

        let Some(prepared) = self.expand_simple_command(cmd_ref)? else {
            return Ok(0);
        };

        let mut runner = SubstitutionRunner { jobs: self.jobs };
        let guard = redirect::apply_redirections(self.state, &mut runner, &prepared.redirections)?;
        let result = self.dispatch_prepared(&prepared);
        guard.restore();
        self.restore_temp_assignments(prepared.restored);

        let code = match result {
            Ok(c) => c,
            Err(ShellError::Return(r)) if self.state.call_depth() > 0 => return Err(ShellError::Return(r)),
            Err(e @ ShellError::Exit(_)) | Err(e @ ShellError::Return(_)) => return Err(e),
            Err(e) => {
                if ctx == ErrexitContext::Normal {
                    self.report_and_maybe_errexit(&e)?;
                }
                e.exit_code()
            }
        };
        self.state.last_exit_code = code;
        Ok(code)
    }

    fn dispatch_prepared(&mut self, prepared: &PreparedCommand) -> ShellResult<i32> {
        match &prepared.resolution {
            Resolution::SpecialBuiltin(name) | Resolution::Builtin(name) => {
                builtins::dispatch(self, name, &prepared.args)
            }
            Resolution::Function(name) => self.call_function(name, &prepared.args),
            Resolution::External(path) => self.run_external_foreground(path, &prepared.args),
        }
    }

    /// Run an external program: fork, `execve` in the child (fds are
    /// already redirected by the caller before the fork), wait in the
    /// parent (spec §6 exit codes 126/127 are raised before this by
    /// the Dispatcher; this function only sees already-resolved paths).
    fn run_external_foreground(&mut self, path: &std::path::Path, args: &[String]) -> ShellResult<i32> {
        let pid = unsafe { libc::fork() };
        if pid == 0 {
            unsafe { libc::setpgid(0, 0) };
            exec_external(path, args, self.state);
            unsafe { libc::_exit(127) };
        } else if pid > 0 {
            unsafe { libc::setpgid(pid, pid) };
            let mut status = 0;
            unsafe {
                libc::waitpid(pid, &mut status, 0);
            }
            Ok(exit_code_from_status(status))
        } else {
            Err(ShellError::Runtime(crate::errors::RuntimeError::JobControl("fork failed".to_string())))
        }
    }

    /// Exposed for the `command`/`exec` builtins, which resolve a name
    /// to an external path themselves (bypassing function lookup) and
    /// then need the same fork/exec/wait primitive ordinary dispatch uses.
    pub fn run_external_for_command(&mut self, path: &std::path::Path, args: &[String]) -> ShellResult<i32> {
        self.run_external_foreground(path, args)
    }

    /// Replace the current process image — `exec` builtin (spec §4.G).
    pub fn exec_replace(&mut self, path: &std::path::Path, args: &[String]) -> ! {
        exec_external(path, args, self.state);
        std::process::exit(127);
    }

    fn restore_temp_assignments(&mut self, restored: Vec<(String, Option<String>)>) {
        for (name, old) in restored {
            match old {
                Some(v) => {
                    let _ = self.state.set(&name, v);
                }
                None => {
                    let _ = self.state.unset(&name);
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Expansion of one simple command
    // ------------------------------------------------------------------

    fn expand_simple_command(&mut self, cmd: &SimpleCommandNode) -> ShellResult<Option<PreparedCommand>> {
        if let Some(line) = cmd.line {
            self.state.current_line = line as u32;
        }

        let Some(name_word) = &cmd.name else {
            for assignment in &cmd.assignments {
                self.apply_assignment(assignment, true)?;
            }
            return Ok(None);
        };

        let mut runner = SubstitutionRunner { jobs: self.jobs };
        let name_fields = expansion::expand_word_fields(self.state, &mut runner, name_word)?;
        let command_name = name_fields.first().cloned().unwrap_or_default();
        if command_name.is_empty() {
            return Err(ShellError::CommandNotFound(String::new()));
        }

        let resolution = dispatcher::resolve(self.state, &command_name)?;
        let persists = matches!(resolution, Resolution::SpecialBuiltin(_));

        let mut restored = Vec::new();
        for assignment in &cmd.assignments {
            let old = self.apply_assignment(assignment, persists)?;
            if !persists {
                restored.push(old);
            }
        }

        let mut args: Vec<String> = name_fields.into_iter().skip(1).collect();
        for arg in &cmd.args {
            args.extend(expansion::expand_word_fields(self.state, &mut runner, arg)?);
        }

        Ok(Some(PreparedCommand {
            resolution,
            args,
            redirections: cmd.redirections.clone(),
            restored,
        }))
    }

    /// Apply one `VAR=value` / `VAR[i]=value` / `VAR=(a b c)` leading
    /// assignment, returning the name and its prior value so a
    /// temporary (non-persisting) assignment can be undone.
    fn apply_assignment(
        &mut self,
        assignment: &AssignmentNode,
        _persists: bool,
    ) -> ShellResult<(String, Option<String>)> {
        let old = self.state.get(&assignment.name);
        let mut runner = SubstitutionRunner { jobs: self.jobs };

        if let Some(elements) = &assignment.array {
            if assignment.subscript.is_none() && is_assoc_literal(elements) {
                let mut assoc = crate::state::arrays::AssocArray::new();
                for el in elements {
                    let key = match &el.key {
                        Some(k) => expansion::expand_word_scalar(self.state, &mut runner, k)?,
                        None => String::new(),
                    };
                    let value = expansion::expand_word_scalar(self.state, &mut runner, &el.value)?;
                    assoc.set(key, value);
                }
                self.state.set_assoc(&assignment.name, assoc).map_err(ShellError::from)?;
            } else {
                let mut array = crate::state::arrays::IndexedArray::new();
                let mut next = 0usize;
                for el in elements {
                    let idx = match &el.key {
                        Some(k) => {
                            let text = expansion::expand_word_scalar(self.state, &mut runner, k)?;
                            text.parse::<usize>().unwrap_or(next)
                        }
                        None => next,
                    };
                    let value = expansion::expand_word_scalar(self.state, &mut runner, &el.value)?;
                    array.set(idx, value);
                    next = idx + 1;
                }
                self.state.set_array(&assignment.name, array).map_err(ShellError::from)?;
            }
            return Ok((assignment.name.clone(), old));
        }

        let value = match &assignment.value {
            Some(w) => expansion::expand_word_scalar(self.state, &mut runner, w)?,
            None => String::new(),
        };

        if let Some(sub) = &assignment.subscript {
            let index_text = expansion::expand_word_scalar(self.state, &mut runner, sub)?;
            if let Ok(idx) = index_text.parse::<usize>() {
                self.state.set_array_element(&assignment.name, idx, value).map_err(ShellError::from)?;
            } else {
                self.state.set_assoc_element(&assignment.name, index_text, value).map_err(ShellError::from)?;
            }
            return Ok((assignment.name.clone(), old));
        }

        if assignment.append {
            self.state.append(&assignment.name, value).map_err(ShellError::from)?;
        } else {
            self.state.set(&assignment.name, value).map_err(ShellError::from)?;
        }
        Ok((assignment.name.clone(), old))
    }

    // ------------------------------------------------------------------
    // Function calls
    // ------------------------------------------------------------------

    pub fn call_function(&mut self, name: &str, args: &[String]) -> ShellResult<i32> {
        let Some(record) = self.state.functions.get(name).cloned() else {
            return Err(ShellError::CommandNotFound(name.to_string()));
        };
        let frame = CallFrame::new(name.to_string(), args.to_vec(), self.state.current_line, record.source_file.clone());
        self.state.push_frame(frame).map_err(ShellError::from)?;

        let body_result = self.execute_compound(&record.def.body);

        self.state.pop_frame();

        match body_result {
            Ok(code) => {
                self.state.last_exit_code = code;
                Ok(code)
            }
            Err(ShellError::Return(r)) => {
                self.state.last_exit_code = r.exit_code;
                Ok(r.exit_code)
            }
            Err(e) => Err(e),
        }
    }

    // ------------------------------------------------------------------
    // Arithmetic / expansion bridges
    // ------------------------------------------------------------------

    pub fn eval_arith(&mut self, expr: &ArithExpr) -> ShellResult<i64> {
        let mut runner = SubstitutionRunner { jobs: self.jobs };
        expansion::eval_arith(self.state, &mut runner, expr)
    }
}

/// Holds what `expand_simple_command` resolved for one invocation.
struct PreparedCommand {
    resolution: Resolution,
    args: Vec<String>,
    redirections: Vec<RedirectionNode>,
    restored: Vec<(String, Option<String>)>,
}

fn is_assoc_literal(elements: &[ArrayElementNode]) -> bool {
    elements.iter().any(|e| e.key.is_some())
}

fn plain_literal(word: &WordNode) -> Option<String> {
    if word.is_plain() {
        Some(word.parts.iter().map(word_part_text).collect())
    } else {
        None
    }
}

fn word_part_text(part: &WordPart) -> String {
    match part {
        WordPart::Literal(l) => l.value.clone(),
        WordPart::Escaped(e) => e.value.clone(),
        _ => String::new(),
    }
}

fn describe_simple(cmd: &SimpleCommandNode) -> String {
    let mut parts = Vec::new();
    if let Some(name) = &cmd.name {
        parts.push(render_word_debug(name));
    }
    for a in &cmd.args {
        parts.push(render_word_debug(a));
    }
    parts.join(" ")
}

fn render_word_debug(word: &WordNode) -> String {
    word.parts.iter().map(word_part_text).collect()
}

fn describe_statement(stmt: &StatementNode) -> String {
    stmt.pipelines
        .iter()
        .map(|p| {
            p.commands
                .iter()
                .map(|c| match c {
                    CommandNode::Simple(s) => describe_simple(s),
                    CommandNode::Compound(_) => "{ ... }".to_string(),
                    CommandNode::FunctionDef(f) => format!("{}()", f.name),
                })
                .collect::<Vec<_>>()
                .join(" | ")
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// `execve` with the shell's exported environment — never returns on
/// success.
fn exec_external(path: &std::path::Path, args: &[String], state: &ShellState) {
    let Ok(c_path) = CString::new(path.as_os_str().to_string_lossy().into_owned()) else { return };
    let mut c_args: Vec<CString> = Vec::with_capacity(args.len() + 1);
    c_args.push(CString::new(path.to_string_lossy().into_owned()).unwrap_or_else(|_| CString::new("").unwrap()));
    for a in args {
        if let Ok(c) = CString::new(a.as_str()) {
            c_args.push(c);
        }
    }
    let mut argv: Vec<*const libc::c_char> = c_args.iter().map(|c| c.as_ptr()).collect();
    argv.push(std::ptr::null());

    let env = state.exported_env();
    let mut c_env: Vec<CString> = env.iter().map(|(k, v)| CString::new(format!("{k}={v}")).unwrap()).collect();
    let mut envp: Vec<*const libc::c_char> = c_env.iter().map(|c| c.as_ptr()).collect();
    envp.push(std::ptr::null());

    unsafe {
        libc::execve(c_path.as_ptr(), argv.as_ptr(), envp.as_ptr());
    }
    std::mem::drop(c_args);
    std::mem::drop(c_env);
}

// ------------------------------------------------------------------
// Command / process substitution — the seam `expansion` calls back
// through so it never needs to know about fork/exec directly. Free
// functions (rather than methods on `Executor`) since `SubstitutionRunner`
// only carries a job table, not a `ShellState` borrow.
// ------------------------------------------------------------------

/// Fork, redirect the child's stdout into a pipe, run `body` for real
/// (so builtins inside `$(...)` write to the real stdout fd, which is
/// now the pipe), and read the captured text back in the parent. Per
/// spec §9 Open Questions, the inner exit code is authoritative for
/// `$?` (set unconditionally here).
fn run_capture(state: &mut ShellState, body: &ScriptNode) -> ShellResult<String> {
    let mut fds = [0i32; 2];
    if unsafe { libc::pipe(fds.as_mut_ptr()) } < 0 {
        return Err(ShellError::Expansion(ExpansionError::CommandSubstitutionFailed(1)));
    }
    let (read_fd, write_fd) = (fds[0], fds[1]);

    match unsafe { libc::fork() } {
        0 => {
            unsafe {
                libc::close(read_fd);
                libc::dup2(write_fd, 1);
                libc::close(write_fd);
            }
            let mut jobs = JobManager::new();
            let mut exec = Executor::new(state, &mut jobs);
            let code = match exec.execute_script(body) {
                Ok(c) => c,
                Err(ShellError::Exit(e)) => e.exit_code,
                Err(e) => e.exit_code(),
            };
            unsafe { libc::_exit(code) };
        }
        pid if pid > 0 => {
            unsafe { libc::close(write_fd) };
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = unsafe { libc::read(read_fd, chunk.as_mut_ptr() as *mut _, chunk.len()) };
                if n <= 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n as usize]);
            }
            unsafe { libc::close(read_fd) };
            let mut status = 0;
            unsafe {
                libc::waitpid(pid, &mut status, 0);
            }
            state.last_exit_code = exit_code_from_status(status);
            let mut text = String::from_utf8_lossy(&buf).into_owned();
            while text.ends_with('\n') {
                text.pop();
            }
            Ok(text)
        }
        _ => Err(ShellError::Expansion(ExpansionError::CommandSubstitutionFailed(1))),
    }
}

/// `<(...)`/`>(...)`: fork a child that streams through a pipe and
/// hand back `/dev/fd/N` for the caller to pass as a word (spec
/// §4.C). The read (or write, for `>(...)`) end is left open with its
/// close-on-exec bit cleared so the external command that later opens
/// `/dev/fd/N` sees live data.
fn run_process_substitution(
    jobs: &mut JobManager,
    state: &mut ShellState,
    body: &ScriptNode,
    direction: ProcessDirection,
) -> ShellResult<String> {
    let mut fds = [0i32; 2];
    if unsafe { libc::pipe(fds.as_mut_ptr()) } < 0 {
        return Err(ShellError::Expansion(ExpansionError::CommandSubstitutionFailed(1)));
    }
    let (read_fd, write_fd) = (fds[0], fds[1]);

    let (child_end, keep_end, child_target_fd) = match direction {
        ProcessDirection::Input => (write_fd, read_fd, 1),
        ProcessDirection::Output => (read_fd, write_fd, 0),
    };

    match unsafe { libc::fork() } {
        0 => {
            unsafe {
                libc::close(keep_end);
                libc::dup2(child_end, child_target_fd);
                libc::close(child_end);
            }
            let mut child_jobs = JobManager::new();
            let mut exec = Executor::new(state, &mut child_jobs);
            let code = match exec.execute_script(body) {
                Ok(c) => c,
                Err(ShellError::Exit(e)) => e.exit_code,
                Err(e) => e.exit_code(),
            };
            unsafe { libc::_exit(code) };
        }
        pid if pid > 0 => {
            unsafe { libc::close(child_end) };
            unsafe {
                let flags = libc::fcntl(keep_end, libc::F_GETFD);
                libc::fcntl(keep_end, libc::F_SETFD, flags & !libc::FD_CLOEXEC);
            }
            jobs.add(vec![pid], pid, "process substitution".to_string());
            Ok(format!("/dev/fd/{keep_end}"))
        }
        _ => Err(ShellError::Expansion(ExpansionError::CommandSubstitutionFailed(1))),
    }
}
