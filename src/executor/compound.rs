//! Compound commands (spec §4.H step 6): `if`/`for`/`while`/`until`/
//! `case`/`select`/subshells/groups/`((...))`/`[[...]]`.
//!
//! `break N`/`continue N` are threaded as `ShellError::Break`/`Continue`
//! up through nested loop bodies, decrementing `levels` by one at each
//! enclosing loop until it reaches zero, matching the teacher's
//! `ControlFlowError`-based unwind but without the captured-output
//! fields (stdout/stderr are real fds here).

use super::{ErrexitContext, Executor, SubstitutionRunner};
use crate::ast::*;
use crate::errors::{BreakSignal, ContinueSignal, ShellError, ShellResult};
use crate::expansion::{self, pattern};

/// What a loop body handed back after running once.
enum LoopOutcome {
    /// Ran to completion; keep looping.
    Continue,
    /// `break N` surfaced; `0` once this loop should stop absorbing it.
    Break(u32),
    /// `continue N`; `0` means restart this loop's next iteration.
    Next(u32),
}

impl<'a> Executor<'a> {
    pub fn execute_compound(&mut self, compound: &CompoundCommandNode) -> ShellResult<i32> {
        use CompoundCommandNode::*;
        match compound {
            If(node) => self.execute_if(node),
            For(node) => self.execute_for(node),
            CStyleFor(node) => self.execute_cstyle_for(node),
            While(node) => self.execute_while(node),
            Until(node) => self.execute_until(node),
            Case(node) => self.execute_case(node),
            Select(node) => self.execute_select(node),
            Subshell(node) => self.execute_subshell(node),
            Group(node) => self.execute_group(&node.body),
            ArithmeticCommand(node) => self.execute_arithmetic_command(node),
            ConditionalCommand(node) => self.execute_conditional_command(node),
        }
    }

    /// Execute a list of statements sequentially in the current frame,
    /// propagating every control-flow signal (this is what distinguishes
    /// it from `execute_script`, which absorbs stray break/continue).
    fn execute_body(&mut self, body: &[StatementNode]) -> ShellResult<i32> {
        let mut code = 0;
        for stmt in body {
            code = self.execute_statement(stmt, ErrexitContext::Normal)?;
            self.jobs.check_completed();
        }
        Ok(code)
    }

    /// `if`/`while`/`until` conditions run with `errexit` suppressed for
    /// their own nonzero status (spec §7).
    fn eval_condition(&mut self, cond: &[StatementNode]) -> ShellResult<i32> {
        let mut code = 0;
        for stmt in cond {
            code = self.execute_statement(stmt, ErrexitContext::Suppressed)?;
        }
        Ok(code)
    }

    fn run_loop_body(&mut self, body: &[StatementNode]) -> ShellResult<LoopOutcome> {
        match self.execute_body(body) {
            Ok(_) => Ok(LoopOutcome::Continue),
            Err(ShellError::Break(BreakSignal { levels })) => Ok(LoopOutcome::Break(levels)),
            Err(ShellError::Continue(ContinueSignal { levels })) => Ok(LoopOutcome::Next(levels)),
            Err(e) => Err(e),
        }
    }

    // ------------------------------------------------------------------
    // if
    // ------------------------------------------------------------------

    fn execute_if(&mut self, node: &IfNode) -> ShellResult<i32> {
        for clause in &node.clauses {
            let cond_code = self.eval_condition(&clause.condition)?;
            if cond_code == 0 {
                return self.execute_body(&clause.body);
            }
        }
        if let Some(else_body) = &node.else_body {
            return self.execute_body(else_body);
        }
        self.state.last_exit_code = 0;
        Ok(0)
    }

    // ------------------------------------------------------------------
    // for / C-style for
    // ------------------------------------------------------------------

    fn execute_for(&mut self, node: &ForNode) -> ShellResult<i32> {
        let items = match &node.words {
            Some(words) => {
                let mut runner = SubstitutionRunner { jobs: self.jobs };
                let mut fields = Vec::new();
                for w in words {
                    fields.extend(expansion::expand_word_fields(self.state, &mut runner, w)?);
                }
                fields
            }
            None => self.state.positional_params().to_vec(),
        };

        let mut code = 0;
        for item in items {
            self.state.set(&node.variable, item).map_err(ShellError::from)?;
            match self.run_loop_body(&node.body)? {
                LoopOutcome::Continue => {}
                LoopOutcome::Next(levels) if levels <= 1 => {}
                LoopOutcome::Next(levels) => {
                    return Err(ShellError::Continue(ContinueSignal { levels: levels - 1 }))
                }
                LoopOutcome::Break(levels) if levels <= 1 => break,
                LoopOutcome::Break(levels) => return Err(ShellError::Break(BreakSignal { levels: levels - 1 })),
            }
            code = self.state.last_exit_code;
        }
        self.state.last_exit_code = code;
        Ok(code)
    }

    fn execute_cstyle_for(&mut self, node: &CStyleForNode) -> ShellResult<i32> {
        if let Some(init) = &node.init {
            self.eval_arith(&init.expression)?;
        }

        let mut code = 0;
        loop {
            let truthy = match &node.condition {
                Some(cond) => self.eval_arith(&cond.expression)? != 0,
                None => true,
            };
            if !truthy {
                break;
            }

            match self.run_loop_body(&node.body)? {
                LoopOutcome::Continue => {}
                LoopOutcome::Next(levels) if levels <= 1 => {}
                LoopOutcome::Next(levels) => {
                    return Err(ShellError::Continue(ContinueSignal { levels: levels - 1 }))
                }
                LoopOutcome::Break(levels) if levels <= 1 => break,
                LoopOutcome::Break(levels) => return Err(ShellError::Break(BreakSignal { levels: levels - 1 })),
            }
            code = self.state.last_exit_code;

            if let Some(update) = &node.update {
                self.eval_arith(&update.expression)?;
            }
        }
        self.state.last_exit_code = code;
        Ok(code)
    }

    // ------------------------------------------------------------------
    // while / until
    // ------------------------------------------------------------------

    fn execute_while(&mut self, node: &WhileNode) -> ShellResult<i32> {
        let mut code = 0;
        loop {
            if self.eval_condition(&node.condition)? != 0 {
                break;
            }
            match self.run_loop_body(&node.body)? {
                LoopOutcome::Continue => {}
                LoopOutcome::Next(levels) if levels <= 1 => {}
                LoopOutcome::Next(levels) => {
                    return Err(ShellError::Continue(ContinueSignal { levels: levels - 1 }))
                }
                LoopOutcome::Break(levels) if levels <= 1 => break,
                LoopOutcome::Break(levels) => return Err(ShellError::Break(BreakSignal { levels: levels - 1 })),
            }
            code = self.state.last_exit_code;
        }
        self.state.last_exit_code = code;
        Ok(code)
    }

    fn execute_until(&mut self, node: &UntilNode) -> ShellResult<i32> {
        let mut code = 0;
        loop {
            if self.eval_condition(&node.condition)? == 0 {
                break;
            }
            match self.run_loop_body(&node.body)? {
                LoopOutcome::Continue => {}
                LoopOutcome::Next(levels) if levels <= 1 => {}
                LoopOutcome::Next(levels) => {
                    return Err(ShellError::Continue(ContinueSignal { levels: levels - 1 }))
                }
                LoopOutcome::Break(levels) if levels <= 1 => break,
                LoopOutcome::Break(levels) => return Err(ShellError::Break(BreakSignal { levels: levels - 1 })),
            }
            code = self.state.last_exit_code;
        }
        self.state.last_exit_code = code;
        Ok(code)
    }

    // ------------------------------------------------------------------
    // case
    // ------------------------------------------------------------------

    fn execute_case(&mut self, node: &CaseNode) -> ShellResult<i32> {
        let mut runner = SubstitutionRunner { jobs: self.jobs };
        let scrutinee = expansion::expand_word_scalar(self.state, &mut runner, &node.word)?;
        let nocasematch = self.state.shopt.nocasematch;
        let extglob = self.state.shopt.extglob;

        let mut code = 0;
        let mut fallthrough = false;
        for item in &node.items {
            let mut matched = fallthrough;
            if !matched {
                for pattern_word in &item.patterns {
                    let mut runner = SubstitutionRunner { jobs: self.jobs };
                    let pat_text = expansion::expand_word_scalar(self.state, &mut runner, pattern_word)?;
                    if case_pattern_matches(&pat_text, &scrutinee, nocasematch, extglob) {
                        matched = true;
                        break;
                    }
                }
            }
            if !matched {
                continue;
            }

            code = self.execute_body(&item.body)?;

            match item.terminator {
                CaseTerminator::DoubleSemi => return Ok(code),
                CaseTerminator::SemiAnd => {
                    fallthrough = true;
                    continue;
                }
                CaseTerminator::SemiSemiAnd => {
                    fallthrough = false;
                    continue;
                }
            }
        }
        self.state.last_exit_code = code;
        Ok(code)
    }

    // ------------------------------------------------------------------
    // select
    // ------------------------------------------------------------------

    fn execute_select(&mut self, node: &SelectNode) -> ShellResult<i32> {
        use std::io::{self, BufRead, Write};

        let items = match &node.words {
            Some(words) => {
                let mut runner = SubstitutionRunner { jobs: self.jobs };
                let mut fields = Vec::new();
                for w in words {
                    fields.extend(expansion::expand_word_fields(self.state, &mut runner, w)?);
                }
                fields
            }
            None => self.state.positional_params().to_vec(),
        };
        if items.is_empty() {
            return Ok(0);
        }

        let ps3 = self.state.get("PS3").unwrap_or_else(|| "#? ".to_string());
        let stdin = io::stdin();
        let mut code = 0;

        loop {
            for (i, item) in items.iter().enumerate() {
                eprintln!("{}) {}", i + 1, item);
            }
            eprint!("{ps3}");
            let _ = io::stderr().flush();

            let mut line = String::new();
            if stdin.lock().read_line(&mut line).unwrap_or(0) == 0 {
                break;
            }
            let line = line.trim().to_string();
            self.state.set("REPLY", line.clone()).map_err(ShellError::from)?;

            let choice = line.parse::<usize>().ok().and_then(|n| items.get(n - 1).cloned());
            self.state.set(&node.variable, choice.clone().unwrap_or_default()).map_err(ShellError::from)?;

            match self.run_loop_body(&node.body)? {
                LoopOutcome::Continue => {}
                LoopOutcome::Next(levels) if levels <= 1 => {}
                LoopOutcome::Next(levels) => {
                    return Err(ShellError::Continue(ContinueSignal { levels: levels - 1 }))
                }
                LoopOutcome::Break(levels) if levels <= 1 => break,
                LoopOutcome::Break(levels) => return Err(ShellError::Break(BreakSignal { levels: levels - 1 })),
            }
            code = self.state.last_exit_code;
        }
        self.state.last_exit_code = code;
        Ok(code)
    }

    // ------------------------------------------------------------------
    // subshell / group
    // ------------------------------------------------------------------

    /// `( ... )` — forks so state mutations vanish with the child; the
    /// parent only observes the exit code (copy-on-write gives the
    /// isolation, no snapshot/restore needed).
    fn execute_subshell(&mut self, node: &SubshellNode) -> ShellResult<i32> {
        match unsafe { libc::fork() } {
            0 => {
                unsafe { libc::setpgid(0, 0) };
                let code = match self.execute_body(&node.body) {
                    Ok(c) => c,
                    Err(ShellError::Exit(e)) => e.exit_code,
                    Err(e) => e.exit_code(),
                };
                unsafe { libc::_exit(code) };
            }
            pid if pid > 0 => {
                let mut status = 0;
                unsafe {
                    libc::waitpid(pid, &mut status, 0);
                }
                let code = crate::jobs::exit_code_from_status(status);
                self.state.last_exit_code = code;
                Ok(code)
            }
            _ => Err(ShellError::Runtime(crate::errors::RuntimeError::JobControl("fork failed".to_string()))),
        }
    }

    /// `{ ...; }` — runs in the current shell, no fork.
    fn execute_group(&mut self, body: &[StatementNode]) -> ShellResult<i32> {
        self.execute_body(body)
    }

    // ------------------------------------------------------------------
    // (( expr )) / [[ expr ]]
    // ------------------------------------------------------------------

    fn execute_arithmetic_command(&mut self, node: &ArithmeticCommandNode) -> ShellResult<i32> {
        let value = self.eval_arith(&node.expression.expression)?;
        let code = i32::from(value == 0);
        self.state.last_exit_code = code;
        Ok(code)
    }

    fn execute_conditional_command(&mut self, node: &ConditionalCommandNode) -> ShellResult<i32> {
        let truthy = self.eval_conditional_expr(&node.expression)?;
        let code = i32::from(!truthy);
        self.state.last_exit_code = code;
        Ok(code)
    }

    fn eval_conditional_expr(&mut self, expr: &ConditionalExpressionNode) -> ShellResult<bool> {
        use ConditionalExpressionNode::*;
        match expr {
            Word(w) => {
                let mut runner = SubstitutionRunner { jobs: self.jobs };
                let text = expansion::expand_word_scalar(self.state, &mut runner, w)?;
                Ok(!text.is_empty())
            }
            Not(inner) => Ok(!self.eval_conditional_expr(inner)?),
            And(l, r) => Ok(self.eval_conditional_expr(l)? && self.eval_conditional_expr(r)?),
            Or(l, r) => Ok(self.eval_conditional_expr(l)? || self.eval_conditional_expr(r)?),
            Group(inner) => self.eval_conditional_expr(inner),
            Unary(u) => self.eval_cond_unary(u),
            Binary(b) => self.eval_cond_binary(b),
        }
    }

    fn eval_cond_unary(&mut self, node: &CondUnaryNode) -> ShellResult<bool> {
        use CondUnaryOperator::*;
        let mut runner = SubstitutionRunner { jobs: self.jobs };

        if matches!(node.operator, VarSet) {
            let name = expansion::expand_word_scalar(self.state, &mut runner, &node.operand)?;
            return Ok(self.state.is_set(&name));
        }
        if matches!(node.operator, OptionSet) {
            let name = expansion::expand_word_scalar(self.state, &mut runner, &node.operand)?;
            return Ok(self.state.options.get_by_name(&name).unwrap_or(false));
        }
        if matches!(node.operator, NameRef) {
            let name = expansion::expand_word_scalar(self.state, &mut runner, &node.operand)?;
            return Ok(self.state.get_var(&name).map(|v| v.attrs.nameref).unwrap_or(false));
        }

        let operand = expansion::expand_word_scalar(self.state, &mut runner, &node.operand)?;
        Ok(match node.operator {
            StringEmpty => operand.is_empty(),
            StringNonEmpty => !operand.is_empty(),
            ExistsAny => std::path::Path::new(&operand).exists(),
            RegularFile => std::path::Path::new(&operand).is_file(),
            Directory => std::path::Path::new(&operand).is_dir(),
            Symlink => std::fs::symlink_metadata(&operand).map(|m| m.file_type().is_symlink()).unwrap_or(false),
            NonEmpty => std::fs::metadata(&operand).map(|m| m.len() > 0).unwrap_or(false),
            Readable => is_access(&operand, libc::R_OK),
            Writable => is_access(&operand, libc::W_OK),
            Executable => is_access(&operand, libc::X_OK),
            Socket => file_type_is(&operand, libc::S_IFSOCK),
            Pipe => file_type_is(&operand, libc::S_IFIFO),
            BlockSpecial => file_type_is(&operand, libc::S_IFBLK),
            CharSpecial => file_type_is(&operand, libc::S_IFCHR),
            SetUid => mode_has(&operand, libc::S_ISUID),
            SetGid => mode_has(&operand, libc::S_ISGID),
            Sticky => mode_has(&operand, libc::S_ISVTX),
            Terminal => operand.parse::<i32>().map(|fd| unsafe { libc::isatty(fd) == 1 }).unwrap_or(false),
            VarSet | OptionSet | NameRef => unreachable!("handled above"),
        })
    }

    fn eval_cond_binary(&mut self, node: &CondBinaryNode) -> ShellResult<bool> {
        use CondBinaryOperator::*;
        let mut runner = SubstitutionRunner { jobs: self.jobs };
        let left = expansion::expand_word_scalar(self.state, &mut runner, &node.left)?;

        if matches!(node.operator, Match) {
            let pattern_text = expansion::expand_word_scalar(self.state, &mut runner, &node.right)?;
            let re = regex_lite::Regex::new(&pattern_text)
                .map_err(|e| ShellError::Expansion(crate::errors::ExpansionError::BadSubstitution(e.to_string())))?;
            if let Some(caps) = re.captures(&left) {
                let mut groups = crate::state::arrays::IndexedArray::new();
                for i in 0..caps.len() {
                    groups.set(i, caps.get(i).map(|m| m.as_str().to_string()).unwrap_or_default());
                }
                self.state.set_array("BASH_REMATCH", groups).map_err(ShellError::from)?;
                return Ok(true);
            }
            return Ok(false);
        }

        let right = expansion::expand_word_scalar(self.state, &mut runner, &node.right)?;
        let nocasematch = self.state.shopt.nocasematch;
        let extglob = self.state.shopt.extglob;

        Ok(match node.operator {
            Eq => case_pattern_matches(&right, &left, nocasematch, extglob),
            Ne => !case_pattern_matches(&right, &left, nocasematch, extglob),
            Lt => left < right,
            Gt => left > right,
            NumEq | NumNe | NumLt | NumLe | NumGt | NumGe => {
                let l = parse_test_int(&left);
                let r = parse_test_int(&right);
                match node.operator {
                    NumEq => l == r,
                    NumNe => l != r,
                    NumLt => l < r,
                    NumLe => l <= r,
                    NumGt => l > r,
                    NumGe => l >= r,
                    _ => unreachable!(),
                }
            }
            Nt => file_mtime(&left) > file_mtime(&right),
            Ot => file_mtime(&left) < file_mtime(&right),
            Ef => same_file(&left, &right),
            Match => unreachable!("handled above"),
        })
    }
}

fn case_pattern_matches(pattern_text: &str, value: &str, nocasematch: bool, extglob: bool) -> bool {
    let regex_str = pattern::pattern_to_regex(pattern_text, true, extglob);
    let Some(re) = pattern::compile_anchored(&regex_str) else { return pattern_text == value };
    if nocasematch {
        regex_lite::Regex::new(&format!("(?i)^(?:{})$", regex_str))
            .map(|re| re.is_match(value))
            .unwrap_or(false)
    } else {
        re.is_match(value)
    }
}

fn parse_test_int(s: &str) -> i64 {
    crate::arithmetic::parse_integer_literal(s.trim()).unwrap_or(0)
}

fn is_access(path: &str, mode: i32) -> bool {
    let Ok(c_path) = std::ffi::CString::new(path) else { return false };
    unsafe { libc::access(c_path.as_ptr(), mode) == 0 }
}

fn file_type_is(path: &str, expected: libc::mode_t) -> bool {
    std::fs::metadata(path).map(|m| (m_mode(&m) & libc::S_IFMT) == expected).unwrap_or(false)
}

fn mode_has(path: &str, bit: libc::mode_t) -> bool {
    std::fs::metadata(path).map(|m| m_mode(&m) & bit != 0).unwrap_or(false)
}

fn m_mode(meta: &std::fs::Metadata) -> libc::mode_t {
    use std::os::unix::fs::MetadataExt;
    meta.mode() as libc::mode_t
}

fn file_mtime(path: &str) -> std::time::SystemTime {
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
    use crate::parser::parse_script;
    use crate::state::ShellState;

    fn run(src: &str) -> (i32, ShellState) {
        let mut state = ShellState::new();
        let mut jobs = JobManager::new();
        let script = parse_script(src).expect("parse");
        let mut exec = Executor::new(&mut state, &mut jobs);
        let code = exec.execute_script(&script).unwrap_or(1);
        (code, state)
    }

    #[test]
    fn if_else_selects_branch() {
        let (code, _) = run("if true; then :; else exit 9; fi");
        assert_eq!(code, 0);
    }

    #[test]
    fn for_loop_sets_variable_each_iteration() {
        let (_, state) = run("for x in a b c; do :; done");
        assert_eq!(state.get("x").as_deref(), Some("c"));
    }

    #[test]
    fn case_matches_glob_pattern() {
        let (code, _) = run("case hello in h*) exit 0 ;; *) exit 1 ;; esac");
        assert_eq!(code, 0);
    }

    #[test]
    fn break_stops_innermost_loop_only() {
        let (_, state) = run(
            "for i in 1 2; do for j in a b; do if [ \"$j\" = a ]; then break; fi; done; done; true",
        );
        assert_eq!(state.get("i").as_deref(), Some("2"));
    }
}
