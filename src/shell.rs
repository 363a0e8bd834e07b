//! Shell driver (spec §4.H "Shell driver", component H's top level).
//!
//! Owns the long-lived `ShellState`/`JobManager` pair and drives
//! either an interactive read-eval-print loop or a single script/`-c`
//! string through the same `Executor` the rest of the evaluator uses.

use std::io::Write;

use crate::errors::ShellError;
use crate::executor::Executor;
use crate::jobs::JobManager;
use crate::state::ShellState;
use crate::{fast_path, history, rc, signals};

pub struct Shell {
    state: ShellState,
    jobs: JobManager,
    interactive: bool,
}

impl Shell {
    pub fn new(interactive: bool) -> Self {
        signals::install_default_handlers();
        let mut state = ShellState::new();
        state.history.load(&history::default_histfile(), history::default_histsize());
        Self { state, jobs: JobManager::new(), interactive }
    }

    pub fn source_rc(&mut self, rcfile: Option<&std::path::Path>, skip: bool) {
        if skip {
            return;
        }
        let path = rcfile.map(std::path::Path::to_path_buf).unwrap_or_else(rc::default_rcfile);
        let mut exec = Executor::new(&mut self.state, &mut self.jobs);
        let _ = rc::source_if_present(&mut exec, &path);
    }

    /// Run a single `-c` command string to completion.
    pub fn run_command_string(&mut self, command: &str, args: Vec<String>) -> i32 {
        self.state.set_positional_params(args);
        self.run_text(command)
    }

    /// Run a script file to completion.
    pub fn run_script_file(&mut self, path: &std::path::Path, args: Vec<String>) -> i32 {
        self.state.set_positional_params(args);
        match std::fs::read_to_string(path) {
            Ok(text) => self.run_text(&text),
            Err(e) => {
                eprintln!("den: {}: {e}", path.display());
                127
            }
        }
    }

    fn run_text(&mut self, text: &str) -> i32 {
        let script = match crate::parser::parse_script(text) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("den: syntax error: {e}");
                return 2;
            }
        };
        let mut exec = Executor::new(&mut self.state, &mut self.jobs);
        let code = match exec.execute_script(&script) {
            Ok(c) => c,
            Err(ShellError::Exit(sig)) => sig.exit_code,
            Err(e) => {
                eprintln!("den: {e}");
                e.exit_code()
            }
        };
        let _ = signals::run_trap(&mut exec, "EXIT");
        code
    }

    /// Interactive read-eval-print loop; reads from stdin a line at a
    /// time, feeding incomplete input (an open quote, an unterminated
    /// `if`) back through the parser with continuation prompts until a
    /// full statement is available.
    pub fn run_interactive(&mut self) -> i32 {
        let mut buffer = String::new();
        let stdin = std::io::stdin();
        let mut last_code = 0;

        loop {
            self.jobs.check_completed();
            if signals::take_sigint() {
                buffer.clear();
            }

            if self.interactive {
                print_prompt(&self.state, buffer.is_empty());
            }
            let mut line = String::new();
            if stdin.read_line(&mut line).unwrap_or(0) == 0 {
                break;
            }
            if !buffer.is_empty() {
                buffer.push('\n');
            }
            buffer.push_str(line.trim_end_matches('\n'));

            if buffer.is_empty() {
                continue;
            }

            if let Some(fast) = { let mut exec = Executor::new(&mut self.state, &mut self.jobs); fast_path::try_run(&mut exec, &buffer) } {
                buffer.clear();
                match fast {
                    Ok(code) => {
                        self.state.last_exit_code = code;
                        last_code = code;
                    }
                    Err(ShellError::Exit(sig)) => return sig.exit_code,
                    Err(_) => {}
                }
                continue;
            }

            match crate::parser::parse_script(&buffer) {
                Ok(script) => {
                    self.state.history.add(buffer.clone());
                    buffer.clear();
                    let mut exec = Executor::new(&mut self.state, &mut self.jobs);
                    match exec.execute_script(&script) {
                        Ok(code) => last_code = code,
                        Err(ShellError::Exit(sig)) => return sig.exit_code,
                        Err(e) => {
                            eprintln!("den: {e}");
                            last_code = e.exit_code();
                        }
                    }
                }
                Err(crate::parser::ParseError::Incomplete) => continue,
                Err(e) => {
                    eprintln!("den: syntax error: {e}");
                    buffer.clear();
                    last_code = 2;
                }
            }
        }
        last_code
    }
}

impl Drop for Shell {
    fn drop(&mut self) {
        self.jobs.kill_all();
        let histsize = self.state.get("HISTFILESIZE").and_then(|s| s.parse().ok()).unwrap_or_else(history::default_histsize);
        let _ = self.state.history.save(&history::default_histfile(), histsize);
    }
}

fn print_prompt(state: &ShellState, is_primary: bool) {
    let prompt = if is_primary { state.get("PS1").unwrap_or_else(|| "$ ".to_string()) } else { state.get("PS2").unwrap_or_else(|| "> ".to_string()) };
    print!("{prompt}");
    let _ = std::io::stdout().flush();
}
