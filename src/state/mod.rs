//! State Store (spec §3 "State Store invariants", component E — spec §4.E).
//!
//! Every other component reaches shell state through the narrow
//! interface defined here (`get`/`set`/`unset`/array ops/attribute
//! mutators) rather than poking at fields directly, per spec §4.E.
//! Parsed ASTs and tokens are owned and dropped by their producers;
//! this store is the one thing that outlives a single command.

pub mod aliases;
pub mod arrays;
pub mod functions;
pub mod options;
pub mod variables;

use std::collections::HashMap;
use std::time::Instant;

use crate::errors::RuntimeError;
use crate::history::History;

use aliases::AliasTable;
use arrays::{AssocArray, IndexedArray};
use functions::{CallFrame, FunctionRecord, MAX_POSITIONAL_PARAMS};
use options::{ShellOptions, ShoptOptions};
use variables::{VarValue, Variable};

pub const MAX_NAMEREF_DEPTH: usize = 10;
pub const MAX_DIR_STACK: usize = 32;
pub const MAX_FUNCTION_FRAMES: usize = 256;

/// Jobs, history, and signal-handler bodies all live in their own
/// top-level modules (`jobs`, `history`, `signals`); this struct is
/// the scalar/array/function/option core spec §3 enumerates.
#[derive(Debug)]
pub struct ShellState {
    globals: HashMap<String, Variable>,
    frames: Vec<CallFrame>,
    pub functions: HashMap<String, FunctionRecord>,
    pub aliases: AliasTable,
    pub options: ShellOptions,
    pub shopt: ShoptOptions,
    pub signal_handlers: HashMap<String, String>,
    pub dir_stack: Vec<String>,
    pub last_exit_code: i32,
    pub last_arg: String,
    pub last_background_pid: Option<u32>,
    pub current_line: u32,
    pub command_count: u64,
    pub shell_pid: u32,
    pub hash_table: HashMap<String, String>,
    pub history: History,
    top_level_positional: Vec<String>,
    start_time: Instant,
    pub break_request: u32,
    pub continue_request: u32,
}

impl ShellState {
    pub fn new() -> Self {
        let mut globals = HashMap::new();
        for (k, v) in std::env::vars() {
            let mut var = Variable::scalar(v);
            var.attrs.exported = true;
            globals.insert(k, var);
        }
        Self {
            globals,
            frames: Vec::new(),
            functions: HashMap::new(),
            aliases: AliasTable::new(),
            options: ShellOptions::default(),
            shopt: ShoptOptions::default(),
            signal_handlers: HashMap::new(),
            dir_stack: Vec::new(),
            last_exit_code: 0,
            last_arg: String::new(),
            last_background_pid: None,
            current_line: 1,
            command_count: 0,
            shell_pid: std::process::id(),
            hash_table: HashMap::new(),
            history: History::new(),
            top_level_positional: Vec::new(),
            start_time: Instant::now(),
            break_request: 0,
            continue_request: 0,
        }
    }

    // ---- Frames -------------------------------------------------------

    pub fn push_frame(&mut self, mut frame: CallFrame) -> Result<(), RuntimeError> {
        if self.frames.len() >= MAX_FUNCTION_FRAMES {
            return Err(RuntimeError::JobControl("function nesting too deep".to_string()));
        }
        frame.saved_last_arg = self.last_arg.clone();
        self.frames.push(frame);
        Ok(())
    }

    pub fn pop_frame(&mut self) -> Option<CallFrame> {
        let frame = self.frames.pop();
        if let Some(f) = &frame {
            self.last_arg = f.saved_last_arg.clone();
        }
        frame
    }

    pub fn current_frame(&self) -> Option<&CallFrame> {
        self.frames.last()
    }

    pub fn current_frame_mut(&mut self) -> Option<&mut CallFrame> {
        self.frames.last_mut()
    }

    pub fn call_depth(&self) -> usize {
        self.frames.len()
    }

    pub fn func_name_stack(&self) -> Vec<&str> {
        self.frames.iter().map(|f| f.function_name.as_str()).collect()
    }

    // ---- Positional parameters -----------------------------------------

    pub fn positional_params(&self) -> &[String] {
        match self.frames.last() {
            Some(f) => &f.positional_params,
            None => &self.top_level_positional,
        }
    }

    pub fn set_positional_params(&mut self, params: Vec<String>) {
        let params: Vec<String> = params.into_iter().take(MAX_POSITIONAL_PARAMS).collect();
        match self.frames.last_mut() {
            Some(f) => f.positional_params = params,
            None => self.top_level_positional = params,
        }
    }

    pub fn shift_positional(&mut self, n: usize) -> Result<(), RuntimeError> {
        let params = match self.frames.last_mut() {
            Some(f) => &mut f.positional_params,
            None => &mut self.top_level_positional,
        };
        if n > params.len() {
            return Err(RuntimeError::ShiftOutOfRange);
        }
        params.drain(0..n);
        Ok(())
    }

    // ---- Variable lookup ------------------------------------------------

    fn find_variable(&self, name: &str) -> Option<&Variable> {
        if let Some(frame) = self.frames.last() {
            if let Some(v) = frame.local_vars.get(name) {
                return Some(v);
            }
        }
        self.globals.get(name)
    }

    fn find_variable_mut(&mut self, name: &str) -> Option<&mut Variable> {
        if let Some(frame) = self.frames.last_mut() {
            if frame.local_vars.contains_key(name) {
                return frame.local_vars.get_mut(name);
            }
        }
        self.globals.get_mut(name)
    }

    /// Resolve a possible nameref chain to its terminal variable name
    /// (spec §3: depth <= 10, short-circuited past that).
    pub fn resolve_nameref<'a>(&'a self, name: &'a str) -> &'a str {
        let mut current = name;
        for _ in 0..MAX_NAMEREF_DEPTH {
            match self.find_variable(current) {
                Some(v) if v.attrs.nameref => match &v.value {
                    VarValue::Scalar(target) if !target.is_empty() => current = target.as_str(),
                    _ => break,
                },
                _ => break,
            }
        }
        current
    }

    /// `get(name)` — scalar value, nameref-resolved; `None` if unset.
    pub fn get(&self, name: &str) -> Option<String> {
        let target = self.resolve_nameref(name);
        self.find_variable(target).map(|v| v.value.as_scalar())
    }

    pub fn get_var(&self, name: &str) -> Option<&Variable> {
        let target = self.resolve_nameref(name);
        self.find_variable(target)
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.find_variable(self.resolve_nameref(name)).is_some()
    }

    pub fn is_readonly(&self, name: &str) -> bool {
        self.find_variable(name).map(|v| v.attrs.readonly).unwrap_or(false)
    }

    pub fn is_exported(&self, name: &str) -> bool {
        self.find_variable(name).map(|v| v.attrs.exported).unwrap_or(false)
    }

    /// `set(name, value)` — honors readonly, nameref, and case
    /// attributes; a frame-local shadow is updated in place if present.
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> Result<(), RuntimeError> {
        let target = self.resolve_nameref(name).to_string();
        if self.is_readonly(&target) {
            return Err(RuntimeError::ReadonlyViolation(target));
        }
        let mut value = value.into();
        if let Some(existing) = self.find_variable(&target) {
            value = existing.attrs.fold_case(&value);
        }
        match self.find_variable_mut(&target) {
            Some(v) => v.value = VarValue::Scalar(value),
            None => {
                self.insert_new(&target, Variable::scalar(value));
            }
        }
        self.run_env_hook(&target);
        Ok(())
    }

    pub fn append(&mut self, name: &str, value: impl Into<String>) -> Result<(), RuntimeError> {
        let target = self.resolve_nameref(name).to_string();
        if self.is_readonly(&target) {
            return Err(RuntimeError::ReadonlyViolation(target));
        }
        let existing = self.get(&target).unwrap_or_default();
        self.set(&target, format!("{existing}{}", value.into()))
    }

    fn insert_new(&mut self, name: &str, var: Variable) {
        if let Some(frame) = self.frames.last_mut() {
            frame.local_vars.insert(name.to_string(), var);
        } else {
            self.globals.insert(name.to_string(), var);
        }
    }

    pub fn unset(&mut self, name: &str) -> Result<(), RuntimeError> {
        if self.is_readonly(name) {
            return Err(RuntimeError::ReadonlyViolation(name.to_string()));
        }
        if let Some(frame) = self.frames.last_mut() {
            if frame.local_vars.remove(name).is_some() {
                return Ok(());
            }
        }
        self.globals.remove(name);
        Ok(())
    }

    pub fn declare_local(&mut self, name: &str, var: Variable) -> Result<(), RuntimeError> {
        match self.frames.last_mut() {
            Some(frame) => {
                frame.declare_local(name, var);
                Ok(())
            }
            None => {
                // `local` outside a function behaves like a global
                // assignment in bash; mirror that rather than erroring.
                self.globals.insert(name.to_string(), var);
                Ok(())
            }
        }
    }

    // ---- Attribute mutators ---------------------------------------------

    pub fn set_readonly(&mut self, name: &str) {
        self.ensure_exists(name);
        if let Some(v) = self.find_variable_mut(name) {
            v.attrs.readonly = true;
        }
    }

    pub fn set_exported(&mut self, name: &str, value: bool) {
        self.ensure_exists(name);
        if let Some(v) = self.find_variable_mut(name) {
            v.attrs.exported = value;
        }
    }

    pub fn set_integer_attr(&mut self, name: &str, value: bool) {
        self.ensure_exists(name);
        if let Some(v) = self.find_variable_mut(name) {
            v.attrs.integer = value;
        }
    }

    pub fn set_case_attr(&mut self, name: &str, upper: bool) {
        self.ensure_exists(name);
        if let Some(v) = self.find_variable_mut(name) {
            if upper {
                v.attrs.set_uppercase();
            } else {
                v.attrs.set_lowercase();
            }
        }
    }

    pub fn set_nameref_attr(&mut self, name: &str) {
        self.ensure_exists(name);
        if let Some(v) = self.find_variable_mut(name) {
            v.attrs.set_nameref();
        }
    }

    fn ensure_exists(&mut self, name: &str) {
        if self.find_variable(name).is_none() {
            self.insert_new(name, Variable::scalar(""));
        }
    }

    /// PWD/OLDPWD/PATH changes fire a hook (spec §4.E); our hook keeps
    /// the hash table valid since PATH mutation must invalidate it
    /// (spec §4.F).
    fn run_env_hook(&mut self, name: &str) {
        if name == "PATH" {
            self.hash_table.clear();
        }
    }

    // ---- Arrays ----------------------------------------------------------

    pub fn get_array(&self, name: &str) -> Option<&IndexedArray> {
        match &self.find_variable(self.resolve_nameref(name))?.value {
            VarValue::Indexed(a) => Some(a),
            _ => None,
        }
    }

    pub fn get_assoc(&self, name: &str) -> Option<&AssocArray> {
        match &self.find_variable(self.resolve_nameref(name))?.value {
            VarValue::Assoc(a) => Some(a),
            _ => None,
        }
    }

    pub fn set_array(&mut self, name: &str, array: IndexedArray) -> Result<(), RuntimeError> {
        let target = self.resolve_nameref(name).to_string();
        if self.is_readonly(&target) {
            return Err(RuntimeError::ReadonlyViolation(target));
        }
        match self.find_variable_mut(&target) {
            Some(v) => v.value = VarValue::Indexed(array),
            None => self.insert_new(&target, Variable::indexed(array)),
        }
        Ok(())
    }

    pub fn set_assoc(&mut self, name: &str, array: AssocArray) -> Result<(), RuntimeError> {
        let target = self.resolve_nameref(name).to_string();
        if self.is_readonly(&target) {
            return Err(RuntimeError::ReadonlyViolation(target));
        }
        match self.find_variable_mut(&target) {
            Some(v) => v.value = VarValue::Assoc(array),
            None => self.insert_new(&target, Variable::assoc(array)),
        }
        Ok(())
    }

    pub fn set_array_element(&mut self, name: &str, index: usize, value: String) -> Result<(), RuntimeError> {
        let target = self.resolve_nameref(name).to_string();
        if self.is_readonly(&target) {
            return Err(RuntimeError::ReadonlyViolation(target));
        }
        match self.find_variable_mut(&target) {
            Some(v) => match &mut v.value {
                VarValue::Indexed(a) => a.set(index, value),
                VarValue::Assoc(a) => a.set(index.to_string(), value),
                VarValue::Scalar(s) => {
                    let mut a = IndexedArray::from_values([std::mem::take(s)]);
                    a.set(index, value);
                    v.value = VarValue::Indexed(a);
                }
            },
            None => {
                let mut a = IndexedArray::new();
                a.set(index, value);
                self.insert_new(&target, Variable::indexed(a));
            }
        }
        Ok(())
    }

    pub fn set_assoc_element(&mut self, name: &str, key: String, value: String) -> Result<(), RuntimeError> {
        let target = self.resolve_nameref(name).to_string();
        if self.is_readonly(&target) {
            return Err(RuntimeError::ReadonlyViolation(target));
        }
        match self.find_variable_mut(&target) {
            Some(v) => match &mut v.value {
                VarValue::Assoc(a) => a.set(key, value),
                VarValue::Indexed(_) | VarValue::Scalar(_) => {
                    let mut a = AssocArray::new();
                    a.set(key, value);
                    v.value = VarValue::Assoc(a);
                }
            },
            None => {
                let mut a = AssocArray::new();
                a.set(key, value);
                self.insert_new(&target, Variable::assoc(a));
            }
        }
        Ok(())
    }

    // ---- Environment for child processes --------------------------------

    /// Mapping passed to `execve`/`Command::envs` for external programs.
    pub fn exported_env(&self) -> HashMap<String, String> {
        let mut env = HashMap::new();
        for (name, var) in &self.globals {
            if var.attrs.exported {
                env.insert(name.clone(), var.value.as_scalar());
            }
        }
        env.insert("SHLVL".to_string(), self.get("SHLVL").unwrap_or_else(|| "1".to_string()));
        env
    }

    pub fn all_variable_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.globals.keys().cloned().collect();
        if let Some(frame) = self.frames.last() {
            names.extend(frame.local_vars.keys().cloned());
        }
        names.sort();
        names.dedup();
        names
    }

    // ---- Special variables ------------------------------------------------

    /// `$SECONDS` — whole seconds since shell start.
    pub fn seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// `$RANDOM` — bash's 0-32767 range.
    pub fn next_random(&self) -> u16 {
        rand::random::<u16>() % 32768
    }

    /// `$SRANDOM` — a full-width draw, not folded into `$RANDOM`'s
    /// narrower range.
    pub fn next_srandom(&self) -> u32 {
        rand::random::<u32>()
    }

    pub fn push_dir(&mut self, dir: String) {
        if self.dir_stack.len() >= MAX_DIR_STACK {
            self.dir_stack.remove(0);
        }
        self.dir_stack.push(dir);
    }
}

impl Default for ShellState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readonly_rejects_assignment() {
        let mut s = ShellState::new();
        s.set("X", "1").unwrap();
        s.set_readonly("X");
        let err = s.set("X", "2").unwrap_err();
        assert!(matches!(err, RuntimeError::ReadonlyViolation(_)));
        assert_eq!(s.get("X"), Some("1".to_string()));
    }

    #[test]
    fn nameref_chain_resolves() {
        let mut s = ShellState::new();
        s.set("target", "value").unwrap();
        s.set("ref", "target").unwrap();
        s.set_nameref_attr("ref");
        assert_eq!(s.get("ref"), Some("value".to_string()));
    }

    #[test]
    fn shift_out_of_range_errors() {
        let mut s = ShellState::new();
        s.set_positional_params(vec!["a".into(), "b".into()]);
        assert!(s.shift_positional(5).is_err());
        assert!(s.shift_positional(2).is_ok());
        assert_eq!(s.positional_params().len(), 0);
    }

    #[test]
    fn local_shadows_global_in_frame() {
        let mut s = ShellState::new();
        s.set("x", "0").unwrap();
        s.push_frame(CallFrame::new("f".into(), vec![], 1, None)).unwrap();
        s.declare_local("x", Variable::scalar("1")).unwrap();
        assert_eq!(s.get("x"), Some("1".to_string()));
        s.pop_frame();
        assert_eq!(s.get("x"), Some("0".to_string()));
    }
}
