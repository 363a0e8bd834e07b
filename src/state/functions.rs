//! User-defined functions and the call-frame stack (spec §3 `functions`,
//! `function_frames`, `positional_params`).

use std::collections::HashMap;

use crate::ast::{FunctionDefNode, TypedParam};

use super::variables::Variable;

/// A registered function: `name() { ... }`, `function name { ... }`,
/// or `def name [params] -> type { ... }`.
#[derive(Debug, Clone)]
pub struct FunctionRecord {
    pub def: FunctionDefNode,
    pub typed_params: Option<Vec<TypedParam>>,
    pub return_type: Option<String>,
    pub source_file: Option<String>,
}

impl FunctionRecord {
    pub fn from_def(def: FunctionDefNode) -> Self {
        let typed_params = def.typed_params.clone();
        let return_type = def.return_type.clone();
        let source_file = def.source_file.clone();
        Self { def, typed_params, return_type, source_file }
    }
}

pub const MAX_POSITIONAL_PARAMS: usize = 64;

/// One function-call (or `source`'d script) frame: local variables,
/// positional parameters, and the saved `$_` that a returning frame
/// restores (spec §3 `function_frames`).
#[derive(Debug, Clone, Default)]
pub struct CallFrame {
    pub local_vars: HashMap<String, Variable>,
    /// Names `local`-declared in this frame, in declaration order, so
    /// `unset` inside the frame can fall back to a shadowed outer value
    /// (bash's `localvar_unset` semantics are approximated: we simply
    /// drop the local, re-exposing the global of the same name).
    pub local_order: Vec<String>,
    pub positional_params: Vec<String>,
    pub saved_last_arg: String,
    pub function_name: String,
    pub call_line: u32,
    pub source_file: Option<String>,
}

impl CallFrame {
    pub fn new(function_name: String, args: Vec<String>, call_line: u32, source_file: Option<String>) -> Self {
        Self {
            local_vars: HashMap::new(),
            local_order: Vec::new(),
            positional_params: args,
            saved_last_arg: String::new(),
            function_name,
            call_line,
            source_file,
        }
    }

    pub fn declare_local(&mut self, name: &str, var: Variable) {
        if !self.local_vars.contains_key(name) {
            self.local_order.push(name.to_string());
        }
        self.local_vars.insert(name.to_string(), var);
    }
}
