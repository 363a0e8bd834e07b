//! Scalar/array variable storage and attributes (spec §3 `environment`,
//! `arrays`, `assoc_arrays`, `var_attributes`).

use super::arrays::{AssocArray, IndexedArray};

/// Attribute set attached to one variable name (spec §3
/// `var_attributes`). `{indexed, associative, nameref}` and
/// `{lowercase, uppercase}` are mutually exclusive per name; the
/// setters below enforce that by clearing the opposing bit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VarAttributes {
    pub readonly: bool,
    pub integer: bool,
    pub lowercase: bool,
    pub uppercase: bool,
    pub exported: bool,
    pub nameref: bool,
    pub indexed: bool,
    pub associative: bool,
    pub immutable: bool,
}

impl VarAttributes {
    pub fn set_lowercase(&mut self) {
        self.lowercase = true;
        self.uppercase = false;
    }

    pub fn set_uppercase(&mut self) {
        self.uppercase = true;
        self.lowercase = false;
    }

    pub fn set_indexed(&mut self) {
        self.indexed = true;
        self.associative = false;
        self.nameref = false;
    }

    pub fn set_associative(&mut self) {
        self.associative = true;
        self.indexed = false;
        self.nameref = false;
    }

    pub fn set_nameref(&mut self) {
        self.nameref = true;
        self.indexed = false;
        self.associative = false;
    }

    /// Apply this attribute set's case-folding to a scalar about to be stored.
    pub fn fold_case(&self, value: &str) -> String {
        if self.uppercase {
            value.to_uppercase()
        } else if self.lowercase {
            value.to_lowercase()
        } else {
            value.to_string()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum VarValue {
    Scalar(String),
    Indexed(IndexedArray),
    Assoc(AssocArray),
}

impl VarValue {
    /// Scalar rendering used by plain `$NAME`/`${NAME}` — index 0 for
    /// an indexed array, first-inserted entry for an associative array.
    pub fn as_scalar(&self) -> String {
        match self {
            Self::Scalar(s) => s.clone(),
            Self::Indexed(a) => a.get(0).unwrap_or("").to_string(),
            Self::Assoc(a) => a.values().next().unwrap_or("").to_string(),
        }
    }

    pub fn is_unset_scalar(&self) -> bool {
        matches!(self, Self::Scalar(s) if s.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub value: VarValue,
    pub attrs: VarAttributes,
}

impl Variable {
    pub fn scalar(value: impl Into<String>) -> Self {
        Self { value: VarValue::Scalar(value.into()), attrs: VarAttributes::default() }
    }

    pub fn indexed(array: IndexedArray) -> Self {
        let mut attrs = VarAttributes::default();
        attrs.set_indexed();
        Self { value: VarValue::Indexed(array), attrs }
    }

    pub fn assoc(array: AssocArray) -> Self {
        let mut attrs = VarAttributes::default();
        attrs.set_associative();
        Self { value: VarValue::Assoc(array), attrs }
    }
}
