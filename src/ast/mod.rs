//! Abstract syntax tree for the shell grammar.
//!
//! `types` defines the complete node set produced by the parser
//! (tokens are consumed there and never escape into the AST).

pub mod types;

pub use types::*;
