//! Alias table (spec §3 `aliases`, §4.C E1).

use indexmap::IndexMap;

pub const MAX_ALIAS_EXPANSION_DEPTH: usize = 32;

/// Command names that shadow aliases even when an alias of the same
/// name exists — spec §4.C E1's closed set of reserved builtins.
pub const ALIAS_SHADOW_BUILTINS: &[&str] = &[
    "str", "path", "math", "date", "into", "from", "to", "encode",
    "decode", "detect", "explore", "generate", "par-each", "seq-char",
    "bench", "watch", "use",
];

#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    aliases: IndexMap<String, String>,
    /// `alias -s ext=cmd` suffix aliases, keyed by file extension.
    suffix_aliases: IndexMap<String, String>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, name: impl Into<String>, expansion: impl Into<String>) {
        self.aliases.insert(name.into(), expansion.into());
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.aliases.shift_remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.aliases.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.aliases.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn define_suffix(&mut self, ext: impl Into<String>, cmd: impl Into<String>) {
        self.suffix_aliases.insert(ext.into(), cmd.into());
    }

    pub fn remove_suffix(&mut self, ext: &str) -> bool {
        self.suffix_aliases.shift_remove(ext).is_some()
    }

    pub fn get_suffix(&self, ext: &str) -> Option<&str> {
        self.suffix_aliases.get(ext).map(String::as_str)
    }

    pub fn iter_suffix(&self) -> impl Iterator<Item = (&str, &str)> {
        self.suffix_aliases.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_shadowed(name: &str) -> bool {
        ALIAS_SHADOW_BUILTINS.contains(&name)
    }
}
