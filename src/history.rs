//! Command history (spec §4.G `history`, ambient readline-adjacent
//! state bash keeps alongside the rest of the shell's state).
//!
//! Lives in memory for the duration of a run and is flushed to
//! `$HISTFILE` (default `~/.den_history`) on `Shell` shutdown, bounded
//! by `$HISTSIZE`/`$HISTFILESIZE` the way bash's own history library
//! trims on load/save.

use std::io::Write;
use std::path::PathBuf;

const DEFAULT_HISTSIZE: usize = 500;

#[derive(Debug, Default)]
pub struct History {
    entries: Vec<String>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, line: impl Into<String>) {
        let line = line.into();
        if line.trim().is_empty() {
            return;
        }
        self.entries.push(line);
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn truncate_to(&mut self, max: usize) {
        if self.entries.len() > max {
            let drop = self.entries.len() - max;
            self.entries.drain(0..drop);
        }
    }

    /// Load `$HISTFILE` (or the default path) into memory, bounded by
    /// `histsize`.
    pub fn load(&mut self, path: &PathBuf, histsize: usize) {
        if let Ok(text) = std::fs::read_to_string(path) {
            self.entries = text.lines().map(str::to_string).collect();
            self.truncate_to(histsize);
        }
    }

    pub fn save(&self, path: &PathBuf, histfilesize: usize) -> std::io::Result<()> {
        let start = self.entries.len().saturating_sub(histfilesize);
        let mut file = std::fs::File::create(path)?;
        for line in &self.entries[start..] {
            writeln!(file, "{line}")?;
        }
        Ok(())
    }
}

pub fn default_histfile() -> PathBuf {
    match std::env::var("HISTFILE") {
        Ok(p) if !p.is_empty() => PathBuf::from(p),
        _ => {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/".to_string());
            PathBuf::from(home).join(".den_history")
        }
    }
}

pub fn default_histsize() -> usize {
    std::env::var("HISTSIZE").ok().and_then(|s| s.parse().ok()).unwrap_or(DEFAULT_HISTSIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_skips_blank_lines() {
        let mut h = History::new();
        h.add("ls");
        h.add("");
        h.add("pwd");
        assert_eq!(h.entries(), &["ls".to_string(), "pwd".to_string()]);
    }

    #[test]
    fn truncate_keeps_most_recent() {
        let mut h = History::new();
        for i in 0..10 {
            h.add(format!("cmd{i}"));
        }
        h.truncate_to(3);
        assert_eq!(h.entries(), &["cmd7".to_string(), "cmd8".to_string(), "cmd9".to_string()]);
    }
}
