//! Startup file sourcing: `~/.denrc` for interactive shells, `$ENV`
//! for non-interactive ones (spec §4.H "Shell driver").

use crate::executor::Executor;

pub fn default_rcfile() -> std::path::PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/".to_string());
    std::path::Path::new(&home).join(".denrc")
}

/// Source `path` if it exists; missing is not an error (bash behaves
/// the same way for an absent rcfile).
pub fn source_if_present(exec: &mut Executor, path: &std::path::Path) -> crate::errors::ShellResult<()> {
    if !path.exists() {
        return Ok(());
    }
    let Ok(text) = std::fs::read_to_string(path) else { return Ok(()) };
    match crate::parser::parse_script(&text) {
        Ok(script) => {
            exec.execute_script(&script)?;
            Ok(())
        }
        Err(e) => {
            eprintln!("den: {}: {e}", path.display());
            Ok(())
        }
    }
}
