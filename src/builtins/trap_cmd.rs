//! `trap` (spec §4.G, §5).

use crate::executor::Executor;
use crate::signals;

/// `trap [-lp] [[body] condition...]`.
pub fn trap(exec: &mut Executor, args: &[String]) -> i32 {
    if args.first().map(String::as_str) == Some("-l") {
        for (i, name) in signals::SIGNAL_NAMES.iter().enumerate() {
            println!("{}) SIG{name}", i + 1);
        }
        return 0;
    }
    if args.first().map(String::as_str) == Some("-p") {
        let conditions = &args[1..];
        if conditions.is_empty() {
            for (cond, body) in &exec.state.signal_handlers {
                println!("trap -- '{body}' {cond}");
            }
        } else {
            for cond in conditions {
                if let Some(norm) = signals::normalize_condition(cond) {
                    if let Some(body) = exec.state.signal_handlers.get(&norm) {
                        println!("trap -- '{body}' {norm}");
                    }
                }
            }
        }
        return 0;
    }
    if args.is_empty() {
        for (cond, body) in &exec.state.signal_handlers {
            println!("trap -- '{body}' {cond}");
        }
        return 0;
    }

    let (body, conditions) = (&args[0], &args[1..]);
    if conditions.is_empty() {
        super::report("trap", "usage: trap [-lp] [[arg] signal_spec...]");
        return 2;
    }
    let body_opt = if body == "-" { None } else { Some(body.as_str()) };
    let mut rc = 0;
    for cond in conditions {
        match signals::normalize_condition(cond) {
            Some(norm) => {
                if signals::set_trap(exec, &norm, body_opt).is_err() {
                    rc = 1;
                }
            }
            None => {
                super::report("trap", format!("{cond}: invalid signal specification"));
                rc = 1;
            }
        }
    }
    rc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::JobManager;
    use crate::state::ShellState;

    #[test]
    fn sets_and_clears_exit_trap() {
        let mut state = ShellState::new();
        let mut jobs = JobManager::new();
        let mut exec = Executor::new(&mut state, &mut jobs);
        assert_eq!(trap(&mut exec, &["echo bye".to_string(), "EXIT".to_string()]), 0);
        assert!(exec.state.signal_handlers.contains_key("EXIT"));
        assert_eq!(trap(&mut exec, &["-".to_string(), "EXIT".to_string()]), 0);
        assert!(!exec.state.signal_handlers.contains_key("EXIT"));
    }
}
