//! `shopt` and `set` (spec §4.E/§4.G).

use crate::executor::Executor;

/// `shopt [-s|-u] [-p] [-q] [name...]`.
pub fn shopt(exec: &mut Executor, args: &[String]) -> i32 {
    let mut mode: Option<bool> = None;
    let mut quiet = false;
    let mut print = false;
    let mut rest = args;
    while let Some(first) = rest.first() {
        match first.as_str() {
            "-s" => {
                mode = Some(true);
                rest = &rest[1..];
            }
            "-u" => {
                mode = Some(false);
                rest = &rest[1..];
            }
            "-q" => {
                quiet = true;
                rest = &rest[1..];
            }
            "-p" => {
                print = true;
                rest = &rest[1..];
            }
            _ => break,
        }
    }

    if rest.is_empty() {
        for name in crate::state::options::ShoptOptions::names() {
            print_shopt(exec, name, print);
        }
        return 0;
    }

    let mut rc = 0;
    for name in rest {
        match mode {
            Some(value) => {
                if !exec.state.shopt.set_by_name(name, value) {
                    super::report("shopt", format!("{name}: invalid shell option name"));
                    rc = 1;
                }
            }
            None => match exec.state.shopt.get_by_name(name) {
                Some(value) => {
                    if !quiet {
                        print_shopt(exec, name, print);
                    }
                    if !value {
                        rc = 1;
                    }
                }
                None => {
                    super::report("shopt", format!("{name}: invalid shell option name"));
                    rc = 1;
                }
            },
        }
    }
    rc
}

fn print_shopt(exec: &Executor, name: &str, as_command: bool) {
    let on = exec.state.shopt.get_by_name(name).unwrap_or(false);
    if as_command {
        println!("shopt -{} {name}", if on { "s" } else { "u" });
    } else {
        println!("{name}\t{}", if on { "on" } else { "off" });
    }
}

const SHORT_FLAG_OPTIONS: &[(char, &str)] = &[
    ('e', "errexit"),
    ('u', "nounset"),
    ('x', "xtrace"),
    ('v', "verbose"),
    ('f', "noglob"),
    ('C', "noclobber"),
    ('n', "noexec"),
    ('a', "allexport"),
    ('m', "monitor"),
    ('b', "notify"),
    ('T', "functrace"),
];

/// `set [-eux...] [-o name] [--] [args...]`; bare `set` with no
/// arguments prints every variable, matching bash.
pub fn set(exec: &mut Executor, args: &[String]) -> i32 {
    if args.is_empty() {
        for name in exec.state.all_variable_names() {
            if let Some(value) = exec.state.get(&name) {
                println!("{name}={value}");
            }
        }
        return 0;
    }

    let mut i = 0;
    let mut positional: Option<Vec<String>> = None;
    while i < args.len() {
        let arg = &args[i];
        if arg == "--" {
            positional = Some(args[i + 1..].to_vec());
            break;
        }
        if arg == "-o" || arg == "+o" {
            i += 1;
            let value = arg == "-o";
            match args.get(i) {
                Some(name) => {
                    if !exec.state.options.set_by_name(name, value) {
                        super::report("set", format!("{name}: invalid option name"));
                        return 1;
                    }
                }
                None => {
                    for name in crate::state::options::ShellOptions::names() {
                        println!("{name}\t\t{}", if exec.state.options.get_by_name(name).unwrap_or(false) { "on" } else { "off" });
                    }
                }
            }
            i += 1;
            continue;
        }
        if let Some(rest) = arg.strip_prefix('-').filter(|_| arg.len() > 1 && !arg.starts_with("--")) {
            apply_short_flags(exec, rest, true);
        } else if let Some(rest) = arg.strip_prefix('+').filter(|_| arg.len() > 1) {
            apply_short_flags(exec, rest, false);
        } else {
            positional = Some(args[i..].to_vec());
            break;
        }
        i += 1;
    }

    if let Some(params) = positional {
        exec.state.set_positional_params(params);
    }
    0
}

fn apply_short_flags(exec: &mut Executor, flags: &str, value: bool) {
    for ch in flags.chars() {
        if let Some((_, name)) = SHORT_FLAG_OPTIONS.iter().find(|(c, _)| *c == ch) {
            exec.state.options.set_by_name(name, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::JobManager;
    use crate::state::ShellState;

    #[test]
    fn shopt_toggle_round_trips() {
        let mut state = ShellState::new();
        let mut jobs = JobManager::new();
        let mut exec = Executor::new(&mut state, &mut jobs);
        assert_eq!(shopt(&mut exec, &["-s".to_string(), "globstar".to_string()]), 0);
        assert!(exec.state.shopt.globstar);
        assert_eq!(shopt(&mut exec, &["-u".to_string(), "globstar".to_string()]), 0);
        assert!(!exec.state.shopt.globstar);
    }

    #[test]
    fn set_short_flag_e_enables_errexit() {
        let mut state = ShellState::new();
        let mut jobs = JobManager::new();
        let mut exec = Executor::new(&mut state, &mut jobs);
        set(&mut exec, &["-e".to_string()]);
        assert!(exec.state.options.errexit);
        set(&mut exec, &["+e".to_string()]);
        assert!(!exec.state.options.errexit);
    }
}
