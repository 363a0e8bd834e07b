//! Everything else in the regular builtin set that doesn't warrant its
//! own file: `alias`/`unalias`, `hash`, `type`, `history`, `getopts`,
//! the `complete`/`compgen`/`compopt` stub, `umask`, `ulimit`, `times`,
//! `enable`, `help`, `suspend`, `caller` (spec §4.G).

use crate::dispatcher::{self, Resolution};
use crate::executor::Executor;

pub fn alias(exec: &mut Executor, args: &[String]) -> i32 {
    let mut rest = args;
    let suffix = rest.first().map(String::as_str) == Some("-s");
    if suffix {
        rest = &rest[1..];
    }

    if rest.is_empty() {
        let entries: Vec<(String, String)> = if suffix {
            exec.state.aliases.iter_suffix().map(|(k, v)| (k.to_string(), v.to_string())).collect()
        } else {
            exec.state.aliases.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
        };
        for (name, expansion) in entries {
            println!("alias {name}='{expansion}'");
        }
        return 0;
    }

    let mut rc = 0;
    for arg in rest {
        match arg.split_once('=') {
            Some((name, expansion)) => {
                if suffix {
                    exec.state.aliases.define_suffix(name, expansion);
                } else {
                    exec.state.aliases.define(name, expansion);
                }
            }
            None => {
                let found = if suffix { exec.state.aliases.get_suffix(arg).map(str::to_string) } else { exec.state.aliases.get(arg).map(str::to_string) };
                match found {
                    Some(expansion) => println!("alias {arg}='{expansion}'"),
                    None => {
                        super::report("alias", format!("{arg}: not found"));
                        rc = 1;
                    }
                }
            }
        }
    }
    rc
}

pub fn unalias(exec: &mut Executor, args: &[String]) -> i32 {
    let mut rest = args;
    if rest.first().map(String::as_str) == Some("-a") {
        exec.state.aliases = crate::state::aliases::AliasTable::new();
        return 0;
    }
    let suffix = rest.first().map(String::as_str) == Some("-s");
    if suffix {
        rest = &rest[1..];
    }
    let mut rc = 0;
    for name in rest {
        let removed = if suffix { exec.state.aliases.remove_suffix(name) } else { exec.state.aliases.remove(name) };
        if !removed {
            super::report("unalias", format!("{name}: not found"));
            rc = 1;
        }
    }
    rc
}

pub fn hash(exec: &mut Executor, args: &[String]) -> i32 {
    if args.first().map(String::as_str) == Some("-r") {
        exec.state.hash_table.clear();
        return 0;
    }
    if args.is_empty() {
        for (name, path) in &exec.state.hash_table {
            println!("{path}\t{name}");
        }
        return 0;
    }
    for name in args {
        if let Ok(Resolution::External(path)) = dispatcher::resolve(exec.state, name) {
            exec.state.hash_table.insert(name.clone(), path.to_string_lossy().into_owned());
        }
    }
    0
}

pub fn type_cmd(exec: &mut Executor, args: &[String]) -> i32 {
    let mut rc = 0;
    for name in args {
        if let Some(expansion) = exec.state.aliases.get(name) {
            println!("{name} is aliased to `{expansion}'");
            continue;
        }
        match dispatcher::resolve(exec.state, name) {
            Ok(Resolution::SpecialBuiltin(n)) => println!("{n} is a special shell builtin"),
            Ok(Resolution::Builtin(n)) => println!("{n} is a shell builtin"),
            Ok(Resolution::Function(n)) => println!("{n} is a function"),
            Ok(Resolution::External(p)) => println!("{name} is {}", p.display()),
            Err(_) => {
                super::report("type", format!("{name}: not found"));
                rc = 1;
            }
        }
    }
    rc
}

pub fn history(exec: &mut Executor, args: &[String]) -> i32 {
    if args.first().map(String::as_str) == Some("-c") {
        exec.state.history.clear();
        return 0;
    }
    let limit = args.first().and_then(|s| s.parse::<usize>().ok());
    let entries: Vec<&String> = match limit {
        Some(n) => exec.state.history.entries().iter().rev().take(n).rev().collect(),
        None => exec.state.history.entries().iter().collect(),
    };
    let start = exec.state.history.entries().len() - entries.len() + 1;
    for (i, line) in entries.iter().enumerate() {
        println!("{:5}  {line}", start + i);
    }
    0
}

/// Classic POSIX `getopts optstring name [args...]`, driven off
/// `OPTIND` (1-based, stored in shell state so repeated calls advance).
pub fn getopts(exec: &mut Executor, args: &[String]) -> i32 {
    let Some(optstring) = args.first() else {
        super::report("getopts", "usage: getopts optstring name [arg...]");
        return 2;
    };
    let Some(var_name) = args.get(1) else {
        super::report("getopts", "usage: getopts optstring name [arg...]");
        return 2;
    };
    let operands: Vec<String> = if args.len() > 2 { args[2..].to_vec() } else { exec.state.positional_params().to_vec() };

    let optind: usize = exec.state.get("OPTIND").and_then(|s| s.parse().ok()).unwrap_or(1);
    let idx = optind.saturating_sub(1);
    let Some(current) = operands.get(idx) else {
        let _ = exec.state.set(var_name, "?");
        return 1;
    };
    if current == "--" || !current.starts_with('-') || current.len() < 2 {
        let _ = exec.state.set(var_name, "?");
        return 1;
    }

    let opt_char = current.chars().nth(1).unwrap();
    let silent = optstring.starts_with(':');
    let spec = optstring.trim_start_matches(':');

    if !spec.contains(opt_char) {
        if silent {
            let _ = exec.state.set(var_name, opt_char.to_string());
            let _ = exec.state.set("OPTARG", opt_char.to_string());
        } else {
            super::report("getopts", format!("illegal option -- {opt_char}"));
            let _ = exec.state.set(var_name, "?");
        }
        let _ = exec.state.set("OPTIND", (optind + 1).to_string());
        return 0;
    }

    let needs_arg = spec.find(opt_char).map(|p| spec[p + 1..].starts_with(':')).unwrap_or(false);
    let _ = exec.state.set(var_name, opt_char.to_string());

    if needs_arg {
        if current.len() > 2 {
            let _ = exec.state.set("OPTARG", current[2..].to_string());
            let _ = exec.state.set("OPTIND", (optind + 1).to_string());
        } else if let Some(next) = operands.get(idx + 1) {
            let _ = exec.state.set("OPTARG", next.clone());
            let _ = exec.state.set("OPTIND", (optind + 2).to_string());
        } else if silent {
            let _ = exec.state.set("OPTARG", opt_char.to_string());
            let _ = exec.state.set(var_name, ":");
            let _ = exec.state.set("OPTIND", (optind + 1).to_string());
        } else {
            super::report("getopts", format!("option requires an argument -- {opt_char}"));
            let _ = exec.state.set(var_name, "?");
            let _ = exec.state.set("OPTIND", (optind + 1).to_string());
        }
    } else {
        let _ = exec.state.set("OPTIND", (optind + 1).to_string());
    }
    0
}

/// `complete`/`compgen`/`compopt` are consumed by an interactive line
/// editor that sits outside this evaluator; stored so the commands
/// round-trip, but nothing here drives completion itself.
pub fn completion_stub(exec: &mut Executor, name: &str, args: &[String]) -> i32 {
    match name {
        "compgen" => {
            for word in args.iter().skip(1) {
                println!("{word}");
            }
            0
        }
        _ => {
            let _ = (exec, args);
            0
        }
    }
}

pub fn umask(_exec: &mut Executor, args: &[String]) -> i32 {
    match args.first() {
        None => {
            let current = unsafe {
                let m = libc::umask(0);
                libc::umask(m);
                m
            };
            println!("{current:04o}");
            0
        }
        Some(mode) => match u32::from_str_radix(mode, 8) {
            Ok(m) => {
                unsafe { libc::umask(m as libc::mode_t) };
                0
            }
            Err(_) => {
                super::report("umask", format!("{mode}: invalid octal number"));
                1
            }
        },
    }
}

pub fn ulimit(_exec: &mut Executor, args: &[String]) -> i32 {
    let resource = if args.iter().any(|a| a == "-n") { libc::RLIMIT_NOFILE } else { libc::RLIMIT_FSIZE };
    let mut limit = libc::rlimit { rlim_cur: 0, rlim_max: 0 };
    if unsafe { libc::getrlimit(resource, &mut limit) } != 0 {
        super::report("ulimit", "cannot query limit");
        return 1;
    }
    if limit.rlim_cur == libc::RLIM_INFINITY {
        println!("unlimited");
    } else {
        println!("{}", limit.rlim_cur);
    }
    0
}

pub fn times(_exec: &mut Executor, _args: &[String]) -> i32 {
    let mut buf: libc::tms = unsafe { std::mem::zeroed() };
    unsafe { libc::times(&mut buf) };
    let ticks = unsafe { libc::sysconf(libc::_SC_CLK_TCK) }.max(1);
    println!("{:.3}s {:.3}s", buf.tms_utime as f64 / ticks as f64, buf.tms_stime as f64 / ticks as f64);
    println!("{:.3}s {:.3}s", buf.tms_cutime as f64 / ticks as f64, buf.tms_cstime as f64 / ticks as f64);
    0
}

pub fn enable(_exec: &mut Executor, args: &[String]) -> i32 {
    for name in args {
        if !dispatcher::SPECIAL_BUILTINS.contains(&name.as_str()) && !dispatcher::REGULAR_BUILTINS.contains(&name.as_str()) {
            super::report("enable", format!("{name}: not a shell builtin"));
            return 1;
        }
    }
    0
}

pub fn help(_exec: &mut Executor, args: &[String]) -> i32 {
    if args.is_empty() {
        for name in dispatcher::SPECIAL_BUILTINS.iter().chain(dispatcher::REGULAR_BUILTINS) {
            println!("{name}");
        }
    } else {
        for name in args {
            println!("{name}: a shell builtin");
        }
    }
    0
}

pub fn suspend(_exec: &mut Executor, _args: &[String]) -> i32 {
    unsafe { libc::kill(libc::getpid(), libc::SIGSTOP) };
    0
}

pub fn caller(exec: &mut Executor, _args: &[String]) -> i32 {
    match exec.state.current_frame() {
        Some(frame) => {
            println!("{} {}", exec.state.current_line, frame.function_name);
            0
        }
        None => 1,
    }
}
