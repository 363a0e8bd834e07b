//! `jobs`, `fg`, `bg`, `wait`, `kill`, `disown` (spec §4.I).

use crate::errors::ShellResult;
use crate::executor::Executor;
use crate::jobs::{exit_code_from_status, JobStatus};

pub fn jobs(exec: &mut Executor, args: &[String]) -> i32 {
    let long = args.iter().any(|a| a == "-l");
    let pids_only = args.iter().any(|a| a == "-p");
    let running_only = args.iter().any(|a| a == "-r");
    let stopped_only = args.iter().any(|a| a == "-s");

    for job in exec.jobs.iter() {
        if running_only && !matches!(job.status, JobStatus::Running) {
            continue;
        }
        if stopped_only && !matches!(job.status, JobStatus::Stopped) {
            continue;
        }
        if pids_only {
            println!("{}", job.pids.first().copied().unwrap_or(job.pgid));
        } else if long {
            println!("[{}] {} {} {}", job.job_id, job.pgid, job.status, job.command);
        } else {
            println!("[{}] {} {}", job.job_id, job.status, job.command);
        }
    }
    0
}

fn spec_to_job(exec: &Executor, spec: Option<&String>) -> Option<u32> {
    match spec {
        Some(s) => exec.jobs.resolve_spec(s),
        None => exec.jobs.current_job,
    }
}

/// `fg [%job]` — bring a job to the foreground: hand it the
/// controlling terminal, `SIGCONT` it if stopped, then block until it
/// finishes or stops again.
pub fn fg(exec: &mut Executor, args: &[String]) -> ShellResult<i32> {
    let Some(job_id) = spec_to_job(exec, args.first()) else {
        super::report("fg", "no current job");
        return Ok(1);
    };
    let Some(job) = exec.jobs.get(job_id).cloned() else {
        super::report("fg", "no such job");
        return Ok(1);
    };
    println!("{}", job.command);

    unsafe {
        libc::tcsetpgrp(0, job.pgid);
        libc::kill(-job.pgid, libc::SIGCONT);
    }

    let mut status = 0;
    let ret = unsafe { libc::waitpid(-job.pgid, &mut status, libc::WUNTRACED) };

    unsafe {
        libc::tcsetpgrp(0, libc::getpgrp());
    }

    if ret > 0 && unsafe { libc::WIFSTOPPED(status) } {
        if let Some(j) = exec.jobs.get_mut(job_id) {
            j.status = JobStatus::Stopped;
        }
        return Ok(128 + unsafe { libc::WSTOPSIG(status) });
    }

    exec.jobs.remove(job_id);
    Ok(if ret > 0 { exit_code_from_status(status) } else { 0 })
}

/// `bg [%job]` — resume a stopped job in the background.
pub fn bg(exec: &mut Executor, args: &[String]) -> i32 {
    let Some(job_id) = spec_to_job(exec, args.first()) else {
        super::report("bg", "no current job");
        return 1;
    };
    let Some(job) = exec.jobs.get_mut(job_id) else {
        super::report("bg", "no such job");
        return 1;
    };
    unsafe { libc::kill(-job.pgid, libc::SIGCONT) };
    job.status = JobStatus::Running;
    println!("[{}] {}", job.job_id, job.command);
    0
}

/// `wait [%job|pid]...` — block until the named jobs (or all
/// background jobs) finish, reaping them via non-blocking polls.
pub fn wait(exec: &mut Executor, args: &[String]) -> i32 {
    let targets: Vec<u32> = if args.is_empty() {
        exec.jobs.iter().map(|j| j.job_id).collect()
    } else {
        args.iter().filter_map(|a| exec.jobs.resolve_spec(a)).collect()
    };

    let mut last_code = 0;
    loop {
        let finished = exec.jobs.check_completed();
        for job in &finished {
            if targets.contains(&job.job_id) {
                if let JobStatus::Done(code) = job.status {
                    last_code = code;
                }
            }
        }
        if targets.iter().all(|t| exec.jobs.get(*t).is_none()) {
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(20));
    }
    last_code
}

/// `kill [-SIGNAME|-N] %job|pid...`.
pub fn kill(exec: &mut Executor, args: &[String]) -> i32 {
    let mut signal = libc::SIGTERM;
    let mut rest = args;
    if let Some(first) = rest.first() {
        if let Some(spec) = first.strip_prefix('-') {
            if let Ok(n) = spec.parse::<i32>() {
                signal = n;
                rest = &rest[1..];
            } else if let Some(sig) = crate::signals::normalize_condition(spec).and_then(|n| signal_for_name(&n)) {
                signal = sig;
                rest = &rest[1..];
            }
        }
    }
    if rest.is_empty() {
        super::report("kill", "usage: kill [-sig] pid|%job ...");
        return 1;
    }
    let mut rc = 0;
    for target in rest {
        let pid = if target.starts_with('%') {
            exec.jobs.resolve_spec(target).and_then(|job_id| exec.jobs.get(job_id)).map(|j| -j.pgid)
        } else {
            target.parse::<i32>().ok()
        };
        match pid {
            Some(p) => {
                if unsafe { libc::kill(p, signal) } != 0 {
                    super::report("kill", format!("({target}) - no such process"));
                    rc = 1;
                }
            }
            None => {
                super::report("kill", format!("{target}: arguments must be process or job IDs"));
                rc = 1;
            }
        }
    }
    rc
}

fn signal_for_name(name: &str) -> Option<i32> {
    Some(match name {
        "HUP" => libc::SIGHUP,
        "INT" => libc::SIGINT,
        "QUIT" => libc::SIGQUIT,
        "KILL" => libc::SIGKILL,
        "TERM" => libc::SIGTERM,
        "STOP" => libc::SIGSTOP,
        "CONT" => libc::SIGCONT,
        "USR1" => libc::SIGUSR1,
        "USR2" => libc::SIGUSR2,
        _ => return None,
    })
}

/// `disown [%job...]` — stop tracking a job without signaling it.
pub fn disown(exec: &mut Executor, args: &[String]) -> i32 {
    if args.is_empty() {
        if let Some(id) = exec.jobs.current_job {
            exec.jobs.remove(id);
        }
        return 0;
    }
    for spec in args {
        if let Some(id) = exec.jobs.resolve_spec(spec) {
            exec.jobs.remove(id);
        }
    }
    0
}
