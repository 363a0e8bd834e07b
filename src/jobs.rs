//! Job Manager (spec §4.I, component I).
//!
//! Holds a fixed 16-slot table of background jobs. Reaping is a
//! single non-blocking step interleaved between prompts (spec §9
//! design note on "job reaping via non-blocking syscall"), never a
//! timer: `check_completed` is called once per prompt cycle and once
//! after every foreground command.

use std::fmt;

pub const MAX_JOBS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Running,
    Stopped,
    Done(i32),
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "Running"),
            Self::Stopped => write!(f, "Stopped"),
            Self::Done(code) => write!(f, "Done({code})"),
        }
    }
}

/// A single background job; `pids` holds every process in the
/// pipeline so `kill`/`wait` can address the whole group.
#[derive(Debug, Clone)]
pub struct Job {
    pub job_id: u32,
    pub pids: Vec<i32>,
    pub pgid: i32,
    pub command: String,
    pub status: JobStatus,
    pub notified: bool,
}

#[derive(Debug, Default)]
pub struct JobManager {
    slots: Vec<Option<Job>>,
    next_job_id: u32,
    pub last_background_pid: Option<i32>,
    pub current_job: Option<u32>,
}

impl JobManager {
    pub fn new() -> Self {
        Self { slots: Vec::new(), next_job_id: 1, last_background_pid: None, current_job: None }
    }

    /// `add(pid, cmd)` — spec §4.I: assign next job_id, print `[id] pid`.
    pub fn add(&mut self, pids: Vec<i32>, pgid: i32, command: String) -> Option<u32> {
        if self.active_count() >= MAX_JOBS {
            return None;
        }
        let job_id = self.next_job_id;
        self.next_job_id += 1;
        let lead_pid = pids.first().copied().unwrap_or(pgid);
        self.last_background_pid = Some(lead_pid);
        let job = Job { job_id, pids, pgid, command, status: JobStatus::Running, notified: false };
        eprintln!("[{job_id}] {lead_pid}");
        if let Some(slot) = self.slots.iter_mut().find(|s| s.is_none()) {
            *slot = Some(job);
        } else {
            self.slots.push(Some(job));
        }
        self.current_job = Some(job_id);
        Some(job_id)
    }

    fn active_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn get(&self, job_id: u32) -> Option<&Job> {
        self.slots.iter().flatten().find(|j| j.job_id == job_id)
    }

    pub fn get_mut(&mut self, job_id: u32) -> Option<&mut Job> {
        self.slots.iter_mut().flatten().find(|j| j.job_id == job_id)
    }

    pub fn find_by_pid(&mut self, pid: i32) -> Option<&mut Job> {
        self.slots.iter_mut().flatten().find(|j| j.pids.contains(&pid))
    }

    pub fn remove(&mut self, job_id: u32) -> Option<Job> {
        for slot in &mut self.slots {
            if matches!(slot, Some(j) if j.job_id == job_id) {
                return slot.take();
            }
        }
        None
    }

    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.slots.iter().flatten()
    }

    pub fn most_recent_job_id(&self) -> Option<u32> {
        self.slots.iter().flatten().map(|j| j.job_id).max()
    }

    /// Resolve a `%N`/`%%`/`%+`/`%-`/`%string` job spec to a job id.
    pub fn resolve_spec(&self, spec: &str) -> Option<u32> {
        let spec = spec.strip_prefix('%').unwrap_or(spec);
        if spec.is_empty() || spec == "%" || spec == "+" {
            return self.current_job;
        }
        if spec == "-" {
            let mut ids: Vec<u32> = self.slots.iter().flatten().map(|j| j.job_id).collect();
            ids.sort_unstable();
            ids.pop();
            return ids.pop();
        }
        if let Ok(n) = spec.parse::<u32>() {
            return self.get(n).map(|j| j.job_id);
        }
        if let Some(prefix) = spec.strip_prefix('?') {
            return self.slots.iter().flatten().find(|j| j.command.contains(prefix)).map(|j| j.job_id);
        }
        self.slots.iter().flatten().find(|j| j.command.starts_with(spec)).map(|j| j.job_id)
    }

    /// Non-blocking reap of every running slot (spec §4.I
    /// `check_completed`); returns the jobs that finished this pass so
    /// the caller can print `[id] Done(code) cmd` and, for `wait`,
    /// know when to stop polling.
    pub fn check_completed(&mut self) -> Vec<Job> {
        let mut finished = Vec::new();
        for slot in &mut self.slots {
            let done = match slot {
                Some(job) if matches!(job.status, JobStatus::Running) => {
                    if let Some(code) = reap_nonblocking(job.pgid) {
                        job.status = JobStatus::Done(code);
                        true
                    } else {
                        false
                    }
                }
                _ => false,
            };
            if done {
                if let Some(job) = slot.take() {
                    finished.push(job);
                }
            }
        }
        for job in &finished {
            eprintln!("[{}] {} {}", job.job_id, job.status, job.command);
        }
        finished
    }

    /// On shell shutdown: terminate, briefly wait, then force-kill any
    /// survivors (spec §4.I `kill_all`).
    pub fn kill_all(&mut self) {
        for job in self.slots.iter().flatten() {
            if matches!(job.status, JobStatus::Running | JobStatus::Stopped) {
                unsafe {
                    libc::kill(-job.pgid, libc::SIGTERM);
                }
            }
        }
        std::thread::sleep(std::time::Duration::from_millis(200));
        for job in self.slots.iter().flatten() {
            if matches!(job.status, JobStatus::Running | JobStatus::Stopped) {
                unsafe {
                    libc::kill(-job.pgid, libc::SIGKILL);
                    let mut status = 0;
                    libc::waitpid(-job.pgid, &mut status, libc::WNOHANG);
                }
            }
        }
        self.slots.clear();
    }
}

/// `waitpid(pgid, WNOHANG)` once; returns `Some(exit_code)` once the
/// whole process group has exited, `None` if still running.
fn reap_nonblocking(pgid: i32) -> Option<i32> {
    let mut status: i32 = 0;
    let ret = unsafe { libc::waitpid(-pgid, &mut status, libc::WNOHANG) };
    if ret <= 0 {
        return None;
    }
    Some(exit_code_from_status(status))
}

pub fn exit_code_from_status(status: i32) -> i32 {
    unsafe {
        if libc::WIFEXITED(status) {
            libc::WEXITSTATUS(status)
        } else if libc::WIFSIGNALED(status) {
            128 + libc::WTERMSIG(status)
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_current_job() {
        let mut jm = JobManager::new();
        jm.add(vec![111], 111, "sleep 5".into());
        assert_eq!(jm.resolve_spec("%%"), Some(1));
        assert_eq!(jm.resolve_spec("%1"), Some(1));
    }

    #[test]
    fn job_table_bounded() {
        let mut jm = JobManager::new();
        for i in 0..MAX_JOBS {
            assert!(jm.add(vec![1000 + i as i32], 1000 + i as i32, "x".into()).is_some());
        }
        assert!(jm.add(vec![9999], 9999, "overflow".into()).is_none());
    }
}
