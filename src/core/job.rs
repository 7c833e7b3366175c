use std::fmt;

use nix::unistd::Pid;

use crate::errors::{Error, Result};

/// Default number of background jobs that can be tracked at once.
pub const JOB_TABLE_CAPACITY: usize = 64;

/// Background jobs awaiting a completion notice, in launch order.
///
/// Only the launcher inserts and only the completion notifier removes.
#[derive(Clone, Debug, PartialEq)]
pub struct JobTable {
    pids: Vec<Pid>,
    capacity: usize,
}

impl JobTable {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pids: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Starts tracking `pid`. Fails when the table is full, in which case the
    /// process runs untracked and its completion is never announced.
    pub fn insert(&mut self, pid: Pid) -> Result<()> {
        if self.pids.len() >= self.capacity {
            return Err(Error::job_table_full(self.capacity));
        }

        self.pids.push(pid);
        Ok(())
    }

    /// Stops tracking `pid`, keeping the remaining jobs in order. Returns
    /// whether `pid` was a tracked background job.
    pub fn remove_if_present(&mut self, pid: Pid) -> bool {
        match self.pids.iter().position(|&p| p == pid) {
            Some(index) => {
                self.pids.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.pids.contains(&pid)
    }

    pub fn pids(&self) -> &[Pid] {
        &self.pids
    }

    pub fn len(&self) -> usize {
        self.pids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pids.is_empty()
    }
}

impl Default for JobTable {
    fn default() -> Self {
        Self::with_capacity(JOB_TABLE_CAPACITY)
    }
}

/// User-visible background job notices.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Notice {
    Started(Pid),
    Completed(Pid),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Notice::Started(pid) => write!(f, "Background job [{}] started", pid),
            Notice::Completed(pid) => write!(f, "Background job [{}] completed", pid),
        }
    }
}
