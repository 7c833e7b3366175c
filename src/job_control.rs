//! Bookkeeping for forked children, shared between the launcher on the main
//! thread and the completion notifier thread.
//!
//! Every child is registered under the same lock the notifier reaps under, so
//! the notifier never observes a child the launcher has not recorded yet.
//! Background children go into the [`JobTable`]; foreground children go into
//! an awaited set so that, if the notifier collects one before the launcher's
//! own `waitpid`, the exit status is handed over instead of lost.

use std::collections::HashMap;
use std::io::{self, Write};
use std::os::unix::io::{AsRawFd, FromRawFd, IntoRawFd, OwnedFd};
use std::process::ExitStatus;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use failure::{Fail, ResultExt};
use log::{debug, error, info, warn};
use nix::{
    errno::Errno,
    fcntl::{self, FcntlArg, FdFlag, OFlag},
    sys::{
        signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal},
        wait::{self, WaitPidFlag, WaitStatus},
    },
    unistd::{self, Pid},
};

use crate::{
    core::job::{JobTable, Notice},
    errors::{Error, ErrorKind, Result},
    util::ShellExitStatusExt,
};

/// Write end of the notifier's wakeup pipe, or -1 before installation.
static SIGCHLD_WAKEUP_FD: AtomicI32 = AtomicI32::new(-1);

/// How a freshly forked child should be tracked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tracking {
    /// The launcher will block in [`JobManager::wait_for`].
    Foreground,
    /// The notifier announces its completion.
    Background,
}

#[derive(Debug)]
pub struct Spawned {
    pub pid: Pid,
    /// Set when a background child could not be added to the job table.
    pub untracked: Option<Error>,
}

#[derive(Debug)]
struct Children {
    jobs: JobTable,
    /// Foreground children, with their status if the notifier reaped them first.
    awaited: HashMap<Pid, Option<ExitStatus>>,
}

impl Children {
    /// Records a child collected by the notifier, returning the notice to
    /// print for it, if any.
    fn reaped(&mut self, pid: Pid, status: ExitStatus) -> Option<Notice> {
        if self.jobs.remove_if_present(pid) {
            return Some(Notice::Completed(pid));
        }

        match self.awaited.get_mut(&pid) {
            Some(slot) => *slot = Some(status),
            None => debug!("reaped untracked child {} ({})", pid, status),
        }
        None
    }
}

/// Cloneable handle to the shell's child bookkeeping.
#[derive(Clone, Debug)]
pub struct JobManager {
    children: Arc<Mutex<Children>>,
}

impl JobManager {
    pub fn with_capacity(job_table_capacity: usize) -> Self {
        Self {
            children: Arc::new(Mutex::new(Children {
                jobs: JobTable::with_capacity(job_table_capacity),
                awaited: HashMap::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Children> {
        // A panic elsewhere must not stop children from being reaped.
        self.children.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `spawn` (which forks and returns the child's pid in the parent)
    /// and records the child before the notifier can reap it.
    pub fn spawn_registered<F>(&self, tracking: Tracking, spawn: F) -> Result<Spawned>
    where
        F: FnOnce() -> Result<Pid>,
    {
        let mut children = self.lock();
        let pid = spawn()?;

        let untracked = match tracking {
            Tracking::Foreground => {
                children.awaited.insert(pid, None);
                None
            }
            Tracking::Background => children.jobs.insert(pid).err(),
        };
        if let Some(ref e) = untracked {
            warn!("background child {} is untracked: {}", pid, e);
        }

        debug!("spawned {} ({:?})", pid, tracking);
        Ok(Spawned { pid, untracked })
    }

    /// Blocks until the foreground child `pid` exits or is killed. A child
    /// that is merely stopped is waited on further.
    pub fn wait_for(&self, pid: Pid) -> Result<ExitStatus> {
        loop {
            match wait::waitpid(pid, Some(WaitPidFlag::WUNTRACED)) {
                Ok(status) => match ExitStatus::from_wait_status(status) {
                    Some(exit_status) => {
                        self.lock().awaited.remove(&pid);
                        debug!("{} finished: {:?}", pid, status);
                        return Ok(exit_status);
                    }
                    None => debug!("{} changed state without finishing: {:?}", pid, status),
                },
                Err(Errno::EINTR) => continue,
                Err(Errno::ECHILD) => {
                    // The notifier collected it first and left the status behind.
                    let collected = self.lock().awaited.remove(&pid).and_then(|status| status);
                    debug!("{} was reaped by the notifier: {:?}", pid, collected);
                    return Ok(collected.ok_or(Errno::ECHILD).context(ErrorKind::Nix)?);
                }
                Err(e) => {
                    self.lock().awaited.remove(&pid);
                    return Err(e.context(ErrorKind::Nix).into());
                }
            }
        }
    }

    /// Collects every child that has already terminated, without blocking,
    /// and returns the completion notices for tracked background jobs.
    pub fn reap_children(&self) -> Result<Vec<Notice>> {
        let mut children = self.lock();
        let mut notices = Vec::new();
        loop {
            match wait::waitpid(None, Some(WaitPidFlag::WNOHANG)) {
                Ok(WaitStatus::StillAlive) | Err(Errno::ECHILD) => break,
                Ok(status) => {
                    let pid = status.pid();
                    let exit_status = ExitStatus::from_wait_status(status);
                    if let (Some(pid), Some(exit_status)) = (pid, exit_status) {
                        debug!("reaped {}: {:?}", pid, status);
                        notices.extend(children.reaped(pid, exit_status));
                    }
                }
                Err(Errno::EINTR) => continue,
                Err(e) => return Err(e.context(ErrorKind::Nix).into()),
            }
        }

        Ok(notices)
    }

    /// Pids of the background jobs that have not been announced as completed.
    pub fn background_jobs(&self) -> Vec<Pid> {
        self.lock().jobs.pids().to_vec()
    }
}

extern "C" fn on_sigchld(_: libc::c_int) {
    let fd = SIGCHLD_WAKEUP_FD.load(Ordering::Relaxed);
    if fd >= 0 {
        // EAGAIN means the pipe is full, so a wakeup is already pending.
        let _ = unistd::write(fd, &[1]);
    }
}

/// Announces background job completion from a dedicated thread.
///
/// The SIGCHLD handler only writes a byte to a pipe; the thread wakes up on
/// it and drains all terminated children through the [`JobManager`].
#[derive(Debug)]
pub struct Notifier {
    _thread: thread::JoinHandle<()>,
}

impl Notifier {
    pub fn install(job_manager: JobManager) -> Result<Self> {
        let (read_end, write_end) = unistd::pipe().context(ErrorKind::Nix)?;
        // Take ownership right away so early returns below close them.
        let (read_end, write_end) =
            unsafe { (OwnedFd::from_raw_fd(read_end), OwnedFd::from_raw_fd(write_end)) };

        for fd in &[&read_end, &write_end] {
            fcntl::fcntl(fd.as_raw_fd(), FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC))
                .context(ErrorKind::Nix)?;
        }
        fcntl::fcntl(write_end.as_raw_fd(), FcntlArg::F_SETFL(OFlag::O_NONBLOCK))
            .context(ErrorKind::Nix)?;

        let previous = SIGCHLD_WAKEUP_FD.swap(write_end.into_raw_fd(), Ordering::SeqCst);
        if previous >= 0 {
            warn!("replacing an existing notifier wakeup pipe");
        }

        let action = SigAction::new(
            SigHandler::Handler(on_sigchld),
            SaFlags::SA_RESTART | SaFlags::SA_NOCLDSTOP,
            SigSet::empty(),
        );
        unsafe { signal::sigaction(Signal::SIGCHLD, &action) }.context(ErrorKind::Nix)?;

        let thread = thread::Builder::new()
            .name("sigchld-notifier".into())
            .spawn(move || notify_loop(&read_end, &job_manager, &mut io::stdout()))
            .context(ErrorKind::Io)?;

        info!("completion notifier installed");
        Ok(Notifier { _thread: thread })
    }
}

fn notify_loop<W: Write>(wakeup: &OwnedFd, job_manager: &JobManager, out: &mut W) {
    let mut buf = [0u8; 64];
    loop {
        match unistd::read(wakeup.as_raw_fd(), &mut buf) {
            Ok(0) => break,
            Ok(_) => {}
            Err(Errno::EINTR) => continue,
            Err(e) => {
                error!("notifier stopped, wakeup pipe read failed: {}", e);
                break;
            }
        }

        match job_manager.reap_children() {
            Ok(notices) => announce(&notices, out),
            Err(e) => error!("failed to reap children: {}", e),
        }
    }
}

fn announce<W: Write>(notices: &[Notice], out: &mut W) {
    for notice in notices {
        info!("{}", notice);
        let temp_result = writeln!(out, "{}", notice).and_then(|_| out.flush());
        log_if_err!(temp_result, "failed to print notice");
    }
}
