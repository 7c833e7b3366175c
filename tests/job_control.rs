//! Reaping tests. `reap_children` collects any child of the process, so these
//! run in their own test binary and in a single test function.

use std::thread;
use std::time::Duration;

use henrysh::core::job::Notice;
use henrysh::errors::ErrorKind;
use henrysh::job_control::{JobManager, Tracking};
use nix::errno::Errno;
use nix::sys::signal;
use nix::unistd::{self, ForkResult, Pid};

fn spawn_exiting(job_manager: &JobManager, tracking: Tracking, code: i32) -> Pid {
    job_manager
        .spawn_registered(tracking, || match unsafe { unistd::fork() }.unwrap() {
            ForkResult::Parent { child } => Ok(child),
            ForkResult::Child => unsafe { libc::_exit(code) },
        })
        .unwrap()
        .pid
}

/// Drains children until `pid` no longer exists, returning every notice.
fn reap_until_gone(job_manager: &JobManager, pid: Pid) -> Vec<Notice> {
    let mut notices = Vec::new();
    for _ in 0..500 {
        notices.extend(job_manager.reap_children().unwrap());
        if signal::kill(pid, None) == Err(Errno::ESRCH) {
            return notices;
        }
        thread::sleep(Duration::from_millis(10));
    }
    panic!("{} was never reaped", pid);
}

#[test]
fn test_reaper_and_foreground_wait_collect_each_child_once() {
    let job_manager = JobManager::with_capacity(4);

    // foreground child collected by the reaper first: the waiter still gets
    // its status, and nothing is announced
    let foreground = spawn_exiting(&job_manager, Tracking::Foreground, 7);
    let notices = reap_until_gone(&job_manager, foreground);
    assert!(notices.is_empty(), "notices: {:?}", notices);

    let status = job_manager.wait_for(foreground).unwrap();
    assert_eq!(status.code(), Some(7));

    // the status is handed over only once
    let e = job_manager.wait_for(foreground).unwrap_err();
    assert_eq!(e.kind(), &ErrorKind::Nix);

    // a background child is announced exactly once and leaves the table
    let background = spawn_exiting(&job_manager, Tracking::Background, 0);
    assert_eq!(job_manager.background_jobs(), vec![background]);
    let notices = reap_until_gone(&job_manager, background);
    assert_eq!(notices, vec![Notice::Completed(background)]);
    assert!(job_manager.background_jobs().is_empty());
    assert!(job_manager.reap_children().unwrap().is_empty());
}
