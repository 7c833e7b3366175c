//! Process launcher: runs an [`Invocation`] as a single child or as a
//! two-stage pipeline, in the foreground or the background.

use std::ffi::{CStr, CString};
use std::io::Write;
use std::os::unix::io::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::process::ExitStatus;

use failure::ResultExt;
use log::{debug, error};
use nix::{
    errno::Errno,
    unistd::{self, ForkResult, Pid},
};

use crate::{
    core::{invocation::Invocation, job::Notice},
    errors::{Error, ErrorKind, Result},
    job_control::{JobManager, Tracking},
    shell::SHELL_NAME,
};

/// Exit status of a child whose program could not be executed.
pub const EXEC_FAILURE_EXIT_STATUS: i32 = 1;

/// A program and its arguments, converted for `execvp` before forking.
#[derive(Debug)]
struct ExecArgs {
    argv: Vec<CString>,
}

impl ExecArgs {
    fn new<S: AsRef<str>>(argv: &[S]) -> Result<Self> {
        let argv = argv
            .iter()
            .map(|arg| CString::new(arg.as_ref()).map_err(|_| Error::invalid_argument(arg)))
            .collect::<Result<Vec<_>>>()?;
        debug_assert!(!argv.is_empty());
        Ok(ExecArgs { argv })
    }

    fn program(&self) -> &CStr {
        &self.argv[0]
    }
}

/// Standard stream rewiring done in the child before exec.
#[derive(Debug, Default)]
struct Redirects {
    stdin: Option<RawFd>,
    stdout: Option<RawFd>,
    /// Descriptors the child must not keep once the streams are in place.
    close: Vec<RawFd>,
}

/// Runs `invocation` to completion, or launches it in the background.
///
/// Returns the exit status of foreground work (the last stage for a
/// pipeline) and `None` for a background job. A program that cannot be
/// executed shows up as a child exiting with [`EXEC_FAILURE_EXIT_STATUS`].
pub fn execute<W: Write>(
    job_manager: &JobManager,
    invocation: &Invocation,
    stdout: &mut W,
) -> Result<Option<ExitStatus>> {
    match invocation.pipeline_tail_argv {
        Some(ref tail) => run_pipeline(job_manager, &invocation.command_argv, tail).map(Some),
        None if invocation.background => {
            run_background(job_manager, &invocation.command_argv, stdout)?;
            Ok(None)
        }
        None => run_foreground(job_manager, &invocation.command_argv).map(Some),
    }
}

fn run_foreground<S: AsRef<str>>(job_manager: &JobManager, argv: &[S]) -> Result<ExitStatus> {
    let args = ExecArgs::new(argv)?;
    let spawned = job_manager.spawn_registered(Tracking::Foreground, || {
        fork_child(&args, &Redirects::default())
    })?;
    job_manager.wait_for(spawned.pid)
}

fn run_background<S, W>(job_manager: &JobManager, argv: &[S], stdout: &mut W) -> Result<Pid>
where
    S: AsRef<str>,
    W: Write,
{
    let args = ExecArgs::new(argv)?;
    let spawned = job_manager.spawn_registered(Tracking::Background, || {
        let pid = fork_child(&args, &Redirects::default())?;
        // Printed while the notifier is locked out, so the completion notice
        // can never come first.
        let temp_result =
            writeln!(stdout, "{}", Notice::Started(pid)).and_then(|_| stdout.flush());
        log_if_err!(temp_result, "failed to print notice for {}", pid);
        Ok(pid)
    })?;

    if let Some(e) = spawned.untracked {
        eprintln!("{}: {}", SHELL_NAME, e);
    }
    Ok(spawned.pid)
}

fn run_pipeline<S: AsRef<str>>(
    job_manager: &JobManager,
    first: &[S],
    second: &[S],
) -> Result<ExitStatus> {
    let first_args = ExecArgs::new(first)?;
    let second_args = ExecArgs::new(second)?;
    let (read_end, write_end) = create_pipe()?;
    let pipe_fds = vec![read_end.as_raw_fd(), write_end.as_raw_fd()];

    let writer = Redirects {
        stdin: None,
        stdout: Some(write_end.as_raw_fd()),
        close: pipe_fds.clone(),
    };
    let first_pid = job_manager
        .spawn_registered(Tracking::Foreground, || fork_child(&first_args, &writer))?
        .pid;

    let reader = Redirects {
        stdin: Some(read_end.as_raw_fd()),
        stdout: None,
        close: pipe_fds,
    };
    let second_spawned =
        job_manager.spawn_registered(Tracking::Foreground, || fork_child(&second_args, &reader));

    // The shell takes no part in the data flow; holding either end open would
    // keep the reader from ever seeing end-of-file.
    drop(read_end);
    drop(write_end);

    let second_pid = match second_spawned {
        Ok(spawned) => spawned.pid,
        Err(e) => {
            let temp_result = job_manager.wait_for(first_pid);
            log_if_err!(temp_result, "failed to wait for {}", first_pid);
            return Err(e);
        }
    };

    let first_status = job_manager.wait_for(first_pid);
    let second_status = job_manager.wait_for(second_pid);
    match first_status {
        Ok(status) => debug!("pipeline writer {} finished: {}", first_pid, status),
        Err(e) => error!("failed to wait for {}: {}", first_pid, e),
    }
    second_status
}

/// Wraps `unistd::pipe()` to return RAII structs instead of raw, owning file
/// descriptors. Returns (`read_end`, `write_end`).
fn create_pipe() -> Result<(OwnedFd, OwnedFd)> {
    // Immediately pass the RawFds returned by unistd::pipe() into OwnedFds so
    // that an early return cannot leak them. Nothing else owns these
    // descriptors, so from_raw_fd is sound.
    let (read_end, write_end) = unistd::pipe().context(ErrorKind::Nix)?;
    unsafe {
        Ok((
            OwnedFd::from_raw_fd(read_end),
            OwnedFd::from_raw_fd(write_end),
        ))
    }
}

fn fork_child(args: &ExecArgs, redirects: &Redirects) -> Result<Pid> {
    match unsafe { unistd::fork() }.context(ErrorKind::Nix)? {
        ForkResult::Parent { child } => Ok(child),
        ForkResult::Child => exec_child(args, redirects),
    }
}

/// Runs in the forked child: rewires the standard streams and replaces the
/// process image. If that fails the child reports it and exits; it never
/// returns into the shell.
///
/// The parent is multithreaded, so only async-signal-safe calls are allowed
/// here: no allocation, no locks, no logging.
fn exec_child(args: &ExecArgs, redirects: &Redirects) -> ! {
    let errno = match redirect_streams(redirects) {
        Ok(()) => match unistd::execvp(args.program(), &args.argv) {
            Ok(never) => match never {},
            Err(errno) => errno,
        },
        Err(errno) => errno,
    };

    report_exec_failure(args.program(), errno);
    unsafe { libc::_exit(EXEC_FAILURE_EXIT_STATUS) }
}

fn redirect_streams(redirects: &Redirects) -> nix::Result<()> {
    if let Some(fd) = redirects.stdin {
        unistd::dup2(fd, libc::STDIN_FILENO)?;
    }
    if let Some(fd) = redirects.stdout {
        unistd::dup2(fd, libc::STDOUT_FILENO)?;
    }
    for &fd in &redirects.close {
        if fd > libc::STDERR_FILENO {
            unistd::close(fd)?;
        }
    }
    Ok(())
}

/// Writes "henrysh: <program>: <reason>" to stderr without allocating.
fn report_exec_failure(program: &CStr, errno: Errno) {
    let parts: [&[u8]; 6] = [
        SHELL_NAME.as_bytes(),
        b": ",
        program.to_bytes(),
        b": ",
        errno.desc().as_bytes(),
        b"\n",
    ];
    for part in &parts {
        let _ = unistd::write(libc::STDERR_FILENO, part);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use nix::sys::{
        signal::{self, Signal},
        wait,
    };

    use crate::core::tokenizer::tokenize;
    use crate::util::ShellExitStatusExt;

    fn invocation(line: &str) -> Invocation {
        Invocation::classify(tokenize(line)).unwrap().unwrap()
    }

    fn argv(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_foreground_success() {
        let job_manager = JobManager::with_capacity(4);
        let mut out = Vec::new();
        let status = execute(&job_manager, &invocation("true"), &mut out)
            .unwrap()
            .unwrap();
        assert!(status.success());
        assert!(out.is_empty());
    }

    #[test]
    fn test_foreground_exit_code() {
        let job_manager = JobManager::with_capacity(4);
        let status = run_foreground(&job_manager, &argv(&["sh", "-c", "exit 3"])).unwrap();
        assert_eq!(status.code(), Some(3));
    }

    #[test]
    fn test_foreground_killed_by_signal_is_terminal() {
        let job_manager = JobManager::with_capacity(4);
        let status = run_foreground(&job_manager, &argv(&["sh", "-c", "kill -9 $$"])).unwrap();
        assert_eq!(status.code(), None);
        assert_eq!(status.shell_code(), 137);
    }

    #[test]
    fn test_foreground_wait_continues_past_stop() {
        let job_manager = JobManager::with_capacity(4);
        let args = ExecArgs::new(&["sh", "-c", "kill -STOP $$; exit 7"]).unwrap();
        let pid = job_manager
            .spawn_registered(Tracking::Foreground, || {
                fork_child(&args, &Redirects::default())
            })
            .unwrap()
            .pid;

        // keep resuming the child until the wait is over
        let done = Arc::new(AtomicBool::new(false));
        let resumer = {
            let done = Arc::clone(&done);
            thread::spawn(move || {
                while !done.load(Ordering::SeqCst) {
                    let _ = signal::kill(pid, Signal::SIGCONT);
                    thread::sleep(Duration::from_millis(20));
                }
            })
        };

        let status = job_manager.wait_for(pid);
        done.store(true, Ordering::SeqCst);
        resumer.join().unwrap();
        assert_eq!(status.unwrap().code(), Some(7));
    }

    #[test]
    fn test_exec_failure_exits_child() {
        let job_manager = JobManager::with_capacity(4);
        let mut out = Vec::new();
        let status = execute(
            &job_manager,
            &invocation("henrysh-test-no-such-program --flag"),
            &mut out,
        )
        .unwrap()
        .unwrap();
        assert_eq!(status.code(), Some(EXEC_FAILURE_EXIT_STATUS));
    }

    #[test]
    fn test_nul_byte_argument_is_rejected() {
        let job_manager = JobManager::with_capacity(4);
        let e = run_foreground(&job_manager, &argv(&["echo", "a\0b"])).unwrap_err();
        assert_eq!(e.kind(), &ErrorKind::InvalidArgument("a\0b".into()));
    }

    #[test]
    fn test_background_returns_immediately_and_tracks_pid() {
        let job_manager = JobManager::with_capacity(4);
        let mut out = Vec::new();
        let result = execute(&job_manager, &invocation("sleep 0.2 &"), &mut out).unwrap();
        assert_eq!(result, None);

        let jobs = job_manager.background_jobs();
        assert_eq!(jobs.len(), 1);
        let pid = jobs[0];
        assert_eq!(
            String::from_utf8(out).unwrap(),
            format!("Background job [{}] started\n", pid)
        );

        // no notifier in unit tests, so collect the child here
        wait::waitpid(pid, None).unwrap();
    }

    #[test]
    fn test_pipeline_connects_output_to_input() {
        let job_manager = JobManager::with_capacity(4);
        let status = run_pipeline(
            &job_manager,
            &argv(&["sh", "-c", "printf 'alpha\\nbeta\\n'"]),
            &argv(&["sh", "-c", "read a; read b; test \"$a$b\" = alphabeta"]),
        )
        .unwrap();
        assert!(status.success());
    }

    #[test]
    fn test_pipeline_reader_sees_end_of_input() {
        let job_manager = JobManager::with_capacity(4);
        // `wc -l` only finishes once every write end is closed
        let status = run_pipeline(
            &job_manager,
            &argv(&["true"]),
            &argv(&["sh", "-c", "test \"$(wc -l)\" -eq 0"]),
        )
        .unwrap();
        assert!(status.success());
    }

    #[test]
    fn test_pipeline_reports_last_stage_status() {
        let job_manager = JobManager::with_capacity(4);
        let status = run_pipeline(
            &job_manager,
            &argv(&["sh", "-c", "exit 5"]),
            &argv(&["sh", "-c", "cat >/dev/null; exit 4"]),
        )
        .unwrap();
        assert_eq!(status.code(), Some(4));
    }

    #[test]
    fn test_pipeline_with_missing_program_still_completes() {
        let job_manager = JobManager::with_capacity(4);
        let mut out = Vec::new();
        let status = execute(
            &job_manager,
            &invocation("henrysh-test-no-such-program | cat"),
            &mut out,
        )
        .unwrap()
        .unwrap();
        assert!(status.success());
    }
}
