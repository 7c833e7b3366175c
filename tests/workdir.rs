#![allow(dead_code)]

use std::ffi::OsStr;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{self, Command, Stdio};

use tempdir::TempDir;

/// WorkDir represents a scratch directory in which the shell under test runs.
#[derive(Debug)]
pub struct WorkDir {
    /// The directory in which the test will run.
    dir: TempDir,
}

impl WorkDir {
    /// Creates a fresh, empty working directory.
    pub fn new(name: &str) -> WorkDir {
        WorkDir {
            dir: TempDir::new(&format!("henrysh-{}", name)).expect("failed to create temp dir"),
        }
    }

    /// Canonical path of the working directory.
    pub fn path(&self) -> PathBuf {
        self.dir
            .path()
            .canonicalize()
            .expect("temp dir should be canonicalizable")
    }

    /// Creates a file with `contents` relative to the working directory.
    pub fn create<P: AsRef<Path>>(&self, name: P, contents: &str) -> PathBuf {
        let path = self.path().join(name);
        fs::write(&path, contents).expect("failed to write file");
        path
    }

    /// Creates a directory relative to the working directory.
    pub fn create_dir<P: AsRef<Path>>(&self, name: P) -> PathBuf {
        let path = self.path().join(name);
        fs::create_dir_all(&path).expect("failed to create dir");
        path
    }

    /// Builds a new command running the shell in this working directory, with
    /// its log kept inside the directory.
    pub fn command<I, S>(&self, args: I) -> process::Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_henrysh"));
        cmd.current_dir(self.path());
        cmd.arg(format!("--log={}", self.path().join("henrysh.log").display()));
        cmd.args(args);
        cmd
    }

    /// Runs the interactive shell with `input` as its standard input and
    /// collects everything it printed.
    pub fn run_with_stdin(&self, input: &str) -> process::Output {
        let mut cmd = self.command(Vec::<&str>::new());
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().expect("failed to spawn henrysh");
        child
            .stdin
            .take()
            .expect("stdin should be piped")
            .write_all(input.as_bytes())
            .expect("failed to write stdin");
        child.wait_with_output().expect("failed to wait for henrysh")
    }

    /// Executes the command and collects its output.
    ///
    /// Panic if the command fails.
    pub fn output(&self, cmd: &mut process::Command) -> process::Output {
        let o = cmd.output().unwrap();
        if !o.status.success() {
            panic!(
                "\n\n==========\n\
                 command failed but expected success!\
                 \n\ncommand: {:?}\
                 \ncwd: {}\
                 \n\nstatus: {}\
                 \n\nstdout: {}\
                 \n\nstderr: {}\
                 \n\n==========\n",
                cmd,
                self.path().display(),
                o.status,
                String::from_utf8_lossy(&o.stdout),
                String::from_utf8_lossy(&o.stderr)
            );
        }
        o
    }
}

pub fn stdout(output: &process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}
