use std::io::Write;
use std::process::ExitStatus;

use crate::builtins::BuiltinCommand;
use crate::errors::Result;
use crate::shell::Shell;
use crate::util::ShellExitStatusExt;

pub struct Exit;

impl BuiltinCommand for Exit {
    const NAME: &'static str = "exit";

    /// Exits with a status of 0. Arguments are ignored and background jobs
    /// are left running.
    fn run<T: AsRef<str>>(
        shell: &mut dyn Shell,
        _args: &[T],
        stdout: &mut dyn Write,
    ) -> Result<()> {
        let temp_result = writeln!(stdout, "Leaving... 🚀").and_then(|_| stdout.flush());
        log_if_err!(temp_result, "exit");
        shell.exit(Some(ExitStatus::from_success()));
    }
}
