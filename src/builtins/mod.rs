//! Shell builtins
//!
//! Builtins run inside the shell process itself instead of being forked, since
//! they act on the shell's own state.

use std::io::Write;
use std::process::ExitStatus;

use crate::{
    errors::{ErrorKind, Result},
    shell::Shell,
    util::ShellExitStatusExt,
};

use self::dirs::Cd;
use self::exit::Exit;

mod dirs;
mod exit;

/// Represents a builtin command such as cd or exit.
pub trait BuiltinCommand {
    /// The NAME of the command.
    const NAME: &'static str;
    /// Runs the command with the given arguments in the `shell` environment.
    fn run<T: AsRef<str>>(shell: &mut dyn Shell, args: &[T], stdout: &mut dyn Write)
        -> Result<()>;
}

pub fn is_builtin<T: AsRef<str>>(program: T) -> bool {
    [Cd::NAME, Exit::NAME].contains(&program.as_ref())
}

/// precondition: command is a builtin.
/// Returns (`exit_status_code`, `builtin_result`)
pub fn run<S1, S2>(
    shell: &mut dyn Shell,
    program: S1,
    args: &[S2],
    stdout: &mut dyn Write,
) -> (ExitStatus, Result<()>)
where
    S1: AsRef<str>,
    S2: AsRef<str>,
{
    debug_assert!(is_builtin(&program));

    let result = match program.as_ref() {
        name if name == Cd::NAME => Cd::run(shell, args, stdout),
        name if name == Exit::NAME => Exit::run(shell, args, stdout),
        _ => unreachable!(),
    };

    let exit_status = get_builtin_exit_status(&result);
    (exit_status, result)
}

fn get_builtin_exit_status(result: &Result<()>) -> ExitStatus {
    let status = if let Err(ref e) = *result {
        match *e.kind() {
            ErrorKind::BuiltinCommand { code, .. } => code,
            _ => 1,
        }
    } else {
        0
    };

    ExitStatus::from_status(status)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use std::path::Path;

    /// Stand-in shell that records nothing and refuses to exit.
    #[derive(Debug, Default)]
    pub struct FakeShell;

    impl Shell for FakeShell {
        fn execute_command_string(&mut self, _input: &str) -> Result<()> {
            Ok(())
        }

        fn execute_commands_from_file(&mut self, _path: &Path) -> Result<()> {
            Ok(())
        }

        fn execute_from_stdin(&mut self) {}

        fn exit(&mut self, n: Option<ExitStatus>) -> ! {
            panic!("exit called with {:?}", n)
        }
    }

    #[test]
    fn test_is_builtin() {
        assert!(is_builtin("cd"));
        assert!(is_builtin("exit"));
        assert!(!is_builtin("ls"));
        assert!(!is_builtin("jobs"));
    }

    #[test]
    fn test_failed_builtin_status() {
        let mut shell = FakeShell;
        let no_args: &[&str] = &[];
        let (status, result) = run(&mut shell, "cd", no_args, &mut Vec::<u8>::new());
        assert!(result.is_err());
        assert_eq!(status.code(), Some(1));
    }

    #[test]
    #[should_panic(expected = "exit called with Some")]
    fn test_exit_builtin_exits_shell() {
        let mut shell = FakeShell;
        let _ = run(&mut shell, "exit", &["3"], &mut Vec::<u8>::new());
    }
}
