use std::env;
use std::io::Write;

use log::debug;

use crate::builtins::BuiltinCommand;
use crate::errors::{Error, Result};
use crate::shell::Shell;

pub struct Cd;

impl BuiltinCommand for Cd {
    const NAME: &'static str = "cd";

    fn run<T: AsRef<str>>(
        _shell: &mut dyn Shell,
        args: &[T],
        _stdout: &mut dyn Write,
    ) -> Result<()> {
        let dir = match args.first() {
            Some(dir) => dir.as_ref(),
            None => return Err(Error::builtin_command("cd: expected argument", 1)),
        };

        env::set_current_dir(dir)
            .map_err(|e| Error::builtin_command(format!("cd: {}: {}", dir, e), 1))?;
        debug!("changed directory to {}", dir);
        Ok(())
    }
}
