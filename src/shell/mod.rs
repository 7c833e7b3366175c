use std::{path::Path, process::ExitStatus};

use crate::{core::job::JOB_TABLE_CAPACITY, errors::Result};

pub use self::unix::create_shell;
pub mod unix;

/// Name used in the prompt and as the prefix of diagnostics.
pub const SHELL_NAME: &str = "henrysh";
/// Last exit status after a line that could not be classified.
pub const SYNTAX_ERROR_EXIT_STATUS: i32 = 2;

pub trait Shell {
    fn execute_command_string(&mut self, input: &str) -> Result<()>;
    fn execute_commands_from_file(&mut self, path: &Path) -> Result<()>;
    fn execute_from_stdin(&mut self);
    fn exit(&mut self, n: Option<ExitStatus>) -> !;
}

/// Policy object to control a Shell's behavior
#[derive(Debug, Copy, Clone)]
pub struct ShellConfig {
    /// Number of background jobs tracked for completion notices.
    job_table_capacity: usize,

    /// Determines if the prompt and the farewell message are displayed.
    display_messages: bool,
}

impl ShellConfig {
    /// Creates an interactive shell.
    ///
    /// # Complete List
    /// - The prompt is displayed before every line
    /// - A farewell message is displayed at end of input
    pub fn interactive(job_table_capacity: usize) -> Self {
        Self {
            job_table_capacity,
            display_messages: true,
        }
    }

    /// Creates a noninteractive shell, e.g. for `-c` or a script file.
    ///
    /// # Complete List
    /// - No prompt and no farewell message
    /// - Background jobs are still tracked and announced
    pub fn noninteractive() -> Self {
        Default::default()
    }

    pub fn job_table_capacity(&self) -> usize {
        self.job_table_capacity
    }

    pub fn display_messages(&self) -> bool {
        self.display_messages
    }
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            job_table_capacity: JOB_TABLE_CAPACITY,
            display_messages: false,
        }
    }
}
