//! The JobControlShell runs commands in the foreground and background and
//! announces background jobs as they complete.

use std::fmt;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use std::process::{self, ExitStatus};

use failure::{Fail, ResultExt};
use log::{debug, error, info};

use super::{Shell, ShellConfig, SHELL_NAME, SYNTAX_ERROR_EXIT_STATUS};
use crate::{
    builtins,
    core::{invocation::Invocation, tokenizer},
    errors::{ErrorKind, Result},
    execute_command,
    job_control::{JobManager, Notifier},
    util::ShellExitStatusExt,
};

const FAREWELL: &str = "Goodbye! 🚀";

pub struct JobControlShell {
    job_manager: JobManager,
    /// Keeps the completion notifier alive for the life of the shell.
    _notifier: Notifier,
    /// Exit status of last command executed.
    last_exit_status: ExitStatus,
    config: ShellConfig,
}

impl JobControlShell {
    /// Constructs a new JobControlShell and starts the completion notifier.
    pub fn new(config: ShellConfig) -> Result<Self> {
        let job_manager = JobManager::with_capacity(config.job_table_capacity());
        let notifier = Notifier::install(job_manager.clone())?;

        info!("henrysh started up");
        Ok(Self {
            job_manager,
            _notifier: notifier,
            last_exit_status: ExitStatus::from_success(),
            config,
        })
    }

    /// Custom prompt to output to the user.
    /// Returns `None` when end of file is reached.
    fn prompt(&mut self) -> Result<Option<String>> {
        if self.config.display_messages() {
            print!("{}> ", SHELL_NAME);
            io::stdout().flush().context(ErrorKind::Io)?;
        }

        let mut line = String::new();
        match io::stdin().read_line(&mut line) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(line)),
            Err(ref e) if e.kind() == io::ErrorKind::InvalidData => {
                eprintln!("{}: input is not valid UTF-8", SHELL_NAME);
                Ok(Some(String::new()))
            }
            Err(e) => Err(e.context(ErrorKind::Io).into()),
        }
    }

    /// Runs a classified line, either as a builtin or through the launcher.
    fn execute_invocation(&mut self, invocation: &Invocation) {
        if !invocation.is_pipeline() && builtins::is_builtin(invocation.program()) {
            if invocation.background {
                debug!("running builtin {} in the foreground", invocation.program());
            }
            let (status, result) = builtins::run(
                self,
                invocation.program(),
                &invocation.command_argv[1..],
                &mut io::stdout(),
            );
            self.last_exit_status = status;
            if let Err(e) = result {
                eprintln!("{}: {}", SHELL_NAME, e);
            }
            return;
        }

        self.last_exit_status =
            match execute_command::execute(&self.job_manager, invocation, &mut io::stdout()) {
                Ok(Some(status)) => status,
                Ok(None) => ExitStatus::from_success(),
                Err(e) => {
                    eprintln!("{}: {}", SHELL_NAME, e);
                    ExitStatus::from_failure()
                }
            };
    }
}

impl Shell for JobControlShell {
    fn execute_command_string(&mut self, input: &str) -> Result<()> {
        let tokens = tokenizer::tokenize(input);
        let invocation = match Invocation::classify(tokens) {
            Ok(Some(invocation)) => invocation,
            // skip if empty
            Ok(None) => return Ok(()),
            Err(e) => {
                if let ErrorKind::Syntax(_) = *e.kind() {
                    eprintln!("{}: {}", SHELL_NAME, e);
                    self.last_exit_status = ExitStatus::from_status(SYNTAX_ERROR_EXIT_STATUS);
                    return Ok(());
                }

                return Err(e);
            }
        };

        self.execute_invocation(&invocation);
        Ok(())
    }

    fn execute_commands_from_file(&mut self, path: &Path) -> Result<()> {
        let mut f = File::open(path).context(ErrorKind::Io)?;
        let mut buffer = String::new();
        f.read_to_string(&mut buffer)
            .with_context(|_| ErrorKind::Io)?;

        for line in buffer.lines() {
            self.execute_command_string(line)?
        }

        Ok(())
    }

    fn execute_from_stdin(&mut self) {
        loop {
            let input = match self.prompt() {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    error!("prompt: {}", e);
                    eprintln!("{}: {}", SHELL_NAME, e);
                    break;
                }
            };

            let temp_result = self.execute_command_string(&input);
            log_if_err!(temp_result, "execute_command_string");
        }

        if self.config.display_messages() {
            println!("\n{}", FAREWELL);
        }
    }

    fn exit(&mut self, n: Option<ExitStatus>) -> ! {
        let status = n.unwrap_or(self.last_exit_status);
        let background_jobs = self.job_manager.background_jobs();
        if !background_jobs.is_empty() {
            info!("leaving background jobs running: {:?}", background_jobs);
        }

        let temp_result = io::stdout().flush();
        log_if_err!(temp_result, "failed to flush stdout during shutdown");

        info!("henrysh has shut down");
        process::exit(status.shell_code());
    }
}

impl fmt::Debug for JobControlShell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} background jobs, last status {}",
            self.job_manager.background_jobs(),
            self.last_exit_status
        )
    }
}

pub fn create_shell(config: ShellConfig) -> Result<Box<dyn Shell>> {
    let shell = JobControlShell::new(config)?;
    Ok(Box::new(shell))
}
