//! henrysh - a small interactive shell
//!
//! Reads a line, splits it into words, and runs it as a single command or a
//! two-stage pipeline, in the foreground or in the background. Background jobs
//! are announced when they start and again, asynchronously, when they
//! complete.

/// Logs `$result` at error level if it is an `Err`, then discards it.
macro_rules! log_if_err {
    ($result:expr, $msg:expr) => {{
        if let Err(e) = $result {
            ::log::error!("{}: {}", $msg, e);
        }
    }};
    ($result:expr, $fmt:expr, $($arg:tt)+) => {{
        if let Err(e) = $result {
            ::log::error!("{}: {}", format_args!($fmt, $($arg)+), e);
        }
    }};
}

mod builtins;
pub mod core;
pub mod errors;
pub mod execute_command;
pub mod job_control;
pub mod shell;
mod util;

pub use crate::shell::{create_shell, Shell, ShellConfig};
pub use crate::util::ShellExitStatusExt;
