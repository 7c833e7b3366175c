//! Classifies a token sequence into a single command or a two-stage pipeline,
//! optionally run in the background.

use log::debug;

use crate::errors::{Error, Result};

const PIPE: &str = "|";
const BACKGROUND: &str = "&";

/// What the shell was asked to run for one input line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    /// First element is the program name. Never empty.
    pub command_argv: Vec<String>,
    /// Present iff the line contained a `|`; never empty when present.
    pub pipeline_tail_argv: Option<Vec<String>>,
    /// Set by a trailing `&` on a non-pipelined command.
    pub background: bool,
}

impl Invocation {
    /// Builds an `Invocation` from the tokens of one line.
    ///
    /// Returns `Ok(None)` when there is nothing to run.
    ///
    /// Rules:
    /// - the first `|` splits the line; both sides must be non-empty and the
    ///   right side may not contain another `|`
    /// - a trailing `&` backgrounds a plain command, but is rejected on a
    ///   pipeline
    /// - `&` anywhere else, or as the only word, is an ordinary argument
    ///
    /// # Examples
    /// ```
    /// use henrysh::core::invocation::Invocation;
    /// use henrysh::core::tokenizer::tokenize;
    ///
    /// let invocation = Invocation::classify(tokenize("sleep 5 &")).unwrap().unwrap();
    /// assert_eq!(invocation.command_argv, vec!["sleep", "5"]);
    /// assert!(invocation.background);
    /// ```
    pub fn classify(mut tokens: Vec<String>) -> Result<Option<Self>> {
        if tokens.is_empty() {
            return Ok(None);
        }

        let invocation = match tokens.iter().position(|token| token == PIPE) {
            Some(index) => {
                let tail = tokens.split_off(index + 1);
                tokens.pop();
                Self::pipeline(tokens, tail)?
            }
            None => {
                let background =
                    tokens.len() > 1 && tokens.last().map_or(false, |t| t == BACKGROUND);
                if background {
                    tokens.pop();
                }
                Invocation {
                    command_argv: tokens,
                    pipeline_tail_argv: None,
                    background,
                }
            }
        };

        debug!("classified invocation: {:?}", invocation);
        Ok(Some(invocation))
    }

    fn pipeline(head: Vec<String>, tail: Vec<String>) -> Result<Self> {
        if head.is_empty() {
            return Err(Error::syntax("missing command before '|'"));
        }
        match tail.first().map(String::as_str) {
            None | Some(PIPE) => return Err(Error::syntax("missing command after '|'")),
            _ => {}
        }
        if tail.iter().any(|token| token == PIPE) {
            return Err(Error::syntax("only two-stage pipelines are supported"));
        }
        if tail.last().map_or(false, |token| token == BACKGROUND) {
            return Err(Error::syntax("pipelines cannot run in the background"));
        }

        Ok(Invocation {
            command_argv: head,
            pipeline_tail_argv: Some(tail),
            background: false,
        })
    }

    /// Name of the first program to run.
    pub fn program(&self) -> &str {
        &self.command_argv[0]
    }

    pub fn is_pipeline(&self) -> bool {
        self.pipeline_tail_argv.is_some()
    }
}
