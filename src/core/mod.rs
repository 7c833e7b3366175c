//! Line handling that does not touch processes: splitting input into words,
//! classifying them into an invocation, and the background job table.

pub mod invocation;
pub mod job;
pub mod tokenizer;
