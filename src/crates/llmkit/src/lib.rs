//! Library half of the `llmkit` binary, split out so the commands can be
//! driven from tests.

pub mod cli;
pub mod commands;
