//! Command-line interface module.

mod args;
pub mod build;
pub mod serve;
pub mod start;

pub use args::{Cli, Commands};
