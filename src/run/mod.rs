//! Process execution: command descriptor, line reassembly, task lifecycle.

mod command;
mod lines;
mod task;

pub use command::*;
pub use lines::*;
pub use task::*;
