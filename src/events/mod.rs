//! Consumer-facing events and the factory that produces them.

mod event;
mod factory;

pub use event::*;
pub use factory::*;
