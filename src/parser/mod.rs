//! Raw-line classification: the closed record set and the grammars that
//! produce it.

mod classifier;
mod lights;
mod line;

pub use classifier::*;
pub use lights::*;
pub use line::*;
