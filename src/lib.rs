//! Spork - runs a build command and turns its console output into a
//! structured event stream.
//!
//! The pipeline is one-way: [`run::TaskRun`] captures the child's stdout
//! and stderr, reassembles them into lines, and publishes notifications;
//! [`events::EventFactory`] classifies each line through
//! [`parser::OutputParser`] and hands ordered [`events::Event`]s to the
//! external observer.

pub mod display;
pub mod events;
pub mod parser;
pub mod run;
