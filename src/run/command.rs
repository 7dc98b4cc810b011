//! Command descriptor supplied by the project layer.

use std::collections::HashMap;

/// A command to run, plus the environment overrides it runs under.
///
/// This is the read-only input seam from the external project
/// collaborator: the core reads no other configuration and never
/// mutates the descriptor after a run starts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunCommand {
    command: String,
    environment: HashMap<String, String>,
}

impl RunCommand {
    /// Create a descriptor for the given shell command string.
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            environment: HashMap::new(),
        }
    }

    /// Replace the environment overrides wholesale.
    #[must_use]
    pub fn with_environment(mut self, environment: HashMap<String, String>) -> Self {
        self.environment = environment;
        self
    }

    /// Add a single environment override.
    #[must_use]
    pub fn env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(name.into(), value.into());
        self
    }

    /// The command string, as passed to the shell.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Environment overrides applied on top of the inherited environment.
    #[must_use]
    pub fn environment(&self) -> &HashMap<String, String> {
        &self.environment
    }
}
