//! Task error type.

/// Errors that fail a whole task invocation.
///
/// Per-file problems never show up here: they are logged and counted in the
/// task report while the remaining files carry on.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("Unknown task: {0}")]
    UnknownTask(String),

    #[error("Task {0} is already registered")]
    Duplicate(String),

    #[error("Task {task} runs after unknown task {dependency}")]
    UnknownDependency { task: String, dependency: String },

    #[error("Dependency cycle through task {0}")]
    Cycle(String),

    #[error("Invalid glob {pattern}: {message}")]
    Pattern { pattern: String, message: String },

    #[error("Failed to set up task {task}: {message}")]
    Setup { task: String, message: String },

    #[error("Task {task} did not complete: {message}")]
    Join { task: String, message: String },
}
