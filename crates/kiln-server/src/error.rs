//! Server error type.

use std::net::SocketAddr;

/// Errors that can occur with the dev server or a watcher.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Invalid listen address {0}")]
    Address(String),

    #[error("Failed to bind to {0}: {1}")]
    Bind(SocketAddr, String),

    #[error("Server error: {0}")]
    Serve(String),

    #[error("File watch error: {0}")]
    Watch(String),

    #[error(transparent)]
    Task(#[from] kiln_tasks::TaskError),
}
