//! Live-reload development server and file watchers for kiln.
//!
//! The server hands out the built site, injects a small reload client into
//! pages and tells connected browsers to reload when output files change.
//! Task watchers re-run one build task whenever its sources change.

pub mod error;
pub mod reload;
pub mod server;
pub mod task_watch;
pub mod watcher;

pub use error::ServerError;
pub use reload::{ReloadHub, ReloadMessage};
pub use server::{DevServer, DevServerConfig};
pub use task_watch::{serialize_runs, watch_task};
pub use watcher::{FileWatcher, WatchEvent};
