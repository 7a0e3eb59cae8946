//! Task orchestration for kiln.
//!
//! A task is a named pipeline: an input selector, an ordered list of
//! transform stages and an output sink. Tasks declare the tasks they must run
//! after; the registry orders any requested set topologically and runs it one
//! task at a time, each run resolving to a [`TaskReport`].

pub mod asset;
pub mod builtin;
pub mod error;
pub mod pipeline;
pub mod registry;
pub mod stages;

pub use asset::Asset;
pub use builtin::default_registry;
pub use error::TaskError;
pub use pipeline::{Input, Pipeline, PipelineOutcome, Sink, Stage, Transform};
pub use registry::{Task, TaskRegistry, TaskReport, BUILD_TARGET};
