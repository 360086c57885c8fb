// src/exec/mod.rs

//! Body execution layer.
//!
//! - [`body`] defines what a body is ([`ExecutionMode`]), the opaque
//!   [`Context`] bound to it, and the [`Done`] completion handle given to
//!   asynchronous bodies.
//! - [`command`] builds asynchronous bodies that run shell commands via
//!   `tokio::process`, used by the command harness.

pub mod body;
pub mod command;

pub use body::{AsyncBody, BodyResult, Context, Done, ExecutionMode, SyncBody};
pub use command::command_body;
