//! Core input-routing and line-buffer state machine for the dewterm overlay.
//!
//! The overlay is injected into a running host application. Raw key events
//! arrive from an OS-level input hook, are routed through [`ConsoleSession`],
//! and end up either as edits to the pending input line or as control actions
//! (open/close, queue selection, scrolling, submit). Rendering, the chat
//! network backend, and host memory reads are external collaborators that
//! talk to this crate through the seams exported here.

pub mod backend;
pub mod capture;
pub mod config;
pub mod identity;
pub mod keys;
pub mod layout;
pub mod line_queue;
mod logging;
pub mod queues;
pub mod session;
mod telemetry;

pub use logging::{init_logging, init_logging_from_env, log_debug, log_file_path};
pub use session::{ChatChannel, ConsoleSession, Outbound};
pub use telemetry::{init_tracing, tracing_log_path};
