//! Worker process supervision.
//!
//! The controller side of the two-process design: spawns the HTTP worker,
//! learns the actually-bound port from the stdout sentinel line, detects
//! crashes, and restarts the worker when the preferred port changes.
//! State changes are delivered over a channel so UI frontends can marshal
//! them onto their own event loop.

pub mod events;
pub mod supervisor;

pub use events::*;
pub use supervisor::*;
