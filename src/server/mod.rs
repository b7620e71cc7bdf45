//! TCP Server Module
//!
//! The worker-facing network layer. An async acceptor owns the listening
//! socket; every decoded request is executed on the owned task pool so the
//! runtime never blocks on a handler.
//!
//! ## Request framing
//! Requests and responses are plain strings terminated by `\r\n\r\n`. The
//! terminator is stripped before the handler runs and appended again before
//! the response is written. There is no length prefix.
//!
//! ## Shutdown
//! `stop()` closes the acceptor immediately; connections already accepted
//! keep running until their responses are written. `wait_drained()` returns
//! once the in-flight counter reaches zero, so a handler is never
//! interrupted mid-write.
//!
//! ## Submodules
//! - **`framing`**: delimiter-based read/write shared with the client.
//! - **`service`**: the acceptor, connection lifecycle, and drain logic.
//! - **`shutdown`**: signal handling that stops a [`shutdown::Stoppable`]
//!   target exactly once.

pub mod framing;
pub mod service;
pub mod shutdown;

#[cfg(test)]
mod tests;
