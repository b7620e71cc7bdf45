//! Task Pool Module
//!
//! A fixed-size pool of OS threads executing submitted closures in FIFO
//! order. Request handlers are allowed to block or burn CPU, so they must
//! never run on the async runtime; the server hands every decoded request
//! to this pool and awaits the task's one-shot future instead.
//!
//! ## Guarantees
//! - **Delivery**: every accepted submission completes its future exactly
//!   once, with the task's value or with the panic that ended it.
//! - **Isolation**: a panicking task never takes a worker thread down or
//!   affects any other submission.
//! - **Shutdown**: `stop()` is idempotent; dropping the pool signals stop,
//!   lets the workers drain the queue, and joins them.

pub mod executor;
