//! Distributed Exam-Grading Cluster Library
//!
//! This library crate defines the core modules that make up the grading
//! service. It serves as the foundation for the binary executable
//! (`main.rs`), which runs the same code in one of two roles (orchestrator
//! or worker).
//!
//! ## Architecture Modules
//! The system is composed of five loosely coupled subsystems:
//!
//! - **`pool`**: A fixed-size thread pool executing request handlers. Tasks
//!   are queued FIFO and deliver their results through one-shot futures.
//! - **`server`**: The worker-facing TCP layer. An async acceptor reads
//!   `\r\n\r\n`-delimited requests, hands them to the pool, and drains
//!   in-flight connections on shutdown.
//! - **`coordinator`**: The master/worker fabric. A rank- and tag-addressed
//!   message bus carries commands, answer keys, exam batches, and result
//!   batches; the dispatcher slices work across workers and gathers results
//!   in a deterministic order.
//! - **`grading`**: The domain layer. Answer-key storage (stage-keyed and
//!   flat), the exam scoring engine, and the handlers behind the TCP
//!   command protocol.
//! - **`client`**: A small TCP client speaking the server's framing, plus
//!   the periodic requester run by the orchestrator role.

pub mod client;
pub mod config;
pub mod coordinator;
pub mod grading;
pub mod pool;
pub mod server;
