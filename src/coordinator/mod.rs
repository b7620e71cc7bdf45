//! Master/Worker Coordination Module
//!
//! The fabric that distributes a batch of exams across a cohort of scoring
//! workers and gathers the results in a deterministic order.
//!
//! ## Architecture Overview
//! Every participant holds one endpoint of a rank-addressed, tagged message
//! bus; rank 0 is the master. A dispatch round is four ordered sends per
//! active worker (`Review` command, answer-key blob, exam batch) followed
//! by one result batch back per worker, collected in the order the workers
//! were given work.
//!
//! ## Submodules
//! - **`types`**: ranks, tags, commands, and the exam/result records.
//! - **`bus`**: the channel fabric (`ChannelBus`) delivering tagged byte
//!   frames between ranks with blocking receives.
//! - **`protocol`**: the byte-level frame codec (explicit field-by-field
//!   layout, native endian) and the typed send/receive operations, with
//!   size validation on every receive.
//! - **`dispatcher`**: the master side: slicing, the active-worker roster,
//!   ordered gather, and the shutdown fan-out.
//! - **`worker`**: the worker side: the blocking round loop that installs
//!   shipped keys, scores its slice, and returns results.
//! - **`error`**: the transport/protocol error taxonomy.

pub mod bus;
pub mod dispatcher;
pub mod error;
pub mod protocol;
pub mod types;
pub mod worker;

#[cfg(test)]
mod tests;
