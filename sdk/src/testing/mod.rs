//! Testing utilities for workflows.
//!
//! [`InMemoryBackend`] stands in for the remote Run/Event service and job
//! queue, including the wake scheduler, so workers and clients can be
//! exercised without a server.

mod memory;

pub use memory::{InMemoryBackend, MessageState, QueuedMessage};
