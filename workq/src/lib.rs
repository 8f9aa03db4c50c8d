//! A fixed-capacity, fixed-message-size FIFO queue living entirely in a
//! System V shared memory segment, for low-latency message exchange
//! between unrelated processes on the same host.
//!
//! # Overview
//!
//! A queue is a single contiguous segment: an 8-byte magic, the two size
//! parameters, a header spinlock guarding the ring indices, and a ring of
//! fixed-size slots, each fronted by its own spinlock. Every message in
//! one queue has the same length, fixed at creation in 64-bit words.
//!
//! Key pieces:
//! - [`Queue`]: create/open/close/delete plus the enqueue and dequeue
//!   operations.
//! - [`QueueConfig`]: serde-round-trippable parameters with a validating
//!   builder, for tools that load their setup from a file.
//! - [`CancelToken`]: the cancellation signal taken by the blocking
//!   operations; [`CancelToken::on_termination`] wires it to process
//!   signals.
//! - [`find_free_key`]: picks a key not bound to any existing segment.
//! - [`QueueError`]: classified errors from the shared-memory syscalls
//!   plus the crate's own failure kinds.
//!
//! # Concurrency model
//!
//! There are no kernel synchronization primitives. Mutual exclusion is
//! done by in-segment spinlocks (compare-and-swap on aligned 64-bit
//! words), and blocking operations poll with a backoff that grows one
//! nanosecond per iteration up to one millisecond, so wake-up latency is
//! bounded by the polling cadence rather than kernel scheduling. The
//! header lock serializes the ring indices; each slot's lock serializes
//! its payload bytes. Callers never hold a lock while sleeping.
//!
//! Three enqueue disciplines are offered per call: cyclic overwrite
//! ([`Queue::enqueue_shift`], evicts the oldest when full), fail-fast
//! ([`Queue::enqueue_try`]) and polling ([`Queue::enqueue_block`]);
//! dequeue comes in the latter two flavors. FIFO order is guaranteed for
//! a single producer and single consumer; with several of either, the
//! header lock linearizes operations but no waiter fairness is promised.
//!
//! # Caveats
//!
//! Segments are not portable across hosts of different endianness: all
//! fields are stored in native byte order. If a process dies while
//! holding an in-segment lock the queue is permanently stuck; there is no
//! lock stealing or timeout recovery, and the segment has to be deleted
//! and recreated. These are deliberate trade-offs for zero-kernel-
//! overhead synchronization.

pub mod cancel;
pub mod config;
pub mod errors;
pub mod key;
pub mod queue;

mod endian;
mod segment;
mod sys;

#[cfg(test)]
mod tests;

pub use cancel::CancelToken;
pub use config::QueueConfig;
pub use errors::{QueueError, ShmKind, ShmOp};
pub use key::find_free_key;
pub use queue::Queue;
