//! Mailing submission and status synchronization.
//!
//! Submission: validate, hand the mailing to the gateway, record it.
//! Synchronization: list, fetch, summarize and publish every known mailing,
//! once per interval, for as long as the subscriber stays connected.

#![warn(clippy::unwrap_used)]

pub mod delivery;
pub mod submission;
pub mod summary;
pub mod sync;

pub use delivery::refresh_mailing;
pub use submission::SubmissionHandler;
pub use summary::summarize;
pub use sync::{StatusSink, SyncLoop};
