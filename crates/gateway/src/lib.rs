//! Client for the SMSC gateway HTTP contract.
//!
//! The provider answers HTTP 200 for semantic errors too, so every reply is
//! judged by its body. [`decode::decode_reply`] is the one place that does it.

#![warn(clippy::unwrap_used)]

pub mod client;
pub mod decode;
pub mod dry_run;
pub mod transport;

pub use client::{Credentials, GatewayMethod, GatewayResult, SmscClient};
pub use decode::{decode_reply, GatewayReply};
pub use dry_run::DryRunTransport;
pub use transport::{HttpTransport, MockCall, MockHttpTransport, ReqwestTransport, TransportResponse};
