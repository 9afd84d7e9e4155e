//! Async client for the provider's network enforcement API.
//!
//! Two enforcement surfaces hang off the same endpoint:
//!
//! - the **perimeter allow-list**: an unordered, additive set of permit
//!   entries (`v1/allow-lists/{id}/…`), mutated through idempotent
//!   authorize/revoke calls;
//! - the **ordered deny-list**: a numbered rule list evaluated
//!   lowest-number-first (`v1/ordered-lists/{id}/entries/{n}`), mutated
//!   through create-or-replace and delete on a numbered slot.
//!
//! This crate speaks the wire protocol and nothing else. Rule semantics,
//! address normalization, and drift detection live in `fwsync-core`.

pub mod client;
pub mod error;
pub mod transport;
pub mod types;

pub use client::EnforcementClient;
pub use error::Error;
pub use transport::{TlsMode, TransportConfig};
