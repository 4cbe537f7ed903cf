//! Parva core library - offline cache agent, retrying API client, and
//! response envelopes.
//!
//! Two subsystems keep the Parva calendar usable on a bad network:
//! - [`offline`]: intercepts page requests and resolves them through
//!   versioned cache buckets ([`cache`]) with cache-first or network-first
//!   strategies
//! - [`api`]: a typed client for the versioned REST API that retries
//!   transient failures and normalizes every response into an
//!   [`envelope::ResponseEnvelope`]

pub mod api;
pub mod cache;
pub mod config;
pub mod envelope;
pub mod net;
pub mod offline;

#[cfg(test)]
mod testing;

pub use api::{ApiClient, RequestError};
pub use config::Config;
pub use envelope::ResponseEnvelope;
pub use offline::OfflineAgent;
