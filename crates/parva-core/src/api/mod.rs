//! REST API client module for the Parva backend.
//!
//! This module provides the `ApiClient` for calling the versioned
//! `{base}/v{N}/api/...` endpoints. Responses from every API generation are
//! normalized into a `ResponseEnvelope`, and transient failures are retried
//! with bounded exponential backoff.

pub mod abort;
pub mod client;
pub mod endpoints;
pub mod error;
pub mod params;

pub use abort::{AbortController, AbortSignal};
pub use client::{ApiClient, RetryPlan};
pub use endpoints::{RawEnvelope, ResolveOptions};
pub use error::{ErrorDetail, RequestError};
pub use params::{Params, QueryValue};
