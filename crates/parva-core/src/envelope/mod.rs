//! Response envelopes for the versioned Parva API.
//!
//! Current API generations answer with `{data, meta}`. Older generations
//! return the payload bare, sometimes with `confidence`, `method` or
//! `calculation_trace_id` at the top level. This module turns either shape
//! into a [`ResponseEnvelope`] so callers never branch on generation.

pub mod meta;
pub mod normalize;

pub use meta::{
    BoundaryRisk, Confidence, ConfidenceLevel, Policy, Provenance, ResponseEnvelope, ResponseMeta,
    Uncertainty,
};
pub use normalize::{normalize, normalize_into, normalize_value, WirePayload};
