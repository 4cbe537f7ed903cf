//! Offline agent: intercepts page requests and resolves them through
//! versioned cache buckets.
//!
//! This module provides:
//! - `RequestClassifier`: picks CacheFirst, NetworkFirst or pass-through
//! - `CacheFirst` / `NetworkFirst`: the two resolution strategies
//! - `OfflineAgent`: install/activate/fetch lifecycle with bucket GC
//!
//! Only same-origin GET requests are ever intercepted.

pub mod agent;
pub mod classifier;
pub mod request;
pub mod strategy;

pub use agent::{AgentConfig, AgentError, AgentState, FetchOutcome, OfflineAgent};
pub use classifier::{RequestClassifier, Route};
pub use request::{InterceptedRequest, RequestOrigin};
pub use strategy::{CacheFirst, NetworkFirst, Resolution, ResolutionSource};
