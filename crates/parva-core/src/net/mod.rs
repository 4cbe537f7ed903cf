//! Network seam shared by the API client and the offline agent.
//!
//! Both subsystems talk to the network only through the [`Fetcher`] trait,
//! so tests can substitute scripted implementations for `ReqwestFetcher`.

pub mod fetcher;
pub mod message;

pub use fetcher::{FetchError, Fetcher, ReqwestFetcher};
pub use message::{HttpRequest, HttpResponse};
pub use reqwest::Method;
