//! Typed helpers for the public Parva endpoints.

use serde_json::Value;

use crate::envelope::ResponseEnvelope;

use super::{ApiClient, Params, RequestError};

/// Envelope over untyped JSON data.
pub type RawEnvelope = ResponseEnvelope<Value>;

/// Default observer location for observance lookups.
pub const DEFAULT_LOCATION: &str = "kathmandu";

/// Options for [`ApiClient::resolve`]. Defaults place the observer in
/// Kathmandu under the mainstream Nepali profile.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolveOptions {
    pub profile: String,
    pub latitude: f64,
    pub longitude: f64,
    pub include_trace: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            profile: "np-mainstream".to_string(),
            latitude: 27.7172,
            longitude: 85.324,
            include_trace: true,
        }
    }
}

impl ApiClient {
    pub async fn today(&self) -> Result<RawEnvelope, RequestError> {
        self.get("/calendar/today", &Params::new()).await
    }

    /// Convert a Gregorian date to Bikram Sambat.
    pub async fn convert(&self, date: &str) -> Result<RawEnvelope, RequestError> {
        self.get("/calendar/convert", &Params::new().set("date", date))
            .await
    }

    /// Panchanga for `date`, or for the server's today when `None`.
    pub async fn panchanga(&self, date: Option<&str>) -> Result<RawEnvelope, RequestError> {
        self.get("/calendar/panchanga", &Params::new().set_opt("date", date))
            .await
    }

    pub async fn upcoming(&self, days: u32) -> Result<RawEnvelope, RequestError> {
        self.get("/festivals/upcoming", &Params::new().set("days", days))
            .await
    }

    pub async fn observances(
        &self,
        date: &str,
        location: &str,
        preferences: Option<&str>,
    ) -> Result<RawEnvelope, RequestError> {
        let params = Params::new()
            .set("date", date)
            .set("location", location)
            .set_opt("preferences", preferences.filter(|p| !p.is_empty()));
        self.get("/observances", &params).await
    }

    pub async fn next_observance(
        &self,
        from_date: Option<&str>,
        days: u32,
        location: &str,
        preferences: Option<&str>,
    ) -> Result<RawEnvelope, RequestError> {
        let params = Params::new()
            .set("days", days)
            .set("location", location)
            .set_opt("from_date", from_date)
            .set_opt("preferences", preferences.filter(|p| !p.is_empty()));
        self.get("/observances/next", &params).await
    }

    pub async fn explain_festival(
        &self,
        festival_id: &str,
        year: i32,
    ) -> Result<RawEnvelope, RequestError> {
        self.get(
            &format!("/festivals/{}/explain", festival_id),
            &Params::new().set("year", year),
        )
        .await
    }

    pub async fn explain_trace(&self, trace_id: &str) -> Result<RawEnvelope, RequestError> {
        self.get(&format!("/explain/{}", trace_id), &Params::new())
            .await
    }

    pub async fn resolve(
        &self,
        date: &str,
        options: &ResolveOptions,
    ) -> Result<RawEnvelope, RequestError> {
        let params = Params::new()
            .set("date", date)
            .set("profile", &options.profile)
            .set("latitude", options.latitude)
            .set("longitude", options.longitude)
            .set("include_trace", options.include_trace);
        self.get("/resolve", &params).await
    }

    pub async fn spec_conformance(&self) -> Result<RawEnvelope, RequestError> {
        self.get("/spec/conformance", &Params::new()).await
    }

    pub async fn verify_trace(&self, trace_id: &str) -> Result<RawEnvelope, RequestError> {
        self.get(
            &format!("/provenance/verify/trace/{}", trace_id),
            &Params::new(),
        )
        .await
    }
}
