use reqwest::Method;
use url::Url;

use crate::net::HttpRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOrigin {
    Same,
    Cross,
}

/// A request the page issued, as seen by the offline agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptedRequest {
    pub method: Method,
    pub url: Url,
    pub origin: RequestOrigin,
}

impl InterceptedRequest {
    /// Build a request, deriving its origin relative to the agent's `scope`.
    pub fn new(method: Method, url: Url, scope: &Url) -> Self {
        let origin = if url.origin() == scope.origin() {
            RequestOrigin::Same
        } else {
            RequestOrigin::Cross
        };
        Self {
            method,
            url,
            origin,
        }
    }

    pub fn get(url: Url, scope: &Url) -> Self {
        Self::new(Method::GET, url, scope)
    }

    /// Identity used as the bucket key.
    pub fn cache_key(&self) -> String {
        cache_key(&self.url)
    }

    pub fn to_http(&self) -> HttpRequest {
        HttpRequest::new(self.method.clone(), self.url.clone())
    }
}

/// Cache identity of a URL: the full URL without its fragment.
pub fn cache_key(url: &Url) -> String {
    let mut key = url.clone();
    key.set_fragment(None);
    key.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> Url {
        Url::parse("https://parva.app/").unwrap()
    }

    #[test]
    fn test_origin_is_derived_from_scope() {
        let same = InterceptedRequest::get(Url::parse("https://parva.app/index.html").unwrap(), &scope());
        assert_eq!(same.origin, RequestOrigin::Same);

        let other_host =
            InterceptedRequest::get(Url::parse("https://api.parva.app/v5/api/x").unwrap(), &scope());
        assert_eq!(other_host.origin, RequestOrigin::Cross);

        let other_port =
            InterceptedRequest::get(Url::parse("https://parva.app:8443/").unwrap(), &scope());
        assert_eq!(other_port.origin, RequestOrigin::Cross);
    }

    #[test]
    fn test_cache_key_drops_fragment_keeps_query() {
        let url = Url::parse("https://parva.app/v5/api/festivals?year=2026#top").unwrap();
        assert_eq!(cache_key(&url), "https://parva.app/v5/api/festivals?year=2026");
    }
}
