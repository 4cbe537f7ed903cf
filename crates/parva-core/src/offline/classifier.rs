use reqwest::Method;

use crate::cache::{BucketPurpose, CacheVersion};

use super::{InterceptedRequest, RequestOrigin};

/// How the agent resolves one intercepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Not intercepted; the page's request proceeds untouched.
    Ignore,
    CacheFirst { bucket: String },
    NetworkFirst { bucket: String },
}

#[derive(Debug, Clone)]
pub struct RequestClassifier {
    static_bucket: String,
    api_bucket: String,
}

impl RequestClassifier {
    pub fn new(version: &CacheVersion) -> Self {
        Self {
            static_bucket: version.bucket(BucketPurpose::Static),
            api_bucket: version.bucket(BucketPurpose::Api),
        }
    }

    /// Rules apply in order. Cross-origin requests are ignored before any
    /// path matching so a failing dev API host is never masked by an
    /// offline response.
    pub fn classify(&self, request: &InterceptedRequest) -> Route {
        if request.method != Method::GET {
            return Route::Ignore;
        }
        if request.origin == RequestOrigin::Cross {
            return Route::Ignore;
        }
        if is_versioned_api_path(request.url.path()) {
            return Route::NetworkFirst {
                bucket: self.api_bucket.clone(),
            };
        }
        Route::CacheFirst {
            bucket: self.static_bucket.clone(),
        }
    }
}

/// Matches `/v{N}/api` followed by `/` or the end of the path.
pub fn is_versioned_api_path(path: &str) -> bool {
    let Some(rest) = path.strip_prefix("/v") else {
        return false;
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return false;
    }
    match rest[digits..].strip_prefix("/api") {
        Some(tail) => tail.is_empty() || tail.starts_with('/'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn classifier() -> RequestClassifier {
        RequestClassifier::new(&CacheVersion::new("parva", "v5"))
    }

    fn request(method: Method, url: &str) -> InterceptedRequest {
        let scope = Url::parse("https://parva.app/").unwrap();
        InterceptedRequest::new(method, Url::parse(url).unwrap(), &scope)
    }

    #[test]
    fn test_non_get_is_ignored() {
        for method in [Method::POST, Method::PUT, Method::DELETE, Method::HEAD] {
            assert_eq!(
                classifier().classify(&request(method, "https://parva.app/v5/api/festivals")),
                Route::Ignore
            );
        }
    }

    #[test]
    fn test_cross_origin_is_ignored_even_for_api_paths() {
        assert_eq!(
            classifier().classify(&request(Method::GET, "http://localhost:8000/v5/api/festivals")),
            Route::Ignore
        );
    }

    #[test]
    fn test_api_paths_are_network_first() {
        assert_eq!(
            classifier().classify(&request(Method::GET, "https://parva.app/v3/api/calendar/today")),
            Route::NetworkFirst {
                bucket: "parva-v5-api".to_string()
            }
        );
    }

    #[test]
    fn test_other_same_origin_gets_are_cache_first() {
        for url in [
            "https://parva.app/",
            "https://parva.app/assets/app.js",
            "https://parva.app/version/api/notes",
        ] {
            assert_eq!(
                classifier().classify(&request(Method::GET, url)),
                Route::CacheFirst {
                    bucket: "parva-v5-static".to_string()
                },
                "{url}"
            );
        }
    }

    #[test]
    fn test_versioned_api_path_matching() {
        assert!(is_versioned_api_path("/v5/api/festivals"));
        assert!(is_versioned_api_path("/v12/api/"));
        assert!(is_versioned_api_path("/v5/api"));
        assert!(!is_versioned_api_path("/v/api/festivals"));
        assert!(!is_versioned_api_path("/v5/apis/festivals"));
        assert!(!is_versioned_api_path("/api/v5/festivals"));
        assert!(!is_versioned_api_path("/video/api/x"));
    }
}
