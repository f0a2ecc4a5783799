//! Origin marker for service-to-service calls
//!
//! A service calling another one synchronously can name itself in the
//! `x-origin` header. The callee decides, once at its HTTP boundary, whether
//! that origin is one it trusts to have already vouched for the request.

pub const ORIGIN_HEADER: &str = "x-origin";

/// Origin name the user registry sends on its own calls.
pub const USER_SERVICE_ORIGIN: &str = "user-service";

/// Set of origin names whose requests are treated as internal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginPolicy {
    trusted: Vec<String>,
}

impl OriginPolicy {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let trusted = names
            .into_iter()
            .map(|s| s.as_ref().trim().to_ascii_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        Self { trusted }
    }

    /// Parse a comma separated list, e.g. `"user-service, billing"`.
    pub fn from_csv(csv: &str) -> Self {
        Self::new(csv.split(','))
    }

    /// Case-insensitive membership check; `None` is never trusted.
    pub fn is_trusted(&self, origin: Option<&str>) -> bool {
        match origin.map(|o| o.trim().to_ascii_lowercase()) {
            Some(origin) if !origin.is_empty() => self.trusted.iter().any(|t| *t == origin),
            _ => false,
        }
    }

    #[cfg(feature = "axum")]
    pub fn is_trusted_request(&self, headers: &http::HeaderMap) -> bool {
        self.is_trusted(headers.get(ORIGIN_HEADER).and_then(|v| v.to_str().ok()))
    }
}

impl Default for OriginPolicy {
    fn default() -> Self {
        Self::new([USER_SERVICE_ORIGIN])
    }
}
