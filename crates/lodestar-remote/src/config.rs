//! Region and endpoint resolution.
//!
//! Each declarative object names the region its job runs in and may carry
//! an endpoint override (for private links or test stacks). The resolver
//! turns those into the concrete configuration a client is built from.
//! Resolution failures are terminal for the pass: retrying an unchanged
//! misconfiguration cannot succeed.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Endpoint template used when no override applies. `{region}` is
/// substituted with the declared region.
pub const DEFAULT_ENDPOINT_TEMPLATE: &str = "https://training.{region}.api.mljobs.cloud";

/// Errors resolving remote-access configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// The declared region is empty or malformed.
    #[error("invalid region: {message}")]
    InvalidRegion { message: String },

    /// An endpoint override is not a usable URL.
    #[error("invalid endpoint override '{endpoint}': {message}")]
    InvalidEndpoint { endpoint: String, message: String },
}

/// Resolved per-call remote-access configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Region the job runs in.
    pub region: String,
    /// Base URL of the API endpoint, without a trailing slash.
    pub endpoint: String,
}

/// Resolves a declared region plus optional endpoint override into a
/// [`RemoteConfig`].
pub trait RegionResolver: Send + Sync {
    /// Resolve configuration for `region`, honoring `endpoint_override`
    /// when present.
    fn resolve(
        &self,
        region: &str,
        endpoint_override: Option<&str>,
    ) -> Result<RemoteConfig, ResolveError>;
}

/// Default resolver: a per-object override wins, then a process-wide
/// default override, then the endpoint template.
#[derive(Debug, Clone, Default)]
pub struct StaticRegionResolver {
    default_endpoint: Option<String>,
}

impl StaticRegionResolver {
    /// Create a resolver with no process-wide override.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the process-wide default endpoint override.
    #[must_use]
    pub fn with_default_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.default_endpoint = Some(endpoint.into());
        self
    }
}

impl RegionResolver for StaticRegionResolver {
    fn resolve(
        &self,
        region: &str,
        endpoint_override: Option<&str>,
    ) -> Result<RemoteConfig, ResolveError> {
        if region.is_empty() || !region.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(ResolveError::InvalidRegion {
                message: format!("'{region}' is not a region name"),
            });
        }

        let endpoint = endpoint_override
            .map(str::to_string)
            .or_else(|| self.default_endpoint.clone())
            .unwrap_or_else(|| DEFAULT_ENDPOINT_TEMPLATE.replace("{region}", region));

        if !endpoint.starts_with("https://") && !endpoint.starts_with("http://") {
            return Err(ResolveError::InvalidEndpoint {
                endpoint,
                message: "expected an http(s) URL".to_string(),
            });
        }

        Ok(RemoteConfig {
            region: region.to_string(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolves_template_endpoint() {
        let resolver = StaticRegionResolver::new();
        let config = resolver.resolve("us-west-2", None).unwrap();
        assert_eq!(config.region, "us-west-2");
        assert_eq!(config.endpoint, "https://training.us-west-2.api.mljobs.cloud");
    }

    #[test]
    fn test_object_override_wins_over_default() {
        let resolver =
            StaticRegionResolver::new().with_default_endpoint("https://default.example.com");
        let config = resolver
            .resolve("eu-central-1", Some("https://override.example.com/"))
            .unwrap();
        assert_eq!(config.endpoint, "https://override.example.com");
    }

    #[test]
    fn test_default_endpoint_applies_without_override() {
        let resolver =
            StaticRegionResolver::new().with_default_endpoint("https://default.example.com");
        let config = resolver.resolve("eu-central-1", None).unwrap();
        assert_eq!(config.endpoint, "https://default.example.com");
    }

    #[test]
    fn test_empty_region_is_rejected() {
        let resolver = StaticRegionResolver::new();
        assert!(matches!(
            resolver.resolve("", None),
            Err(ResolveError::InvalidRegion { .. })
        ));
    }

    #[test]
    fn test_non_url_override_is_rejected() {
        let resolver = StaticRegionResolver::new();
        assert!(matches!(
            resolver.resolve("us-west-2", Some("ftp://nope")),
            Err(ResolveError::InvalidEndpoint { .. })
        ));
    }
}
