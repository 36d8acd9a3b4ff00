//! App Store Server API bearer-token claims
//!
//! Requests to the App Store Server API authenticate with a short-lived ES256
//! token whose claims name the issuer, the app and a fixed audience.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::Claims;

/// Audience every App Store Server API token carries
pub const APP_STORE_AUDIENCE: &str = "appstoreconnect-v1";

/// Longest lifetime Apple accepts, in seconds
pub const MAX_TOKEN_TTL_SECS: u64 = 3600;

/// Claims for an App Store Server API bearer token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiTokenClaims {
    issuer_id: String,
    bundle_id: String,
    ttl_secs: u64,
}

impl ApiTokenClaims {
    /// Claims for `issuer_id` and `bundle_id`
    ///
    /// A `ttl_secs` of zero selects [`MAX_TOKEN_TTL_SECS`]; larger values are
    /// capped to it.
    #[must_use]
    pub fn new(issuer_id: impl Into<String>, bundle_id: impl Into<String>, ttl_secs: u64) -> Self {
        let ttl_secs = if ttl_secs == 0 {
            MAX_TOKEN_TTL_SECS
        } else {
            ttl_secs.min(MAX_TOKEN_TTL_SECS)
        };

        Self {
            issuer_id: issuer_id.into(),
            bundle_id: bundle_id.into(),
            ttl_secs,
        }
    }

    /// Issuer ID from App Store Connect
    #[must_use]
    pub fn issuer_id(&self) -> &str {
        &self.issuer_id
    }

    /// Bundle ID of the app
    #[must_use]
    pub fn bundle_id(&self) -> &str {
        &self.bundle_id
    }

    /// Effective lifetime in seconds
    #[must_use]
    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// Claims issued at `now` (seconds since the Unix epoch)
    #[must_use]
    pub fn to_claims_at(&self, now: u64) -> Claims {
        let mut claims = Claims::new();
        claims.insert("iss".into(), self.issuer_id.clone().into());
        claims.insert("iat".into(), now.into());
        claims.insert("exp".into(), now.saturating_add(self.ttl_secs).into());
        claims.insert("aud".into(), APP_STORE_AUDIENCE.into());
        claims.insert("bid".into(), self.bundle_id.clone().into());
        claims
    }

    /// Claims issued now
    #[must_use]
    pub fn to_claims(&self) -> Claims {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        self.to_claims_at(now)
    }
}
