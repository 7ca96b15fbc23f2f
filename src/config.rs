// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the Webmention engine.
//!
//! Each protocol concern gets its own section with serde defaults, so a
//! partial config file (or none at all) yields a working engine.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level configuration for the Webmention engine service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Site identity configuration
    #[serde(default)]
    pub site: SiteConfig,

    /// Outbound fetch configuration
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Inbound verification configuration
    #[serde(default)]
    pub verification: VerificationConfig,

    /// Outbound delivery configuration
    #[serde(default)]
    pub delivery: DeliveryConfig,

    /// Inbound rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

/// Identity of the site this engine receives mentions for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Base URL all valid mention targets must be rooted under
    /// (default: http://localhost:8080)
    #[serde(default = "default_site_url")]
    pub base_url: String,
}

/// Fetch behavior for discovery and verification fetches.
///
/// The timeout and redirect cap bound every outbound request, including
/// verification fetches of caller-supplied source URLs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Per-request timeout in seconds (default: 8)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum redirects followed per fetch (default: 10)
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Skip TLS certificate validation. Only for discovery against
    /// development hosts with self-signed certificates; verification
    /// fetches in production must leave this false. (default: false)
    #[serde(default)]
    pub danger_accept_invalid_certs: bool,

    /// User-Agent sent on outbound requests
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Inbound verification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationConfig {
    /// When true, the backlink check requires the source document to link
    /// to the exact target URL. When false, any outbound anchor in the
    /// source satisfies the check, which is the historical baseline
    /// behavior. (default: false)
    #[serde(default)]
    pub require_target_backlink: bool,
}

/// Outbound delivery configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Maximum concurrent discovery+send units per send_mentions call
    /// (default: 4)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

/// Per-source rate limiting for the inbound endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Enable the per-source limiter (default: false, matching the
    /// reference behavior; turn on for internet exposure)
    #[serde(default)]
    pub enabled: bool,

    /// Maximum requests per minute per source URL (default: 10)
    #[serde(default = "default_max_rate_per_source")]
    pub max_rate_per_source: u32,

    /// Time window for rate calculation in seconds (default: 60)
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_site_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_timeout_secs() -> u64 {
    8
}

fn default_max_redirects() -> usize {
    10
}

fn default_user_agent() -> String {
    format!("webmention-engine/{}", env!("CARGO_PKG_VERSION"))
}

fn default_max_concurrent() -> usize {
    4
}

fn default_max_rate_per_source() -> u32 {
    10
}

fn default_window_secs() -> u64 {
    60
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            site: SiteConfig::default(),
            fetch: FetchConfig::default(),
            verification: VerificationConfig::default(),
            delivery: DeliveryConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: default_site_url(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_redirects: default_max_redirects(),
            danger_accept_invalid_certs: false,
            user_agent: default_user_agent(),
        }
    }
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            require_target_backlink: false,
        }
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_rate_per_source: default_max_rate_per_source(),
            window_secs: default_window_secs(),
        }
    }
}

impl FetchConfig {
    /// Get the request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl RateLimitConfig {
    /// Get the rate window duration
    pub fn window_duration(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}
