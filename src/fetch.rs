// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Outbound page fetching.
//!
//! Single point of network access for endpoint discovery and source
//! verification. Redirects are followed transparently up to the configured
//! cap; callers only ever see the final response. Anything outside 2xx is
//! an error carrying the status.

use crate::config::FetchConfig;
use reqwest::header::HeaderMap;
use reqwest::{redirect, StatusCode};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

/// Fetch error types.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("no actionable response from {url} ({status})")]
    Status { url: String, status: StatusCode },

    #[error("could not read body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// The final response of a fetch, after redirects.
#[derive(Debug)]
pub struct FetchedPage {
    /// URL the response actually came from, post-redirect
    pub final_url: Url,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

/// HTTP GET client for discovery and verification fetches.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
}

impl Fetcher {
    /// Build a fetcher from the fetch configuration.
    pub fn new(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .redirect(redirect::Policy::limited(config.max_redirects))
            .danger_accept_invalid_certs(config.danger_accept_invalid_certs)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }

    /// Fetch a URL, following redirects, rejecting non-2xx responses.
    pub async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        info!(url = %url, "Fetching URL");

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            debug!(url = %url, status = %status, "Non-success status");
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        let final_url = resp.url().clone();
        let headers = resp.headers().clone();
        let body = resp.text().await.map_err(|source| FetchError::Body {
            url: url.to_string(),
            source,
        })?;

        Ok(FetchedPage {
            final_url,
            status,
            headers,
            body,
        })
    }
}
