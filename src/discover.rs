// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Webmention endpoint discovery.
//!
//! Resolution order per the protocol: `Link` response headers first, then
//! the first `<link>` or `<a>` with a `webmention` rel token in document
//! order. Rel matching is exact-token over whitespace-split rel values;
//! `rel="webmention feed"` matches, `rel="somewebmentioner"` does not.
//! Relative endpoints resolve against the final (post-redirect) page URL.
//!
//! A page advertising no endpoint at all, or an empty href, resolves to
//! the page URL itself. That permissive fallback is inherited behavior
//! (webmention.rocks test 15 generalized to the no-match case) and is
//! preserved deliberately; see the discovery tests before changing it.

use crate::fetch::{FetchError, Fetcher};
use reqwest::header::{self, HeaderMap};
use scraper::{Html, Selector};
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

/// Discovery error types.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("could not fetch target page: {0}")]
    Fetch(#[from] FetchError),

    #[error("advertised endpoint {endpoint} did not resolve against {page}: {source}")]
    UnresolvableEndpoint {
        endpoint: String,
        page: String,
        #[source]
        source: url::ParseError,
    },
}

/// One link-value from a `Link` header: target URL plus its rel string.
#[derive(Debug, PartialEq)]
struct HeaderLink {
    target: String,
    rel: String,
}

/// Endpoint discovery over the network.
#[derive(Debug, Clone)]
pub struct Discovery {
    fetcher: Fetcher,
}

impl Discovery {
    pub fn new(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }

    /// Fetch a mention target and resolve its advertised endpoint.
    pub async fn discover_endpoint(&self, target: &str) -> Result<Url, DiscoveryError> {
        let page = self.fetcher.fetch(target).await.map_err(|err| {
            error!(target = %target, error = %err, "Endpoint discovery fetch failed");
            err
        })?;

        let endpoint = resolve(&page.final_url, &page.headers, &page.body)?;
        debug!(target = %target, endpoint = %endpoint, "Resolved webmention endpoint");
        Ok(endpoint)
    }
}

/// Resolve the advertised endpoint for an already-fetched page.
///
/// `page_url` must be the final URL after redirects, since relative
/// endpoints resolve against it.
pub fn resolve(
    page_url: &Url,
    headers: &HeaderMap,
    html: &str,
) -> Result<Url, DiscoveryError> {
    let candidate = endpoint_from_headers(headers).or_else(|| endpoint_from_html(html));

    let href = match candidate {
        // No endpoint advertised, or an empty href: both resolve to the
        // page itself (empty-string relative resolution).
        None => String::new(),
        Some(href) => href,
    };

    page_url
        .join(&href)
        .map_err(|source| DiscoveryError::UnresolvableEndpoint {
            endpoint: href,
            page: page_url.to_string(),
            source,
        })
}

/// First webmention endpoint among all `Link` headers, if any.
///
/// A response may carry several `Link` headers, each with several
/// comma-separated link-values.
pub fn endpoint_from_headers(headers: &HeaderMap) -> Option<String> {
    for value in headers.get_all(header::LINK) {
        let Ok(value) = value.to_str() else { continue };
        for link in parse_link_header(value) {
            if rel_has_webmention(&link.rel) {
                return Some(link.target);
            }
        }
    }
    None
}

/// First `<link>` or `<a>` carrying a webmention rel token and an href,
/// in document order. The returned href may be an empty string.
pub fn endpoint_from_html(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let sel = Selector::parse("link, a").expect("link/anchor selector");

    for el in doc.select(&sel) {
        let Some(rel) = el.value().attr("rel") else { continue };
        if !rel_has_webmention(rel) {
            continue;
        }
        if let Some(href) = el.value().attr("href") {
            return Some(href.to_string());
        }
    }
    None
}

/// Exact-token rel match over whitespace-split rel values.
fn rel_has_webmention(rel: &str) -> bool {
    rel.split_whitespace().any(|token| token == "webmention")
}

/// Parse a `Link` header value into its link-values.
///
/// Handles multiple comma-separated link-values per header line, quoted
/// and unquoted rel parameters, and parameters in any order. Malformed
/// link-values are skipped rather than failing the whole header.
fn parse_link_header(value: &str) -> Vec<HeaderLink> {
    split_link_values(value)
        .into_iter()
        .filter_map(parse_link_value)
        .collect()
}

/// Split on top-level commas, respecting `<...>` and quoted strings.
fn split_link_values(value: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_angle = false;
    let mut in_quote = false;

    for (i, c) in value.char_indices() {
        match c {
            '<' if !in_quote => in_angle = true,
            '>' if !in_quote => in_angle = false,
            '"' => in_quote = !in_quote,
            ',' if !in_angle && !in_quote => {
                parts.push(&value[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&value[start..]);
    parts
}

/// Parse a single link-value: `<URL>; rel="webmention"; ...`
fn parse_link_value(value: &str) -> Option<HeaderLink> {
    let value = value.trim();
    let rest = value.strip_prefix('<')?;
    let (target, params) = rest.split_once('>')?;

    let mut rel = String::new();
    for param in params.split(';').skip_while(|p| p.trim().is_empty()) {
        let Some((name, raw)) = param.split_once('=') else { continue };
        if name.trim().eq_ignore_ascii_case("rel") {
            rel = raw.trim().trim_matches('"').to_string();
            break;
        }
    }

    Some(HeaderLink {
        target: target.to_string(),
        rel,
    })
}
