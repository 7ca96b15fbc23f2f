// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Inbound Webmention verification.
//!
//! Implements receiver-side request verification as an ordered state
//! machine: self-reference check, URL/scheme checks, site-ownership check,
//! target existence check, then source refetch and backlink confirmation.
//! The first failing step terminates the request; each rejection carries
//! the HTTP status the receiver should answer with.
//!
//! By default the backlink step only confirms the source contains *some*
//! anchor, which is the historical baseline and weaker than the protocol
//! intends. The strict per-target check is available behind
//! `verification.require_target_backlink`.

use crate::config::{SiteConfig, VerificationConfig};
use crate::extract;
use crate::fetch::Fetcher;
use crate::mention::Mention;
use crate::mf2;
use axum::http::StatusCode;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info};
use url::Url;

/// A local post a mention may target.
#[derive(Debug, Clone)]
pub struct Post {
    pub slug: String,
    pub title: String,
    pub permalink: String,
}

/// Storage collaborator: slug to post lookup.
pub trait PostStore: Send + Sync {
    fn post_by_slug(&self, slug: &str) -> Option<Post>;
}

/// In-memory post store for tests and standalone deployments.
#[derive(Debug, Default)]
pub struct MemoryPosts {
    posts: Vec<Post>,
}

impl MemoryPosts {
    pub fn new(posts: Vec<Post>) -> Self {
        Self { posts }
    }

    /// Build a store from bare slugs, titling each after its slug.
    pub fn from_slugs<I: IntoIterator<Item = String>>(slugs: I) -> Self {
        Self {
            posts: slugs
                .into_iter()
                .map(|slug| Post {
                    title: slug.clone(),
                    permalink: format!("/{slug}"),
                    slug,
                })
                .collect(),
        }
    }
}

impl PostStore for MemoryPosts {
    fn post_by_slug(&self, slug: &str) -> Option<Post> {
        self.posts.iter().find(|p| p.slug == slug).cloned()
    }
}

/// Verification rejection reasons, each carrying its response status.
///
/// `Display` and `Error` are implemented by hand because several variants
/// carry a `String` field named `source`, which `#[derive(Error)]` would
/// otherwise try to expose as the error's `source()`.
#[derive(Debug)]
pub enum VerificationError {
    SameSourceAndTarget { source: String, target: String },

    MalformedUrl { side: &'static str, url: String },

    UnsupportedScheme { side: &'static str, scheme: String },

    TargetOffSite { target: String, site: String },

    UnknownTarget { slug: String },

    SourceUnreachable { source: String, reason: String },

    NoBacklink { source: String, target: String },
}

impl std::fmt::Display for VerificationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SameSourceAndTarget { source, target } => write!(
                f,
                "Webmention source: {source} cannot be the same as the target: {target}"
            ),
            Self::MalformedUrl { side, url } => {
                write!(f, "Could not parse {side} URL: {url}")
            }
            Self::UnsupportedScheme { side, scheme } => {
                write!(f, "Webmention {side} must be http(s), got scheme: {scheme}")
            }
            Self::TargetOffSite { target, site } => {
                write!(f, "Target: {target} does not match this site URL: {site}")
            }
            Self::UnknownTarget { slug } => {
                write!(f, "No post found for target slug: {slug}")
            }
            Self::SourceUnreachable { source, reason } => {
                write!(f, "Could not load source: {source}: {reason}")
            }
            Self::NoBacklink { source, target } => {
                write!(f, "Source: {source} does not link to target: {target}")
            }
        }
    }
}

impl std::error::Error for VerificationError {}

impl VerificationError {
    /// HTTP status this rejection maps to on the wire.
    ///
    /// A fetch failure on the source is a soft failure: it is logged and
    /// the request ends without an error status being committed.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::SameSourceAndTarget { .. }
            | Self::MalformedUrl { .. }
            | Self::UnsupportedScheme { .. }
            | Self::TargetOffSite { .. }
            | Self::NoBacklink { .. } => StatusCode::BAD_REQUEST,
            Self::UnknownTarget { .. } => StatusCode::NOT_FOUND,
            Self::SourceUnreachable { .. } => StatusCode::OK,
        }
    }
}

/// Inbound mention verifier.
pub struct Verifier {
    fetcher: Fetcher,
    store: Arc<dyn PostStore>,
    site_base: String,
    require_target_backlink: bool,
}

impl Verifier {
    pub fn new(
        fetcher: Fetcher,
        store: Arc<dyn PostStore>,
        site: &SiteConfig,
        verification: &VerificationConfig,
    ) -> Self {
        Self {
            fetcher,
            store,
            site_base: site.base_url.clone(),
            require_target_backlink: verification.require_target_backlink,
        }
    }

    /// Run the verification state machine for one request.
    ///
    /// On success the returned mention is classified and populated from
    /// the fetched source; persisting it is the caller's job.
    pub async fn verify(
        &self,
        source: &str,
        target: &str,
    ) -> Result<Mention, VerificationError> {
        // The receiver MUST reject the request if the source URL is the
        // same as the target URL.
        if source == target {
            return Err(VerificationError::SameSourceAndTarget {
                source: source.to_string(),
                target: target.to_string(),
            });
        }

        // Both must be absolute URLs of a scheme we accept.
        let _parsed_source = parse_checked(source, "source")?;
        let parsed_target = parse_checked(target, "target")?;

        // Only mentions of this site are accepted.
        if !target.starts_with(&self.site_base) {
            return Err(VerificationError::TargetOffSite {
                target: target.to_string(),
                site: self.site_base.clone(),
            });
        }

        // The target must name a post we can accept mentions for.
        let slug = target_slug(&parsed_target);
        let post = self
            .store
            .post_by_slug(slug)
            .ok_or_else(|| VerificationError::UnknownTarget {
                slug: slug.to_string(),
            })?;

        debug!(
            source = %source,
            target = %target,
            post = %post.title,
            "Webmention verification"
        );

        // Refetch the source to confirm it actually mentions us.
        let page = match self.fetcher.fetch(source).await {
            Ok(page) => page,
            Err(err) => {
                error!(source = %source, error = %err, "Could not load source");
                return Err(VerificationError::SourceUnreachable {
                    source: source.to_string(),
                    reason: err.to_string(),
                });
            }
        };

        let backlink_ok = if self.require_target_backlink {
            extract::links_to(&page.body, target)
        } else {
            extract::has_any_anchor(&page.body)
        };
        if !backlink_ok {
            return Err(VerificationError::NoBacklink {
                source: source.to_string(),
                target: target.to_string(),
            });
        }

        // Classify against the source's first h-entry and build the record.
        let received = Utc::now();
        let mention = match mf2::first_h_entry(&page.body, Some(&page.final_url)) {
            Some(entry) => Mention::from_entry(source, target, &entry, received),
            None => Mention::new(source, target, received),
        };

        info!(
            source = %source,
            target = %target,
            kind = %mention.kind,
            "Webmention verified"
        );
        Ok(mention)
    }
}

fn parse_checked(url: &str, side: &'static str) -> Result<Url, VerificationError> {
    let parsed = Url::parse(url).map_err(|_| VerificationError::MalformedUrl {
        side,
        url: url.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(VerificationError::UnsupportedScheme {
            side,
            scheme: parsed.scheme().to_string(),
        });
    }
    Ok(parsed)
}

/// Last path segment of the target URL, used as the post slug.
fn target_slug(target: &Url) -> &str {
    target.path().rsplit('/').next().unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FetchConfig;

    fn verifier(require_target_backlink: bool) -> Verifier {
        let store = Arc::new(MemoryPosts::from_slugs(vec!["hello-world".to_string()]));
        Verifier::new(
            Fetcher::new(&FetchConfig::default()).unwrap(),
            store,
            &SiteConfig {
                base_url: "http://site.example".to_string(),
            },
            &VerificationConfig {
                require_target_backlink,
            },
        )
    }

    #[tokio::test]
    async fn test_rejects_self_mention() {
        let v = verifier(false);
        let err = v
            .verify("http://site.example/posts/hello-world", "http://site.example/posts/hello-world")
            .await
            .unwrap_err();
        assert!(matches!(err, VerificationError::SameSourceAndTarget { .. }));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("cannot be the same as the target"));
    }

    #[tokio::test]
    async fn test_rejects_malformed_urls() {
        let v = verifier(false);
        let err = v
            .verify("not a url", "http://site.example/posts/hello-world")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            VerificationError::MalformedUrl { side: "source", .. }
        ));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_rejects_unsupported_scheme_naming_it() {
        let v = verifier(false);
        let err = v
            .verify("gopher://burrow.example/x", "http://site.example/posts/hello-world")
            .await
            .unwrap_err();
        match &err {
            VerificationError::UnsupportedScheme { side, scheme } => {
                assert_eq!(*side, "source");
                assert_eq!(scheme, "gopher");
            }
            other => panic!("expected scheme rejection, got {other:?}"),
        }
        assert!(err.to_string().contains("gopher"));
    }

    #[tokio::test]
    async fn test_rejects_offsite_target() {
        let v = verifier(false);
        let err = v
            .verify("http://remote.example/post", "http://other.example/posts/hello-world")
            .await
            .unwrap_err();
        assert!(matches!(err, VerificationError::TargetOffSite { .. }));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_slug_is_404() {
        let v = verifier(false);
        let err = v
            .verify("http://remote.example/post", "http://site.example/posts/nope")
            .await
            .unwrap_err();
        assert!(matches!(err, VerificationError::UnknownTarget { .. }));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_target_slug() {
        let url = Url::parse("http://site.example/posts/hello-world").unwrap();
        assert_eq!(target_slug(&url), "hello-world");
    }

    #[test]
    fn test_memory_posts_lookup() {
        let store = MemoryPosts::from_slugs(vec!["a".to_string(), "b".to_string()]);
        assert!(store.post_by_slug("a").is_some());
        assert!(store.post_by_slug("c").is_none());
    }
}
