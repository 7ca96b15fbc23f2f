// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Webmention protocol engine.
//!
//! Implements both sides of the Webmention protocol:
//!
//! - Endpoint discovery over `Link` headers and HTML rel markup
//! - Outbound delivery with concurrent, isolated per-link fan-out
//! - Inbound request verification (scheme, ownership, target existence,
//!   source refetch, backlink confirmation)
//! - Post-type discovery over the source's microformats h-entry
//! - The durable, moderatable mention record
//!
//! Storage, templating and site configuration stay behind narrow seams:
//! [`verify::PostStore`], [`handlers::MentionSink`], and [`config::Config`].

pub mod classify;
pub mod config;
pub mod discover;
pub mod extract;
pub mod fetch;
pub mod handlers;
pub mod limiter;
pub mod mention;
pub mod mf2;
pub mod send;
pub mod verify;

pub use classify::{classify, MentionKind};
pub use config::Config;
pub use discover::Discovery;
pub use extract::extract_links;
pub use fetch::Fetcher;
pub use limiter::{RateLimitResult, SourceRateLimiter};
pub use mention::{ApprovalState, Author, Mention};
pub use send::{DeliveryOutcome, DeliveryReport, Sender};
pub use verify::{PostStore, VerificationError, Verifier};
