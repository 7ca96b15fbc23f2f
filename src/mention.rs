// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! The durable mention record.
//!
//! A `Mention` is created by the inbound verifier once the backlink check
//! has passed, and from then on only moderation touches it (the approval
//! state transition). The outbound path never mutates mentions.

use crate::classify::{classify, MentionKind};
use crate::mf2::{self, Item, PropertyValue};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author of a mention, extracted from the source h-card. All fields
/// default to empty when the source carries no markup for them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Author {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub photo: String,
    #[serde(default)]
    pub note: String,
}

/// Moderation state of a mention. New mentions start pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalState {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalState {
    /// Human-readable label for moderation views.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
        }
    }
}

impl Default for ApprovalState {
    fn default() -> Self {
        Self::Pending
    }
}

/// A verified, classified mention of a local post.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mention {
    #[serde(rename = "type")]
    pub kind: MentionKind,
    /// URL of the remote document that mentioned us
    pub source: String,
    /// URL of the local post mentioned
    pub target: String,
    /// Raw fragment of the source judged to be the linking entry
    pub source_html: String,
    pub author: Author,
    pub published: DateTime<Utc>,
    pub content_text: String,
    /// Sanitized rendering of the source entry's content
    pub content_html: String,
    #[serde(default)]
    pub approval: ApprovalState,
}

impl Mention {
    /// A bare note mention with receipt-time publication, for sources
    /// carrying no h-entry markup at all.
    pub fn new(source: &str, target: &str, received: DateTime<Utc>) -> Self {
        Self {
            kind: MentionKind::Note,
            source: source.to_string(),
            target: target.to_string(),
            source_html: String::new(),
            author: Author::default(),
            published: received,
            content_text: String::new(),
            content_html: String::new(),
            approval: ApprovalState::Pending,
        }
    }

    /// Build a mention from the source document's h-entry.
    ///
    /// Classifies the entry, extracts author and content, and parses the
    /// published timestamp, falling back to receipt time.
    pub fn from_entry(
        source: &str,
        target: &str,
        entry: &Item,
        received: DateTime<Utc>,
    ) -> Self {
        let mut mention = Self::new(source, target, received);
        mention.kind = classify(entry, target);
        mention.source_html = entry.html.clone();
        mention.author = author_from_entry(entry);

        if let Some(published) = entry.first_text("published").and_then(parse_published) {
            mention.published = published;
        }

        match entry.property("content").first() {
            Some(PropertyValue::Fragment { html, text }) => {
                mention.content_text = text.clone();
                mention.content_html = ammonia::clean(html);
            }
            Some(PropertyValue::Text(s)) => {
                mention.content_text = s.clone();
                mention.content_html = ammonia::clean(s);
            }
            _ => {}
        }

        mention
    }

    /// Re-parse the stored source fragment as an h-entry.
    pub fn as_h_entry(&self) -> Option<Item> {
        mf2::first_h_entry(&self.source_html, None)
    }
}

fn author_from_entry(entry: &Item) -> Author {
    match entry.property("author").first() {
        Some(PropertyValue::Item(card)) => Author {
            name: card.first_text("name").unwrap_or_default().to_string(),
            url: card.first_text("url").unwrap_or_default().to_string(),
            photo: card.first_text("photo").unwrap_or_default().to_string(),
            note: card.first_text("note").unwrap_or_default().to_string(),
        },
        Some(PropertyValue::Text(name)) => Author {
            name: name.clone(),
            ..Author::default()
        },
        _ => Author::default(),
    }
}

/// Parse a published timestamp from the formats seen in the wild:
/// RFC 3339, RFC 2822, then naive datetime and date-only forms taken
/// as UTC.
fn parse_published(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Some(naive.and_utc());
        }
    }
    None
}
