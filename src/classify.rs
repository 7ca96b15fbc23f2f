// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Post-type discovery.
//!
//! Given the source document's h-entry, infer the semantic kind of the
//! mention with the community post-type-discovery cascade. Ordering
//! matters: an entry carrying both `rsvp` and a non-matching `in-reply-to`
//! is an RSVP, and an `in-reply-to` that exactly equals the target is more
//! specific than a generic reply. Classification never fails; anything
//! unmatched is a note.

use crate::mf2::{Item, PropertyValue};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Semantic kind of a mention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MentionKind {
    Note,
    Comment,
    Reply,
    Rsvp,
    Share,
    Favorite,
    Video,
    Photo,
}

impl fmt::Display for MentionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Note => "note",
            Self::Comment => "comment",
            Self::Reply => "reply",
            Self::Rsvp => "rsvp",
            Self::Share => "share",
            Self::Favorite => "favorite",
            Self::Video => "video",
            Self::Photo => "photo",
        };
        write!(f, "{label}")
    }
}

impl Default for MentionKind {
    fn default() -> Self {
        Self::Note
    }
}

/// Classify an h-entry against the target URL it was sent for.
pub fn classify(entry: &Item, target_url: &str) -> MentionKind {
    if entry.properties.is_empty() {
        return MentionKind::Note;
    }

    // An in-reply-to naming the target exactly is a comment on it.
    if has_property_value(entry, "in-reply-to", |v| v == target_url) {
        return MentionKind::Comment;
    }

    if has_property_value(entry, "rsvp", is_rsvp_value) {
        return MentionKind::Rsvp;
    }

    if has_property_value(entry, "in-reply-to", is_valid_url) {
        return MentionKind::Reply;
    }

    if has_property_value(entry, "repost-of", is_valid_url) {
        return MentionKind::Share;
    }

    if has_property_value(entry, "like-of", is_valid_url) {
        return MentionKind::Favorite;
    }

    if has_property_value(entry, "video", is_valid_url) {
        return MentionKind::Video;
    }

    if has_property_value(entry, "photo", is_valid_url) {
        return MentionKind::Photo;
    }

    MentionKind::Note
}

/// True when any value of the property satisfies the predicate.
///
/// Plain strings are tested directly; nested items are tested on their
/// principal value and on their own `url` property.
pub fn has_property_value<F>(entry: &Item, name: &str, pred: F) -> bool
where
    F: Fn(&str) -> bool,
{
    entry.property(name).iter().any(|value| match value {
        PropertyValue::Text(s) => pred(s),
        PropertyValue::Fragment { text, .. } => pred(text),
        PropertyValue::Item(item) => {
            if item.value.as_deref().map(&pred).unwrap_or(false) {
                return true;
            }
            item.first_text("url").map(&pred).unwrap_or(false)
        }
    })
}

/// URL validity for post-type discovery: parses with scheme http or https
/// after trimming surrounding whitespace.
pub fn is_valid_url(value: &str) -> bool {
    match Url::parse(value.trim()) {
        Ok(url) => matches!(url.scheme(), "http" | "https"),
        Err(_) => false,
    }
}

/// Valid RSVP values per the vocabulary.
pub fn is_rsvp_value(value: &str) -> bool {
    matches!(value, "yes" | "no" | "maybe" | "interested")
}
