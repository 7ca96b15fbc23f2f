// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Hyperlink extraction from HTML fragments.
//!
//! Used on the outbound path to find which pages a rendered post body
//! links to, and on the inbound path to confirm a fetched source document
//! actually carries a backlink.

use scraper::{Html, Selector};

fn anchor_selector() -> Selector {
    // "a" is a valid selector; parse cannot fail here
    Selector::parse("a").expect("anchor selector")
}

/// Extract every anchor href from an HTML fragment, in document order.
///
/// Duplicates are preserved and relative URLs are returned untouched;
/// resolution against a base is the caller's job.
pub fn extract_links(html: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    let sel = anchor_selector();
    doc.select(&sel)
        .filter_map(|a| a.value().attr("href"))
        .map(str::to_string)
        .collect()
}

/// True when the document contains at least one anchor with an href.
///
/// This is the historical baseline backlink check: it confirms the source
/// links to *something*, not that it links to the target. The strict
/// variant is [`links_to`].
pub fn has_any_anchor(html: &str) -> bool {
    let doc = Html::parse_document(html);
    let sel = anchor_selector();
    doc.select(&sel).any(|a| a.value().attr("href").is_some())
}

/// True when the document contains an anchor whose href equals `target`.
pub fn links_to(html: &str, target: &str) -> bool {
    let doc = Html::parse_document(html);
    let sel = anchor_selector();
    doc.select(&sel)
        .filter_map(|a| a.value().attr("href"))
        .any(|href| href == target)
}
