// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Minimal microformats2 property extraction.
//!
//! Produces the generic property tree the post-type classifier and mention
//! builder consume: a mapping from property name to an ordered list of
//! values, each value a plain string, a nested item with its own tree, or
//! an embedded HTML fragment. This intentionally covers only the class
//! patterns that matter for mentions (h-entry with nested h-card/h-cite,
//! `p-*`/`u-*`/`dt-*`/`e-*` properties); it is not a conforming
//! microformats2 parser.

use indexmap::IndexMap;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// A single microformats property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// Plain string value (`p-*`, `u-*`, `dt-*`)
    Text(String),
    /// Nested micro-item (e.g. an `h-card` under an `author` property)
    Item(Item),
    /// Embedded markup (`e-*`), carrying both raw HTML and its text
    Fragment { html: String, text: String },
}

/// A parsed micro-item: an element carrying one or more `h-*` classes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Item {
    /// The `h-*` classes of the element, e.g. `["h-entry"]`
    pub kinds: Vec<String>,
    /// Property name to ordered value list
    pub properties: IndexMap<String, Vec<PropertyValue>>,
    /// Principal value of the item (name, URL, or text)
    pub value: Option<String>,
    /// Outer HTML of the element the item was parsed from
    pub html: String,
}

impl Item {
    /// Values of a property, empty when absent.
    pub fn property(&self, name: &str) -> &[PropertyValue] {
        self.properties.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First value of a property rendered as plain text.
    pub fn first_text(&self, name: &str) -> Option<&str> {
        self.property(name).first().map(|v| match v {
            PropertyValue::Text(s) => s.as_str(),
            PropertyValue::Item(item) => item.value.as_deref().unwrap_or(""),
            PropertyValue::Fragment { text, .. } => text.as_str(),
        })
    }

    /// First nested item of a property, when the value is one.
    pub fn first_item(&self, name: &str) -> Option<&Item> {
        self.property(name).iter().find_map(|v| match v {
            PropertyValue::Item(item) => Some(item),
            _ => None,
        })
    }

    pub fn has_kind(&self, kind: &str) -> bool {
        self.kinds.iter().any(|k| k == kind)
    }
}

/// Parse a document and return its first `h-entry`, in document order.
///
/// When the document is a mention source, the first entry *should* be the
/// linking entry if the author marked it up at all.
pub fn first_h_entry(html: &str, base: Option<&Url>) -> Option<Item> {
    let doc = Html::parse_document(html);
    let any = Selector::parse("*").expect("universal selector");
    let root = doc
        .select(&any)
        .find(|el| el.value().classes().any(|c| c == "h-entry"))?;
    Some(parse_item(root, base))
}

/// Parse an element carrying `h-*` classes into an item.
fn parse_item(el: ElementRef<'_>, base: Option<&Url>) -> Item {
    let kinds: Vec<String> = el
        .value()
        .classes()
        .filter(|c| c.starts_with("h-"))
        .map(str::to_string)
        .collect();

    let mut item = Item {
        kinds,
        properties: IndexMap::new(),
        value: None,
        html: el.html(),
    };

    for child in el.children().filter_map(ElementRef::wrap) {
        collect_properties(child, &mut item, base);
    }

    // Implied url for items rooted on a linking element, the one implied
    // property mentions actually depend on (h-card as <a href=...>).
    if !item.properties.contains_key("url")
        && matches!(el.value().name(), "a" | "area")
    {
        if let Some(href) = el.value().attr("href") {
            let resolved = match base {
                Some(base) => base.join(href).map(|u| u.to_string()).unwrap_or_else(|_| href.to_string()),
                None => href.to_string(),
            };
            item.properties
                .insert("url".to_string(), vec![PropertyValue::Text(resolved)]);
        }
    }

    let value = principal_value(&item, el, base);
    item.value = value;
    item
}

/// Walk an element subtree attributing property classes to `item`.
///
/// A descendant that is itself an `h-*` item becomes a nested value and is
/// not scanned for the parent's properties.
fn collect_properties(el: ElementRef<'_>, item: &mut Item, base: Option<&Url>) {
    let props = property_classes(el);
    let is_nested_item = el.value().classes().any(|c| c.starts_with("h-"));

    if is_nested_item {
        if !props.is_empty() {
            let nested = parse_item(el, base);
            for (_, name) in &props {
                item.properties
                    .entry(name.clone())
                    .or_default()
                    .push(PropertyValue::Item(nested.clone()));
            }
        }
        return;
    }

    for (prefix, name) in &props {
        let value = match prefix.as_str() {
            "p" => PropertyValue::Text(plain_value(el)),
            "u" => PropertyValue::Text(url_value(el, base)),
            "dt" => PropertyValue::Text(datetime_value(el)),
            "e" => PropertyValue::Fragment {
                html: el.inner_html(),
                text: el.text().collect::<String>().trim().to_string(),
            },
            _ => continue,
        };
        item.properties.entry(name.clone()).or_default().push(value);
    }

    for child in el.children().filter_map(ElementRef::wrap) {
        collect_properties(child, item, base);
    }
}

/// Property classes of an element as `(prefix, property-name)` pairs.
fn property_classes(el: ElementRef<'_>) -> Vec<(String, String)> {
    el.value()
        .classes()
        .filter_map(|c| {
            for prefix in ["p-", "u-", "dt-", "e-"] {
                if let Some(name) = c.strip_prefix(prefix) {
                    if !name.is_empty() {
                        return Some((
                            prefix.trim_end_matches('-').to_string(),
                            name.to_string(),
                        ));
                    }
                }
            }
            None
        })
        .collect()
}

fn plain_value(el: ElementRef<'_>) -> String {
    if el.value().name() == "img" {
        if let Some(alt) = el.value().attr("alt") {
            return alt.to_string();
        }
    }
    collapse_ws(&el.text().collect::<String>())
}

fn url_value(el: ElementRef<'_>, base: Option<&Url>) -> String {
    let raw = el
        .value()
        .attr("href")
        .or_else(|| el.value().attr("src"))
        .map(str::to_string)
        .unwrap_or_else(|| collapse_ws(&el.text().collect::<String>()));

    match base {
        Some(base) => base.join(&raw).map(|u| u.to_string()).unwrap_or(raw),
        None => raw,
    }
}

fn datetime_value(el: ElementRef<'_>) -> String {
    el.value()
        .attr("datetime")
        .map(str::to_string)
        .unwrap_or_else(|| collapse_ws(&el.text().collect::<String>()))
}

fn principal_value(item: &Item, el: ElementRef<'_>, base: Option<&Url>) -> Option<String> {
    if let Some(name) = item.first_text("name") {
        if !name.is_empty() {
            return Some(name.to_string());
        }
    }
    if el.value().attr("href").is_some() || el.value().attr("src").is_some() {
        return Some(url_value(el, base));
    }
    let text = collapse_ws(&el.text().collect::<String>());
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Trim and collapse internal whitespace runs to single spaces.
pub fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_h_entry_with_nested_cite() {
        let html = r#"
            <div class="h-entry">
                <div class="u-in-reply-to h-cite">
                    <a class="p-name u-url" href="http://example.com/post">Example Post</a>
                </div>
            </div>
        "#;
        let entry = first_h_entry(html, None).unwrap();
        assert!(entry.has_kind("h-entry"));

        let cite = entry.first_item("in-reply-to").unwrap();
        assert!(cite.has_kind("h-cite"));
        assert_eq!(cite.first_text("url"), Some("http://example.com/post"));
        assert_eq!(cite.value.as_deref(), Some("Example Post"));
    }

    #[test]
    fn test_no_h_entry() {
        assert!(first_h_entry("<div><p>nothing here</p></div>", None).is_none());
    }

    #[test]
    fn test_plain_properties() {
        let html = r#"
            <div class="h-entry">
                <span class="p-rsvp">yes</span>
                <time class="dt-published" datetime="2020-05-01T10:00:00Z">May 1</time>
                <div class="e-content">Hello <b>world</b></div>
            </div>
        "#;
        let entry = first_h_entry(html, None).unwrap();
        assert_eq!(entry.first_text("rsvp"), Some("yes"));
        assert_eq!(entry.first_text("published"), Some("2020-05-01T10:00:00Z"));
        match &entry.property("content")[0] {
            PropertyValue::Fragment { html, text } => {
                assert_eq!(html.trim(), "Hello <b>world</b>");
                assert_eq!(text, "Hello world");
            }
            other => panic!("expected fragment, got {other:?}"),
        }
    }

    #[test]
    fn test_author_h_card() {
        let html = r#"
            <article class="h-entry">
                <a class="p-author h-card" href="https://author.example/">
                    <img class="u-photo" src="https://author.example/me.jpg" alt="">
                    <span class="p-name">A. Author</span>
                </a>
                <p class="p-name">Entry title</p>
            </article>
        "#;
        let entry = first_h_entry(html, None).unwrap();
        let author = entry.first_item("author").unwrap();
        assert!(author.has_kind("h-card"));
        assert_eq!(author.first_text("name"), Some("A. Author"));
        assert_eq!(
            author.first_text("photo"),
            Some("https://author.example/me.jpg")
        );
        assert_eq!(author.value.as_deref(), Some("A. Author"));
    }

    #[test]
    fn test_relative_u_property_resolves_against_base() {
        let base = Url::parse("http://a.example/posts/1").unwrap();
        let html = r#"<div class="h-entry"><a class="u-like-of" href="../liked">x</a></div>"#;
        let entry = first_h_entry(html, Some(&base)).unwrap();
        assert_eq!(entry.first_text("like-of"), Some("http://a.example/liked"));
    }

    #[test]
    fn test_photo_from_img_src() {
        let html = r#"
            <div class="h-entry">
                <img class="u-photo" src="http://example.com/photo.jpeg" />
            </div>
        "#;
        let entry = first_h_entry(html, None).unwrap();
        assert_eq!(
            entry.first_text("photo"),
            Some("http://example.com/photo.jpeg")
        );
    }

    #[test]
    fn test_collapse_ws() {
        assert_eq!(collapse_ws("  a \n  b\t c  "), "a b c");
    }
}
