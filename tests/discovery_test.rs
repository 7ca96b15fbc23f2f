// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: Apache-2.0

//! Integration tests for endpoint discovery over a live (mocked) server.
//!
//! The fixtures mirror the webmention.rocks discovery suite: header vs
//! markup precedence, quoted and unquoted rel, relative endpoints,
//! query-string endpoints, empty href, and redirects.

use webmention_engine::config::FetchConfig;
use webmention_engine::discover::{Discovery, DiscoveryError};
use webmention_engine::fetch::{FetchError, Fetcher};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn discovery() -> Discovery {
    Discovery::new(Fetcher::new(&FetchConfig::default()).unwrap())
}

async fn mount_page(server: &MockServer, page_path: &str, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(page_path.to_string()))
        .respond_with(template)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_link_header_absolute_url() {
    let server = MockServer::start().await;
    let endpoint_url = format!("{}/webmention", server.uri());
    mount_page(
        &server,
        "/test/2",
        ResponseTemplate::new(200)
            .insert_header(
                "Link",
                format!("<{endpoint_url}>; rel=\"webmention\"").as_str(),
            )
            .set_body_string("<html><body>nothing in markup</body></html>"),
    )
    .await;

    let endpoint = discovery()
        .discover_endpoint(&format!("{}/test/2", server.uri()))
        .await
        .unwrap();
    assert_eq!(endpoint.as_str(), endpoint_url);
}

#[tokio::test]
async fn test_link_header_relative_url() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/test/1",
        ResponseTemplate::new(200)
            .insert_header("Link", "</test/1/webmention>; rel=webmention")
            .set_body_string("<html></html>"),
    )
    .await;

    let endpoint = discovery()
        .discover_endpoint(&format!("{}/test/1", server.uri()))
        .await
        .unwrap();
    assert_eq!(endpoint.as_str(), format!("{}/test/1/webmention", server.uri()));
}

#[tokio::test]
async fn test_html_link_tag_relative_url() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/test/3",
        ResponseTemplate::new(200).set_body_string(
            r#"<html><head><link rel="webmention" href="/test/3/webmention"></head></html>"#,
        ),
    )
    .await;

    let endpoint = discovery()
        .discover_endpoint(&format!("{}/test/3", server.uri()))
        .await
        .unwrap();
    assert_eq!(endpoint.as_str(), format!("{}/test/3/webmention", server.uri()));
}

#[tokio::test]
async fn test_html_anchor_tag() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/test/5",
        ResponseTemplate::new(200).set_body_string(
            r#"<html><body><a rel="webmention" href="/test/5/webmention">endpoint</a></body></html>"#,
        ),
    )
    .await;

    let endpoint = discovery()
        .discover_endpoint(&format!("{}/test/5", server.uri()))
        .await
        .unwrap();
    assert_eq!(endpoint.as_str(), format!("{}/test/5/webmention", server.uri()));
}

#[tokio::test]
async fn test_header_wins_over_markup() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/test/11",
        ResponseTemplate::new(200)
            .insert_header("Link", "</header/webmention>; rel=\"webmention\"")
            .set_body_string(
                r#"<link rel="webmention" href="/markup/webmention">
                   <a rel="webmention" href="/anchor/webmention">x</a>"#,
            ),
    )
    .await;

    let endpoint = discovery()
        .discover_endpoint(&format!("{}/test/11", server.uri()))
        .await
        .unwrap();
    assert_eq!(endpoint.as_str(), format!("{}/header/webmention", server.uri()));
}

#[tokio::test]
async fn test_empty_href_resolves_to_page_itself() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/test/15",
        ResponseTemplate::new(200)
            .set_body_string(r#"<a rel="webmention" href="">this page</a>"#),
    )
    .await;

    let page_url = format!("{}/test/15", server.uri());
    let endpoint = discovery().discover_endpoint(&page_url).await.unwrap();
    assert_eq!(endpoint.as_str(), page_url);
}

#[tokio::test]
async fn test_endpoint_with_query_string_is_preserved() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/test/21",
        ResponseTemplate::new(200).set_body_string(
            r#"<link rel="webmention" href="/test/21/webmention?query=yes">"#,
        ),
    )
    .await;

    let endpoint = discovery()
        .discover_endpoint(&format!("{}/test/21", server.uri()))
        .await
        .unwrap();
    assert_eq!(
        endpoint.as_str(),
        format!("{}/test/21/webmention?query=yes", server.uri())
    );
}

#[tokio::test]
async fn test_relative_endpoint_resolves_against_redirect_destination() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/test/23/page",
        ResponseTemplate::new(302)
            .insert_header("Location", format!("{}/test/23/final", server.uri()).as_str()),
    )
    .await;
    mount_page(
        &server,
        "/test/23/final",
        ResponseTemplate::new(200)
            .set_body_string(r#"<link rel="webmention" href="webmention">"#),
    )
    .await;

    let endpoint = discovery()
        .discover_endpoint(&format!("{}/test/23/page", server.uri()))
        .await
        .unwrap();
    // Resolved against the final URL, not the originally requested one.
    assert_eq!(endpoint.as_str(), format!("{}/test/23/webmention", server.uri()));
}

#[tokio::test]
async fn test_no_advertised_endpoint_falls_back_to_page() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/plain",
        ResponseTemplate::new(200).set_body_string("<html><body>hello</body></html>"),
    )
    .await;

    let page_url = format!("{}/plain", server.uri());
    let endpoint = discovery().discover_endpoint(&page_url).await.unwrap();
    assert_eq!(endpoint.as_str(), page_url);
}

#[tokio::test]
async fn test_non_2xx_page_is_a_discovery_failure() {
    let server = MockServer::start().await;
    mount_page(&server, "/gone", ResponseTemplate::new(410)).await;

    let err = discovery()
        .discover_endpoint(&format!("{}/gone", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DiscoveryError::Fetch(FetchError::Status { .. })
    ));
}

#[tokio::test]
async fn test_discovery_is_idempotent() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/stable",
        ResponseTemplate::new(200)
            .set_body_string(r#"<link rel="webmention" href="/stable/webmention">"#),
    )
    .await;

    let d = discovery();
    let url = format!("{}/stable", server.uri());
    let first = d.discover_endpoint(&url).await.unwrap();
    let second = d.discover_endpoint(&url).await.unwrap();
    assert_eq!(first, second);
}
