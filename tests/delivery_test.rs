// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: Apache-2.0

//! Integration tests for outbound delivery fan-out.

use webmention_engine::config::{DeliveryConfig, FetchConfig};
use webmention_engine::send::{DeliveryOutcome, Sender};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sender() -> Sender {
    Sender::new(&FetchConfig::default(), &DeliveryConfig::default()).unwrap()
}

/// Mount a target page advertising a webmention endpoint via Link header.
async fn mount_target(server: &MockServer, page: &str, endpoint: &str) {
    Mock::given(method("GET"))
        .and(path(page.to_string()))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Link", format!("<{endpoint}>; rel=\"webmention\"").as_str())
                .set_body_string("<html></html>"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_delivery_flow() {
    let server = MockServer::start().await;
    mount_target(&server, "/article", "/wm").await;
    Mock::given(method("POST"))
        .and(path("/wm"))
        .and(body_string_contains("source=http%3A%2F%2Fblog.example%2Fposts%2Fnew"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let links = vec![format!("{}/article", server.uri())];
    let report = sender()
        .send_mentions("http://blog.example/posts/new", &links)
        .await;

    assert_eq!(report.deliveries.len(), 1);
    assert_eq!(report.deliveries[0].outcome, DeliveryOutcome::Accepted);
    assert_eq!(report.delivered(), 1);
}

#[tokio::test]
async fn test_fanout_isolation_on_discovery_failure() {
    // Three target links; the middle one fails discovery. The first and
    // third must still receive delivery attempts.
    let server = MockServer::start().await;
    mount_target(&server, "/first", "/wm").await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_target(&server, "/third", "/wm").await;

    Mock::given(method("POST"))
        .and(path("/wm"))
        .respond_with(ResponseTemplate::new(202))
        .expect(2)
        .mount(&server)
        .await;

    let links = vec![
        format!("{}/first", server.uri()),
        format!("{}/broken", server.uri()),
        format!("{}/third", server.uri()),
    ];
    let report = sender().send_mentions("http://blog.example/post", &links).await;

    assert_eq!(report.deliveries.len(), 3);
    assert_eq!(report.deliveries[0].outcome, DeliveryOutcome::Accepted);
    assert!(matches!(
        report.deliveries[1].outcome,
        DeliveryOutcome::DiscoveryFailed { .. }
    ));
    assert_eq!(report.deliveries[2].outcome, DeliveryOutcome::Accepted);
    assert_eq!(report.delivered(), 2);
}

#[tokio::test]
async fn test_rejected_delivery_does_not_abort_siblings() {
    let server = MockServer::start().await;
    mount_target(&server, "/grumpy", "/wm-grumpy").await;
    mount_target(&server, "/happy", "/wm-happy").await;

    Mock::given(method("POST"))
        .and(path("/wm-grumpy"))
        .respond_with(ResponseTemplate::new(400).set_body_string("not today"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/wm-happy"))
        .respond_with(
            ResponseTemplate::new(201).insert_header("Location", "http://status.example/42"),
        )
        .mount(&server)
        .await;

    let links = vec![
        format!("{}/grumpy", server.uri()),
        format!("{}/happy", server.uri()),
    ];
    let report = sender().send_mentions("http://blog.example/post", &links).await;

    assert_eq!(
        report.deliveries[0].outcome,
        DeliveryOutcome::Rejected {
            status: 400,
            body: "not today".to_string()
        }
    );
    assert_eq!(
        report.deliveries[1].outcome,
        DeliveryOutcome::Created {
            location: Some("http://status.example/42".to_string())
        }
    );
    assert_eq!(report.delivered(), 1);
}

#[tokio::test]
async fn test_report_preserves_link_order_under_concurrency() {
    let server = MockServer::start().await;
    for page in ["/p1", "/p2", "/p3", "/p4", "/p5"] {
        mount_target(&server, page, "/wm").await;
    }
    Mock::given(method("POST"))
        .and(path("/wm"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;

    let links: Vec<String> = (1..=5).map(|i| format!("{}/p{i}", server.uri())).collect();
    let report = sender().send_mentions("http://blog.example/post", &links).await;

    let reported: Vec<&str> = report.deliveries.iter().map(|d| d.target.as_str()).collect();
    let expected: Vec<&str> = links.iter().map(String::as_str).collect();
    assert_eq!(reported, expected);
}
