// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Outbound mention delivery.
//!
//! Each target link is an independent unit of work: discover its endpoint,
//! then POST the source/target form to it. Units run as concurrent tasks
//! bounded by a semaphore, and one unit failing never aborts its siblings.
//! Outcomes flow back through task join handles and are merged on the
//! calling task; no shared mutable accumulator.
//!
//! Delivery is best-effort: failures surface in logs and in the returned
//! report, never to the author publishing a post.

use crate::config::{DeliveryConfig, FetchConfig};
use crate::discover::Discovery;
use crate::fetch::Fetcher;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use url::Url;

/// Outcome of one delivery unit.
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryOutcome {
    /// Endpoint returned 201; status page optionally advertised in
    /// the Location header
    Created { location: Option<String> },
    /// Endpoint returned 202, mention queued for processing
    Accepted,
    /// Endpoint answered with any other status
    Rejected { status: u16, body: String },
    /// No endpoint could be discovered for the link
    DiscoveryFailed { reason: String },
    /// The POST itself failed
    SendFailed { reason: String },
}

/// Per-link outcome of a send_mentions call.
#[derive(Debug)]
pub struct LinkDelivery {
    pub target: String,
    pub outcome: DeliveryOutcome,
}

/// Outcomes for every target link, in the order the links were given.
#[derive(Debug, Default)]
pub struct DeliveryReport {
    pub deliveries: Vec<LinkDelivery>,
}

impl DeliveryReport {
    /// Count of mentions the receivers actually took (201 or 202).
    pub fn delivered(&self) -> usize {
        self.deliveries
            .iter()
            .filter(|d| {
                matches!(
                    d.outcome,
                    DeliveryOutcome::Created { .. } | DeliveryOutcome::Accepted
                )
            })
            .count()
    }
}

/// Webmention sender.
#[derive(Debug, Clone)]
pub struct Sender {
    discovery: Discovery,
    client: reqwest::Client,
    max_concurrent: usize,
}

impl Sender {
    pub fn new(
        fetch_config: &FetchConfig,
        delivery_config: &DeliveryConfig,
    ) -> Result<Self, reqwest::Error> {
        let fetcher = Fetcher::new(fetch_config)?;
        let client = reqwest::Client::builder()
            .timeout(fetch_config.timeout())
            .user_agent(fetch_config.user_agent.clone())
            .build()?;
        Ok(Self {
            discovery: Discovery::new(fetcher),
            client,
            max_concurrent: delivery_config.max_concurrent.max(1),
        })
    }

    /// Send mentions from `source` to every target link.
    ///
    /// Joins all units before returning; the report covers every link.
    pub async fn send_mentions(&self, source: &str, links: &[String]) -> DeliveryReport {
        info!(source = %source, links = links.len(), "Sending webmentions");

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut tasks: JoinSet<(usize, DeliveryOutcome)> = JoinSet::new();

        for (index, link) in links.iter().enumerate() {
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };
            let sender = self.clone();
            let source = source.to_string();
            let link = link.clone();
            tasks.spawn(async move {
                let outcome = sender.deliver_one(&source, &link).await;
                drop(permit);
                (index, outcome)
            });
        }

        let mut outcomes: Vec<(usize, DeliveryOutcome)> = Vec::with_capacity(links.len());
        while let Some(result) = tasks.join_next().await {
            match result {
                Ok(entry) => outcomes.push(entry),
                Err(err) => warn!(error = %err, "Delivery task panicked"),
            }
        }
        outcomes.sort_by_key(|(index, _)| *index);

        DeliveryReport {
            deliveries: outcomes
                .into_iter()
                .map(|(index, outcome)| LinkDelivery {
                    target: links[index].clone(),
                    outcome,
                })
                .collect(),
        }
    }

    /// One discovery+send unit. Failures stay local to the unit.
    async fn deliver_one(&self, source: &str, link: &str) -> DeliveryOutcome {
        debug!(link = %link, "Getting endpoint for link");
        let endpoint = match self.discovery.discover_endpoint(link).await {
            Ok(endpoint) => endpoint,
            Err(err) => {
                warn!(link = %link, error = %err, "Endpoint discovery failed");
                return DeliveryOutcome::DiscoveryFailed {
                    reason: err.to_string(),
                };
            }
        };
        debug!(link = %link, endpoint = %endpoint, "Found endpoint for link");

        self.send_mention(&endpoint, source, link).await
    }

    /// POST a source/target notification to a discovered endpoint.
    pub async fn send_mention(
        &self,
        endpoint: &Url,
        source: &str,
        target: &str,
    ) -> DeliveryOutcome {
        info!(source = %source, target = %target, endpoint = %endpoint, "Sending webmention");

        let resp = match self
            .client
            .post(endpoint.clone())
            .form(&[("source", source), ("target", target)])
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(err) => {
                warn!(endpoint = %endpoint, error = %err, "Webmention POST failed");
                return DeliveryOutcome::SendFailed {
                    reason: err.to_string(),
                };
            }
        };

        match resp.status().as_u16() {
            201 => {
                let location = resp
                    .headers()
                    .get(reqwest::header::LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                info!(endpoint = %endpoint, location = ?location, "Webmention created");
                DeliveryOutcome::Created { location }
            }
            202 => {
                info!(endpoint = %endpoint, "Webmention accepted");
                DeliveryOutcome::Accepted
            }
            status => {
                let body = resp.text().await.unwrap_or_default();
                info!(endpoint = %endpoint, status, body = %body, "Endpoint returned status");
                DeliveryOutcome::Rejected { status, body }
            }
        }
    }
}
