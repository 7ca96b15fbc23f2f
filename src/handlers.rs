// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the Webmention receiving endpoint.
//!
//! `POST /webmention` takes the form-encoded source/target pair, runs the
//! optional per-source limiter and then the verifier, and answers with
//! 201 on success or the rejection's status with a plain-text reason.

use crate::limiter::{RateLimitResult, SourceRateLimiter};
use crate::mention::Mention;
use crate::verify::{VerificationError, Verifier};
use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{error, info};

/// Persistence collaborator: where verified mentions go.
pub trait MentionSink: Send + Sync {
    fn accept(&self, mention: Mention);
}

/// In-memory sink for tests and standalone runs.
#[derive(Debug, Default)]
pub struct MemorySink {
    mentions: Mutex<Vec<Mention>>,
}

impl MemorySink {
    pub fn mentions(&self) -> Vec<Mention> {
        self.mentions.lock().map(|m| m.clone()).unwrap_or_default()
    }
}

impl MentionSink for MemorySink {
    fn accept(&self, mention: Mention) {
        if let Ok(mut mentions) = self.mentions.lock() {
            mentions.push(mention);
        }
    }
}

/// Shared application state.
pub struct AppState {
    pub verifier: Verifier,
    pub limiter: SourceRateLimiter,
    pub sink: Arc<dyn MentionSink>,
}

/// Form body of an inbound mention request.
#[derive(Debug, Deserialize)]
pub struct MentionForm {
    pub source: String,
    pub target: String,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "webmention-engine",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Receive a Webmention notification.
pub async fn receive_webmention(
    State(state): State<Arc<AppState>>,
    Form(form): Form<MentionForm>,
) -> Response {
    info!(source = %form.source, target = %form.target, "Handling webmention");

    if let RateLimitResult::Limited { retry_after } = state.limiter.check(&form.source).await {
        let retry_secs = retry_after.as_secs().max(1);
        return (
            StatusCode::TOO_MANY_REQUESTS,
            [("Retry-After", retry_secs.to_string())],
            "Source rate limit exceeded",
        )
            .into_response();
    }

    match state.verifier.verify(&form.source, &form.target).await {
        Ok(mention) => {
            state.sink.accept(mention);
            StatusCode::CREATED.into_response()
        }
        Err(err @ VerificationError::SourceUnreachable { .. }) => {
            // Soft failure: the fetch problem is logged by the verifier
            // and no error status is committed to the sender.
            error!(error = %err, "Webmention verification stopped");
            err.status().into_response()
        }
        Err(err) => {
            error!(error = %err, "Webmention rejected");
            (err.status(), err.to_string()).into_response()
        }
    }
}
