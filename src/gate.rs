// OpenSoul Gate - Connection Gate (Primary Enforcement Point)
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Every browser WebSocket upgrade passes through here before the gateway
// protocol handshake. Origin check -> decision record -> log.
// Rejections never echo the allowlist back to the caller.

use crate::config::OpenSoulConfig;
use crate::origin::{self, AllowRule, OriginCheck};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Header values of one incoming upgrade request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectionRequest {
    pub host: Option<String>,
    pub origin: Option<String>,
}

/// Gate decision: the final word on whether a connection proceeds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateDecision {
    pub allowed: bool,
    /// Origin header as received
    pub origin: Option<String>,
    /// Host header as received
    pub host: Option<String>,
    pub rule: Option<AllowRule>,
    pub reason: Option<String>,
    pub message: String,
    pub checked_at: DateTime<Utc>,
}

/// Untrusted header values are clipped before they reach logs
fn preview(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => {
            let clipped: String = v.chars().take(120).collect();
            if clipped.len() < v.len() {
                format!("{}...", clipped)
            } else {
                clipped
            }
        }
        _ => "(none)".to_string(),
    }
}

/// Process a connection through the gate using the configured allowlist
pub fn process(request: &ConnectionRequest, config: &OpenSoulConfig) -> GateDecision {
    process_with(request, config.allowed_origins())
}

/// Process a connection against an explicit allowlist
pub fn process_with<S: AsRef<str>>(request: &ConnectionRequest, allowed_origins: &[S]) -> GateDecision {
    let check = origin::check_browser_origin(
        request.host.as_deref(),
        request.origin.as_deref(),
        allowed_origins,
    );

    let details = format!(
        "origin={} | host={}",
        preview(request.origin.as_deref()),
        preview(request.host.as_deref())
    );

    let (allowed, rule, reason, message) = match check {
        OriginCheck::Allowed(rule) => {
            let message = format!("ALLOWED | {} | {:?}", details, rule);
            log::debug!("{}", message);
            (true, Some(rule), None, message)
        }
        OriginCheck::Rejected(rejection) => {
            let message = format!("BLOCKED | {} | {}", details, rejection);
            log::warn!("{}", message);
            (false, None, Some(rejection.to_string()), message)
        }
    };

    GateDecision {
        allowed,
        origin: request.origin.clone(),
        host: request.host.clone(),
        rule,
        reason,
        message,
        checked_at: Utc::now(),
    }
}

// ============================================================================
// TESTS
// ============================================================================
