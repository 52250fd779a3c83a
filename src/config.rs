// OpenSoul Gate - Configuration
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Loads the gateway section of opensoul.json: listen port, bind mode and
// the control UI origin allowlist. Missing file = defaults. Unknown keys
// are ignored so the gateway can read configs written by newer shells.

use crate::env::{EnvSnapshot, GATEWAY_PORT_ENV};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_GATEWAY_PORT: u16 = 18789;

/// Top-level opensoul.json
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenSoulConfig {
    pub gateway: GatewayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GatewayConfig {
    pub port: u16,
    pub bind: BindMode,
    pub control_ui: ControlUiConfig,
}

/// Which interfaces the gateway listens on
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BindMode {
    #[default]
    Loopback,
    Lan,
    Tailnet,
    Auto,
    Custom,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ControlUiConfig {
    /// Exact browser origins trusted beyond same-host and loopback
    pub allowed_origins: Vec<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_GATEWAY_PORT,
            bind: BindMode::default(),
            control_ui: ControlUiConfig::default(),
        }
    }
}

impl OpenSoulConfig {
    /// Load config from JSON file, falling back to defaults
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {:?}", path))?;
            let config: Self = serde_json::from_str(&content)
                .with_context(|| format!("Invalid config JSON in {:?}", path))?;
            log::debug!("Config loaded from {:?}", path);
            Ok(config)
        } else {
            log::warn!("Config not found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save config to JSON file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config {:?}", path))?;
        Ok(())
    }

    pub fn allowed_origins(&self) -> &[String] {
        &self.gateway.control_ui.allowed_origins
    }
}

/// OPENSOUL_GATEWAY_PORT when it is a usable port, else the configured one
pub fn resolve_gateway_port(env: &EnvSnapshot, config: &OpenSoulConfig) -> u16 {
    match env.get(GATEWAY_PORT_ENV).map(str::parse::<u16>) {
        Some(Ok(port)) if port > 0 => port,
        Some(_) => {
            log::warn!("Ignoring invalid {}, using port {}", GATEWAY_PORT_ENV, config.gateway.port);
            config.gateway.port
        }
        None => config.gateway.port,
    }
}

// ============================================================================
// TESTS
// ============================================================================
