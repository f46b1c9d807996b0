// Copyright 2026 DGW Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Configuration management for the gateway server.
//!
//! Configuration is read from a YAML file named by `DGW_CONFIG` (all
//! sections optional), with environment variables providing the defaults
//! for anything the file leaves out.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use dgw_core::S3Settings;

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings (bind address, TLS, upload cap)
    pub server: ServerConfig,
    /// Object-storage backend connection
    pub s3: S3Config,
    /// Graceful shutdown timing
    pub shutdown: ShutdownConfig,
    /// Metrics and monitoring configuration
    pub metrics: MetricsConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080")
    pub bind: String,
    /// Maximum upload size in bytes.
    /// Can be set via DGW_MAX_UPLOAD_SIZE (e.g., "5GB", "100MB", "1024KB").
    pub max_upload_size: usize,
    /// Report repository listing failures as 500 instead of the legacy
    /// empty-result response.
    pub propagate_list_errors: bool,
    /// TLS configuration for HTTPS support.
    pub tls: TlsConfig,
}

/// TLS/HTTPS configuration.
///
/// TLS is disabled by default. To enable it, set the `DGW_TLS_CERT` and
/// `DGW_TLS_KEY` environment variables to PEM-encoded certificate and
/// private key files, or set both paths in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsConfig {
    /// Whether TLS is enabled.
    /// Automatically set to true when both cert_path and key_path are provided.
    pub enabled: bool,
    /// Path to PEM-encoded certificate file.
    pub cert_path: Option<PathBuf>,
    /// Path to PEM-encoded private key file.
    pub key_path: Option<PathBuf>,
}

impl Default for TlsConfig {
    fn default() -> Self {
        let cert_path = std::env::var("DGW_TLS_CERT").ok().map(PathBuf::from);
        let key_path = std::env::var("DGW_TLS_KEY").ok().map(PathBuf::from);
        let enabled = cert_path.is_some() && key_path.is_some();

        Self {
            enabled,
            cert_path,
            key_path,
        }
    }
}

impl TlsConfig {
    /// Validates TLS configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.enabled {
            if self.cert_path.is_none() {
                return Err("TLS enabled but no certificate path configured".to_string());
            }
            if self.key_path.is_none() {
                return Err("TLS enabled but no private key path configured".to_string());
            }
        }
        Ok(())
    }
}

/// Object-storage backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct S3Config {
    /// Custom endpoint URL (MinIO, on-prem gateways). Empty means AWS.
    /// Can be set via DGW_S3_ENDPOINT.
    pub endpoint: Option<String>,
    /// Region name. Can be set via DGW_S3_REGION.
    pub region: String,
    /// Static access key id. Can be set via DGW_S3_ACCESS_KEY_ID; when
    /// unset the SDK's default credential chain applies.
    pub access_key_id: Option<String>,
    /// Static secret key. Can be set via DGW_S3_SECRET_ACCESS_KEY.
    pub secret_access_key: Option<String>,
    /// Path-style addressing, required by most non-AWS endpoints.
    pub force_path_style: bool,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            endpoint: std::env::var("DGW_S3_ENDPOINT").ok(),
            region: std::env::var("DGW_S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            access_key_id: std::env::var("DGW_S3_ACCESS_KEY_ID").ok(),
            secret_access_key: std::env::var("DGW_S3_SECRET_ACCESS_KEY").ok(),
            force_path_style: true,
        }
    }
}

impl S3Config {
    /// Converts to the storage crate's connection settings.
    pub fn to_settings(&self) -> S3Settings {
        S3Settings {
            endpoint: self.endpoint.clone(),
            region: self.region.clone(),
            access_key_id: self.access_key_id.clone(),
            secret_access_key: self.secret_access_key.clone(),
            force_path_style: self.force_path_style,
        }
    }
}

/// Graceful shutdown timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// How long the listener waits for connections to close before the
    /// drain phase starts, in seconds.
    pub listener_deadline_secs: u64,
    /// Interval between drain progress checks, in milliseconds.
    pub drain_poll_interval_ms: u64,
    /// Upper bound on the drain phase, in seconds. Exceeding it logs an
    /// error but never blocks process exit.
    pub drain_deadline_secs: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            listener_deadline_secs: 30,
            drain_poll_interval_ms: 500,
            drain_deadline_secs: 60,
        }
    }
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Enable the Prometheus exporter at /metrics.
    pub prometheus_enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            prometheus_enabled: std::env::var("DGW_METRICS_ENABLED")
                .map(|s| s.to_lowercase() == "true" || s == "1")
                .unwrap_or(true),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: std::env::var("DGW_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            max_upload_size: std::env::var("DGW_MAX_UPLOAD_SIZE")
                .ok()
                .and_then(|s| parse_size(&s).ok())
                .unwrap_or(1024 * 1024 * 1024), // Default: 1GB
            propagate_list_errors: std::env::var("DGW_PROPAGATE_LIST_ERRORS")
                .map(|s| s.to_lowercase() == "true" || s == "1")
                .unwrap_or(false),
            tls: TlsConfig::default(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            s3: S3Config::default(),
            shutdown: ShutdownConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from the file named by `DGW_CONFIG`, falling
    /// back to environment-driven defaults when no file is configured.
    pub fn load() -> anyhow::Result<Self> {
        let config = match std::env::var("DGW_CONFIG") {
            Ok(path) => {
                let contents = std::fs::read_to_string(&path)
                    .map_err(|e| anyhow::anyhow!("failed to read config file {path}: {e}"))?;
                serde_yaml::from_str(&contents)
                    .map_err(|e| anyhow::anyhow!("failed to parse config file {path}: {e}"))?
            }
            Err(_) => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validates the loaded configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.server
            .tls
            .validate()
            .map_err(|e| anyhow::anyhow!("TLS configuration error: {e}"))?;
        self.s3
            .to_settings()
            .validate()
            .map_err(|e| anyhow::anyhow!("S3 configuration error: {e}"))?;
        if self.server.max_upload_size == 0 {
            anyhow::bail!("max_upload_size must be positive");
        }
        Ok(())
    }
}

/// Parses a size string like "10GB", "100MB", "1024KB", "5000" into bytes.
///
/// Supported suffixes (case-insensitive): GB/G, MB/M, KB/K, B or none.
pub fn parse_size(s: &str) -> Result<usize, String> {
    let s = s.trim().to_uppercase();

    if s.is_empty() {
        return Err("Empty size string".to_string());
    }

    let num_end = s.chars().position(|c| !c.is_ascii_digit() && c != '.').unwrap_or(s.len());
    let (num_str, suffix) = s.split_at(num_end);
    let suffix = suffix.trim();

    let num: f64 = num_str.parse().map_err(|_| format!("Invalid number: {}", num_str))?;

    let multiplier: usize = match suffix {
        "GB" | "G" => 1024 * 1024 * 1024,
        "MB" | "M" => 1024 * 1024,
        "KB" | "K" => 1024,
        "B" | "" => 1,
        _ => return Err(format!("Unknown size suffix: {}", suffix)),
    };

    Ok((num * multiplier as f64) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size_bytes() {
        assert_eq!(parse_size("1024").unwrap(), 1024);
        assert_eq!(parse_size("0").unwrap(), 0);
    }

    #[test]
    fn test_parse_size_suffixes() {
        assert_eq!(parse_size("1KB").unwrap(), 1024);
        assert_eq!(parse_size("1K").unwrap(), 1024);
        assert_eq!(parse_size("100mb").unwrap(), 100 * 1024 * 1024);
        assert_eq!(parse_size("5gb").unwrap(), 5 * 1024 * 1024 * 1024);
    }

    #[test]
    fn test_parse_size_invalid() {
        assert!(parse_size("").is_err());
        assert!(parse_size("abc").is_err());
        assert!(parse_size("1TB").is_err()); // TB not supported
    }

    #[test]
    fn test_yaml_partial_file() {
        let yaml = r#"
server:
  bind: "127.0.0.1:9999"
shutdown:
  drain_deadline_secs: 10
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:9999");
        assert_eq!(config.shutdown.drain_deadline_secs, 10);
        // Unlisted sections fall back to defaults.
        assert_eq!(config.shutdown.drain_poll_interval_ms, 500);
        assert_eq!(config.s3.region, S3Config::default().region);
    }

    #[test]
    fn test_tls_validation_missing_cert() {
        let tls = TlsConfig {
            enabled: true,
            cert_path: None,
            key_path: Some(PathBuf::from("/path/to/key.pem")),
        };
        assert!(tls.validate().is_err());
    }

    #[test]
    fn test_tls_validation_disabled() {
        let tls = TlsConfig {
            enabled: false,
            cert_path: None,
            key_path: None,
        };
        assert!(tls.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_upload_cap() {
        let mut config = Config::default();
        config.server.max_upload_size = 0;
        assert!(config.validate().is_err());
    }
}
