//! Service configuration for OData result handling.
//!
//! Supports programmatic configuration and environment variable overrides.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `ODATA_SERVER_PORT` | 8080 | Server port |
//! | `ODATA_SERVER_HOST` | 127.0.0.1 | Host to bind |
//! | `ODATA_LOG_LEVEL` | info | Log level |
//! | `ODATA_REQUEST_TIMEOUT` | 30 | Request timeout (seconds) |
//! | `ODATA_DEFAULT_VERSION` | 4.0 | `OData-Version` used when the request names none |
//!
//! # Example
//!
//! ```rust
//! use helios_odata::ODataConfig;
//! use helios_odata::version::ODataVersion;
//!
//! let config = ODataConfig {
//!     port: 3000,
//!     default_version: ODataVersion::V4_01,
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use std::sync::Arc;

use clap::Parser;

use crate::context::ODataServices;
use crate::format::JsonFormatter;
use crate::version::ODataVersion;

/// Service configuration.
///
/// Can be built from environment variables with [`ODataConfig::from_env`],
/// from command line arguments with [`ODataConfig::parse`], or directly.
#[derive(Debug, Clone, Parser)]
#[command(name = "odata-server")]
#[command(about = "OData update result server")]
pub struct ODataConfig {
    /// Port to listen on.
    #[arg(short, long, env = "ODATA_SERVER_PORT", default_value = "8080")]
    pub port: u16,

    /// Host address to bind to.
    #[arg(long, env = "ODATA_SERVER_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "ODATA_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Request timeout in seconds.
    #[arg(long, env = "ODATA_REQUEST_TIMEOUT", default_value = "30")]
    pub request_timeout: u64,

    /// Protocol version stamped when the request declares none (4.0 or 4.01).
    #[arg(long, env = "ODATA_DEFAULT_VERSION", default_value = "4.0")]
    pub default_version: ODataVersion,
}

impl Default for ODataConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
            log_level: "info".to_string(),
            request_timeout: 30,
            default_version: ODataVersion::V4_0,
        }
    }
}

impl ODataConfig {
    /// Creates a configuration from environment variables, falling back to
    /// defaults when they do not parse.
    pub fn from_env() -> Self {
        Self::try_parse_from(["odata-server"]).unwrap_or_default()
    }

    /// Returns the socket address to bind to.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Builds the per-request services described by this configuration.
    pub fn services(&self) -> ODataServices {
        ODataServices::new(Arc::new(JsonFormatter), self.default_version)
    }

    /// Validates the configuration and returns errors if any.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.port == 0 {
            errors.push("Port cannot be 0".to_string());
        }

        if self.request_timeout == 0 {
            errors.push("Request timeout cannot be 0".to_string());
        }

        if !["error", "warn", "info", "debug", "trace"]
            .contains(&self.log_level.to_ascii_lowercase().as_str())
        {
            errors.push(format!("Unknown log level '{}'", self.log_level));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Creates a configuration suitable for testing.
    pub fn for_testing() -> Self {
        Self {
            port: 0,
            host: "127.0.0.1".to_string(),
            log_level: "debug".to_string(),
            request_timeout: 5,
            default_version: ODataVersion::V4_0,
        }
    }
}
