use crate::{DiagError, Result};
use serde::Deserialize;
use std::path::Path;

/// Server configuration, loaded once at startup from an optional JSON file
///
/// The file format mirrors the operational config this server has always
/// shipped with:
///
/// ```json
/// {"port": 8443, "serverkey": "/etc/diagsrv/tls.key", "servercrt": "/etc/diagsrv/tls.crt"}
/// ```
///
/// Every field is optional in the file. Note that a supplied file which omits
/// `port` yields port 0 (the listener then binds an ephemeral port); the 8888
/// default applies only when no file is given at all.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Port to listen on
    #[serde(default)]
    pub port: u16,
    /// Path to a PEM private key file; TLS is enabled when both this and
    /// `servercrt` are non-empty
    #[serde(default)]
    pub serverkey: String,
    /// Path to a PEM certificate file
    #[serde(default)]
    pub servercrt: String,
}

impl Config {
    /// Loads configuration from `path`, or returns the built-in default
    /// (port 8888, no TLS) when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Config {
                port: 8888,
                ..Config::default()
            });
        };
        let data = std::fs::read(path).map_err(DiagError::ConfigRead)?;
        serde_json::from_slice(&data).map_err(DiagError::ConfigParse)
    }

    /// Whether both TLS file paths are configured
    pub fn tls_enabled(&self) -> bool {
        !self.serverkey.is_empty() && !self.servercrt.is_empty()
    }
}
