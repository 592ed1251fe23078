//! TLS listener setup from PEM certificate and key files

use crate::config::Config;
use crate::{DiagError, Result};
use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;
use tokio_rustls::TlsAcceptor;
use tokio_rustls::rustls::ServerConfig;

/// Builds a TLS acceptor from the configured certificate and key paths.
///
/// Client certificates are neither requested nor verified; this server has
/// always run with peer verification off and operators rely on that.
pub fn acceptor(config: &Config) -> Result<TlsAcceptor> {
    let server_config = load_server_config(&config.servercrt, &config.serverkey)?;
    Ok(TlsAcceptor::from(Arc::new(server_config)))
}

fn load_server_config(cert_path: &str, key_path: &str) -> Result<ServerConfig> {
    let cert_file = File::open(cert_path)
        .map_err(|e| DiagError::TlsStartup(format!("unable to open certificate {cert_path}: {e}")))?;
    let certs = rustls_pemfile::certs(&mut BufReader::new(cert_file))
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|e| DiagError::TlsStartup(format!("unable to read certificate {cert_path}: {e}")))?;
    if certs.is_empty() {
        return Err(DiagError::TlsStartup(format!(
            "no certificates found in {cert_path}"
        )));
    }

    let key_file = File::open(key_path)
        .map_err(|e| DiagError::TlsStartup(format!("unable to open key {key_path}: {e}")))?;
    let key = rustls_pemfile::private_key(&mut BufReader::new(key_file))
        .map_err(|e| DiagError::TlsStartup(format!("unable to read key {key_path}: {e}")))?
        .ok_or_else(|| DiagError::TlsStartup(format!("no private key found in {key_path}")))?;

    ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| DiagError::TlsStartup(e.to_string()))
}
