//! Accept loop and connection handling
//!
//! One tokio task per connection; the configuration is immutable after
//! startup so requests share nothing but an atomic connection counter.

use crate::config::Config;
use crate::handlers;
use crate::http::request::Request;
use crate::{DiagError, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::signal;
use tokio::time::timeout;
use tracing::{Instrument, error, info, warn};

const MAX_CONNECTIONS: usize = 1000;

// Guards only the initial request read; once a handler runs there is no
// timeout, cancellation or disconnect detection.
const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// The diagnostic HTTP server
pub struct DiagServer {
    config: Config,
    shutdown_signal: Arc<tokio::sync::broadcast::Sender<()>>,
}

impl DiagServer {
    /// Creates a server for the given configuration.
    pub fn new(config: Config) -> Self {
        let (shutdown_signal, _) = tokio::sync::broadcast::channel(1);
        Self {
            config,
            shutdown_signal: Arc::new(shutdown_signal),
        }
    }

    /// Returns a shutdown signal sender that can be used to gracefully shutdown the server
    pub fn shutdown_signal(&self) -> tokio::sync::broadcast::Sender<()> {
        self.shutdown_signal.as_ref().clone()
    }

    /// Binds the listener and serves until ctrl-c or an internal shutdown.
    ///
    /// When both TLS paths are configured the acceptor is built up front; a
    /// failure there is fatal and propagates out instead of falling back to
    /// plain HTTP. A handshake failure on an individual connection only
    /// drops that connection.
    pub async fn run(&self) -> Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.port));
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;

        let tls_acceptor = if self.config.tls_enabled() {
            Some(crate::tls::acceptor(&self.config)?)
        } else {
            None
        };

        info!(address = %local_addr, tls = tls_acceptor.is_some(), "diagnostic server listening");

        let connection_count = Arc::new(AtomicUsize::new(0));
        let mut shutdown_rx = self.shutdown_signal.subscribe();

        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, addr)) => {
                            let current_count = connection_count.load(Ordering::SeqCst);
                            if current_count >= MAX_CONNECTIONS {
                                warn!(%addr, current = current_count, limit = MAX_CONNECTIONS, "Connection rejected: limit reached");
                                continue;
                            }

                            connection_count.fetch_add(1, Ordering::SeqCst);
                            let new_count = connection_count.load(Ordering::SeqCst);
                            info!(%addr, current = new_count, "Accepted connection");

                            let tls_acceptor = tls_acceptor.clone();
                            let connection_count = connection_count.clone();
                            let span = tracing::info_span!("connection", %addr);
                            tokio::spawn(async move {
                                let result = match tls_acceptor {
                                    Some(acceptor) => match acceptor.accept(stream).await {
                                        Ok(tls_stream) => handle_connection(tls_stream, addr).await,
                                        Err(e) => {
                                            warn!(%addr, error = %e, "TLS handshake failed");
                                            Ok(())
                                        }
                                    },
                                    None => handle_connection(stream, addr).await,
                                };
                                if let Err(e) = result {
                                    error!(%addr, error = %e, "Error handling connection");
                                }
                                connection_count.fetch_sub(1, Ordering::SeqCst);
                            }.instrument(span));
                        }
                        Err(e) => {
                            error!(error = %e, "Failed to accept connection");
                        }
                    }
                }
                _ = signal::ctrl_c() => {
                    info!("Received shutdown signal, stopping server");
                    break;
                }
                _ = shutdown_rx.recv() => {
                    info!("Received internal shutdown signal, stopping server");
                    break;
                }
            }
        }

        info!("Diagnostic server stopped");
        Ok(())
    }
}

/// Serves one request on an accepted connection, then lets it close.
async fn handle_connection<S>(mut stream: S, addr: SocketAddr) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let request = match timeout(READ_TIMEOUT, Request::read_from(&mut stream, addr)).await {
        Ok(Ok(request)) => request,
        Ok(Err(DiagError::IncompleteRequest)) => {
            info!(%addr, "Client closed connection");
            return Ok(());
        }
        Ok(Err(e)) => return Err(e),
        Err(_) => {
            warn!(%addr, "Read timeout");
            return Ok(());
        }
    };

    handlers::handle(&mut stream, &request).await
}
