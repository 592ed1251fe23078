use thiserror::Error;

/// Error types for the diagsrv library
#[derive(Error, Debug)]
pub enum DiagError {
    /// Socket-level errors (bind, accept, read, write)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be read
    #[error("unable to read config file: {0}")]
    ConfigRead(std::io::Error),

    /// Configuration file is not valid JSON
    #[error("unable to parse config file: {0}")]
    ConfigParse(serde_json::Error),

    /// The `latency` query parameter is not an integer
    #[error("unable to convert latency value, error {0}")]
    LatencyParse(std::num::ParseIntError),

    /// The `format` query parameter is neither "json" nor "ndjson"
    #[error("unsupported format {0}")]
    UnsupportedFormat(String),

    /// The `size` query parameter lacks a KB/MB/GB suffix
    #[error("unsupported size, should be KB, MB or GB units")]
    UnsupportedSizeUnit,

    /// The numeric prefix of the `size` query parameter is not an integer
    #[error("invalid size value: {0}")]
    SizeParse(std::num::ParseIntError),

    /// Record serialization failure
    #[error("unable to marshal records, error {0}")]
    Serialize(serde_json::Error),

    /// TLS certificate/key loading or listener setup failure
    #[error("TLS startup error: {0}")]
    TlsStartup(String),

    /// Malformed HTTP request head
    #[error("HTTP parsing error: {0}")]
    HttpParse(String),

    /// Connection closed before a full request head arrived
    #[error("incomplete request")]
    IncompleteRequest,
}

/// Result type for the diagsrv library
pub type Result<T> = std::result::Result<T, DiagError>;

pub mod config;
pub mod handlers;
pub mod http;
pub mod payload;
pub mod server;
pub mod tls;

// Re-export main types for convenience
pub use config::Config;
pub use payload::Record;
pub use server::DiagServer;
