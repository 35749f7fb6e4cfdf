//! Error types for SetuIO

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// SetuIO error types
///
/// Decode failures are deliberately absent: decoders return `Option` and a
/// bad frame never becomes an error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("Config parse error: {0}")]
    Config(#[from] toml::de::Error),

    /// Configuration could not be serialized
    #[error("Config serialize error: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    /// Configuration parsed but is not usable
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Endpoint host did not resolve to any address
    #[error("Failed to resolve {0}")]
    Resolve(String),

    /// Read attempted on a transport without an open socket
    #[error("Not connected")]
    NotConnected,

    /// Worker thread could not be spawned
    #[error("Failed to spawn thread: {0}")]
    ThreadSpawn(String),

    /// Worker thread panicked and could not be joined cleanly
    #[error("Thread panicked")]
    ThreadPanic,

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}
