//! Error types for tcpreasm-core
//!
//! The reassembler itself is total and never fails. These errors cover the
//! surfaces around it: packet extraction, configuration and segment scripts.

use thiserror::Error;

/// Main error type for tcpreasm-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Packet parsing failed
    #[error("Packet parsing error at offset {offset}: {message}")]
    PacketParse {
        /// Detailed error message
        message: String,
        /// Offset in packet where error occurred
        offset: usize,
    },

    /// Packet is too small to process
    #[error("Packet too small: expected at least {expected} bytes, got {actual}")]
    PacketTooSmall {
        /// Minimum expected size
        expected: usize,
        /// Actual packet size
        actual: usize,
    },

    /// IP version nibble is neither 4 nor 6
    #[error("Unsupported IP version: {0}")]
    UnsupportedIpVersion(u8),

    /// Packet does not carry TCP
    #[error("Not a TCP packet (protocol {protocol})")]
    NotTcp {
        /// IP protocol / next header number
        protocol: u8,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// Path to the missing config file
        path: String,
    },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    ConfigValue {
        /// Configuration key
        key: String,
        /// Error message
        message: String,
    },

    /// Segment script is malformed
    #[error("Segment script error at entry {index}: {message}")]
    Script {
        /// Zero-based index of the offending entry
        index: usize,
        /// Error message
        message: String,
    },

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Hex decoding error
    #[error("Hex decoding error: {0}")]
    HexDecode(#[from] hex::FromHexError),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a packet parse error with offset
    pub fn packet_parse_at(message: impl Into<String>, offset: usize) -> Self {
        Self::PacketParse {
            message: message.into(),
            offset,
        }
    }

    /// Create a config value error
    pub fn config_value(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValue {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a segment script error
    pub fn script(index: usize, message: impl Into<String>) -> Self {
        Self::Script {
            index,
            message: message.into(),
        }
    }
}
