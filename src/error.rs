//! Error types for the enrichment facility
//!
//! ## Table of Contents
//! - **EnrichError**: Main error enum covering all failure modes
//! - **Result**: Type alias for `Result<T, EnrichError>`

use thiserror::Error;

/// Result type alias for enrichment operations
pub type Result<T> = std::result::Result<T, EnrichError>;

/// Main error type for enrichment operations
#[derive(Error, Debug)]
pub enum EnrichError {
    /// An assay or ratio lies outside its valid open interval, or the feed
    /// assay is not strictly above the tails assay
    #[error("domain error: {0}")]
    Domain(String),

    /// A push (or a batch of pushes) would overfill a bounded store, or a
    /// step would consume more separative work than is left
    #[error("capacity exceeded: requested {requested}, available {available}")]
    CapacityExceeded {
        /// Quantity the caller tried to add or consume
        requested: f64,
        /// Quantity that was still available
        available: f64,
    },

    /// A pop asked for more material than the store holds
    #[error("insufficient inventory: requested {requested}, held {held}")]
    InsufficientInventory {
        /// Quantity the caller tried to remove
        requested: f64,
        /// Quantity currently held
        held: f64,
    },

    /// Pushed material does not match the accepted recipe
    #[error("composition mismatch: {0}")]
    CompositionMismatch(String),

    /// Invalid facility configuration or unknown recipe
    #[error("configuration error: {0}")]
    Config(String),

    /// Generic IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Metrics registration or export failure
    #[error("metrics error: {0}")]
    Metrics(String),
}

impl EnrichError {
    /// Create a domain error
    pub fn domain(msg: impl Into<String>) -> Self {
        Self::Domain(msg.into())
    }

    /// Create a capacity error
    pub fn capacity(requested: f64, available: f64) -> Self {
        Self::CapacityExceeded {
            requested,
            available,
        }
    }

    /// Create an insufficient inventory error
    pub fn insufficient(requested: f64, held: f64) -> Self {
        Self::InsufficientInventory { requested, held }
    }

    /// Create a composition mismatch error
    pub fn mismatch(msg: impl Into<String>) -> Self {
        Self::CompositionMismatch(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a metrics error
    pub fn metrics(msg: impl Into<String>) -> Self {
        Self::Metrics(msg.into())
    }
}

impl From<prometheus::Error> for EnrichError {
    fn from(err: prometheus::Error) -> Self {
        Self::Metrics(err.to_string())
    }
}
