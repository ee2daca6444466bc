//! Error types for CertifyKit.

/// Main error type for CertifyKit.
///
/// All core operations return `Result<T> = std::result::Result<T, CertifyError>`.
/// Empty mining outcomes are never reported through this type.
#[derive(thiserror::Error, Debug)]
pub enum CertifyError {
    /// Feature table or transaction matrix does not match the vocabulary.
    #[error("Malformed feature table: {0}")]
    MalformedFeatureTable(String),

    /// The graph store failed to answer a query.
    #[error("Upstream query failed: {0}")]
    UpstreamQuery(String),

    /// Entity could not be found.
    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    /// Relation endpoints do not match the relation kind.
    #[error("Invalid relation: {0}")]
    InvalidRelation(String),

    /// Configuration values are out of range or inconsistent.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// An artifact file could not be parsed.
    #[error("Ingest error: {0}")]
    Ingest(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML configuration parsing error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Error from an underlying graph store implementation.
    #[error("Graph error: {0}")]
    Graph(#[from] anyhow::Error),
}

/// Type alias for Result with CertifyError.
pub type Result<T> = std::result::Result<T, CertifyError>;
