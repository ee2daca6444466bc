//! CertifyKit agent layer - Gap-to-remediation bridge.
//!
//! This crate turns compliance gaps found by `certify_core` into proposed
//! verification tests and, on approval, writes them back to the graph:
//!
//! - Suggestion: Ask a [`SuggestionService`] for a test covering each gap
//! - Review: Hold suggestions in a [`RemediationBridge`] until approved
//! - Mutation: Merge the approved Test and its VERIFIES relation
//!
//! The `certify` binary wraps the whole pipeline in a CLI.

pub mod bridge;
pub mod cli;
pub mod mutate;
pub mod suggest;

/// Error types for agent operations.
#[derive(thiserror::Error, Debug)]
pub enum AgentError {
    /// A suggestion could not be parsed
    #[error("Suggestion parse failed: {0}")]
    SuggestionParse(String),

    /// The suggestion service failed
    #[error("Suggestion service failed: {0}")]
    SuggestionService(String),

    /// Applying a suggestion to the graph failed
    #[error("Mutation failed: {0}")]
    MutationFailed(String),

    /// No pending suggestion has the given id
    #[error("Suggestion not found: {0}")]
    SuggestionNotFound(String),

    /// Error from CertifyKit core
    #[error("Core error: {0}")]
    Core(#[from] certify_core::CertifyError),
}

/// Result type for agent operations.
pub type Result<T> = std::result::Result<T, AgentError>;

pub use bridge::RemediationBridge;
pub use mutate::{GraphMutator, MutationOutcome};
pub use suggest::{
    generate_suggestions, parse_suggestion, RemediationSuggestion, SuggestionService,
    TemplateSuggestionService,
};
