//! Remediation suggestions - Proposed tests for compliance gaps.
//!
//! A [`SuggestionService`] answers with one CSV line per gap
//! (`test_id,test_name,status`). Generation is per item: a failed or
//! malformed proposal is logged and skipped, never fatal to the batch.

use async_trait::async_trait;
use certify_core::gaps::GapCandidate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AgentError, Result};

/// External generator of remediation proposals.
#[async_trait]
pub trait SuggestionService: Send + Sync {
    /// Proposes a verifying test for a gap.
    ///
    /// Returns a raw CSV line `test_id,test_name,status`, optionally preceded
    /// by a header line.
    async fn propose(&self, candidate: &GapCandidate) -> Result<String>;
}

/// A proposed test awaiting review.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemediationSuggestion {
    /// Review queue identifier
    pub id: Uuid,
    pub req_id: String,
    pub req_text: String,
    pub test_id: String,
    pub test_name: String,
    pub status: String,
    pub proposed_at: DateTime<Utc>,
}

impl std::fmt::Display for RemediationSuggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ('{}') is unverified: create test {} ('{}', {})",
            self.req_id, self.req_text, self.test_id, self.test_name, self.status
        )
    }
}

fn is_header(line: &str) -> bool {
    line.to_ascii_lowercase().starts_with("test_id")
}

/// Parses a service response into a suggestion for `candidate`.
///
/// Blank lines, code fences and a `Test_ID,...` header are ignored; the first
/// remaining line must hold exactly three non-empty fields.
pub fn parse_suggestion(raw: &str, candidate: &GapCandidate) -> Result<RemediationSuggestion> {
    let line = raw
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with("```") && !is_header(line))
        .ok_or_else(|| {
            AgentError::SuggestionParse(format!("empty suggestion for {}", candidate.id))
        })?;

    let fields: Vec<&str> = line.splitn(3, ',').map(str::trim).collect();
    match fields.as_slice() {
        [test_id, test_name, status]
            if !test_id.is_empty() && !test_name.is_empty() && !status.is_empty() =>
        {
            Ok(RemediationSuggestion {
                id: Uuid::new_v4(),
                req_id: candidate.id.to_string(),
                req_text: candidate.text.clone(),
                test_id: test_id.to_string(),
                test_name: test_name.to_string(),
                status: status.to_string(),
                proposed_at: Utc::now(),
            })
        }
        _ => Err(AgentError::SuggestionParse(format!(
            "expected test_id,test_name,status for {}, got '{}'",
            candidate.id, line
        ))),
    }
}

/// Asks `service` for one suggestion per candidate.
///
/// Failed items are logged and dropped, so the result may be shorter than
/// `candidates`. Order follows the input.
pub async fn generate_suggestions(
    service: &dyn SuggestionService,
    candidates: &[GapCandidate],
) -> Vec<RemediationSuggestion> {
    let mut suggestions = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        let parsed = match service.propose(candidate).await {
            Ok(raw) => parse_suggestion(&raw, candidate),
            Err(e) => Err(e),
        };
        match parsed {
            Ok(suggestion) => suggestions.push(suggestion),
            Err(e) => tracing::warn!("Skipping suggestion for {}: {}", candidate.id, e),
        }
    }

    tracing::info!(
        "Generated {} of {} suggestions",
        suggestions.len(),
        candidates.len()
    );
    suggestions
}

/// Offline service deriving the test from the requirement itself.
///
/// `REQ-003` with text "Keep an audit log" becomes
/// `T-REQ-003,verify_keep_an_audit_log,PENDING`.
#[derive(Clone, Debug)]
pub struct TemplateSuggestionService {
    max_words: usize,
}

impl TemplateSuggestionService {
    pub fn new() -> Self {
        Self { max_words: 6 }
    }

    fn test_name(&self, candidate: &GapCandidate) -> String {
        let words: Vec<String> = candidate
            .text
            .split_whitespace()
            .map(|word| {
                word.chars()
                    .filter(|c| c.is_ascii_alphanumeric())
                    .collect::<String>()
                    .to_ascii_lowercase()
            })
            .filter(|word| !word.is_empty())
            .take(self.max_words)
            .collect();

        if words.is_empty() {
            format!("verify_{}", candidate.id.as_str().to_ascii_lowercase().replace('-', "_"))
        } else {
            format!("verify_{}", words.join("_"))
        }
    }
}

impl Default for TemplateSuggestionService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SuggestionService for TemplateSuggestionService {
    async fn propose(&self, candidate: &GapCandidate) -> Result<String> {
        Ok(format!(
            "T-{},{},PENDING",
            candidate.id,
            self.test_name(candidate)
        ))
    }
}
