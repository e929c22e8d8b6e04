//! Crisis content screening and the emergency-escalation seam.
//!
//! The screen is a deterministic, case-insensitive substring match against a
//! fixed phrase list. It deliberately over-triggers; content that expresses
//! risk without any listed phrase is not detected.

use async_trait::async_trait;

use crate::error::EscalationResult;

/// Phrases that flag a reflection for crisis follow-up.
pub const CRISIS_PHRASES: &[&str] = &[
    "suicide",
    "suicidal",
    "kill myself",
    "end it all",
    "end my life",
    "want to die",
    "better off dead",
    "no reason to live",
    "self-harm",
    "self harm",
    "hurt myself",
    "cutting myself",
    "hopeless",
    "worthless",
    "can't go on",
    "cannot go on",
    "give up on life",
];

/// True when the content contains any crisis phrase.
pub fn detect_crisis_content(content: &str) -> bool {
    let lower = content.to_lowercase();
    CRISIS_PHRASES.iter().any(|phrase| lower.contains(phrase))
}

/// The crisis phrases found in the content, in list order.
pub fn matched_crisis_phrases(content: &str) -> Vec<&'static str> {
    let lower = content.to_lowercase();
    CRISIS_PHRASES
        .iter()
        .copied()
        .filter(|phrase| lower.contains(phrase))
        .collect()
}

/// Emergency-escalation collaborator.
///
/// Called with the id of a reflection the screen flagged. Implementations
/// must tolerate being called more than once for the same id.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EscalationHook: Send + Sync {
    /// Request human follow-up for a flagged reflection.
    async fn request_escalation(&self, reflection_id: &str) -> EscalationResult<()>;
}

/// Escalation hook that only records the request in the log.
#[derive(Debug, Clone, Default)]
pub struct LoggingEscalationHook;

#[async_trait]
impl EscalationHook for LoggingEscalationHook {
    async fn request_escalation(&self, reflection_id: &str) -> EscalationResult<()> {
        tracing::warn!(
            reflection_id = %reflection_id,
            "Crisis content detected; escalation requested"
        );
        Ok(())
    }
}
