use thiserror::Error;

/// A payload from the platform was missing required fields. Carries the raw
/// payload and every violated field path so one log line shows the whole
/// problem. Callers log and skip the offending item, never the batch.
#[derive(Debug, Clone, Error)]
#[error("failed to parse payload: {raw}, with errors: {violations:?}")]
pub struct ParseError {
    pub raw: String,
    pub violations: Vec<String>,
}

impl ParseError {
    pub fn new(raw: impl Into<String>, violations: Vec<String>) -> Self {
        Self {
            raw: raw.into(),
            violations,
        }
    }
}
