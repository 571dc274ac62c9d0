use thiserror::Error;

/// A query token that does not follow the query grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed query '{token}': {reason}")]
pub struct MalformedQuery {
    token: String,
    reason: String,
}

impl MalformedQuery {
    pub(crate) fn new(token: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}
