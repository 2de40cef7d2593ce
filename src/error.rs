//! Error taxonomy for one poll cycle.
//!
//! Every variant is caught at the poll-loop boundary; none of them escapes a loop.

use thiserror::Error;

/// Errors that can end a poll cycle early.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Transport failure or non-2xx status.
    #[error("fetch {url} failed: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The source answered 2xx but refused the request in its envelope.
    #[error("upstream rejected request: {0}")]
    Upstream(String),

    /// Malformed or unexpected payload shape.
    #[error("unexpected payload: {0}")]
    Parse(String),

    /// Digest template failure.
    #[error("digest rendering failed: {0}")]
    Render(String),

    /// Push to a notification channel failed.
    #[error("push via {channel} failed: {reason}")]
    Notify {
        channel: &'static str,
        reason: String,
    },
}

impl FeedError {
    /// Short label used in logs and metric series.
    pub fn kind(&self) -> &'static str {
        match self {
            FeedError::Fetch { .. } => "fetch",
            FeedError::Upstream(_) => "upstream",
            FeedError::Parse(_) => "parse",
            FeedError::Render(_) => "render",
            FeedError::Notify { .. } => "notify",
        }
    }

    pub fn notify(channel: &'static str, reason: impl std::fmt::Display) -> Self {
        FeedError::Notify {
            channel,
            reason: reason.to_string(),
        }
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(e: serde_json::Error) -> Self {
        FeedError::Parse(e.to_string())
    }
}

impl From<handlebars::RenderError> for FeedError {
    fn from(e: handlebars::RenderError) -> Self {
        FeedError::Render(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_stable_labels() {
        assert_eq!(FeedError::Parse("x".into()).kind(), "parse");
        assert_eq!(FeedError::Upstream("x".into()).kind(), "upstream");
        assert_eq!(FeedError::notify("discord", "boom").kind(), "notify");
    }

    #[test]
    fn json_errors_map_to_parse() {
        let err = serde_json::from_str::<serde_json::Value>("{nope").unwrap_err();
        let fe: FeedError = err.into();
        assert!(matches!(fe, FeedError::Parse(_)));
    }
}
