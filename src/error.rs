use thiserror::Error;

/// Failures surfaced to the page instead of leaving the loading indicator up.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DashboardError {
    #[error("request to {url} failed: {reason}")]
    FetchFailed { url: String, reason: String },

    #[error("chart could not be rendered: {0}")]
    RenderFailed(String),

    #[error("user {0} is not in the directory")]
    UnknownUser(String),
}

impl DashboardError {
    pub fn fetch(url: &str, reason: impl ToString) -> Self {
        Self::FetchFailed {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn render(reason: impl Into<String>) -> Self {
        Self::RenderFailed(reason.into())
    }
}
