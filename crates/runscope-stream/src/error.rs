use thiserror::Error;

/// Errors from one connection attempt. Frame parse and reducer input
/// problems are absorbed locally; only connection-level failures reach
/// this type, and the worker treats every one as transient.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend returned status {0}")]
    BadStatus(u16),
}
